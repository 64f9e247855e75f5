//! Persists the mapper's coin catalogs and best-transfer table to disk so a restarted process
//! can skip re-discovering every exchange's withdrawable coin set before it starts trading.
//!
//! Grounded on `original_source/core/services/Mapper.py`'s `save`/`load`: the same four pieces
//! of state (per-exchange catalogs, the best-transfer table, the USDT coin id, and the
//! next-id counter) round-trip here, using `bincode` in place of `pickle`.

use arb_instrument::{BestTransferTable, Catalog, CoinId, ExchangeId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("failed to read snapshot file: {0}")]
    Read(#[source] io::Error),

    #[error("failed to write snapshot file: {0}")]
    Write(#[source] io::Error),

    #[error("failed to decode snapshot: {0}")]
    Decode(#[from] bincode::Error),
}

/// The mapper's persisted state: one [`Catalog`] per exchange, the [`BestTransferTable`] built
/// from them, the coin id assigned to USDT, and the next id the mapper's name-interning
/// counter would hand out.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MapperSnapshot {
    pub catalogs: HashMap<ExchangeId, Catalog>,
    pub best_transfer: BestTransferTable,
    pub usdt: Option<CoinId>,
    pub next_id: u64,
}

impl MapperSnapshot {
    pub fn new(
        catalogs: HashMap<ExchangeId, Catalog>,
        best_transfer: BestTransferTable,
        usdt: Option<CoinId>,
        next_id: u64,
    ) -> Self {
        Self {
            catalogs,
            best_transfer,
            usdt,
            next_id,
        }
    }

    /// Serialise and write to `path`, overwriting any existing file.
    pub fn save(&self, path: &Path) -> Result<(), SnapshotError> {
        let bytes = bincode::serialize(self)?;
        std::fs::write(path, bytes).map_err(SnapshotError::Write)
    }

    /// Read and deserialise from `path`.
    pub fn load(path: &Path) -> Result<Self, SnapshotError> {
        let bytes = std::fs::read(path).map_err(SnapshotError::Read)?;
        Ok(bincode::deserialize(&bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arb_instrument::Coin;

    #[test]
    fn round_trips_through_a_file() {
        let id = CoinId(1);
        let mut catalog = Catalog::new();
        catalog.insert(
            "USDC",
            id,
            Coin::try_new("0xabc", "USDC", "polygon", 0.2, 1.0).unwrap(),
        );

        let mut catalogs = HashMap::new();
        catalogs.insert(ExchangeId::Okx, catalog.clone());

        let table = BestTransferTable::build(&[(ExchangeId::Okx, &catalog)]);
        let snapshot = MapperSnapshot::new(catalogs, table, Some(id), 2);

        let dir = std::env::temp_dir();
        let path = dir.join(format!("arb_mapper_snapshot_test_{}.bin", std::process::id()));

        snapshot.save(&path).unwrap();
        let loaded = MapperSnapshot::load(&path).unwrap();

        assert_eq!(loaded.usdt, Some(id));
        assert_eq!(loaded.next_id, 2);
        assert_eq!(loaded.catalogs[&ExchangeId::Okx].len(), catalog.len());

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let path = std::env::temp_dir().join("arb_mapper_snapshot_does_not_exist.bin");
        let _ = std::fs::remove_file(&path);
        assert!(matches!(
            MapperSnapshot::load(&path),
            Err(SnapshotError::Read(_))
        ));
    }
}
