//! Unifies every connected exchange's coin catalog into stable, process-global [`CoinId`]s and
//! computes the cheapest withdrawable route between every pair of exchanges.
//!
//! Grounded on `original_source/core/services/Mapper.py`'s `generate_data`: the same
//! fresh-id-unless-address-already-seen allocation rule, the same blacklist filter, the same
//! lazily-resolved USDT id, and the same eager best-transfer computation after ingestion.

use arb_instrument::catalog::is_blacklisted_chain;
use arb_instrument::{BestTransferTable, Catalog, Coin, CoinId, ExchangeId};
use arb_snapshot::{MapperSnapshot, SnapshotError};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

use crate::dto::Deal;

#[derive(Debug, Error)]
pub enum MapperError {
    #[error("USDT coin id has not been resolved yet - no exchange has ingested a USDT ticker")]
    UsdtNotResolved,
}

#[derive(Debug, Clone, Default)]
pub struct Mapper {
    next_id: u64,
    address_to_id: HashMap<String, CoinId>,
    catalogs: HashMap<ExchangeId, Catalog>,
    best_transfer: BestTransferTable,
    usdt: Option<CoinId>,
}

impl Mapper {
    pub fn new() -> Self {
        Self::default()
    }

    fn fresh_id(&mut self) -> CoinId {
        self.next_id += 1;
        CoinId(self.next_id)
    }

    /// Ingests one exchange's raw `{ticker name -> withdrawable variants}` catalog. Variants
    /// with an empty address, a blacklisted chain, or an unknown withdrawal fee are dropped; a
    /// ticker reuses an already-seen address's id rather than allocating a fresh one.
    pub fn ingest(&mut self, exchange: ExchangeId, raw: HashMap<String, Vec<Coin>>) {
        let catalog = self.catalogs.entry(exchange).or_default();

        for (name, variants) in raw {
            let mut id = None;
            let mut accepted = Vec::new();

            for coin in variants {
                if coin.address.is_empty()
                    || is_blacklisted_chain(&coin.network)
                    || !coin.fee_known()
                {
                    continue;
                }
                if let Some(existing) = self.address_to_id.get(&coin.address) {
                    id = Some(*existing);
                }
                accepted.push(coin);
            }

            if accepted.is_empty() {
                continue;
            }

            let id = id.unwrap_or_else(|| self.fresh_id());

            for coin in accepted {
                self.address_to_id.insert(coin.address.clone(), id);
                catalog.insert(name.clone(), id, coin);
            }

            if name == "USDT" && self.usdt.is_none() {
                debug!(?exchange, ?id, "resolved USDT coin id");
                self.usdt = Some(id);
            }
        }
    }

    /// Recomputes the best-transfer table from every catalog ingested so far. Call once after
    /// all exchanges have been ingested for this bot cycle.
    pub fn build_best_transfer(&mut self) {
        let catalogs: Vec<(ExchangeId, &Catalog)> =
            self.catalogs.iter().map(|(id, catalog)| (*id, catalog)).collect();
        self.best_transfer = BestTransferTable::build(&catalogs);
    }

    pub fn usdt(&self) -> Result<CoinId, MapperError> {
        self.usdt.ok_or(MapperError::UsdtNotResolved)
    }

    pub fn catalog(&self, exchange: ExchangeId) -> Option<&Catalog> {
        self.catalogs.get(&exchange)
    }

    /// The ticker name `coin_id` is listed under on `exchange`, if that exchange carries it.
    pub fn name_for(&self, exchange: ExchangeId, coin_id: CoinId) -> Option<&str> {
        self.catalogs.get(&exchange)?.name_for_id(coin_id)
    }

    pub fn best_coin_transfer(
        &self,
        departure: ExchangeId,
        destination: ExchangeId,
        coin_id: CoinId,
    ) -> Option<&Coin> {
        self.best_transfer.get(departure, destination, coin_id)
    }

    /// The non-negative fee for the cheapest route of a [`Deal`], or `None` if unknown/absent.
    pub fn fee(&self, deal: &Deal, coin_id: Option<CoinId>) -> Option<f64> {
        let coin_id = coin_id.unwrap_or(deal.coin_id);
        self.best_coin_transfer(deal.departure, deal.destination, coin_id)
            .and_then(Coin::known_fee)
    }

    /// Every coin id reachable on at least two connected exchanges - the set the `Analyst`
    /// tracks a price grid entry for.
    pub fn analyzed_coins(&self) -> HashSet<CoinId> {
        let mut counts: HashMap<CoinId, u32> = HashMap::new();
        for catalog in self.catalogs.values() {
            for id in catalog.ids() {
                *counts.entry(id).or_insert(0) += 1;
            }
        }
        counts
            .into_iter()
            .filter_map(|(id, count)| (count >= 2).then_some(id))
            .collect()
    }

    /// Pretty-prints the best-transfer table as a tree of departure -> destination -> coin,
    /// purely a diagnostic aid.
    pub fn render_best_transfer(&self) -> String {
        let mut table = prettytable::Table::new();
        table.add_row(prettytable::row!["Departure", "Destination", "Coin ID", "Address", "Fee"]);

        let mut rows: Vec<(ExchangeId, ExchangeId, CoinId, Coin)> = Vec::new();
        for &departure in self.catalogs.keys() {
            for &destination in self.catalogs.keys() {
                if departure == destination {
                    continue;
                }
                for coin_id in self.analyzed_coins() {
                    if let Some(coin) = self.best_coin_transfer(departure, destination, coin_id) {
                        rows.push((departure, destination, coin_id, coin.clone()));
                    }
                }
            }
        }

        if rows.is_empty() {
            return "No transfer data available".to_string();
        }

        for (departure, destination, coin_id, coin) in rows {
            table.add_row(prettytable::row![
                departure,
                destination,
                coin_id,
                coin.address,
                coin.fee
            ]);
        }

        table.to_string()
    }

    /// Persists catalogs, best-transfer table, USDT id and the id counter to `path`, purely as
    /// a process-restart optimisation.
    pub fn save(&self, path: &Path) -> Result<(), SnapshotError> {
        MapperSnapshot::new(
            self.catalogs.clone(),
            self.best_transfer.clone(),
            self.usdt,
            self.next_id,
        )
        .save(path)
    }

    /// Restores a previously saved snapshot, replacing all current state.
    pub fn load(path: &Path) -> Result<Self, SnapshotError> {
        let snapshot = MapperSnapshot::load(path)?;
        Ok(Self {
            next_id: snapshot.next_id,
            address_to_id: HashMap::new(),
            catalogs: snapshot.catalogs,
            best_transfer: snapshot.best_transfer,
            usdt: snapshot.usdt,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coin(address: &str, name: &str, network: &str, fee: f64) -> Coin {
        Coin::try_new(address, name, network, fee, 1.0).unwrap()
    }

    #[test]
    fn blacklisted_chain_never_enters_the_catalog() {
        let mut mapper = Mapper::new();
        let mut raw = HashMap::new();
        raw.insert(
            "USDC".to_string(),
            vec![coin("0xabc", "USDC", "ERC20", 0.5)],
        );
        mapper.ingest(ExchangeId::Okx, raw);
        assert!(mapper.catalog(ExchangeId::Okx).unwrap().is_empty());
    }

    #[test]
    fn shared_address_across_exchanges_collapses_to_one_id() {
        let mut mapper = Mapper::new();

        let mut okx = HashMap::new();
        okx.insert("USDC".to_string(), vec![coin("0xabc", "USDC", "polygon", 0.2)]);
        mapper.ingest(ExchangeId::Okx, okx);

        let mut bitget = HashMap::new();
        bitget.insert("USDC".to_string(), vec![coin("0xabc", "USDC", "polygon", 0.5)]);
        mapper.ingest(ExchangeId::Bitget, bitget);

        let okx_id = mapper.catalog(ExchangeId::Okx).unwrap().id_for_name("USDC").unwrap();
        let bitget_id = mapper
            .catalog(ExchangeId::Bitget)
            .unwrap()
            .id_for_name("USDC")
            .unwrap();
        assert_eq!(okx_id, bitget_id);
    }

    #[test]
    fn usdt_resolves_to_the_first_exchange_that_carries_it() {
        let mut mapper = Mapper::new();
        assert!(mapper.usdt().is_err());

        let mut raw = HashMap::new();
        raw.insert(
            "USDT".to_string(),
            vec![coin("0xusdt", "USDT", "polygon", 0.1)],
        );
        mapper.ingest(ExchangeId::Okx, raw);
        assert!(mapper.usdt().is_ok());
    }

    #[test]
    fn best_transfer_biases_to_departures_variant() {
        let mut mapper = Mapper::new();
        let id = {
            let mut okx = HashMap::new();
            okx.insert(
                "USDC".to_string(),
                vec![coin("0xabc", "USDC", "polygon", 0.2)],
            );
            mapper.ingest(ExchangeId::Okx, okx);
            mapper.catalog(ExchangeId::Okx).unwrap().id_for_name("USDC").unwrap()
        };

        let mut bitget = HashMap::new();
        bitget.insert("USDC".to_string(), vec![coin("0xabc", "USDC", "polygon", 0.5)]);
        mapper.ingest(ExchangeId::Bitget, bitget);

        mapper.build_best_transfer();

        let coin = mapper
            .best_coin_transfer(ExchangeId::Okx, ExchangeId::Bitget, id)
            .unwrap();
        assert_eq!(coin.fee, 0.2);
    }
}
