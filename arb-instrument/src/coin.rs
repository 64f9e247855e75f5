use derive_more::{Constructor, Display};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use thiserror::Error;

/// Sentinel withdraw fee meaning "unknown". Always compares as worse than any known fee.
pub const UNKNOWN_FEE: f64 = -1.0;

/// Errors raised constructing a [`Coin`] from exchange-reported data.
///
/// Mirrors the validation a per-exchange catalog adapter must perform before a `Coin` is
/// allowed to enter the [`crate::catalog::Catalog`] - ticker name and network must be
/// present, fee and minimum withdrawal amount must be non-negative real numbers. The
/// contract address may be empty for a chain-native coin.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum CoinCreateError {
    #[error("coin name must not be empty or whitespace")]
    EmptyName,
    #[error("coin network must not be empty or whitespace")]
    EmptyNetwork,
    #[error("coin fee must be >= 0 or exactly {UNKNOWN_FEE} (unknown), got {0}")]
    InvalidFee(String),
    #[error("coin minimum withdrawal amount must be >= 0, got {0}")]
    InvalidMinAmount(String),
}

/// A withdrawable variant of a ticker on a single network, as reported by one exchange.
///
/// Equality and hashing are by `address` only: two `Coin`s with the same contract address
/// are the same coin even if their name or fee disagree (one side may be stale). Ordering
/// treats an unknown fee ([`UNKNOWN_FEE`]) as strictly worse than any known, non-negative
/// fee, and two unknown fees as equal - this lets `Coin` be used directly as the ordering
/// key when selecting the cheapest transfer route between two exchanges.
#[derive(Debug, Clone, Constructor, Deserialize, Serialize)]
pub struct Coin {
    pub address: String,
    pub name: String,
    pub network: String,
    pub fee: f64,
    pub min_amount: f64,
}

impl Coin {
    pub fn try_new(
        address: impl Into<String>,
        name: impl Into<String>,
        network: impl Into<String>,
        fee: f64,
        min_amount: f64,
    ) -> Result<Self, CoinCreateError> {
        let name = name.into();
        let network = network.into();

        if name.trim().is_empty() {
            return Err(CoinCreateError::EmptyName);
        }
        if network.trim().is_empty() {
            return Err(CoinCreateError::EmptyNetwork);
        }
        if !(fee >= 0.0) && fee != UNKNOWN_FEE {
            return Err(CoinCreateError::InvalidFee(fee.to_string()));
        }
        if !(min_amount >= 0.0) {
            return Err(CoinCreateError::InvalidMinAmount(min_amount.to_string()));
        }

        Ok(Self {
            address: address.into(),
            name,
            network,
            fee,
            min_amount,
        })
    }

    pub fn fee_known(&self) -> bool {
        self.fee >= 0.0
    }

    /// `fee` if known, else `None`.
    pub fn known_fee(&self) -> Option<f64> {
        self.fee_known().then_some(self.fee)
    }

    pub fn csv_header() -> &'static str {
        "address,name,network,fee,min_amount"
    }

    pub fn to_csv(&self) -> String {
        format!(
            "{},{},{},{},{}",
            csv_quote(&self.address),
            csv_quote(&self.name),
            csv_quote(&self.network),
            self.fee,
            self.min_amount
        )
    }
}

fn csv_quote(field: &str) -> String {
    if field.contains(',') || field.contains('"') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

impl PartialEq for Coin {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address
    }
}

impl Eq for Coin {}

impl std::hash::Hash for Coin {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.address.hash(state);
    }
}

impl PartialOrd for Coin {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Coin {
    /// Cheaper known fee sorts first; an unknown fee always sorts last.
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.fee_known(), other.fee_known()) {
            (true, true) => self
                .fee
                .partial_cmp(&other.fee)
                .unwrap_or(Ordering::Equal),
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => Ordering::Equal,
        }
    }
}

/// Process-global, monotonically assigned identifier unifying the same underlying coin
/// across every exchange catalog that carries it.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display,
)]
#[display("CoinId({_0})")]
pub struct CoinId(pub u64);

impl CoinId {
    pub fn value(&self) -> u64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coin(address: &str, fee: f64) -> Coin {
        Coin::try_new(address, "USDC", "erc20", fee, 1.0).unwrap()
    }

    #[test]
    fn rejects_empty_name() {
        assert_eq!(
            Coin::try_new("0xabc", "  ", "eth", 1.0, 1.0).unwrap_err(),
            CoinCreateError::EmptyName
        );
    }

    #[test]
    fn rejects_empty_network() {
        assert_eq!(
            Coin::try_new("0xabc", "USDC", "", 1.0, 1.0).unwrap_err(),
            CoinCreateError::EmptyNetwork
        );
    }

    #[test]
    fn allows_empty_address_for_native_coin() {
        assert!(Coin::try_new("", "BTC", "bitcoin", 0.0005, 0.001).is_ok());
    }

    #[test]
    fn rejects_negative_fee_other_than_sentinel() {
        assert!(Coin::try_new("0xabc", "USDC", "eth", -2.0, 1.0).is_err());
        assert!(Coin::try_new("0xabc", "USDC", "eth", UNKNOWN_FEE, 1.0).is_ok());
    }

    #[test]
    fn unknown_fee_sorts_worse_than_known() {
        let known = coin("0x1", 0.5);
        let unknown = coin("0x2", UNKNOWN_FEE);
        assert!(known < unknown);
        assert!(unknown > known);
    }

    #[test]
    fn two_unknown_fees_compare_equal_in_order() {
        let a = coin("0x1", UNKNOWN_FEE);
        let b = coin("0x2", UNKNOWN_FEE);
        assert_eq!(a.cmp(&b), Ordering::Equal);
    }

    #[test]
    fn equality_and_hash_are_by_address_only() {
        let a = Coin::try_new("0xabc", "USDC", "eth", 1.0, 1.0).unwrap();
        let b = Coin::try_new("0xabc", "USDT", "bsc", 2.0, 5.0).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn csv_round_trips_fields() {
        let c = Coin::try_new("0xabc,1", "USDC", "eth", 0.5, 1.0).unwrap();
        let row = c.to_csv();
        assert!(row.starts_with("\"0xabc,1\",USDC,eth,0.5,1"));
    }
}
