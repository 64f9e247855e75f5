//! Small value types shared between the [`crate::analyst`], [`crate::brain`] and
//! [`crate::manager`] components.
//!
//! Grounded on `original_source/core/models/Deal.py` and `core/interfaces/Dto/Asset.py`,
//! `core/models/dto/{Trade,Transfer,Wait}.py`.

use arb_instrument::{CoinId, ExchangeId};

/// A balance update as handed to [`crate::brain::Brain::analyse`]: the coin and the amount
/// currently held of it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Asset {
    pub coin_id: CoinId,
    pub amount: f64,
}

impl Asset {
    pub fn new(coin_id: CoinId, amount: f64) -> Self {
        Self { coin_id, amount }
    }
}

/// The analyst's current best cross-exchange route for one coin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Deal {
    pub coin_id: CoinId,
    pub departure: ExchangeId,
    pub destination: ExchangeId,
    pub benefit: f64,
}

/// What the brain recommends doing with a given [`Asset`] on a given exchange.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Recommendation {
    /// Swap `sell_coin` for `buy_coin` on the current exchange (one leg is always USDT).
    Trade { sell_coin: CoinId, buy_coin: CoinId },
    /// Withdraw `coin_id` from `departure` to `destination`.
    Transfer {
        coin_id: CoinId,
        departure: ExchangeId,
        destination: ExchangeId,
    },
    /// Re-consult after `seconds`; no action taken now.
    Wait { seconds: u64 },
}
