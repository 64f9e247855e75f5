//! Coin, exchange identity, and per-exchange catalog data structures shared across the
//! arbitrage engine: the [`coin::Coin`]/[`coin::CoinId`] model, the [`exchange::ExchangeId`]
//! identifier, and the [`catalog::Catalog`]/[`catalog::BestTransferTable`] collections a
//! [`Mapper`](https://docs.rs) equivalent builds at startup.

pub mod balance;
pub mod catalog;
pub mod coin;
pub mod exchange;

pub use balance::{AssetBalance, Balance};
pub use catalog::{BestTransferTable, Catalog};
pub use coin::{Coin, CoinCreateError, CoinId};
pub use exchange::{ExchangeId, ExchangeIndex};
