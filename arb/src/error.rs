//! Top-level error type composing every sub-crate's error enum.
//!
//! Grounded on `barter/src/engine/error.rs`'s composing `#[from]` pattern.

use arb_data::client::DataError;
use arb_execution::error::ClientError;
use arb_execution::trader::TradeError;
use arb_instrument::CoinCreateError;
use arb_snapshot::SnapshotError;
use thiserror::Error;

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum BotError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("exchange client error: {0}")]
    Client(#[from] ClientError),

    #[error("market data error: {0}")]
    Data(#[from] DataError),

    #[error("trade error: {0}")]
    Trade(#[from] TradeError),

    #[error("coin catalog error: {0}")]
    Coin(#[from] CoinCreateError),

    #[error("snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error("observer restart limit exceeded: {0}")]
    ObserverRestartLimitExceeded(#[from] crate::supervisor::ObserverRestartLimitExceeded),

    #[error("{0}")]
    Custom(String),
}
