use arb_instrument::{AssetBalance, CoinId, ExchangeId};
use futures::Stream;
use thiserror::Error;

/// Error surfaced by a [`MarketDataClient`], split along the same recoverable axis the rest
/// of the workspace's error enums use.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("authentication failed")]
    Authentication,

    #[error("permission denied")]
    PermissionDenied,

    #[error("this venue does not support {0}")]
    Unsupported(&'static str),

    #[error("rate limit exceeded")]
    RateLimit,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("socket error: {0}")]
    Socket(String),

    #[error("invalid nonce")]
    InvalidNonce,

    #[error("bad symbol: {0}")]
    BadSymbol(String),

    #[error("cancelled")]
    Cancelled,

    #[error("unexpected error: {0}")]
    Other(String),
}

impl DataError {
    /// `true` when the observer loop should stop rather than sleep-and-retry.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DataError::Cancelled
                | DataError::Authentication
                | DataError::PermissionDenied
                | DataError::Unsupported(_)
        )
    }

    /// How long the observer should sleep before retrying, per the error-policy table. `None`
    /// for terminal errors, which never retry.
    pub fn retry_delay(&self) -> Option<std::time::Duration> {
        use std::time::Duration;
        match self {
            DataError::RateLimit => Some(Duration::from_secs(60)),
            DataError::Connection(_) | DataError::Socket(_) | DataError::InvalidNonce => {
                Some(Duration::from_secs(10))
            }
            DataError::BadSymbol(_) => Some(Duration::from_secs(5)),
            DataError::Cancelled
            | DataError::Authentication
            | DataError::PermissionDenied
            | DataError::Unsupported(_) => None,
            DataError::Other(_) => Some(Duration::from_secs(5)),
        }
    }
}

impl arb_integration::Unrecoverable for DataError {
    fn is_unrecoverable(&self) -> bool {
        self.is_terminal()
    }
}

/// A raw ticker update for one coin on one exchange, before [`crate::price_observer`]
/// resolves it to a single price via the `ask ?? last_price ?? info.last_price ?? 0` chain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawTicker {
    pub coin_id: CoinId,
    pub ask: Option<f64>,
    pub last_price: Option<f64>,
    pub info_last_price: Option<f64>,
}

/// The streaming half of an exchange's private/market-data surface: balances and ticker
/// prices. Split out of a single combined client trait so `arb-data` can depend on it
/// without pulling in `arb-execution`'s order/withdrawal surface, mirroring the teacher's own
/// one-directional `jackbot-execution -> jackbot-data` dependency.
pub trait MarketDataClient: Send + Sync {
    const EXCHANGE: ExchangeId;

    type BalanceStream: Stream<Item = Result<AssetBalance<CoinId>, DataError>> + Send + Unpin;
    type TickerStream: Stream<Item = Result<RawTicker, DataError>> + Send + Unpin;

    fn fetch_balance(
        &self,
    ) -> impl Future<Output = Result<Vec<AssetBalance<CoinId>>, DataError>> + Send;

    fn watch_balance(&self) -> impl Future<Output = Result<Self::BalanceStream, DataError>> + Send;

    /// Subscribe to ticker updates for `symbols` (each `"{NAME}/USDT"`). Some venues cap how
    /// many symbols a single subscription may carry; callers chunk accordingly.
    fn watch_tickers(
        &self,
        symbols: Vec<String>,
    ) -> impl Future<Output = Result<Self::TickerStream, DataError>> + Send;
}
