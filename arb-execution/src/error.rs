use arb_instrument::ExchangeId;
use thiserror::Error;

/// Error surfaced by a concrete [`crate::client::ExchangeClient`] implementation, split
/// along the same recoverable/unrecoverable axis the rest of the workspace uses so that
/// `Connection`, `Trader` and `Courier` can decide whether to retry without matching on
/// every venue-specific variant.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("connectivity error: {0}")]
    Connectivity(#[from] ConnectivityError),

    #[error("api error: {0}")]
    Api(#[from] ApiError),

    #[error("failed to fetch account snapshot: {0}")]
    AccountSnapshot(String),

    #[error("account stream terminated: {0}")]
    AccountStream(String),
}

#[derive(Debug, Error)]
pub enum ConnectivityError {
    #[error("{0} is offline")]
    ExchangeOffline(ExchangeId),

    #[error("request timed out")]
    Timeout,

    #[error("socket error: {0}")]
    Socket(String),

    #[error("exchange is under maintenance")]
    Maintenance,

    #[error("ddos protection triggered, retry after {retry_after_ms:?}ms")]
    DdosProtection { retry_after_ms: Option<u64> },
}

/// The error taxonomy §6 of the spec requires: every category a connected exchange SDK can
/// report, collapsed into typed variants instead of string matching on exception messages.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("authentication failed")]
    Authentication,

    #[error("permission denied")]
    PermissionDenied,

    #[error("rate limit exceeded, retry after {retry_after_ms:?}ms")]
    RateLimit { retry_after_ms: Option<u64> },

    #[error("invalid nonce")]
    InvalidNonce,

    #[error("bad symbol: {0}")]
    BadSymbol(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("invalid withdrawal address")]
    InvalidAddress,

    #[error("withdrawal address is pending exchange-side validation")]
    AddressPending,

    #[error("invalid order: {0}")]
    InvalidOrder(String),

    #[error("insufficient funds")]
    InsufficientFunds,

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("exchange error: {0}")]
    ExchangeError(String),
}

impl arb_integration::Unrecoverable for ClientError {
    fn is_unrecoverable(&self) -> bool {
        matches!(
            self,
            ClientError::Api(ApiError::Authentication) | ClientError::Api(ApiError::PermissionDenied)
        )
    }
}

impl ApiError {
    /// Delay to sleep before retrying the observer loop, per the error-policy table.
    pub fn retry_delay(&self) -> Option<std::time::Duration> {
        use std::time::Duration;
        match self {
            ApiError::RateLimit { .. } => Some(Duration::from_secs(60)),
            ApiError::InvalidNonce => Some(Duration::from_secs(10)),
            ApiError::BadSymbol(_) => Some(Duration::from_secs(5)),
            ApiError::Authentication | ApiError::PermissionDenied | ApiError::Unsupported(_) => {
                None
            }
            _ => Some(Duration::from_secs(5)),
        }
    }

    /// `true` if the observer loop should stop entirely rather than retry.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ApiError::Authentication | ApiError::PermissionDenied | ApiError::Unsupported(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_errors_exit_the_observer_loop() {
        assert!(ApiError::Authentication.is_terminal());
        assert!(ApiError::PermissionDenied.is_terminal());
        assert!(ApiError::Unsupported("watch_balance".into()).is_terminal());
        assert!(!ApiError::InvalidNonce.is_terminal());
    }

    #[test]
    fn rate_limit_sleeps_for_sixty_seconds() {
        assert_eq!(
            ApiError::RateLimit { retry_after_ms: None }.retry_delay(),
            Some(std::time::Duration::from_secs(60))
        );
    }
}
