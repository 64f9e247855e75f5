use arb_instrument::ExchangeId;
use std::fmt;

/// Identifies which logical stream a reconnect-related log line is about - the balance
/// stream or the price stream for a given exchange - so operators can tell them apart in
/// structured logs without parsing a free-text message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamKey {
    pub exchange: ExchangeId,
    pub kind: StreamKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    Balance,
    Price,
}

impl StreamKey {
    pub fn new(exchange: ExchangeId, kind: StreamKind) -> Self {
        Self { exchange, kind }
    }

    pub fn balance(exchange: ExchangeId) -> Self {
        Self::new(exchange, StreamKind::Balance)
    }

    pub fn price(exchange: ExchangeId) -> Self {
        Self::new(exchange, StreamKind::Price)
    }
}

impl fmt::Display for StreamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            StreamKind::Balance => "balance",
            StreamKind::Price => "price",
        };
        write!(f, "{}:{kind}", self.exchange.as_str())
    }
}
