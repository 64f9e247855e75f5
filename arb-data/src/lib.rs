//! Streaming balance and price observers: the [`client::MarketDataClient`] abstraction,
//! [`balance_observer::BalanceObserver`] (C2) and [`price_observer::PriceObserver`] (C3), the
//! [`subscriber::BalanceSubscriber`]/[`subscriber::PriceSubscriber`] capability interfaces,
//! and the [`streams::reconnect`] backoff combinator `arb::connection` builds on.

pub mod balance_observer;
pub mod client;
pub mod price_observer;
pub mod streams;
pub mod subscriber;

pub use balance_observer::BalanceObserver;
pub use client::{DataError, MarketDataClient, RawTicker};
pub use price_observer::PriceObserver;
pub use subscriber::{BalanceSubscriber, PriceSubscriber};
