use arb_instrument::{CoinId, ExchangeId};
use async_trait::async_trait;

/// Capability interface for a balance-update subscriber, replacing the source's duck-typed
/// `BalanceSubscriber` protocol class (REDESIGN FLAG: explicit two-method capability
/// interfaces held as `Vec<Arc<dyn Trait>>` instead of structurally-typed subscriber
/// objects). `async_trait` is used here specifically because subscribers are stored as trait
/// objects, which RPITIT methods cannot be.
#[async_trait]
pub trait BalanceSubscriber: Send + Sync {
    /// `amount` is the coin's new wallet total on `exchange`, already epsilon-collapsed.
    async fn on_balance_update(&self, exchange: ExchangeId, coin_id: CoinId, amount: f64);
}

/// Capability interface for a price-update subscriber, replacing the source's duck-typed
/// `PriceSubscriber` protocol class.
#[async_trait]
pub trait PriceSubscriber: Send + Sync {
    /// `price <= 0.0` means the exchange no longer quotes this coin.
    async fn on_price_update(&self, exchange: ExchangeId, coin_id: CoinId, price: f64);
}
