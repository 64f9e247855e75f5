use crate::error::ClientError;
use arb_instrument::{AssetBalance, Coin, CoinId, ExchangeId};
use futures::Stream;
use std::collections::HashMap;

/// Market metadata needed to validate and size an order, as reported by the venue's
/// `load_markets` (or equivalent) call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarketLimits {
    pub min_amount: f64,
    pub min_cost: Option<f64>,
    pub amount_precision: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderSide {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepositAddress<'a> {
    pub address: &'a str,
    pub tag: Option<&'a str>,
}

/// Abstraction over one exchange's private REST/WS surface: balances, market orders,
/// withdrawals and deposit-address resolution.
///
/// Mirrors the RPITIT-style `ExecutionClient` trait the teacher uses - async methods return
/// `impl Future<Output = ...> + Send` rather than requiring `#[async_trait]`, avoiding a
/// boxed future per call on the hot balance/price streaming path.
pub trait ExchangeClient: Send + Sync {
    const EXCHANGE: ExchangeId;

    /// Private balance update stream, as subscribed to by `BalanceObserver`.
    type AccountStream: Stream<Item = Result<AssetBalance<CoinId>, ClientError>> + Send + Unpin;

    fn account_stream(
        &self,
    ) -> impl Future<Output = Result<Self::AccountStream, ClientError>> + Send;

    fn fetch_balances(
        &self,
    ) -> impl Future<Output = Result<Vec<AssetBalance<CoinId>>, ClientError>> + Send;

    fn load_markets(
        &self,
    ) -> impl Future<Output = Result<HashMap<String, MarketLimits>, ClientError>> + Send;

    /// Last traded price for `symbol` (e.g. `"BTC/USDT"`), used for cost-limit validation.
    fn last_price(&self, symbol: &str) -> impl Future<Output = Result<f64, ClientError>> + Send;

    fn create_market_order(
        &self,
        symbol: &str,
        side: OrderSide,
        amount: f64,
    ) -> impl Future<Output = Result<(), ClientError>> + Send;

    fn withdraw(
        &self,
        coin: &Coin,
        amount: f64,
        address: &str,
        tag: Option<&str>,
    ) -> impl Future<Output = Result<(), ClientError>> + Send;

    fn fetch_deposit_address(
        &self,
        coin_name: &str,
        network: &str,
    ) -> impl Future<Output = Result<String, ClientError>> + Send;

    /// Every withdrawable `(ticker, network, fee, min_amount)` combination this venue
    /// reports, prior to any blacklist/validity filtering performed by the coin catalog
    /// ingestion step.
    fn fetch_currencies(
        &self,
    ) -> impl Future<Output = Result<HashMap<String, Vec<Coin>>, ClientError>> + Send;
}
