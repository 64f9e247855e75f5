use crate::client::{ExchangeClient, MarketLimits, OrderSide};
use crate::error::{ApiError, ClientError};
use arb_instrument::CoinId;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Why a requested trade did not happen, distinct from the happy-path `Ok(())`.
///
/// Replaces the source's habit of returning `None` from `buy`/`sell` for every one of these
/// cases - callers now match on the reason instead of re-deriving it.
#[derive(Debug, thiserror::Error)]
pub enum TradeError {
    #[error("coin {0} is paused until {1:?}")]
    Paused(CoinId, Instant),

    #[error("market {0} does not exist")]
    UnknownMarket(String),

    #[error("quantity below exchange minimum amount")]
    BelowMinimumAmount,

    #[error("notional below exchange minimum cost")]
    BelowMinimumCost,

    #[error("usdt/usdt is not a valid trade")]
    UsdtToUsdt,

    #[error("quantity not specified and no wallet balance available to default from")]
    NoQuantity,

    #[error(transparent)]
    Client(#[from] ClientError),
}

/// Executes market buy/sell orders for a single exchange, validating against the venue's
/// reported market limits and pausing a coin for a cooldown window when the exchange
/// reports its withdrawal/order address as invalid or still pending validation.
pub struct Trader<C> {
    client: C,
    usdt_symbol_suffix: &'static str,
    paused_until: Mutex<HashMap<CoinId, Instant>>,
}

impl<C> Trader<C>
where
    C: ExchangeClient,
{
    pub fn new(client: C) -> Self {
        Self {
            client,
            usdt_symbol_suffix: "USDT",
            paused_until: Mutex::new(HashMap::new()),
        }
    }

    pub fn is_paused(&self, coin: CoinId) -> bool {
        self.resume_at(coin).is_some()
    }

    fn resume_at(&self, coin: CoinId) -> Option<Instant> {
        let guard = self.paused_until.lock();
        match guard.get(&coin) {
            Some(&resume_at) if resume_at > Instant::now() => Some(resume_at),
            _ => None,
        }
    }

    fn pause(&self, coin: CoinId, duration: Duration) {
        let resume_at = Instant::now() + duration;
        self.paused_until.lock().insert(coin, resume_at);
        warn!(?coin, ?duration, "pausing coin after order error");
    }

    fn resume(&self, coin: CoinId) {
        self.paused_until.lock().remove(&coin);
    }

    /// Buy `coin` with USDT. `usdt_quantity` defaults to `wallet_balance` (the caller's wallet
    /// balance for `coin`) when `None`, matching the source's `quantity or self._wallet.get(coin_name)`.
    pub async fn buy(
        &self,
        coin: CoinId,
        coin_name: &str,
        usdt_quantity: Option<f64>,
        wallet_balance: Option<f64>,
    ) -> Result<(), TradeError> {
        self.transact(coin, coin_name, OrderSide::Buy, usdt_quantity, wallet_balance)
            .await
    }

    /// Sell `coin` for USDT. `amount` defaults to `wallet_balance` when `None`.
    pub async fn sell(
        &self,
        coin: CoinId,
        coin_name: &str,
        amount: Option<f64>,
        wallet_balance: Option<f64>,
    ) -> Result<(), TradeError> {
        self.transact(coin, coin_name, OrderSide::Sell, amount, wallet_balance)
            .await
    }

    async fn transact(
        &self,
        coin: CoinId,
        coin_name: &str,
        side: OrderSide,
        quantity: Option<f64>,
        wallet_balance: Option<f64>,
    ) -> Result<(), TradeError> {
        if coin_name.eq_ignore_ascii_case(self.usdt_symbol_suffix) {
            return Err(TradeError::UsdtToUsdt);
        }

        if let Some(resume_at) = self.resume_at(coin) {
            return Err(TradeError::Paused(coin, resume_at));
        }

        let quantity = quantity
            .filter(|&q| q > 0.0)
            .or_else(|| wallet_balance.filter(|&q| q > 0.0))
            .ok_or(TradeError::NoQuantity)?;

        let symbol = format!("{coin_name}/{}", self.usdt_symbol_suffix);

        let markets = self.client.load_markets().await?;
        let limits = markets
            .get(&symbol)
            .copied()
            .ok_or_else(|| TradeError::UnknownMarket(symbol.clone()))?;

        let last_price = self.client.last_price(&symbol).await?;

        self.validate_order(&limits, quantity, last_price)?;

        match self.client.create_market_order(&symbol, side, quantity).await {
            Ok(()) => {
                self.resume(coin);
                info!(?coin, ?side, quantity, "order executed");
                Ok(())
            }
            Err(ClientError::Api(ApiError::InvalidAddress)) => {
                self.pause(coin, Duration::from_secs(3600));
                Err(ClientError::Api(ApiError::InvalidAddress).into())
            }
            Err(ClientError::Api(ApiError::AddressPending)) => {
                self.pause(coin, Duration::from_secs(60));
                Err(ClientError::Api(ApiError::AddressPending).into())
            }
            Err(err @ ClientError::Api(ApiError::InsufficientFunds)) => Err(err.into()),
            Err(err @ ClientError::Api(ApiError::InvalidOrder(_))) => Err(err.into()),
            Err(other) => Err(other.into()),
        }
    }

    fn validate_order(
        &self,
        limits: &MarketLimits,
        quantity: f64,
        last_price: f64,
    ) -> Result<(), TradeError> {
        let rounded = round_to_precision(quantity, limits.amount_precision);
        if rounded < limits.min_amount {
            return Err(TradeError::BelowMinimumAmount);
        }
        if let Some(min_cost) = limits.min_cost {
            if rounded * last_price < min_cost {
                return Err(TradeError::BelowMinimumCost);
            }
        }
        Ok(())
    }
}

fn round_to_precision(value: f64, precision: u32) -> f64 {
    let factor = 10f64.powi(precision as i32);
    (value * factor).floor() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_down_to_precision() {
        assert_eq!(round_to_precision(1.23456, 3), 1.234);
        assert_eq!(round_to_precision(1.0, 0), 1.0);
    }

    #[test]
    fn below_min_amount_is_rejected() {
        let limits = MarketLimits {
            min_amount: 1.0,
            min_cost: None,
            amount_precision: 4,
        };
        // exercised indirectly via Trader::validate_order in integration tests; this asserts
        // the rounding helper composes with the limits struct as expected.
        assert!(round_to_precision(0.5, limits.amount_precision) < limits.min_amount);
    }
}
