//! Per-exchange subscriber that turns balance updates into trades, transfers, or a postponed
//! re-consultation.
//!
//! Grounded on `original_source/core/services/Execution/Manager.py` (the authoritative
//! implementation, not the legacy `infrastructure/Manager.py`): the same pending-coin map
//! guarded by a per-coin lock, the same `consultation`/`postponed_consultation` pair, and the
//! same dispatch on `Recommendation` to buy/sell/withdraw-or-sell.

use std::collections::HashMap;
use std::sync::Arc;

use arb_data::subscriber::BalanceSubscriber;
use arb_instrument::{CoinId, ExchangeId};
use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{error, warn};

use crate::analyst::Analyst;
use crate::brain::Brain;
use crate::dto::{Asset, Recommendation};
use crate::exchange::{Exchange, ExchangeRegistry};
use crate::mapper::Mapper;

/// Drives one exchange's response to its own balance updates: consults the [`Brain`] and acts
/// on the recommendation, debouncing concurrent updates for the same coin behind a pending map.
pub struct Manager<C> {
    exchange: Arc<Exchange<C>>,
    registry: ExchangeRegistry,
    mapper: Arc<Mapper>,
    analyst: Arc<Analyst>,
    additive: f64,
    pending: Mutex<HashMap<CoinId, f64>>,
}

impl<C> Manager<C>
where
    C: arb_execution::client::ExchangeClient
        + arb_data::client::MarketDataClient
        + Clone
        + Send
        + Sync
        + 'static,
{
    pub fn new(
        exchange: Arc<Exchange<C>>,
        registry: ExchangeRegistry,
        mapper: Arc<Mapper>,
        analyst: Arc<Analyst>,
        additive: f64,
    ) -> Arc<Self> {
        Arc::new(Self {
            exchange,
            registry,
            mapper,
            analyst,
            additive,
            pending: Mutex::new(HashMap::new()),
        })
    }

    async fn check_pending(&self, coin_id: CoinId) -> bool {
        self.pending.lock().await.contains_key(&coin_id)
    }

    async fn set_pending(&self, coin_id: CoinId, amount: f64) {
        self.pending.lock().await.insert(coin_id, amount);
    }

    async fn take_pending(&self, coin_id: CoinId) -> Option<f64> {
        self.pending.lock().await.remove(&coin_id)
    }

    async fn remove_pending(&self, coin_id: CoinId) {
        self.pending.lock().await.remove(&coin_id);
    }

    pub async fn consultation(&self, asset: Asset) {
        let brain = Brain::new(&self.mapper, self.additive);
        let recommendation = brain.analyse(&self.analyst, self.exchange.id, asset);

        match recommendation {
            Recommendation::Wait { seconds } => {
                self.set_pending(asset.coin_id, asset.amount).await;
                self.postponed_consultation(seconds, asset.coin_id).await;
            }
            Recommendation::Trade { sell_coin, buy_coin } => {
                self.execute_trade(sell_coin, buy_coin, asset).await;
                self.remove_pending(asset.coin_id).await;
            }
            Recommendation::Transfer {
                coin_id,
                departure,
                destination,
            } => {
                self.execute_transfer(coin_id, departure, destination, asset)
                    .await;
                self.remove_pending(asset.coin_id).await;
            }
        }
    }

    async fn execute_trade(&self, sell_coin: CoinId, buy_coin: CoinId, asset: Asset) {
        let usdt = self.mapper.usdt().ok();
        let result = if Some(sell_coin) == usdt {
            let Some(name) = self.mapper.name_for(self.exchange.id, buy_coin) else {
                error!(?buy_coin, "coin name unknown, cannot buy");
                return;
            };
            self.exchange.buy(buy_coin, name, None).await
        } else {
            let Some(name) = self.mapper.name_for(self.exchange.id, sell_coin) else {
                error!(?sell_coin, "coin name unknown, cannot sell");
                return;
            };
            self.exchange.sell(sell_coin, name, Some(asset.amount)).await
        };

        if let Err(error) = result {
            error!(?error, "trade failed");
        }
    }

    async fn execute_transfer(
        &self,
        coin_id: CoinId,
        departure: ExchangeId,
        destination: ExchangeId,
        asset: Asset,
    ) {
        if self.exchange.id != departure {
            error!(exchange = ?self.exchange.id, ?departure, "transfer recommended from a different exchange than self");
            return;
        }

        let mut transferred = false;

        if let Some(coin) = self
            .mapper
            .best_coin_transfer(departure, destination, coin_id)
            .cloned()
        {
            if let Some(target) = self.registry.get(&destination) {
                match self
                    .exchange
                    .withdraw(target.as_ref(), &coin, asset.amount)
                    .await
                {
                    Ok(true) => transferred = true,
                    Ok(false) => {
                        warn!(?coin_id, ?destination, "withdrawal declined by exchange");
                    }
                    Err(error) => {
                        error!(?error, ?coin_id, ?destination, "withdrawal failed");
                    }
                }
            } else {
                error!(?destination, "destination exchange not found in registry");
            }
        } else {
            error!(?coin_id, ?departure, ?destination, "no transfer route available");
        }

        if !transferred {
            if let Some(name) = self.mapper.name_for(self.exchange.id, coin_id) {
                if let Err(error) = self.exchange.sell(coin_id, name, Some(asset.amount)).await {
                    error!(?error, "fallback sell after failed transfer also failed");
                }
            }
        }
    }

    async fn postponed_consultation(&self, seconds: u64, coin_id: CoinId) {
        tokio::time::sleep(std::time::Duration::from_secs(seconds)).await;
        if let Some(amount) = self.take_pending(coin_id).await {
            Box::pin(self.consultation(Asset::new(coin_id, amount))).await;
        }
    }
}

#[async_trait]
impl<C> BalanceSubscriber for Manager<C>
where
    C: arb_execution::client::ExchangeClient
        + arb_data::client::MarketDataClient
        + Clone
        + Send
        + Sync
        + 'static,
{
    async fn on_balance_update(&self, exchange: ExchangeId, coin_id: CoinId, amount: f64) {
        if exchange != self.exchange.id {
            return;
        }

        if self.check_pending(coin_id).await {
            self.set_pending(coin_id, amount).await;
        } else {
            self.consultation(Asset::new(coin_id, amount)).await;
        }
    }
}
