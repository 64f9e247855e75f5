use crate::client::{DataError, MarketDataClient};
use crate::subscriber::BalanceSubscriber;
use arb_instrument::{CoinId, ExchangeId};
use futures::StreamExt;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Wallet deltas smaller than this collapse to exactly zero, matching the source's treatment
/// of floating point dust left over from repeated small balance adjustments.
pub const EPSILON: f64 = 1e-6;

/// Streams an exchange's private balance feed, maintains the coin-keyed wallet, and fans
/// every non-dust change out to subscribers under a per-coin lock.
///
/// Grounded on `original_source/infrastructure/services/BalanceObserver.py`: `prepare()`
/// seeds the wallet from a one-shot fetch, then `launch()` loops the streaming diff forever,
/// applying the error-policy table in [`DataError::retry_delay`]/[`DataError::is_terminal`].
pub struct BalanceObserver<C> {
    exchange: ExchangeId,
    client: C,
    wallet: RwLock<HashMap<CoinId, Arc<Mutex<f64>>>>,
    subscribers: RwLock<Vec<Arc<dyn BalanceSubscriber>>>,
}

impl<C> BalanceObserver<C>
where
    C: MarketDataClient,
{
    pub fn new(exchange: ExchangeId, client: C) -> Self {
        Self {
            exchange,
            client,
            wallet: RwLock::new(HashMap::new()),
            subscribers: RwLock::new(Vec::new()),
        }
    }

    pub fn subscribe(&self, subscriber: Arc<dyn BalanceSubscriber>) {
        let mut subs = self.subscribers.write();
        if !subs.iter().any(|existing| Arc::ptr_eq(existing, &subscriber)) {
            subs.push(subscriber);
        }
    }

    pub fn unsubscribe(&self, subscriber: &Arc<dyn BalanceSubscriber>) {
        self.subscribers
            .write()
            .retain(|existing| !Arc::ptr_eq(existing, subscriber));
    }

    /// Snapshot of every coin currently held, by [`CoinId`].
    pub fn balance_snapshot(&self) -> HashMap<CoinId, f64> {
        self.wallet
            .read()
            .iter()
            .map(|(coin_id, amount)| (*coin_id, *amount.lock()))
            .collect()
    }

    fn coin_lock(&self, coin_id: CoinId) -> Arc<Mutex<f64>> {
        if let Some(lock) = self.wallet.read().get(&coin_id) {
            return lock.clone();
        }
        self.wallet
            .write()
            .entry(coin_id)
            .or_insert_with(|| Arc::new(Mutex::new(0.0)))
            .clone()
    }

    async fn prepare(&self) -> Result<(), DataError> {
        let balances = self.client.fetch_balance().await?;
        for balance in balances {
            let amount = rust_decimal::prelude::ToPrimitive::to_f64(&balance.balance.total)
                .unwrap_or(0.0);
            let lock = self.coin_lock(balance.asset);
            *lock.lock() = collapse_dust(amount);
        }
        Ok(())
    }

    async fn notify(&self, coin_id: CoinId, amount: f64) {
        let subs = self.subscribers.read().clone();
        let futures = subs
            .iter()
            .map(|sub| sub.on_balance_update(self.exchange, coin_id, amount));
        futures::future::join_all(futures).await;
    }

    /// Run forever: seed the wallet, then stream diffs until a terminal error is hit.
    pub async fn launch(&self) {
        loop {
            if let Err(error) = self.prepare().await {
                error!(exchange = ?self.exchange, ?error, "failed to prepare balance snapshot");
                if error.is_terminal() {
                    return;
                }
                if let Some(delay) = error.retry_delay() {
                    tokio::time::sleep(delay).await;
                }
                continue;
            }

            match self.stream_once().await {
                Ok(()) => {}
                Err(error) if error.is_terminal() => {
                    warn!(exchange = ?self.exchange, ?error, "balance stream terminated permanently");
                    return;
                }
                Err(error) => {
                    if let Some(delay) = error.retry_delay() {
                        warn!(exchange = ?self.exchange, ?error, ?delay, "balance stream error, retrying");
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }
    }

    async fn stream_once(&self) -> Result<(), DataError> {
        let mut stream = self.client.watch_balance().await?;
        while let Some(update) = stream.next().await {
            let update = update?;
            let amount = rust_decimal::prelude::ToPrimitive::to_f64(&update.balance.total)
                .unwrap_or(0.0);
            let amount = collapse_dust(amount);

            let lock = self.coin_lock(update.asset);
            let changed = {
                let mut current = lock.lock();
                let changed = (*current - amount).abs() > EPSILON;
                *current = amount;
                changed
            };

            if changed {
                info!(exchange = ?self.exchange, coin_id = ?update.asset, amount, "balance updated");
                self.notify(update.asset, amount).await;
            }
        }
        Ok(())
    }
}

fn collapse_dust(amount: f64) -> f64 {
    if amount.abs() < EPSILON { 0.0 } else { amount }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_dust_below_epsilon() {
        assert_eq!(collapse_dust(0.0000001), 0.0);
        assert_eq!(collapse_dust(-0.0000001), 0.0);
        assert_eq!(collapse_dust(1.5), 1.5);
    }

    #[tokio::test]
    async fn coin_lock_is_stable_across_lookups() {
        struct Stub;
        impl MarketDataClient for Stub {
            const EXCHANGE: ExchangeId = ExchangeId::Okx;
            type BalanceStream = futures::stream::Empty<Result<arb_instrument::AssetBalance<CoinId>, DataError>>;
            type TickerStream = futures::stream::Empty<Result<crate::client::RawTicker, DataError>>;

            async fn fetch_balance(
                &self,
            ) -> Result<Vec<arb_instrument::AssetBalance<CoinId>>, DataError> {
                Ok(vec![])
            }

            async fn watch_balance(&self) -> Result<Self::BalanceStream, DataError> {
                Ok(futures::stream::empty())
            }

            async fn watch_tickers(
                &self,
                _symbols: Vec<String>,
            ) -> Result<Self::TickerStream, DataError> {
                Ok(futures::stream::empty())
            }
        }

        let observer = BalanceObserver::new(ExchangeId::Okx, Stub);
        let coin = CoinId(1);
        let a = observer.coin_lock(coin);
        let b = observer.coin_lock(coin);
        assert!(Arc::ptr_eq(&a, &b));
    }
}
