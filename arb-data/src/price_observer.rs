use crate::client::{DataError, MarketDataClient, RawTicker};
use crate::subscriber::PriceSubscriber;
use arb_instrument::{CoinId, ExchangeId};
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Venues that cannot watch an unbounded number of symbols in a single ticker subscription;
/// the symbol list is split into chunks of this size and each chunk watched concurrently.
/// Matches the two venues `original_source/infrastructure/services/PriceObserver.py`
/// special-cases for chunked subscription.
fn chunk_size(exchange: ExchangeId) -> Option<usize> {
    match exchange {
        ExchangeId::Kucoin => Some(10),
        ExchangeId::Okx => Some(45),
        _ => None,
    }
}

/// Streams ticker prices for a configured coin set and fans resolved prices out to
/// subscribers. Grounded on `PriceObserver.py`: builds `{NAME}/USDT` symbols (USDT itself is
/// never subscribed), resolves each update via `ask ?? last_price ?? info.last_price ?? 0`,
/// and treats a venue reporting `BadSymbol` as a 5s-sleep-and-continue rather than exiting.
pub struct PriceObserver<C> {
    exchange: ExchangeId,
    client: C,
    symbols: RwLock<HashMap<CoinId, String>>,
    subscribers: RwLock<Vec<Arc<dyn PriceSubscriber>>>,
}

impl<C> PriceObserver<C>
where
    C: MarketDataClient,
{
    pub fn new(exchange: ExchangeId, client: C) -> Self {
        Self {
            exchange,
            client,
            symbols: RwLock::new(HashMap::new()),
            subscribers: RwLock::new(Vec::new()),
        }
    }

    /// Register coins to watch, building the `{NAME}/USDT` symbol for each. `usdt_coin` is
    /// excluded - it is never subscribed against itself.
    pub async fn configure(&self, coins: &[(CoinId, String)], usdt_coin: CoinId) {
        let mut symbols = self.symbols.write().await;
        symbols.clear();
        for (coin_id, name) in coins {
            if *coin_id == usdt_coin {
                continue;
            }
            symbols.insert(*coin_id, format!("{name}/USDT"));
        }
    }

    pub async fn subscribe(&self, subscriber: Arc<dyn PriceSubscriber>) {
        let mut subs = self.subscribers.write().await;
        if !subs.iter().any(|existing| Arc::ptr_eq(existing, &subscriber)) {
            subs.push(subscriber);
        }
    }

    pub async fn unsubscribe(&self, subscriber: &Arc<dyn PriceSubscriber>) {
        self.subscribers
            .write()
            .await
            .retain(|existing| !Arc::ptr_eq(existing, subscriber));
    }

    async fn notify(&self, coin_id: CoinId, price: f64) {
        let subs = self.subscribers.read().await.clone();
        let futures = subs
            .iter()
            .map(|sub| sub.on_price_update(self.exchange, coin_id, price));
        futures::future::join_all(futures).await;
    }

    pub async fn launch(&self) {
        loop {
            match self.observe_once().await {
                Ok(()) => {}
                Err(error) if error.is_terminal() => {
                    warn!(exchange = ?self.exchange, ?error, "price stream terminated permanently");
                    return;
                }
                Err(DataError::BadSymbol(symbol)) => {
                    warn!(exchange = ?self.exchange, symbol, "bad symbol, continuing");
                    tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                }
                Err(error) => {
                    if let Some(delay) = error.retry_delay() {
                        warn!(exchange = ?self.exchange, ?error, ?delay, "price stream error, retrying");
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }
    }

    async fn observe_once(&self) -> Result<(), DataError> {
        let symbols: Vec<String> = self.symbols.read().await.values().cloned().collect();
        if symbols.is_empty() {
            tokio::time::sleep(std::time::Duration::from_secs(1)).await;
            return Ok(());
        }

        match chunk_size(self.exchange) {
            Some(size) => {
                let chunks: Vec<Vec<String>> =
                    symbols.chunks(size).map(|c| c.to_vec()).collect();
                let results = futures::future::join_all(
                    chunks.into_iter().map(|chunk| self.stream_chunk(chunk)),
                )
                .await;
                for result in results {
                    result?;
                }
                Ok(())
            }
            None => self.stream_chunk(symbols).await,
        }
    }

    async fn stream_chunk(&self, symbols: Vec<String>) -> Result<(), DataError> {
        let mut stream = self.client.watch_tickers(symbols).await?;
        while let Some(update) = stream.next().await {
            let ticker = update?;
            self.handle_update(ticker).await;
        }
        Ok(())
    }

    async fn handle_update(&self, ticker: RawTicker) {
        let price = resolve_price(&ticker);
        if price <= 0.0 {
            warn!(exchange = ?self.exchange, coin_id = ?ticker.coin_id, "no usable price in ticker update");
            return;
        }
        info!(exchange = ?self.exchange, coin_id = ?ticker.coin_id, price, "price updated");
        self.notify(ticker.coin_id, price).await;
    }
}

/// `ask ?? last_price ?? info.last_price ?? 0`, matching the source's resolution chain.
fn resolve_price(ticker: &RawTicker) -> f64 {
    ticker
        .ask
        .or(ticker.last_price)
        .or(ticker.info_last_price)
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ticker(ask: Option<f64>, last: Option<f64>, info: Option<f64>) -> RawTicker {
        RawTicker {
            coin_id: CoinId(1),
            ask,
            last_price: last,
            info_last_price: info,
        }
    }

    #[test]
    fn prefers_ask_over_last_price() {
        assert_eq!(resolve_price(&ticker(Some(10.0), Some(20.0), None)), 10.0);
    }

    #[test]
    fn falls_back_to_last_price() {
        assert_eq!(resolve_price(&ticker(None, Some(20.0), Some(30.0))), 20.0);
    }

    #[test]
    fn falls_back_to_info_last_price() {
        assert_eq!(resolve_price(&ticker(None, None, Some(30.0))), 30.0);
    }

    #[test]
    fn defaults_to_zero_when_all_absent() {
        assert_eq!(resolve_price(&ticker(None, None, None)), 0.0);
    }

    #[test]
    fn chunk_size_matches_known_venue_limits() {
        assert_eq!(chunk_size(ExchangeId::Kucoin), Some(10));
        assert_eq!(chunk_size(ExchangeId::Okx), Some(45));
        assert_eq!(chunk_size(ExchangeId::Kraken), None);
    }
}
