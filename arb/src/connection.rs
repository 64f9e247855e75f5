//! Owns one exchange's session: connects, holds it, detects faults, reconnects with
//! exponential backoff, and hands callers a scoped session guard.
//!
//! Grounded on `original_source/infrastructure/Connection.py`: the same state machine
//! (`Disabled -> Disconnected -> Connecting -> Connected`), the same per-error backoff table,
//! and the same three-event shutdown watcher (stream fault / stop requested / 24h rotation),
//! replacing the source's `asyncio.Event`s with a `tokio::sync::watch` channel and the
//! `@asynccontextmanager` session with an RAII guard.

use arb_data::client::MarketDataClient;
use arb_execution::client::ExchangeClient;
use arb_execution::error::{ApiError, ClientError, ConnectivityError};
use arb_instrument::ExchangeId;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Notify, OwnedRwLockReadGuard, RwLock};
use tracing::{debug, info, warn};

const RETRY_COUNT_LIMIT: u32 = 2;
const BASE_DELAY: Duration = Duration::from_secs(1);
const MAX_DELAY: Duration = Duration::from_secs(60);
const LOAD_MARKETS_TIMEOUT: Duration = Duration::from_secs(30);
const SHUTDOWN_ROTATION: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disabled,
    Disconnected,
    Connecting,
    Connected,
}

/// A scoped acquisition of the underlying client. Callers invoke SDK methods through
/// [`SessionGuard::get`]; a `None` return means the session faulted out from under the
/// caller and a reconnect has already been scheduled. Releasing the read lock on `Drop` is
/// what makes this the RAII equivalent of the source's `@asynccontextmanager`.
pub struct SessionGuard<C> {
    guard: OwnedRwLockReadGuard<Option<C>>,
}

impl<C> SessionGuard<C> {
    pub fn get(&self) -> Option<&C> {
        self.guard.as_ref()
    }
}

/// Owns one exchange's connection lifecycle. `C` is the concrete client type satisfying both
/// `ExchangeClient` (orders/withdrawals) and `MarketDataClient` (streams) - the thing the
/// teacher's own SDK wrapper would be.
pub struct Connection<C> {
    exchange: ExchangeId,
    factory: Box<dyn Fn() -> C + Send + Sync>,
    state_tx: watch::Sender<ConnectionState>,
    client: Arc<RwLock<Option<C>>>,
    fault: Notify,
    stop: Notify,
    shutdown_spawned: AtomicBool,
}

impl<C> Connection<C>
where
    C: ExchangeClient + MarketDataClient + Clone + Send + Sync + 'static,
{
    pub fn new(exchange: ExchangeId, factory: impl Fn() -> C + Send + Sync + 'static) -> Arc<Self> {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        Arc::new(Self {
            exchange,
            factory: Box::new(factory),
            state_tx,
            client: Arc::new(RwLock::new(None)),
            fault: Notify::new(),
            stop: Notify::new(),
            shutdown_spawned: AtomicBool::new(false),
        })
    }

    pub fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    pub fn working(&self) -> bool {
        self.state() != ConnectionState::Disabled
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Waits until the connection reaches `Connected` or `Disabled`. Returns `true` iff
    /// `Connected` is reached first.
    pub async fn wait_ready(&self) -> bool {
        let mut rx = self.state_tx.subscribe();
        loop {
            match *rx.borrow() {
                ConnectionState::Connected => return true,
                ConnectionState::Disabled => return false,
                _ => {}
            }
            if rx.changed().await.is_err() {
                return false;
            }
        }
    }

    /// A scoped acquisition of the underlying client, cheap to take repeatedly.
    pub async fn session(self: &Arc<Self>) -> SessionGuard<C> {
        SessionGuard {
            guard: Arc::clone(&self.client).read_owned().await,
        }
    }

    /// Requests a graceful stop. Idempotent.
    pub fn stop(&self) {
        self.state_tx.send_replace(ConnectionState::Disabled);
        self.stop.notify_waiters();
    }

    async fn disconnect(&self, ignore: bool) {
        if !self.is_connected() && !ignore {
            return;
        }
        if self.state() != ConnectionState::Disabled {
            let _ = self.state_tx.send(ConnectionState::Disconnected);
        }
        *self.client.write().await = None;
        info!(exchange = ?self.exchange, "connection closed");
    }

    /// Runs the connection attempt loop: up to [`RETRY_COUNT_LIMIT`] attempts with
    /// exponential backoff, honoring per-error-category delays. On success, spawns the
    /// shutdown watcher exactly once and returns; on exhaustion, transitions to `Disabled`.
    pub async fn connect(self: &Arc<Self>) {
        if !self.working() || self.is_connected() {
            return;
        }

        for attempt in 0..RETRY_COUNT_LIMIT {
            if !self.working() {
                return;
            }

            let delay = std::cmp::min(BASE_DELAY * 2u32.pow(attempt), MAX_DELAY);
            tokio::time::sleep(delay).await;

            info!(exchange = ?self.exchange, attempt, "connection attempt");
            let _ = self.state_tx.send(ConnectionState::Connecting);

            let candidate = (self.factory)();
            let load = tokio::time::timeout(LOAD_MARKETS_TIMEOUT, candidate.load_markets()).await;

            match load {
                Ok(Ok(_markets)) => {
                    *self.client.write().await = Some(candidate);
                    let _ = self.state_tx.send(ConnectionState::Connected);
                    info!(exchange = ?self.exchange, "connected and loaded markets");
                    self.spawn_shutdown_watcher_once();
                    return;
                }
                Ok(Err(error)) => {
                    if self.handle_connect_error(error, delay).await {
                        break;
                    }
                    continue;
                }
                Err(_elapsed) => {
                    warn!(exchange = ?self.exchange, "load_markets timed out");
                    continue;
                }
            }
        }

        if self.working() {
            self.stop();
            tracing::error!(exchange = ?self.exchange, "reconnection attempts exhausted");
        }
    }

    /// Returns `true` if the connect loop should abandon retrying (terminal auth failure).
    async fn handle_connect_error(&self, error: ClientError, delay: Duration) -> bool {
        match error {
            ClientError::Api(ApiError::Authentication) | ClientError::Api(ApiError::PermissionDenied) => {
                tracing::error!(exchange = ?self.exchange, "critical auth error, disabling");
                self.stop();
                true
            }
            ClientError::Connectivity(ConnectivityError::DdosProtection { retry_after_ms }) => {
                let wait = retry_after_ms
                    .map(Duration::from_millis)
                    .unwrap_or(delay * 3);
                warn!(exchange = ?self.exchange, ?wait, "ddos protection");
                tokio::time::sleep(wait).await;
                false
            }
            ClientError::Connectivity(ConnectivityError::Maintenance) => {
                warn!(exchange = ?self.exchange, "exchange under maintenance, waiting 5 minutes");
                tokio::time::sleep(Duration::from_secs(300)).await;
                false
            }
            ClientError::Api(ApiError::RateLimit { retry_after_ms }) => {
                let wait = retry_after_ms
                    .map(Duration::from_millis)
                    .unwrap_or(delay * 2);
                warn!(exchange = ?self.exchange, ?wait, "rate limit exceeded");
                tokio::time::sleep(wait).await;
                false
            }
            ClientError::Connectivity(
                ConnectivityError::Timeout
                | ConnectivityError::Socket(_)
                | ConnectivityError::ExchangeOffline(_),
            ) => {
                warn!(exchange = ?self.exchange, ?error, "connection attempt failed");
                false
            }
            other => {
                warn!(exchange = ?self.exchange, error = ?other, "unexpected error connecting");
                false
            }
        }
    }

    fn spawn_shutdown_watcher_once(self: &Arc<Self>) {
        if self.shutdown_spawned.swap(true, Ordering::SeqCst) {
            return;
        }
        let this = Arc::clone(self);
        tokio::spawn(async move { this.shutdown_watcher().await });
    }

    /// Races stream-fault, stop-requested and 24h-rotation; exactly one wins and the loser
    /// branches are dropped.
    async fn shutdown_watcher(self: Arc<Self>) {
        loop {
            if !self.working() {
                return;
            }
            tokio::select! {
                _ = self.fault.notified() => {
                    info!(exchange = ?self.exchange, "shutdown signal received, reconnecting");
                    self.disconnect(true).await;
                    self.shutdown_spawned.store(false, Ordering::SeqCst);
                    self.connect().await;
                    return;
                }
                _ = self.stop.notified() => {
                    info!(exchange = ?self.exchange, "stop requested");
                    self.disconnect(false).await;
                    return;
                }
                _ = tokio::time::sleep(SHUTDOWN_ROTATION) => {
                    warn!(exchange = ?self.exchange, "24h elapsed, rotating session");
                    self.disconnect(true).await;
                    self.shutdown_spawned.store(false, Ordering::SeqCst);
                    self.connect().await;
                    return;
                }
            }
        }
    }

    /// Called by observers when a stream fault is detected mid-session: marks the session
    /// disconnected and wakes the shutdown watcher to reconnect.
    pub fn report_fault(&self) {
        debug!(exchange = ?self.exchange, "stream fault reported");
        self.fault.notify_waiters();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arb_data::client::{DataError, RawTicker};
    use arb_execution::error::ClientError as ExecClientError;
    use arb_instrument::{AssetBalance, Coin, CoinId};
    use std::collections::HashMap;
    use std::sync::atomic::AtomicU32;

    #[derive(Clone)]
    struct Stub {
        fail_times: Arc<AtomicU32>,
    }

    impl ExchangeClient for Stub {
        const EXCHANGE: ExchangeId = ExchangeId::Okx;
        type AccountStream = futures::stream::Empty<Result<AssetBalance<CoinId>, ExecClientError>>;

        async fn account_stream(&self) -> Result<Self::AccountStream, ExecClientError> {
            Ok(futures::stream::empty())
        }

        async fn fetch_balances(&self) -> Result<Vec<AssetBalance<CoinId>>, ExecClientError> {
            Ok(vec![])
        }

        async fn load_markets(
            &self,
        ) -> Result<HashMap<String, arb_execution::client::MarketLimits>, ExecClientError> {
            if self.fail_times.fetch_sub(1, Ordering::SeqCst) > 0 {
                return Err(ExecClientError::Connectivity(ConnectivityError::Timeout));
            }
            Ok(HashMap::new())
        }

        async fn last_price(&self, _symbol: &str) -> Result<f64, ExecClientError> {
            Ok(1.0)
        }

        async fn create_market_order(
            &self,
            _symbol: &str,
            _side: arb_execution::client::OrderSide,
            _amount: f64,
        ) -> Result<(), ExecClientError> {
            Ok(())
        }

        async fn withdraw(
            &self,
            _coin: &Coin,
            _amount: f64,
            _address: &str,
            _tag: Option<&str>,
        ) -> Result<(), ExecClientError> {
            Ok(())
        }

        async fn fetch_deposit_address(
            &self,
            _coin_name: &str,
            _network: &str,
        ) -> Result<String, ExecClientError> {
            Ok("addr".into())
        }

        async fn fetch_currencies(&self) -> Result<HashMap<String, Vec<Coin>>, ExecClientError> {
            Ok(HashMap::new())
        }
    }

    impl MarketDataClient for Stub {
        const EXCHANGE: ExchangeId = ExchangeId::Okx;
        type BalanceStream = futures::stream::Empty<Result<AssetBalance<CoinId>, DataError>>;
        type TickerStream = futures::stream::Empty<Result<RawTicker, DataError>>;

        async fn fetch_balance(&self) -> Result<Vec<AssetBalance<CoinId>>, DataError> {
            Ok(vec![])
        }

        async fn watch_balance(&self) -> Result<Self::BalanceStream, DataError> {
            Ok(futures::stream::empty())
        }

        async fn watch_tickers(&self, _symbols: Vec<String>) -> Result<Self::TickerStream, DataError> {
            Ok(futures::stream::empty())
        }
    }

    #[tokio::test]
    async fn connects_successfully_on_first_try() {
        let fail_times = Arc::new(AtomicU32::new(0));
        let conn = Connection::new(ExchangeId::Okx, move || Stub {
            fail_times: fail_times.clone(),
        });
        conn.connect().await;
        assert!(conn.is_connected());
        assert!(conn.wait_ready().await);
    }

    #[tokio::test]
    async fn stop_transitions_to_disabled() {
        let fail_times = Arc::new(AtomicU32::new(0));
        let conn = Connection::new(ExchangeId::Okx, move || Stub {
            fail_times: fail_times.clone(),
        });
        conn.connect().await;
        conn.stop();
        assert!(!conn.working());
        assert!(!conn.wait_ready().await);
    }
}
