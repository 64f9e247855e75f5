//! Outer restart loop: re-enters a full exchange-factory cycle on failure, backing off between
//! attempts and waiting out any outbound network outage first.
//!
//! Grounded on `original_source/app/resilient_runner.py`'s `AutoReconnectBot`: the same
//! `_probe_network` TCP-connect-to-a-DNS-server reachability check, the same
//! wait-for-network-then-backed-off-retry shape, and the same exponential cycle backoff capped
//! at `cycle_restart_delay_max`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::sync::Notify;
use tracing::{info, warn};

use crate::error::BotError;

#[derive(Debug, Clone)]
pub struct AutoReconnectBotConfig {
    pub cycle_restart_delay: Duration,
    pub cycle_restart_delay_max: Duration,
    pub network_probe_host: String,
    pub network_probe_port: u16,
    pub network_probe_timeout: Duration,
    pub network_probe_interval: Duration,
}

impl Default for AutoReconnectBotConfig {
    fn default() -> Self {
        Self {
            cycle_restart_delay: Duration::from_secs(5),
            cycle_restart_delay_max: Duration::from_secs(90),
            network_probe_host: "1.1.1.1".to_string(),
            network_probe_port: 53,
            network_probe_timeout: Duration::from_secs(3),
            network_probe_interval: Duration::from_secs(5),
        }
    }
}

pub struct AutoReconnectBot {
    config: AutoReconnectBotConfig,
    shutdown: Arc<Notify>,
    stopped: Arc<AtomicBool>,
}

impl AutoReconnectBot {
    pub fn new(config: AutoReconnectBotConfig) -> Self {
        Self {
            config,
            shutdown: Arc::new(Notify::new()),
            stopped: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.shutdown.notify_waiters();
    }

    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Runs `run_cycle` repeatedly until `stop()` is called. Every cycle failure waits out a
    /// network outage (if any), then backs off exponentially before re-entering.
    pub async fn run<F, Fut>(&self, mut run_cycle: F)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<(), BotError>>,
    {
        let mut restart_attempt: u32 = 0;

        while !self.is_stopped() {
            match run_cycle().await {
                Ok(()) => restart_attempt = 0,
                Err(error) => {
                    restart_attempt += 1;
                    let delay = self
                        .config
                        .cycle_restart_delay
                        .mul_f64(2f64.powi((restart_attempt.saturating_sub(1)) as i32))
                        .min(self.config.cycle_restart_delay_max);
                    warn!(?error, attempt = restart_attempt, ?delay, "bot cycle failed, restarting");

                    self.wait_for_network().await;
                    if self.wait_for_shutdown(delay).await {
                        break;
                    }
                }
            }
        }

        info!("AutoReconnectBot stopped");
    }

    async fn wait_for_network(&self) {
        while !self.is_stopped() {
            if self.probe_network().await {
                return;
            }
            info!(
                interval = ?self.config.network_probe_interval,
                "network unreachable, retrying probe"
            );
            if self.wait_for_shutdown(self.config.network_probe_interval).await {
                break;
            }
        }
    }

    async fn probe_network(&self) -> bool {
        let address = (self.config.network_probe_host.as_str(), self.config.network_probe_port);
        matches!(
            tokio::time::timeout(self.config.network_probe_timeout, TcpStream::connect(address)).await,
            Ok(Ok(_))
        )
    }

    /// Waits up to `timeout` for shutdown; returns `true` if shutdown was signalled during the
    /// wait, `false` on a plain timeout.
    async fn wait_for_shutdown(&self, timeout: Duration) -> bool {
        tokio::select! {
            _ = self.shutdown.notified() => true,
            _ = tokio::time::sleep(timeout) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    #[tokio::test]
    async fn stops_after_shutdown_is_requested() {
        let bot = Arc::new(AutoReconnectBot::new(AutoReconnectBotConfig {
            cycle_restart_delay: Duration::from_millis(1),
            cycle_restart_delay_max: Duration::from_millis(2),
            network_probe_host: "127.0.0.1".to_string(),
            network_probe_port: 1,
            network_probe_timeout: Duration::from_millis(10),
            network_probe_interval: Duration::from_millis(1),
            ..AutoReconnectBotConfig::default()
        }));

        let calls = Arc::new(AtomicU32::new(0));
        let bot_clone = bot.clone();
        let calls_clone = calls.clone();

        let handle = tokio::spawn(async move {
            bot_clone
                .run(|| {
                    calls_clone.fetch_add(1, Ordering::SeqCst);
                    async { Ok(()) }
                })
                .await;
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        bot.stop();
        handle.await.unwrap();

        assert!(calls.load(Ordering::SeqCst) > 0);
    }
}
