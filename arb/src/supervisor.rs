//! Restarts a set of long-running observer tasks with bounded, backed-off attempts, and raises
//! a terminal error when an observer exceeds that budget.
//!
//! Grounded on `original_source/app/resilient_runner.py`'s `ObserverSupervisor`: the same
//! attempt counter that resets once an observer has run longer than `reset_attempts_after`, the
//! same `min(restart_delay*2^(attempts-1), max_restart_delay)` backoff, and the same "any of N
//! tasks finishing (with or without an error) triggers that one task's restart" shape.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::sync::Notify;
use tokio::task::JoinSet;
use tracing::{info, warn};

#[derive(Debug, Error)]
#[error("observer '{observer_name}' exceeded its restart budget ({attempts} attempts){}",
    last_error.as_ref().map(|e| format!(": {e}")).unwrap_or_default())]
pub struct ObserverRestartLimitExceeded {
    pub observer_name: String,
    pub attempts: u32,
    pub last_error: Option<String>,
}

type BoxFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// A named, restartable unit of work. `run` is called repeatedly by the supervisor; each
/// invocation produces a fresh future, since the observer it wraps is re-entered from scratch
/// on every restart.
pub struct ObserverTask {
    name: String,
    run: Arc<dyn Fn() -> BoxFuture + Send + Sync>,
}

impl ObserverTask {
    pub fn new<F, Fut>(name: impl Into<String>, run: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self {
            name: name.into(),
            run: Arc::new(move || Box::pin(run()) as BoxFuture),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SupervisorConfig {
    pub restart_delay: Duration,
    pub max_restart_delay: Duration,
    pub max_restart_attempts: u32,
    pub reset_attempts_after: Duration,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            restart_delay: Duration::from_secs(3),
            max_restart_delay: Duration::from_secs(30),
            max_restart_attempts: 5,
            reset_attempts_after: Duration::from_secs(60),
        }
    }
}

pub struct ObserverSupervisor {
    observers: Vec<ObserverTask>,
    config: SupervisorConfig,
    stop: Arc<Notify>,
    stopped: Arc<AtomicBool>,
}

impl ObserverSupervisor {
    pub fn new(observers: Vec<ObserverTask>, config: SupervisorConfig) -> Self {
        Self {
            observers,
            config,
            stop: Arc::new(Notify::new()),
            stopped: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.stop.notify_waiters();
    }

    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Runs every observer's restart loop concurrently until either `stop()` is called or one
    /// of them exceeds its restart budget, in which case that error propagates and every other
    /// observer is aborted.
    pub async fn run(&self) -> Result<(), ObserverRestartLimitExceeded> {
        let mut tasks: JoinSet<Result<(), ObserverRestartLimitExceeded>> = JoinSet::new();

        for observer in &self.observers {
            let name = observer.name.clone();
            let run = observer.run.clone();
            let config = self.config;
            let stop = self.stop.clone();
            let stopped = self.stopped.clone();

            tasks.spawn(async move { Self::run_single_observer(name, run, config, stop, stopped).await });
        }

        let result = loop {
            if self.is_stopped() || tasks.is_empty() {
                break Ok(());
            }

            match tasks.join_next().await {
                Some(Ok(Ok(()))) => continue,
                Some(Ok(Err(limit_exceeded))) => break Err(limit_exceeded),
                Some(Err(join_error)) => {
                    warn!(?join_error, "observer task panicked");
                    continue;
                }
                None => break Ok(()),
            }
        };

        self.stop();
        tasks.abort_all();
        while tasks.join_next().await.is_some() {}

        result
    }

    async fn run_single_observer(
        name: String,
        run: Arc<dyn Fn() -> BoxFuture + Send + Sync>,
        config: SupervisorConfig,
        stop: Arc<Notify>,
        stopped: Arc<AtomicBool>,
    ) -> Result<(), ObserverRestartLimitExceeded> {
        let mut attempts: u32 = 0;

        while !stopped.load(Ordering::SeqCst) {
            let started_at = Instant::now();
            run().await;
            let runtime = started_at.elapsed();

            if runtime >= config.reset_attempts_after {
                attempts = 0;
            } else {
                attempts += 1;
            }

            if stopped.load(Ordering::SeqCst) {
                break;
            }

            if config.max_restart_attempts > 0 && attempts > config.max_restart_attempts {
                return Err(ObserverRestartLimitExceeded {
                    observer_name: name,
                    attempts,
                    last_error: None,
                });
            }

            let delay = config
                .restart_delay
                .mul_f64(2f64.powi(attempts.saturating_sub(1) as i32))
                .min(config.max_restart_delay);
            info!(observer = %name, ?delay, attempts, "restarting observer");

            tokio::select! {
                _ = stop.notified() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    #[tokio::test]
    async fn stops_cleanly_when_stop_is_called() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = calls.clone();
        let task = ObserverTask::new("test", move || {
            let calls = calls_clone.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
            }
        });

        let supervisor = Arc::new(ObserverSupervisor::new(
            vec![task],
            SupervisorConfig {
                restart_delay: Duration::from_millis(5),
                max_restart_delay: Duration::from_millis(10),
                max_restart_attempts: 1000,
                reset_attempts_after: Duration::from_secs(60),
            },
        ));

        let run_supervisor = supervisor.clone();
        let handle = tokio::spawn(async move { run_supervisor.run().await });

        tokio::time::sleep(Duration::from_millis(30)).await;
        supervisor.stop();

        let result = handle.await.unwrap();
        assert!(result.is_ok());
        assert!(calls.load(Ordering::SeqCst) > 0);
    }

    #[tokio::test]
    async fn exceeding_restart_budget_raises() {
        let task = ObserverTask::new("flaky", || async {});

        let supervisor = ObserverSupervisor::new(
            vec![task],
            SupervisorConfig {
                restart_delay: Duration::from_millis(1),
                max_restart_delay: Duration::from_millis(1),
                max_restart_attempts: 2,
                reset_attempts_after: Duration::from_secs(60),
            },
        );

        let result = supervisor.run().await;
        assert!(result.is_err());
    }
}
