//! Wires one full bot cycle: connects every configured exchange, ingests its coin catalog into
//! the shared [`Mapper`], subscribes the [`Analyst`] to prices and each exchange's [`Manager`]
//! to balances, and supervises the resulting observer tasks until one exceeds its restart
//! budget or the cycle is asked to stop.
//!
//! Grounded on `original_source/app/__main__.py` (per-exchange `Connection` + observers) and
//! `app/resilient_runner.py`'s `_run_cycle`/`_build_observers`, extended with the `Mapper`/
//! `Analyst`/`Brain`/`Manager` wiring those sources never assembled explicitly. `C` is left
//! generic rather than fixed to one venue binding: the concrete `ExchangeClient`/
//! `MarketDataClient` implementation is the external SDK contract this workspace only pins
//! (see `arb_execution::client`/`arb_data::client`).

use std::collections::HashMap;
use std::sync::Arc;

use arb_data::client::MarketDataClient;
use arb_execution::client::ExchangeClient;
use arb_execution::courier::DepositTarget;
use arb_instrument::ExchangeId;
use tracing::{error, info, warn};

use crate::analyst::Analyst;
use crate::config::Config;
use crate::connection::Connection;
use crate::error::BotError;
use crate::exchange::{Exchange, ExchangeRegistry};
use crate::manager::Manager;
use crate::mapper::Mapper;
use crate::supervisor::{ObserverSupervisor, ObserverTask, SupervisorConfig};

/// Runs a single cycle: connect every enabled exchange, ingest catalogs, wire observers, then
/// block inside [`ObserverSupervisor::run`] until it returns.
pub async fn run_cycle<C>(
    config: &Config,
    enabled: &[ExchangeId],
    client_factory: impl Fn(ExchangeId) -> C + Send + Sync + 'static,
    mapper: Arc<Mapper>,
    analyst: Arc<Analyst>,
    additive: f64,
    supervisor_config: SupervisorConfig,
) -> Result<(), BotError>
where
    C: ExchangeClient + MarketDataClient + Clone + Send + Sync + 'static,
{
    let client_factory = Arc::new(client_factory);
    let mut exchanges = Vec::new();

    for &exchange in enabled {
        if !config.exchanges.contains_key(&exchange) {
            warn!(?exchange, "no credentials configured, skipping");
            continue;
        }

        let factory = client_factory.clone();
        let connection = Connection::new(exchange, move || factory(exchange));
        connection.connect().await;

        if !connection.wait_ready().await {
            error!(?exchange, "failed to reach a connected state, skipping this cycle");
            continue;
        }

        let client = client_factory(exchange);
        let facade = Exchange::new(exchange, connection, client);
        exchanges.push(facade);
    }

    if exchanges.is_empty() {
        warn!("no exchanges connected this cycle");
        return Ok(());
    }

    let registry: ExchangeRegistry = exchanges
        .iter()
        .map(|exchange| (exchange.id, exchange.clone() as Arc<dyn DepositTarget>))
        .collect();

    let mut catalogs = HashMap::new();
    for exchange in &exchanges {
        match exchange.current_coins().await {
            Ok(raw) => {
                catalogs.insert(exchange.id, raw);
            }
            Err(error) => error!(exchange = ?exchange.id, ?error, "failed to fetch coin catalog"),
        }
    }

    let mut mapper_mut = (*mapper).clone();
    for (exchange, raw) in catalogs {
        mapper_mut.ingest(exchange, raw);
    }
    mapper_mut.build_best_transfer();
    let mapper = Arc::new(mapper_mut);

    let mut tasks = Vec::new();

    for exchange in &exchanges {
        if let Some(coins) = mapper.catalog(exchange.id) {
            let named: Vec<_> = coins
                .ids()
                .filter_map(|id| mapper.name_for(exchange.id, id).map(|name| (id, name.to_string())))
                .collect();
            if let Ok(usdt) = mapper.usdt() {
                exchange.price_observer.configure(&named, usdt).await;
            }
        }

        exchange.price_observer.subscribe(analyst.clone()).await;

        let manager = Manager::new(
            exchange.clone(),
            registry.clone(),
            mapper.clone(),
            analyst.clone(),
            additive,
        );
        exchange.balance_observer.subscribe(manager.clone());

        let balance_observer = exchange.balance_observer.clone();
        tasks.push(ObserverTask::new(format!("{}-balance", exchange.id), move || {
            let balance_observer = balance_observer.clone();
            async move { balance_observer.launch().await }
        }));

        let price_observer = exchange.price_observer.clone();
        tasks.push(ObserverTask::new(format!("{}-price", exchange.id), move || {
            let price_observer = price_observer.clone();
            async move { price_observer.launch().await }
        }));
    }

    info!(exchanges = exchanges.len(), "bot cycle running");

    let supervisor = ObserverSupervisor::new(tasks, supervisor_config);
    supervisor.run().await?;
    Ok(())
}
