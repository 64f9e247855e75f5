//! Binary entry point: the concrete, non-generic half of the bot - tracing, configuration and
//! the shared [`arb::mapper::Mapper`]/[`arb::analyst::Analyst`] state.
//!
//! The generic half, [`arb::run::run_cycle`], is parameterised over a concrete
//! `ExchangeClient + MarketDataClient` binding (the third-party exchange SDK wrapper) that this
//! workspace only pins via traits rather than ships - the same boundary
//! `original_source/app/__main__.py` crosses by importing a concrete `CcxtExchangModel`. A
//! downstream binary supplies that binding and drives the bot with:
//!
//! ```ignore
//! let bot = arb::bot::AutoReconnectBot::new(AutoReconnectBotConfig::default());
//! bot.run(|| arb::run::run_cycle(&config, &ENABLED_EXCHANGES, make_client, mapper.clone(), analyst.clone(), additive, SupervisorConfig::default())).await;
//! ```
//!
//! so this binary stops at proving the concrete parts wire together and logging readiness.

use std::sync::Arc;

use arb::analyst::{Analyst, AnalystConfig};
use arb::config::Config;
use arb::mapper::Mapper;
use arb_instrument::ExchangeId;
use tracing::{info, warn};

/// Venues `original_source/app/config.py` carries credentials for.
const ENABLED_EXCHANGES: [ExchangeId; 4] = [
    ExchangeId::Okx,
    ExchangeId::Bitget,
    ExchangeId::Kucoin,
    ExchangeId::Htx,
];

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::filter::EnvFilter::builder()
                .with_default_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with_ansi(cfg!(debug_assertions))
        .json()
        .init()
}

#[tokio::main]
async fn main() {
    init_logging();

    let config = match Config::from_env(&ENABLED_EXCHANGES) {
        Ok(config) => config,
        Err(error) => {
            tracing::error!(%error, "failed to load configuration");
            std::process::exit(1);
        }
    };

    info!(exchanges = config.exchanges.len(), "credentials loaded");

    let snapshot_path = std::env::var("ARB_MAPPER_SNAPSHOT").ok();
    let mapper = match &snapshot_path {
        Some(path) => match Mapper::load(std::path::Path::new(path)) {
            Ok(mapper) => {
                info!(path, "restored mapper snapshot");
                mapper
            }
            Err(error) => {
                warn!(path, %error, "could not load mapper snapshot, starting empty");
                Mapper::new()
            }
        },
        None => Mapper::new(),
    };

    let mapper = Arc::new(mapper);
    let analyst = Arc::new(Analyst::new(AnalystConfig::default()));

    info!(table = %mapper.render_best_transfer(), "mapper ready");
    info!(procedure_time = analyst.config().procedure_time, "analyst ready");

    info!(
        "concrete state ready; wire a real ExchangeClient/MarketDataClient binding and drive \
         arb::run::run_cycle from arb::bot::AutoReconnectBot::run to go live"
    );
}
