//! Cross-exchange arbitrage bot: wires a `Connection` per exchange to a shared `Mapper` and
//! `Analyst`, and drives each exchange's balance updates through a `Brain`-backed `Manager`,
//! all supervised by a bounded-restart observer loop inside an outer auto-reconnecting cycle.

pub mod analyst;
pub mod bot;
pub mod brain;
pub mod config;
pub mod connection;
pub mod dto;
pub mod error;
pub mod exchange;
pub mod mapper;
pub mod manager;
pub mod run;
pub mod supervisor;
