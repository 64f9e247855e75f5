//! The exchange client abstraction and the `Trader`/`Courier` components that place market
//! orders and execute cross-exchange withdrawals. Account balance types live in
//! `arb_instrument::balance` since `arb-data`'s observers need them too.

pub mod client;
pub mod courier;
pub mod error;
pub mod trader;

pub use client::ExchangeClient;
pub use courier::{Courier, DepositTarget};
pub use error::ClientError;
pub use trader::{TradeError, Trader};
