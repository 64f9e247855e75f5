//! Per-exchange façade binding a [`Connection`] to the catalog, wallet, and C2..C5 components
//! that all operate against it.
//!
//! Grounded on `original_source/core/models/ExchangeBase.py` and `core/interfaces/IExchange.py`:
//! one object per exchange exposing `buy`/`sell`/`withdraw`/`get_current_coins`/the wallet, with
//! the observers held as non-owning handles rather than the façade's own state.

use std::collections::HashMap;
use std::sync::Arc;

use arb_data::{BalanceObserver, PriceObserver};
use arb_execution::client::ExchangeClient;
use arb_execution::courier::DepositTarget;
use arb_execution::error::ClientError;
use arb_execution::trader::{TradeError, Trader};
use arb_execution::Courier;
use arb_instrument::{Coin, CoinId, ExchangeId};
use async_trait::async_trait;
use thiserror::Error;

use crate::connection::Connection;

#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("exchange {0} is not connected")]
    NotConnected(ExchangeId),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Trade(#[from] TradeError),
}

/// A plain struct of non-owning `Arc` handles, per the design note on cyclic references: the
/// observers each hold their own clone of `client`, and the wallet is read through them rather
/// than duplicated here. `trader`/`courier` are held as long-lived fields rather than built
/// per-call so `Trader`'s per-coin pause map survives across trades.
pub struct Exchange<C> {
    pub id: ExchangeId,
    pub connection: Arc<Connection<C>>,
    pub balance_observer: Arc<BalanceObserver<C>>,
    pub price_observer: Arc<PriceObserver<C>>,
    trader: Trader<C>,
    courier: Courier<C>,
    client: C,
}

impl<C> Exchange<C>
where
    C: ExchangeClient + arb_data::client::MarketDataClient + Clone + Send + Sync + 'static,
{
    pub fn new(id: ExchangeId, connection: Arc<Connection<C>>, client: C) -> Arc<Self> {
        Arc::new(Self {
            id,
            balance_observer: Arc::new(BalanceObserver::new(id, client.clone())),
            price_observer: Arc::new(PriceObserver::new(id, client.clone())),
            trader: Trader::new(client.clone()),
            courier: Courier::new(client.clone()),
            connection,
            client,
        })
    }

    /// Snapshot of every coin currently held, by `CoinId` - the wallet, as maintained by
    /// `balance_observer`.
    pub fn wallet(&self) -> HashMap<CoinId, f64> {
        self.balance_observer.balance_snapshot()
    }

    /// Adapter from the SDK's raw withdrawable-coin payload to the `{name -> {Coin}}` shape the
    /// `Mapper` ingests. Delegates straight to the client; per-exchange quirks (if any) belong
    /// in the client implementation, not here.
    pub async fn current_coins(&self) -> Result<HashMap<String, Vec<Coin>>, ExchangeError> {
        Ok(self.client.fetch_currencies().await?)
    }

    /// `usdt_quantity` defaults to the wallet balance held for `coin` when `None`.
    pub async fn buy(
        &self,
        coin: CoinId,
        coin_name: &str,
        usdt_quantity: Option<f64>,
    ) -> Result<(), ExchangeError> {
        let wallet_balance = self.wallet().get(&coin).copied();
        self.trader
            .buy(coin, coin_name, usdt_quantity, wallet_balance)
            .await
            .map_err(Into::into)
    }

    /// `amount` defaults to the wallet balance held for `coin` when `None`.
    pub async fn sell(
        &self,
        coin: CoinId,
        coin_name: &str,
        amount: Option<f64>,
    ) -> Result<(), ExchangeError> {
        let wallet_balance = self.wallet().get(&coin).copied();
        self.trader
            .sell(coin, coin_name, amount, wallet_balance)
            .await
            .map_err(Into::into)
    }

    /// Withdraw `amount` of `coin` to `destination`'s deposit address.
    pub async fn withdraw(
        &self,
        destination: &dyn DepositTarget,
        coin: &Coin,
        amount: f64,
    ) -> Result<bool, ExchangeError> {
        self.courier
            .withdraw_dyn(destination, coin, amount)
            .await
            .map_err(Into::into)
    }
}

#[async_trait]
impl<C> DepositTarget for Exchange<C>
where
    C: ExchangeClient + arb_data::client::MarketDataClient + Clone + Send + Sync + 'static,
{
    async fn fetch_deposit_address(&self, coin: &Coin) -> Result<String, ClientError> {
        DepositTarget::fetch_deposit_address(&self.courier, coin).await
    }
}

/// Registry of every exchange a bot cycle wired up, keyed by id, so `Manager` can resolve a
/// withdrawal destination it only knows by `ExchangeId`.
///
/// Grounded on the design note naming a single per-cycle registry value owned explicitly
/// instead of any global mutable state.
pub type ExchangeRegistry = HashMap<ExchangeId, Arc<dyn DepositTarget>>;
