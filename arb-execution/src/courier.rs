use crate::client::ExchangeClient;
use crate::error::{ApiError, ClientError};
use arb_instrument::Coin;
use async_trait::async_trait;
use tracing::{error, warn};

/// Object-safe view of a [`Courier`]'s deposit-address resolution, so a [`Courier<C>`] can be
/// looked up by [`arb_instrument::ExchangeId`] in a heterogeneous registry of exchanges without
/// naming every concrete `C` at the call site.
#[async_trait]
pub trait DepositTarget: Send + Sync {
    async fn fetch_deposit_address(&self, coin: &Coin) -> Result<String, ClientError>;
}

#[async_trait]
impl<C> DepositTarget for Courier<C>
where
    C: ExchangeClient,
{
    async fn fetch_deposit_address(&self, coin: &Coin) -> Result<String, ClientError> {
        self.client.fetch_deposit_address(&coin.name, &coin.network).await
    }
}

/// Executes withdrawals from one exchange to another, resolving the destination's deposit
/// address for the same coin/network before submitting the withdrawal request.
///
/// Every venue error that is not retryable collapses to `Ok(false)` rather than propagating,
/// matching the "collect every known failure reason, log it, and report a boolean outcome"
/// shape of the source - but as an explicit `Result<bool, ClientError>` so a genuinely
/// unexpected error (e.g. connectivity) is still distinguishable from "withdrawal declined".
pub struct Courier<C> {
    client: C,
}

impl<C> Courier<C>
where
    C: ExchangeClient,
{
    pub fn new(client: C) -> Self {
        Self { client }
    }

    /// Resolve the deposit address `destination` exposes for `coin`'s network.
    pub async fn deposit_address<D>(
        &self,
        destination: &Courier<D>,
        coin: &Coin,
    ) -> Result<String, ClientError>
    where
        D: ExchangeClient,
    {
        destination
            .client
            .fetch_deposit_address(&coin.name, &coin.network)
            .await
    }

    /// Withdraw `amount` of `coin` from this exchange to `destination`'s deposit address.
    ///
    /// Returns `Ok(true)` on a submitted withdrawal, `Ok(false)` when the exchange declined
    /// the request for a reason that does not warrant retrying (insufficient funds, invalid
    /// order, an address the destination has not validated yet), and `Err` for anything that
    /// should be treated as a connectivity/transient failure by the caller.
    pub async fn withdraw<D>(
        &self,
        destination: &Courier<D>,
        coin: &Coin,
        amount: f64,
    ) -> Result<bool, ClientError>
    where
        D: ExchangeClient,
    {
        let address = match self.deposit_address(destination, coin).await {
            Ok(address) => address,
            Err(ClientError::Api(ApiError::Unsupported(reason))) => {
                warn!(coin = %coin.name, reason, "destination does not support deposit address lookup");
                return Ok(false);
            }
            Err(err) => return Err(err),
        };

        match self.client.withdraw(coin, amount, &address, None).await {
            Ok(()) => Ok(true),
            Err(ClientError::Api(ApiError::InsufficientFunds)) => Ok(false),
            Err(ClientError::Api(ApiError::InvalidOrder(reason))) => {
                warn!(coin = %coin.name, reason, "withdrawal rejected as invalid order");
                Ok(false)
            }
            Err(ClientError::Api(ApiError::InvalidAddress)) => {
                warn!(coin = %coin.name, %address, "destination deposit address rejected as invalid");
                Ok(false)
            }
            Err(ClientError::Api(ApiError::AddressPending)) => {
                warn!(coin = %coin.name, %address, "destination deposit address still pending validation");
                Ok(false)
            }
            Err(ClientError::Api(ApiError::ExchangeError(reason))) => {
                error!(coin = %coin.name, reason, "exchange-side withdrawal error");
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }

    /// Same as [`Courier::withdraw`], but against a dynamically-dispatched destination - used
    /// by the manager, which only knows the destination's [`arb_instrument::ExchangeId`] at
    /// the point it decides to transfer.
    pub async fn withdraw_dyn(
        &self,
        destination: &dyn DepositTarget,
        coin: &Coin,
        amount: f64,
    ) -> Result<bool, ClientError> {
        let address = match destination.fetch_deposit_address(coin).await {
            Ok(address) => address,
            Err(ClientError::Api(ApiError::Unsupported(reason))) => {
                warn!(coin = %coin.name, reason, "destination does not support deposit address lookup");
                return Ok(false);
            }
            Err(err) => return Err(err),
        };

        match self.client.withdraw(coin, amount, &address, None).await {
            Ok(()) => Ok(true),
            Err(ClientError::Api(ApiError::InsufficientFunds)) => Ok(false),
            Err(ClientError::Api(ApiError::InvalidOrder(reason))) => {
                warn!(coin = %coin.name, reason, "withdrawal rejected as invalid order");
                Ok(false)
            }
            Err(ClientError::Api(ApiError::InvalidAddress)) => {
                warn!(coin = %coin.name, %address, "destination deposit address rejected as invalid");
                Ok(false)
            }
            Err(ClientError::Api(ApiError::AddressPending)) => {
                warn!(coin = %coin.name, %address, "destination deposit address still pending validation");
                Ok(false)
            }
            Err(ClientError::Api(ApiError::ExchangeError(reason))) => {
                error!(coin = %coin.name, reason, "exchange-side withdrawal error");
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }
}
