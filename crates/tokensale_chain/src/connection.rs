//! A connected session: provider, signing accounts and transaction policy.

use std::sync::Arc;
use std::time::Duration;

use alloy::contract::{CallBuilder, CallDecoder};
use alloy::primitives::Address;
use alloy::providers::{
    DynProvider, PendingTransactionError, Provider, ProviderBuilder, WatchTxError,
};
use alloy::rpc::client::RpcClient;
use alloy::rpc::types::TransactionReceipt;
use tokensale_core::{NetworkId, NetworkProfile, RpcSettings};
use tracing::{debug, info, warn};

use crate::error::{ChainError, Result};
use crate::rpc_config::RpcEndpoint;
use crate::wallet::{Wallet, WalletSource};

/// Gas and receipt-polling policy for a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectOptions {
    /// Fixed gas limit; estimated per transaction when `None`.
    pub gas_limit: Option<u64>,
    /// Fixed gas price in wei; queried per transaction when `None`.
    pub gas_price: Option<u128>,
    pub poll_interval: Duration,
    pub receipt_timeout: Duration,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self::from_settings(None, &RpcSettings::default())
    }
}

impl ConnectOptions {
    pub fn from_settings(profile: Option<&NetworkProfile>, settings: &RpcSettings) -> Self {
        Self {
            gas_limit: profile.and_then(|p| p.gas),
            gas_price: profile.and_then(|p| p.gas_price).map(u128::from),
            poll_interval: Duration::from_millis(settings.receipt_poll_ms),
            receipt_timeout: Duration::from_secs(settings.receipt_timeout_secs),
        }
    }
}

/// An open session against one node.
pub struct Connection {
    provider: DynProvider,
    wallet: Wallet,
    network_id: u64,
    chain_id: u64,
    options: ConnectOptions,
}

impl Connection {
    /// Connect over HTTP to a resolved endpoint.
    pub async fn connect(
        endpoint: &RpcEndpoint,
        source: WalletSource,
        options: ConnectOptions,
    ) -> Result<Arc<Self>> {
        info!(network = %endpoint.name, url = %endpoint.display_url(), "connecting");
        let url = url::Url::parse(&endpoint.url)
            .map_err(|_| ChainError::InvalidUrl(endpoint.display_url()))?;
        let http = reqwest::Client::builder()
            .timeout(endpoint.timeout)
            .build()
            .map_err(|e| ChainError::Transport(format!("failed to build HTTP client: {e}")))?;
        let client = RpcClient::new_http_with_client(http, url);
        Self::with_client(client, endpoint.network_id, source, options).await
    }

    /// Connect through an already built RPC client. Fails when the node's
    /// `net_version` does not satisfy `expected`.
    pub async fn with_client(
        client: RpcClient,
        expected: NetworkId,
        source: WalletSource,
        options: ConnectOptions,
    ) -> Result<Arc<Self>> {
        let client = client.with_poll_interval(options.poll_interval);
        let local = match source {
            WalletSource::Node => None,
            WalletSource::Mnemonic { phrase, accounts } => {
                Some(Wallet::from_mnemonic(&phrase, accounts)?)
            }
        };

        // Legacy pricing is forced per transaction in `send`; the gas filler
        // then only estimates the limit.
        let builder = ProviderBuilder::new()
            .disable_recommended_fillers()
            .with_gas_estimation()
            .with_simple_nonce_management()
            .fetch_chain_id();
        let provider = match local.as_ref().and_then(Wallet::ethereum_wallet) {
            Some(signing) => builder.wallet(signing).connect_client(client).erased(),
            None => builder.connect_client(client).erased(),
        };

        let network_id = provider.get_net_version().await?;
        if !expected.matches(network_id) {
            return Err(ChainError::NetworkMismatch {
                expected: expected.to_string(),
                actual: network_id,
            });
        }
        let chain_id = provider.get_chain_id().await?;

        let wallet = match local {
            Some(wallet) => wallet,
            None => Wallet::NodeManaged(provider.get_accounts().await?),
        };
        if wallet.addresses().is_empty() {
            warn!("node reports no accounts; only read-only calls will work");
        }

        info!(
            network_id,
            chain_id,
            accounts = wallet.addresses().len(),
            local_signing = wallet.is_local(),
            "connected"
        );

        Ok(Arc::new(Self {
            provider,
            wallet,
            network_id,
            chain_id,
            options,
        }))
    }

    pub fn provider(&self) -> &DynProvider {
        &self.provider
    }

    pub fn wallet(&self) -> &Wallet {
        &self.wallet
    }

    pub fn network_id(&self) -> u64 {
        self.network_id
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn accounts(&self) -> Vec<Address> {
        self.wallet.addresses()
    }

    pub fn account(&self, index: usize) -> Result<Address> {
        self.wallet.account(index)
    }

    /// Submit `call` from `from` and wait for its receipt.
    ///
    /// A revert detected during gas estimation is returned before anything
    /// is submitted. A mined transaction with failed status is replayed with
    /// `eth_call` to recover the revert reason.
    pub async fn send<D: CallDecoder>(
        &self,
        call: CallBuilder<&DynProvider, D>,
        from: Address,
    ) -> Result<TransactionReceipt> {
        if self.wallet.is_local() && self.wallet.signer_for(from).is_none() {
            return Err(ChainError::UnknownSigner(from));
        }

        let gas_price = match self.options.gas_price {
            Some(price) => price,
            None => self.provider.get_gas_price().await?,
        };
        let mut call = call.from(from).gas_price(gas_price);
        if let Some(limit) = self.options.gas_limit {
            call = call.gas(limit);
        }

        let pending = call.send().await?;
        let tx_hash = *pending.tx_hash();
        debug!(%tx_hash, %from, gas_price, "transaction submitted");

        let waited = self.options.receipt_timeout;
        let receipt = match pending.with_timeout(Some(waited)).get_receipt().await {
            Ok(receipt) => receipt,
            Err(PendingTransactionError::TxWatcher(WatchTxError::Timeout)) => {
                return Err(ChainError::ReceiptTimeout { tx_hash, waited });
            }
            Err(err) => return Err(err.into()),
        };
        debug!(
            %tx_hash,
            block = ?receipt.block_number,
            gas_used = receipt.gas_used,
            status = receipt.status(),
            "receipt"
        );

        if !receipt.status() {
            warn!(%tx_hash, "transaction failed on chain");
            return match call.call_raw().await.map_err(ChainError::from) {
                Err(err @ ChainError::Reverted { .. }) => Err(err),
                _ => Err(ChainError::Reverted {
                    reason: format!("transaction {tx_hash} failed without a reason"),
                }),
            };
        }
        Ok(receipt)
    }
}
