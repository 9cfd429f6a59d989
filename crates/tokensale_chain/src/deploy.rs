//! Contract migration: deploy `MyToken`, then `TokenSale` wired to it.

use std::path::Path;
use std::sync::Arc;

use alloy::contract::RawCallBuilder;
use alloy::primitives::{Address, B256, U256};
use alloy::rpc::types::TransactionReceipt;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokensale_core::SaleSettings;
use tracing::info;

use crate::connection::Connection;
use crate::contracts::{
    Artifact, ContractArtifacts, SaleHandle, TokenHandle, sale_constructor_args,
    token_constructor_args,
};
use crate::error::{ChainError, Result};
use crate::units::to_wei;

/// What the migration deploys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationParams {
    /// Token supply in base units.
    pub initial_supply: U256,
    /// Wei per whole token.
    pub token_price: U256,
    /// Move the whole supply from the deployer to the sale contract.
    pub fund_sale: bool,
}

impl MigrationParams {
    pub fn from_settings(settings: &SaleSettings, fund_sale: bool) -> Result<Self> {
        Ok(Self {
            initial_supply: to_wei(&settings.initial_supply)?,
            token_price: to_wei(&settings.token_price)?,
            fund_sale,
        })
    }
}

/// Addresses and parameters of a completed migration, saved per network so
/// later runs can find the contracts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentRecord {
    pub network: String,
    pub network_id: u64,
    pub chain_id: u64,
    pub deployer: Address,
    pub token: Address,
    pub sale: Address,
    pub token_tx: B256,
    pub sale_tx: B256,
    /// Base units.
    pub initial_supply: U256,
    /// Wei per whole token.
    pub token_price: U256,
    pub funded: bool,
    pub deployed_at: DateTime<Utc>,
}

impl DeploymentRecord {
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        info!(path = %path.display(), "deployment record saved");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ChainError::Artifact(format!(
                "cannot read deployment record {}: {e} (run `tokensale migrate` first)",
                path.display()
            ))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            ChainError::Decode(format!("deployment record {}: {e}", path.display()))
        })
    }
}

/// Result of [`migrate`].
pub struct Deployment {
    pub token: TokenHandle,
    pub sale: SaleHandle,
    pub record: DeploymentRecord,
}

/// Deploy one contract and return its address with the creation receipt.
pub async fn deploy_contract(
    conn: &Connection,
    artifact: &Artifact,
    constructor_args: &[u8],
    from: Address,
) -> Result<(Address, TransactionReceipt)> {
    let data = artifact.deploy_data(constructor_args)?;
    info!(contract = %artifact.contract_name, %from, "deploying");

    let call = RawCallBuilder::new_raw_deploy(conn.provider(), data);
    let receipt = conn.send(call, from).await?;

    let address = receipt.contract_address.ok_or_else(|| {
        ChainError::Decode(format!(
            "{}: deployment receipt {} has no contract address",
            artifact.contract_name, receipt.transaction_hash
        ))
    })?;
    info!(
        contract = %artifact.contract_name,
        %address,
        gas_used = receipt.gas_used,
        "deployed"
    );
    Ok((address, receipt))
}

/// Run the migration from account 0: deploy the token with the initial
/// supply, deploy the sale with the token address and price, and optionally
/// fund the sale with the whole supply.
pub async fn migrate(
    conn: Arc<Connection>,
    artifacts: &ContractArtifacts,
    params: &MigrationParams,
    network: &str,
) -> Result<Deployment> {
    let deployer = conn.account(0)?;

    let (token_address, token_receipt) = deploy_contract(
        &conn,
        &artifacts.token,
        &token_constructor_args(params.initial_supply),
        deployer,
    )
    .await?;

    let (sale_address, sale_receipt) = deploy_contract(
        &conn,
        &artifacts.sale,
        &sale_constructor_args(token_address, params.token_price),
        deployer,
    )
    .await?;

    let token = TokenHandle::new(conn.clone(), token_address);
    let sale = SaleHandle::new(conn.clone(), sale_address);

    if params.fund_sale {
        token
            .transfer(deployer, sale_address, params.initial_supply)
            .await?;
        info!(sale = %sale_address, amount = %params.initial_supply, "sale funded");
    }

    let record = DeploymentRecord {
        network: network.to_string(),
        network_id: conn.network_id(),
        chain_id: conn.chain_id(),
        deployer,
        token: token_address,
        sale: sale_address,
        token_tx: token_receipt.transaction_hash,
        sale_tx: sale_receipt.transaction_hash,
        initial_supply: params.initial_supply,
        token_price: params.token_price,
        funded: params.fund_sale,
        deployed_at: Utc::now(),
    };

    Ok(Deployment {
        token,
        sale,
        record,
    })
}
