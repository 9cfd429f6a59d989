//! Contract bindings and compiled artifacts.
//!
//! The ABI surface of `MyToken` and `TokenSale` is declared with `sol!`;
//! creation bytecode comes from the Truffle build artifacts on disk.
//! Handles pair the generated contract instances with the connection that
//! owns the signing policy.

use std::path::Path;
use std::sync::Arc;

use alloy::hex;
use alloy::primitives::{Address, Bytes, U256};
use alloy::providers::DynProvider;
use alloy::rpc::types::TransactionReceipt;
use alloy::sol;
use alloy::sol_types::{SolConstructor, SolEvent};
use serde::Deserialize;
use tracing::{info, warn};

use crate::connection::Connection;
use crate::error::{ChainError, Result};

sol! {
    #[derive(Debug, PartialEq, Eq)]
    #[sol(rpc)]
    contract MyToken {
        event Transfer(address indexed from, address indexed to, uint256 value);

        constructor(uint256 initialSupply);

        function totalSupply() external view returns (uint256);
        function balanceOf(address account) external view returns (uint256);
        function transfer(address to, uint256 amount) external returns (bool);
    }

    #[derive(Debug, PartialEq, Eq)]
    #[sol(rpc)]
    contract TokenSale {
        event Sell(address buyer, uint256 amount);

        constructor(address tokenAddress, uint256 price);

        function tokenPrice() external view returns (uint256);
        function tokenContract() external view returns (address);
        function admin() external view returns (address);
        function tokensSold() external view returns (uint256);
        function buyTokens(uint256 numberOfTokens) external payable;
        function endSale() external;
    }
}

pub const TOKEN_CONTRACT_NAME: &str = "MyToken";
pub const SALE_CONTRACT_NAME: &str = "TokenSale";

// ---------------------------------------------------------------------------
// Artifacts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct CompilerInfo {
    #[serde(default)]
    pub name: Option<String>,
    pub version: String,
}

/// The parts of a Truffle build artifact (`build/contracts/<Name>.json`)
/// the deployer needs.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub contract_name: String,
    #[serde(default)]
    pub abi: serde_json::Value,
    pub bytecode: String,
    #[serde(default)]
    pub compiler: Option<CompilerInfo>,
}

impl Artifact {
    pub fn load(dir: &Path, name: &str) -> Result<Self> {
        let path = dir.join(format!("{name}.json"));
        let content = std::fs::read_to_string(&path).map_err(|e| {
            ChainError::Artifact(format!(
                "cannot read {}: {e} (compile the contracts first)",
                path.display()
            ))
        })?;
        let artifact: Self = serde_json::from_str(&content)
            .map_err(|e| ChainError::Artifact(format!("{}: {e}", path.display())))?;
        if artifact.contract_name != name {
            return Err(ChainError::Artifact(format!(
                "{} holds contract {}, expected {name}",
                path.display(),
                artifact.contract_name
            )));
        }
        Ok(artifact)
    }

    /// Creation bytecode.
    pub fn bytecode(&self) -> Result<Bytes> {
        let code = hex::decode(self.bytecode.trim()).map_err(|e| {
            ChainError::Artifact(format!("{}: invalid bytecode: {e}", self.contract_name))
        })?;
        if code.is_empty() {
            return Err(ChainError::Artifact(format!(
                "{} has no bytecode (abstract contract or interface?)",
                self.contract_name
            )));
        }
        Ok(Bytes::from(code))
    }

    /// Creation bytecode followed by the ABI-encoded constructor arguments.
    pub fn deploy_data(&self, constructor_args: &[u8]) -> Result<Bytes> {
        let mut data = self.bytecode()?.to_vec();
        data.extend_from_slice(constructor_args);
        Ok(Bytes::from(data))
    }

    /// Whether the artifact was built by the configured compiler version.
    /// Truffle records versions like `0.8.0+commit.c7dfd78e.Emscripten.clang`.
    pub fn compiled_with(&self, version: &str) -> bool {
        match &self.compiler {
            Some(info) => info.version.split('+').next() == Some(version),
            None => true,
        }
    }
}

/// Both artifacts the migration deploys.
#[derive(Debug, Clone)]
pub struct ContractArtifacts {
    pub token: Artifact,
    pub sale: Artifact,
}

impl ContractArtifacts {
    /// Load `MyToken.json` and `TokenSale.json` from `dir`, warning when they
    /// were built with a compiler other than `solc_version`.
    pub fn load(dir: &Path, solc_version: &str) -> Result<Self> {
        let token = Artifact::load(dir, TOKEN_CONTRACT_NAME)?;
        let sale = Artifact::load(dir, SALE_CONTRACT_NAME)?;
        for artifact in [&token, &sale] {
            if !artifact.compiled_with(solc_version) {
                let found = artifact.compiler.as_ref().map(|c| c.version.as_str());
                warn!(
                    contract = %artifact.contract_name,
                    expected = solc_version,
                    found = ?found,
                    "artifact compiled with a different solc version"
                );
            }
        }
        info!(dir = %dir.display(), "loaded contract artifacts");
        Ok(Self { token, sale })
    }
}

// ---------------------------------------------------------------------------
// Handles
// ---------------------------------------------------------------------------

fn decode_events<E: SolEvent>(receipt: &TransactionReceipt, emitter: Address) -> Vec<E> {
    receipt
        .logs()
        .iter()
        .filter(|log| log.address() == emitter)
        .filter(|log| log.topic0() == Some(&E::SIGNATURE_HASH))
        .filter_map(|log| log.log_decode::<E>().ok())
        .map(|log| log.inner.data)
        .collect()
}

/// A deployed `MyToken`.
#[derive(Clone)]
pub struct TokenHandle {
    contract: MyToken::MyTokenInstance<DynProvider>,
    conn: Arc<Connection>,
}

impl std::fmt::Debug for TokenHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenHandle")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}

impl TokenHandle {
    pub fn new(conn: Arc<Connection>, address: Address) -> Self {
        let contract = MyToken::new(address, conn.provider().clone());
        Self { contract, conn }
    }

    pub fn address(&self) -> Address {
        *self.contract.address()
    }

    pub fn connection(&self) -> &Arc<Connection> {
        &self.conn
    }

    pub async fn total_supply(&self) -> Result<U256> {
        Ok(self.contract.totalSupply().call().await?)
    }

    pub async fn balance_of(&self, account: Address) -> Result<U256> {
        Ok(self.contract.balanceOf(account).call().await?)
    }

    pub async fn transfer(
        &self,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<TransactionReceipt> {
        self.conn
            .send(self.contract.transfer(to, amount), from)
            .await
    }

    pub fn transfer_events(&self, receipt: &TransactionReceipt) -> Vec<MyToken::Transfer> {
        decode_events(receipt, self.address())
    }
}

/// A deployed `TokenSale`.
#[derive(Clone)]
pub struct SaleHandle {
    contract: TokenSale::TokenSaleInstance<DynProvider>,
    conn: Arc<Connection>,
}

impl std::fmt::Debug for SaleHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SaleHandle")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}

impl SaleHandle {
    pub fn new(conn: Arc<Connection>, address: Address) -> Self {
        let contract = TokenSale::new(address, conn.provider().clone());
        Self { contract, conn }
    }

    pub fn address(&self) -> Address {
        *self.contract.address()
    }

    pub fn connection(&self) -> &Arc<Connection> {
        &self.conn
    }

    /// Price of one whole token in wei.
    pub async fn token_price(&self) -> Result<U256> {
        Ok(self.contract.tokenPrice().call().await?)
    }

    pub async fn token_contract(&self) -> Result<Address> {
        Ok(self.contract.tokenContract().call().await?)
    }

    pub async fn admin(&self) -> Result<Address> {
        Ok(self.contract.admin().call().await?)
    }

    pub async fn tokens_sold(&self) -> Result<U256> {
        Ok(self.contract.tokensSold().call().await?)
    }

    /// Handle for the token this sale distributes.
    pub async fn token(&self) -> Result<TokenHandle> {
        let address = self.token_contract().await?;
        Ok(TokenHandle::new(self.conn.clone(), address))
    }

    /// Buy `number_of_tokens` whole tokens, paying `value` wei. The contract
    /// rejects any `value` other than `number_of_tokens × tokenPrice`.
    pub async fn buy_tokens(
        &self,
        from: Address,
        number_of_tokens: u64,
        value: U256,
    ) -> Result<TransactionReceipt> {
        let call = self
            .contract
            .buyTokens(U256::from(number_of_tokens))
            .value(value);
        self.conn.send(call, from).await
    }

    /// Close the sale; the contract sends its remaining tokens to the admin.
    pub async fn end_sale(&self, from: Address) -> Result<TransactionReceipt> {
        self.conn.send(self.contract.endSale(), from).await
    }

    pub fn sell_events(&self, receipt: &TransactionReceipt) -> Vec<TokenSale::Sell> {
        decode_events(receipt, self.address())
    }
}

/// ABI-encoded constructor arguments of `MyToken`.
pub fn token_constructor_args(initial_supply: U256) -> Vec<u8> {
    MyToken::constructorCall {
        initialSupply: initial_supply,
    }
    .abi_encode()
}

/// ABI-encoded constructor arguments of `TokenSale`.
pub fn sale_constructor_args(token: Address, price: U256) -> Vec<u8> {
    TokenSale::constructorCall {
        tokenAddress: token,
        price,
    }
    .abi_encode()
}
