// Token sale deployment + interaction over Ethereum JSON-RPC

pub mod connection;
pub mod contracts;
pub mod deploy;
pub mod error;
pub mod interact;
pub mod rpc_config;
pub mod units;
pub mod wallet;

// Re-export primary types for convenient access.
pub use connection::{ConnectOptions, Connection};
pub use contracts::{Artifact, ContractArtifacts, MyToken, SaleHandle, TokenHandle, TokenSale};
pub use deploy::{Deployment, DeploymentRecord, MigrationParams, deploy_contract, migrate};
pub use error::{ChainError, Result};
pub use interact::{InteractionReport, purchase_value, resolve_addresses, run_interaction};
pub use rpc_config::{RpcEndpoint, validate_url};
pub use units::{from_wei, to_wei, tokens};
pub use wallet::{Wallet, WalletSource};
