pub mod config;
pub mod logging;

pub use config::{
    CONFIG_FILE_NAME, CompilersConfig, ConfigError, CredentialsConfig, NetworkId, NetworkProfile,
    RpcSettings, SaleConfig, SaleSettings, SolcSettings,
};
