use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Default file name of the project configuration, looked up in the
/// working directory.
pub const CONFIG_FILE_NAME: &str = "tokensale.toml";

const DEFAULT_INFURA_KEY_ENV: &str = "INFURA_KEY";
const DEFAULT_MNEMONIC_ENV: &str = "MNEMONIC";
const DEFAULT_HD_ACCOUNTS: u32 = 10;

/// Errors raised while resolving values out of a loaded configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Unknown network profile: {0}")]
    UnknownNetwork(String),

    #[error("Missing credential: environment variable {0} is not set")]
    MissingCredential(String),

    #[error("Network profile {0} has neither `url` nor `host`/`port`")]
    MissingEndpoint(String),
}

// ---------------------------------------------------------------------------
// NetworkId
// ---------------------------------------------------------------------------

/// Expected network id of a profile. `"*"` in the file accepts any id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkId {
    Any,
    Id(u64),
}

impl NetworkId {
    /// Whether the id reported by the node (`net_version`) is acceptable.
    pub fn matches(&self, reported: u64) -> bool {
        match self {
            NetworkId::Any => true,
            NetworkId::Id(expected) => *expected == reported,
        }
    }
}

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkId::Any => f.write_str("*"),
            NetworkId::Id(id) => write!(f, "{id}"),
        }
    }
}

impl Serialize for NetworkId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            NetworkId::Any => serializer.serialize_str("*"),
            NetworkId::Id(id) => serializer.serialize_u64(*id),
        }
    }
}

impl<'de> Deserialize<'de> for NetworkId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Num(u64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Num(id) => Ok(NetworkId::Id(id)),
            Raw::Text(s) if s == "*" => Ok(NetworkId::Any),
            Raw::Text(s) => s
                .parse::<u64>()
                .map(NetworkId::Id)
                .map_err(|_| serde::de::Error::custom(format!("invalid network_id: {s}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Network profiles
// ---------------------------------------------------------------------------

/// Names of the environment variables that carry remote-network credentials.
/// The secrets themselves never live in the config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    pub infura_key_env: String,
    pub mnemonic_env: String,
    /// How many HD accounts to derive from the mnemonic.
    pub accounts: u32,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            infura_key_env: DEFAULT_INFURA_KEY_ENV.into(),
            mnemonic_env: DEFAULT_MNEMONIC_ENV.into(),
            accounts: DEFAULT_HD_ACCOUNTS,
        }
    }
}

impl CredentialsConfig {
    /// Read the mnemonic from the process environment.
    pub fn mnemonic(&self) -> std::result::Result<String, ConfigError> {
        self.mnemonic_from(|name| std::env::var(name).ok())
    }

    pub fn mnemonic_from(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> std::result::Result<String, ConfigError> {
        lookup_secret(&self.mnemonic_env, lookup)
    }

    pub fn infura_key_from(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> std::result::Result<String, ConfigError> {
        lookup_secret(&self.infura_key_env, lookup)
    }
}

fn lookup_secret(
    name: &str,
    lookup: impl Fn(&str) -> Option<String>,
) -> std::result::Result<String, ConfigError> {
    match lookup(name) {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(ConfigError::MissingCredential(name.to_string())),
    }
}

/// One entry of `[networks.<name>]`.
///
/// A local profile sets `host` and `port`; a remote profile sets a `url`
/// template (which may contain `{infura_key}`) and a `credentials` block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub network_id: NetworkId,
    /// Fixed gas limit for every transaction. Estimated per call when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas: Option<u64>,
    /// Fixed gas price in wei. Queried from the node when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<CredentialsConfig>,
}

impl NetworkProfile {
    /// A node on `host:port` that manages its own unlocked accounts.
    pub fn local(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: Some(host.into()),
            port: Some(port),
            url: None,
            network_id: NetworkId::Any,
            gas: None,
            gas_price: None,
            credentials: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Other sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolcSettings {
    pub version: String,
}

impl Default for SolcSettings {
    fn default() -> Self {
        Self {
            version: "0.8.0".into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilersConfig {
    pub solc: SolcSettings,
}

/// Parameters of the sale itself: what the migration deploys and what the
/// interaction client buys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaleSettings {
    /// Initial token supply in whole tokens (18 decimals are applied on deploy).
    pub initial_supply: String,
    /// Price of one whole token, in ether.
    pub token_price: String,
    /// Quantity bought by `interact`.
    pub tokens_to_buy: u64,
}

impl Default for SaleSettings {
    fn default() -> Self {
        Self {
            initial_supply: "1000000".into(),
            token_price: "0.01".into(),
            tokens_to_buy: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcSettings {
    pub timeout_secs: u64,
    pub receipt_poll_ms: u64,
    pub receipt_timeout_secs: u64,
}

impl Default for RpcSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            receipt_poll_ms: 250,
            receipt_timeout_secs: 60,
        }
    }
}

// ---------------------------------------------------------------------------
// SaleConfig
// ---------------------------------------------------------------------------

/// Project configuration stored in `tokensale.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaleConfig {
    /// Directory holding the compiled contract artifacts (`<Name>.json`).
    pub artifacts_dir: PathBuf,
    /// Directory where deployment records are written, one file per network.
    pub deployments_dir: PathBuf,
    pub networks: BTreeMap<String, NetworkProfile>,
    pub compilers: CompilersConfig,
    pub sale: SaleSettings,
    pub rpc: RpcSettings,
}

impl Default for SaleConfig {
    fn default() -> Self {
        let mut networks = BTreeMap::new();
        networks.insert(
            "development".to_string(),
            NetworkProfile::local("127.0.0.1", 7545),
        );
        networks.insert(
            "rinkeby".to_string(),
            NetworkProfile {
                host: None,
                port: None,
                url: Some("https://rinkeby.infura.io/v3/{infura_key}".into()),
                network_id: NetworkId::Id(4),
                gas: Some(5_500_000),
                gas_price: None,
                credentials: Some(CredentialsConfig::default()),
            },
        );

        Self {
            artifacts_dir: PathBuf::from("build/contracts"),
            deployments_dir: PathBuf::from("deployments"),
            networks,
            compilers: CompilersConfig::default(),
            sale: SaleSettings::default(),
            rpc: RpcSettings::default(),
        }
    }
}

impl SaleConfig {
    /// Returns the per-user state directory: `~/.tokensale/`
    pub fn base_dir() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".tokensale"))
    }

    /// Returns the logs directory: `~/.tokensale/logs/`
    pub fn logs_dir() -> Result<PathBuf> {
        Ok(Self::base_dir()?.join("logs"))
    }

    /// Load config from a specific file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Load config from `path`, or fall back to the built-in defaults when the
    /// file does not exist. A file that exists but does not parse is an error.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            warn!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Save config to a specific file path.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(())
    }

    /// Look up a network profile by name.
    pub fn network(&self, name: &str) -> std::result::Result<&NetworkProfile, ConfigError> {
        self.networks
            .get(name)
            .ok_or_else(|| ConfigError::UnknownNetwork(name.to_string()))
    }

    /// Path of the deployment record for `network`.
    pub fn deployment_path(&self, network: &str) -> PathBuf {
        self.deployments_dir.join(format!("{network}.json"))
    }
}
