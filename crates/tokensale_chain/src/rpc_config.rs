use std::time::Duration;

use tokensale_core::{ConfigError, CredentialsConfig, NetworkId, NetworkProfile, RpcSettings};

use crate::error::{ChainError, Result};

const INFURA_KEY_PLACEHOLDER: &str = "{infura_key}";

/// A resolved RPC endpoint for one network profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcEndpoint {
    pub name: String,
    pub url: String,
    pub network_id: NetworkId,
    pub timeout: Duration,
}

impl RpcEndpoint {
    /// Resolve a profile, reading credentials from the process environment.
    pub fn resolve(name: &str, profile: &NetworkProfile, settings: &RpcSettings) -> Result<Self> {
        Self::resolve_with(name, profile, settings, |var| std::env::var(var).ok())
    }

    /// Resolve a profile with an explicit credential lookup.
    ///
    /// `host`/`port` profiles become `http://host:port`. A `url` template has
    /// `{infura_key}` substituted from the profile's credentials.
    pub fn resolve_with(
        name: &str,
        profile: &NetworkProfile,
        settings: &RpcSettings,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let url = match (&profile.url, &profile.host, profile.port) {
            (Some(template), _, _) if template.contains(INFURA_KEY_PLACEHOLDER) => {
                let defaults = CredentialsConfig::default();
                let creds = profile.credentials.as_ref().unwrap_or(&defaults);
                let key = creds.infura_key_from(&lookup)?;
                template.replace(INFURA_KEY_PLACEHOLDER, &key)
            }
            (Some(url), _, _) => url.clone(),
            (None, Some(host), Some(port)) => format!("http://{host}:{port}"),
            _ => return Err(ConfigError::MissingEndpoint(name.to_string()).into()),
        };

        if !validate_url(&url) {
            return Err(ChainError::InvalidUrl(redact(&url)));
        }

        Ok(Self {
            name: name.to_string(),
            url,
            network_id: profile.network_id,
            timeout: Duration::from_secs(settings.timeout_secs),
        })
    }

    /// Scheme, host and port only. Safe to log; path and query may hold keys.
    pub fn display_url(&self) -> String {
        redact(&self.url)
    }
}

fn redact(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(parsed) => match (parsed.host_str(), parsed.port()) {
            (Some(host), Some(port)) => format!("{}://{host}:{port}", parsed.scheme()),
            (Some(host), None) => format!("{}://{host}", parsed.scheme()),
            _ => "<invalid url>".to_string(),
        },
        Err(_) => "<invalid url>".to_string(),
    }
}

/// Validate that a URL is well-formed and uses HTTP or HTTPS.
pub fn validate_url(url: &str) -> bool {
    match url::Url::parse(url) {
        Ok(parsed) => {
            let scheme = parsed.scheme();
            (scheme == "http" || scheme == "https") && parsed.host().is_some()
        }
        Err(_) => false,
    }
}
