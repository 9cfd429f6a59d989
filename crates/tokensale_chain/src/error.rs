//! Error type shared by every module of the crate.

use std::time::Duration;

use alloy::contract::Error as ContractError;
use alloy::primitives::{Address, B256};
use alloy::providers::PendingTransactionError;
use alloy::rpc::json_rpc::ErrorPayload;
use alloy::sol_types::Revert;
use alloy::transports::TransportError;
use serde_json::Value;
use tokensale_core::ConfigError;

/// Errors surfaced by RPC calls, contract calls and deployment.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    /// The request never produced a JSON-RPC answer (connect, timeout, bad body).
    #[error("Transport error: {0}")]
    Transport(String),

    /// The node answered with a JSON-RPC error that is not a revert.
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// Contract execution reverted.
    #[error("Transaction reverted: {reason}")]
    Reverted { reason: String },

    /// A response could not be decoded into the expected shape.
    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Artifact error: {0}")]
    Artifact(String),

    #[error("Wallet error: {0}")]
    Wallet(String),

    #[error("Invalid RPC URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Network id mismatch: profile expects {expected}, node reports {actual}")]
    NetworkMismatch { expected: String, actual: u64 },

    #[error("No receipt for {tx_hash} after {waited:?}")]
    ReceiptTimeout { tx_hash: B256, waited: Duration },

    #[error("No account at index {0}")]
    UnknownAccount(usize),

    #[error("No local signer for {0}")]
    UnknownSigner(Address),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ChainError>;

impl ChainError {
    /// Classify a JSON-RPC error object.
    ///
    /// The ABI `Error(string)` payload is tried first, wherever the node nests
    /// it under `data`. Older Ganache keys `data` by transaction hash with a
    /// `reason` field; otherwise the reason is read from the message, which is
    /// `VM Exception while processing transaction: revert <reason>` on Ganache
    /// and `execution reverted: <reason>` with code 3 on geth.
    pub fn from_error_payload(payload: &ErrorPayload) -> Self {
        if let Some(revert) = payload.as_decoded_error::<Revert>() {
            return ChainError::Reverted {
                reason: revert.reason,
            };
        }
        let data = payload.try_data_as::<Value>().and_then(|data| data.ok());
        Self::from_rpc(payload.code, &payload.message, data.as_ref())
    }

    /// Classify an error by code, message and optional `data` member.
    pub fn from_rpc(code: i64, message: &str, data: Option<&Value>) -> Self {
        if let Some(reason) = data.and_then(legacy_revert_reason) {
            return ChainError::Reverted { reason };
        }

        if let Some(idx) = message.find("revert") {
            let tail = message[idx + "revert".len()..]
                .trim_start_matches(|c: char| c == 'e' || c == 'd')
                .trim_start_matches(':')
                .trim();
            let reason = if tail.is_empty() {
                message.to_string()
            } else {
                tail.to_string()
            };
            return ChainError::Reverted { reason };
        }

        if code == 3 {
            return ChainError::Reverted {
                reason: message.to_string(),
            };
        }

        ChainError::Rpc {
            code,
            message: message.to_string(),
        }
    }

    /// Whether this error is a contract revert.
    pub fn is_revert(&self) -> bool {
        matches!(self, ChainError::Reverted { .. })
    }
}

/// `{ "reason": .. }` or `{ "<tx hash>": { "error": "revert", "reason": .. } }`.
fn legacy_revert_reason(data: &Value) -> Option<String> {
    let map = data.as_object()?;
    if let Some(Value::String(reason)) = map.get("reason") {
        return Some(reason.clone());
    }
    map.values()
        .filter_map(|v| v.get("reason").and_then(Value::as_str))
        .map(str::to_string)
        .next()
}

impl From<TransportError> for ChainError {
    fn from(err: TransportError) -> Self {
        match err.as_error_resp() {
            Some(payload) => ChainError::from_error_payload(payload),
            None => ChainError::Transport(err.to_string()),
        }
    }
}

impl From<PendingTransactionError> for ChainError {
    fn from(err: PendingTransactionError) -> Self {
        match err {
            PendingTransactionError::TransportError(err) => err.into(),
            other => ChainError::Transport(other.to_string()),
        }
    }
}

impl From<ContractError> for ChainError {
    fn from(err: ContractError) -> Self {
        match err {
            ContractError::ZeroData(function, _) => ChainError::Decode(format!(
                "{function}: empty response; is the contract deployed on this network?"
            )),
            ContractError::TransportError(err) => err.into(),
            ContractError::PendingTransactionError(err) => err.into(),
            other => ChainError::Decode(other.to_string()),
        }
    }
}
