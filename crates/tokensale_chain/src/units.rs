//! Ether / token unit conversion.
//!
//! The token uses 18 decimals, the same as ether, so whole-token amounts are
//! converted with the ether helpers.

use alloy::primitives::U256;
use alloy::primitives::utils::{format_ether, parse_ether};

use crate::error::{ChainError, Result};

pub const TOKEN_DECIMALS: u8 = 18;

/// Parse a decimal ether amount (`"0.01"`) into wei.
pub fn to_wei(ether: &str) -> Result<U256> {
    parse_ether(ether.trim())
        .map_err(|e| ChainError::InvalidInput(format!("invalid amount {ether:?}: {e}")))
}

/// Render wei as a decimal ether amount without trailing zeros
/// (`10000000000000000000` -> `"10"`).
pub fn from_wei(wei: U256) -> String {
    let formatted = format_ether(wei);
    match formatted.split_once('.') {
        Some((whole, frac)) => {
            let frac = frac.trim_end_matches('0');
            if frac.is_empty() {
                whole.to_string()
            } else {
                format!("{whole}.{frac}")
            }
        }
        None => formatted,
    }
}

/// Whole tokens to base units.
pub fn tokens(whole: u64) -> U256 {
    U256::from(whole) * U256::from(10u64).pow(U256::from(TOKEN_DECIMALS))
}
