use std::path::Path;
use std::sync::Arc;

use alloy::primitives::{Address, B256, U256};
use tracing::{debug, info};

use crate::connection::Connection;
use crate::contracts::{SaleHandle, TokenHandle};
use crate::deploy::DeploymentRecord;
use crate::error::{ChainError, Result};
use crate::units::from_wei;

pub const TOKEN_SYMBOL: &str = "MTK";

/// What one interaction run observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteractionReport {
    pub buyer: Address,
    pub sale_balance: U256,
    pub token_price: U256,
    pub tokens_bought: u64,
    pub value_paid: U256,
    pub tx_hash: B256,
    pub buyer_balance: U256,
}

impl InteractionReport {
    /// Human-readable summary, one line per step.
    pub fn lines(&self) -> Vec<String> {
        vec![
            format!(
                "Token Sale Contract Balance: {} {TOKEN_SYMBOL}",
                from_wei(self.sale_balance)
            ),
            format!("Bought {} tokens", self.tokens_bought),
            format!("New Balance: {} {TOKEN_SYMBOL}", from_wei(self.buyer_balance)),
        ]
    }
}

/// Cost in wei of `tokens` whole tokens at `price` wei each.
pub fn purchase_value(price: U256, tokens: u64) -> Result<U256> {
    price
        .checked_mul(U256::from(tokens))
        .ok_or_else(|| ChainError::InvalidInput(format!("{tokens} tokens at {price} wei overflows")))
}

/// Locate the token and sale contracts.
///
/// Explicit addresses win. With only a sale address the token is read from
/// its `tokenContract()`. Anything still missing comes from the deployment
/// record at `record_path`.
pub async fn resolve_addresses(
    conn: &Arc<Connection>,
    token: Option<Address>,
    sale: Option<Address>,
    record_path: &Path,
) -> Result<(TokenHandle, SaleHandle)> {
    match (token, sale) {
        (Some(token), Some(sale)) => Ok((
            TokenHandle::new(conn.clone(), token),
            SaleHandle::new(conn.clone(), sale),
        )),
        (None, Some(sale)) => {
            let sale = SaleHandle::new(conn.clone(), sale);
            let token = sale.token().await?;
            debug!(sale = %sale.address(), token = %token.address(), "token address read from sale");
            Ok((token, sale))
        }
        (token, None) => {
            let record = DeploymentRecord::load(record_path)?;
            debug!(path = %record_path.display(), "addresses read from deployment record");
            Ok((
                TokenHandle::new(conn.clone(), token.unwrap_or(record.token)),
                SaleHandle::new(conn.clone(), record.sale),
            ))
        }
    }
}

/// Check the sale's stock, buy `tokens_to_buy` tokens from account 0 at the
/// advertised price, and read back the buyer's balance.
pub async fn run_interaction(
    token: &TokenHandle,
    sale: &SaleHandle,
    tokens_to_buy: u64,
) -> Result<InteractionReport> {
    let buyer = sale.connection().account(0)?;

    let sale_balance = token.balance_of(sale.address()).await?;
    info!(
        sale = %sale.address(),
        balance = %from_wei(sale_balance),
        "sale contract balance"
    );

    let token_price = sale.token_price().await?;
    let value_paid = purchase_value(token_price, tokens_to_buy)?;

    let receipt = sale.buy_tokens(buyer, tokens_to_buy, value_paid).await?;
    info!(
        %buyer,
        tokens = tokens_to_buy,
        value = %value_paid,
        tx = %receipt.transaction_hash,
        "bought tokens"
    );

    let buyer_balance = token.balance_of(buyer).await?;
    info!(%buyer, balance = %from_wei(buyer_balance), "buyer balance");

    Ok(InteractionReport {
        buyer,
        sale_balance,
        token_price,
        tokens_bought: tokens_to_buy,
        value_paid,
        tx_hash: receipt.transaction_hash,
        buyer_balance,
    })
}
