use std::fmt;

use alloy::network::EthereumWallet;
use alloy::primitives::Address;
use alloy::signers::local::coins_bip39::English;
use alloy::signers::local::{MnemonicBuilder, PrivateKeySigner};
use tokensale_core::NetworkProfile;
use tracing::info;

use crate::error::{ChainError, Result};

/// Where the transaction-signing accounts come from.
#[derive(Clone)]
pub enum WalletSource {
    /// The node's own unlocked accounts (`eth_accounts`).
    Node,
    /// HD accounts derived from a BIP-39 phrase.
    Mnemonic { phrase: String, accounts: u32 },
}

impl fmt::Debug for WalletSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WalletSource::Node => f.write_str("Node"),
            WalletSource::Mnemonic { accounts, .. } => f
                .debug_struct("Mnemonic")
                .field("phrase", &"<redacted>")
                .field("accounts", accounts)
                .finish(),
        }
    }
}

impl WalletSource {
    /// Remote profiles sign locally from the mnemonic named by their
    /// credentials; everything else uses the node's accounts.
    pub fn for_profile(profile: &NetworkProfile) -> Result<Self> {
        match &profile.credentials {
            Some(creds) => Ok(WalletSource::Mnemonic {
                phrase: creds.mnemonic()?,
                accounts: creds.accounts,
            }),
            None => Ok(WalletSource::Node),
        }
    }
}

/// The accounts available to send transactions from.
#[derive(Clone)]
pub enum Wallet {
    /// Accounts held and signed for by the node.
    NodeManaged(Vec<Address>),
    /// Accounts whose keys live in this process.
    Local(Vec<PrivateKeySigner>),
}

impl fmt::Debug for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Wallet::NodeManaged(accounts) => f.debug_tuple("NodeManaged").field(accounts).finish(),
            Wallet::Local(_) => f.debug_tuple("Local").field(&self.addresses()).finish(),
        }
    }
}

impl Wallet {
    /// Derive the first `count` accounts on path `m/44'/60'/0'/0/i`.
    pub fn from_mnemonic(phrase: &str, count: u32) -> Result<Self> {
        if count == 0 {
            return Err(ChainError::Wallet("at least one account is required".into()));
        }
        let signers = (0..count)
            .map(|index| {
                MnemonicBuilder::<English>::default()
                    .phrase(phrase.trim())
                    .index(index)
                    .and_then(|builder| builder.build())
                    .map_err(|e| ChainError::Wallet(format!("failed to derive account {index}: {e}")))
            })
            .collect::<Result<Vec<_>>>()?;
        info!(accounts = signers.len(), "derived HD accounts from mnemonic");
        Ok(Wallet::Local(signers))
    }

    pub fn addresses(&self) -> Vec<Address> {
        match self {
            Wallet::NodeManaged(accounts) => accounts.clone(),
            Wallet::Local(signers) => signers.iter().map(|s| s.address()).collect(),
        }
    }

    /// Account by position, as `accounts[index]` in a test script.
    pub fn account(&self, index: usize) -> Result<Address> {
        self.addresses()
            .get(index)
            .copied()
            .ok_or(ChainError::UnknownAccount(index))
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Wallet::Local(_))
    }

    pub fn signer_for(&self, address: Address) -> Option<&PrivateKeySigner> {
        match self {
            Wallet::NodeManaged(_) => None,
            Wallet::Local(signers) => signers.iter().find(|s| s.address() == address),
        }
    }

    /// The provider's signing wallet; `None` when the node signs.
    pub fn ethereum_wallet(&self) -> Option<EthereumWallet> {
        let Wallet::Local(signers) = self else {
            return None;
        };
        let (first, rest) = signers.split_first()?;
        let mut wallet = EthereumWallet::new(first.clone());
        for signer in rest {
            wallet.register_signer(signer.clone());
        }
        Some(wallet)
    }
}
