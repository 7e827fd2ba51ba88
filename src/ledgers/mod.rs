//! Ledger adapters
//!
//! The coordinator only sees these traits. Production adapters are built
//! once at startup and shared across requests; tests substitute fakes.

use alloy::primitives::{Address, U256};
use async_trait::async_trait;

use crate::error::BridgeError;
use crate::types::{EthReceipt, ObjectRef, SpendableCoin, SuiReceipt};

pub mod eth;
pub mod sui;

pub use eth::EthAdapter;
pub use sui::SuiAdapter;

/// Account/contract ledger holding the bridged ERC-20
#[async_trait]
pub trait EthLedger: Send + Sync {
    /// Burn `amount` from `account` and wait for inclusion
    async fn burn(&self, account: Address, amount: U256) -> Result<EthReceipt, BridgeError>;

    /// Mint `amount` to `account` and wait for inclusion
    async fn mint(&self, account: Address, amount: U256) -> Result<EthReceipt, BridgeError>;
}

/// Versioned-object ledger holding the bridged coin
#[async_trait]
pub trait SuiLedger: Send + Sync {
    /// Current version of each object, in the order given
    async fn refresh_object_refs(&self, object_ids: &[String])
        -> Result<Vec<ObjectRef>, BridgeError>;

    /// Mint `amount` (Sui base units) to `recipient`
    async fn mint(&self, amount: u64, recipient: &str) -> Result<SuiReceipt, BridgeError>;

    /// Burn the whole coin object `coin_object_id`
    async fn burn(&self, coin_object_id: &str) -> Result<SuiReceipt, BridgeError>;

    /// Pick a bridge coin owned by `owner` whose balance covers `min_balance`
    async fn select_spendable_object(
        &self,
        owner: &str,
        min_balance: u64,
    ) -> Result<SpendableCoin, BridgeError>;
}
