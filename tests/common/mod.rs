//! In-process fake ledgers shared by the integration tests

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy::primitives::{Address, U256};
use async_trait::async_trait;

use eth_sui_bridge::coordinator::BridgeCoordinator;
use eth_sui_bridge::db::{IntentStore, MemoryIntentStore};
use eth_sui_bridge::error::BridgeError;
use eth_sui_bridge::ledgers::eth::await_inclusion;
use eth_sui_bridge::ledgers::{EthLedger, SuiLedger};
use eth_sui_bridge::types::{
    BridgeRequest, EthReceipt, Ledger, ObjectRef, SpendableCoin, SuiReceipt,
};
use eth_sui_bridge::validation::RequestValidator;

pub const ETH_ACCOUNT: &str = "0x1111111111111111111111111111111111111111";
pub const SUI_ACCOUNT: &str = "0x2222222222222222222222222222222222222222222222222222222222222222";

/// Ordered record of every ledger call made through the fakes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    EthBurn(Address, U256),
    EthMint(Address, U256),
    SuiSelect(String, u64),
    SuiBurn(String),
    SuiMint(u64, String),
}

pub type CallLog = Arc<Mutex<Vec<Call>>>;

#[derive(Debug, Clone)]
pub enum EthBehavior {
    Confirm(String),
    /// Inclusion never resolves; the wait gives up after the bound
    Hang(Duration),
    Revert,
}

pub struct FakeEth {
    pub log: CallLog,
    pub burn: EthBehavior,
    pub mint: EthBehavior,
}

impl FakeEth {
    async fn respond(
        &self,
        behavior: &EthBehavior,
        amount: U256,
    ) -> Result<EthReceipt, BridgeError> {
        match behavior {
            EthBehavior::Confirm(hash) => Ok(EthReceipt {
                tx_hash: hash.clone(),
                block_number: Some(100),
                amount: amount.to_string(),
                finalized: true,
            }),
            EthBehavior::Hang(bound) => {
                let never = std::future::pending::<Result<EthReceipt, String>>();
                await_inclusion("0xpending", *bound, never).await
            }
            EthBehavior::Revert => Err(BridgeError::ChainExecution {
                ledger: Ledger::Eth,
                tx_id: Some("0xreverted".to_string()),
                reason: "execution reverted".to_string(),
            }),
        }
    }
}

#[async_trait]
impl EthLedger for FakeEth {
    async fn burn(&self, account: Address, amount: U256) -> Result<EthReceipt, BridgeError> {
        self.log.lock().unwrap().push(Call::EthBurn(account, amount));
        self.respond(&self.burn, amount).await
    }

    async fn mint(&self, account: Address, amount: U256) -> Result<EthReceipt, BridgeError> {
        self.log.lock().unwrap().push(Call::EthMint(account, amount));
        self.respond(&self.mint, amount).await
    }
}

pub struct FakeSui {
    pub log: CallLog,
    pub coins: Vec<SpendableCoin>,
    pub mint_digest: Option<String>,
    pub burn_digest: String,
}

impl FakeSui {
    fn receipt(digest: &str) -> SuiReceipt {
        SuiReceipt {
            digest: digest.to_string(),
            status: "success".to_string(),
            authority_refs: vec![],
            mutated: vec![],
        }
    }
}

#[async_trait]
impl SuiLedger for FakeSui {
    async fn refresh_object_refs(
        &self,
        object_ids: &[String],
    ) -> Result<Vec<ObjectRef>, BridgeError> {
        Ok(object_ids
            .iter()
            .map(|id| ObjectRef {
                object_id: id.clone(),
                version: 1,
                digest: String::new(),
            })
            .collect())
    }

    async fn mint(&self, amount: u64, recipient: &str) -> Result<SuiReceipt, BridgeError> {
        self.log
            .lock()
            .unwrap()
            .push(Call::SuiMint(amount, recipient.to_string()));
        match &self.mint_digest {
            Some(d) => Ok(Self::receipt(d)),
            None => Err(BridgeError::ChainExecution {
                ledger: Ledger::Sui,
                tx_id: Some("Dfailed".to_string()),
                reason: "MoveAbort".to_string(),
            }),
        }
    }

    async fn burn(&self, coin_object_id: &str) -> Result<SuiReceipt, BridgeError> {
        self.log
            .lock()
            .unwrap()
            .push(Call::SuiBurn(coin_object_id.to_string()));
        Ok(Self::receipt(&self.burn_digest))
    }

    async fn select_spendable_object(
        &self,
        owner: &str,
        min_balance: u64,
    ) -> Result<SpendableCoin, BridgeError> {
        self.log
            .lock()
            .unwrap()
            .push(Call::SuiSelect(owner.to_string(), min_balance));
        if self.coins.is_empty() {
            return Err(BridgeError::NoSpendableObject {
                owner: owner.to_string(),
                coin_type: "0xpkg::token::TOKEN".to_string(),
            });
        }
        self.coins
            .iter()
            .filter(|c| c.balance >= min_balance)
            .min_by_key(|c| c.balance)
            .cloned()
            .ok_or_else(|| BridgeError::InsufficientBalance {
                owner: owner.to_string(),
                required: min_balance,
                largest: self.coins.iter().map(|c| c.balance).max().unwrap_or(0),
            })
    }
}

/// Fakes plus the coordinator wired to them
pub struct Harness {
    pub log: CallLog,
    pub intents: Arc<MemoryIntentStore>,
    pub coordinator: Arc<BridgeCoordinator>,
}

pub struct HarnessBuilder {
    pub eth_burn: EthBehavior,
    pub eth_mint: EthBehavior,
    pub coins: Vec<SpendableCoin>,
    pub sui_mint_digest: Option<String>,
}

impl Default for HarnessBuilder {
    fn default() -> Self {
        Self {
            eth_burn: EthBehavior::Confirm("H1".to_string()),
            eth_mint: EthBehavior::Confirm("H2".to_string()),
            coins: vec![],
            sui_mint_digest: Some("D1".to_string()),
        }
    }
}

impl HarnessBuilder {
    pub fn build(self) -> Harness {
        let log: CallLog = Arc::new(Mutex::new(Vec::new()));
        let eth = Arc::new(FakeEth {
            log: log.clone(),
            burn: self.eth_burn,
            mint: self.eth_mint,
        });
        let sui = Arc::new(FakeSui {
            log: log.clone(),
            coins: self.coins,
            mint_digest: self.sui_mint_digest,
            burn_digest: "B1".to_string(),
        });
        let intents = Arc::new(MemoryIntentStore::new());
        let store: Arc<dyn IntentStore> = intents.clone();
        let coordinator = Arc::new(BridgeCoordinator::new(
            eth,
            sui,
            store,
            RequestValidator::default(),
        ));
        Harness {
            log,
            intents,
            coordinator,
        }
    }
}

impl Harness {
    pub fn calls(&self) -> Vec<Call> {
        self.log.lock().unwrap().clone()
    }
}

pub fn coin(id: &str, balance: u64) -> SpendableCoin {
    SpendableCoin {
        object_id: id.to_string(),
        balance,
    }
}

pub fn request(direction: &str, amount: &str) -> BridgeRequest {
    BridgeRequest {
        direction: Some(direction.to_string()),
        amount: Some(amount.to_string()),
        eth_account: Some(ETH_ACCOUNT.to_string()),
        sui_account: Some(SUI_ACCOUNT.to_string()),
    }
}
