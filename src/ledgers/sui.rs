//! Sui adapter - mints and burns the bridged coin
//!
//! Every call references the treasury and minter capabilities, which are
//! shared owned objects whose version changes with each transaction. A call
//! locks them in the [`AuthorityLocks`] arena, refreshes their refs, builds
//! and submits the move call, and only then releases them.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::SuiLedger;
use crate::config::SuiConfig;
use crate::error::BridgeError;
use crate::metrics;
use crate::object_locks::AuthorityLocks;
use crate::retry::{classify_error, ErrorClass};
use crate::types::{Ledger, ObjectRef, SpendableCoin, SuiReceipt};

/// Re-reads allowed when a node returns a version older than one already executed against
const STALE_REFRESH_ATTEMPTS: u32 = 3;
const STALE_REFRESH_DELAY: Duration = Duration::from_millis(200);

/// A move call against the bridge package.
///
/// The authority refs are passed as the leading arguments, followed by
/// `arguments`.
#[derive(Debug, Clone)]
pub struct MoveCall {
    pub package: String,
    pub module: String,
    pub function: String,
    pub authority_refs: Vec<ObjectRef>,
    pub arguments: Vec<Value>,
    pub gas_budget: u64,
}

/// What the node reported after executing a transaction
#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    pub digest: String,
    pub success: bool,
    pub error: Option<String>,
    pub mutated: Vec<ObjectRef>,
}

/// Node operations the adapter needs
#[async_trait]
pub trait SuiRpc: Send + Sync {
    /// Latest ref of an object, `None` if it does not exist
    async fn get_object_ref(&self, object_id: &str) -> Result<Option<ObjectRef>, BridgeError>;

    /// All coins of `coin_type` owned by `owner`
    async fn get_coins(&self, owner: &str, coin_type: &str)
        -> Result<Vec<SpendableCoin>, BridgeError>;

    /// Build, sign and execute a move call, waiting for local execution
    async fn execute_move_call(&self, call: &MoveCall) -> Result<ExecutionOutcome, BridgeError>;
}

pub struct SuiAdapter {
    rpc: Arc<dyn SuiRpc>,
    locks: Arc<AuthorityLocks>,
    package_id: String,
    module_name: String,
    coin_type: String,
    treasury_cap_id: String,
    minter_cap_id: String,
    gas_budget: u64,
    max_version_retries: u32,
}

impl SuiAdapter {
    pub fn new(config: &SuiConfig, rpc: Arc<dyn SuiRpc>) -> Self {
        info!(
            package_id = %config.package_id,
            module = %config.module_name,
            coin_type = %config.coin_type,
            "Sui adapter initialized"
        );

        Self {
            rpc,
            locks: Arc::new(AuthorityLocks::new()),
            package_id: config.package_id.clone(),
            module_name: config.module_name.clone(),
            coin_type: config.coin_type.clone(),
            treasury_cap_id: config.treasury_cap_id.clone(),
            minter_cap_id: config.minter_cap_id.clone(),
            gas_budget: config.gas_budget,
            max_version_retries: 1,
        }
    }

    fn authority_ids(&self) -> Vec<String> {
        vec![self.treasury_cap_id.clone(), self.minter_cap_id.clone()]
    }

    /// Fetch one ref, re-reading while the node lags behind executed effects
    async fn fresh_object_ref(&self, object_id: &str) -> Result<ObjectRef, BridgeError> {
        let mut attempt = 0;
        loop {
            let object_ref =
                self.rpc
                    .get_object_ref(object_id)
                    .await?
                    .ok_or_else(|| BridgeError::ObjectState {
                        object_id: object_id.to_string(),
                        reason: "object not found".to_string(),
                    })?;

            if self.locks.is_fresh(&object_ref) {
                return Ok(object_ref);
            }

            attempt += 1;
            let observed = self.locks.observed_version(object_id).unwrap_or_default();
            if attempt >= STALE_REFRESH_ATTEMPTS {
                return Err(BridgeError::ObjectState {
                    object_id: object_id.to_string(),
                    reason: format!(
                        "node returned version {} but {} was already executed",
                        object_ref.version, observed
                    ),
                });
            }
            debug!(
                object_id = %object_id,
                version = object_ref.version,
                observed,
                attempt,
                "Stale object version, re-reading"
            );
            tokio::time::sleep(STALE_REFRESH_DELAY).await;
        }
    }

    /// Lock the authority objects (plus any extra ids), then refresh, build and submit
    async fn execute_authorized(
        &self,
        function: &str,
        extra_lock_ids: &[String],
        arguments: Vec<Value>,
    ) -> Result<SuiReceipt, BridgeError> {
        let authority_ids = self.authority_ids();
        let mut lock_ids = authority_ids.clone();
        lock_ids.extend_from_slice(extra_lock_ids);

        let _guard = self.locks.acquire(&lock_ids).await;
        let started = Instant::now();

        let mut attempt = 0;
        let result = loop {
            let authority_refs = self.refresh_object_refs(&authority_ids).await?;
            let call = MoveCall {
                package: self.package_id.clone(),
                module: self.module_name.clone(),
                function: function.to_string(),
                authority_refs: authority_refs.clone(),
                arguments: arguments.clone(),
                gas_budget: self.gas_budget,
            };

            debug!(
                function = %function,
                refs = ?authority_refs,
                attempt,
                "Submitting move call"
            );

            let outcome = self.rpc.execute_move_call(&call).await;

            let conflict = match &outcome {
                Ok(o) => {
                    self.locks.record_versions(&o.mutated);
                    !o.success
                        && o.error.as_deref().map(classify_error) == Some(ErrorClass::VersionConflict)
                }
                Err(e) => classify_error(&e.to_string()) == ErrorClass::VersionConflict,
            };

            if conflict && attempt < self.max_version_retries {
                attempt += 1;
                metrics::record_version_conflict_retry();
                warn!(function = %function, attempt, "Version conflict, rebuilding against fresh refs");
                continue;
            }

            break outcome.map(|o| (o, authority_refs));
        };
        metrics::record_leg_latency(Ledger::Sui.as_str(), function, started.elapsed().as_secs_f64());

        let (outcome, authority_refs) = result?;
        if !outcome.success {
            let reason = outcome
                .error
                .unwrap_or_else(|| "execution status not success".to_string());
            warn!(digest = %outcome.digest, function = %function, reason = %reason, "Move call failed");
            return Err(BridgeError::ChainExecution {
                ledger: Ledger::Sui,
                tx_id: Some(outcome.digest),
                reason,
            });
        }

        info!(digest = %outcome.digest, function = %function, "Move call executed");

        Ok(SuiReceipt {
            digest: outcome.digest,
            status: "success".to_string(),
            authority_refs,
            mutated: outcome.mutated,
        })
    }
}

#[async_trait]
impl SuiLedger for SuiAdapter {
    async fn refresh_object_refs(
        &self,
        object_ids: &[String],
    ) -> Result<Vec<ObjectRef>, BridgeError> {
        let mut refs = Vec::with_capacity(object_ids.len());
        for id in object_ids {
            refs.push(self.fresh_object_ref(id).await?);
        }
        Ok(refs)
    }

    async fn mint(&self, amount: u64, recipient: &str) -> Result<SuiReceipt, BridgeError> {
        self.execute_authorized(
            "mint",
            &[],
            vec![
                Value::String(amount.to_string()),
                Value::String(recipient.to_string()),
            ],
        )
        .await
    }

    async fn burn(&self, coin_object_id: &str) -> Result<SuiReceipt, BridgeError> {
        self.execute_authorized(
            "burn",
            &[coin_object_id.to_string()],
            vec![Value::String(coin_object_id.to_string())],
        )
        .await
    }

    async fn select_spendable_object(
        &self,
        owner: &str,
        min_balance: u64,
    ) -> Result<SpendableCoin, BridgeError> {
        let coins = self.rpc.get_coins(owner, &self.coin_type).await?;
        let selected = select_coin(coins, min_balance).map_err(|largest| match largest {
            None => BridgeError::NoSpendableObject {
                owner: owner.to_string(),
                coin_type: self.coin_type.clone(),
            },
            Some(largest) => BridgeError::InsufficientBalance {
                owner: owner.to_string(),
                required: min_balance,
                largest,
            },
        })?;

        debug!(
            owner = %owner,
            coin = %selected.object_id,
            balance = selected.balance,
            min_balance,
            "Selected coin for burn"
        );
        Ok(selected)
    }
}

/// Exact-balance coin if there is one, else the smallest that covers `min_balance`.
///
/// On failure returns the largest balance seen, or `None` when there were no coins.
fn select_coin(coins: Vec<SpendableCoin>, min_balance: u64) -> Result<SpendableCoin, Option<u64>> {
    let largest = coins.iter().map(|c| c.balance).max();
    coins
        .into_iter()
        .filter(|c| c.balance >= min_balance)
        .min_by_key(|c| c.balance)
        .ok_or(largest)
}
