//! In-process intent store

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use eyre::{eyre, Result};

use super::{BridgeIntent, IntentStore, NewIntent};
use crate::types::IntentStatus;

#[derive(Debug, Default)]
pub struct MemoryIntentStore {
    intents: Mutex<Vec<BridgeIntent>>,
}

impl MemoryIntentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn update<F>(&self, id: i64, apply: F) -> Result<()>
    where
        F: FnOnce(&mut BridgeIntent),
    {
        let mut intents = self
            .intents
            .lock()
            .map_err(|_| eyre!("intent store lock poisoned"))?;
        let intent = intents
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| eyre!("intent {} not found", id))?;
        apply(intent);
        intent.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl IntentStore for MemoryIntentStore {
    async fn create_intent(&self, intent: &NewIntent) -> Result<i64> {
        let mut intents = self
            .intents
            .lock()
            .map_err(|_| eyre!("intent store lock poisoned"))?;
        let id = intents.len() as i64 + 1;
        let now = Utc::now();
        intents.push(BridgeIntent {
            id,
            direction: intent.direction.clone(),
            amount: intent.amount.clone(),
            converted_amount: intent.converted_amount.clone(),
            eth_account: intent.eth_account.clone(),
            sui_account: intent.sui_account.clone(),
            status: IntentStatus::Validated,
            source_tx: None,
            dest_tx: None,
            burned_amount: None,
            error_kind: None,
            error_detail: None,
            created_at: now,
            updated_at: now,
        });
        Ok(id)
    }

    async fn update_status(&self, id: i64, status: IntentStatus) -> Result<()> {
        self.update(id, |i| i.status = status)
    }

    async fn record_source_receipt(&self, id: i64, tx_id: &str) -> Result<()> {
        self.update(id, |i| {
            i.source_tx = Some(tx_id.to_string());
            i.status = IntentStatus::SourceConfirmed;
        })
    }

    async fn record_dest_receipt(&self, id: i64, tx_id: &str) -> Result<()> {
        self.update(id, |i| {
            i.dest_tx = Some(tx_id.to_string());
            i.status = IntentStatus::Completed;
        })
    }

    async fn record_source_submitted(&self, id: i64, tx_id: &str) -> Result<()> {
        self.update(id, |i| i.source_tx = Some(tx_id.to_string()))
    }

    async fn record_dest_submitted(&self, id: i64, tx_id: &str) -> Result<()> {
        self.update(id, |i| i.dest_tx = Some(tx_id.to_string()))
    }

    async fn record_burned_amount(&self, id: i64, amount: u64) -> Result<()> {
        self.update(id, |i| i.burned_amount = Some(amount.to_string()))
    }

    async fn record_failure(
        &self,
        id: i64,
        status: IntentStatus,
        error_kind: &str,
        error_detail: &str,
    ) -> Result<()> {
        self.update(id, |i| {
            i.status = status;
            i.error_kind = Some(error_kind.to_string());
            i.error_detail = Some(error_detail.to_string());
        })
    }

    async fn get_intent(&self, id: i64) -> Result<Option<BridgeIntent>> {
        let intents = self
            .intents
            .lock()
            .map_err(|_| eyre!("intent store lock poisoned"))?;
        Ok(intents.iter().find(|i| i.id == id).cloned())
    }

    async fn list_by_status(
        &self,
        statuses: &[IntentStatus],
        limit: i64,
    ) -> Result<Vec<BridgeIntent>> {
        let intents = self
            .intents
            .lock()
            .map_err(|_| eyre!("intent store lock poisoned"))?;
        // ids grow with insertion order
        Ok(intents
            .iter()
            .rev()
            .filter(|i| statuses.contains(&i.status))
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }
}
