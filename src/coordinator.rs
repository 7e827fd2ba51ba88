//! Two-leg bridge sequencing
//!
//! `Validated -> SourceLegPending -> SourceLegConfirmed -> DestLegPending -> Completed`,
//! with `Failed(kind)` reachable from any non-terminal state. The destination
//! leg is only attempted once the source leg is confirmed. A destination
//! failure after that point is a partial failure: nothing is retried or
//! rolled back, the intent is left in `needs_reconciliation`.
//!
//! A source transaction that was sent but never confirmed or rejected leaves
//! the intent in `source_unconfirmed` with its hash recorded, since it may
//! still land.

use std::sync::Arc;

use alloy::primitives::U256;
use tracing::{error, info, warn};

use crate::db::{IntentStore, NewIntent};
use crate::decimals;
use crate::error::{BridgeError, ErrorKind};
use crate::ledgers::{EthLedger, SuiLedger};
use crate::metrics;
use crate::types::{
    BridgeRequest, BridgeResult, BridgeState, Direction, IntentStatus, LedgerReceipt,
    ValidatedRequest,
};
use crate::validation::RequestValidator;

pub struct BridgeCoordinator {
    eth: Arc<dyn EthLedger>,
    sui: Arc<dyn SuiLedger>,
    intents: Arc<dyn IntentStore>,
    validator: RequestValidator,
}

impl BridgeCoordinator {
    pub fn new(
        eth: Arc<dyn EthLedger>,
        sui: Arc<dyn SuiLedger>,
        intents: Arc<dyn IntentStore>,
        validator: RequestValidator,
    ) -> Self {
        Self {
            eth,
            sui,
            intents,
            validator,
        }
    }

    /// Run one bridge operation to a terminal state.
    ///
    /// Never fails: every error is folded into the returned result.
    pub async fn bridge(&self, request: &BridgeRequest) -> BridgeResult {
        let request = match self.validator.validate(request) {
            Ok(r) => r,
            Err(e) => {
                let direction = request.direction.as_deref().and_then(Direction::parse);
                warn!(error = %e, "Rejected bridge request");
                return self.finish_failed(direction, None, None, &e);
            }
        };

        info!(
            direction = %request.direction,
            amount = %decimals::format_amount(request.amount, decimals::ETH_DECIMALS),
            converted_amount = request.converted_amount,
            eth_account = %request.eth_account,
            sui_account = %request.sui_account,
            "Bridge request validated"
        );

        let intent_id = match self.intents.create_intent(&NewIntent::from(&request)).await {
            Ok(id) => id,
            Err(e) => {
                error!(error = ?e, "Failed to persist bridge intent, nothing submitted");
                let err = BridgeError::Persistence(e.to_string());
                return self.finish_failed(Some(request.direction), None, None, &err);
            }
        };

        match self.run_legs(&request, intent_id).await {
            Ok((source, dest)) => {
                info!(
                    intent_id,
                    direction = %request.direction,
                    source = %source.id(),
                    dest = %dest.id(),
                    "Bridge completed"
                );
                metrics::record_request(request.direction.as_str(), true);
                metrics::record_volume(request.direction.as_str(), u256_to_f64(request.amount));
                BridgeResult::completed(request.direction, intent_id, source, dest)
            }
            Err(e) => {
                let source = e.confirmed_receipt().cloned();
                let unconfirmed = e.unconfirmed_tx().map(|(ledger, tx)| (ledger, tx.to_string()));
                if let Some((ledger, tx)) = &unconfirmed {
                    warn!(intent_id, ledger = %ledger, tx = %tx, "Transaction outcome unknown");
                    let recorded = if source.is_some() {
                        self.intents.record_dest_submitted(intent_id, tx).await
                    } else {
                        self.intents.record_source_submitted(intent_id, tx).await
                    };
                    if let Err(db_err) = recorded {
                        error!(intent_id, error = ?db_err, "Failed to record submitted tx");
                    }
                }

                if let Err(db_err) = self
                    .intents
                    .record_failure(intent_id, failure_status(&e), e.kind().code(), &e.to_string())
                    .await
                {
                    error!(intent_id, error = ?db_err, "Failed to record intent failure");
                }
                self.finish_failed(Some(request.direction), Some(intent_id), source, &e)
                    .with_unconfirmed_tx(unconfirmed)
            }
        }
    }

    /// Source leg then destination leg, persisting each transition
    async fn run_legs(
        &self,
        request: &ValidatedRequest,
        intent_id: i64,
    ) -> Result<(LedgerReceipt, LedgerReceipt), BridgeError> {
        self.transition(intent_id, BridgeState::SourceLegPending).await;
        info!(
            intent_id,
            ledger = %request.direction.source_ledger(),
            "Submitting source leg"
        );
        let source = self.source_leg(request, intent_id).await?;

        info!(
            intent_id,
            ledger = %source.ledger(),
            tx = %source.id(),
            "Source leg confirmed"
        );
        if let Err(e) = self.intents.record_source_receipt(intent_id, source.id()).await {
            error!(intent_id, error = ?e, "Failed to record source receipt");
        }

        self.transition(intent_id, BridgeState::DestLegPending).await;
        let dest = match self.dest_leg(request).await {
            Ok(r) => r,
            Err(cause) => {
                error!(
                    intent_id,
                    source_tx = %source.id(),
                    dest_ledger = %request.direction.dest_ledger(),
                    error = %cause,
                    "Destination leg failed after source leg confirmed; manual reconciliation required"
                );
                metrics::record_partial_failure();
                return Err(BridgeError::PartialFailure {
                    source_receipt: source,
                    cause: Box::new(cause),
                });
            }
        };

        if let Err(e) = self.intents.record_dest_receipt(intent_id, dest.id()).await {
            error!(intent_id, error = ?e, "Failed to record destination receipt");
        }
        Ok((source, dest))
    }

    async fn source_leg(
        &self,
        request: &ValidatedRequest,
        intent_id: i64,
    ) -> Result<LedgerReceipt, BridgeError> {
        match request.direction {
            Direction::EthToSui => {
                let receipt = self.eth.burn(request.eth_account, request.amount).await?;
                Ok(LedgerReceipt::Eth(receipt))
            }
            Direction::SuiToEth => {
                let coin = self
                    .sui
                    .select_spendable_object(&request.sui_account, request.converted_amount)
                    .await?;
                if coin.balance > request.converted_amount {
                    // burn takes the whole coin; the full balance is recorded on the intent
                    warn!(
                        intent_id,
                        coin = %coin.object_id,
                        balance = coin.balance,
                        requested = request.converted_amount,
                        "Selected coin exceeds the requested amount, burning whole coin"
                    );
                }
                let receipt = self.sui.burn(&coin.object_id).await?;
                if let Err(e) = self.intents.record_burned_amount(intent_id, coin.balance).await {
                    error!(intent_id, error = ?e, "Failed to record burned amount");
                }
                Ok(LedgerReceipt::Sui(receipt))
            }
        }
    }

    async fn dest_leg(&self, request: &ValidatedRequest) -> Result<LedgerReceipt, BridgeError> {
        match request.direction {
            Direction::EthToSui => {
                let receipt = self
                    .sui
                    .mint(request.converted_amount, &request.sui_account)
                    .await?;
                Ok(LedgerReceipt::Sui(receipt))
            }
            Direction::SuiToEth => {
                let receipt = self.eth.mint(request.eth_account, request.amount).await?;
                Ok(LedgerReceipt::Eth(receipt))
            }
        }
    }

    async fn transition(&self, intent_id: i64, state: BridgeState) {
        if let Err(e) = self
            .intents
            .update_status(intent_id, state.intent_status())
            .await
        {
            error!(intent_id, state = ?state, error = ?e, "Failed to persist intent status");
        }
    }

    fn finish_failed(
        &self,
        direction: Option<Direction>,
        intent_id: Option<i64>,
        source: Option<LedgerReceipt>,
        err: &BridgeError,
    ) -> BridgeResult {
        let kind = err.kind();
        metrics::record_request(direction.map_or("unknown", |d| d.as_str()), false);
        metrics::record_error(kind.code());
        BridgeResult::failed(direction, intent_id, source, kind, err.public_message())
    }
}

/// Persisted status for a failed operation
fn failure_status(err: &BridgeError) -> IntentStatus {
    match err.kind() {
        ErrorKind::PartialFailure => IntentStatus::NeedsReconciliation,
        _ if err.unconfirmed_tx().is_some() => IntentStatus::SourceUnconfirmed,
        kind => BridgeState::Failed(kind).intent_status(),
    }
}

fn u256_to_f64(amount: U256) -> f64 {
    amount.to_string().parse().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_status() {
        let timeout = BridgeError::ChainTimeout {
            ledger: crate::types::Ledger::Eth,
            tx_hash: "0xabc".into(),
            timeout_secs: 60,
        };
        assert_eq!(failure_status(&timeout), IntentStatus::SourceUnconfirmed);
        assert_eq!(
            failure_status(&BridgeError::eth_rpc("refused")),
            IntentStatus::Failed
        );
    }

    #[test]
    fn test_u256_to_f64() {
        assert_eq!(u256_to_f64(U256::from(1_500u64)), 1500.0);
        assert!(u256_to_f64(U256::MAX) > 1e76);
    }
}
