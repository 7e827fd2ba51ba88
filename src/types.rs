//! Common types for bridge operations
//!
//! Requests as they arrive from the HTTP boundary, the validated form the
//! coordinator works on, per-ledger receipts, and the unified result.

use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ErrorKind;

/// Bridge direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Burn on Ethereum, mint on Sui
    #[serde(rename = "eth-to-sui")]
    EthToSui,
    /// Burn on Sui, mint on Ethereum
    #[serde(rename = "sui-to-eth")]
    SuiToEth,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::EthToSui => "eth-to-sui",
            Direction::SuiToEth => "sui-to-eth",
        }
    }

    /// Parse the wire value used by the HTTP API
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "eth-to-sui" => Some(Direction::EthToSui),
            "sui-to-eth" => Some(Direction::SuiToEth),
            _ => None,
        }
    }

    /// Ledger the source leg runs on
    pub fn source_ledger(&self) -> Ledger {
        match self {
            Direction::EthToSui => Ledger::Eth,
            Direction::SuiToEth => Ledger::Sui,
        }
    }

    /// Ledger the destination leg runs on
    pub fn dest_ledger(&self) -> Ledger {
        match self {
            Direction::EthToSui => Ledger::Sui,
            Direction::SuiToEth => Ledger::Eth,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The two bridged ledgers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ledger {
    Eth,
    Sui,
}

impl Ledger {
    pub fn as_str(&self) -> &'static str {
        match self {
            Ledger::Eth => "eth",
            Ledger::Sui => "sui",
        }
    }

    /// Human readable chain name for client-facing messages
    pub fn display_name(&self) -> &'static str {
        match self {
            Ledger::Eth => "Ethereum",
            Ledger::Sui => "Sui",
        }
    }
}

impl fmt::Display for Ledger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw bridge request as posted to `/api/bridge`.
///
/// Every field is optional so that a missing field surfaces as a
/// validation failure instead of a deserialization rejection.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeRequest {
    #[serde(default)]
    pub direction: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub amount: Option<String>,
    #[serde(default)]
    pub eth_account: Option<String>,
    #[serde(default)]
    pub sui_account: Option<String>,
}

/// Accept `"1.5"` as well as `1.5`; anything else becomes `None`
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// A request that passed validation. Immutable from here on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRequest {
    pub direction: Direction,
    /// Amount in Ethereum base units
    pub amount: U256,
    /// Amount in Sui base units (truncated for eth-to-sui, exact for sui-to-eth)
    pub converted_amount: u64,
    pub eth_account: Address,
    /// Normalized lowercase `0x`-prefixed Sui address
    pub sui_account: String,
}

/// Reference to a versioned Sui object at a point in time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectRef {
    pub object_id: String,
    pub version: u64,
    pub digest: String,
}

/// Coin object that can be consumed by a Sui burn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpendableCoin {
    pub object_id: String,
    pub balance: u64,
}

/// Ethereum inclusion receipt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EthReceipt {
    pub tx_hash: String,
    pub block_number: Option<u64>,
    /// Amount minted or burned, in base units
    pub amount: String,
    pub finalized: bool,
}

/// Sui execution receipt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuiReceipt {
    pub digest: String,
    pub status: String,
    /// Authority object refs the transaction was built from
    pub authority_refs: Vec<ObjectRef>,
    /// Authority object versions after execution
    #[serde(default)]
    pub mutated: Vec<ObjectRef>,
}

/// Ledger-specific confirmation record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "ledger", rename_all = "lowercase")]
pub enum LedgerReceipt {
    Eth(EthReceipt),
    Sui(SuiReceipt),
}

impl LedgerReceipt {
    /// Transaction hash (Ethereum) or digest (Sui)
    pub fn id(&self) -> &str {
        match self {
            LedgerReceipt::Eth(r) => &r.tx_hash,
            LedgerReceipt::Sui(r) => &r.digest,
        }
    }

    pub fn ledger(&self) -> Ledger {
        match self {
            LedgerReceipt::Eth(_) => Ledger::Eth,
            LedgerReceipt::Sui(_) => Ledger::Sui,
        }
    }
}

/// Coordinator state for a single bridge operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    Validated,
    SourceLegPending,
    SourceLegConfirmed,
    DestLegPending,
    Completed,
    Failed(ErrorKind),
}

impl BridgeState {
    /// Persisted status for this state
    pub fn intent_status(&self) -> IntentStatus {
        match self {
            BridgeState::Validated => IntentStatus::Validated,
            BridgeState::SourceLegPending => IntentStatus::SourcePending,
            BridgeState::SourceLegConfirmed => IntentStatus::SourceConfirmed,
            BridgeState::DestLegPending => IntentStatus::DestPending,
            BridgeState::Completed => IntentStatus::Completed,
            BridgeState::Failed(ErrorKind::PartialFailure) => IntentStatus::NeedsReconciliation,
            BridgeState::Failed(_) => IntentStatus::Failed,
        }
    }
}

/// Persisted status of an intent record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "VARCHAR", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum IntentStatus {
    Validated,
    SourcePending,
    SourceConfirmed,
    DestPending,
    Completed,
    Failed,
    NeedsReconciliation,
    /// Source transaction submitted, outcome unknown
    SourceUnconfirmed,
}

impl IntentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntentStatus::Validated => "validated",
            IntentStatus::SourcePending => "source_pending",
            IntentStatus::SourceConfirmed => "source_confirmed",
            IntentStatus::DestPending => "dest_pending",
            IntentStatus::Completed => "completed",
            IntentStatus::Failed => "failed",
            IntentStatus::NeedsReconciliation => "needs_reconciliation",
            IntentStatus::SourceUnconfirmed => "source_unconfirmed",
        }
    }
}

impl fmt::Display for IntentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Unified outcome of one bridge operation.
///
/// On a partial failure `source_receipt` is set while `dest_receipt` is not.
/// `unconfirmed_tx` names a transaction that was submitted but whose outcome
/// is unknown (inclusion wait timed out or the receipt could not be fetched).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeResult {
    pub success: bool,
    pub direction: Option<Direction>,
    pub intent_id: Option<i64>,
    pub source_receipt: Option<LedgerReceipt>,
    pub dest_receipt: Option<LedgerReceipt>,
    pub error_kind: Option<ErrorKind>,
    /// Client-safe error message
    pub error_detail: Option<String>,
    pub unconfirmed_tx: Option<(Ledger, String)>,
}

impl BridgeResult {
    pub fn completed(
        direction: Direction,
        intent_id: i64,
        source: LedgerReceipt,
        dest: LedgerReceipt,
    ) -> Self {
        Self {
            success: true,
            direction: Some(direction),
            intent_id: Some(intent_id),
            source_receipt: Some(source),
            dest_receipt: Some(dest),
            error_kind: None,
            error_detail: None,
            unconfirmed_tx: None,
        }
    }

    pub fn failed(
        direction: Option<Direction>,
        intent_id: Option<i64>,
        source: Option<LedgerReceipt>,
        kind: ErrorKind,
        detail: String,
    ) -> Self {
        Self {
            success: false,
            direction,
            intent_id,
            source_receipt: source,
            dest_receipt: None,
            error_kind: Some(kind),
            error_detail: Some(detail),
            unconfirmed_tx: None,
        }
    }

    pub fn with_unconfirmed_tx(mut self, tx: Option<(Ledger, String)>) -> Self {
        self.unconfirmed_tx = tx;
        self
    }

    /// Final coordinator state this result corresponds to
    pub fn state(&self) -> BridgeState {
        match self.error_kind {
            None => BridgeState::Completed,
            Some(kind) => BridgeState::Failed(kind),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_parse() {
        assert_eq!(Direction::parse("eth-to-sui"), Some(Direction::EthToSui));
        assert_eq!(Direction::parse("sui-to-eth"), Some(Direction::SuiToEth));
        assert_eq!(Direction::parse("eth-to-eth"), None);
        assert_eq!(Direction::parse(""), None);
    }

    #[test]
    fn test_direction_legs() {
        assert_eq!(Direction::EthToSui.source_ledger(), Ledger::Eth);
        assert_eq!(Direction::EthToSui.dest_ledger(), Ledger::Sui);
        assert_eq!(Direction::SuiToEth.source_ledger(), Ledger::Sui);
        assert_eq!(Direction::SuiToEth.dest_ledger(), Ledger::Eth);
    }

    #[test]
    fn test_request_deserialize_camel_case() {
        let req: BridgeRequest = serde_json::from_str(
            r#"{"direction":"eth-to-sui","amount":"1.5","ethAccount":"0xabc","suiAccount":"0xdef"}"#,
        )
        .unwrap();
        assert_eq!(req.direction.as_deref(), Some("eth-to-sui"));
        assert_eq!(req.amount.as_deref(), Some("1.5"));
        assert_eq!(req.eth_account.as_deref(), Some("0xabc"));
        assert_eq!(req.sui_account.as_deref(), Some("0xdef"));
    }

    #[test]
    fn test_request_missing_fields_deserialize() {
        let req: BridgeRequest = serde_json::from_str(r#"{"direction":"eth-to-sui"}"#).unwrap();
        assert!(req.amount.is_none());
        assert!(req.eth_account.is_none());
    }

    #[test]
    fn test_request_numeric_amount() {
        let req: BridgeRequest = serde_json::from_str(r#"{"amount":1.5}"#).unwrap();
        assert_eq!(req.amount.as_deref(), Some("1.5"));
        let req: BridgeRequest = serde_json::from_str(r#"{"amount":true}"#).unwrap();
        assert!(req.amount.is_none());
    }

    #[test]
    fn test_state_to_intent_status() {
        assert_eq!(
            BridgeState::SourceLegPending.intent_status(),
            IntentStatus::SourcePending
        );
        assert_eq!(
            BridgeState::Failed(ErrorKind::PartialFailure).intent_status(),
            IntentStatus::NeedsReconciliation
        );
        assert_eq!(
            BridgeState::Failed(ErrorKind::ChainTimeout).intent_status(),
            IntentStatus::Failed
        );
        assert_eq!(IntentStatus::SourceUnconfirmed.as_str(), "source_unconfirmed");
    }

    #[test]
    fn test_receipt_serialization_tagged() {
        let receipt = LedgerReceipt::Eth(EthReceipt {
            tx_hash: "0x01".to_string(),
            block_number: Some(7),
            amount: "1000".to_string(),
            finalized: true,
        });
        let json = serde_json::to_value(&receipt).unwrap();
        assert_eq!(json["ledger"], "eth");
        assert_eq!(json["txHash"], "0x01");
        assert_eq!(receipt.id(), "0x01");
    }

    #[test]
    fn test_intent_status_as_str() {
        assert_eq!(IntentStatus::Validated.as_str(), "validated");
        assert_eq!(IntentStatus::DestPending.as_str(), "dest_pending");
        assert_eq!(
            format!("{}", IntentStatus::NeedsReconciliation),
            "needs_reconciliation"
        );
    }
}
