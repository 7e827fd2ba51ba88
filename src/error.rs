//! Bridge error taxonomy
//!
//! `Display` carries the full diagnostic and is only meant for logs.
//! Client responses use [`BridgeError::public_message`] and [`ErrorKind::code`].

use serde::Serialize;
use std::fmt;

use crate::types::{Ledger, LedgerReceipt};

/// Error classification shared by results, metrics and persisted intents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    Validation,
    ChainTimeout,
    ChainExecution,
    ObjectState,
    NoSpendableObject,
    InsufficientBalance,
    PartialFailure,
    Rpc,
    Persistence,
}

impl ErrorKind {
    /// Stable code surfaced to clients and used as a metric label
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "VALIDATION_ERROR",
            ErrorKind::ChainTimeout => "CHAIN_TIMEOUT",
            ErrorKind::ChainExecution => "CHAIN_EXECUTION_ERROR",
            ErrorKind::ObjectState => "OBJECT_STATE_ERROR",
            ErrorKind::NoSpendableObject => "NO_SPENDABLE_OBJECT",
            ErrorKind::InsufficientBalance => "INSUFFICIENT_BALANCE",
            ErrorKind::PartialFailure => "PARTIAL_FAILURE",
            ErrorKind::Rpc => "RPC_ERROR",
            ErrorKind::Persistence => "PERSISTENCE_ERROR",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// Malformed request; nothing was submitted
    #[error("validation failed: {0}")]
    Validation(String),

    /// Inclusion wait exceeded its bound; the transaction may still land
    #[error("{ledger} transaction {tx_hash} not included within {timeout_secs}s")]
    ChainTimeout {
        ledger: Ledger,
        tx_hash: String,
        timeout_secs: u64,
    },

    /// Ledger reported a non-success outcome
    #[error("{ledger} execution failed: {reason}")]
    ChainExecution {
        ledger: Ledger,
        tx_id: Option<String>,
        reason: String,
    },

    #[error("object {object_id} unavailable: {reason}")]
    ObjectState { object_id: String, reason: String },

    #[error("no coins of type {coin_type} owned by {owner}")]
    NoSpendableObject { owner: String, coin_type: String },

    #[error("no coin owned by {owner} covers {required} (largest {largest})")]
    InsufficientBalance {
        owner: String,
        required: u64,
        largest: u64,
    },

    /// Source leg confirmed, destination leg failed
    #[error("destination leg failed after source {} {} confirmed: {cause}", .source_receipt.ledger(), .source_receipt.id())]
    PartialFailure {
        source_receipt: LedgerReceipt,
        cause: Box<BridgeError>,
    },

    /// Transport failure talking to a ledger node
    #[error("{ledger} rpc error: {message}")]
    Rpc { ledger: Ledger, message: String },

    /// Submitted, but fetching the receipt failed; the transaction may still land
    #[error("{ledger} transaction {tx_hash} submitted but receipt unavailable: {message}")]
    ReceiptUnavailable {
        ledger: Ledger,
        tx_hash: String,
        message: String,
    },

    #[error("intent store error: {0}")]
    Persistence(String),
}

impl BridgeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BridgeError::Validation(_) => ErrorKind::Validation,
            BridgeError::ChainTimeout { .. } => ErrorKind::ChainTimeout,
            BridgeError::ChainExecution { .. } => ErrorKind::ChainExecution,
            BridgeError::ObjectState { .. } => ErrorKind::ObjectState,
            BridgeError::NoSpendableObject { .. } => ErrorKind::NoSpendableObject,
            BridgeError::InsufficientBalance { .. } => ErrorKind::InsufficientBalance,
            BridgeError::PartialFailure { .. } => ErrorKind::PartialFailure,
            BridgeError::Rpc { .. } | BridgeError::ReceiptUnavailable { .. } => ErrorKind::Rpc,
            BridgeError::Persistence(_) => ErrorKind::Persistence,
        }
    }

    /// Message safe to return to clients (no node URLs, object ids or raw RPC text)
    pub fn public_message(&self) -> String {
        match self {
            BridgeError::Validation(msg) => msg.clone(),
            BridgeError::ChainTimeout { ledger, .. } => {
                format!("{} transaction timeout", ledger.display_name())
            }
            BridgeError::ChainExecution { ledger, .. } => {
                format!("{} transaction failed", ledger.display_name())
            }
            BridgeError::ObjectState { .. } => "Bridge authority object unavailable".to_string(),
            BridgeError::NoSpendableObject { .. } => {
                "No suitable coins found for burning".to_string()
            }
            BridgeError::InsufficientBalance { .. } => {
                "No coin with sufficient balance found for burning".to_string()
            }
            BridgeError::PartialFailure { source_receipt, .. } => format!(
                "{} leg confirmed but {} leg failed; manual reconciliation required",
                source_receipt.ledger().display_name(),
                match source_receipt.ledger() {
                    Ledger::Eth => Ledger::Sui.display_name(),
                    Ledger::Sui => Ledger::Eth.display_name(),
                }
            ),
            BridgeError::Rpc { ledger, .. } | BridgeError::ReceiptUnavailable { ledger, .. } => {
                format!("{} node unavailable", ledger.display_name())
            }
            BridgeError::Persistence(_) => "Bridge temporarily unavailable".to_string(),
        }
    }

    /// Receipt of a leg that already took effect, if any
    pub fn confirmed_receipt(&self) -> Option<&LedgerReceipt> {
        match self {
            BridgeError::PartialFailure { source_receipt, .. } => Some(source_receipt),
            _ => None,
        }
    }

    /// Transaction that was submitted but never confirmed or rejected.
    ///
    /// For a partial failure this is the destination leg's transaction.
    pub fn unconfirmed_tx(&self) -> Option<(Ledger, &str)> {
        match self {
            BridgeError::ChainTimeout {
                ledger, tx_hash, ..
            }
            | BridgeError::ReceiptUnavailable {
                ledger, tx_hash, ..
            } => Some((*ledger, tx_hash.as_str())),
            BridgeError::PartialFailure { cause, .. } => cause.unconfirmed_tx(),
            _ => None,
        }
    }

    pub(crate) fn sui_rpc(err: impl fmt::Display) -> Self {
        BridgeError::Rpc {
            ledger: Ledger::Sui,
            message: err.to_string(),
        }
    }

    pub(crate) fn eth_rpc(err: impl fmt::Display) -> Self {
        BridgeError::Rpc {
            ledger: Ledger::Eth,
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EthReceipt;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(
            BridgeError::Validation("x".into()).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            BridgeError::ChainTimeout {
                ledger: Ledger::Eth,
                tx_hash: "0x1".into(),
                timeout_secs: 60
            }
            .kind(),
            ErrorKind::ChainTimeout
        );
    }

    #[test]
    fn test_public_message_hides_diagnostics() {
        let err = BridgeError::ChainExecution {
            ledger: Ledger::Sui,
            tx_id: Some("Dx".into()),
            reason: "MoveAbort in 0xdeadbeef::token::mint at http://10.0.0.4:9000".into(),
        };
        let msg = err.public_message();
        assert_eq!(msg, "Sui transaction failed");
        assert!(!msg.contains("10.0.0.4"));
        assert!(err.to_string().contains("MoveAbort"));
    }

    #[test]
    fn test_timeout_public_message() {
        let err = BridgeError::ChainTimeout {
            ledger: Ledger::Eth,
            tx_hash: "0xabc".into(),
            timeout_secs: 60,
        };
        assert_eq!(err.public_message(), "Ethereum transaction timeout");
    }

    #[test]
    fn test_partial_failure_keeps_receipt() {
        let receipt = LedgerReceipt::Eth(EthReceipt {
            tx_hash: "0xfeed".into(),
            block_number: Some(1),
            amount: "1".into(),
            finalized: true,
        });
        let err = BridgeError::PartialFailure {
            source_receipt: receipt.clone(),
            cause: Box::new(BridgeError::sui_rpc("connection refused")),
        };
        assert_eq!(err.kind(), ErrorKind::PartialFailure);
        assert_eq!(err.confirmed_receipt(), Some(&receipt));
        assert!(err.public_message().contains("manual reconciliation"));
        assert!(err.to_string().contains("0xfeed"));
    }

    #[test]
    fn test_unconfirmed_tx() {
        let timeout = BridgeError::ChainTimeout {
            ledger: Ledger::Eth,
            tx_hash: "0xabc".into(),
            timeout_secs: 60,
        };
        assert_eq!(timeout.unconfirmed_tx(), Some((Ledger::Eth, "0xabc")));

        let lost = BridgeError::ReceiptUnavailable {
            ledger: Ledger::Eth,
            tx_hash: "0xdef".into(),
            message: "connection reset".into(),
        };
        assert_eq!(lost.kind(), ErrorKind::Rpc);
        assert_eq!(lost.public_message(), "Ethereum node unavailable");
        assert_eq!(lost.unconfirmed_tx(), Some((Ledger::Eth, "0xdef")));

        let partial = BridgeError::PartialFailure {
            source_receipt: LedgerReceipt::Sui(crate::types::SuiReceipt {
                digest: "B1".into(),
                status: "success".into(),
                authority_refs: vec![],
                mutated: vec![],
            }),
            cause: Box::new(timeout),
        };
        assert_eq!(partial.unconfirmed_tx(), Some((Ledger::Eth, "0xabc")));
        assert_eq!(BridgeError::eth_rpc("refused").unconfirmed_tx(), None);
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(ErrorKind::NoSpendableObject.code(), "NO_SPENDABLE_OBJECT");
        assert_eq!(ErrorKind::PartialFailure.to_string(), "PARTIAL_FAILURE");
    }
}
