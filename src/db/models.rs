use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::types::{IntentStatus, ValidatedRequest};

// Amounts are carried as decimal strings. The table stores NUMERIC; inserts
// cast with $n::NUMERIC and selects cast back with ::TEXT.

/// A persisted bridge operation
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeIntent {
    pub id: i64,
    pub direction: String,
    /// Ethereum base units
    pub amount: String,
    /// Sui base units
    pub converted_amount: String,
    pub eth_account: String,
    pub sui_account: String,
    pub status: IntentStatus,
    /// Source leg tx hash or digest, once submitted
    pub source_tx: Option<String>,
    pub dest_tx: Option<String>,
    /// Balance of the coin consumed by a Sui burn
    pub burned_amount: Option<String>,
    pub error_kind: Option<String>,
    pub error_detail: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// For inserting new intents
#[derive(Debug, Clone)]
pub struct NewIntent {
    pub direction: String,
    pub amount: String,
    pub converted_amount: String,
    pub eth_account: String,
    pub sui_account: String,
}

impl From<&ValidatedRequest> for NewIntent {
    fn from(request: &ValidatedRequest) -> Self {
        Self {
            direction: request.direction.as_str().to_string(),
            amount: request.amount.to_string(),
            converted_amount: request.converted_amount.to_string(),
            eth_account: request.eth_account.to_checksum(None),
            sui_account: request.sui_account.clone(),
        }
    }
}
