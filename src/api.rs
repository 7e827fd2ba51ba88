//! HTTP API
//!
//! - POST /api/bridge - Run one bridge operation
//! - GET /api/intents/reconciliation - Intents left inconsistent by a partial failure
//!   or by a source transaction whose outcome is unknown
//! - GET /health - Health check
//! - GET /metrics - Prometheus metrics

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use eyre::{eyre, Result};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};

use crate::coordinator::BridgeCoordinator;
use crate::db::{BridgeIntent, IntentStore};
use crate::error::ErrorKind;
use crate::metrics;
use crate::types::{BridgeRequest, BridgeResult, Direction, IntentStatus, Ledger, LedgerReceipt};

/// Most intents returned by the reconciliation listing
const RECONCILIATION_LIMIT: i64 = 100;

/// Statuses an operator has to resolve by hand
const RECONCILIATION_STATUSES: [IntentStatus; 2] = [
    IntentStatus::NeedsReconciliation,
    IntentStatus::SourceUnconfirmed,
];

/// Shared state for the HTTP server
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<BridgeCoordinator>,
    pub intents: Arc<dyn IntentStore>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(coordinator: Arc<BridgeCoordinator>, intents: Arc<dyn IntentStore>) -> Self {
        Self {
            coordinator,
            intents,
            started_at: Instant::now(),
        }
    }
}

/// Body returned by `POST /api/bridge`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eth_tx_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mint_tx_digest: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub burn_tx_digest: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent_id: Option<i64>,
    /// Client-safe error message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Error kind code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl BridgeResponse {
    fn failure(error: String, kind: ErrorKind) -> Self {
        Self {
            success: false,
            message: "Bridge operation failed".to_string(),
            eth_tx_hash: None,
            mint_tx_digest: None,
            burn_tx_digest: None,
            intent_id: None,
            error: Some(error),
            details: Some(kind.code().to_string()),
        }
    }

    /// Slot a transaction id into the field the client expects for it
    fn attach(&mut self, ledger: Ledger, tx_id: &str, direction: Option<Direction>) {
        let slot = match (ledger, direction) {
            (Ledger::Eth, _) => &mut self.eth_tx_hash,
            (Ledger::Sui, Some(Direction::EthToSui)) => &mut self.mint_tx_digest,
            (Ledger::Sui, _) => &mut self.burn_tx_digest,
        };
        *slot = Some(tx_id.to_string());
    }
}

impl From<&BridgeResult> for BridgeResponse {
    fn from(result: &BridgeResult) -> Self {
        let mut response = if result.success {
            let message = match result.direction {
                Some(Direction::SuiToEth) => "Bridge from Sui to Ethereum successful",
                _ => "Bridge from Ethereum to Sui successful",
            };
            BridgeResponse {
                success: true,
                message: message.to_string(),
                eth_tx_hash: None,
                mint_tx_digest: None,
                burn_tx_digest: None,
                intent_id: result.intent_id,
                error: None,
                details: None,
            }
        } else {
            let mut failure = BridgeResponse::failure(
                result
                    .error_detail
                    .clone()
                    .unwrap_or_else(|| "Bridge operation failed".to_string()),
                result.error_kind.unwrap_or(ErrorKind::ChainExecution),
            );
            // only failures that left something on a ledger carry an intent
            // worth pointing the client at
            if result.source_receipt.is_some() || result.unconfirmed_tx.is_some() {
                failure.intent_id = result.intent_id;
            }
            failure
        };

        for receipt in [&result.source_receipt, &result.dest_receipt]
            .into_iter()
            .flatten()
        {
            response.attach(receipt.ledger(), receipt.id(), result.direction);
        }
        if let Some((ledger, tx_id)) = &result.unconfirmed_tx {
            response.attach(*ledger, tx_id, result.direction);
        }
        response
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: String,
    uptime_seconds: u64,
}

#[derive(Serialize)]
struct IntentsResponse {
    intents: Vec<BridgeIntent>,
}

/// Bridge endpoint handler
async fn bridge(
    State(state): State<AppState>,
    payload: Result<Json<BridgeRequest>, JsonRejection>,
) -> (StatusCode, Json<BridgeResponse>) {
    let Json(request) = match payload {
        Ok(p) => p,
        Err(rejection) => {
            warn!(error = %rejection.body_text(), "Malformed bridge request body");
            metrics::record_error(ErrorKind::Validation.code());
            return (
                StatusCode::BAD_REQUEST,
                Json(BridgeResponse::failure(
                    "Invalid request body".to_string(),
                    ErrorKind::Validation,
                )),
            );
        }
    };

    let result = state.coordinator.bridge(&request).await;
    let status = if result.success {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, Json(BridgeResponse::from(&result)))
}

/// Intents whose destination leg failed after the source leg confirmed, or
/// whose source transaction was sent but never confirmed
async fn reconciliation(State(state): State<AppState>) -> Response {
    match state
        .intents
        .list_by_status(&RECONCILIATION_STATUSES, RECONCILIATION_LIMIT)
        .await
    {
        Ok(intents) => Json(IntentsResponse { intents }).into_response(),
        Err(e) => {
            error!(error = ?e, "Failed to list intents needing reconciliation");
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to list intents").into_response()
        }
    }
}

/// Health check endpoint handler
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
    })
}

/// Prometheus metrics endpoint
async fn prometheus_metrics() -> Response {
    let (content_type, buffer) = metrics::encode();
    match Response::builder()
        .header(header::CONTENT_TYPE, content_type)
        .body(axum::body::Body::from(buffer))
    {
        Ok(resp) => resp,
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to build metrics response",
        )
            .into_response(),
    }
}

/// Build the API router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/bridge", post(bridge))
        .route("/api/intents/reconciliation", get(reconciliation))
        .route("/health", get(health_check))
        .route("/metrics", get(prometheus_metrics))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the API server, stopping when `shutdown` resolves
pub async fn start_api_server<F>(
    bind_address: &str,
    port: u16,
    state: AppState,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr: SocketAddr = format!("{}:{}", bind_address, port)
        .parse()
        .map_err(|e| eyre!("Invalid bind address {}:{}: {}", bind_address, port, e))?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "API server started");
    metrics::UP.set(1.0);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;

    metrics::UP.set(0.0);
    info!("API server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EthReceipt, SuiReceipt};

    fn eth(hash: &str) -> LedgerReceipt {
        LedgerReceipt::Eth(EthReceipt {
            tx_hash: hash.to_string(),
            block_number: Some(1),
            amount: "1".to_string(),
            finalized: true,
        })
    }

    fn sui(digest: &str) -> LedgerReceipt {
        LedgerReceipt::Sui(SuiReceipt {
            digest: digest.to_string(),
            status: "success".to_string(),
            authority_refs: vec![],
            mutated: vec![],
        })
    }

    #[test]
    fn test_eth_to_sui_success_fields() {
        let result = BridgeResult::completed(Direction::EthToSui, 1, eth("H1"), sui("D1"));
        let json = serde_json::to_value(BridgeResponse::from(&result)).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["message"], "Bridge from Ethereum to Sui successful");
        assert_eq!(json["ethTxHash"], "H1");
        assert_eq!(json["mintTxDigest"], "D1");
        assert!(json.get("burnTxDigest").is_none());
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_sui_to_eth_success_fields() {
        let result = BridgeResult::completed(Direction::SuiToEth, 2, sui("B1"), eth("H2"));
        let json = serde_json::to_value(BridgeResponse::from(&result)).unwrap();
        assert_eq!(json["message"], "Bridge from Sui to Ethereum successful");
        assert_eq!(json["burnTxDigest"], "B1");
        assert_eq!(json["ethTxHash"], "H2");
        assert!(json.get("mintTxDigest").is_none());
    }

    #[test]
    fn test_validation_failure_fields() {
        let result = BridgeResult::failed(
            None,
            None,
            None,
            ErrorKind::Validation,
            "Invalid amount specified".to_string(),
        );
        let json = serde_json::to_value(BridgeResponse::from(&result)).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["message"], "Bridge operation failed");
        assert_eq!(json["error"], "Invalid amount specified");
        assert_eq!(json["details"], "VALIDATION_ERROR");
        assert!(json.get("intentId").is_none());
    }

    #[test]
    fn test_partial_failure_carries_source_and_intent() {
        let result = BridgeResult::failed(
            Some(Direction::EthToSui),
            Some(9),
            Some(eth("H1")),
            ErrorKind::PartialFailure,
            "Ethereum leg confirmed but Sui leg failed; manual reconciliation required"
                .to_string(),
        );
        let json = serde_json::to_value(BridgeResponse::from(&result)).unwrap();
        assert_eq!(json["ethTxHash"], "H1");
        assert_eq!(json["intentId"], 9);
        assert_eq!(json["details"], "PARTIAL_FAILURE");
        assert!(json.get("mintTxDigest").is_none());
    }

    #[test]
    fn test_timeout_carries_submitted_hash() {
        let result = BridgeResult::failed(
            Some(Direction::EthToSui),
            Some(4),
            None,
            ErrorKind::ChainTimeout,
            "Ethereum transaction timeout".to_string(),
        )
        .with_unconfirmed_tx(Some((Ledger::Eth, "0xpending".to_string())));
        let json = serde_json::to_value(BridgeResponse::from(&result)).unwrap();
        assert_eq!(json["ethTxHash"], "0xpending");
        assert_eq!(json["intentId"], 4);
        assert_eq!(json["details"], "CHAIN_TIMEOUT");
    }

    #[test]
    fn test_sui_to_eth_partial_failure_fields() {
        let result = BridgeResult::failed(
            Some(Direction::SuiToEth),
            Some(5),
            Some(sui("B1")),
            ErrorKind::PartialFailure,
            "Sui leg confirmed but Ethereum leg failed; manual reconciliation required"
                .to_string(),
        )
        .with_unconfirmed_tx(Some((Ledger::Eth, "0xpending".to_string())));
        let json = serde_json::to_value(BridgeResponse::from(&result)).unwrap();
        assert_eq!(json["burnTxDigest"], "B1");
        assert_eq!(json["ethTxHash"], "0xpending");
        assert_eq!(json["intentId"], 5);
        assert!(json.get("mintTxDigest").is_none());
    }
}
