//! Sui JSON-RPC client for transaction signing and execution
//!
//! Talks to a fullnode over JSON-RPC with reqwest. Move calls are built by
//! the node (`unsafe_moveCall`), signed locally with the bridge's ed25519 key
//! and submitted with `sui_executeTransactionBlock`.

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use ed25519_dalek::{Signer, SigningKey};
use eyre::{eyre, Result, WrapErr};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::error::BridgeError;
use crate::ledgers::sui::{ExecutionOutcome, MoveCall, SuiRpc};
use crate::types::{ObjectRef, SpendableCoin};

type Blake2b256 = Blake2b<U32>;

/// Signature scheme flag for ed25519
const ED25519_FLAG: u8 = 0x00;

/// Intent prefix for a transaction signed by its sender (scope, version, app id)
const TRANSACTION_INTENT: [u8; 3] = [0, 0, 0];

/// Page size used when listing coins
const COIN_PAGE_LIMIT: u32 = 50;

/// Upper bound on pages read while listing coins for one owner
const MAX_COIN_PAGES: usize = 20;

/// Sui client for reading objects and executing move calls
pub struct SuiClient {
    rpc_url: String,
    signing_key: SigningKey,
    /// Sui address of the signing key
    pub address: String,
    client: Client,
}

/// JSON-RPC response wrapper
#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

/// JSON-RPC error
#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct ObjectResponse {
    data: Option<ObjectData>,
    error: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectData {
    object_id: String,
    #[serde(deserialize_with = "u64_from_str_or_num")]
    version: u64,
    digest: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CoinPage {
    data: Vec<CoinData>,
    next_cursor: Option<String>,
    has_next_page: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CoinData {
    coin_object_id: String,
    #[serde(deserialize_with = "u64_from_str_or_num")]
    balance: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransactionBytes {
    tx_bytes: String,
    #[serde(default)]
    input_objects: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct ExecuteResponse {
    digest: String,
    effects: Option<Effects>,
}

#[derive(Debug, Deserialize)]
struct Effects {
    status: ExecutionStatus,
    #[serde(default)]
    mutated: Vec<OwnedObjectRef>,
}

#[derive(Debug, Deserialize)]
struct ExecutionStatus {
    status: String,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OwnedObjectRef {
    reference: ObjectData,
}

impl SuiClient {
    /// Create a new Sui client from a hex-encoded ed25519 secret key
    pub fn new(rpc_url: &str, private_key_hex: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .wrap_err("Failed to create HTTP client")?;

        let signing_key = signing_key_from_hex(private_key_hex)?;
        let address = sui_address(&signing_key);

        info!(address = %address, rpc_url = %rpc_url, "Sui client initialized");

        Ok(Self {
            rpc_url: rpc_url.to_string(),
            signing_key,
            address,
            client,
        })
    }

    /// Issue one JSON-RPC call
    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, BridgeError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let response = self
            .client
            .post(&self.rpc_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| BridgeError::sui_rpc(format!("{} request failed: {}", method, e)))?;

        if !response.status().is_success() {
            return Err(BridgeError::sui_rpc(format!(
                "{} returned HTTP {}",
                method,
                response.status()
            )));
        }

        let parsed: RpcResponse<T> = response
            .json()
            .await
            .map_err(|e| BridgeError::sui_rpc(format!("{} response malformed: {}", method, e)))?;

        if let Some(error) = parsed.error {
            return Err(BridgeError::sui_rpc(format!(
                "{} error {}: {}",
                method, error.code, error.message
            )));
        }

        parsed
            .result
            .ok_or_else(|| BridgeError::sui_rpc(format!("{} returned no result", method)))
    }

    /// Sign transaction bytes (base64) with the bridge key.
    ///
    /// Returns the serialized signature `flag || signature || public key`, base64.
    pub fn sign_transaction(&self, tx_bytes_b64: &str) -> Result<String> {
        let tx_bytes = BASE64
            .decode(tx_bytes_b64)
            .wrap_err("Transaction bytes are not valid base64")?;

        let mut hasher = Blake2b256::new();
        hasher.update(TRANSACTION_INTENT);
        hasher.update(&tx_bytes);
        let digest = hasher.finalize();

        let signature = self.signing_key.sign(&digest);

        let mut serialized = Vec::with_capacity(1 + 64 + 32);
        serialized.push(ED25519_FLAG);
        serialized.extend_from_slice(&signature.to_bytes());
        serialized.extend_from_slice(self.signing_key.verifying_key().as_bytes());
        Ok(BASE64.encode(serialized))
    }
}

#[async_trait]
impl SuiRpc for SuiClient {
    async fn get_object_ref(&self, object_id: &str) -> Result<Option<ObjectRef>, BridgeError> {
        let response: ObjectResponse = self
            .call(
                "sui_getObject",
                json!([object_id, { "showType": true, "showOwner": true }]),
            )
            .await?;

        if let Some(error) = response.error {
            debug!(object_id = %object_id, error = %error, "Object lookup returned error");
            return Ok(None);
        }

        Ok(response.data.map(|d| ObjectRef {
            object_id: d.object_id,
            version: d.version,
            digest: d.digest,
        }))
    }

    async fn get_coins(
        &self,
        owner: &str,
        coin_type: &str,
    ) -> Result<Vec<SpendableCoin>, BridgeError> {
        let mut coins = Vec::new();
        let mut cursor: Option<String> = None;

        for _ in 0..MAX_COIN_PAGES {
            let page: CoinPage = self
                .call(
                    "suix_getCoins",
                    json!([owner, coin_type, cursor, COIN_PAGE_LIMIT]),
                )
                .await?;

            coins.extend(page.data.into_iter().map(|c| SpendableCoin {
                object_id: c.coin_object_id,
                balance: c.balance,
            }));

            if !page.has_next_page || page.next_cursor.is_none() {
                break;
            }
            cursor = page.next_cursor;
        }

        Ok(coins)
    }

    async fn execute_move_call(&self, call: &MoveCall) -> Result<ExecutionOutcome, BridgeError> {
        let mut arguments: Vec<Value> = call
            .authority_refs
            .iter()
            .map(|r| Value::String(r.object_id.clone()))
            .collect();
        arguments.extend(call.arguments.iter().cloned());

        let built: TransactionBytes = self
            .call(
                "unsafe_moveCall",
                json!([
                    self.address,
                    call.package,
                    call.module,
                    call.function,
                    [],
                    arguments,
                    null,
                    call.gas_budget.to_string(),
                ]),
            )
            .await?;

        // The node resolves object versions itself; refuse to sign if it
        // picked anything other than what was just refreshed.
        check_input_versions(&call.authority_refs, &built.input_objects)?;

        let signature = self
            .sign_transaction(&built.tx_bytes)
            .map_err(|e| BridgeError::sui_rpc(format!("signing failed: {}", e)))?;

        let executed: ExecuteResponse = self
            .call(
                "sui_executeTransactionBlock",
                json!([
                    built.tx_bytes,
                    [signature],
                    { "showEffects": true },
                    "WaitForLocalExecution",
                ]),
            )
            .await?;

        let effects = executed.effects.ok_or_else(|| {
            BridgeError::sui_rpc(format!("transaction {} returned no effects", executed.digest))
        })?;

        Ok(ExecutionOutcome {
            digest: executed.digest,
            success: effects.status.status == "success",
            error: effects.status.error,
            mutated: effects
                .mutated
                .into_iter()
                .map(|m| ObjectRef {
                    object_id: m.reference.object_id,
                    version: m.reference.version,
                    digest: m.reference.digest,
                })
                .collect(),
        })
    }
}

/// Compare owned input objects chosen by the node against refreshed refs.
///
/// Owned inputs arrive as `{"ImmOrOwnedMoveObject": [id, version, digest]}`.
/// Shared objects and packages carry no version to compare. Anything that
/// cannot be read is an error, so an unchecked transaction is never signed.
fn check_input_versions(expected: &[ObjectRef], inputs: &[Value]) -> Result<(), BridgeError> {
    for input in inputs {
        if input.get("SharedMoveObject").is_some() || input.get("MovePackage").is_some() {
            continue;
        }
        let (id, version) = input
            .get("ImmOrOwnedMoveObject")
            .and_then(owned_input_ref)
            .ok_or_else(|| {
                BridgeError::sui_rpc(format!(
                    "unrecognized input object in built transaction: {}",
                    input
                ))
            })?;
        if let Some(r) = expected
            .iter()
            .find(|r| r.object_id.eq_ignore_ascii_case(id))
        {
            if r.version != version {
                return Err(BridgeError::ChainExecution {
                    ledger: crate::types::Ledger::Sui,
                    tx_id: None,
                    reason: format!(
                        "version conflict: {} refreshed at {} but node built against {}",
                        id, r.version, version
                    ),
                });
            }
        }
    }
    Ok(())
}

/// Parse a 32-byte ed25519 secret (a 64-byte keypair is also accepted)
pub fn signing_key_from_hex(private_key_hex: &str) -> Result<SigningKey> {
    let bytes = hex::decode(private_key_hex.trim().trim_start_matches("0x"))
        .wrap_err("Sui private key is not valid hex")?;
    let secret: [u8; 32] = match bytes.len() {
        32 | 64 => bytes[..32]
            .try_into()
            .map_err(|_| eyre!("Sui private key has an invalid length"))?,
        n => return Err(eyre!("Sui private key must be 32 or 64 bytes, got {}", n)),
    };
    Ok(SigningKey::from_bytes(&secret))
}

/// Sui address of an ed25519 key: blake2b-256(flag || public key)
pub fn sui_address(signing_key: &SigningKey) -> String {
    let mut hasher = Blake2b256::new();
    hasher.update([ED25519_FLAG]);
    hasher.update(signing_key.verifying_key().as_bytes());
    format!("0x{}", hex::encode(hasher.finalize()))
}

/// Id and version of an owned input, from the tuple form or an object form
fn owned_input_ref(owned: &Value) -> Option<(&str, u64)> {
    match owned {
        Value::Array(parts) => Some((parts.first()?.as_str()?, value_as_u64(parts.get(1)?)?)),
        Value::Object(fields) => Some((
            fields.get("objectId")?.as_str()?,
            value_as_u64(fields.get("version")?)?,
        )),
        _ => None,
    }
}

fn value_as_u64(v: &Value) -> Option<u64> {
    v.as_u64().or_else(|| v.as_str().and_then(|s| s.parse().ok()))
}

/// Sui encodes u64 values as JSON strings in some responses and numbers in others
fn u64_from_str_or_num<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    value_as_u64(&value)
        .ok_or_else(|| serde::de::Error::custom(format!("expected u64, got {}", value)))
}
