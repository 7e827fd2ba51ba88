//! Ethereum adapter - mints and burns the bridged ERC-20
//!
//! Submits `mint`/`burn` to the token contract and waits for the receipt
//! with a fixed bound. Once a transaction is sent it cannot be withdrawn;
//! a timeout only means the outcome is not yet known.
//!
//! The provider's nonce filler asks the node for the pending nonce on every
//! send, so sends from one adapter are serialized until the node has seen
//! the previous transaction. Receipt waits still run concurrently.

use std::future::Future;
use std::str::FromStr;
use std::time::{Duration, Instant};

use alloy::network::EthereumWallet;
use alloy::primitives::{Address, U256};
use alloy::providers::ProviderBuilder;
use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;
use eyre::{Result, WrapErr};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::EthLedger;
use crate::config::EthConfig;
use crate::contracts::bridge_token::BridgeToken;
use crate::error::BridgeError;
use crate::metrics;
use crate::retry::{classify_error, ErrorClass};
use crate::types::{EthReceipt, Ledger};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenCall {
    Mint,
    Burn,
}

impl TokenCall {
    fn as_str(&self) -> &'static str {
        match self {
            TokenCall::Mint => "mint",
            TokenCall::Burn => "burn",
        }
    }
}

/// Ethereum transaction writer for the bridged token
pub struct EthAdapter {
    rpc_url: String,
    token_address: Address,
    signer: PrivateKeySigner,
    confirmation_timeout: Duration,
    send_lock: Mutex<()>,
}

impl EthAdapter {
    /// Create a new Ethereum adapter
    pub fn new(config: &EthConfig) -> Result<Self> {
        let token_address =
            Address::from_str(&config.contract_address).wrap_err("Invalid contract address")?;

        // Parse the private key
        let signer: PrivateKeySigner = config
            .private_key
            .parse()
            .wrap_err("Invalid private key")?;

        info!(
            operator_address = %signer.address(),
            token_address = %token_address,
            timeout_secs = config.confirmation_timeout_secs,
            "Ethereum adapter initialized"
        );

        Ok(Self {
            rpc_url: config.rpc_url.clone(),
            token_address,
            signer,
            confirmation_timeout: config.confirmation_timeout(),
            send_lock: Mutex::new(()),
        })
    }

    /// Get the operator's address
    pub fn operator_address(&self) -> Address {
        self.signer.address()
    }

    /// Run `send` while no other send from this adapter is between nonce
    /// assignment and broadcast
    async fn sequenced<Fut: Future>(&self, send: Fut) -> Fut::Output {
        let _turn = self.send_lock.lock().await;
        send.await
    }

    async fn submit(
        &self,
        call: TokenCall,
        account: Address,
        amount: U256,
    ) -> Result<EthReceipt, BridgeError> {
        // Build provider with signer and gas filler
        let wallet = EthereumWallet::from(self.signer.clone());
        let provider = ProviderBuilder::new()
            .with_recommended_fillers()
            .wallet(wallet)
            .on_http(self.rpc_url.parse().map_err(BridgeError::eth_rpc)?);

        let contract = BridgeToken::new(self.token_address, &provider);

        debug!(
            call = call.as_str(),
            account = %account,
            amount = %amount,
            "Submitting token call"
        );

        let sent = self
            .sequenced(async {
                match call {
                    TokenCall::Mint => contract.mint(account, amount).send().await,
                    TokenCall::Burn => contract.burn(account, amount).send().await,
                }
            })
            .await;
        let pending_tx = sent.map_err(|e| submission_error(call, e))?;

        let tx_hash = format!("0x{:x}", pending_tx.tx_hash());
        info!(tx_hash = %tx_hash, call = call.as_str(), "Transaction sent, waiting for inclusion");

        let started = Instant::now();
        let receipt =
            await_inclusion(&tx_hash, self.confirmation_timeout, pending_tx.get_receipt()).await?;
        metrics::record_leg_latency(
            Ledger::Eth.as_str(),
            call.as_str(),
            started.elapsed().as_secs_f64(),
        );

        if !receipt.status() {
            warn!(tx_hash = %tx_hash, call = call.as_str(), "Transaction reverted");
            return Err(BridgeError::ChainExecution {
                ledger: Ledger::Eth,
                tx_id: Some(tx_hash),
                reason: format!("{} transaction reverted", call.as_str()),
            });
        }

        info!(
            tx_hash = %tx_hash,
            block_number = ?receipt.block_number,
            call = call.as_str(),
            "Transaction included"
        );

        Ok(EthReceipt {
            tx_hash,
            block_number: receipt.block_number,
            amount: amount.to_string(),
            finalized: true,
        })
    }
}

#[async_trait]
impl EthLedger for EthAdapter {
    async fn burn(&self, account: Address, amount: U256) -> Result<EthReceipt, BridgeError> {
        self.submit(TokenCall::Burn, account, amount).await
    }

    async fn mint(&self, account: Address, amount: U256) -> Result<EthReceipt, BridgeError> {
        self.submit(TokenCall::Mint, account, amount).await
    }
}

/// Wait for a submitted transaction with a fixed bound.
///
/// Elapsing the bound yields `ChainTimeout` and a failed receipt fetch
/// yields `ReceiptUnavailable`; both keep the hash, since the transaction
/// may still be included later. Cancellable only by the timeout itself.
pub async fn await_inclusion<F, T, E>(
    tx_hash: &str,
    timeout: Duration,
    inclusion: F,
) -> Result<T, BridgeError>
where
    F: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    match tokio::time::timeout(timeout, inclusion).await {
        Ok(Ok(receipt)) => Ok(receipt),
        Ok(Err(e)) => {
            warn!(tx_hash = %tx_hash, error = %e, "Failed to fetch receipt");
            Err(BridgeError::ReceiptUnavailable {
                ledger: Ledger::Eth,
                tx_hash: tx_hash.to_string(),
                message: e.to_string(),
            })
        }
        Err(_) => {
            warn!(
                tx_hash = %tx_hash,
                timeout_secs = timeout.as_secs(),
                "Inclusion wait timed out"
            );
            Err(BridgeError::ChainTimeout {
                ledger: Ledger::Eth,
                tx_hash: tx_hash.to_string(),
                timeout_secs: timeout.as_secs(),
            })
        }
    }
}

/// Map a failed `send` to a revert or a transport error
fn submission_error(call: TokenCall, err: impl std::fmt::Display) -> BridgeError {
    let message = err.to_string();
    match classify_error(&message) {
        ErrorClass::Permanent => BridgeError::ChainExecution {
            ledger: Ledger::Eth,
            tx_id: None,
            reason: format!("{} rejected: {}", call.as_str(), message),
        },
        _ => BridgeError::eth_rpc(format!("failed to send {}: {}", call.as_str(), message)),
    }
}
