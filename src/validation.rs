//! Request validation
//!
//! Runs to completion before any ledger adapter is touched. A request either
//! comes out fully validated or is rejected with a `Validation` error.

use alloy::primitives::{Address, U256};

use crate::decimals;
use crate::error::BridgeError;
use crate::types::{BridgeRequest, Direction, ValidatedRequest};

/// Length of an Ethereum address including the `0x` prefix
const ETH_ADDRESS_LEN: usize = 42;

/// Maximum hex digits in a Sui address
const SUI_ADDRESS_HEX_LEN: usize = 64;

#[derive(Debug, Clone, Copy)]
pub struct RequestValidator {
    eth_decimals: u8,
    sui_decimals: u8,
}

impl Default for RequestValidator {
    fn default() -> Self {
        Self::new(decimals::ETH_DECIMALS, decimals::SUI_DECIMALS)
    }
}

impl RequestValidator {
    pub fn new(eth_decimals: u8, sui_decimals: u8) -> Self {
        Self {
            eth_decimals,
            sui_decimals,
        }
    }

    pub fn validate(&self, request: &BridgeRequest) -> Result<ValidatedRequest, BridgeError> {
        let direction = request
            .direction
            .as_deref()
            .and_then(Direction::parse)
            .ok_or_else(|| invalid("Invalid bridge direction specified"))?;

        let amount = request
            .amount
            .as_deref()
            .and_then(|a| decimals::parse_amount(a, self.eth_decimals))
            .filter(|a| *a > U256::ZERO)
            .ok_or_else(|| invalid("Invalid amount specified"))?;

        let eth_account = request
            .eth_account
            .as_deref()
            .and_then(parse_eth_address)
            .ok_or_else(|| invalid("Invalid Ethereum account address"))?;

        let sui_account = request
            .sui_account
            .as_deref()
            .and_then(normalize_sui_address)
            .ok_or_else(|| invalid("Invalid Sui account address"))?;

        // A sui-to-eth amount must map exactly onto Sui units, otherwise more
        // would be minted on Ethereum than burned on Sui.
        if direction == Direction::SuiToEth
            && !decimals::is_exact(amount, self.eth_decimals, self.sui_decimals)
        {
            return Err(invalid("Amount exceeds Sui token precision"));
        }

        let converted = decimals::convert(amount, self.eth_decimals, self.sui_decimals);
        if converted == U256::ZERO {
            return Err(invalid("Amount is below the smallest bridgeable unit"));
        }
        let converted_amount: u64 = converted
            .try_into()
            .map_err(|_| invalid("Amount exceeds the maximum bridgeable value"))?;

        Ok(ValidatedRequest {
            direction,
            amount,
            converted_amount,
            eth_account,
            sui_account,
        })
    }
}

fn invalid(msg: &str) -> BridgeError {
    BridgeError::Validation(msg.to_string())
}

/// Parse a `0x`-prefixed 20-byte hex address. Checksums are not enforced.
pub fn parse_eth_address(value: &str) -> Option<Address> {
    let value = value.trim();
    if value.len() != ETH_ADDRESS_LEN {
        return None;
    }
    let hex_part = value.strip_prefix("0x")?;
    let bytes = hex::decode(hex_part).ok()?;
    Some(Address::from_slice(&bytes))
}

/// Normalize a `0x`-prefixed Sui address to its 32-byte lowercase form.
pub fn normalize_sui_address(value: &str) -> Option<String> {
    let hex_part = value.trim().strip_prefix("0x")?;
    if hex_part.is_empty()
        || hex_part.len() > SUI_ADDRESS_HEX_LEN
        || !hex_part.chars().all(|c| c.is_ascii_hexdigit())
    {
        return None;
    }
    Some(format!(
        "0x{:0>width$}",
        hex_part.to_ascii_lowercase(),
        width = SUI_ADDRESS_HEX_LEN
    ))
}
