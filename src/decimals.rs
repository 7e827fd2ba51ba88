//! Fixed-point amount handling across ledgers
//!
//! Ethereum token amounts use 18 decimals, Sui coins 9. All conversion is
//! integer arithmetic on `U256`.

use alloy::primitives::utils::format_units;
use alloy::primitives::U256;

/// Token decimals on Ethereum
pub const ETH_DECIMALS: u8 = 18;

/// Coin decimals on Sui
pub const SUI_DECIMALS: u8 = 9;

/// Largest precision whose scale factor `10^n` fits in a `U256`
pub const MAX_DECIMALS: u8 = 77;

/// Convert `amount` between two fixed-point precisions.
///
/// Down-conversion truncates: any remainder below the destination precision
/// is dropped and not refunded. `convert(1_000_000_000_000_000_001, 18, 9)`
/// yields `1_000_000_000`.
pub fn convert(amount: U256, from_decimals: u8, to_decimals: u8) -> U256 {
    if from_decimals > to_decimals {
        amount / pow10(from_decimals - to_decimals)
    } else {
        amount.saturating_mul(pow10(to_decimals - from_decimals))
    }
}

/// True if `amount` survives a round trip through `to_decimals` unchanged
pub fn is_exact(amount: U256, from_decimals: u8, to_decimals: u8) -> bool {
    if from_decimals <= to_decimals {
        return true;
    }
    amount % pow10(from_decimals - to_decimals) == U256::ZERO
}

/// Parse a decimal string such as `"1.5"` into base units.
///
/// Returns `None` for anything that is not a plain non-negative decimal
/// with at most `decimals` fractional digits. Excess precision is rejected
/// rather than truncated.
pub fn parse_amount(amount: &str, decimals: u8) -> Option<U256> {
    let trimmed = amount.trim();
    let (int_part, frac_part) = match trimmed.split_once('.') {
        Some((i, f)) => (i, f),
        None => (trimmed, ""),
    };

    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }
    if !int_part.chars().all(|c| c.is_ascii_digit())
        || !frac_part.chars().all(|c| c.is_ascii_digit())
    {
        return None;
    }
    if frac_part.len() > decimals as usize {
        return None;
    }

    let whole = parse_digits(int_part)?.checked_mul(pow10(decimals))?;
    let frac = parse_digits(frac_part)?
        .checked_mul(pow10(decimals - frac_part.len() as u8))?;
    whole.checked_add(frac)
}

fn parse_digits(digits: &str) -> Option<U256> {
    if digits.is_empty() {
        return Some(U256::ZERO);
    }
    U256::from_str_radix(digits, 10).ok()
}

/// Render base units as a decimal string for logs
pub fn format_amount(amount: U256, decimals: u8) -> String {
    format_units(amount, decimals).unwrap_or_else(|_| amount.to_string())
}

fn pow10(exp: u8) -> U256 {
    U256::from(10u64).pow(U256::from(exp))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_identity() {
        for p in [0u8, 6, 9, 18] {
            let a = U256::from(123_456_789u64);
            assert_eq!(convert(a, p, p), a);
        }
    }

    #[test]
    fn test_convert_down() {
        assert_eq!(
            convert(U256::from(1_500_000_000_000_000_000u128), 18, 9),
            U256::from(1_500_000_000u64)
        );
    }

    #[test]
    fn test_convert_down_truncates_remainder() {
        assert_eq!(
            convert(U256::from(1_000_000_000_000_000_001u128), 18, 9),
            U256::from(1_000_000_000u64)
        );
        assert_eq!(convert(U256::from(999_999_999u64), 18, 9), U256::ZERO);
    }

    #[test]
    fn test_convert_up() {
        assert_eq!(
            convert(U256::from(1_500_000_000u64), 9, 18),
            U256::from(1_500_000_000_000_000_000u128)
        );
    }

    #[test]
    fn test_is_exact() {
        assert!(is_exact(U256::from(1_500_000_000_000_000_000u128), 18, 9));
        assert!(!is_exact(U256::from(1_000_000_000_000_000_001u128), 18, 9));
        assert!(is_exact(U256::from(7u64), 9, 18));
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(
            parse_amount("1.5", 18),
            Some(U256::from(1_500_000_000_000_000_000u128))
        );
        assert_eq!(parse_amount("2", 9), Some(U256::from(2_000_000_000u64)));
        assert_eq!(parse_amount(" 0.000000001 ", 9), Some(U256::from(1u64)));
    }

    #[test]
    fn test_parse_amount_rejects() {
        assert_eq!(parse_amount("", 18), None);
        assert_eq!(parse_amount("abc", 18), None);
        assert_eq!(parse_amount("-1", 18), None);
        assert_eq!(parse_amount("1e18", 18), None);
        assert_eq!(parse_amount(".", 18), None);
        assert_eq!(parse_amount("1.2.3", 18), None);
        // more fractional digits than the precision allows
        assert_eq!(parse_amount("0.0000000001", 9), None);
    }

    #[test]
    fn test_format_amount() {
        assert!(format_amount(U256::from(1_500_000_000_000_000_000u128), 18).starts_with("1.5"));
    }
}
