//! Error classification for ledger submissions
//!
//! Ledger nodes report failures as free text. Classifying them decides
//! whether a Sui transaction is rebuilt against fresh object versions and
//! whether an Ethereum submission failure was a revert or a transport error.

/// Classifies errors for retry decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// An input object was consumed at a newer version than the one referenced
    VersionConflict,
    /// Temporary failure (RPC timeout, network issues)
    Transient,
    /// The ledger rejected the call itself (revert, abort, bad input)
    Permanent,
    Unknown,
}

/// Classify an error for retry decisions
pub fn classify_error(error: &str) -> ErrorClass {
    let error_lower = error.to_lowercase();

    // Stale object references on Sui
    if error_lower.contains("objectversionunavailableforconsumption")
        || error_lower.contains("is not available for consumption")
        || error_lower.contains("version conflict")
        || error_lower.contains("stale object")
        || error_lower.contains("objectlockconflict")
        || error_lower.contains("already locked by a different transaction")
    {
        return ErrorClass::VersionConflict;
    }

    if error_lower.contains("timeout")
        || error_lower.contains("timed out")
        || error_lower.contains("connection")
        || error_lower.contains("network")
        || error_lower.contains("rate limit")
        || error_lower.contains("too many requests")
        || error_lower.contains("503")
        || error_lower.contains("502")
        || error_lower.contains("temporarily unavailable")
    {
        return ErrorClass::Transient;
    }

    if error_lower.contains("reverted")
        || error_lower.contains("execution reverted")
        || error_lower.contains("moveabort")
        || error_lower.contains("insufficient funds")
        || error_lower.contains("insufficientgas")
        || error_lower.contains("out of gas")
        || error_lower.contains("invalid signature")
        || error_lower.contains("invalid parameters")
    {
        return ErrorClass::Permanent;
    }

    ErrorClass::Unknown
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_conflict_classification() {
        assert_eq!(
            classify_error(
                "Transaction execution failed: Object (0xbb, SequenceNumber(7), o#abc) is not available for consumption, its current version: SequenceNumber(8)"
            ),
            ErrorClass::VersionConflict
        );
        assert_eq!(
            classify_error("ObjectVersionUnavailableForConsumption"),
            ErrorClass::VersionConflict
        );
    }

    #[test]
    fn test_error_classification() {
        assert_eq!(classify_error("connection refused"), ErrorClass::Transient);
        assert_eq!(classify_error("execution reverted: not minter"), ErrorClass::Permanent);
        assert_eq!(
            classify_error("MoveAbort(MoveLocation { module: token }, 3)"),
            ErrorClass::Permanent
        );
        assert_eq!(classify_error("something odd"), ErrorClass::Unknown);
    }
}
