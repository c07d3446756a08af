//! Operation failure taxonomy and reason extraction

use thiserror::Error;

/// Shown when no more specific reason can be recovered from a failure.
pub const FALLBACK_MESSAGE: &str = "Something went wrong. Try again.";

/// Terminal failure of a mutating operation.
///
/// Stale or absent reads are not failures; they surface as `None` records
/// from the catalog layer instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OperationError {
    /// A step's initiating call could not be prepared (wallet missing,
    /// record not loaded). Nothing was submitted.
    #[error("{0}")]
    Unavailable(&'static str),

    /// The signer or the chain rejected a submitted step.
    #[error("{0}")]
    Rejected(String),
}

impl OperationError {
    pub fn rejected(err: &anyhow::Error) -> Self {
        OperationError::Rejected(failure_reason(err))
    }
}

/// Extract the most specific human-readable reason from a chain error.
///
/// Prefers the contract-reported revert reason, then the first line of the
/// error chain, then the fixed fallback message.
pub fn failure_reason(err: &anyhow::Error) -> String {
    let raw = format!("{:#}", err);

    if let Some(idx) = raw.find("execution reverted: ") {
        let reason = raw[idx + "execution reverted: ".len()..]
            .split(['\n', '"'])
            .next()
            .unwrap_or("")
            .trim();
        if !reason.is_empty() {
            return reason.to_string();
        }
    }

    let summary = raw.lines().next().unwrap_or("").trim();
    if summary.is_empty() {
        FALLBACK_MESSAGE.to_string()
    } else {
        summary.to_string()
    }
}
