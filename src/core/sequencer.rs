//! Transaction sequencer
//!
//! A mutating operation is an ordered list of steps, each one signed write
//! call plus its confirmation wait. Steps run strictly in order: a step is
//! submitted only after the previous step's confirmation wait has resolved.

use crate::core::error::OperationError;
use crate::domain::market::{ContractGateway, WriteCall};

/// One write call with its phase label and confirmation depth.
///
/// `call` is `None` when the step could not be prepared (wallet not
/// connected, record not loaded); running such a sequence fails before
/// anything is submitted.
#[derive(Debug, Clone)]
pub struct Step {
    pub phase: &'static str,
    pub call: Option<WriteCall>,
    pub confirmations: u64,
}

/// An ordered list of dependent steps for one user-initiated operation.
#[derive(Debug, Clone)]
pub struct Sequence {
    /// Surfaced verbatim when any step is unprepared.
    pub unavailable: &'static str,
    pub steps: Vec<Step>,
}

/// Run a sequence against the gateway, reporting each step's phase label
/// just before that step is submitted.
///
/// Fails with `Unavailable` before any submission if any step is
/// unprepared. Stops at the first failing step; later steps are never
/// attempted. Records are not touched here; callers re-read after success.
pub async fn run_sequence(
    gateway: &dyn ContractGateway,
    sequence: Sequence,
    on_phase: &mut (dyn FnMut(&'static str) + Send),
) -> Result<(), OperationError> {
    let mut prepared = Vec::with_capacity(sequence.steps.len());
    for step in sequence.steps {
        let call = step
            .call
            .ok_or(OperationError::Unavailable(sequence.unavailable))?;
        prepared.push((step.phase, call, step.confirmations));
    }

    for (phase, call, confirmations) in prepared {
        on_phase(phase);
        let pending = gateway
            .submit(&call)
            .await
            .map_err(|err| OperationError::rejected(&err))?;
        let outcome = pending
            .confirmed(confirmations)
            .await
            .map_err(|err| OperationError::rejected(&err))?;
        if !outcome.success {
            return Err(OperationError::Rejected("Transaction reverted".to_string()));
        }
    }

    Ok(())
}
