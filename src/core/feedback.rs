//! Per-item operation feedback
//!
//! Each catalog entry owns its own phase/error/success slot, so operations
//! running on different items never overwrite each other's messages.

use std::collections::BTreeMap;

use crate::core::error::FALLBACK_MESSAGE;

/// Feedback slot for one catalog entry.
///
/// `phase` is set only while an operation is running. After an operation
/// settles, at most one of `error`/`success` is populated and stays until
/// the slot is cleared or a new operation begins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Feedback {
    pub phase: Option<String>,
    pub error: Option<String>,
    pub success: Option<String>,
}

impl Feedback {
    pub fn is_idle(&self) -> bool {
        self.phase.is_none() && self.error.is_none() && self.success.is_none()
    }
}

/// Feedback slots for a whole catalog, keyed by item index.
#[derive(Debug, Default)]
pub struct FeedbackBoard {
    slots: BTreeMap<u64, Feedback>,
}

impl FeedbackBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start an operation on an entry: reset the slot, then set the phase.
    pub fn begin(&mut self, index: u64, phase: impl Into<String>) {
        let slot = self.slots.entry(index).or_default();
        *slot = Feedback::default();
        slot.phase = Some(phase.into());
    }

    /// Replace the running phase label (e.g. between sequence steps).
    pub fn set_phase(&mut self, index: u64, phase: impl Into<String>) {
        self.slots.entry(index).or_default().phase = Some(phase.into());
    }

    /// Settle an entry as succeeded: phase cleared, message retained.
    pub fn succeed(&mut self, index: u64, message: impl Into<String>) {
        let slot = self.slots.entry(index).or_default();
        slot.phase = None;
        slot.error = None;
        slot.success = Some(message.into());
    }

    /// Settle an entry as failed: phase cleared, reason retained.
    pub fn fail(&mut self, index: u64, reason: impl Into<String>) {
        let slot = self.slots.entry(index).or_default();
        let reason = reason.into();
        slot.phase = None;
        slot.success = None;
        slot.error = Some(if reason.trim().is_empty() {
            FALLBACK_MESSAGE.to_string()
        } else {
            reason
        });
    }

    /// Reset one entry unconditionally. Callable from any state.
    pub fn clear(&mut self, index: u64) {
        self.slots.remove(&index);
    }

    /// Current feedback for an entry (idle slots read as default).
    pub fn get(&self, index: u64) -> Feedback {
        self.slots.get(&index).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_resets_then_sets_phase() {
        let mut board = FeedbackBoard::new();
        board.fail(0, "old failure");
        board.begin(0, "Approving…");

        let slot = board.get(0);
        assert_eq!(slot.phase.as_deref(), Some("Approving…"));
        assert!(slot.error.is_none());
        assert!(slot.success.is_none());
    }

    #[test]
    fn test_settle_clears_phase_and_keeps_one_message() {
        let mut board = FeedbackBoard::new();
        board.begin(3, "Purchasing…");
        board.succeed(3, "Book purchased successfully");

        let slot = board.get(3);
        assert!(slot.phase.is_none());
        assert_eq!(slot.success.as_deref(), Some("Book purchased successfully"));
        assert!(slot.error.is_none());

        board.begin(3, "Removing book…");
        board.fail(3, "insufficient funds");

        let slot = board.get(3);
        assert!(slot.phase.is_none());
        assert_eq!(slot.error.as_deref(), Some("insufficient funds"));
        assert!(slot.success.is_none());
    }

    #[test]
    fn test_clear_is_total_and_idempotent() {
        let mut board = FeedbackBoard::new();
        board.begin(1, "Marking…");
        board.fail(1, "node rejected");

        board.clear(1);
        assert!(board.get(1).is_idle());
        // Clearing an already-idle slot is fine.
        board.clear(1);
        assert!(board.get(1).is_idle());
    }

    #[test]
    fn test_clear_then_failure_leaves_only_error() {
        let mut board = FeedbackBoard::new();
        board.begin(2, "Approving…");
        board.clear(2);
        board.fail(2, "user declined");

        let slot = board.get(2);
        assert!(slot.phase.is_none());
        assert_eq!(slot.error.as_deref(), Some("user declined"));
        assert!(slot.success.is_none());
    }

    #[test]
    fn test_empty_reason_falls_back() {
        let mut board = FeedbackBoard::new();
        board.fail(0, "");
        assert_eq!(board.get(0).error.as_deref(), Some(FALLBACK_MESSAGE));
    }

    #[test]
    fn test_slots_are_independent() {
        let mut board = FeedbackBoard::new();
        board.begin(0, "Purchasing…");
        board.fail(0, "insufficient funds");
        board.begin(1, "Marking…");
        board.succeed(1, "Book read status changed successfully");

        assert_eq!(board.get(0).error.as_deref(), Some("insufficient funds"));
        assert_eq!(
            board.get(1).success.as_deref(),
            Some("Book read status changed successfully")
        );
    }
}
