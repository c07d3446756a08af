//! External collaborators: wallet session and notification sink
#![allow(dead_code)]

use alloy_primitives::Address;

/// The wallet this client signs through.
///
/// No transaction is ever initiated while `address()` is `None`; callers
/// defer to `prompt_connect` and abort the action instead.
pub trait WalletSession: Send + Sync {
    fn address(&self) -> Option<Address>;

    /// Ask the outer shell to start its connect flow.
    fn prompt_connect(&self);
}

/// Consumer of operation lifecycle labels.
pub trait NotificationSink: Send + Sync {
    fn pending(&self, message: &str);
    fn success(&self, message: &str);
    fn error(&self, message: &str);
}

/// Sink that drops everything.
pub struct NullSink;

impl NotificationSink for NullSink {
    fn pending(&self, _message: &str) {}
    fn success(&self, _message: &str) {}
    fn error(&self, _message: &str) {}
}
