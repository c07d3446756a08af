//! Core operation machinery: sequencing, feedback, failure taxonomy

pub mod error;
pub mod feedback;
pub mod sequencer;
pub mod session;

pub use error::{failure_reason, OperationError, FALLBACK_MESSAGE};
pub use feedback::{Feedback, FeedbackBoard};
pub use sequencer::{run_sequence, Sequence, Step};
pub use session::{NotificationSink, NullSink, WalletSession};
