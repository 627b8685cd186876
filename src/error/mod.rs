// Error types for the form coach core
//
// Only the explicit user actions (start/finish) and the transport layer produce
// errors. Data-quality problems are gate outcomes and failed requests resolve to
// "no update", so nothing here is ever raised out of frame processing.

mod feedback;
mod session;

pub use feedback::{log_feedback_error, FeedbackError, FeedbackErrorCodes};
pub use session::{log_session_error, SessionError, SessionErrorCodes};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, enabling consistent error handling across
/// the CLI, HTTP, and UI boundaries.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}
