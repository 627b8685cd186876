// Remote analysis service error types and constants

use crate::error::ErrorCode;
use log::warn;
use std::fmt;

/// Feedback transport error code constants
///
/// Error code range: 4001-4004
pub struct FeedbackErrorCodes {}

impl FeedbackErrorCodes {
    /// Connection refused, DNS failure, or the request could not be sent
    pub const TRANSPORT: i32 = 4001;

    /// Service answered with a non-success HTTP status
    pub const STATUS: i32 = 4002;

    /// Response body was not the expected JSON shape
    pub const DECODE: i32 = 4003;

    /// Request exceeded the configured timeout
    pub const TIMEOUT: i32 = 4004;
}

/// Log a transport error with structured context
///
/// Logged at `warn` because every transport failure is recovered locally by
/// skipping the update for that tick.
pub fn log_feedback_error(err: &FeedbackError, context: &str) {
    warn!(
        "Feedback error in {}: code={}, component=FeedbackChannel, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Errors produced by a [`crate::feedback::FeedbackTransport`]
///
/// These never escape the feedback channel; they are mapped to an absent
/// result before reaching the session owner.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedbackError {
    Transport { reason: String },
    Status { status: u16 },
    Decode { reason: String },
    Timeout { after_ms: u64 },
}

impl ErrorCode for FeedbackError {
    fn code(&self) -> i32 {
        match self {
            FeedbackError::Transport { .. } => FeedbackErrorCodes::TRANSPORT,
            FeedbackError::Status { .. } => FeedbackErrorCodes::STATUS,
            FeedbackError::Decode { .. } => FeedbackErrorCodes::DECODE,
            FeedbackError::Timeout { .. } => FeedbackErrorCodes::TIMEOUT,
        }
    }

    fn message(&self) -> String {
        match self {
            FeedbackError::Transport { reason } => format!("Request failed: {}", reason),
            FeedbackError::Status { status } => format!("Server error: {}", status),
            FeedbackError::Decode { reason } => format!("Malformed response: {}", reason),
            FeedbackError::Timeout { after_ms } => {
                format!("No response after {} ms", after_ms)
            }
        }
    }
}

impl fmt::Display for FeedbackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FeedbackError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for FeedbackError {}

impl From<reqwest::Error> for FeedbackError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            FeedbackError::Status {
                status: status.as_u16(),
            }
        } else if err.is_decode() {
            FeedbackError::Decode {
                reason: err.to_string(),
            }
        } else {
            FeedbackError::Transport {
                reason: err.to_string(),
            }
        }
    }
}
