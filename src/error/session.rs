// Session lifecycle error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Session error code constants
///
/// Error code range: 3001-3002
pub struct SessionErrorCodes {}

impl SessionErrorCodes {
    /// Finish requested while no session is running
    pub const NOT_ACTIVE: i32 = 3001;

    /// Exercise id is not part of the catalog
    pub const UNKNOWN_EXERCISE: i32 = 3002;
}

/// Log a session error with structured context
pub fn log_session_error(err: &SessionError, context: &str) {
    error!(
        "Session error in {}: code={}, component=SessionAggregator, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Errors returned by the user-facing session actions
#[derive(Debug, Clone, PartialEq)]
pub enum SessionError {
    /// `finish_session` called before any session was started
    NotActive,

    /// `start_session` called with an exercise the catalog does not know
    UnknownExercise { exercise_id: String },
}

impl ErrorCode for SessionError {
    fn code(&self) -> i32 {
        match self {
            SessionError::NotActive => SessionErrorCodes::NOT_ACTIVE,
            SessionError::UnknownExercise { .. } => SessionErrorCodes::UNKNOWN_EXERCISE,
        }
    }

    fn message(&self) -> String {
        match self {
            SessionError::NotActive => {
                "No active session. Call start_session() first.".to_string()
            }
            SessionError::UnknownExercise { exercise_id } => {
                format!("Unknown exercise: {}", exercise_id)
            }
        }
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SessionError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for SessionError {}
