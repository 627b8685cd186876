// Form Coach Core - live workout coaching pipeline
// Landmark gating, joint angles, throttled remote feedback, session aggregation

// Module declarations
pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod feedback;
pub mod http;
pub mod managers;
pub mod pose;
pub mod replay;
pub mod session;
pub mod telemetry;
pub mod testing;

// Re-exports for convenience
pub use api::*;
pub use config::AppConfig;
pub use engine::{CoachHandle, CoachObserver};
pub use error::{ErrorCode, FeedbackError, SessionError};
pub use pose::{Frame, GateStatus, Landmark};
pub use session::{SessionState, SessionStatus, SessionSummary};
