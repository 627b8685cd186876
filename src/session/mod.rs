//! Session module - workout lifecycle and result aggregation
//!
//! The aggregator is the only writer of session state. Feedback results are
//! applied as authoritative ("last write wins" on the rep count, set union on
//! form issues), which keeps the state correct under reordered or duplicated
//! responses.

pub mod aggregator;
pub mod state;

pub use aggregator::{FeedbackDisposition, SessionAggregator};
pub use state::{FormIssues, SessionState, SessionStatus, SessionSummary};
