//! Core telemetry event types describing diagnostics data exposed to
//! CLI/HTTP surfaces.

use serde::{Deserialize, Serialize};

use crate::pose::GateStatus;

/// Diagnostic events covering the frame path, the feedback loop, and the
/// session lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum MetricEvent {
    /// Gate outcome changed from the previous frame
    FrameGated {
        status: GateStatus,
        timestamp_ms: u64,
    },
    PacketSent {
        session_id: String,
        timestamp_ms: u64,
    },
    FeedbackApplied {
        session_id: String,
        reps: u32,
        rep_completed: bool,
    },
    /// Request failed, timed out, or could not be decoded
    FeedbackDropped {
        session_id: String,
    },
    /// Response arrived for a session that is no longer current
    StaleDiscarded {
        session_id: String,
    },
    /// Rolling round-trip time of realtime requests
    Latency {
        avg_ms: f32,
        max_ms: f32,
        sample_count: usize,
    },
    SessionStarted {
        session_id: String,
        exercise_id: String,
    },
    SessionFinished {
        session_id: String,
        rep_count: u32,
        duration_seconds: u64,
    },
}
