use serde::{Deserialize, Serialize};

use crate::pose::{AngleSample, GateStatus};
use crate::session::{SessionStatus, SessionSummary};

/// Result of feeding one frame to the coach
///
/// Returned synchronously so the overlay can style the skeleton and angle
/// for the same frame it was computed from. Until an exercise is chosen
/// with `select_exercise` or `start_session` there is nothing to classify
/// against, so `gate` is `NotDetected` with no advisory.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameOutcome {
    pub timestamp_ms: u64,
    pub gate: GateStatus,
    /// User-facing hint when the view is not full
    pub advisory: Option<&'static str>,
    pub angle: AngleSample,
    /// Whether this frame was forwarded to the analysis service
    pub sent: bool,
    /// Pose engine frame rate estimated from frame spacing
    pub fps: u32,
}

/// Live counters pushed whenever a realtime result is applied
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveUpdate {
    pub session_id: String,
    pub reps: u32,
    pub feedback: Option<String>,
    /// True when `feedback` is new enough to be spoken aloud
    pub announce: bool,
}

/// Emitted when the service reports a completed repetition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepCompletedEvent {
    pub session_id: String,
    pub total_reps: u32,
    pub form_issues: Vec<String>,
    /// Issues seen for the first time this session
    pub new_issues: Vec<String>,
}

/// Point-in-time view of the coach for polling surfaces
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoachSnapshot {
    pub status: SessionStatus,
    pub session_id: Option<String>,
    pub exercise_id: Option<String>,
    pub rep_count: u32,
    pub form_issues: Vec<String>,
    pub last_feedback: Option<String>,
    pub last_gate: Option<GateStatus>,
    pub last_angle: Option<u16>,
    pub in_flight: usize,
    pub summary: Option<SessionSummary>,
}

impl Default for CoachSnapshot {
    fn default() -> Self {
        Self {
            status: SessionStatus::Idle,
            session_id: None,
            exercise_id: None,
            rep_count: 0,
            form_issues: Vec::new(),
            last_feedback: None,
            last_gate: None,
            last_angle: None,
            in_flight: 0,
            summary: None,
        }
    }
}
