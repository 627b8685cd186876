//! Wire types exchanged with the remote analysis service
//!
//! Field names follow the service's JSON schema. Responses tolerate missing
//! and unknown fields so a partially upgraded backend never breaks the loop.

use serde::{Deserialize, Deserializer, Serialize};

use crate::pose::landmark::Landmark;

/// Payload forwarded to the realtime endpoint, at most once per throttle interval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryPacket {
    pub session_id: String,
    /// Exercise key understood by the service (e.g. "squat")
    pub exercise: String,
    #[serde(rename = "timestamp")]
    pub timestamp_ms: u64,
    /// Measured pose-engine frame rate at send time
    #[serde(default)]
    pub fps: u32,
    pub landmarks: Vec<Landmark>,
}

/// Realtime endpoint response
///
/// `reps` is the service's authoritative count; the client never recounts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedbackResult {
    #[serde(default)]
    pub reps: u32,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub realtime_feedback: Option<String>,
    #[serde(default)]
    pub rep_completed: bool,
    #[serde(default)]
    pub form_issues: Vec<String>,
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.filter(|text| !text.trim().is_empty()))
}

/// A realtime response tagged with the session it was requested for
///
/// `result` is `None` when the request failed in any way.
#[derive(Debug, Clone, PartialEq)]
pub struct TaggedFeedback {
    pub session_id: String,
    pub sent_at_ms: u64,
    pub result: Option<FeedbackResult>,
}

/// End-of-session coaching payload, handed to the UI untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoachingReport {
    #[serde(default)]
    pub summary: Option<ReportSummary>,
    #[serde(default)]
    pub biometrics: Option<Biometrics>,
    #[serde(default)]
    pub ai_coaching: Option<AiCoaching>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSummary {
    pub exercise_type: String,
    pub total_reps: u32,
    pub valid_reps: u32,
    pub avg_accuracy_score: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Biometrics {
    pub max_depth: Option<String>,
    pub stability: Option<String>,
    pub symmetry_issue: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiCoaching {
    pub message: String,
    pub tutorial_video: Option<String>,
}
