//! Session Aggregator & State Machine
//!
//! Idle → Active on `start`, Active → Active on each applied feedback result,
//! Active → Finished on `finish`. Finished is terminal for that session; a
//! later `start` begins an unrelated session with a fresh identifier.
//!
//! Responses are tagged with the session id they were requested for. Any
//! response whose tag differs from the current session, or that arrives
//! after the finish transition, is discarded so it cannot touch a frozen
//! summary.

use std::sync::atomic::{AtomicU64, Ordering};

use log::{debug, info};

use crate::error::{log_session_error, SessionError};
use crate::feedback::protocol::TaggedFeedback;
use crate::pose::exercise::ExerciseSpec;
use crate::session::state::{SessionState, SessionStatus, SessionSummary};

static SESSION_SEQ: AtomicU64 = AtomicU64::new(0);

/// Unique within the process: start time plus a process-wide sequence number
fn next_session_id(exercise: &ExerciseSpec, now_ms: u64) -> String {
    let seq = SESSION_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("{}-{}-{}", exercise.wire_key, now_ms, seq)
}

/// What applying one tagged response did
#[derive(Debug, Clone, PartialEq)]
pub enum FeedbackDisposition {
    /// Response accepted; `new_issues` lists tags not seen before this result
    Applied {
        reps: u32,
        rep_completed: bool,
        new_issues: Vec<String>,
    },
    /// Request failed; state intentionally untouched
    NoUpdate,
    /// Response belongs to another session or arrived after finish
    Stale,
}

/// Owner of the session state machine
#[derive(Debug)]
pub struct SessionAggregator {
    state: SessionState,
    summary: Option<SessionSummary>,
}

impl SessionAggregator {
    pub fn new() -> Self {
        Self {
            state: SessionState::idle(),
            summary: None,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn status(&self) -> SessionStatus {
        self.state.status
    }

    /// Identifier of the running session, if one is active
    pub fn active_session_id(&self) -> Option<&str> {
        match self.state.status {
            SessionStatus::Active => Some(&self.state.session_id),
            _ => None,
        }
    }

    /// Frozen summary of the last finished session
    pub fn summary(&self) -> Option<&SessionSummary> {
        self.summary.as_ref()
    }

    /// Begin a new session, discarding whatever came before
    ///
    /// Starting while another session is active abandons it; its in-flight
    /// responses become stale.
    pub fn start(&mut self, exercise: &ExerciseSpec, now_ms: u64) -> &SessionState {
        if self.state.status == SessionStatus::Active {
            info!(
                "[Session] Abandoning active session {} for a new start",
                self.state.session_id
            );
        }

        self.state = SessionState {
            status: SessionStatus::Active,
            session_id: next_session_id(exercise, now_ms),
            started_at_ms: now_ms,
            exercise_id: exercise.id.to_string(),
            exercise_name: exercise.name.to_string(),
            rep_count: 0,
            form_issues: Default::default(),
        };
        self.summary = None;

        info!(
            "[Session] Started {} ({})",
            self.state.session_id, self.state.exercise_id
        );
        &self.state
    }

    /// Apply one tagged response from the feedback channel
    ///
    /// The service owns the count, so `rep_count` is replaced by every
    /// accepted result. Form issues are merged only on rep completion, which
    /// is when the service evaluates form.
    pub fn apply(&mut self, tagged: &TaggedFeedback) -> FeedbackDisposition {
        if self.state.status != SessionStatus::Active || tagged.session_id != self.state.session_id
        {
            debug!(
                "[Session] Discarding stale response for {} (current {}, {:?})",
                tagged.session_id, self.state.session_id, self.state.status
            );
            return FeedbackDisposition::Stale;
        }

        let Some(result) = tagged.result.as_ref() else {
            return FeedbackDisposition::NoUpdate;
        };

        self.state.rep_count = result.reps;
        let new_issues = if result.rep_completed {
            self.state.form_issues.merge(&result.form_issues)
        } else {
            Vec::new()
        };

        if result.rep_completed {
            debug!(
                "[Session] Rep completed: total={}, issues={:?}",
                result.reps, result.form_issues
            );
        }

        FeedbackDisposition::Applied {
            reps: result.reps,
            rep_completed: result.rep_completed,
            new_issues,
        }
    }

    /// End the session and freeze its summary
    ///
    /// Idempotent: a second call returns the same summary.
    ///
    /// # Errors
    /// - `SessionError::NotActive` if no session was ever started
    pub fn finish(&mut self, now_ms: u64) -> Result<SessionSummary, SessionError> {
        match self.state.status {
            SessionStatus::Finished => self.summary.clone().ok_or(SessionError::NotActive),
            SessionStatus::Idle => {
                let err = SessionError::NotActive;
                log_session_error(&err, "finish_session");
                Err(err)
            }
            SessionStatus::Active => {
                let elapsed_ms = now_ms.saturating_sub(self.state.started_at_ms);
                let summary = SessionSummary {
                    session_id: self.state.session_id.clone(),
                    exercise_id: self.state.exercise_id.clone(),
                    exercise_name: self.state.exercise_name.clone(),
                    duration_seconds: (elapsed_ms + 500) / 1000,
                    rep_count: self.state.rep_count,
                    issues: self.state.form_issues.as_slice().to_vec(),
                };

                self.state.status = SessionStatus::Finished;
                self.summary = Some(summary.clone());

                info!(
                    "[Session] Finished {}: reps={}, duration={}s, issues={}",
                    summary.session_id,
                    summary.rep_count,
                    summary.duration_seconds,
                    summary.issues.len()
                );
                Ok(summary)
            }
        }
    }
}

impl Default for SessionAggregator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feedback::protocol::FeedbackResult;
    use crate::pose::exercise::find_exercise;

    fn squat() -> &'static ExerciseSpec {
        find_exercise("Squat").unwrap()
    }

    fn rep(session_id: &str, reps: u32, issues: &[&str]) -> TaggedFeedback {
        TaggedFeedback {
            session_id: session_id.to_string(),
            sent_at_ms: 0,
            result: Some(FeedbackResult {
                reps,
                realtime_feedback: None,
                rep_completed: true,
                form_issues: issues.iter().map(|s| s.to_string()).collect(),
            }),
        }
    }

    #[test]
    fn test_start_resets_state() {
        let mut aggregator = SessionAggregator::new();
        assert_eq!(aggregator.status(), SessionStatus::Idle);

        let state = aggregator.start(squat(), 1_000);
        assert_eq!(state.status, SessionStatus::Active);
        assert_eq!(state.rep_count, 0);
        assert!(state.form_issues.is_empty());
        assert_eq!(state.exercise_id, "Squat");
        assert_eq!(state.started_at_ms, 1_000);
    }

    #[test]
    fn test_active_session_id_only_while_active() {
        let mut aggregator = SessionAggregator::new();
        assert_eq!(aggregator.active_session_id(), None);

        let id = aggregator.start(squat(), 0).session_id.clone();
        assert_eq!(aggregator.active_session_id(), Some(id.as_str()));

        aggregator.finish(1_000).unwrap();
        assert_eq!(aggregator.active_session_id(), None);
        assert_eq!(aggregator.state().session_id, id);
    }

    #[test]
    fn test_rep_events_replace_count_and_union_issues() {
        let mut aggregator = SessionAggregator::new();
        let id = aggregator.start(squat(), 0).session_id.clone();

        aggregator.apply(&rep(&id, 1, &["knee_cave"]));
        let disposition = aggregator.apply(&rep(&id, 2, &["back_round"]));

        assert_eq!(
            disposition,
            FeedbackDisposition::Applied {
                reps: 2,
                rep_completed: true,
                new_issues: vec!["back_round".to_string()],
            }
        );
        let state = aggregator.state();
        assert_eq!(state.rep_count, 2);
        assert_eq!(state.form_issues.len(), 2);
        assert!(state.form_issues.contains("knee_cave"));
        assert!(state.form_issues.contains("back_round"));
    }

    #[test]
    fn test_duplicate_and_reordered_results_are_safe() {
        let mut aggregator = SessionAggregator::new();
        let id = aggregator.start(squat(), 0).session_id.clone();

        aggregator.apply(&rep(&id, 2, &["knee_cave"]));
        aggregator.apply(&rep(&id, 2, &["knee_cave"]));
        assert_eq!(aggregator.state().form_issues.len(), 1);
        assert_eq!(aggregator.state().rep_count, 2);
    }

    #[test]
    fn test_issues_ignored_without_rep_completion() {
        let mut aggregator = SessionAggregator::new();
        let id = aggregator.start(squat(), 0).session_id.clone();

        let mut live = rep(&id, 0, &["knee_cave"]);
        if let Some(result) = live.result.as_mut() {
            result.rep_completed = false;
        }
        aggregator.apply(&live);
        assert!(aggregator.state().form_issues.is_empty());
    }

    #[test]
    fn test_failed_request_leaves_state_unchanged() {
        let mut aggregator = SessionAggregator::new();
        let id = aggregator.start(squat(), 0).session_id.clone();
        aggregator.apply(&rep(&id, 3, &["knee_cave"]));

        let before = aggregator.state().clone();
        let disposition = aggregator.apply(&TaggedFeedback {
            session_id: id,
            sent_at_ms: 10,
            result: None,
        });

        assert_eq!(disposition, FeedbackDisposition::NoUpdate);
        assert_eq!(aggregator.state(), &before);
    }

    #[test]
    fn test_response_after_finish_is_discarded() {
        let mut aggregator = SessionAggregator::new();
        let id = aggregator.start(squat(), 0).session_id.clone();
        aggregator.apply(&rep(&id, 1, &["knee_cave"]));
        let summary = aggregator.finish(10_000).unwrap();

        assert_eq!(
            aggregator.apply(&rep(&id, 5, &["back_round"])),
            FeedbackDisposition::Stale
        );
        assert_eq!(aggregator.summary(), Some(&summary));
        assert_eq!(aggregator.state().rep_count, 1);
    }

    #[test]
    fn test_response_for_previous_session_is_discarded() {
        let mut aggregator = SessionAggregator::new();
        let old = aggregator.start(squat(), 0).session_id.clone();
        let new = aggregator.start(squat(), 0).session_id.clone();
        assert_ne!(old, new);

        assert_eq!(aggregator.apply(&rep(&old, 9, &[])), FeedbackDisposition::Stale);
        assert_eq!(aggregator.state().rep_count, 0);
    }

    #[test]
    fn test_finish_is_idempotent() {
        let mut aggregator = SessionAggregator::new();
        let id = aggregator.start(squat(), 1_000).session_id.clone();
        aggregator.apply(&rep(&id, 4, &["knee_cave"]));

        let first = aggregator.finish(31_400).unwrap();
        let second = aggregator.finish(99_000).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.duration_seconds, 30);
        assert_eq!(first.rep_count, 4);
        assert_eq!(first.issues, vec!["knee_cave".to_string()]);
        assert_eq!(aggregator.status(), SessionStatus::Finished);
    }

    #[test]
    fn test_duration_rounds_to_nearest_second() {
        let mut aggregator = SessionAggregator::new();
        aggregator.start(squat(), 0);
        assert_eq!(aggregator.finish(1_500).unwrap().duration_seconds, 2);

        aggregator.start(squat(), 0);
        assert_eq!(aggregator.finish(1_499).unwrap().duration_seconds, 1);
    }

    #[test]
    fn test_finish_without_start_is_an_error() {
        let mut aggregator = SessionAggregator::new();
        assert_eq!(aggregator.finish(0), Err(SessionError::NotActive));
    }

    #[test]
    fn test_restart_after_finish_gets_fresh_session() {
        let mut aggregator = SessionAggregator::new();
        let first = aggregator.start(squat(), 0).session_id.clone();
        aggregator.finish(1_000).unwrap();

        let state = aggregator.start(squat(), 0);
        assert_ne!(state.session_id, first);
        assert_eq!(state.status, SessionStatus::Active);
        assert!(aggregator.summary().is_none());
    }
}
