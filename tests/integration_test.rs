//! Integration tests for the coaching pipeline
//!
//! These drive `CoachHandle` end to end with deterministic transports and a
//! manual clock, covering:
//! - Gate and angle properties on raw frames
//! - Transmission throttling from the frame path
//! - Rep and form-issue aggregation from service results
//! - Late, failed, and stale responses against a frozen summary
//! - Offline replay of a recorded session

use std::sync::Arc;
use std::time::Duration;

use form_coach::config::{AppConfig, GateThresholds};
use form_coach::engine::{CoachHandle, ManualClock};
use form_coach::error::SessionError;
use form_coach::feedback::{FeedbackResult, FeedbackTransport, OfflineTransport};
use form_coach::pose::{angle_between, is_usable, Frame, GateStatus, Landmark};
use form_coach::replay::FrameRecording;
use form_coach::session::{FeedbackDisposition, SessionStatus};
use form_coach::telemetry::MetricEvent;
use form_coach::testing::{FailingTransport, GatedTransport, ScriptedTransport};

const TORSO: [usize; 4] = [11, 12, 23, 24];
const SETTLE: Duration = Duration::from_secs(2);

fn frame_with_visibility(visibility: f32) -> Frame {
    Frame::new(
        (0..33u8)
            .map(|id| Landmark::new(id, 0.5, 0.5, 0.0, visibility))
            .collect(),
    )
}

fn visible_frame() -> Frame {
    frame_with_visibility(0.95)
}

fn coach_with(transport: Arc<dyn FeedbackTransport>) -> (CoachHandle, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(0));
    let coach = CoachHandle::new(AppConfig::default(), transport, clock.clone());
    (coach, clock)
}

fn rep_result(reps: u32, issues: &[&str]) -> FeedbackResult {
    FeedbackResult {
        reps,
        realtime_feedback: None,
        rep_completed: true,
        form_issues: issues.iter().map(|issue| issue.to_string()).collect(),
    }
}

#[test]
fn visibility_at_or_below_threshold_is_unusable() {
    let thresholds = GateThresholds {
        confidence: 0.5,
        y_bound: 1.0,
    };
    for visibility in [0.0, 0.3, 0.5] {
        let frame = frame_with_visibility(visibility);
        assert!(
            !is_usable(&frame, &TORSO, thresholds.confidence, thresholds.y_bound),
            "visibility {visibility} must fail"
        );
    }
    assert!(is_usable(&frame_with_visibility(0.51), &TORSO, 0.5, 1.0));
}

#[test]
fn short_frames_are_never_usable() {
    let mut landmarks = visible_frame().into_landmarks();
    landmarks.truncate(32);
    assert!(!is_usable(&Frame::new(landmarks), &TORSO, 0.5, 1.0));
}

#[test]
fn angles_stay_in_range_and_ignore_endpoint_order() {
    let points = [
        (0.1, 0.2),
        (0.9, 0.3),
        (0.4, 0.8),
        (0.0, 0.0),
        (1.0, 1.0),
        (0.6, 0.1),
    ];
    for &a in &points {
        for &b in &points {
            for &c in &points {
                let forward = angle_between(a, b, c);
                assert_eq!(forward, angle_between(c, b, a));
                if let Some(degrees) = forward {
                    assert!(degrees <= 180);
                }
            }
        }
    }
    assert_eq!(angle_between((0.0, 0.0), (0.0, 1.0), (1.0, 1.0)), Some(90));
}

#[tokio::test]
async fn usable_frames_are_throttled_to_the_interval() {
    let transport = Arc::new(ScriptedTransport::default());
    let (mut coach, clock) = coach_with(transport.clone());
    coach.start_session("Squat").unwrap();

    let frame = visible_frame();
    let mut sent = Vec::new();
    for t in [0, 40, 90, 110, 210] {
        clock.set(t);
        if coach.process_frame(&frame).sent {
            sent.push(t);
        }
    }

    assert_eq!(sent, vec![0, 110]);
    assert_eq!(transport.sent().len(), 2);
}

#[tokio::test]
async fn rep_events_replace_count_and_union_issues() {
    let transport = Arc::new(ScriptedTransport::new(vec![
        rep_result(1, &["knee_cave"]),
        rep_result(2, &["back_round"]),
    ]));
    let (mut coach, clock) = coach_with(transport);

    let state = coach.start_session("Squat").unwrap();
    assert_eq!(state.status, SessionStatus::Active);
    assert_eq!(state.rep_count, 0);
    assert!(state.form_issues.is_empty());

    coach.process_frame(&visible_frame());
    coach.settle(SETTLE).await;
    clock.set(200);
    coach.process_frame(&visible_frame());
    coach.settle(SETTLE).await;

    let state = coach.session_state();
    assert_eq!(state.rep_count, 2);
    assert_eq!(state.form_issues.len(), 2);
    assert!(state.form_issues.contains("knee_cave"));
    assert!(state.form_issues.contains("back_round"));
}

#[tokio::test]
async fn response_after_finish_leaves_summary_unchanged() {
    let transport = Arc::new(GatedTransport::new(rep_result(7, &["hip_shift"])));
    let (mut coach, clock) = coach_with(transport.clone());

    coach.start_session("Squat").unwrap();
    coach.process_frame(&visible_frame());
    clock.set(5_000);
    let summary = coach.finish_session().unwrap();
    assert_eq!(coach.in_flight(), 1);

    transport.release(1);
    assert_eq!(coach.next_feedback().await, Some(FeedbackDisposition::Stale));

    assert_eq!(coach.finish_session().unwrap(), summary);
    assert_eq!(summary.rep_count, 0);
    assert!(summary.issues.is_empty());
    assert_eq!(coach.snapshot().summary, Some(summary));
}

#[tokio::test]
async fn restarting_makes_in_flight_responses_stale() {
    let transport = Arc::new(GatedTransport::new(rep_result(3, &["knee_cave"])));
    let (mut coach, clock) = coach_with(transport.clone());

    let first = coach.start_session("Squat").unwrap();
    coach.process_frame(&visible_frame());

    clock.set(1_000);
    let second = coach.start_session("Squat").unwrap();
    assert_ne!(first.session_id, second.session_id);

    transport.release(1);
    assert_eq!(coach.next_feedback().await, Some(FeedbackDisposition::Stale));
    assert_eq!(coach.session_state().rep_count, 0);

    let stale = coach
        .telemetry()
        .recent
        .iter()
        .filter(|event| matches!(event, MetricEvent::StaleDiscarded { .. }))
        .count();
    assert_eq!(stale, 1);
}

#[tokio::test]
async fn finishing_twice_returns_the_same_summary() {
    let transport = Arc::new(ScriptedTransport::new(vec![rep_result(4, &["knee_cave"])]));
    let (mut coach, clock) = coach_with(transport);

    coach.start_session("Push-Up").unwrap();
    coach.process_frame(&visible_frame());
    coach.settle(SETTLE).await;

    clock.set(20_400);
    let first = coach.finish_session().unwrap();
    clock.set(60_000);
    let second = coach.finish_session().unwrap();

    assert_eq!(first, second);
    assert_eq!(first.exercise_id, "Push-Up");
    assert_eq!(first.duration_seconds, 20);
    assert_eq!(first.rep_count, 4);
    assert_eq!(first.issues, vec!["knee_cave".to_string()]);
}

#[tokio::test]
async fn transport_failure_leaves_state_unchanged() {
    let (mut coach, clock) = coach_with(Arc::new(FailingTransport));
    coach.start_session("Squat").unwrap();
    let before = coach.session_state().clone();

    for t in [0, 150, 300] {
        clock.set(t);
        coach.process_frame(&visible_frame());
    }
    coach.settle(SETTLE).await;

    assert_eq!(coach.session_state(), &before);
    assert_eq!(coach.status(), SessionStatus::Active);
    assert_eq!(coach.in_flight(), 0);
    assert!(coach.coaching_report().await.is_none());
}

#[test]
fn finish_without_session_is_an_error() {
    let (mut coach, _clock) = coach_with(Arc::new(ScriptedTransport::default()));
    assert_eq!(coach.finish_session(), Err(SessionError::NotActive));
}

#[tokio::test]
async fn demo_recording_replays_offline() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/demos/squat_sample.jsonl");
    let recording = FrameRecording::load(path).unwrap();
    assert_eq!(recording.len(), 90);

    let clock = Arc::new(ManualClock::new(0));
    let mut coach =
        CoachHandle::new(AppConfig::default(), Arc::new(OfflineTransport), clock.clone());
    let mut coaching = coach.subscribe_coaching();
    coach.start_session("squat").unwrap();

    let outcomes = recording.play(&mut coach, &clock);
    assert!(outcomes.iter().all(|outcome| outcome.gate == GateStatus::Full));
    assert!(outcomes.iter().all(|outcome| outcome.angle.degrees.is_some()));
    assert_eq!(outcomes.iter().filter(|outcome| outcome.sent).count(), 23);

    coach.settle(SETTLE).await;
    let summary = coach.finish_session().unwrap();
    assert_eq!(summary.exercise_id, "Squat");
    assert_eq!(summary.duration_seconds, 3);

    let report = coach.coaching_report().await.unwrap();
    assert_eq!(coaching.recv().await.unwrap(), report);
}
