//! CoachHandle: the single owning context for one live coaching pipeline.
//!
//! Every mutation of session state and of the throttle's `last_sent_ms`
//! happens through `&mut self`, so core state needs no locks. Network work
//! runs on tokio tasks that only report back through the results queue,
//! which the handle drains on each frame or on demand.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;

use crate::api::{CoachSnapshot, FrameOutcome, LiveUpdate, RepCompletedEvent};
use crate::config::AppConfig;
use crate::engine::clock::{Clock, SystemClock};
use crate::error::{log_session_error, SessionError};
use crate::feedback::{
    CoachingReport, CueDebouncer, FeedbackChannel, FeedbackTransport, HttpTransport,
    TaggedFeedback, TelemetryPacket, Throttler,
};
use crate::managers::BroadcastChannelManager;
use crate::pose::{classify, find_exercise, AngleSample, ExerciseSpec, Frame, GateStatus};
use crate::session::{
    FeedbackDisposition, SessionAggregator, SessionState, SessionStatus, SessionSummary,
};
use crate::telemetry::{MetricEvent, TelemetryHub, TelemetrySnapshot};

/// Reported until two frames have been seen
const DEFAULT_FPS: u32 = 30;
const FPS_WINDOW: usize = 30;

/// Rolling frame-rate estimate from frame spacing
struct FpsMeter {
    last_ms: Option<u64>,
    intervals: VecDeque<u64>,
}

impl FpsMeter {
    fn new() -> Self {
        Self {
            last_ms: None,
            intervals: VecDeque::with_capacity(FPS_WINDOW),
        }
    }

    fn observe(&mut self, now_ms: u64) -> u32 {
        if let Some(last) = self.last_ms {
            let interval = now_ms.saturating_sub(last);
            if interval > 0 {
                if self.intervals.len() == FPS_WINDOW {
                    self.intervals.pop_front();
                }
                self.intervals.push_back(interval);
            }
        }
        self.last_ms = Some(now_ms);

        if self.intervals.is_empty() {
            return DEFAULT_FPS;
        }
        let avg = self.intervals.iter().sum::<u64>() as f64 / self.intervals.len() as f64;
        (1000.0 / avg).round() as u32
    }
}

/// Owns the pipeline: gate → angle → throttle → feedback channel → aggregator.
pub struct CoachHandle {
    config: AppConfig,
    clock: Arc<dyn Clock>,
    exercise: Option<&'static ExerciseSpec>,
    throttler: Throttler,
    cues: CueDebouncer,
    session: SessionAggregator,
    channel: FeedbackChannel,
    results_rx: mpsc::UnboundedReceiver<TaggedFeedback>,
    in_flight: usize,
    fps: FpsMeter,
    last_feedback: Option<String>,
    last_gate: Option<GateStatus>,
    last_angle: Option<u16>,
    coaching: Option<JoinHandle<Option<CoachingReport>>>,
    pub(crate) broadcasts: BroadcastChannelManager,
    telemetry: Arc<TelemetryHub>,
    snapshot_tx: watch::Sender<CoachSnapshot>,
    start_instant: Instant,
}

impl CoachHandle {
    /// Create a handle over an arbitrary transport and clock.
    pub fn new(
        config: AppConfig,
        transport: Arc<dyn FeedbackTransport>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (channel, results_rx) = FeedbackChannel::new(transport, &config.feedback);
        let (snapshot_tx, _) = watch::channel(CoachSnapshot::default());

        info!(
            "[Coach] Created (send interval {}ms, backend {})",
            config.throttle.send_interval_ms, config.feedback.base_url
        );

        Self {
            throttler: Throttler::new(config.throttle.send_interval_ms),
            cues: CueDebouncer::new(config.throttle.cue_interval_ms),
            config,
            clock,
            exercise: None,
            session: SessionAggregator::new(),
            channel,
            results_rx,
            in_flight: 0,
            fps: FpsMeter::new(),
            last_feedback: None,
            last_gate: None,
            last_angle: None,
            coaching: None,
            broadcasts: BroadcastChannelManager::new(),
            telemetry: Arc::new(TelemetryHub::default()),
            snapshot_tx,
            start_instant: Instant::now(),
        }
    }

    /// Create a handle talking HTTP to the configured backend on wall-clock time.
    pub fn connect(config: AppConfig) -> Self {
        let transport = Arc::new(HttpTransport::new(&config.feedback));
        Self::new(config, transport, Arc::new(SystemClock))
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn exercise(&self) -> Option<&'static ExerciseSpec> {
        self.exercise
    }

    pub fn session_state(&self) -> &SessionState {
        self.session.state()
    }

    pub fn status(&self) -> SessionStatus {
        self.session.status()
    }

    /// Requests dispatched whose results have not been applied yet
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn broadcasts(&self) -> &BroadcastChannelManager {
        &self.broadcasts
    }

    pub fn telemetry(&self) -> TelemetrySnapshot {
        self.telemetry.snapshot()
    }

    pub fn subscribe_live(&self) -> broadcast::Receiver<LiveUpdate> {
        self.broadcasts.subscribe_live()
    }

    pub fn subscribe_reps(&self) -> broadcast::Receiver<RepCompletedEvent> {
        self.broadcasts.subscribe_reps()
    }

    pub fn subscribe_coaching(&self) -> broadcast::Receiver<CoachingReport> {
        self.broadcasts.subscribe_coaching()
    }

    /// Read-only view that can be cloned onto other tasks
    pub fn observer(&self) -> CoachObserver {
        CoachObserver {
            broadcasts: self.broadcasts.clone(),
            telemetry: Arc::clone(&self.telemetry),
            snapshot_rx: self.snapshot_tx.subscribe(),
            start_instant: self.start_instant,
        }
    }

    pub fn snapshot(&self) -> CoachSnapshot {
        let state = self.session.state();
        CoachSnapshot {
            status: state.status,
            session_id: (state.status != SessionStatus::Idle).then(|| state.session_id.clone()),
            exercise_id: self.exercise.map(|exercise| exercise.id.to_string()),
            rep_count: state.rep_count,
            form_issues: state.form_issues.as_slice().to_vec(),
            last_feedback: self.last_feedback.clone(),
            last_gate: self.last_gate,
            last_angle: self.last_angle,
            in_flight: self.in_flight,
            summary: self.session.summary().cloned(),
        }
    }

    fn publish_snapshot(&self) {
        self.snapshot_tx.send_replace(self.snapshot());
    }

    // ========================================================================
    // USER ACTIONS
    // ========================================================================

    /// Choose the exercise frames are classified against, without starting a session.
    ///
    /// Lets a camera preview show gate status and angles before the user
    /// presses start. Nothing is sent until a session is active.
    ///
    /// # Errors
    /// - `SessionError::UnknownExercise` if the catalog has no such exercise
    pub fn select_exercise(&mut self, exercise_id: &str) -> Result<(), SessionError> {
        let exercise = lookup_exercise(exercise_id, "select_exercise")?;
        debug!("[Coach] Previewing {}", exercise.name);
        self.exercise = Some(exercise);
        self.publish_snapshot();
        Ok(())
    }

    /// Begin a session for `exercise_id`, abandoning any active one.
    ///
    /// # Errors
    /// - `SessionError::UnknownExercise` if the catalog has no such exercise
    pub fn start_session(&mut self, exercise_id: &str) -> Result<SessionState, SessionError> {
        let exercise = lookup_exercise(exercise_id, "start_session")?;

        let now_ms = self.clock.now_ms();
        self.exercise = Some(exercise);
        self.throttler.reset();
        self.cues.reset();
        self.last_feedback = None;
        if let Some(previous) = self.coaching.take() {
            // A report for the previous session must not reach this one
            previous.abort();
        }

        let state = self.session.start(exercise, now_ms).clone();
        self.telemetry
            .record_session_started(&state.session_id, &state.exercise_id);
        info!(
            "[Coach] Session {} started for {}",
            state.session_id, exercise.name
        );

        self.publish_snapshot();
        Ok(state)
    }

    /// End the active session and request coaching for its summary.
    ///
    /// Results that already resolved are applied first; anything still in
    /// flight is discarded when it arrives. Repeated calls return the same
    /// summary without a second coaching request.
    ///
    /// # Errors
    /// - `SessionError::NotActive` if no session was ever started
    pub fn finish_session(&mut self) -> Result<SessionSummary, SessionError> {
        let was_active = self.session.status() == SessionStatus::Active;
        if was_active {
            self.poll_feedback();
        }

        let summary = self.session.finish(self.clock.now_ms())?;

        if was_active {
            self.telemetry.record_session_finished(
                &summary.session_id,
                summary.rep_count,
                summary.duration_seconds,
            );
            self.broadcasts.publish_summary(summary.clone());
            self.coaching = self
                .channel
                .request_coaching(summary.clone(), Some(self.broadcasts.coaching_sender()));
            self.publish_snapshot();
        }

        Ok(summary)
    }

    /// Wait for the coaching report requested by the last finish
    pub async fn coaching_report(&mut self) -> Option<CoachingReport> {
        let handle = self.coaching.take()?;
        match handle.await {
            Ok(report) => report,
            Err(err) => {
                warn!("[Coach] Coaching task failed: {}", err);
                None
            }
        }
    }

    // ========================================================================
    // FRAME PATH
    // ========================================================================

    /// Gate, measure, and possibly forward one frame.
    ///
    /// Never blocks on the network. Results that resolved since the last
    /// call are applied first.
    pub fn process_frame(&mut self, frame: &Frame) -> FrameOutcome {
        let now_ms = self.clock.now_ms();
        self.poll_feedback();
        let fps = self.fps.observe(now_ms);

        let Some(exercise) = self.exercise else {
            return FrameOutcome {
                timestamp_ms: now_ms,
                gate: GateStatus::NotDetected,
                advisory: None,
                angle: AngleSample::absent(),
                sent: false,
                fps,
            };
        };

        let gate = classify(frame, exercise, &self.config.gate);
        let angle = if gate.transmittable() {
            exercise.sample_angle(frame, &self.config.gate)
        } else {
            AngleSample::absent()
        };
        self.telemetry.record_frame(gate, now_ms);

        // Throttle is consulted only for frames that may be sent at all
        let sent = gate.transmittable()
            && self.session.status() == SessionStatus::Active
            && self.throttler.should_send(now_ms);

        if sent {
            self.dispatch(frame, exercise, now_ms, fps);
        }

        self.last_gate = Some(gate);
        self.last_angle = angle.degrees;
        self.publish_snapshot();

        FrameOutcome {
            timestamp_ms: now_ms,
            gate,
            advisory: gate.advisory(),
            angle,
            sent,
            fps,
        }
    }

    fn dispatch(&mut self, frame: &Frame, exercise: &ExerciseSpec, now_ms: u64, fps: u32) {
        let session_id = self.session.state().session_id.clone();
        self.telemetry.record_packet(&session_id, now_ms);
        debug!("[Coach] Sending frame at {}ms for {}", now_ms, session_id);

        self.channel.dispatch(TelemetryPacket {
            session_id,
            exercise: exercise.wire_key.to_string(),
            timestamp_ms: now_ms,
            fps,
            landmarks: frame.landmarks().to_vec(),
        });
        self.in_flight += 1;
    }

    // ========================================================================
    // FEEDBACK PATH
    // ========================================================================

    /// Apply every result that has already resolved, without waiting
    pub fn poll_feedback(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(tagged) = self.results_rx.try_recv() {
            self.handle_feedback(tagged);
            handled += 1;
        }
        handled
    }

    /// Wait for the next result and apply it; `None` if nothing is in flight
    pub async fn next_feedback(&mut self) -> Option<FeedbackDisposition> {
        if self.in_flight == 0 {
            return None;
        }
        let tagged = self.results_rx.recv().await?;
        Some(self.handle_feedback(tagged))
    }

    /// Apply results until none are in flight or `timeout` elapses
    pub async fn settle(&mut self, timeout: Duration) -> usize {
        let deadline = tokio::time::Instant::now() + timeout;
        let mut handled = 0;
        while self.in_flight > 0 {
            match tokio::time::timeout_at(deadline, self.results_rx.recv()).await {
                Ok(Some(tagged)) => {
                    self.handle_feedback(tagged);
                    handled += 1;
                }
                Ok(None) | Err(_) => break,
            }
        }
        handled
    }

    fn handle_feedback(&mut self, tagged: TaggedFeedback) -> FeedbackDisposition {
        self.in_flight = self.in_flight.saturating_sub(1);
        let now_ms = self.clock.now_ms();
        let disposition = self.session.apply(&tagged);

        match &disposition {
            FeedbackDisposition::Applied {
                reps,
                rep_completed,
                new_issues,
            } => {
                self.telemetry
                    .record_round_trip(now_ms.saturating_sub(tagged.sent_at_ms));
                self.telemetry
                    .record_applied(&tagged.session_id, *reps, *rep_completed);

                let feedback = tagged
                    .result
                    .as_ref()
                    .and_then(|result| result.realtime_feedback.clone());
                let announce = match feedback.as_deref() {
                    Some(cue) => self.cues.should_announce(cue, now_ms),
                    None => false,
                };
                if feedback.is_some() {
                    self.last_feedback = feedback.clone();
                }

                self.broadcasts.publish_live(LiveUpdate {
                    session_id: tagged.session_id.clone(),
                    reps: *reps,
                    feedback,
                    announce,
                });

                if *rep_completed {
                    self.broadcasts.publish_rep(RepCompletedEvent {
                        session_id: tagged.session_id.clone(),
                        total_reps: *reps,
                        form_issues: tagged
                            .result
                            .as_ref()
                            .map(|result| result.form_issues.clone())
                            .unwrap_or_default(),
                        new_issues: new_issues.clone(),
                    });
                }
            }
            FeedbackDisposition::NoUpdate => self.telemetry.record_dropped(&tagged.session_id),
            FeedbackDisposition::Stale => self.telemetry.record_stale(&tagged.session_id),
        }

        self.publish_snapshot();
        disposition
    }
}

/// Cloneable read-only view of a coach for servers and printers
#[derive(Clone)]
pub struct CoachObserver {
    pub broadcasts: BroadcastChannelManager,
    telemetry: Arc<TelemetryHub>,
    snapshot_rx: watch::Receiver<CoachSnapshot>,
    start_instant: Instant,
}

impl CoachObserver {
    /// Latest snapshot published by the coach
    pub fn snapshot(&self) -> CoachSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    pub fn telemetry(&self) -> TelemetrySnapshot {
        self.telemetry.snapshot()
    }

    pub fn subscribe_telemetry(&self) -> broadcast::Receiver<MetricEvent> {
        self.telemetry.collector().subscribe()
    }

    pub fn uptime_ms(&self) -> u64 {
        self.start_instant.elapsed().as_millis() as u64
    }
}

// ========================================================================
// TEST HELPERS
// ========================================================================

fn lookup_exercise(
    exercise_id: &str,
    context: &str,
) -> Result<&'static ExerciseSpec, SessionError> {
    find_exercise(exercise_id).ok_or_else(|| {
        let err = SessionError::UnknownExercise {
            exercise_id: exercise_id.to_string(),
        };
        log_session_error(&err, context);
        err
    })
}
