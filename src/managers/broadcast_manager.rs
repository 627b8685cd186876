// BroadcastChannelManager: Centralized tokio broadcast channel management
// Single Responsibility: Broadcast channel lifecycle and subscription

use tokio::sync::broadcast;

use crate::api::{LiveUpdate, RepCompletedEvent};
use crate::feedback::CoachingReport;
use crate::session::SessionSummary;

const LIVE_CAPACITY: usize = 100;
const REP_CAPACITY: usize = 50;
const SESSION_CAPACITY: usize = 8;

/// Manages the tokio broadcast channels observed by UI surfaces
///
/// Cloning shares the same channels, so the coach can keep publishing while
/// an HTTP server or CLI printer holds its own copy for subscriptions.
///
/// # Channel Types
/// - Live: reps and feedback text after every applied realtime result
/// - Rep: rep-completion events with the reported form issues
/// - Summary: the frozen summary at the finish transition
/// - Coaching: the end-of-session report from the analysis service
///
/// Publishing with no subscribers is not an error; the message is dropped.
#[derive(Clone)]
pub struct BroadcastChannelManager {
    live: broadcast::Sender<LiveUpdate>,
    rep: broadcast::Sender<RepCompletedEvent>,
    summary: broadcast::Sender<SessionSummary>,
    coaching: broadcast::Sender<CoachingReport>,
}

impl BroadcastChannelManager {
    pub fn new() -> Self {
        let (live, _) = broadcast::channel(LIVE_CAPACITY);
        let (rep, _) = broadcast::channel(REP_CAPACITY);
        let (summary, _) = broadcast::channel(SESSION_CAPACITY);
        let (coaching, _) = broadcast::channel(SESSION_CAPACITY);
        Self {
            live,
            rep,
            summary,
            coaching,
        }
    }

    // ========================================================================
    // LIVE CHANNEL
    // ========================================================================

    /// Subscribe to live rep/feedback updates
    ///
    /// Slow subscribers lag and lose the oldest updates rather than
    /// blocking the coach.
    pub fn subscribe_live(&self) -> broadcast::Receiver<LiveUpdate> {
        self.live.subscribe()
    }

    pub(crate) fn publish_live(&self, update: LiveUpdate) {
        let _ = self.live.send(update);
    }

    // ========================================================================
    // REP CHANNEL
    // ========================================================================

    pub fn subscribe_reps(&self) -> broadcast::Receiver<RepCompletedEvent> {
        self.rep.subscribe()
    }

    pub(crate) fn publish_rep(&self, event: RepCompletedEvent) {
        let _ = self.rep.send(event);
    }

    // ========================================================================
    // SESSION END CHANNELS
    // ========================================================================

    pub fn subscribe_summary(&self) -> broadcast::Receiver<SessionSummary> {
        self.summary.subscribe()
    }

    pub(crate) fn publish_summary(&self, summary: SessionSummary) {
        let _ = self.summary.send(summary);
    }

    pub fn subscribe_coaching(&self) -> broadcast::Receiver<CoachingReport> {
        self.coaching.subscribe()
    }

    /// Sender handed to the coaching request task
    pub(crate) fn coaching_sender(&self) -> broadcast::Sender<CoachingReport> {
        self.coaching.clone()
    }
}

impl Default for BroadcastChannelManager {
    fn default() -> Self {
        Self::new()
    }
}
