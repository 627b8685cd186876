use futures::{Stream, StreamExt};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

use crate::engine::CoachObserver;
use crate::feedback::CoachingReport;
use crate::telemetry::MetricEvent;

use super::{LiveUpdate, RepCompletedEvent};

/// Adapt a broadcast receiver into a stream, skipping over lag gaps
fn lossy<T: Clone + Send + 'static>(rx: broadcast::Receiver<T>) -> impl Stream<Item = T> {
    BroadcastStream::new(rx).filter_map(|item| async move { item.ok() })
}

/// Stream of live rep/feedback updates
///
/// A subscriber that falls behind skips the updates it missed; the next
/// update carries the authoritative totals anyway.
pub fn live_stream(observer: &CoachObserver) -> impl Stream<Item = LiveUpdate> {
    lossy(observer.broadcasts.subscribe_live())
}

/// Stream of rep-completion events
pub fn rep_stream(observer: &CoachObserver) -> impl Stream<Item = RepCompletedEvent> {
    lossy(observer.broadcasts.subscribe_reps())
}

/// Stream of end-of-session coaching reports
pub fn coaching_stream(observer: &CoachObserver) -> impl Stream<Item = CoachingReport> {
    lossy(observer.broadcasts.subscribe_coaching())
}

/// Stream of diagnostic metrics from the coach's telemetry hub
pub fn telemetry_stream(observer: &CoachObserver) -> impl Stream<Item = MetricEvent> {
    lossy(observer.subscribe_telemetry())
}
