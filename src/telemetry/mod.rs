//! Diagnostics telemetry collector and helpers.
//!
//! The collector multiplexes gate, feedback, and session lifecycle events
//! into a bounded history plus async broadcast stream. Each coach owns its
//! own hub.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::pose::GateStatus;

pub mod events;

pub use events::MetricEvent;

/// Per-status frame totals since the hub was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameCounters {
    pub none: u64,
    pub partial: u64,
    pub full: u64,
}

/// Snapshot of collector state for HTTP/CLI reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    pub recent: Vec<MetricEvent>,
    pub total_events: u64,
    pub dropped_events: u64,
    pub frames: FrameCounters,
    pub packets_sent: u64,
}

/// Broadcast-based collector retaining a bounded history of metrics.
pub struct TelemetryCollector {
    tx: broadcast::Sender<MetricEvent>,
    history: Mutex<VecDeque<MetricEvent>>,
    history_capacity: usize,
    total_events: AtomicU64,
    dropped_history: AtomicU64,
}

impl TelemetryCollector {
    pub fn new(buffer: usize, history_capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(buffer);
        Self {
            tx,
            history: Mutex::new(VecDeque::with_capacity(history_capacity)),
            history_capacity,
            total_events: AtomicU64::new(0),
            dropped_history: AtomicU64::new(0),
        }
    }

    pub fn publish(&self, event: MetricEvent) {
        self.total_events.fetch_add(1, Ordering::Relaxed);
        {
            let mut history = self.history.lock().expect("history poisoned");
            if history.len() == self.history_capacity {
                history.pop_front();
                self.dropped_history.fetch_add(1, Ordering::Relaxed);
            }
            history.push_back(event.clone());
        }

        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MetricEvent> {
        self.tx.subscribe()
    }

    fn recent(&self) -> (Vec<MetricEvent>, u64, u64) {
        let history = self.history.lock().expect("history poisoned");
        (
            history.iter().cloned().collect(),
            self.total_events.load(Ordering::Relaxed),
            self.dropped_history.load(Ordering::Relaxed),
        )
    }
}

impl Default for TelemetryCollector {
    fn default() -> Self {
        Self::new(256, 64)
    }
}

/// Latency tracker maintains a rolling window to compute avg/max latency.
struct LatencyTracker {
    samples: VecDeque<f32>,
    max_samples: usize,
}

impl LatencyTracker {
    fn new(max_samples: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(max_samples),
            max_samples,
        }
    }

    fn observe(&mut self, value: f32) -> (f32, f32, usize) {
        if self.samples.len() == self.max_samples {
            self.samples.pop_front();
        }
        self.samples.push_back(value.abs());

        let count = self.samples.len();
        let sum: f32 = self.samples.iter().copied().sum();
        let max = self
            .samples
            .iter()
            .copied()
            .fold(0.0_f32, |acc, next| acc.max(next));
        let avg = if count == 0 { 0.0 } else { sum / count as f32 };
        (avg, max, count)
    }
}

/// Top-level hub wrapping collector state plus derived gauges.
pub struct TelemetryHub {
    collector: TelemetryCollector,
    latency: Mutex<LatencyTracker>,
    last_gate: Mutex<Option<GateStatus>>,
    frames_none: AtomicU64,
    frames_partial: AtomicU64,
    frames_full: AtomicU64,
    packets_sent: AtomicU64,
}

impl TelemetryHub {
    pub fn new(channel_capacity: usize, history_capacity: usize, latency_window: usize) -> Self {
        Self {
            collector: TelemetryCollector::new(channel_capacity, history_capacity),
            latency: Mutex::new(LatencyTracker::new(latency_window)),
            last_gate: Mutex::new(None),
            frames_none: AtomicU64::new(0),
            frames_partial: AtomicU64::new(0),
            frames_full: AtomicU64::new(0),
            packets_sent: AtomicU64::new(0),
        }
    }

    pub fn collector(&self) -> &TelemetryCollector {
        &self.collector
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        let (recent, total_events, dropped_events) = self.collector.recent();
        TelemetrySnapshot {
            recent,
            total_events,
            dropped_events,
            frames: FrameCounters {
                none: self.frames_none.load(Ordering::Relaxed),
                partial: self.frames_partial.load(Ordering::Relaxed),
                full: self.frames_full.load(Ordering::Relaxed),
            },
            packets_sent: self.packets_sent.load(Ordering::Relaxed),
        }
    }

    /// Count the frame; only a change of gate status becomes an event
    pub fn record_frame(&self, status: GateStatus, timestamp_ms: u64) {
        let counter = match status {
            GateStatus::NotDetected => &self.frames_none,
            GateStatus::Partial => &self.frames_partial,
            GateStatus::Full => &self.frames_full,
        };
        counter.fetch_add(1, Ordering::Relaxed);

        let changed = {
            let mut last = self.last_gate.lock().expect("gate gauge poisoned");
            let changed = *last != Some(status);
            *last = Some(status);
            changed
        };

        if changed {
            self.collector.publish(MetricEvent::FrameGated {
                status,
                timestamp_ms,
            });
        }
    }

    pub fn record_packet(&self, session_id: &str, timestamp_ms: u64) {
        self.packets_sent.fetch_add(1, Ordering::Relaxed);
        self.collector.publish(MetricEvent::PacketSent {
            session_id: session_id.to_string(),
            timestamp_ms,
        });
    }

    pub fn record_applied(&self, session_id: &str, reps: u32, rep_completed: bool) {
        self.collector.publish(MetricEvent::FeedbackApplied {
            session_id: session_id.to_string(),
            reps,
            rep_completed,
        });
    }

    pub fn record_dropped(&self, session_id: &str) {
        self.collector.publish(MetricEvent::FeedbackDropped {
            session_id: session_id.to_string(),
        });
    }

    pub fn record_stale(&self, session_id: &str) {
        self.collector.publish(MetricEvent::StaleDiscarded {
            session_id: session_id.to_string(),
        });
    }

    /// Fold one request round trip into the rolling latency gauge
    pub fn record_round_trip(&self, elapsed_ms: u64) {
        let (avg, max, count) = {
            let mut tracker = self.latency.lock().expect("latency tracker poisoned");
            tracker.observe(elapsed_ms as f32)
        };

        self.collector.publish(MetricEvent::Latency {
            avg_ms: avg,
            max_ms: max,
            sample_count: count,
        });
    }

    pub fn record_session_started(&self, session_id: &str, exercise_id: &str) {
        self.collector.publish(MetricEvent::SessionStarted {
            session_id: session_id.to_string(),
            exercise_id: exercise_id.to_string(),
        });
    }

    pub fn record_session_finished(&self, session_id: &str, rep_count: u32, duration_seconds: u64) {
        self.collector.publish(MetricEvent::SessionFinished {
            session_id: session_id.to_string(),
            rep_count,
            duration_seconds,
        });
    }
}

impl Default for TelemetryHub {
    fn default() -> Self {
        Self::new(256, 64, 32)
    }
}
