//! Feedback Channel: fire-and-forget requests, session-tagged responses
//!
//! `dispatch` never blocks the frame path. Each request runs as a tokio task
//! and resolves to exactly one [`TaggedFeedback`] on the results queue, with
//! every failure mode collapsed into an absent result. The owner of the
//! session drains the queue; tasks never touch session state themselves.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use tokio::runtime::Handle;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use crate::config::FeedbackConfig;
use crate::error::{log_feedback_error, FeedbackError};
use crate::feedback::protocol::{CoachingReport, TaggedFeedback, TelemetryPacket};
use crate::feedback::transport::FeedbackTransport;
use crate::session::SessionSummary;

pub struct FeedbackChannel {
    transport: Arc<dyn FeedbackTransport>,
    results_tx: mpsc::UnboundedSender<TaggedFeedback>,
    request_timeout: Duration,
    analyze_timeout: Duration,
}

impl FeedbackChannel {
    /// Create the channel and the receiving end of its results queue
    pub fn new(
        transport: Arc<dyn FeedbackTransport>,
        config: &FeedbackConfig,
    ) -> (Self, mpsc::UnboundedReceiver<TaggedFeedback>) {
        let (results_tx, results_rx) = mpsc::unbounded_channel();
        let channel = Self {
            transport,
            results_tx,
            request_timeout: Duration::from_millis(config.request_timeout_ms),
            analyze_timeout: Duration::from_millis(config.analyze_timeout_ms),
        };
        (channel, results_rx)
    }

    /// Send one packet without waiting for the response
    ///
    /// Exactly one tagged result is queued per call. Outside a tokio runtime
    /// the request cannot run, so an absent result is queued immediately.
    pub fn dispatch(&self, packet: TelemetryPacket) {
        let session_id = packet.session_id.clone();
        let sent_at_ms = packet.timestamp_ms;

        let runtime = match Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                warn!("[FeedbackChannel] No tokio runtime; dropping packet for {}", session_id);
                let _ = self.results_tx.send(TaggedFeedback {
                    session_id,
                    sent_at_ms,
                    result: None,
                });
                return;
            }
        };

        let request = self.transport.send_frame(packet);
        let results_tx = self.results_tx.clone();
        let timeout = self.request_timeout;

        runtime.spawn(async move {
            let result = match tokio::time::timeout(timeout, request).await {
                Ok(Ok(result)) => Some(result),
                Ok(Err(err)) => {
                    log_feedback_error(&err, "realtime_feedback");
                    None
                }
                Err(_) => {
                    let err = FeedbackError::Timeout {
                        after_ms: timeout.as_millis() as u64,
                    };
                    log_feedback_error(&err, "realtime_feedback");
                    None
                }
            };

            // Receiver gone means the coach was dropped; nothing left to update
            if results_tx
                .send(TaggedFeedback {
                    session_id,
                    sent_at_ms,
                    result,
                })
                .is_err()
            {
                debug!("[FeedbackChannel] Result receiver closed");
            }
        });
    }

    /// Ask the service for end-of-session coaching
    ///
    /// The report is published to `reports` untouched and also returned
    /// through the join handle. Failures resolve to `None`.
    pub fn request_coaching(
        &self,
        summary: SessionSummary,
        reports: Option<broadcast::Sender<CoachingReport>>,
    ) -> Option<JoinHandle<Option<CoachingReport>>> {
        let runtime = match Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                warn!(
                    "[FeedbackChannel] No tokio runtime; skipping coaching for {}",
                    summary.session_id
                );
                return None;
            }
        };

        let session_id = summary.session_id.clone();
        let request = self.transport.analyze(summary);
        let timeout = self.analyze_timeout;

        Some(runtime.spawn(async move {
            let report = match tokio::time::timeout(timeout, request).await {
                Ok(Ok(report)) => report,
                Ok(Err(err)) => {
                    log_feedback_error(&err, "analyze_workout");
                    return None;
                }
                Err(_) => {
                    let err = FeedbackError::Timeout {
                        after_ms: timeout.as_millis() as u64,
                    };
                    log_feedback_error(&err, "analyze_workout");
                    return None;
                }
            };

            info!("[FeedbackChannel] Coaching report received for {}", session_id);
            if let Some(tx) = reports {
                let _ = tx.send(report.clone());
            }
            Some(report)
        }))
    }
}
