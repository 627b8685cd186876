use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::Semaphore;

use crate::error::FeedbackError;
use crate::feedback::protocol::{CoachingReport, FeedbackResult, TelemetryPacket};
use crate::feedback::transport::{FeedbackTransport, OfflineTransport};
use crate::session::SessionSummary;

/// Replies with queued results in order, then with empty results.
///
/// Every packet and summary it receives is recorded for inspection.
#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<FeedbackResult>>,
    sent: Mutex<Vec<TelemetryPacket>>,
    analyzed: Mutex<Vec<SessionSummary>>,
}

impl ScriptedTransport {
    pub fn new(responses: Vec<FeedbackResult>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            ..Self::default()
        }
    }

    pub fn push(&self, result: FeedbackResult) {
        self.responses
            .lock()
            .expect("responses poisoned")
            .push_back(result);
    }

    pub fn sent(&self) -> Vec<TelemetryPacket> {
        self.sent.lock().expect("sent log poisoned").clone()
    }

    pub fn analyzed(&self) -> Vec<SessionSummary> {
        self.analyzed.lock().expect("analyze log poisoned").clone()
    }
}

impl FeedbackTransport for ScriptedTransport {
    fn send_frame(
        &self,
        packet: TelemetryPacket,
    ) -> BoxFuture<'static, Result<FeedbackResult, FeedbackError>> {
        self.sent.lock().expect("sent log poisoned").push(packet);
        let next = self
            .responses
            .lock()
            .expect("responses poisoned")
            .pop_front()
            .unwrap_or_default();
        futures::future::ready(Ok(next)).boxed()
    }

    fn analyze(
        &self,
        summary: SessionSummary,
    ) -> BoxFuture<'static, Result<CoachingReport, FeedbackError>> {
        let report = OfflineTransport::local_report(&summary);
        self.analyzed
            .lock()
            .expect("analyze log poisoned")
            .push(summary);
        futures::future::ready(Ok(report)).boxed()
    }
}

/// Every request fails as if the service were unreachable.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingTransport;

impl FeedbackTransport for FailingTransport {
    fn send_frame(
        &self,
        _packet: TelemetryPacket,
    ) -> BoxFuture<'static, Result<FeedbackResult, FeedbackError>> {
        futures::future::ready(Err(FeedbackError::Transport {
            reason: "connection refused".to_string(),
        }))
        .boxed()
    }

    fn analyze(
        &self,
        _summary: SessionSummary,
    ) -> BoxFuture<'static, Result<CoachingReport, FeedbackError>> {
        futures::future::ready(Err(FeedbackError::Status { status: 503 })).boxed()
    }
}

/// Holds each realtime response and coaching report until a permit is released.
///
/// Lets a test finish or restart a session while requests are still in
/// flight and then deliver the late responses.
pub struct GatedTransport {
    result: FeedbackResult,
    gate: Arc<Semaphore>,
    reports: Arc<Semaphore>,
}

impl GatedTransport {
    pub fn new(result: FeedbackResult) -> Self {
        Self {
            result,
            gate: Arc::new(Semaphore::new(0)),
            reports: Arc::new(Semaphore::new(0)),
        }
    }

    /// Let `count` held requests complete
    pub fn release(&self, count: usize) {
        self.gate.add_permits(count);
    }

    /// Let `count` held coaching requests complete
    pub fn release_reports(&self, count: usize) {
        self.reports.add_permits(count);
    }
}

impl FeedbackTransport for GatedTransport {
    fn send_frame(
        &self,
        _packet: TelemetryPacket,
    ) -> BoxFuture<'static, Result<FeedbackResult, FeedbackError>> {
        let gate = Arc::clone(&self.gate);
        let result = self.result.clone();
        async move {
            let permit = gate
                .acquire_owned()
                .await
                .map_err(|err| FeedbackError::Transport {
                    reason: err.to_string(),
                })?;
            permit.forget();
            Ok(result)
        }
        .boxed()
    }

    fn analyze(
        &self,
        summary: SessionSummary,
    ) -> BoxFuture<'static, Result<CoachingReport, FeedbackError>> {
        let reports = Arc::clone(&self.reports);
        async move {
            let permit = reports
                .acquire_owned()
                .await
                .map_err(|err| FeedbackError::Transport {
                    reason: err.to_string(),
                })?;
            permit.forget();
            Ok(OfflineTransport::local_report(&summary))
        }
        .boxed()
    }
}
