//! Transport abstraction for the remote analysis service.

use futures::future::BoxFuture;
use futures::FutureExt;

use crate::config::FeedbackConfig;
use crate::error::FeedbackError;
use crate::feedback::protocol::{
    AiCoaching, CoachingReport, FeedbackResult, ReportSummary, TelemetryPacket,
};
use crate::session::SessionSummary;

/// Trait implemented by anything that can reach the analysis service.
///
/// Futures are `'static` so the feedback channel can spawn them and move on
/// to the next frame without awaiting.
pub trait FeedbackTransport: Send + Sync {
    /// Realtime scoring for one frame
    fn send_frame(
        &self,
        packet: TelemetryPacket,
    ) -> BoxFuture<'static, Result<FeedbackResult, FeedbackError>>;

    /// End-of-session coaching for a frozen summary
    fn analyze(
        &self,
        summary: SessionSummary,
    ) -> BoxFuture<'static, Result<CoachingReport, FeedbackError>>;
}

/// JSON-over-HTTP transport backed by reqwest
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    realtime_url: String,
    analyze_url: String,
}

impl HttpTransport {
    pub fn new(config: &FeedbackConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            realtime_url: config.realtime_url(),
            analyze_url: config.analyze_url(),
        }
    }

    pub fn realtime_url(&self) -> &str {
        &self.realtime_url
    }
}

impl FeedbackTransport for HttpTransport {
    fn send_frame(
        &self,
        packet: TelemetryPacket,
    ) -> BoxFuture<'static, Result<FeedbackResult, FeedbackError>> {
        let client = self.client.clone();
        let url = self.realtime_url.clone();
        async move {
            let response = client.post(&url).json(&packet).send().await?;
            let result = response.error_for_status()?.json::<FeedbackResult>().await?;
            Ok(result)
        }
        .boxed()
    }

    fn analyze(
        &self,
        summary: SessionSummary,
    ) -> BoxFuture<'static, Result<CoachingReport, FeedbackError>> {
        let client = self.client.clone();
        let url = self.analyze_url.clone();
        async move {
            let response = client.post(&url).json(&summary).send().await?;
            let report = response.error_for_status()?.json::<CoachingReport>().await?;
            Ok(report)
        }
        .boxed()
    }
}

/// Transport that never leaves the process
///
/// Realtime requests resolve to an empty result (no reps, no cue). The
/// coaching report is assembled from the summary alone, so a session can be
/// run end to end without the analysis service.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineTransport;

impl OfflineTransport {
    pub fn local_report(summary: &SessionSummary) -> CoachingReport {
        let message = if summary.issues.is_empty() {
            format!(
                "{} reps of {} with no form issues flagged.",
                summary.rep_count, summary.exercise_name
            )
        } else {
            format!(
                "{} reps of {}. Work on: {}.",
                summary.rep_count,
                summary.exercise_name,
                summary.issues.join(", ")
            )
        };

        CoachingReport {
            summary: Some(ReportSummary {
                exercise_type: summary.exercise_name.clone(),
                total_reps: summary.rep_count,
                valid_reps: summary.rep_count,
                avg_accuracy_score: 0.0,
            }),
            biometrics: None,
            ai_coaching: Some(AiCoaching {
                message,
                tutorial_video: None,
            }),
        }
    }
}

impl FeedbackTransport for OfflineTransport {
    fn send_frame(
        &self,
        _packet: TelemetryPacket,
    ) -> BoxFuture<'static, Result<FeedbackResult, FeedbackError>> {
        futures::future::ready(Ok(FeedbackResult::default())).boxed()
    }

    fn analyze(
        &self,
        summary: SessionSummary,
    ) -> BoxFuture<'static, Result<CoachingReport, FeedbackError>> {
        futures::future::ready(Ok(Self::local_report(&summary))).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feedback::channel::FeedbackChannel;
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn packet(session_id: &str) -> TelemetryPacket {
        TelemetryPacket {
            session_id: session_id.to_string(),
            exercise: "squat".to_string(),
            timestamp_ms: 0,
            fps: 30,
            landmarks: Vec::new(),
        }
    }

    /// Serve one canned HTTP response per accepted connection, in order
    async fn canned_backend(responses: Vec<(&'static str, &'static str)>) -> FeedbackConfig {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            for (status, body) in responses {
                let (mut socket, _) = listener.accept().await.unwrap();
                read_request(&mut socket).await;
                let reply = format!(
                    "HTTP/1.1 {}\r\n\
                     Content-Type: application/json\r\n\
                     Content-Length: {}\r\n\
                     Connection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                socket.write_all(reply.as_bytes()).await.unwrap();
                let _ = socket.shutdown().await;
            }
        });

        FeedbackConfig {
            base_url: format!("http://{}", addr),
            ..FeedbackConfig::default()
        }
    }

    async fn read_request(socket: &mut tokio::net::TcpStream) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                return;
            }
            buf.extend_from_slice(&chunk[..n]);

            let text = String::from_utf8_lossy(&buf);
            if let Some(header_end) = text.find("\r\n\r\n") {
                let content_length = text[..header_end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if buf.len() >= header_end + 4 + content_length {
                    return;
                }
            }
        }
    }

    #[test]
    fn test_http_transport_builds_urls_from_config() {
        let config = FeedbackConfig {
            base_url: "http://coach.local:9000/".to_string(),
            ..FeedbackConfig::default()
        };
        let transport = HttpTransport::new(&config);
        assert_eq!(
            transport.realtime_url(),
            "http://coach.local:9000/realtime-feedback"
        );
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_a_transport_error() {
        // Port 9 (discard) on localhost is closed in test environments
        let config = FeedbackConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            ..FeedbackConfig::default()
        };
        let transport = HttpTransport::new(&config);
        let err = transport.send_frame(packet("s")).await.unwrap_err();
        assert!(matches!(err, FeedbackError::Transport { .. }));
    }

    #[tokio::test]
    async fn test_error_status_and_malformed_body_map_to_errors() {
        let config = canned_backend(vec![
            ("500 Internal Server Error", r#"{"detail":"boom"}"#),
            ("200 OK", r#"{"reps":"x"}"#),
        ])
        .await;
        let transport = HttpTransport::new(&config);

        let err = transport.send_frame(packet("s")).await.unwrap_err();
        assert_eq!(err, FeedbackError::Status { status: 500 });

        let err = transport.send_frame(packet("s")).await.unwrap_err();
        assert!(matches!(err, FeedbackError::Decode { .. }), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_channel_turns_backend_errors_into_absent_results() {
        let config = canned_backend(vec![
            ("500 Internal Server Error", r#"{"detail":"boom"}"#),
            ("200 OK", r#"{"reps":"x"}"#),
        ])
        .await;
        let (channel, mut rx) =
            FeedbackChannel::new(Arc::new(HttpTransport::new(&config)), &config);

        channel.dispatch(packet("squat-0-1"));
        let first = rx.recv().await.unwrap();
        channel.dispatch(packet("squat-0-1"));
        let second = rx.recv().await.unwrap();

        for tagged in [first, second] {
            assert_eq!(tagged.session_id, "squat-0-1");
            assert_eq!(tagged.result, None);
        }
    }

    #[tokio::test]
    async fn test_offline_transport_reports_issues() {
        let summary = SessionSummary {
            session_id: "squat-0-0".to_string(),
            exercise_id: "Squat".to_string(),
            exercise_name: "Squat".to_string(),
            duration_seconds: 12,
            rep_count: 5,
            issues: vec!["knee_cave".to_string()],
        };
        let report = OfflineTransport.analyze(summary).await.unwrap();
        assert_eq!(report.summary.map(|s| s.total_reps), Some(5));
        let message = report.ai_coaching.map(|c| c.message).unwrap_or_default();
        assert!(message.contains("knee_cave"));
    }
}
