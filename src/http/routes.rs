use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::extract::{Query, State};
use axum::http::header::{HeaderName, AUTHORIZATION};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use serde::{Deserialize, Serialize};

use crate::api::CoachSnapshot;
use crate::engine::CoachObserver;
use crate::session::SessionStatus;
use crate::telemetry::TelemetrySnapshot;

use super::sse;

/// Shared application state for HTTP handlers.
#[derive(Clone)]
pub struct DebugHttpState {
    pub observer: CoachObserver,
    token: Arc<String>,
}

impl DebugHttpState {
    pub fn new(observer: CoachObserver, token: String) -> Self {
        Self {
            observer,
            token: Arc::new(token),
        }
    }

    fn authorize(
        &self,
        headers: &HeaderMap,
        query_token: Option<&str>,
    ) -> Result<(), HttpServerError> {
        let provided = extract_token(headers, query_token);
        match provided {
            Some(value) if value == *self.token => Ok(()),
            _ => Err(HttpServerError::Unauthorized),
        }
    }
}

/// Query payload for extracting token from URL.
#[derive(Debug, Default, Deserialize)]
pub struct AuthQuery {
    pub token: Option<String>,
}

/// HTTP error variants mapped to JSON responses.
#[derive(Debug)]
pub enum HttpServerError {
    Unauthorized,
}

impl IntoResponse for HttpServerError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "missing or invalid token"),
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

/// Health endpoint response payload.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub session_status: SessionStatus,
    pub uptime_ms: u64,
}

/// Build the Axum router with all handlers.
pub fn build_router(state: DebugHttpState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/snapshot", get(snapshot))
        .route("/metrics", get(metrics))
        .route("/live-stream", get(live_stream_handler))
        .with_state(state)
}

/// Run the HTTP server loop.
pub async fn run_http_server(state: DebugHttpState, addr: SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("binding debug HTTP listener")?;
    let router = build_router(state);
    axum::serve(listener, router)
        .await
        .context("serving debug HTTP router")?;
    Ok(())
}

pub async fn health(
    State(state): State<DebugHttpState>,
    Query(query): Query<AuthQuery>,
    headers: HeaderMap,
) -> Result<Json<HealthResponse>, HttpServerError> {
    state.authorize(&headers, query.token.as_deref())?;

    Ok(Json(HealthResponse {
        status: "ok",
        session_status: state.observer.snapshot().status,
        uptime_ms: state.observer.uptime_ms(),
    }))
}

pub async fn snapshot(
    State(state): State<DebugHttpState>,
    Query(query): Query<AuthQuery>,
    headers: HeaderMap,
) -> Result<Json<CoachSnapshot>, HttpServerError> {
    state.authorize(&headers, query.token.as_deref())?;
    Ok(Json(state.observer.snapshot()))
}

pub async fn metrics(
    State(state): State<DebugHttpState>,
    Query(query): Query<AuthQuery>,
    headers: HeaderMap,
) -> Result<Json<TelemetrySnapshot>, HttpServerError> {
    state.authorize(&headers, query.token.as_deref())?;
    Ok(Json(state.observer.telemetry()))
}

pub async fn live_stream_handler(
    State(state): State<DebugHttpState>,
    Query(query): Query<AuthQuery>,
    headers: HeaderMap,
) -> Result<sse::LiveStream, HttpServerError> {
    state.authorize(&headers, query.token.as_deref())?;
    Ok(sse::live(&state.observer))
}

fn extract_token(headers: &HeaderMap, query_token: Option<&str>) -> Option<String> {
    if let Some(token) = query_token {
        return Some(token.to_string());
    }

    static X_DEBUG_TOKEN: HeaderName = HeaderName::from_static("x-debug-token");

    headers
        .get(&X_DEBUG_TOKEN)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_string())
        .or_else(|| {
            headers
                .get(AUTHORIZATION)
                .and_then(|value| value.to_str().ok())
                .and_then(|raw| raw.strip_prefix("Bearer ").map(|v| v.to_string()))
        })
}

#[cfg(all(test, feature = "debug_http"))]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use axum::response::Response;
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::config::AppConfig;
    use crate::engine::{CoachHandle, ManualClock};
    use crate::testing::ScriptedTransport;

    const TOKEN: &str = "smoke-token";

    fn make_coach() -> CoachHandle {
        CoachHandle::new(
            AppConfig::default(),
            Arc::new(ScriptedTransport::default()),
            Arc::new(ManualClock::new(0)),
        )
    }

    fn make_router(coach: &CoachHandle) -> Router {
        build_router(DebugHttpState::new(coach.observer(), TOKEN.to_string()))
    }

    async fn response_json(response: Response) -> (StatusCode, Value) {
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("response body bytes");
        let json = serde_json::from_slice::<Value>(&bytes).expect("JSON body");
        (status, json)
    }

    async fn get_json(router: Router, uri: &str) -> (StatusCode, Value) {
        response_json(
            router
                .oneshot(
                    Request::builder()
                        .uri(uri)
                        .body(Body::empty())
                        .expect("request"),
                )
                .await
                .expect("call"),
        )
        .await
    }

    #[tokio::test]
    async fn health_requires_token() {
        let coach = make_coach();
        let (status, json) = get_json(make_router(&coach), "/health").await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["error"], "missing or invalid token");
    }

    #[tokio::test]
    async fn health_succeeds_with_token() {
        let coach = make_coach();
        let (status, json) =
            get_json(make_router(&coach), &format!("/health?token={TOKEN}")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
        assert_eq!(json["session_status"], "idle");
    }

    #[tokio::test]
    async fn snapshot_reflects_started_session() {
        let mut coach = make_coach();
        let router = make_router(&coach);
        coach.start_session("Squat").unwrap();

        let (status, json) = get_json(router, &format!("/snapshot?token={TOKEN}")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "active");
        assert_eq!(json["exercise_id"], "Squat");
        assert_eq!(json["rep_count"], 0);
    }

    #[tokio::test]
    async fn metrics_succeeds_with_bearer_header() {
        let coach = make_coach();
        let response = make_router(&coach)
            .oneshot(
                Request::builder()
                    .uri("/metrics")
                    .header(AUTHORIZATION, format!("Bearer {TOKEN}"))
                    .body(Body::empty())
                    .expect("metrics request"),
            )
            .await
            .expect("metrics call");
        let (status, json) = response_json(response).await;

        assert_eq!(status, StatusCode::OK);
        assert!(json["recent"].is_array());
        assert!(json["frames"].is_object());
    }
}
