use super::server::ServerState;
use axum::{
    extract::{rejection::BytesRejection, State},
    http::StatusCode,
    response::IntoResponse,
};
use bytes::Bytes;
use tracing::{debug, warn};

pub const GREETING: &str = "Hello from alarmview!";

/// Alarm notifications from the NVR. Always answers 200 with an empty body.
pub async fn notify_handler(
    State(state): State<ServerState>,
    body: Result<Bytes, BytesRejection>,
) -> StatusCode {
    match body {
        Ok(body) => {
            let outcome = state.ingest.ingest(&body).await;
            debug!("Webhook handled: {:?}", outcome);
        }
        Err(e) => {
            warn!("Unreadable webhook body: {}", e);
        }
    }

    StatusCode::OK
}

pub async fn root_handler() -> &'static str {
    GREETING
}

pub async fn health_handler(State(state): State<ServerState>) -> impl IntoResponse {
    let health_info = serde_json::json!({
        "status": "healthy",
        "webhook": state.ingest.stats(),
        "fetch_queue": state.ingest.fetch_queue().stats(),
        "render_queue": state.probe.render_queue.as_ref().map(|queue| queue.stats()),
        "fetch_worker": state.probe.fetch_stats.as_ref().map(|stats| stats.snapshot()),
        "render_worker": state.probe.render_stats.as_ref().map(|stats| stats.snapshot()),
    });

    (StatusCode::OK, axum::Json(health_info))
}
