use axum::{Json, body::Bytes, extract::State};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::AppState;
use crate::services::Service;

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub status: &'static str,
    pub event: String,
}

/// `eventType` from an arbitrary payload, `"unknown"` when absent or the
/// body is not JSON.
pub fn event_type(body: &[u8]) -> String {
    serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|payload| {
            payload
                .get("eventType")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| "unknown".to_string())
}

fn receive(
    state: &AppState,
    service: Service,
    body: &[u8],
) -> Json<WebhookAck> {
    let event = event_type(body);
    info!(service = service.as_str(), %event, "webhook received");
    state.exclusions.webhook_received(service, &event);
    Json(WebhookAck {
        status: "ok",
        event,
    })
}

pub async fn radarr(
    State(state): State<AppState>,
    body: Bytes,
) -> Json<WebhookAck> {
    receive(&state, Service::Radarr, &body)
}

pub async fn sonarr(
    State(state): State<AppState>,
    body: Bytes,
) -> Json<WebhookAck> {
    receive(&state, Service::Sonarr, &body)
}
