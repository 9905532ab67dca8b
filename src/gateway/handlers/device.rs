//! Device callback handler

use axum::{Json, extract::State};
use chrono::Utc;

use super::super::state::AppState;
use super::super::types::{ApiError, ApiResult, CallbackRequest, ok};

/// Device callback endpoint
///
/// POST /api/v1/device/callback
///
/// Unauthenticated, device-originated. The device only receives an
/// ack/nack; state never flows back. Each callback is independent: a
/// failed handler does not affect other callbacks and never crashes
/// the service.
#[utoipa::path(
    post,
    path = "/api/v1/device/callback",
    request_body = CallbackRequest,
    responses(
        (status = 200, description = "Event processed"),
        (status = 400, description = "Malformed callback"),
        (status = 404, description = "Unknown device"),
        (status = 500, description = "Event handler failure (recorded on the device log)")
    ),
    tag = "Device"
)]
pub async fn device_callback(
    State(state): State<AppState>,
    Json(req): Json<CallbackRequest>,
) -> ApiResult<()> {
    // Older hardware revisions identify by SIM iccid instead of devid
    let devid = match req.devid.as_deref().or(req.iccid.as_deref()) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => return ApiError::bad_request("devid or iccid is required").into_err(),
    };

    let payload = req
        .payload
        .unwrap_or(serde_json::Value::Object(Default::default()));
    let timestamp = req.timestamp.unwrap_or_else(Utc::now);

    tracing::debug!(devid = %devid, event_type = %req.event_type, "Device callback received");

    state
        .events
        .handle_callback(&devid, &req.event_type, &payload, timestamp)
        .await?;

    ok(())
}
