//! Admin route handlers.
//!
//! Every response carries a `success` flag so the admin UI can branch
//! without inspecting status codes. Validation problems are the only
//! non-200 responses; partial batch failure is data, not an error.

use {
    axum::{Json, extract::State, http::StatusCode, response::IntoResponse},
    base64::Engine as _,
    serde::Deserialize,
    serde_json::json,
    tracing::info,
};

use herald_whatsapp::BatchResult;

use crate::server::AppState;

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}

/// Bring the session up, or report why it would not come up.
pub async fn initialize(State(state): State<AppState>) -> impl IntoResponse {
    match state.session.initialize().await {
        Ok(()) => Json(json!({
            "success": true,
            "message": "session initialized",
        })),
        Err(e) => Json(json!({
            "success": false,
            "message": e.to_string(),
        })),
    }
}

/// Pairing status: readiness, QR image while unpaired, the account's
/// number once paired.
pub async fn check_status(State(state): State<AppState>) -> impl IntoResponse {
    let status = match state.session.pairing_status().await {
        Ok(status) => status,
        Err(e) => {
            return Json(json!({
                "success": false,
                "is_ready": false,
                "qr_code": null,
                "connected_number": null,
                "message": e.to_string(),
            }))
            .into_response();
        },
    };

    let connected_number = if status.ready {
        Some(
            state
                .session
                .connected_identity()
                .await
                .unwrap_or_else(|| "connected (number not detected)".into()),
        )
    } else {
        None
    };
    let qr_code = status
        .qr_image
        .map(|png| base64::engine::general_purpose::STANDARD.encode(png));

    Json(json!({
        "success": true,
        "is_ready": status.ready,
        "qr_code": qr_code,
        "connected_number": connected_number,
    }))
    .into_response()
}

#[derive(Debug, Deserialize)]
pub struct SendSingleRequest {
    pub mobile: String,
    pub message: String,
}

/// Send to one recipient field (commas allowed).
pub async fn send_single(
    State(state): State<AppState>,
    Json(req): Json<SendSingleRequest>,
) -> impl IntoResponse {
    if req.mobile.trim().is_empty() {
        return validation_error("mobile is required");
    }
    if req.message.trim().is_empty() {
        return validation_error("message is required");
    }

    info!(mobile = %req.mobile, "single send requested");
    match state
        .dispatcher
        .dispatch_single(&req.mobile, &req.message)
        .await
    {
        Ok(result) => Json(summary(&result)).into_response(),
        Err(e) => Json(json!({ "success": false, "message": e.to_string() })).into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub struct SendBulkRequest {
    pub recipients: Vec<String>,
    pub message: String,
    #[serde(default)]
    pub delay_seconds: Option<u64>,
}

/// Send to a recipient list with a pause between sends. The whole batch
/// runs before the response goes out; the summary is always complete.
pub async fn send_bulk(
    State(state): State<AppState>,
    Json(req): Json<SendBulkRequest>,
) -> impl IntoResponse {
    if req.recipients.iter().all(|r| r.trim().is_empty()) {
        return validation_error("recipients are required");
    }
    if req.message.trim().is_empty() {
        return validation_error("message is required");
    }

    info!(
        recipients = req.recipients.len(),
        delay_seconds = ?req.delay_seconds,
        "bulk send requested"
    );
    match state
        .dispatcher
        .dispatch_bulk(&req.recipients, &req.message, req.delay_seconds)
        .await
    {
        Ok(result) => Json(summary(&result)).into_response(),
        Err(e) => Json(json!({ "success": false, "message": e.to_string() })).into_response(),
    }
}

/// Response shape shared by the send endpoints.
fn summary(result: &BatchResult) -> serde_json::Value {
    json!({
        "success": result.failed == 0,
        "message": format!("{} of {} messages sent", result.succeeded, result.total),
        "success_count": result.succeeded,
        "failed_count": result.failed,
        "total_count": result.total,
        "success_numbers": result.sent_recipients().collect::<Vec<_>>(),
        "failed_numbers": result.unsent_recipients().collect::<Vec<_>>(),
        "details": result.per_recipient,
    })
}

fn validation_error(message: &str) -> axum::response::Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "success": false, "message": message })),
    )
        .into_response()
}
