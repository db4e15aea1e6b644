//! Axum Handlers for the REST API
//!
//! Callback fulfillment and polling for the scheduling integration, plus the
//! pass-through call registration endpoint for the web frontend (so the
//! frontend never needs the voice provider's API key).

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;
use tracing::{error, info};

use crate::{
    models::{CallbackAck, CallbackResult, ErrorResponse, RegisterCallPayload},
    state::AppState,
};

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    InternalServerError(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(ErrorResponse { message })).into_response()
            }
            ApiError::InternalServerError(err) => {
                error!("Internal Server Error: {:?}", err);
                let message = "An internal server error occurred.".to_string();
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse { message }),
                )
                    .into_response()
            }
        }
    }
}

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::InternalServerError(err.into())
    }
}

/// Store the fulfillment value for a pending callback.
#[utoipa::path(
    post,
    path = "/callbacks/{callback_id}",
    responses(
        (status = 200, description = "Fulfillment stored", body = CallbackAck),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    params(
        ("callback_id" = String, Path, description = "The callback to fulfill")
    )
)]
pub async fn fulfill_callback(
    State(state): State<Arc<AppState>>,
    Path(callback_id): Path<String>,
    Json(payload): Json<serde_json::Value>,
) -> Json<CallbackAck> {
    info!(%callback_id, "Callback fulfillment received");
    state.callbacks.fulfill(&callback_id, payload).await;
    Json(CallbackAck::success())
}

/// Wait for a callback to be fulfilled and consume its value.
#[utoipa::path(
    get,
    path = "/callbacks/{callback_id}/result",
    responses(
        (status = 200, description = "The fulfilled callback value", body = CallbackResult),
        (status = 500, description = "Timed out waiting for the callback", body = ErrorResponse)
    ),
    params(
        ("callback_id" = String, Path, description = "The callback to wait for")
    )
)]
pub async fn callback_result(
    State(state): State<Arc<AppState>>,
    Path(callback_id): Path<String>,
) -> Result<Json<CallbackResult>, ApiError> {
    let callback_value = state.callbacks.await_result(&callback_id).await?;
    Ok(Json(CallbackResult { callback_value }))
}

/// Register a call with the voice provider on behalf of the web frontend.
#[utoipa::path(
    post,
    path = "/register-call",
    request_body = RegisterCallPayload,
    responses(
        (status = 200, description = "Provider response, passed through"),
        (status = 400, description = "Call registration is not configured", body = ErrorResponse),
        (status = 500, description = "Provider rejected the registration", body = ErrorResponse)
    )
)]
pub async fn register_call(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterCallPayload>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Some(register_url) = &state.config.voice_register_url else {
        return Err(ApiError::BadRequest(
            "Call registration is not configured on this server".to_string(),
        ));
    };

    let body = serde_json::json!({
        "agent_id": payload.agent_id,
        "audio_websocket_protocol": "web",
        "audio_encoding": "s16le",
        "sample_rate": payload.sample_rate,
    });

    let mut request = state.http.post(register_url).json(&body);
    if let Some(api_key) = &state.config.voice_api_key {
        request = request.bearer_auth(api_key);
    }

    let response = request.send().await?;
    if !response.status().is_success() {
        return Err(ApiError::InternalServerError(anyhow::anyhow!(
            "voice provider returned {}",
            response.status()
        )));
    }
    Ok(Json(response.json().await?))
}
