//! REST API Models
//!
//! Request and response bodies for the callback and call-registration
//! endpoints, annotated for OpenAPI generation with `utoipa`.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Acknowledgement returned after a callback fulfillment was stored.
#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct CallbackAck {
    #[schema(example = "success")]
    pub status: String,
}

impl CallbackAck {
    pub fn success() -> Self {
        Self {
            status: "success".to_string(),
        }
    }
}

/// The fulfilled callback payload, handed back to the poller.
#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct CallbackResult {
    #[schema(value_type = Object)]
    pub callback_value: serde_json::Value,
}

/// Fields forwarded to the voice provider when registering a browser call.
#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct RegisterCallPayload {
    #[schema(example = "agent_1234")]
    pub agent_id: String,
    /// Sample rate has to be 8000 for Twilio.
    #[schema(example = 24000)]
    pub sample_rate: u32,
}

#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    pub message: String,
}
