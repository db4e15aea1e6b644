//! Defines the WebSocket message protocol between the voice platform and the
//! server.
//!
//! Inbound messages are [`TurnRequest`]s; outbound messages are tagged with
//! `response_type` per the platform's custom-LLM protocol.

use frontdesk_core::turn::ResponseChunk;
use serde::Serialize;

/// Capability flags advertised to the platform at connection start.
#[derive(Serialize, Debug, Clone)]
pub struct ConfigPayload {
    pub auto_reconnect: bool,
    pub call_details: bool,
}

/// Messages sent from the server to the voice platform.
#[derive(Serialize, Debug, Clone)]
#[serde(tag = "response_type", rename_all = "snake_case")]
pub enum OutboundMessage {
    /// Sent once after the connection is accepted.
    Config {
        config: ConfigPayload,
        response_id: u64,
    },
    /// One fragment of a streamed reply.
    Response {
        #[serde(flatten)]
        chunk: ResponseChunk,
    },
    /// Echo of a keepalive ping.
    PingPong { timestamp: i64 },
}

impl OutboundMessage {
    /// The capability handshake sent at connection start.
    pub fn session_config() -> Self {
        OutboundMessage::Config {
            config: ConfigPayload {
                auto_reconnect: true,
                call_details: true,
            },
            response_id: 1,
        }
    }
}
