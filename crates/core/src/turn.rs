//! Shared data types for one conversational turn.
//!
//! These structs mirror the wire protocol spoken by the voice platform: the
//! platform pushes transcript updates tagged with a monotonically
//! non-decreasing `response_id`, and the server streams back chunks tagged
//! with the same id.

use serde::{Deserialize, Serialize};

/// Who produced an utterance in the transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Agent,
}

/// A single entry in the conversation transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Utterance {
    pub role: Role,
    pub content: String,
}

/// The kind of inbound protocol message.
///
/// Only `ResponseRequired` and `ReminderRequired` start a new reply; the
/// rest are bookkeeping or keepalive traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionType {
    CallDetails,
    PingPong,
    UpdateOnly,
    ResponseRequired,
    ReminderRequired,
}

/// An inbound transcript update from the voice platform.
///
/// Immutable once parsed; the transcript is owned by the request and is never
/// mutated in place.
#[derive(Debug, Clone, Deserialize)]
pub struct TurnRequest {
    pub interaction_type: InteractionType,
    #[serde(default)]
    pub response_id: u64,
    #[serde(default)]
    pub transcript: Vec<Utterance>,
    #[serde(default)]
    pub timestamp: i64,
}

/// One fragment of a streamed reply.
///
/// The sequence of chunks sharing a `response_id`, delivered in order with
/// `content_complete` set on exactly the last one, constitutes one reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseChunk {
    pub response_id: u64,
    pub content: String,
    pub content_complete: bool,
    pub end_call: bool,
}

impl ResponseChunk {
    /// A non-final chunk carrying a fragment of reply text.
    pub fn fragment(response_id: u64, content: impl Into<String>) -> Self {
        Self {
            response_id,
            content: content.into(),
            content_complete: false,
            end_call: false,
        }
    }

    /// The terminal chunk of a reply. Carries no content; everything was
    /// already streamed as fragments.
    pub fn finished(response_id: u64) -> Self {
        Self {
            response_id,
            content: String::new(),
            content_complete: true,
            end_call: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_platform_request() {
        let raw = r#"{
            "interaction_type": "response_required",
            "response_id": 3,
            "transcript": [
                {"role": "agent", "content": "How can I help?"},
                {"role": "user", "content": "I need an appointment"}
            ],
            "timestamp": 1714212000000
        }"#;
        let request: TurnRequest = serde_json::from_str(raw).unwrap();
        assert_eq!(request.interaction_type, InteractionType::ResponseRequired);
        assert_eq!(request.response_id, 3);
        assert_eq!(request.transcript.len(), 2);
        assert_eq!(request.transcript[1].role, Role::User);
    }

    #[test]
    fn missing_optional_fields_default() {
        let request: TurnRequest =
            serde_json::from_str(r#"{"interaction_type": "update_only"}"#).unwrap();
        assert_eq!(request.response_id, 0);
        assert!(request.transcript.is_empty());
    }

    #[test]
    fn chunk_constructors() {
        let fragment = ResponseChunk::fragment(7, "hello");
        assert!(!fragment.content_complete);
        assert_eq!(fragment.content, "hello");

        let finished = ResponseChunk::finished(7);
        assert!(finished.content_complete);
        assert!(finished.content.is_empty());
        assert!(!finished.end_call);
    }
}
