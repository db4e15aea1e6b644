//! The closed set of tools exposed to the model.
//!
//! Tool dispatch goes through a lookup table built at startup, so an unknown
//! tool name coming back from the model is a checked case rather than a
//! lookup failure.

use anyhow::Result;
use async_openai::types::{ChatCompletionTool, ChatCompletionToolArgs, FunctionObjectArgs};
use serde_json::json;

/// The known tool kinds. Dispatch in the executor matches on this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    GetInformation,
    CheckAvailability,
    BookSlot,
}

/// Static description of one tool: its wire name, the schema advertised to
/// the model, and the filler phrase spoken while it runs.
pub struct ToolSpec {
    pub kind: ToolKind,
    pub name: &'static str,
    pub description: &'static str,
    pub filler: &'static str,
    pub parameters: serde_json::Value,
}

/// Lookup table from tool name to spec. Pure data; no concurrency.
pub struct ToolRegistry {
    specs: Vec<ToolSpec>,
}

impl ToolRegistry {
    /// Builds the registry with the three front-desk tools.
    pub fn standard() -> Self {
        let specs = vec![
            ToolSpec {
                kind: ToolKind::GetInformation,
                name: "get_information",
                description: "Get information about the clinic.",
                filler: "I will get the information for you.\n",
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "query": {
                            "type": "string",
                            "description": "The query necessitating additional information.",
                        }
                    },
                    "required": ["query"],
                }),
            },
            ToolSpec {
                kind: ToolKind::CheckAvailability,
                name: "check_availability",
                description: "Get the availability of the doctor.",
                filler: "Well... Let me check if the doctor is available at that time.\n",
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "hour": {
                            "type": "integer",
                            "description": "The hour of the appointment.",
                        },
                        "patient_name": {
                            "type": "string",
                            "description": "The name of the patient.",
                        },
                        "reason_for_consultation": {
                            "type": "string",
                            "description": "The reason for the consultation.",
                        },
                    },
                    "required": ["hour", "patient_name", "reason_for_consultation"],
                }),
            },
            ToolSpec {
                kind: ToolKind::BookSlot,
                name: "book_slot",
                description: "Book a slot with the doctor when a slot has been found.",
                filler: "I will book the slot for you.\n",
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "hour": {
                            "type": "integer",
                            "description": "The hour of the appointment.",
                        },
                        "conversation_summary": {
                            "type": "string",
                            "description": "The summary of the conversation.",
                        },
                        "patient_name": {
                            "type": "string",
                            "description": "The name of the patient.",
                        },
                        "reason_for_consultation": {
                            "type": "string",
                            "description": "The reason for the consultation.",
                        },
                    },
                    "required": [
                        "hour",
                        "conversation_summary",
                        "patient_name",
                        "reason_for_consultation",
                    ],
                }),
            },
        ];
        Self { specs }
    }

    pub fn lookup(&self, name: &str) -> Option<&ToolSpec> {
        self.specs.iter().find(|spec| spec.name == name)
    }

    /// Filler phrase for a tool, looked up by its actual name. Unknown names
    /// fall back to the empty string so streaming can continue.
    pub fn filler(&self, name: &str) -> &str {
        self.lookup(name).map(|spec| spec.filler).unwrap_or("")
    }

    /// The schema list handed to the model on every call.
    pub fn chat_tools(&self) -> Result<Vec<ChatCompletionTool>> {
        self.specs
            .iter()
            .map(|spec| {
                Ok(ChatCompletionToolArgs::default()
                    .function(
                        FunctionObjectArgs::default()
                            .name(spec.name)
                            .description(spec.description)
                            .parameters(spec.parameters.clone())
                            .build()?,
                    )
                    .build()?)
            })
            .collect()
    }
}
