//! Executes tool calls on behalf of the streaming loop.
//!
//! This boundary fails closed: whatever goes wrong inside a tool, the caller
//! gets a short result string and streaming continues. The error sentinel is
//! inserted into the conversation as the tool result, letting the model
//! recover conversationally.

use crate::callbacks::{CallbackBridge, CallbackError};
use crate::knowledge::KnowledgeBase;
use crate::prompts;
use crate::tools::{ToolKind, ToolRegistry};
use anyhow::Result;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Fixed sentinel returned for any failed tool invocation.
pub const TOOL_ERROR: &str = "An error occurred";

/// Result of an availability check that found (or assumed) a free slot. The
/// bracketed coaching nudges the model toward confirming and booking.
pub const ASSUME_AVAILABLE: &str =
    "available [you should ask for confirmation and book the slot]";

/// Result of an availability check that found the slot taken.
pub const SLOT_BUSY: &str = "busy";

/// Result of a successful booking.
pub const BOOKED: &str = "booked";

/// Endpoints and slot formatting for the live scheduling integration. When
/// absent the scheduling tools run in offline mode with canned results.
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    /// Public base URL of this server, used to build callback URLs.
    pub host_name: String,
    pub availability_url: String,
    pub booking_url: String,
    pub email_url: Option<String>,
    /// Calendar date the half-hour slots are booked against, `YYYY-MM-DD`.
    pub schedule_date: String,
    /// Offset applied to the requested local hour to get UTC.
    pub utc_offset_hours: i64,
}

impl WebhookConfig {
    /// ISO-8601 start/end of the half-hour slot at the given local hour.
    fn slot_window(&self, hour: i64) -> (String, String) {
        let utc_hour = (hour - self.utc_offset_hours).rem_euclid(24);
        (
            format!("{}T{:02}:00:00.000Z", self.schedule_date, utc_hour),
            format!("{}T{:02}:30:00.000Z", self.schedule_date, utc_hour),
        )
    }
}

#[derive(Debug, Deserialize)]
struct InformationArgs {
    query: String,
}

#[derive(Debug, Deserialize)]
struct AvailabilityArgs {
    hour: i64,
}

#[derive(Debug, Deserialize)]
struct BookingArgs {
    hour: i64,
    conversation_summary: String,
    patient_name: String,
}

/// Invokes named tools and translates their outcomes into result strings.
pub struct ToolExecutor {
    registry: Arc<ToolRegistry>,
    knowledge: Arc<dyn KnowledgeBase>,
    callbacks: Arc<CallbackBridge>,
    http: reqwest::Client,
    webhooks: Option<WebhookConfig>,
    top_k: usize,
}

impl ToolExecutor {
    pub fn new(
        registry: Arc<ToolRegistry>,
        knowledge: Arc<dyn KnowledgeBase>,
        callbacks: Arc<CallbackBridge>,
        http: reqwest::Client,
        webhooks: Option<WebhookConfig>,
        top_k: usize,
    ) -> Self {
        Self {
            registry,
            knowledge,
            callbacks,
            http,
            webhooks,
            top_k,
        }
    }

    /// Runs the named tool with the model-supplied raw JSON arguments.
    ///
    /// Never propagates an error: unknown tools, malformed arguments and
    /// failed webhooks all degrade to [`TOOL_ERROR`].
    pub async fn invoke(&self, name: &str, raw_arguments: &str) -> String {
        let Some(spec) = self.registry.lookup(name) else {
            warn!(tool = %name, "Model requested an unknown tool");
            return TOOL_ERROR.to_string();
        };

        let outcome = match spec.kind {
            ToolKind::GetInformation => self.get_information(raw_arguments).await,
            ToolKind::CheckAvailability => self.check_availability(raw_arguments).await,
            ToolKind::BookSlot => self.book_slot(raw_arguments).await,
        };

        match outcome {
            Ok(result) => result,
            Err(e) => {
                warn!(tool = %name, error = ?e, "Tool invocation failed");
                TOOL_ERROR.to_string()
            }
        }
    }

    async fn get_information(&self, raw_arguments: &str) -> Result<String> {
        let args: InformationArgs = serde_json::from_str(raw_arguments)?;
        info!(query = %args.query, "Looking up clinic information");
        let snippets = self.knowledge.search(&args.query, self.top_k).await?;
        Ok(prompts::document_block(&snippets))
    }

    async fn check_availability(&self, raw_arguments: &str) -> Result<String> {
        let args: AvailabilityArgs = serde_json::from_str(raw_arguments)?;
        info!(hour = args.hour, "Checking doctor availability");

        let Some(webhooks) = &self.webhooks else {
            return Ok(ASSUME_AVAILABLE.to_string());
        };

        let (start_at, end_at) = webhooks.slot_window(args.hour);
        let callback_id = Uuid::new_v4().to_string();
        self.callbacks.register(&callback_id).await;
        let callback_url = format!("{}/callbacks/{}", webhooks.host_name, callback_id);

        let response = self
            .http
            .post(&webhooks.availability_url)
            .form(&[
                ("start_at", start_at.as_str()),
                ("end_at", end_at.as_str()),
                ("callback_url", callback_url.as_str()),
            ])
            .send()
            .await?;
        if !response.status().is_success() {
            anyhow::bail!("availability webhook returned {}", response.status());
        }

        Ok(availability_outcome(
            self.callbacks.await_result(&callback_id).await,
        ))
    }

    async fn book_slot(&self, raw_arguments: &str) -> Result<String> {
        let args: BookingArgs = serde_json::from_str(raw_arguments)?;
        info!(hour = args.hour, patient = %args.patient_name, "Booking a slot");

        let Some(webhooks) = &self.webhooks else {
            return Ok(BOOKED.to_string());
        };

        let (start_at, end_at) = webhooks.slot_window(args.hour);
        let subject = format!("Appointment booked for {}", args.patient_name);

        let response = self
            .http
            .post(&webhooks.booking_url)
            .form(&[
                ("start_at", start_at.as_str()),
                ("end_at", end_at.as_str()),
                ("title", subject.as_str()),
                ("description", args.conversation_summary.as_str()),
            ])
            .send()
            .await?;
        if !response.status().is_success() {
            anyhow::bail!("booking webhook returned {}", response.status());
        }

        self.send_confirmation_email(webhooks, &subject, &args.conversation_summary)
            .await;

        Ok(BOOKED.to_string())
    }

    /// Best-effort confirmation mail after a booking; failure is logged and
    /// never surfaced to the conversation.
    async fn send_confirmation_email(
        &self,
        webhooks: &WebhookConfig,
        subject: &str,
        content: &str,
    ) {
        let Some(email_url) = &webhooks.email_url else {
            return;
        };
        let result = self
            .http
            .post(email_url)
            .form(&[("subject", subject), ("content", content)])
            .send()
            .await;
        match result {
            Ok(response) if response.status().is_success() => {}
            Ok(response) => {
                warn!(status = %response.status(), "Confirmation email webhook rejected the request");
            }
            Err(e) => {
                warn!(error = ?e, "Confirmation email webhook unreachable");
            }
        }
    }
}

/// Maps the availability callback outcome to a tool result. The check is
/// read-only, so a timeout fails open to "assume available" rather than
/// surfacing an error.
fn availability_outcome(poll: Result<Value, CallbackError>) -> String {
    match poll {
        Ok(value) if value.get("event").is_some() => SLOT_BUSY.to_string(),
        Ok(_) => ASSUME_AVAILABLE.to_string(),
        Err(CallbackError::Timeout(id)) => {
            warn!(callback_id = %id, "Availability callback timed out; assuming the slot is free");
            ASSUME_AVAILABLE.to_string()
        }
    }
}
