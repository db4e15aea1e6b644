//! Drives one reply generation: prompt build, token streaming, and tool-call
//! continuation.
//!
//! The model may answer a pass with tool calls instead of text. Each pass
//! accumulates tool-call fragments until the stream ends, then speaks the
//! tool's filler phrase, executes it, folds the result into the message list
//! and opens a fresh stream. The continuation is an explicit loop with a
//! round cap; the model is an unbounded-trust boundary and is not allowed to
//! keep the loop alive forever.

use crate::executor::ToolExecutor;
use crate::llm_client::{LlmClient, LlmStreamEvent};
use crate::prompts;
use crate::tools::ToolRegistry;
use crate::turn::{InteractionType, ResponseChunk, Role, TurnRequest};
use anyhow::Result;
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessageArgs,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestToolMessageArgs, ChatCompletionRequestUserMessageArgs,
    ChatCompletionToolType, FunctionCall,
};
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Upper bound on model re-invocations within one reply.
const MAX_TOOL_ROUNDS: usize = 4;

/// A tool call reassembled from stream fragments.
#[derive(Debug, Clone, Default)]
struct PendingToolCall {
    id: String,
    name: String,
    arguments: String,
}

impl PendingToolCall {
    fn call_id(&self, index: usize) -> String {
        if self.id.is_empty() {
            format!("call_{index}")
        } else {
            self.id.clone()
        }
    }
}

/// Turns one request into a finite sequence of response chunks.
pub struct ResponseStreamer {
    llm: Arc<dyn LlmClient>,
    executor: Arc<ToolExecutor>,
    registry: Arc<ToolRegistry>,
}

impl ResponseStreamer {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        executor: Arc<ToolExecutor>,
        registry: Arc<ToolRegistry>,
    ) -> Self {
        Self {
            llm,
            executor,
            registry,
        }
    }

    /// The canned reply announcing that the server is ready.
    pub fn greeting(&self) -> ResponseChunk {
        ResponseChunk {
            response_id: 0,
            content: prompts::GREETING.to_string(),
            content_complete: true,
            end_call: false,
        }
    }

    /// Streams the reply for `request` into `tx`.
    ///
    /// The sequence always terminates with a `content_complete` chunk unless
    /// the receiver goes away first (the turn was abandoned). Generation
    /// failures degrade to an apology fragment followed by the final chunk;
    /// they never escape this method.
    pub async fn generate(&self, request: TurnRequest, tx: mpsc::Sender<ResponseChunk>) {
        if let Err(e) = self.run(&request, &tx).await {
            warn!(
                response_id = request.response_id,
                error = ?e,
                "Reply generation failed"
            );
            let _ = tx
                .send(ResponseChunk::fragment(
                    request.response_id,
                    prompts::APOLOGY,
                ))
                .await;
            let _ = tx.send(ResponseChunk::finished(request.response_id)).await;
        }
    }

    async fn run(&self, request: &TurnRequest, tx: &mpsc::Sender<ResponseChunk>) -> Result<()> {
        let mut messages = build_prompt(request)?;
        let tools = self.registry.chat_tools()?;

        for round in 0..MAX_TOOL_ROUNDS {
            let mut stream = self.llm.stream_chat(messages.clone(), tools.clone()).await?;
            let mut pending: Vec<PendingToolCall> = Vec::new();
            let mut full_content = String::new();

            while let Some(event) = stream.next().await {
                match event? {
                    LlmStreamEvent::TextDelta(delta) => {
                        full_content.push_str(&delta);
                        let chunk = ResponseChunk::fragment(request.response_id, delta);
                        if tx.send(chunk).await.is_err() {
                            return Ok(());
                        }
                    }
                    LlmStreamEvent::ToolCallDelta {
                        index,
                        id,
                        name,
                        arguments,
                    } => {
                        while pending.len() <= index {
                            pending.push(PendingToolCall::default());
                        }
                        let slot = &mut pending[index];
                        if let Some(id) = id {
                            slot.id = id;
                        }
                        if let Some(name) = name {
                            slot.name.push_str(&name);
                        }
                        if let Some(arguments) = arguments {
                            slot.arguments.push_str(&arguments);
                        }
                    }
                }
            }

            if pending.is_empty() {
                debug!(
                    response_id = request.response_id,
                    round,
                    chars = full_content.len(),
                    "Reply complete"
                );
                let _ = tx.send(ResponseChunk::finished(request.response_id)).await;
                return Ok(());
            }

            messages.push(assistant_tool_call_message(&pending)?);
            for (index, call) in pending.iter().enumerate() {
                let filler = self.registry.filler(&call.name).to_string();
                let chunk = ResponseChunk::fragment(request.response_id, filler);
                if tx.send(chunk).await.is_err() {
                    return Ok(());
                }
                let result = self.executor.invoke(&call.name, &call.arguments).await;
                messages.push(tool_result_message(&call.call_id(index), result)?);
            }
        }

        warn!(
            response_id = request.response_id,
            rounds = MAX_TOOL_ROUNDS,
            "Model kept requesting tools; forcing the reply to end"
        );
        let _ = tx
            .send(ResponseChunk::fragment(
                request.response_id,
                prompts::APOLOGY,
            ))
            .await;
        let _ = tx.send(ResponseChunk::finished(request.response_id)).await;
        Ok(())
    }
}

/// System instruction, role-tagged transcript, and a nudge when the request
/// was triggered by user silence.
fn build_prompt(request: &TurnRequest) -> Result<Vec<ChatCompletionRequestMessage>> {
    let mut messages: Vec<ChatCompletionRequestMessage> = vec![
        ChatCompletionRequestSystemMessageArgs::default()
            .content(prompts::SYSTEM_PROMPT)
            .build()?
            .into(),
    ];
    for utterance in &request.transcript {
        match utterance.role {
            Role::Agent => messages.push(
                ChatCompletionRequestAssistantMessageArgs::default()
                    .content(utterance.content.clone())
                    .build()?
                    .into(),
            ),
            Role::User => messages.push(
                ChatCompletionRequestUserMessageArgs::default()
                    .content(utterance.content.clone())
                    .build()?
                    .into(),
            ),
        }
    }
    if request.interaction_type == InteractionType::ReminderRequired {
        messages.push(
            ChatCompletionRequestUserMessageArgs::default()
                .content(prompts::REMINDER_PROMPT)
                .build()?
                .into(),
        );
    }
    Ok(messages)
}

fn assistant_tool_call_message(
    calls: &[PendingToolCall],
) -> Result<ChatCompletionRequestMessage> {
    let tool_calls: Vec<ChatCompletionMessageToolCall> = calls
        .iter()
        .enumerate()
        .map(|(index, call)| ChatCompletionMessageToolCall {
            id: call.call_id(index),
            r#type: ChatCompletionToolType::Function,
            function: FunctionCall {
                name: call.name.clone(),
                arguments: call.arguments.clone(),
            },
        })
        .collect();
    Ok(ChatCompletionRequestAssistantMessageArgs::default()
        .tool_calls(tool_calls)
        .build()?
        .into())
}

fn tool_result_message(call_id: &str, result: String) -> Result<ChatCompletionRequestMessage> {
    Ok(ChatCompletionRequestToolMessageArgs::default()
        .tool_call_id(call_id)
        .content(result)
        .build()?
        .into())
}
