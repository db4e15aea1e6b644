use anyhow::Result;
use async_openai::{
    Client,
    config::OpenAIConfig,
    types::{ChatCompletionRequestMessage, ChatCompletionTool, CreateChatCompletionRequestArgs},
};
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use std::pin::Pin;

/// One event from a streaming chat completion.
///
/// Tool calls arrive fragmented across chunks; each fragment carries the
/// stream-assigned `index` of the call it belongs to, and whichever of
/// `id`/`name`/`arguments` this fragment extends.
#[derive(Debug, Clone)]
pub enum LlmStreamEvent {
    TextDelta(String),
    ToolCallDelta {
        index: usize,
        id: Option<String>,
        name: Option<String>,
        arguments: Option<String>,
    },
}

/// A stream of events from the LLM.
pub type LlmStream = Pin<Box<dyn Stream<Item = Result<LlmStreamEvent>> + Send>>;

/// A generic client for interacting with an LLM.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Opens a streaming chat completion with the full tool schema attached
    /// and automatic tool selection enabled.
    async fn stream_chat(
        &self,
        messages: Vec<ChatCompletionRequestMessage>,
        tools: Vec<ChatCompletionTool>,
    ) -> Result<LlmStream>;
}

/// An implementation of `LlmClient` for any OpenAI-compatible API.
pub struct OpenAICompatibleClient {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAICompatibleClient {
    /// Creates a new client for an OpenAI-compatible service.
    ///
    /// # Arguments
    ///
    /// * `config` - The configuration for the client, including API key and base URL.
    /// * `model` - The model identifier to use for chat completions.
    pub fn new(config: OpenAIConfig, model: String) -> Self {
        Self {
            client: Client::with_config(config),
            model,
            temperature: 0.2,
            max_tokens: 500,
        }
    }
}

#[async_trait]
impl LlmClient for OpenAICompatibleClient {
    async fn stream_chat(
        &self,
        messages: Vec<ChatCompletionRequestMessage>,
        tools: Vec<ChatCompletionTool>,
    ) -> Result<LlmStream> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .tools(tools)
            .tool_choice("auto")
            .temperature(self.temperature)
            .max_completion_tokens(self.max_tokens)
            .stream(true)
            .build()?;

        let stream = self.client.chat().create_stream(request).await?;

        Ok(Box::pin(stream.flat_map(|result| {
            let events: Vec<Result<LlmStreamEvent>> = match result {
                Ok(response) => {
                    let mut events = Vec::new();
                    if let Some(choice) = response.choices.first() {
                        if let Some(tool_calls) = &choice.delta.tool_calls {
                            for fragment in tool_calls {
                                events.push(Ok(LlmStreamEvent::ToolCallDelta {
                                    index: fragment.index as usize,
                                    id: fragment.id.clone(),
                                    name: fragment.function.as_ref().and_then(|f| f.name.clone()),
                                    arguments: fragment
                                        .function
                                        .as_ref()
                                        .and_then(|f| f.arguments.clone()),
                                }));
                            }
                        }
                        if let Some(content) = &choice.delta.content {
                            if !content.is_empty() {
                                events.push(Ok(LlmStreamEvent::TextDelta(content.clone())));
                            }
                        }
                    }
                    events
                }
                Err(e) => vec![Err(e.into())],
            };
            futures::stream::iter(events)
        })))
    }
}
