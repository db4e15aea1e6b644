//! Test-only helpers shared across this crate's unit tests.

use crate::{config::Config, state::AppState};
use async_trait::async_trait;
use frontdesk_core::{
    callbacks::CallbackBridge,
    knowledge::SnippetIndex,
    executor::ToolExecutor,
    llm_client::{LlmClient, LlmStream, LlmStreamEvent},
    streamer::ResponseStreamer,
    tools::ToolRegistry,
};
use futures::StreamExt;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Plays back pre-scripted streams, one per `stream_chat` call, delaying
/// each event by a fixed amount of (possibly simulated) time.
pub struct ScriptedLlm {
    delay: Duration,
    scripts: Mutex<VecDeque<Vec<anyhow::Result<LlmStreamEvent>>>>,
}

impl ScriptedLlm {
    pub fn new(delay: Duration, scripts: Vec<Vec<anyhow::Result<LlmStreamEvent>>>) -> Self {
        Self {
            delay,
            scripts: Mutex::new(scripts.into()),
        }
    }

    /// A client whose streams end immediately without producing anything.
    pub fn silent() -> Self {
        Self::new(Duration::ZERO, Vec::new())
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn stream_chat(
        &self,
        _messages: Vec<async_openai::types::ChatCompletionRequestMessage>,
        _tools: Vec<async_openai::types::ChatCompletionTool>,
    ) -> anyhow::Result<LlmStream> {
        let events = self.scripts.lock().unwrap().pop_front().unwrap_or_default();
        let delay = self.delay;
        Ok(Box::pin(futures::stream::iter(events).then(
            move |event| async move {
                tokio::time::sleep(delay).await;
                event
            },
        )))
    }
}

pub fn test_config() -> Config {
    Config {
        bind_address: "127.0.0.1:0".parse().unwrap(),
        llm_api_key: "test-key".to_string(),
        llm_api_base: "https://api.mistral.ai/v1".to_string(),
        chat_model: "mistral-large-latest".to_string(),
        log_level: tracing::Level::INFO,
        knowledge_path: PathBuf::from("./knowledge.md"),
        top_k: 2,
        callback_max_wait: Duration::from_millis(300),
        callback_poll_interval: Duration::from_millis(50),
        host_name: None,
        availability_webhook: None,
        booking_webhook: None,
        email_webhook: None,
        schedule_date: "2024-04-27".to_string(),
        utc_offset_hours: 2,
        voice_api_key: None,
        voice_register_url: None,
    }
}

pub fn test_streamer(llm: Arc<dyn LlmClient>) -> Arc<ResponseStreamer> {
    let config = test_config();
    let registry = Arc::new(ToolRegistry::standard());
    let callbacks = Arc::new(CallbackBridge::new(
        config.callback_max_wait,
        config.callback_poll_interval,
    ));
    let executor = Arc::new(ToolExecutor::new(
        registry.clone(),
        Arc::new(SnippetIndex::from_text("")),
        callbacks,
        reqwest::Client::new(),
        None,
        config.top_k,
    ));
    Arc::new(ResponseStreamer::new(llm, executor, registry))
}

pub fn test_state() -> Arc<AppState> {
    let config = test_config();
    Arc::new(AppState {
        streamer: test_streamer(Arc::new(ScriptedLlm::silent())),
        callbacks: Arc::new(CallbackBridge::new(
            config.callback_max_wait,
            config.callback_poll_interval,
        )),
        http: reqwest::Client::new(),
        config: Arc::new(config),
    })
}
