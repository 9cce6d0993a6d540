use futures_util::stream::{self, StreamExt};
use rig::agent::{Agent, MultiTurnStreamItem};
use rig::prelude::CompletionClient;
use rig::providers::gemini;
use rig::streaming::{StreamedAssistantContent, StreamingPrompt};
use serde::Serialize;
use tracing::{debug, error};

use crate::config::AppConfig;
use crate::errors::LlmError;

use super::{ChunkStream, GenerativeModel};

/// Fixed sampling parameters sent with every request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f64,
    pub top_p: f64,
    pub top_k: u32,
    pub max_output_tokens: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_p: 0.95,
            top_k: 40,
            max_output_tokens: 2048,
        }
    }
}

impl GenerationConfig {
    /// Provider-specific request parameters, merged into the Gemini request body.
    fn additional_params(&self) -> serde_json::Value {
        serde_json::json!({ "generationConfig": self })
    }
}

/// Streaming Gemini backend built on the rig Gemini provider.
///
/// The prompt already carries context and history, so every call is a single
/// user turn with no preamble.
#[derive(Clone)]
pub struct GeminiModel {
    agent: Agent<gemini::completion::CompletionModel>,
    model: String,
}

impl GeminiModel {
    pub fn new(config: &AppConfig) -> Result<Self, LlmError> {
        let client = gemini::Client::builder()
            .api_key(config.api_key.as_str())
            .base_url(&config.api_base_url)
            .build()
            .map_err(|e| LlmError::Provider(e.to_string()))?;

        let generation = GenerationConfig::default();
        let agent = client
            .agent(&config.model)
            .temperature(generation.temperature)
            .max_tokens(generation.max_output_tokens)
            .additional_params(generation.additional_params())
            .build();

        Ok(Self { agent, model: config.model.clone() })
    }
}

/// Text carried by one rig stream item; `None` for items that hold no answer text.
fn text_of<R>(item: MultiTurnStreamItem<R>) -> Option<String> {
    match item {
        MultiTurnStreamItem::StreamAssistantItem(StreamedAssistantContent::Text(text)) => {
            Some(text.text)
        }
        _ => None,
    }
}

impl GenerativeModel for GeminiModel {
    fn stream_generate(&self, prompt: String) -> ChunkStream {
        let agent = self.agent.clone();
        debug!("Streaming {} prompt characters to {}", prompt.len(), self.model);

        stream::once(async move { agent.stream_prompt(prompt).await })
            .flatten()
            .filter_map(|item| async move {
                match item {
                    Ok(item) => text_of(item).map(Ok),
                    Err(e) => {
                        error!("Gemini streaming error: {e}");
                        Some(Err(LlmError::StreamInterrupted(e.to_string())))
                    }
                }
            })
            .boxed()
    }
}
