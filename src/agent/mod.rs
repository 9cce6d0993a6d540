pub mod gemini;
pub mod history;

use std::sync::Arc;

use futures_util::stream::{self, BoxStream, StreamExt};
use tracing::{debug, error, warn};

use crate::errors::LlmError;

pub use gemini::GeminiModel;
pub use history::ConversationHistory;

/// Terms that mark a prompt as an attempt to escape the supplied context.
/// Matched as case-insensitive substrings; a heuristic, not a security boundary.
pub const BYPASS_KEYWORDS: [&str; 5] = ["forget", "ignore", "outside", "bypass", "no context"];

/// Text fragments produced by a model, ending early with an error on failure.
pub type ChunkStream = BoxStream<'static, Result<String, LlmError>>;

/// A hosted generative-text backend that streams its answer.
pub trait GenerativeModel: Send + Sync {
    fn stream_generate(&self, prompt: String) -> ChunkStream;
}

/// Rejects blank input and prompts that try to talk the model out of its context.
pub fn check_request(prompt: &str, context: &str) -> Result<(), LlmError> {
    if prompt.trim().is_empty() {
        return Err(LlmError::EmptyPrompt);
    }
    if context.trim().is_empty() {
        return Err(LlmError::MissingContext);
    }
    let lowered = prompt.to_lowercase();
    match BYPASS_KEYWORDS.iter().find(|k| lowered.contains(*k)) {
        Some(keyword) => Err(LlmError::BypassAttempt { keyword: *keyword }),
        None => Ok(()),
    }
}

/// The full instruction sent upstream: context, prior turns, then the question.
pub fn build_instruction(prompt: &str, context: &str, history: &ConversationHistory) -> String {
    format!(
        "You are a chatbot restricted to answering questions based solely on the following context from a PDF or website. \
         Do not use external knowledge or answer questions unrelated to the context. \
         If the question is irrelevant, respond with: \"This question is outside the provided context.\" \
         Consider the conversation history to maintain coherence.\n\n\
         Context: {context}\n\n\
         Conversation History:\n\
         {history}\n\n\
         User Question: {prompt}\n\n\
         Answer based only on the provided context and history.",
        history = history.render(),
    )
}

enum Reply<'h> {
    Pending {
        model: Arc<dyn GenerativeModel>,
        instruction: String,
        prompt: String,
        history: &'h mut ConversationHistory,
    },
    Streaming {
        chunks: ChunkStream,
        prompt: String,
        response: String,
        history: &'h mut ConversationHistory,
    },
    Closed,
}

/// Context-restricted question answering on top of a [`GenerativeModel`].
#[derive(Clone)]
pub struct LlmClient {
    model: Arc<dyn GenerativeModel>,
}

impl LlmClient {
    pub fn new(model: Arc<dyn GenerativeModel>) -> Self {
        Self { model }
    }

    /// Tagged stream of the answer. A guard rejection is the only item when the
    /// request is refused; an upstream failure is the last item. The turn is
    /// recorded in `history` only when the stream ends cleanly.
    pub fn events<'h>(
        &self,
        prompt: &str,
        context: &str,
        history: &'h mut ConversationHistory,
    ) -> BoxStream<'h, Result<String, LlmError>> {
        if let Err(e) = check_request(prompt, context) {
            warn!("Rejected prompt: {e}");
            return stream::once(async move { Err(e) }).boxed();
        }

        let state = Reply::Pending {
            model: Arc::clone(&self.model),
            instruction: build_instruction(prompt, context, history),
            prompt: prompt.to_string(),
            history,
        };

        stream::unfold(state, |state| async move {
            let (mut chunks, prompt, mut response, history) = match state {
                Reply::Pending { model, instruction, prompt, history } => {
                    debug!("Opening model stream ({} history turns)", history.len());
                    (model.stream_generate(instruction), prompt, String::new(), history)
                }
                Reply::Streaming { chunks, prompt, response, history } => {
                    (chunks, prompt, response, history)
                }
                Reply::Closed => return None,
            };

            loop {
                match chunks.next().await {
                    Some(Ok(part)) if part.is_empty() => continue,
                    Some(Ok(part)) => {
                        response.push_str(&part);
                        let next = Reply::Streaming { chunks, prompt, response, history };
                        return Some((Ok(part), next));
                    }
                    Some(Err(e)) => {
                        error!("Model stream failed: {e}");
                        return Some((Err(e), Reply::Closed));
                    }
                    None => {
                        history.record(prompt, response);
                        return None;
                    }
                }
            }
        })
        .boxed()
    }

    /// The answer as plain text fragments; failures arrive as one in-band error chunk.
    pub fn stream<'h>(
        &self,
        prompt: &str,
        context: &str,
        history: &'h mut ConversationHistory,
    ) -> BoxStream<'h, String> {
        self.events(prompt, context, history)
            .map(|item| item.unwrap_or_else(|e| e.in_band_message().to_string()))
            .boxed()
    }

    /// Concatenation of every chunk from [`LlmClient::stream`].
    pub async fn generate(
        &self,
        prompt: &str,
        context: &str,
        history: &mut ConversationHistory,
    ) -> String {
        self.stream(prompt, context, history).collect::<String>().await
    }
}
