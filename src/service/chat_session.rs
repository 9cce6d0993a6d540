use serde::{Deserialize, Serialize};
use tracing::{error, warn};
use url::Url;

use crate::agent::ConversationHistory;
use crate::errors::AppError;
use crate::models::{AnswerRequest, AnswerResult, ChatMessage};
use crate::service::answer_flow::AnswerFlow;

const EMPTY_ANSWER_REPLY: &str =
    "Sorry, I couldn't generate a response for that. There might have been an issue.";

/// Where a session's questions point.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Explicitly configured page; wins over `page_url` when non-empty.
    #[serde(default)]
    pub url: Option<String>,
    /// Address of the page hosting the widget.
    #[serde(default)]
    pub page_url: Option<String>,
}

impl SessionConfig {
    pub fn resolve_url(&self) -> Option<&str> {
        [self.url.as_deref(), self.page_url.as_deref()]
            .into_iter()
            .flatten()
            .find(|u| !u.is_empty())
    }
}

/// A transient user-visible alert; the widget shows it as a toast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub title: String,
    pub description: String,
}

/// A question that left the session and is waiting for its answer.
/// Carries the session's history while in flight.
pub struct Submission {
    request: Result<AnswerRequest, AppError>,
    history: ConversationHistory,
}

/// What comes back to the session once a [`Submission`] has run.
pub struct Completion {
    history: ConversationHistory,
    outcome: Result<AnswerResult, AppError>,
}

impl Submission {
    pub async fn run(mut self, flow: &AnswerFlow) -> Completion {
        let outcome = match self.request {
            Ok(request) => Ok(flow.answer_question(request, &mut self.history).await),
            Err(e) => Err(e),
        };
        Completion { history: self.history, outcome }
    }
}

/// Client-side chat state: messages, input buffer, loading and error flags.
///
/// `idle → submitting → (success | failure) → idle`; at most one submission
/// is in flight, and the loading flag is cleared on every exit path.
#[derive(Debug)]
pub struct ChatSession {
    pub id: String,
    config: SessionConfig,
    messages: Vec<ChatMessage>,
    input: String,
    is_loading: bool,
    error: Option<String>,
    notifications: Vec<Notification>,
    history: ConversationHistory,
    /// Set when history is cleared while a submission holds it.
    clear_pending: bool,
}

impl ChatSession {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            config,
            messages: Vec::new(),
            input: String::new(),
            is_loading: false,
            error: None,
            notifications: Vec::new(),
            history: ConversationHistory::new(),
            clear_pending: false,
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    pub fn set_input(&mut self, input: impl Into<String>) {
        self.input = input.into();
    }

    /// Forgets earlier turns. A clear issued while an answer is in flight also
    /// discards the history that answer brings back.
    pub fn clear_history(&mut self) {
        self.history.clear();
        if self.is_loading {
            self.clear_pending = true;
        }
    }

    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    /// Starts a submission from the input buffer. Returns `None` (and changes
    /// nothing) when the input is blank or another submission is in flight.
    pub fn begin_submit(&mut self) -> Option<Submission> {
        if self.input.trim().is_empty() || self.is_loading {
            return None;
        }

        let question = std::mem::take(&mut self.input);
        self.messages.push(ChatMessage::user(question.clone()));
        self.is_loading = true;
        self.error = None;

        let request = match self.config.resolve_url() {
            Some(url) if is_http_url(url) => Ok(AnswerRequest::new(url, question)),
            _ => Err(AppError::InvalidPageUrl),
        };

        Some(Submission {
            request,
            history: std::mem::take(&mut self.history),
        })
    }

    pub fn finish_submit(&mut self, completion: Completion) {
        self.history = if std::mem::take(&mut self.clear_pending) {
            ConversationHistory::new()
        } else {
            completion.history
        };

        match completion.outcome {
            Ok(result) if !result.answer.is_empty() => {
                self.messages.push(ChatMessage::assistant(result.answer));
            }
            Ok(_) => {
                warn!("Received empty answer in session {}", self.id);
                self.messages.push(ChatMessage::assistant(EMPTY_ANSWER_REPLY));
                self.error = Some(AppError::EmptyAnswer.to_string());
                self.notify("Response Error", "The AI returned an empty or invalid response.");
            }
            Err(e) => {
                error!("Chat submission failed in session {}: {e}", self.id);
                let message = e.to_string();
                self.notify("Error", format!("Failed to get response: {message}"));
                self.messages
                    .push(ChatMessage::assistant(format!("Sorry, I encountered an error: {message}")));
                self.error = Some(message);
            }
        }

        self.is_loading = false;
    }

    pub fn view(&mut self) -> SessionView {
        SessionView {
            id: self.id.clone(),
            messages: self.messages().to_vec(),
            input: self.input().to_string(),
            is_loading: self.is_loading(),
            error: self.error().map(str::to_string),
            notifications: self.take_notifications(),
            history_turns: self.history().len(),
        }
    }

    fn notify(&mut self, title: &str, description: impl Into<String>) {
        self.notifications.push(Notification {
            title: title.to_string(),
            description: description.into(),
        });
    }
}

fn is_http_url(candidate: &str) -> bool {
    Url::parse(candidate)
        .map(|u| matches!(u.scheme(), "http" | "https"))
        .unwrap_or(false)
}

/// Serialisable snapshot of a session. Reading it drains pending notifications.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub id: String,
    pub messages: Vec<ChatMessage>,
    pub input: String,
    pub is_loading: bool,
    pub error: Option<String>,
    pub notifications: Vec<Notification>,
    pub history_turns: usize,
}
