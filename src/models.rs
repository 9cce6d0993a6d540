use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::errors::{AppError, ValidationIssue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry in a chat session's message list. Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub role: MessageRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }
}

/// Input of the answer flow. Missing JSON fields become empty strings so that
/// they are reported by [`AnswerRequest::validate`] instead of a parse error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnswerRequest {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub question: String,
}

impl AnswerRequest {
    pub fn new(url: impl Into<String>, question: impl Into<String>) -> Self {
        Self { url: url.into(), question: question.into() }
    }

    /// Checks every field and reports all violations at once, url first.
    pub fn validate(&self) -> Result<(), AppError> {
        let mut issues = Vec::new();
        if Url::parse(&self.url).is_err() {
            issues.push(ValidationIssue { field: "url", message: "Invalid url" });
        }
        if self.question.is_empty() {
            issues.push(ValidationIssue {
                field: "question",
                message: "String must contain at least 1 character(s)",
            });
        }
        if issues.is_empty() {
            Ok(())
        } else {
            Err(AppError::InvalidInput { issues })
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerResult {
    pub answer: String,
}

impl AnswerResult {
    pub fn new(answer: impl Into<String>) -> Self {
        Self { answer: answer.into() }
    }
}

/// Event streamed back over the WebSocket.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsEvent {
    StreamStart { url: String },
    StreamChunk { content: String },
    StreamEnd { full_content: String },
    Error { message: String },
}
