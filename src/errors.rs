use thiserror::Error;

/// A single violated field from request validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub field: &'static str,
    pub message: &'static str,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn join_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Top-level application error.
/// All variants carry a human-readable message for display/logging.
#[derive(Debug, Error)]
pub enum AppError {
    // ── Validation errors ────────────────────────────────────────────────────
    #[error("Invalid input. {}", join_issues(.issues))]
    InvalidInput { issues: Vec<ValidationIssue> },

    #[error("Invalid or missing webpage URL for context.")]
    InvalidPageUrl,

    // ── Answer errors ────────────────────────────────────────────────────────
    #[error("AI returned an empty or invalid response.")]
    EmptyAnswer,

    // ── Session errors ───────────────────────────────────────────────────────
    #[error("Chat session '{id}' not found")]
    SessionNotFound { id: String },

    // ── System errors ────────────────────────────────────────────────────────
    #[error("Missing required configuration: {name}")]
    MissingConfig { name: &'static str },
}

impl AppError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::SessionNotFound { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, AppError::InvalidInput { .. } | AppError::InvalidPageUrl)
    }
}

/// Failures of the LLM client, from the request guard down to the wire.
#[derive(Debug, Error)]
pub enum LlmError {
    // ── Guard rejections (never sent upstream) ───────────────────────────────
    #[error("prompt is empty")]
    EmptyPrompt,

    #[error("context is empty")]
    MissingContext,

    #[error("prompt contains bypass keyword '{keyword}'")]
    BypassAttempt { keyword: &'static str },

    // ── Upstream failures ────────────────────────────────────────────────────
    #[error("Gemini client error: {0}")]
    Provider(String),

    #[error("Stream interrupted: {0}")]
    StreamInterrupted(String),
}

impl LlmError {
    /// The text shown to users in place of an answer when this error occurs.
    pub fn in_band_message(&self) -> &'static str {
        match self {
            LlmError::EmptyPrompt => "Error: Invalid or empty prompt.",
            LlmError::MissingContext => {
                "Error: No context provided (PDF or website content required)."
            }
            LlmError::BypassAttempt { .. } => {
                "Error: Prompt attempts to bypass context. Only questions related to the provided PDF or website are allowed."
            }
            _ => "Error: Failed to stream content from Gemini.",
        }
    }
}
