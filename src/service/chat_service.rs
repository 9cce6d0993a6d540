use serde::Serialize;
use tracing::info;

use crate::agent::ConversationHistory;
use crate::errors::AppError;
use crate::models::{AnswerRequest, AnswerResult};
use crate::service::answer_flow::AnswerFlow;
use crate::service::chat_session::{SessionConfig, SessionView};
use crate::service::session_store::SessionStore;

#[derive(Debug, Serialize)]
pub struct SubmitOutcome {
    pub accepted: bool,
    pub session: SessionView,
}

/// Application service shared by all routes.
#[derive(Clone)]
pub struct ChatService {
    flow: AnswerFlow,
    sessions: SessionStore,
}

impl ChatService {
    pub fn new(flow: AnswerFlow, sessions: SessionStore) -> Self {
        Self { flow, sessions }
    }

    pub fn flow(&self) -> &AnswerFlow {
        &self.flow
    }

    /// Stateless entry point: every call starts from an empty history.
    pub async fn answer(&self, request: AnswerRequest) -> AnswerResult {
        let mut history = ConversationHistory::new();
        self.flow.answer_question(request, &mut history).await
    }

    pub fn create_session(&self, config: SessionConfig) -> SessionView {
        let session = self.sessions.create(config);
        let mut session = session.lock();
        info!("Created chat session {} ({} active)", session.id, self.sessions.len());
        session.view()
    }

    pub fn get_session(&self, id: &str) -> Result<SessionView, AppError> {
        let session = self.sessions.find(id)?;
        let view = session.lock().view();
        Ok(view)
    }

    /// Drops the session. An answer still in flight finishes against the detached session.
    pub fn delete_session(&self, id: &str) -> Result<(), AppError> {
        self.sessions.remove(id)?;
        info!("Deleted chat session {id} ({} active)", self.sessions.len());
        Ok(())
    }

    pub fn clear_history(&self, id: &str) -> Result<(), AppError> {
        self.sessions.find(id)?.lock().clear_history();
        Ok(())
    }

    /// Submits `message` to the session. The session lock is released while the
    /// answer is produced, so a concurrent submit sees the loading flag and is ignored.
    pub async fn submit_message(&self, id: &str, message: String) -> Result<SubmitOutcome, AppError> {
        let session = self.sessions.find(id)?;

        let submission = {
            let mut guard = session.lock();
            guard.set_input(message);
            guard.begin_submit()
        };

        let Some(submission) = submission else {
            let view = session.lock().view();
            return Ok(SubmitOutcome { accepted: false, session: view });
        };

        let completion = submission.run(&self.flow).await;

        let mut guard = session.lock();
        guard.finish_submit(completion);
        Ok(SubmitOutcome { accepted: true, session: guard.view() })
    }
}
