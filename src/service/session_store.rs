use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::errors::AppError;
use crate::service::chat_session::{ChatSession, SessionConfig};

pub type SharedSession = Arc<Mutex<ChatSession>>;

/// In-memory registry of chat sessions. Nothing survives a restart.
#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, SharedSession>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, config: SessionConfig) -> SharedSession {
        let session = ChatSession::new(config);
        let id = session.id.clone();
        let shared = Arc::new(Mutex::new(session));
        self.sessions.write().insert(id, Arc::clone(&shared));
        shared
    }

    pub fn find(&self, id: &str) -> Result<SharedSession, AppError> {
        self.sessions
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| AppError::SessionNotFound { id: id.to_string() })
    }

    pub fn remove(&self, id: &str) -> Result<SharedSession, AppError> {
        self.sessions
            .write()
            .remove(id)
            .ok_or_else(|| AppError::SessionNotFound { id: id.to_string() })
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }
}
