pub mod answer_flow;
pub mod chat_service;
pub mod chat_session;
pub mod prompt;
pub mod session_store;
