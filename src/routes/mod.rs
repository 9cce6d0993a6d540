pub mod api_routes;
pub mod ws_routes;

use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::service::chat_service::ChatService;
use api_routes::{
    answer_handler, clear_history_handler, create_session_handler, delete_session_handler,
    get_session_handler, submit_message_handler,
};
use ws_routes::ws_answer_handler;

pub fn build_router(chat_service: ChatService) -> Router {
    Router::new()
        .route("/api/answer", post(answer_handler))
        .route("/api/sessions", post(create_session_handler))
        .route("/api/sessions/{id}", get(get_session_handler).delete(delete_session_handler))
        .route("/api/sessions/{id}/messages", post(submit_message_handler))
        .route("/api/sessions/{id}/history", delete(clear_history_handler))
        .route("/ws/answer", get(ws_answer_handler))
        // The widget is embedded on third-party pages.
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(chat_service)
}
