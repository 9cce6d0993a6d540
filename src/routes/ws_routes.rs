use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures_util::StreamExt;
use tracing::{info, warn};

use crate::agent::ConversationHistory;
use crate::models::{AnswerRequest, WsEvent};
use crate::service::chat_service::ChatService;

/// GET `/ws/answer` — upgrades to a WebSocket for streamed answers.
pub async fn ws_answer_handler(
    ws: WebSocketUpgrade,
    State(svc): State<ChatService>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, svc))
}

/// Handles a single WebSocket connection. The connection owns one conversation
/// history, so follow-up questions on the same socket see earlier turns.
///
/// Protocol:
/// - Client sends JSON `{ "url": "...", "question": "..." }`
/// - Server streams back:
///   1. `{ "type": "stream_start", "url": "..." }`
///   2. `{ "type": "stream_chunk", "content": "..." }` (repeated)
///   3. `{ "type": "stream_end",   "full_content": "..." }`
///   or `{ "type": "error", "message": "..." }` for an unreadable frame.
async fn handle_socket(mut socket: WebSocket, svc: ChatService) {
    info!("WebSocket client connected");
    let mut history = ConversationHistory::new();

    while let Some(msg) = socket.recv().await {
        let msg = match msg {
            Ok(m) => m,
            Err(e) => {
                warn!("WebSocket receive error: {e}");
                break;
            }
        };

        let text = match &msg {
            Message::Text(t) => t.to_string(),
            Message::Close(_) => break,
            _ => continue,
        };

        let req: AnswerRequest = match serde_json::from_str(&text) {
            Ok(r) => r,
            Err(e) => {
                let event = WsEvent::Error { message: format!("Invalid request: {e}") };
                if send_event(&mut socket, &event).await {
                    continue;
                }
                break;
            }
        };

        if !send_event(&mut socket, &WsEvent::StreamStart { url: req.url.clone() }).await {
            break;
        }

        let mut chunks = svc.flow().stream_answer(req, &mut history).await;

        let mut full_content = String::new();
        let mut delivered = true;
        while let Some(chunk) = chunks.next().await {
            full_content.push_str(&chunk);
            if !send_event(&mut socket, &WsEvent::StreamChunk { content: chunk }).await {
                delivered = false;
                break;
            }
        }
        // Dropping an unfinished stream leaves the turn out of the history.
        drop(chunks);

        if !delivered || !send_event(&mut socket, &WsEvent::StreamEnd { full_content }).await {
            warn!("WebSocket client went away mid-answer");
            break;
        }
    }

    info!("WebSocket client disconnected");
}

/// Helper: serialize a `WsEvent` and send it over the socket. Returns `false`
/// once the client can no longer be reached.
async fn send_event(socket: &mut WebSocket, event: &WsEvent) -> bool {
    let json = match serde_json::to_string(event) {
        Ok(json) => json,
        Err(e) => {
            warn!("Failed to encode WebSocket event: {e}");
            return true;
        }
    };
    socket.send(Message::Text(json.into())).await.is_ok()
}
