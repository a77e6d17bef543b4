//! Chat endpoint

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};

use crate::generation::orchestrator::EMPTY_INPUT_MESSAGE;
use crate::server::state::AppState;
use crate::types::{ChatRequest, ChatResponse, ReplyStatus};

/// Reply when the chain was never built
pub const NOT_INITIALIZED_MESSAGE: &str = "Chatbot failed to initialize.";

/// POST /chat - answer one message, optionally continuing a conversation
///
/// When the request carries `history`, the updated history is echoed back;
/// otherwise the question is answered on its own. A body that is not a chat
/// request gets the same 400 reply as a blank message.
pub async fn chat(
    State(state): State<AppState>,
    request: Result<Json<ChatRequest>, JsonRejection>,
) -> (StatusCode, Json<ChatResponse>) {
    let Json(request) = match request {
        Ok(request) => request,
        Err(rejection) => {
            tracing::warn!("Rejected chat request body: {}", rejection.body_text());
            return (
                StatusCode::BAD_REQUEST,
                Json(ChatResponse::new(EMPTY_INPUT_MESSAGE)),
            );
        }
    };

    let Some(orchestrator) = state.orchestrator() else {
        tracing::error!("Chat request received before the RAG chain was initialized");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ChatResponse::new(NOT_INITIALIZED_MESSAGE)),
        );
    };

    tracing::info!("Chat: \"{}\"", request.message);

    let (reply, history) = match request.history {
        Some(history) => {
            let (reply, history) = orchestrator
                .reply_with_history(&request.message, history)
                .await;
            (reply, Some(history))
        }
        None => (orchestrator.reply(&request.message).await, None),
    };

    let status = status_code(reply.status);
    let mut response = ChatResponse::new(reply.answer);
    response.history = history;
    (status, Json(response))
}

fn status_code(status: ReplyStatus) -> StatusCode {
    match status {
        ReplyStatus::Answered | ReplyStatus::Degraded => StatusCode::OK,
        ReplyStatus::Rejected => StatusCode::BAD_REQUEST,
        ReplyStatus::Failed => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
