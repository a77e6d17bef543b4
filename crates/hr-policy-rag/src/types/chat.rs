//! Chat endpoint request/response types

use serde::{Deserialize, Serialize};

use super::conversation::ConversationHistory;

/// Body of `POST /chat`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The user's question
    #[serde(default)]
    pub message: String,
    /// Prior turns kept by the client; switches the endpoint to multi-turn mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history: Option<ConversationHistory>,
}

/// Response of `POST /chat`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Answer text or a fixed apology
    pub answer: String,
    /// Updated history, present only when the request carried one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history: Option<ConversationHistory>,
}

impl ChatResponse {
    pub fn new(answer: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
            history: None,
        }
    }
}
