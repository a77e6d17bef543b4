//! Core types for the RAG system

pub mod answer;
pub mod chat;
pub mod conversation;
pub mod passage;

pub use answer::{Answer, AnswerTier, ConversationalAnswer, Reply, ReplyStatus};
pub use chat::{ChatRequest, ChatResponse};
pub use conversation::{ConversationHistory, ConversationTurn, Role};
pub use passage::{Passage, RetrievalResult};
