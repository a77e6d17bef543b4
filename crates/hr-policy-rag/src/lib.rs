//! hr-policy-rag: guardrailed chatbot over an HR policy document
//!
//! Questions are answered only from passages retrieved out of a pre-built
//! embedding index. Retrieval uses similarity or MMR search, optionally
//! widened by LLM-generated query variants, and every answering call goes
//! through a fixed guardrail prompt so the model declines when the policy
//! text does not cover the question.

pub mod config;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod pipeline;
pub mod providers;
pub mod retrieval;
pub mod server;
pub mod types;

pub use config::RagConfig;
pub use error::{Error, Result};
pub use generation::AnsweringOrchestrator;
pub use pipeline::PipelineBuilder;
pub use types::{
    Answer, AnswerTier, ChatRequest, ChatResponse, ConversationHistory, ConversationTurn, Passage,
    Reply, ReplyStatus, RetrievalResult,
};
