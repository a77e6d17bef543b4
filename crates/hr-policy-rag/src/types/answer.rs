//! Answer types returned by the orchestrator

use serde::{Deserialize, Serialize};

use super::conversation::ConversationHistory;

/// How much of the question the policy document covered.
///
/// Derived from the fixed sentences the guardrail prompt asks the model to
/// use; the answer text itself stays the primary contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerTier {
    Full,
    Partial,
    NotFound,
}

impl AnswerTier {
    /// Classify an answer by the disclaimer sentences it contains
    pub fn classify(answer: &str, not_found: &str, partial: &str) -> Self {
        let normalized = answer.trim().trim_matches('"');
        if normalized == not_found {
            Self::NotFound
        } else if answer.contains(partial) {
            Self::Partial
        } else if answer.contains(not_found) {
            // model padded the refusal with extra words
            Self::NotFound
        } else {
            Self::Full
        }
    }
}

/// Single-turn answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub answer: String,
    pub tier: AnswerTier,
}

/// Multi-turn answer with the extended history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationalAnswer {
    pub answer: Answer,
    pub history: ConversationHistory,
}

/// Outcome class of a user-facing reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyStatus {
    /// Model answered
    Answered,
    /// Blank question, nothing was retrieved or generated
    Rejected,
    /// Backend unreachable; the apology is a normal reply
    Degraded,
    /// Anything else went wrong
    Failed,
}

impl ReplyStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Answered | Self::Degraded)
    }
}

/// Text shown to the user plus its status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    pub answer: String,
    pub status: ReplyStatus,
}
