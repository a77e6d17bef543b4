//! Guardrail prompt assembly

use std::sync::OnceLock;

use crate::config::PromptConfig;
use crate::types::{ConversationHistory, Passage};

/// Appended after a partial answer
pub const PARTIAL_ANSWER_DISCLAIMER: &str =
    "I am sorry, the full details are not available in the provided HR policy document.";

/// The whole answer when the context holds nothing relevant
pub const NOT_FOUND_ANSWER: &str = "I am sorry, that information is not in the HR policy document.";

/// Rule block at the top of every prompt, quoting the two fixed sentences
fn guardrail_rules() -> &'static str {
    static RULES: OnceLock<String> = OnceLock::new();
    RULES.get_or_init(|| {
        format!(
            "You are a secure HR Policy Bot. You must answer ONLY using the HR policy context provided.

Rules:
- If the answer is completely provided in the context → give a direct answer.
- If partial info exists → state what's available + say:
  \"{partial}\"
- If NOTHING in context is relevant → say:
  \"{not_found}\"
- DO NOT use external knowledge.
- DO NOT guess or assume anything.",
            partial = PARTIAL_ANSWER_DISCLAIMER,
            not_found = NOT_FOUND_ANSWER,
        )
    })
}

/// Builds the single prompt sent to the model
#[derive(Debug, Clone)]
pub struct GuardrailPrompt {
    max_context_chars: usize,
    max_history_turns: usize,
}

impl Default for GuardrailPrompt {
    fn default() -> Self {
        Self::new(&PromptConfig::default())
    }
}

impl GuardrailPrompt {
    pub fn new(config: &PromptConfig) -> Self {
        Self {
            max_context_chars: config.max_context_chars,
            max_history_turns: config.max_history_turns,
        }
    }

    /// Prompt for a single question
    pub fn assemble(&self, passages: &[Passage], question: &str) -> String {
        format!(
            "{rules}\n\nContext:\n{context}\n\nQuestion:\n{question}\n\nAnswer:\n",
            rules = guardrail_rules(),
            context = self.build_context(passages),
            question = question
        )
    }

    /// Prompt for a follow-up question, with earlier turns in front of it
    pub fn assemble_with_history(
        &self,
        passages: &[Passage],
        question: &str,
        history: &ConversationHistory,
    ) -> String {
        if history.is_empty() {
            return self.assemble(passages, question);
        }

        format!(
            "{rules}\n- Use the conversation so far only to understand what the question refers to; facts must still come from the context.\n\nContext:\n{context}\n\nConversation so far:\n{history}\n\nQuestion:\n{question}\n\nAnswer:\n",
            rules = guardrail_rules(),
            context = self.build_context(passages),
            history = history.render(self.max_history_turns),
            question = question
        )
    }

    /// Join passage texts in rank order within the character budget.
    ///
    /// Lowest-ranked passages are dropped first and no passage is ever cut;
    /// the top passage is kept even if it alone exceeds the budget.
    pub fn build_context(&self, passages: &[Passage]) -> String {
        let kept = self.fit_to_budget(passages);
        if kept < passages.len() {
            tracing::warn!(
                "Context budget of {} chars exceeded, dropped {} lowest-ranked passage(s)",
                self.max_context_chars,
                passages.len() - kept
            );
        }

        passages[..kept]
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Number of leading passages that fit
    fn fit_to_budget(&self, passages: &[Passage]) -> usize {
        let mut used = 0usize;
        for (i, passage) in passages.iter().enumerate() {
            let separator = if i == 0 { 0 } else { 2 };
            let cost = separator + passage.text.chars().count();
            if i > 0 && used + cost > self.max_context_chars {
                return i;
            }
            used += cost;
        }
        passages.len()
    }
}
