//! Answering orchestrator: retrieve → assemble → generate → reply

use std::sync::Arc;
use std::time::Instant;

use crate::error::{Error, Result};
use crate::providers::LlmProvider;
use crate::retrieval::Retriever;
use crate::types::{
    Answer, AnswerTier, ConversationHistory, ConversationTurn, ConversationalAnswer, Reply,
    ReplyStatus,
};

use super::prompt::{GuardrailPrompt, NOT_FOUND_ANSWER, PARTIAL_ANSWER_DISCLAIMER};

/// Reply to a blank question
pub const EMPTY_INPUT_MESSAGE: &str = "Please type a message.";

/// Reply when the model backend cannot be reached
pub const BACKEND_UNAVAILABLE_MESSAGE: &str =
    "Sorry, connection error. Please ensure the backend is running.";

/// Reply for any other failure
pub const UNEXPECTED_FAILURE_MESSAGE: &str = "Sorry, an unexpected error occurred.";

/// Used when the model returns nothing
pub const EMPTY_OUTPUT_MESSAGE: &str = "Sorry, I couldn't process your request.";

/// Stateless per call; the only state that crosses calls is the history the
/// caller passes in.
pub struct AnsweringOrchestrator {
    retriever: Arc<dyn Retriever>,
    llm: Arc<dyn LlmProvider>,
    prompt: GuardrailPrompt,
}

impl std::fmt::Debug for AnsweringOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnsweringOrchestrator")
            .field("prompt", &self.prompt)
            .finish_non_exhaustive()
    }
}

impl AnsweringOrchestrator {
    pub fn new(
        retriever: Arc<dyn Retriever>,
        llm: Arc<dyn LlmProvider>,
        prompt: GuardrailPrompt,
    ) -> Self {
        Self {
            retriever,
            llm,
            prompt,
        }
    }

    /// Answer one question from the retrieved policy text
    pub async fn answer(&self, question: &str) -> Result<Answer> {
        let question = validate(question)?;
        let start = Instant::now();

        let passages = self.retriever.retrieve(question).await?;
        let prompt = self.prompt.assemble(&passages, question);
        let answer = finish(self.invoke(&prompt).await?);

        tracing::info!(
            "Answered in {}ms from {} passage(s), tier {:?}",
            start.elapsed().as_millis(),
            passages.len(),
            answer.tier
        );
        Ok(answer)
    }

    /// Answer a follow-up, folding the earlier turns into the same prompt.
    ///
    /// The question and the answer are appended to `history`, which is
    /// returned to the caller; nothing is kept here.
    pub async fn answer_with_history(
        &self,
        question: &str,
        mut history: ConversationHistory,
    ) -> Result<ConversationalAnswer> {
        let question = validate(question)?;
        let start = Instant::now();

        let search_query = contextualize(question, &history);
        let passages = self.retriever.retrieve(&search_query).await?;
        let prompt = self
            .prompt
            .assemble_with_history(&passages, question, &history);
        let answer = finish(self.invoke(&prompt).await?);

        history.push(ConversationTurn::user(question));
        history.push(ConversationTurn::assistant(answer.answer.clone()));

        tracing::info!(
            "Answered follow-up in {}ms from {} passage(s), history now {} turns",
            start.elapsed().as_millis(),
            passages.len(),
            history.len()
        );
        Ok(ConversationalAnswer { answer, history })
    }

    /// [`answer`](Self::answer) mapped onto the user-facing contract
    pub async fn reply(&self, question: &str) -> Reply {
        match self.answer(question).await {
            Ok(answer) => Reply {
                answer: answer.answer,
                status: ReplyStatus::Answered,
            },
            Err(e) => self.error_reply(&e),
        }
    }

    /// [`answer_with_history`](Self::answer_with_history) mapped onto the
    /// user-facing contract. On failure the history comes back unchanged.
    pub async fn reply_with_history(
        &self,
        question: &str,
        history: ConversationHistory,
    ) -> (Reply, ConversationHistory) {
        match self.answer_with_history(question, history.clone()).await {
            Ok(result) => (
                Reply {
                    answer: result.answer.answer,
                    status: ReplyStatus::Answered,
                },
                result.history,
            ),
            Err(e) => (self.error_reply(&e), history),
        }
    }

    /// Fixed apology for an error; the cause is logged, never returned
    pub fn error_reply(&self, err: &Error) -> Reply {
        match err {
            Error::EmptyInput => Reply {
                answer: EMPTY_INPUT_MESSAGE.to_string(),
                status: ReplyStatus::Rejected,
            },
            e if self.is_backend_failure(e) => {
                tracing::error!("Chat error (backend {} unavailable): {}", self.llm.name(), e);
                Reply {
                    answer: BACKEND_UNAVAILABLE_MESSAGE.to_string(),
                    status: ReplyStatus::Degraded,
                }
            }
            e => {
                tracing::error!("Chat error: {}", e);
                Reply {
                    answer: UNEXPECTED_FAILURE_MESSAGE.to_string(),
                    status: ReplyStatus::Failed,
                }
            }
        }
    }

    /// Only adapter errors count; other failures may quote the backend's
    /// name without it being down.
    fn is_backend_failure(&self, err: &Error) -> bool {
        match err {
            Error::BackendUnavailable(_) => true,
            Error::Llm(_) | Error::Embedding(_) => err.mentions_backend(self.llm.name()),
            _ => false,
        }
    }

    /// Single model call, no retries
    async fn invoke(&self, prompt: &str) -> Result<String> {
        self.llm.generate(prompt).await.map_err(|e| {
            if e.mentions_backend(self.llm.name()) {
                Error::BackendUnavailable(e.to_string())
            } else {
                e
            }
        })
    }
}

fn validate(question: &str) -> Result<&str> {
    let question = question.trim();
    if question.is_empty() {
        return Err(Error::EmptyInput);
    }
    Ok(question)
}

/// Retrieval query for a follow-up: the previous user message gives
/// pronouns like "that" or "them" something to match against.
fn contextualize(question: &str, history: &ConversationHistory) -> String {
    match history.last_user_message() {
        Some(previous) => format!("{} {}", previous, question),
        None => question.to_string(),
    }
}

fn finish(raw: String) -> Answer {
    let text = raw.trim();
    let answer = if text.is_empty() {
        EMPTY_OUTPUT_MESSAGE.to_string()
    } else {
        text.to_string()
    };
    let tier = AnswerTier::classify(&answer, NOT_FOUND_ANSWER, PARTIAL_ANSWER_DISCLAIMER);
    Answer { answer, tier }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    use crate::types::{Passage, RetrievalResult};

    #[derive(Default)]
    struct CountingRetriever {
        queries: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Retriever for CountingRetriever {
        async fn retrieve(&self, query: &str) -> Result<RetrievalResult> {
            self.queries.lock().push(query.to_string());
            Ok(vec![Passage {
                text: "Annual leave is 20 days per year".to_string(),
                source_id: "policy.pdf".to_string(),
                page: Some(3),
                rank: 0,
                score: 0.9,
            }])
        }
    }

    struct Llm {
        reply: std::result::Result<&'static str, &'static str>,
        prompts: Mutex<Vec<String>>,
    }

    impl Llm {
        fn new(reply: std::result::Result<&'static str, &'static str>) -> Self {
            Self {
                reply,
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LlmProvider for Llm {
        async fn generate(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().push(prompt.to_string());
            self.reply.map(str::to_string).map_err(Error::llm)
        }
        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }
        fn name(&self) -> &str {
            "ollama"
        }
        fn model(&self) -> &str {
            "gemma:2b"
        }
    }

    fn orchestrator(
        llm: Arc<Llm>,
    ) -> (AnsweringOrchestrator, Arc<CountingRetriever>) {
        let retriever = Arc::new(CountingRetriever::default());
        let orchestrator =
            AnsweringOrchestrator::new(retriever.clone(), llm, GuardrailPrompt::default());
        (orchestrator, retriever)
    }

    #[tokio::test]
    async fn test_blank_question_is_rejected_before_retrieval() {
        let llm = Arc::new(Llm::new(Ok("unused")));
        let (orchestrator, retriever) = orchestrator(llm.clone());

        let reply = orchestrator.reply("   \n\t").await;
        assert_eq!(reply.status, ReplyStatus::Rejected);
        assert_eq!(reply.answer, EMPTY_INPUT_MESSAGE);
        assert!(retriever.queries.lock().is_empty());
        assert!(llm.prompts.lock().is_empty());
    }

    #[tokio::test]
    async fn test_answer_is_trimmed() {
        let llm = Arc::new(Llm::new(Ok("  Annual leave is 20 days.\n")));
        let (orchestrator, _) = orchestrator(llm);
        let answer = orchestrator.answer("How many days?").await.unwrap();
        assert_eq!(answer.answer, "Annual leave is 20 days.");
        assert_eq!(answer.tier, AnswerTier::Full);
    }

    #[tokio::test]
    async fn test_empty_model_output_gets_default_message() {
        let llm = Arc::new(Llm::new(Ok("   ")));
        let (orchestrator, _) = orchestrator(llm);
        let answer = orchestrator.answer("How many days?").await.unwrap();
        assert_eq!(answer.answer, EMPTY_OUTPUT_MESSAGE);
    }

    #[tokio::test]
    async fn test_backend_failure_degrades() {
        let llm = Arc::new(Llm::new(Err(
            "Ollama generation request failed: connection refused",
        )));
        let (orchestrator, _) = orchestrator(llm);

        let err = orchestrator.answer("How many days?").await.unwrap_err();
        assert!(matches!(err, Error::BackendUnavailable(_)));

        let reply = orchestrator.reply("How many days?").await;
        assert_eq!(reply.status, ReplyStatus::Degraded);
        assert_eq!(reply.answer, BACKEND_UNAVAILABLE_MESSAGE);
        assert!(!reply.answer.contains("refused"));
    }

    #[tokio::test]
    async fn test_other_failure_is_generic() {
        let llm = Arc::new(Llm::new(Err("model returned malformed JSON")));
        let (orchestrator, _) = orchestrator(llm);
        let reply = orchestrator.reply("How many days?").await;
        assert_eq!(reply.status, ReplyStatus::Failed);
        assert_eq!(reply.answer, UNEXPECTED_FAILURE_MESSAGE);
    }

    #[tokio::test]
    async fn test_history_is_extended_and_used_for_retrieval() {
        let llm = Arc::new(Llm::new(Ok("Part-timers accrue leave pro rata.")));
        let (orchestrator, retriever) = orchestrator(llm.clone());

        let mut history = ConversationHistory::new();
        history.push(ConversationTurn::user("How much annual leave do I get?"));
        history.push(ConversationTurn::assistant("20 days per year."));

        let result = orchestrator
            .answer_with_history("What about for part-timers?", history)
            .await
            .unwrap();

        assert_eq!(result.history.len(), 4);
        assert_eq!(
            result.history.turns()[3],
            ConversationTurn::assistant("Part-timers accrue leave pro rata.")
        );
        assert_eq!(
            retriever.queries.lock()[0],
            "How much annual leave do I get? What about for part-timers?"
        );
        assert!(llm.prompts.lock()[0].contains("Assistant: 20 days per year."));
    }

    #[tokio::test]
    async fn test_failed_follow_up_keeps_history() {
        let llm = Arc::new(Llm::new(Err("Ollama is down")));
        let (orchestrator, _) = orchestrator(llm);

        let history: ConversationHistory = vec![ConversationTurn::user("hi")].into();
        let (reply, returned) = orchestrator
            .reply_with_history("And sick leave?", history.clone())
            .await;
        assert_eq!(reply.status, ReplyStatus::Degraded);
        assert_eq!(returned, history);
    }

    #[test]
    fn test_backend_name_outside_adapter_errors_is_unexpected() {
        let (orchestrator, _) = orchestrator(Arc::new(Llm::new(Ok("unused"))));

        for err in [
            Error::internal("ollama returned 768 dimensions, index expects 384"),
            Error::index_unavailable("ollama index missing"),
        ] {
            let reply = orchestrator.error_reply(&err);
            assert_eq!(reply.status, ReplyStatus::Failed);
            assert_eq!(reply.answer, UNEXPECTED_FAILURE_MESSAGE);
        }

        let reply = orchestrator.error_reply(&Error::embedding(
            "Ollama embedding request failed: connection refused",
        ));
        assert_eq!(reply.status, ReplyStatus::Degraded);
    }
}
