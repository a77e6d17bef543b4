//! Deterministic stand-ins for Ollama shared by the integration tests

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use hr_policy_rag::generation::prompt::NOT_FOUND_ANSWER;
use hr_policy_rag::providers::{EmbeddingProvider, LlmProvider};
use hr_policy_rag::retrieval::{DocumentIndex, IndexEntry, TraceSink};
use hr_policy_rag::{Error, PipelineBuilder, RagConfig, Result};

pub const DIMENSIONS: usize = 64;
pub const EMBEDDING_MODEL: &str = "keyword-hash";

/// (page, text) of the fixture policy, all from `policy.pdf`
pub const POLICY: &[(u32, &str)] = &[
    (3, "Annual leave is 20 days per year for full-time employees."),
    (4, "Part-time employees accrue annual leave pro rata based on contracted hours."),
    (5, "Sick leave is 10 days per year and requires a medical certificate after two consecutive days."),
    (7, "Remote work requires written approval from your line manager."),
    (9, "Employees must give four weeks notice before resigning."),
];

const STOP_WORDS: &[&str] = &[
    "a", "an", "the", "is", "are", "of", "for", "to", "per", "how", "many", "much", "what", "do",
    "does", "i", "get", "about", "in", "and", "on", "my", "your", "be", "must", "from", "after",
    "before", "there", "based",
];

/// Content words, lowercased, with a trailing plural `s` dropped
pub fn keywords(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .map(|w| w.to_lowercase())
        .filter(|w| !w.is_empty() && !STOP_WORDS.contains(&w.as_str()))
        .map(|w| match w.strip_suffix('s') {
            Some(stem) if stem.len() > 2 => stem.to_string(),
            _ => w,
        })
        .collect()
}

/// Bag-of-keywords vector hashed into `DIMENSIONS` buckets (FNV-1a)
pub fn embed_text(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0f32; DIMENSIONS];
    for word in keywords(text) {
        let mut hash: u64 = 0xcbf29ce484222325;
        for byte in word.bytes() {
            hash ^= byte as u64;
            hash = hash.wrapping_mul(0x100000001b3);
        }
        vector[(hash % DIMENSIONS as u64) as usize] += 1.0;
    }
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        vector.iter_mut().for_each(|v| *v /= norm);
    }
    vector
}

#[derive(Default)]
pub struct KeywordEmbedder {
    pub calls: Mutex<Vec<String>>,
}

#[async_trait]
impl EmbeddingProvider for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.lock().push(text.to_string());
        Ok(embed_text(text))
    }

    fn dimensions(&self) -> usize {
        DIMENSIONS
    }

    fn name(&self) -> &str {
        "keyword-hash"
    }
}

enum Behaviour {
    /// Answer from the best-matching context passage
    Grounded,
    /// Every call fails with this message
    Fail(String),
}

/// Model stand-in that records every prompt.
///
/// Expansion prompts get `variants` back; answering prompts are answered
/// with the context passage sharing the most keywords with the question
/// (at least two), otherwise with the not-found sentence.
pub struct ScriptedLlm {
    behaviour: Behaviour,
    variants: Mutex<String>,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    pub fn grounded() -> Self {
        Self {
            behaviour: Behaviour::Grounded,
            variants: Mutex::new(String::new()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Transport failure as the Ollama client reports it
    pub fn unreachable() -> Self {
        Self::failing("Ollama generation request failed: error sending request: connection refused")
    }

    pub fn failing(message: &str) -> Self {
        Self {
            behaviour: Behaviour::Fail(message.to_string()),
            variants: Mutex::new(String::new()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Reply used for query-expansion prompts
    pub fn with_variants(self, variants: &str) -> Self {
        *self.variants.lock() = variants.to_string();
        self
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().len()
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().last().cloned()
    }

    fn answer_from_context(prompt: &str) -> String {
        let question = section(prompt, "Question:\n", "\n\nAnswer:");
        let start = prompt.find("Context:\n").map(|i| i + "Context:\n".len()).unwrap_or(0);
        let end = prompt
            .find("\n\nConversation so far:")
            .or_else(|| prompt.rfind("\n\nQuestion:"))
            .unwrap_or(prompt.len())
            .max(start);
        let context = &prompt[start..end];

        let wanted = keywords(question);
        context
            .split("\n\n")
            .map(|passage| {
                let words = keywords(passage);
                let overlap = wanted.iter().filter(|w| words.contains(w)).count();
                (overlap, passage)
            })
            .filter(|(overlap, _)| *overlap >= 2)
            .max_by_key(|(overlap, _)| *overlap)
            .map(|(_, passage)| passage.to_string())
            .unwrap_or_else(|| NOT_FOUND_ANSWER.to_string())
    }
}

fn section<'a>(text: &'a str, start: &str, end: &str) -> &'a str {
    let Some(from) = text.rfind(start).map(|i| i + start.len()) else {
        return "";
    };
    let rest = &text[from..];
    match rest.find(end) {
        Some(to) => &rest[..to],
        None => rest,
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().push(prompt.to_string());
        match &self.behaviour {
            Behaviour::Fail(message) => Err(Error::llm(message.clone())),
            Behaviour::Grounded if prompt.contains("Original question:") => {
                Ok(self.variants.lock().clone())
            }
            Behaviour::Grounded => Ok(Self::answer_from_context(prompt)),
        }
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(matches!(self.behaviour, Behaviour::Grounded))
    }

    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        "scripted"
    }
}

/// Keeps every trace block it receives
#[derive(Default)]
pub struct CollectingSink {
    pub traces: Mutex<Vec<String>>,
}

impl TraceSink for CollectingSink {
    fn emit(&self, trace: &str) {
        self.traces.lock().push(trace.to_string());
    }
}

/// Write the fixture policy index into `dir` and return a matching config
pub fn write_policy_index(dir: &Path) -> RagConfig {
    let mut index = DocumentIndex::new(EMBEDDING_MODEL, DIMENSIONS);
    for (page, text) in POLICY {
        index
            .insert(IndexEntry {
                text: text.to_string(),
                source_id: "policy.pdf".to_string(),
                page: Some(*page),
                embedding: embed_text(text),
            })
            .unwrap();
    }
    index.save(dir).unwrap();

    let mut config = RagConfig::default();
    config.index.index_dir = dir.to_path_buf();
    config.embeddings.model = EMBEDDING_MODEL.to_string();
    config.embeddings.dimensions = DIMENSIONS;
    config
}

/// Load the index from `config` and wire it to the fakes
pub fn pipeline(
    config: RagConfig,
    embedder: Arc<KeywordEmbedder>,
    llm: Arc<ScriptedLlm>,
    sink: Arc<CollectingSink>,
) -> PipelineBuilder {
    let index = DocumentIndex::load(&config.index.index_dir, &config.embeddings).unwrap();
    PipelineBuilder::new(config, Arc::new(index), embedder, llm).trace_sink(sink)
}
