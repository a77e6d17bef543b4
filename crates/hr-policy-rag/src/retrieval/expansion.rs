//! Multi-query expansion: LLM-generated rephrasings merged into one result

use async_trait::async_trait;
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;

use crate::config::ExpansionConfig;
use crate::error::Result;
use crate::providers::LlmProvider;
use crate::types::passage::rerank;
use crate::types::RetrievalResult;

use super::retriever::Retriever;

/// Retrieves for the question plus model-generated variants of it
pub struct QueryExpansionRetriever<R> {
    inner: R,
    llm: Arc<dyn LlmProvider>,
    num_variants: usize,
    max_passages: usize,
}

impl<R: Retriever> QueryExpansionRetriever<R> {
    pub fn new(inner: R, llm: Arc<dyn LlmProvider>, config: &ExpansionConfig) -> Self {
        Self {
            inner,
            llm,
            num_variants: config.num_variants,
            max_passages: config.max_passages.max(1),
        }
    }

    /// Ask the model for alternative phrasings of `query`
    pub async fn generate_variants(&self, query: &str) -> Result<Vec<String>> {
        let prompt = build_expansion_prompt(query, self.num_variants);
        let raw = self.llm.generate(&prompt).await?;
        let variants = parse_variants(&raw, query, self.num_variants);
        tracing::info!("Generated {} query variants: {:?}", variants.len(), variants);
        Ok(variants)
    }

    /// Retrieve for `query` and each variant, then merge.
    ///
    /// The original query's passages come first; later queries only add
    /// passages not seen before. Retrievals run concurrently but the merge
    /// always follows expansion order.
    pub async fn retrieve_with_variants(
        &self,
        query: &str,
        variants: &[String],
    ) -> Result<RetrievalResult> {
        let queries = unique_queries(query, variants);
        if queries.is_empty() {
            return Ok(Vec::new());
        }

        let mut results = join_all(queries.iter().map(|q| self.inner.retrieve(q))).await;

        // The original query must succeed; a failing variant is only logged
        let original = results.remove(0)?;
        let mut merged_inputs = vec![original];
        for (variant, result) in queries.iter().skip(1).zip(results) {
            match result {
                Ok(passages) => merged_inputs.push(passages),
                Err(e) => tracing::warn!("Retrieval for variant '{}' failed: {}", variant, e),
            }
        }

        Ok(merge_results(merged_inputs, self.max_passages))
    }
}

#[async_trait]
impl<R: Retriever> Retriever for QueryExpansionRetriever<R> {
    async fn retrieve(&self, query: &str) -> Result<RetrievalResult> {
        let variants = match self.generate_variants(query).await {
            Ok(variants) => variants,
            Err(e) => {
                tracing::warn!("Query expansion failed, using original query only: {}", e);
                Vec::new()
            }
        };
        self.retrieve_with_variants(query, &variants).await
    }
}

/// Prompt asking for `n` rephrasings, one per line
pub fn build_expansion_prompt(query: &str, n: usize) -> String {
    format!(
        r#"You are helping search an HR policy document.
Write {n} different versions of the user question below. Each version should
approach the question from a different angle or split a broad question into a
more specific sub-question, so that together they retrieve more of the
relevant policy text.

Return only the {n} questions, one per line, without numbering or commentary.

Original question: {query}"#,
        n = n,
        query = query
    )
}

/// Extract up to `n` distinct variants from a model reply.
///
/// Strips list markers, drops blank lines and anything equal (ignoring case
/// and surrounding whitespace) to the original or an earlier variant.
pub fn parse_variants(raw: &str, original: &str, n: usize) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    seen.insert(normalize(original));

    let mut variants = Vec::new();
    for line in raw.lines() {
        let cleaned = strip_list_marker(line.trim());
        if cleaned.is_empty() {
            continue;
        }
        if seen.insert(normalize(cleaned)) {
            variants.push(cleaned.to_string());
        }
        if variants.len() == n {
            break;
        }
    }
    variants
}

/// Merge per-query results, dropping `(source_id, page, text)` duplicates
/// and keeping the first appearance.
pub fn merge_results(results: Vec<RetrievalResult>, max_passages: usize) -> RetrievalResult {
    let mut merged: RetrievalResult = Vec::new();
    let mut seen: HashSet<(String, Option<u32>, String)> = HashSet::new();

    for passage in results.into_iter().flatten() {
        let (source, page, text) = passage.dedup_key();
        if seen.insert((source.to_string(), page, text.to_string())) {
            merged.push(passage);
        }
        if merged.len() == max_passages {
            break;
        }
    }

    rerank(&mut merged);
    merged
}

fn unique_queries(query: &str, variants: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    std::iter::once(query)
        .chain(variants.iter().map(String::as_str))
        .filter(|q| !q.trim().is_empty() && seen.insert(normalize(q)))
        .map(str::to_string)
        .collect()
}

fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

fn strip_list_marker(line: &str) -> &str {
    let line = line.trim_start_matches(['-', '*', '•']).trim_start();
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        let rest = &line[digits..];
        if let Some(stripped) = rest.strip_prefix('.').or_else(|| rest.strip_prefix(')')) {
            return stripped.trim();
        }
    }
    line.trim()
}
