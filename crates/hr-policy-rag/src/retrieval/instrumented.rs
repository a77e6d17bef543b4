//! Retrieval wrapper that traces returned passages

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::Result;
use crate::types::{Passage, RetrievalResult};

use super::retriever::Retriever;

/// Characters of passage text shown in a trace
pub const PREVIEW_CHARS: usize = 500;

/// Write-only destination for retrieval traces
pub trait TraceSink: Send + Sync {
    fn emit(&self, trace: &str);
}

/// Sends traces to `tracing` under the `hr_policy_rag::retrieval` target
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl TraceSink for TracingSink {
    fn emit(&self, trace: &str) {
        tracing::info!(target: "hr_policy_rag::retrieval", "\n{}", trace);
    }
}

/// Pass-through decorator around any [`Retriever`].
///
/// Inner retriever, debug flag and sink are fixed at construction.
pub struct InstrumentedRetriever<R> {
    inner: R,
    debug: bool,
    sink: Arc<dyn TraceSink>,
}

impl<R: Retriever> InstrumentedRetriever<R> {
    /// Wrap `inner`, tracing to [`TracingSink`] when `debug` is set
    pub fn new(inner: R, debug: bool) -> Self {
        Self::with_sink(inner, debug, Arc::new(TracingSink))
    }

    pub fn with_sink(inner: R, debug: bool, sink: Arc<dyn TraceSink>) -> Self {
        Self { inner, debug, sink }
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }
}

#[async_trait]
impl<R: Retriever> Retriever for InstrumentedRetriever<R> {
    async fn retrieve(&self, query: &str) -> Result<RetrievalResult> {
        let passages = self.inner.retrieve(query).await?;
        if self.debug {
            self.sink.emit(&format_trace(&passages));
        }
        Ok(passages)
    }
}

/// Render the delimited block written for one retrieval
pub fn format_trace(passages: &[Passage]) -> String {
    let mut out = String::from("========== RETRIEVED PASSAGES ==========\n");

    if passages.is_empty() {
        out.push_str("(no passages)\n");
    }

    for passage in passages {
        let page = passage
            .page
            .map(|p| p.to_string())
            .unwrap_or_else(|| "N/A".to_string());
        let preview = passage.preview(PREVIEW_CHARS);
        let ellipsis = if preview.len() < passage.text.len() { " ..." } else { "" };

        out.push_str(&format!(
            "[Passage {}]\nSource: {}\nPage  : {}\n{}{}\n\n",
            passage.rank, passage.source_id, page, preview, ellipsis
        ));
    }

    out.push_str("========================================");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    struct Fixed(RetrievalResult);

    #[async_trait]
    impl Retriever for Fixed {
        async fn retrieve(&self, _query: &str) -> Result<RetrievalResult> {
            Ok(self.0.clone())
        }
    }

    #[derive(Default)]
    struct Collect(Mutex<Vec<String>>);

    impl TraceSink for Collect {
        fn emit(&self, trace: &str) {
            self.0.lock().push(trace.to_string());
        }
    }

    fn passages() -> RetrievalResult {
        vec![
            Passage {
                text: "x".repeat(800),
                source_id: "policy.pdf".to_string(),
                page: Some(3),
                rank: 0,
                score: 0.9,
            },
            Passage {
                text: "Overtime is paid at 1.5x".to_string(),
                source_id: "policy.pdf".to_string(),
                page: None,
                rank: 1,
                score: 0.4,
            },
        ]
    }

    #[tokio::test]
    async fn test_result_unchanged_regardless_of_flag() {
        let expected = Fixed(passages()).retrieve("q").await.unwrap();

        for debug in [false, true] {
            let sink = Arc::new(Collect::default());
            let wrapped = InstrumentedRetriever::with_sink(Fixed(passages()), debug, sink.clone());
            assert_eq!(wrapped.retrieve("q").await.unwrap(), expected);
            assert_eq!(sink.0.lock().len(), usize::from(debug));
        }
    }

    #[tokio::test]
    async fn test_trace_lists_passages_in_order() {
        let sink = Arc::new(Collect::default());
        let wrapped = InstrumentedRetriever::with_sink(Fixed(passages()), true, sink.clone());
        wrapped.retrieve("q").await.unwrap();

        let traces = sink.0.lock();
        let trace = &traces[0];
        assert!(trace.starts_with("========== RETRIEVED PASSAGES"));
        assert!(trace.ends_with("========================================"));
        let first = trace.find("[Passage 0]").unwrap();
        let second = trace.find("[Passage 1]").unwrap();
        assert!(first < second);
        assert!(trace.contains("Page  : 3"));
        assert!(trace.contains("Page  : N/A"));
        assert!(!trace.contains(&"x".repeat(PREVIEW_CHARS + 1)));
    }
}
