//! Passage retrieval: index search, MMR, query expansion and tracing

pub mod expansion;
pub mod instrumented;
pub mod mmr;
pub mod retriever;
pub mod store;

pub use expansion::QueryExpansionRetriever;
pub use instrumented::{InstrumentedRetriever, TraceSink, TracingSink};
pub use retriever::{ContextRetriever, Retriever, SearchParams};
pub use store::{DocumentIndex, IndexEntry};
