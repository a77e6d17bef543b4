//! Offline ingestion: text extraction, cleaning, chunking and index build

mod chunker;
mod cleaner;
pub mod indexer;
pub mod parser;

pub use chunker::TextChunker;
pub use cleaner::clean_text;
pub use indexer::{IndexBuilder, IndexStats};
pub use parser::{DocumentParser, PageText, SourceDocument, SourceKind};
