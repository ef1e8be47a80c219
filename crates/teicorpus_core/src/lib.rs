//! Core extraction engine for turning TEI corpora into a relational store.
//! This crate owns every corpus invariant: token id uniqueness, concept
//! deduplication and phraseme ordering.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod tei;

pub use logging::{default_log_level, init_logging, logging_status, LogTarget};
pub use model::corpus::{
    Concept, ConceptId, CorpusStats, NewPhraseme, NewWord, Phraseme, PhrasemeId,
    PhrasemeWordLink, TextId, TextMetadata, Word, WordId,
};
pub use repo::corpus_repo::{CorpusRepository, RepoError, RepoResult, SqliteCorpusRepository};
pub use service::concept_registry::ConceptRegistry;
pub use service::extraction_service::{
    Diagnostic, DocumentReport, ExtractionPipeline, ExtractionStage, PipelineError,
    PipelineResult,
};
pub use service::ingest_service::{
    assign_ids_in_folder, ingest_documents, ingest_folder, AssignSummary, FailedDocument,
    IngestError, IngestOptions, IngestResult, IngestSummary, IngestedDocument, SourceDocument,
    DEFAULT_BATCH_SIZE,
};
pub use service::phraseme_linker::{link_phraseme, LinkOutcome, SpanDescriptor};
pub use tei::context::{linearize_body, TokenStream, DEFAULT_WINDOW};
pub use tei::ids::{assign_ids, AssignReport};
pub use tei::tree::DocumentTree;
pub use tei::{XmlError, XmlResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
