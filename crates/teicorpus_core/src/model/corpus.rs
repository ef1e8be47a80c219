//! Corpus domain records.
//!
//! # Responsibility
//! - Define the plain records written by extraction and read back by queries.
//! - Keep relationships as foreign-key ids, never object references.
//!
//! # Invariants
//! - `Word::xml_id` is unique within its `text_id`.
//! - `Concept::url` is unique across the whole store.
//! - `PhrasemeWordLink::position` starts at 1 and is unique per phraseme.

use serde::Serialize;

/// Surrogate id of a `texts` row.
pub type TextId = i64;
/// Surrogate id of a `words` row.
pub type WordId = i64;
/// Surrogate id of a `concepts` row.
pub type ConceptId = i64;
/// Surrogate id of a `phrasemes` row.
pub type PhrasemeId = i64;

/// Descriptive fields of one document. Absent values are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TextMetadata {
    pub author: String,
    pub title: String,
    pub not_before: String,
    pub not_after: String,
}

/// A distinct controlled-vocabulary reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Concept {
    pub id: ConceptId,
    pub url: String,
}

/// Write model for one token occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewWord {
    pub text_id: TextId,
    /// Source-stable identifier (`xml:id`), unique within the text.
    pub xml_id: String,
    /// Surface form as it appears in the text.
    pub occurrence: String,
    pub lemma: Option<String>,
    pub concept_id: Option<ConceptId>,
    /// Neighboring surface forms, space-joined.
    pub context: String,
}

/// Read model for one stored token occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Word {
    pub id: WordId,
    pub text_id: TextId,
    pub xml_id: String,
    pub occurrence: String,
    pub lemma: Option<String>,
    pub concept_id: Option<ConceptId>,
    pub context: String,
}

/// Write model for one multi-word expression instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPhraseme {
    pub text_id: TextId,
    pub normalized_form: String,
    /// Raw `ana` value of the span; not resolved against `concepts`.
    pub concept_url: Option<String>,
}

/// Read model for one stored phraseme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Phraseme {
    pub id: PhrasemeId,
    pub text_id: TextId,
    pub normalized_form: String,
    pub concept_url: Option<String>,
}

/// One ordered member of a phraseme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PhrasemeWordLink {
    pub phraseme_id: PhrasemeId,
    pub word_id: WordId,
    /// 1-based position in span-target order.
    pub position: u32,
}

/// Row counts of the whole store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CorpusStats {
    pub texts: u64,
    pub words: u64,
    pub concepts: u64,
    pub phrasemes: u64,
    pub phraseme_words: u64,
}
