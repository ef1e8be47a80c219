//! Per-document extraction pipeline.
//!
//! # Responsibility
//! - Drive one TEI document through metadata, text, words and phrasemes.
//! - Return an explicit report instead of printing or panicking.
//!
//! # Invariants
//! - Stages run in order: `Start -> MetadataExtracted -> TextCreated ->
//!   TokensExtracted -> PhrasemesLinked -> Done`.
//! - A document without a body stops at `TextCreated`; the text row stays.
//! - Every word of a document is written before any phraseme is linked.

use crate::model::corpus::{NewWord, TextId};
use crate::repo::corpus_repo::{CorpusRepository, RepoError};
use crate::service::concept_registry::ConceptRegistry;
use crate::service::phraseme_linker::{link_phraseme, SpanDescriptor};
use crate::tei::context::{linearize_body, DEFAULT_WINDOW};
use crate::tei::metadata::extract_metadata;
use crate::tei::tree::{DocumentTree, Element};
use crate::tei::XmlError;
use log::{debug, warn};
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type PipelineResult<T> = Result<T, PipelineError>;

/// Failures that discard a whole document.
#[derive(Debug)]
pub enum PipelineError {
    /// Input could not be read.
    Io(std::io::Error),
    /// Input is not well-formed markup.
    Xml(XmlError),
    /// Storage rejected a write or lookup.
    Repo(RepoError),
}

impl Display for PipelineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "cannot read document: {err}"),
            Self::Xml(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for PipelineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Xml(err) => Some(err),
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<XmlError> for PipelineError {
    fn from(value: XmlError) -> Self {
        Self::Xml(value)
    }
}

impl From<RepoError> for PipelineError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<rusqlite::Error> for PipelineError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Repo(value.into())
    }
}

/// Progress of one document through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStage {
    Start,
    MetadataExtracted,
    TextCreated,
    TokensExtracted,
    PhrasemesLinked,
    Done,
}

/// Non-fatal findings recorded while extracting a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// No `<body>` element; the text row has no words or phrasemes.
    MissingBody,
    /// A `<w>` without `xml:id`; it is stored with an empty stable id.
    MissingTokenId { position: usize },
    /// A phraseme target naming no word of this text.
    UnresolvedTarget { phraseme_id: i64, xml_id: String },
}

/// Outcome of a successfully extracted document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentReport {
    pub text_id: TextId,
    pub stage: ExtractionStage,
    pub words: usize,
    pub phrasemes: usize,
    pub links: usize,
    pub diagnostics: Vec<Diagnostic>,
}

/// Extraction pipeline configured with a context window radius.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractionPipeline {
    window: usize,
}

impl Default for ExtractionPipeline {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

impl ExtractionPipeline {
    pub fn new(window: usize) -> Self {
        Self { window }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Parses `bytes` and extracts the resulting document.
    pub fn extract_bytes<R>(
        &self,
        repo: &R,
        registry: &mut ConceptRegistry,
        bytes: &[u8],
    ) -> PipelineResult<DocumentReport>
    where
        R: CorpusRepository + ?Sized,
    {
        let tree = DocumentTree::parse(bytes)?;
        self.extract_document(repo, registry, &tree)
    }

    /// Writes one already-parsed document into `repo`.
    ///
    /// # Errors
    /// - Any storage failure. The caller owns rollback of partial writes.
    pub fn extract_document<R>(
        &self,
        repo: &R,
        registry: &mut ConceptRegistry,
        tree: &DocumentTree,
    ) -> PipelineResult<DocumentReport>
    where
        R: CorpusRepository + ?Sized,
    {
        let root = tree.root();
        let metadata = extract_metadata(root);
        let text_id = repo.create_text(&metadata)?;
        let mut report = DocumentReport {
            text_id,
            stage: ExtractionStage::TextCreated,
            words: 0,
            phrasemes: 0,
            links: 0,
            diagnostics: Vec::new(),
        };

        let Some(body) = find_body(root) else {
            warn!("event=document_extract module=service status=no_body text_id={text_id}");
            report.diagnostics.push(Diagnostic::MissingBody);
            return Ok(report);
        };

        self.extract_words(repo, registry, body, &mut report)?;
        report.stage = ExtractionStage::TokensExtracted;

        for span in body.descendants().filter_map(SpanDescriptor::from_element) {
            let outcome = link_phraseme(repo, text_id, &span)?;
            report.phrasemes += 1;
            report.links += outcome.linked;
            report
                .diagnostics
                .extend(outcome.unresolved.into_iter().map(|xml_id| {
                    Diagnostic::UnresolvedTarget {
                        phraseme_id: outcome.phraseme_id,
                        xml_id,
                    }
                }));
        }
        report.stage = ExtractionStage::PhrasemesLinked;

        debug!(
            "event=document_extract module=service status=ok text_id={} words={} phrasemes={} links={}",
            text_id, report.words, report.phrasemes, report.links
        );
        report.stage = ExtractionStage::Done;
        Ok(report)
    }

    fn extract_words<R>(
        &self,
        repo: &R,
        registry: &mut ConceptRegistry,
        body: &Element,
        report: &mut DocumentReport,
    ) -> PipelineResult<()>
    where
        R: CorpusRepository + ?Sized,
    {
        let linear = linearize_body(body);
        for (index, token) in linear.tokens.iter().enumerate() {
            let element = token.element;
            let xml_id = match element.xml_id() {
                Some(id) => id.to_string(),
                None => {
                    report
                        .diagnostics
                        .push(Diagnostic::MissingTokenId { position: token.position });
                    String::new()
                }
            };
            let concept = registry.resolve(repo, element.attr("ana").unwrap_or_default())?;

            repo.create_word(&NewWord {
                text_id: report.text_id,
                xml_id,
                occurrence: token.surface.clone(),
                lemma: element
                    .attr("lemma")
                    .filter(|lemma| !lemma.is_empty())
                    .map(str::to_string),
                concept_id: concept.map(|concept| concept.id),
                context: linear.context_for(index, self.window).unwrap_or_default(),
            })?;
            report.words = index + 1;
        }
        Ok(())
    }
}

fn find_body(root: &Element) -> Option<&Element> {
    if root.is("body") {
        return Some(root);
    }
    root.find_descendant("body")
}
