//! Batch drivers over folders of TEI files.
//!
//! # Responsibility
//! - Enumerate input documents and feed them to the extraction pipeline.
//! - Own the unit of work: one transaction per batch, one savepoint per
//!   document.
//! - Stamp missing token ids across a folder before ingest.
//!
//! # Invariants
//! - A failing document never aborts the run; only its own writes are
//!   discarded.
//! - One `ConceptRegistry` is shared by every document of a run and kept in
//!   step with what was actually committed.
//! - Documents are processed one at a time, in sorted path order.

use crate::db::optimize_db;
use crate::model::corpus::CorpusStats;
use crate::repo::corpus_repo::{CorpusRepository, RepoError, SqliteCorpusRepository};
use crate::service::concept_registry::ConceptRegistry;
use crate::service::extraction_service::{DocumentReport, ExtractionPipeline, PipelineError};
use crate::tei::context::DEFAULT_WINDOW;
use crate::tei::ids::assign_ids;
use log::{error, info, warn};
use rusqlite::{Connection, Transaction};
use serde::Serialize;
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Documents committed together by default.
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// File name patterns picked up by `ingest_folder`.
const INGEST_PATTERNS: &[&str] = &["*.tei.xml"];
/// File name patterns picked up by `assign_ids_in_folder`.
const ASSIGN_PATTERNS: &[&str] = &["*.xml", "*.tei"];

pub type IngestResult<T> = Result<T, IngestError>;

/// Run-level failures. Per-document failures are reported in summaries.
#[derive(Debug)]
pub enum IngestError {
    Io(std::io::Error),
    Pattern(glob::PatternError),
    Repo(RepoError),
}

impl Display for IngestError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "{err}"),
            Self::Pattern(err) => write!(f, "invalid input pattern: {err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for IngestError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Pattern(err) => Some(err),
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for IngestError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<glob::PatternError> for IngestError {
    fn from(value: glob::PatternError) -> Self {
        Self::Pattern(value)
    }
}

impl From<RepoError> for IngestError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<crate::db::DbError> for IngestError {
    fn from(value: crate::db::DbError) -> Self {
        Self::Repo(value.into())
    }
}

impl From<rusqlite::Error> for IngestError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Repo(value.into())
    }
}

/// Knobs of one ingest run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IngestOptions {
    /// Documents per committed transaction. Values below 1 act as 1.
    pub batch_size: usize,
    /// Context words kept on each side of an occurrence.
    pub window: usize,
    /// Run WAL/ANALYZE maintenance after the last commit.
    pub optimize: bool,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            window: DEFAULT_WINDOW,
            optimize: true,
        }
    }
}

/// One input handed to the batch driver.
#[derive(Debug)]
pub struct SourceDocument {
    pub name: String,
    pub content: std::io::Result<Vec<u8>>,
}

impl SourceDocument {
    pub fn from_bytes(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            content: Ok(bytes.into()),
        }
    }

    /// Reads `path` eagerly; a read error becomes a per-document failure.
    pub fn read(path: &Path) -> Self {
        Self {
            name: path.display().to_string(),
            content: std::fs::read(path),
        }
    }
}

/// A document that was skipped or rolled back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedDocument {
    pub name: String,
    pub error: String,
}

/// A committed document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestedDocument {
    pub name: String,
    pub report: DocumentReport,
}

/// Aggregated result of `ingest_documents`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestSummary {
    pub documents: usize,
    pub ingested: Vec<IngestedDocument>,
    pub failed: Vec<FailedDocument>,
    pub batches: usize,
    pub stats: CorpusStats,
}

impl IngestSummary {
    /// Non-fatal diagnostics over all committed documents.
    pub fn diagnostics(&self) -> usize {
        self.ingested
            .iter()
            .map(|doc| doc.report.diagnostics.len())
            .sum()
    }
}

/// Aggregated result of `assign_ids_in_folder`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AssignSummary {
    pub files: usize,
    pub tokens: usize,
    pub assigned: usize,
    pub failed: Vec<FailedDocument>,
}

/// Ingests every `*.tei.xml` file directly inside `input_dir`.
pub fn ingest_folder(
    conn: &mut Connection,
    input_dir: &Path,
    options: &IngestOptions,
) -> IngestResult<IngestSummary> {
    let paths = list_inputs(input_dir, INGEST_PATTERNS)?;
    info!(
        "event=ingest_folder module=service status=start files={} dir={}",
        paths.len(),
        input_dir.display()
    );
    ingest_documents(
        conn,
        paths.iter().map(|path| SourceDocument::read(path)),
        options,
    )
}

/// Runs the extraction pipeline over `documents` with batched commits.
///
/// # Errors
/// - Only when a batch transaction cannot be opened, or the final stats
///   query fails. Document-level failures land in `IngestSummary::failed`.
pub fn ingest_documents<I>(
    conn: &mut Connection,
    documents: I,
    options: &IngestOptions,
) -> IngestResult<IngestSummary>
where
    I: IntoIterator<Item = SourceDocument>,
{
    let started_at = Instant::now();
    let batch_size = options.batch_size.max(1);
    let pipeline = ExtractionPipeline::new(options.window);
    let mut registry = ConceptRegistry::new();
    let mut summary = IngestSummary::default();
    let mut batch: Vec<IngestedDocument> = Vec::new();

    let mut tx = conn.transaction()?;
    for document in documents {
        summary.documents += 1;
        let name = document.name.clone();

        match ingest_one(&mut tx, &pipeline, &mut registry, document) {
            Ok(report) => batch.push(IngestedDocument { name, report }),
            Err(err) => {
                warn!(
                    "event=document_ingest module=service status=error name={} error={}",
                    name, err
                );
                summary.failed.push(FailedDocument {
                    name,
                    error: err.to_string(),
                });
            }
        }

        if summary.documents % batch_size == 0 {
            finish_batch(tx, &mut registry, &mut batch, &mut summary);
            tx = conn.transaction()?;
        }
    }
    finish_batch(tx, &mut registry, &mut batch, &mut summary);

    if options.optimize {
        optimize_db(conn)?;
    }
    summary.stats = SqliteCorpusRepository::try_new(conn)?.corpus_stats()?;

    info!(
        "event=ingest module=service status=ok documents={} ingested={} failed={} concepts={} duration_ms={}",
        summary.documents,
        summary.ingested.len(),
        summary.failed.len(),
        registry.len(),
        started_at.elapsed().as_millis()
    );
    Ok(summary)
}

fn ingest_one(
    tx: &mut Transaction<'_>,
    pipeline: &ExtractionPipeline,
    registry: &mut ConceptRegistry,
    document: SourceDocument,
) -> Result<DocumentReport, PipelineError> {
    let bytes = document.content?;
    let savepoint = tx.savepoint()?;

    let extracted = SqliteCorpusRepository::try_new(&savepoint)
        .map_err(PipelineError::from)
        .and_then(|repo| pipeline.extract_bytes(&repo, registry, &bytes));

    match extracted.and_then(|report| savepoint.commit().map(|()| report).map_err(Into::into)) {
        Ok(report) => {
            registry.settle_document();
            Ok(report)
        }
        Err(err) => {
            // Dropping an unreleased savepoint rolls it back.
            registry.discard_document();
            Err(err)
        }
    }
}

fn finish_batch(
    tx: Transaction<'_>,
    registry: &mut ConceptRegistry,
    batch: &mut Vec<IngestedDocument>,
    summary: &mut IngestSummary,
) {
    let documents = std::mem::take(batch);
    if documents.is_empty() {
        // Nothing to keep; the empty transaction is rolled back on drop.
        return;
    }

    match tx.commit() {
        Ok(()) => {
            registry.settle_batch();
            summary.batches += 1;
            info!(
                "event=batch_commit module=service status=ok documents={} total={}",
                documents.len(),
                summary.documents
            );
            summary.ingested.extend(documents);
        }
        Err(err) => {
            registry.discard_batch();
            error!(
                "event=batch_commit module=service status=error documents={} error={}",
                documents.len(),
                err
            );
            summary
                .failed
                .extend(documents.into_iter().map(|doc| FailedDocument {
                    name: doc.name,
                    error: format!("batch commit failed: {err}"),
                }));
        }
    }
}

/// Stamps missing `<w>` ids on every `*.xml` / `*.tei` file of `input_dir`,
/// writing results under the same file name into `output_dir`.
pub fn assign_ids_in_folder(input_dir: &Path, output_dir: &Path) -> IngestResult<AssignSummary> {
    let paths = list_inputs(input_dir, ASSIGN_PATTERNS)?;
    std::fs::create_dir_all(output_dir)?;
    info!(
        "event=assign_ids module=service status=start files={} dir={}",
        paths.len(),
        input_dir.display()
    );

    let mut summary = AssignSummary::default();
    for path in &paths {
        summary.files += 1;
        match assign_file(path, output_dir) {
            Ok((tokens, assigned)) => {
                summary.tokens += tokens;
                summary.assigned += assigned;
                info!(
                    "event=assign_ids_file module=service status=ok file={} assigned={}",
                    path.display(),
                    assigned
                );
            }
            Err(err) => {
                warn!(
                    "event=assign_ids_file module=service status=error file={} error={}",
                    path.display(),
                    err
                );
                summary.failed.push(FailedDocument {
                    name: path.display().to_string(),
                    error: err.to_string(),
                });
            }
        }
    }

    Ok(summary)
}

/// Identifier prefix for a file: its name up to the first `.`.
pub fn document_prefix(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = name.split('.').next().unwrap_or_default();
    if stem.is_empty() {
        "doc".to_string()
    } else {
        stem.to_string()
    }
}

fn assign_file(path: &Path, output_dir: &Path) -> Result<(usize, usize), PipelineError> {
    let input = std::fs::read(path)?;
    let (output, report) = assign_ids(&input, &document_prefix(path))?;
    let file_name = path.file_name().unwrap_or_default();
    std::fs::write(output_dir.join(file_name), output)?;
    Ok((report.tokens, report.assigned))
}

fn list_inputs(dir: &Path, patterns: &[&str]) -> IngestResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(IngestError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("input directory `{}` does not exist", dir.display()),
        )));
    }

    let escaped = glob::Pattern::escape(&dir.to_string_lossy());
    let mut paths = BTreeSet::new();
    for pattern in patterns {
        for entry in glob::glob(&format!("{escaped}/{pattern}"))? {
            match entry {
                Ok(path) if path.is_file() => {
                    paths.insert(path);
                }
                Ok(_) => {}
                Err(err) => warn!(
                    "event=list_inputs module=service status=skipped error={}",
                    err
                ),
            }
        }
    }
    Ok(paths.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::document_prefix;
    use std::path::Path;

    #[test]
    fn prefix_is_file_name_up_to_first_dot() {
        assert_eq!(document_prefix(Path::new("/in/doc1.tei.xml")), "doc1");
        assert_eq!(document_prefix(Path::new("plain.xml")), "plain");
        assert_eq!(document_prefix(Path::new(".hidden.xml")), "doc");
    }
}
