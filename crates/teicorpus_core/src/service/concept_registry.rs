//! Corpus-wide concept deduplication.
//!
//! # Responsibility
//! - Map a concept URL to exactly one `concepts` row for the whole run.
//! - Cache resolved ids so repeated URLs cost one hash lookup.
//!
//! # Invariants
//! - At most one concept per distinct URL; the `UNIQUE(url)` constraint backs
//!   this in storage.
//! - The cache never holds an id whose row was rolled back: entries created
//!   inside a discarded document or batch are evicted with it.
//! - One registry instance is used by one writer at a time.

use crate::model::corpus::{Concept, ConceptId};
use crate::repo::corpus_repo::{CorpusRepository, RepoResult};
use log::debug;
use std::collections::HashMap;

/// Lookup-or-create service for concepts, scoped to one ingest run.
#[derive(Debug, Default)]
pub struct ConceptRegistry {
    cache: HashMap<String, ConceptId>,
    /// Created since the current document started.
    document_created: Vec<String>,
    /// Created by settled documents of the current, uncommitted batch.
    batch_created: Vec<String>,
}

impl ConceptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves `url` to its concept, creating it on first sight.
    ///
    /// Blank URLs mean "no concept" and return `Ok(None)` without touching
    /// the cache or the repository.
    pub fn resolve<R>(&mut self, repo: &R, url: &str) -> RepoResult<Option<Concept>>
    where
        R: CorpusRepository + ?Sized,
    {
        let url = url.trim();
        if url.is_empty() {
            return Ok(None);
        }

        if let Some(&id) = self.cache.get(url) {
            return Ok(Some(Concept {
                id,
                url: url.to_string(),
            }));
        }

        let id = match repo.find_concept_by_url(url)? {
            Some(id) => id,
            None => {
                let id = repo.create_concept(url)?;
                self.document_created.push(url.to_string());
                debug!("event=concept_create module=service status=ok concept_id={id}");
                id
            }
        };
        self.cache.insert(url.to_string(), id);

        Ok(Some(Concept {
            id,
            url: url.to_string(),
        }))
    }

    /// Number of cached concepts.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// The current document's writes were kept; its concepts now live or die
    /// with the batch.
    pub fn settle_document(&mut self) {
        self.batch_created.append(&mut self.document_created);
    }

    /// The current document's writes were discarded.
    pub fn discard_document(&mut self) {
        let created = std::mem::take(&mut self.document_created);
        self.evict(created);
    }

    /// The batch was committed; every cached id is durable.
    pub fn settle_batch(&mut self) {
        self.settle_document();
        self.batch_created.clear();
    }

    /// The batch commit failed; forget everything it created.
    pub fn discard_batch(&mut self) {
        self.discard_document();
        let created = std::mem::take(&mut self.batch_created);
        self.evict(created);
    }

    fn evict(&mut self, urls: Vec<String>) {
        for url in urls {
            self.cache.remove(&url);
        }
    }
}
