//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate TEI readers and repository calls into extraction use-cases.
//! - Keep CLI callers decoupled from storage details.

pub mod concept_registry;
pub mod extraction_service;
pub mod ingest_service;
pub mod phraseme_linker;
