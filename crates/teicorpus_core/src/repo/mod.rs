//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the storage contract extraction is written against.
//! - Isolate SQLite query details from pipeline orchestration.
//!
//! # Invariants
//! - Repositories only accept connections migrated to the latest schema.

pub mod corpus_repo;
