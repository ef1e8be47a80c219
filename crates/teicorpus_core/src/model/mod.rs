//! Relational corpus model.
//!
//! # Responsibility
//! - Define the records shared by extraction, repositories and reports.
//!
//! # Invariants
//! - Records are plain data; relationships are ids resolved through the
//!   repository layer.

pub mod corpus;
