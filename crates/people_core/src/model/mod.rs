//! Domain model for the people table.
//!
//! # Responsibility
//! - Define the canonical `Person` record and its write-side shapes.
//!
//! # Invariants
//! - Every stored person is identified by a store-assigned `PersonId`.
//! - Ids are never supplied by callers on insert and never reused.

pub mod person;
