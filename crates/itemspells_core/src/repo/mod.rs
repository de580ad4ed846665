//! Document store contracts and persistence implementations.
//!
//! # Responsibility
//! - Define the document store the engine is injected with.
//! - Provide a SQLite-backed store for tools and tests.
//!
//! # Invariants
//! - Store APIs return semantic errors (`NotFound`) in addition to transport
//!   errors.
//! - A missing document on `fetch` is `Ok(None)`, never an error.

pub mod document_repo;
pub mod sqlite_store;
