//! Child-spell derivation engine.
//!
//! # Responsibility
//! - Compile override patches into field assignments (`compiler`).
//! - Migrate legacy patch shapes to the current schema (`migrator`).
//! - Resolve stored links into owned or synthesized children (`resolver`).
//!
//! # Invariants
//! - Compilation is pure; only the resolver and the migration writer touch
//!   the document store.

pub mod compiler;
pub mod migrator;
pub mod resolver;
