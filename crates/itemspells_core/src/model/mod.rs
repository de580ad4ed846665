//! Domain model for parent items and their linked child spells.
//!
//! # Responsibility
//! - Define the document shapes the engine reads and writes.
//! - Define the persisted spell-link and override-patch records.
//!
//! # Invariants
//! - Documents reference each other only by id/uuid strings.
//! - Relationship state lives in module-scoped flags, never in live links.

pub mod activity;
pub mod document;
pub mod object_path;
pub mod override_patch;
pub mod spell_link;
