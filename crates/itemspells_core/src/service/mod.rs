//! Service layer: relationship manager, lifecycle hooks and query API.
//!
//! # Responsibility
//! - Orchestrate engine and store calls for one operation at a time.
//! - Keep cache, parent list and child back-references consistent.

pub mod api;
pub mod item_spell_manager;
pub mod lifecycle;
pub mod spell_item_map;
pub mod tab_view;
