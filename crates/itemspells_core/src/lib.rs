//! Core engine for items that grant spells.
//! Owns the parent/child link model, override compilation and the
//! relationship invariants between parent items and their child spells.

pub mod config;
pub mod context;
pub mod db;
pub mod engine;
pub mod host;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, CoreConfig, LogSettings, ModuleSettings, TypeEligibility};
pub use context::Context;
pub use engine::compiler::compile;
pub use engine::migrator::{migrate, MigrationOutcome};
pub use engine::resolver::{resolve, ChildSpellMap};
pub use host::{ConfirmPrompt, FixedAnswer, NoopRenderSink, RenderSink};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::document::{ContainerRef, Document, DocumentData};
pub use model::override_patch::OverridePatch;
pub use model::spell_link::SpellLink;
pub use repo::document_repo::{DocumentStore, StoreError, StoreResult, UpdateOptions};
pub use repo::sqlite_store::SqliteDocumentStore;
pub use service::api::{
    display_tab, get_child_spells, get_parent_item, get_parent_reference_id, is_linked_item,
    is_usable_item,
};
pub use service::item_spell_manager::{
    ItemSpellManager, ItemSpellsError, ItemSpellsResult, RemoveOptions, SpellRemoval,
};
pub use service::lifecycle::{DeleteOptions, LifecycleHooks};
pub use service::tab_view::{build_spells_tab, SpellTab, SpellTabRow};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
