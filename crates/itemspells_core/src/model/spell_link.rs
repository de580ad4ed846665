//! Spell link entries stored on a parent item.

use crate::model::document::synthetic_id;
use crate::model::override_patch::OverridePatch;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One entry of a parent's `item-spells` flag.
///
/// # Invariants
/// - `changes` is only present on legacy entries; migration removes it.
/// - List order is display order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpellLink {
    /// Locator of the linked spell: a library/compendium item, or an owned
    /// child once materialized.
    pub uuid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overrides: Option<OverridePatch>,
    /// Legacy flat path-keyed patch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changes: Option<Map<String, Value>>,
}

impl SpellLink {
    /// A fresh link with an empty override patch.
    pub fn new(uuid: impl Into<String>) -> Self {
        Self {
            uuid: uuid.into(),
            overrides: Some(OverridePatch::default()),
            changes: None,
        }
    }

    pub fn with_overrides(uuid: impl Into<String>, overrides: OverridePatch) -> Self {
        Self {
            uuid: uuid.into(),
            overrides: Some(overrides),
            changes: None,
        }
    }

    pub fn synthetic_id(&self) -> &str {
        synthetic_id(&self.uuid)
    }

    pub fn is_legacy(&self) -> bool {
        self.changes.is_some()
    }

    /// Stored overrides, or an empty patch when none were stored.
    pub fn patch(&self) -> OverridePatch {
        self.overrides.clone().unwrap_or_default()
    }
}
