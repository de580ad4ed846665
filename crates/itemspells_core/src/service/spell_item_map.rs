//! Per-parent memo of resolved child spells.
//!
//! # Invariants
//! - Both maps are keyed by synthetic id and share link order.
//! - A stale cache must be refreshed before it is read by the manager.

use crate::engine::resolver::ChildSpellMap;
use crate::model::document::Document;
use crate::model::spell_link::SpellLink;
use indexmap::IndexMap;

#[derive(Debug, Clone)]
pub struct SpellItemMap {
    links: IndexMap<String, SpellLink>,
    items: ChildSpellMap,
    stale: bool,
}

impl SpellItemMap {
    /// Creates an empty, stale cache.
    pub fn new() -> Self {
        Self {
            links: IndexMap::new(),
            items: IndexMap::new(),
            stale: true,
        }
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// Marks the cache stale; contents stay readable until the next publish.
    pub fn invalidate(&mut self) {
        self.stale = true;
    }

    /// Replaces both maps and marks the cache fresh.
    pub fn publish(&mut self, links: &[SpellLink], items: ChildSpellMap) {
        self.links = link_map(links);
        self.items = items;
        self.stale = false;
    }

    /// Drops one entry from both maps.
    pub fn forget(&mut self, id: &str) {
        self.links.shift_remove(id);
        self.items.shift_remove(id);
    }

    pub fn links(&self) -> &IndexMap<String, SpellLink> {
        &self.links
    }

    pub fn items(&self) -> &ChildSpellMap {
        &self.items
    }

    pub fn item(&self, id: &str) -> Option<&Document> {
        self.items.get(id)
    }

    pub fn link(&self, id: &str) -> Option<&SpellLink> {
        self.links.get(id)
    }
}

impl Default for SpellItemMap {
    fn default() -> Self {
        Self::new()
    }
}

/// Keys `links` by synthetic id; a later duplicate replaces the earlier value.
pub fn link_map(links: &[SpellLink]) -> IndexMap<String, SpellLink> {
    links
        .iter()
        .map(|link| (link.synthetic_id().to_string(), link.clone()))
        .collect()
}
