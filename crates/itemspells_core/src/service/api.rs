//! Public query API for callers outside the relationship manager.
//!
//! # Responsibility
//! - Answer link/back-reference queries without mutating state.
//! - Decide whether an item's spells are usable and whether its tab shows.
//!
//! # Invariants
//! - Nothing here writes to the store; stored lists are migrated in memory.

use crate::config::{ModuleSettings, TypeEligibility};
use crate::context::Context;
use crate::engine::migrator::migrate;
use crate::engine::resolver::{resolve, ChildSpellMap};
use crate::model::document::{synthetic_id, Document};
use crate::model::object_path::is_truthy;
use crate::model::spell_link::SpellLink;
use crate::repo::document_repo::{DocumentStore, StoreResult};
use log::warn;
use serde_json::Value;

/// Systems newer than this store attunement as a string tag.
const STRING_ATTUNEMENT_SINCE: &str = "3.1.99";
const ATTUNEMENT_REQUIRED: &str = "required";
const LEGACY_ATTUNEMENT_REQUIRED: i64 = 1;

/// The item's stored links, or `None` when it has none.
pub fn is_linked_item(item: &Document) -> Option<Vec<SpellLink>> {
    match item.spell_links() {
        Ok(links) if !links.is_empty() => Some(links),
        Ok(_) => None,
        Err(err) => {
            warn!(
                "event=linked_item_check module=api status=error item={} error={err}",
                item.uuid
            );
            None
        }
    }
}

/// Raw `parent-item` value of a spell (a parent id or uuid).
pub fn get_parent_reference_id(spell: &Document) -> Option<&str> {
    spell.parent_reference()
}

/// Finds the parent item of `spell`.
///
/// With candidate items (provided, or the spell's container contents) the
/// parent is matched by the last segment of the back-reference; otherwise the
/// back-reference is fetched as a uuid.
pub async fn get_parent_item<S>(
    store: &S,
    spell: &Document,
    embedded_only: bool,
    provided_items: Option<&[Document]>,
) -> StoreResult<Option<Document>>
where
    S: DocumentStore + ?Sized,
{
    if embedded_only && !spell.is_embedded() {
        return Ok(None);
    }
    let Some(reference) = get_parent_reference_id(spell) else {
        return Ok(None);
    };

    let container_items;
    let items = match (provided_items, &spell.container) {
        (Some(items), _) => Some(items),
        (None, Some(container)) => {
            container_items = store.list(container).await?;
            Some(container_items.as_slice())
        }
        (None, None) => None,
    };

    match items {
        Some(items) => {
            let parent_id = synthetic_id(reference);
            Ok(items.iter().find(|item| item.id == parent_id).cloned())
        }
        None if embedded_only => Ok(None),
        None => store.fetch(reference).await,
    }
}

/// Child spells of `item`, or `None` when it has no links.
///
/// With candidate items (provided, or the container contents when
/// `embedded_only`) the real children among them are returned keyed by id;
/// otherwise every link is resolved.
pub async fn get_child_spells<S>(
    store: &S,
    item: &Document,
    embedded_only: bool,
    provided_items: Option<&[Document]>,
) -> StoreResult<Option<ChildSpellMap>>
where
    S: DocumentStore + ?Sized,
{
    if embedded_only && !item.is_embedded() {
        return Ok(None);
    }
    let links = migrate(item.spell_links()?).links;
    if links.is_empty() {
        return Ok(None);
    }

    let container_items;
    let items = match (provided_items, &item.container) {
        (Some(items), _) => Some(items),
        (None, Some(container)) if embedded_only => {
            container_items = store.list(container).await?;
            Some(container_items.as_slice())
        }
        _ => None,
    };

    match items {
        Some(items) => Ok(Some(
            items
                .iter()
                .filter(|candidate| candidate.is_child_of(item))
                .map(|child| (child.id.clone(), child.clone()))
                .collect(),
        )),
        None => resolve(store, item, &links).await.map(Some),
    }
}

/// True when the spells granted by `item` may be cast by the caller.
pub fn is_usable_item(ctx: &Context, settings: &ModuleSettings, item: &Document) -> bool {
    if item.is_unidentified() {
        return false;
    }
    let system = &item.data;
    if settings.exclude_unequipped && system.system_field("equipped") == Some(&Value::Bool(false)) {
        return false;
    }
    if ctx.is_gm {
        return true;
    }

    let attunement = system.system_field("attunement");
    if ctx.system_newer_than(STRING_ATTUNEMENT_SINCE) {
        let required = attunement.and_then(Value::as_str) == Some(ATTUNEMENT_REQUIRED);
        let attuned = system.system_field("attuned").is_some_and(is_truthy);
        !(required && !attuned)
    } else {
        attunement.and_then(Value::as_i64) != Some(LEGACY_ATTUNEMENT_REQUIRED)
    }
}

/// True when the spells tab should be shown for `item`.
pub fn display_tab(ctx: &Context, eligibility: &dyn TypeEligibility, item: &Document) -> bool {
    eligibility.is_type_included(item.doc_type()) && (ctx.is_gm || !item.is_unidentified())
}
