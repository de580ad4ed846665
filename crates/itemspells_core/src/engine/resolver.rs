//! Child spell resolution.
//!
//! # Responsibility
//! - Map each stored link to the authoritative child document.
//! - Degrade unresolvable links to a placeholder instead of failing.
//!
//! # Invariants
//! - Output order equals link order; keys are synthetic ids.
//! - Synthesized children are never persisted and always carry
//!   `original-uuid` = the stored link uuid.

use crate::engine::compiler::compile;
use crate::model::document::{flags, ContainerRef, Document, DocumentData, SPELL_TYPE};
use crate::model::spell_link::SpellLink;
use crate::repo::document_repo::{DocumentStore, StoreResult};
use futures::future::join_all;
use indexmap::IndexMap;
use log::{debug, warn};
use serde_json::{json, Value};

pub const MISSING_SPELL_NAME: &str = "Missing Item";
pub const MISSING_SPELL_IMG: &str = "icons/svg/hazard.svg";
pub const MISSING_SPELL_DESCRIPTION: &str =
    "The linked spell could not be found. Remove this link from the item.";

/// Resolved children keyed by synthetic id, in link order.
pub type ChildSpellMap = IndexMap<String, Document>;

/// Resolves every link of `parent` concurrently.
///
/// Duplicate synthetic ids keep the first position and the last value.
pub async fn resolve<S>(store: &S, parent: &Document, links: &[SpellLink]) -> StoreResult<ChildSpellMap>
where
    S: DocumentStore + ?Sized,
{
    let resolved = join_all(links.iter().map(|link| resolve_child(store, parent, link))).await;

    let mut children = IndexMap::with_capacity(resolved.len());
    for (link, child) in links.iter().zip(resolved) {
        children.insert(link.synthetic_id().to_string(), child?);
    }
    debug!(
        "event=children_resolved module=resolver status=ok parent={} count={}",
        parent.uuid,
        children.len()
    );
    Ok(children)
}

/// Resolves one link to an owned child or a synthesized stand-in.
pub async fn resolve_child<S>(store: &S, parent: &Document, link: &SpellLink) -> StoreResult<Document>
where
    S: DocumentStore + ?Sized,
{
    let synthetic_id = link.synthetic_id();
    let source = match store.fetch(&link.uuid).await? {
        Some(original) if original.is_child_of(parent) => return Ok(original),
        Some(original) => original,
        None => {
            warn!(
                "event=child_resolve module=resolver status=missing parent={} link={}",
                parent.uuid, link.uuid
            );
            missing_spell_placeholder(synthetic_id, parent.container.clone())
        }
    };

    let update = compile(&parent.id, &source.data, &link.patch());
    let mut data = source.data.apply(&update)?;
    data.set_flag(flags::KNOWN_UUID, Value::String(link.uuid.clone()));
    Ok(Document::temporary(
        synthetic_id,
        parent.container.clone(),
        data,
    ))
}

/// Non-persistent stand-in for a link whose source cannot be fetched.
pub fn missing_spell_placeholder(id: &str, container: Option<ContainerRef>) -> Document {
    let data = DocumentData::new(MISSING_SPELL_NAME, SPELL_TYPE)
        .with_img(MISSING_SPELL_IMG)
        .with_system(json!({
            "description": { "value": MISSING_SPELL_DESCRIPTION }
        }));
    Document::temporary(id, container, data)
}
