//! Parent document create/delete hooks.
//!
//! # Responsibility
//! - Materialize a pasted parent's spell links as owned children.
//! - Cascade a parent's deletion to its owned children, with confirmation.
//!
//! # Invariants
//! - Only the acting user's hook mutates state.
//! - Group and vehicle containers never receive child spells.

use crate::config::TypeEligibility;
use crate::context::Context;
use crate::engine::compiler::compile;
use crate::engine::migrator::migrate_persisted;
use crate::host::{ConfirmPrompt, ALSO_DELETE_SPELLS_MESSAGE, PROMPT_TITLE};
use crate::model::document::{flags, ContainerRef, Document, DocumentData};
use crate::model::override_patch::OverridePatch;
use crate::model::spell_link::SpellLink;
use crate::repo::document_repo::{DocumentStore, StoreResult, UpdateOptions};
use crate::service::item_spell_manager::ItemSpellsResult;
use futures::future::join_all;
use log::{debug, info};
use std::sync::Arc;

/// Per-operation options for `on_parent_deleted`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteOptions {
    /// `Some(true)` deletes child spells without asking.
    pub also_delete_child_spells: Option<bool>,
}

/// Hooks invoked by the host after parent documents are created or deleted.
pub struct LifecycleHooks {
    store: Arc<dyn DocumentStore>,
    prompt: Arc<dyn ConfirmPrompt>,
    eligibility: Arc<dyn TypeEligibility>,
}

impl LifecycleHooks {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        prompt: Arc<dyn ConfirmPrompt>,
        eligibility: Arc<dyn TypeEligibility>,
    ) -> Self {
        Self {
            store,
            prompt,
            eligibility,
        }
    }

    /// Creates owned children for every resolvable link of a new parent.
    ///
    /// Returns the created children; links whose source is missing are
    /// dropped from the stored list.
    pub async fn on_parent_created(
        &self,
        ctx: &Context,
        acting_user_id: &str,
        parent: &Document,
    ) -> ItemSpellsResult<Vec<Document>> {
        let Some(container) = hook_container(ctx, acting_user_id, parent, "parent_created") else {
            return Ok(Vec::new());
        };
        if !self.eligibility.is_type_included(parent.doc_type()) {
            debug!(
                "event=parent_created module=lifecycle status=skip reason=type_excluded parent={}",
                parent.uuid
            );
            return Ok(Vec::new());
        }

        let parent = migrate_persisted(self.store.as_ref(), parent).await?;
        let links = parent.spell_links()?;
        if links.is_empty() {
            return Ok(Vec::new());
        }

        let sources = join_all(
            links
                .iter()
                .map(|link| child_creation_data(self.store.as_ref(), &parent, link)),
        )
        .await;

        let mut data = Vec::with_capacity(links.len());
        let mut overrides = Vec::with_capacity(links.len());
        for (link, source) in links.iter().zip(sources) {
            if let Some(source) = source? {
                data.push(source);
                overrides.push(link.overrides.clone());
            }
        }

        let created = if data.is_empty() {
            Vec::new()
        } else {
            self.store.create(container, data).await?
        };

        let replacement: Vec<SpellLink> = created
            .iter()
            .zip(overrides)
            .map(|(child, overrides)| SpellLink {
                uuid: child.uuid.clone(),
                overrides,
                changes: None,
            })
            .collect();
        self.store
            .set_flag(
                &parent.uuid,
                flags::ITEM_SPELLS,
                serde_json::to_value(&replacement)?,
                UpdateOptions::default(),
            )
            .await?;

        info!(
            "event=parent_created module=lifecycle status=ok parent={} links={} created={}",
            parent.uuid,
            links.len(),
            created.len()
        );
        Ok(created)
    }

    /// Deletes the owned children of a deleted parent, after confirmation.
    ///
    /// Returns the ids of deleted children (empty when nothing was deleted).
    pub async fn on_parent_deleted(
        &self,
        ctx: &Context,
        acting_user_id: &str,
        parent: &Document,
        options: DeleteOptions,
    ) -> ItemSpellsResult<Vec<String>> {
        let Some(container) = hook_container(ctx, acting_user_id, parent, "parent_deleted") else {
            return Ok(Vec::new());
        };
        if parent.spell_links()?.is_empty() {
            return Ok(Vec::new());
        }

        let child_ids: Vec<String> = self
            .store
            .list(container)
            .await?
            .into_iter()
            .filter(|document| document.is_child_of(parent))
            .map(|document| document.id)
            .collect();
        if child_ids.is_empty() {
            return Ok(Vec::new());
        }

        // Players are not asked about spells of an item they never identified.
        let auto_confirm = !ctx.is_gm && parent.is_unidentified();
        let confirmed = match options.also_delete_child_spells {
            Some(true) => true,
            None if auto_confirm => true,
            _ => {
                self.prompt
                    .confirm(PROMPT_TITLE, ALSO_DELETE_SPELLS_MESSAGE)
                    .await
            }
        };
        if !confirmed {
            debug!(
                "event=parent_deleted module=lifecycle status=skip reason=declined parent={}",
                parent.uuid
            );
            return Ok(Vec::new());
        }

        self.store.delete_many(container, &child_ids).await?;
        info!(
            "event=parent_deleted module=lifecycle status=ok parent={} deleted={}",
            parent.uuid,
            child_ids.len()
        );
        Ok(child_ids)
    }
}

/// Container of `parent` when this user's hook should act on it.
fn hook_container<'a>(
    ctx: &Context,
    acting_user_id: &str,
    parent: &'a Document,
    event: &str,
) -> Option<&'a ContainerRef> {
    if !ctx.is_acting_user(acting_user_id) {
        debug!("event={event} module=lifecycle status=skip reason=foreign_user parent={}", parent.uuid);
        return None;
    }
    let container = parent.container.as_ref()?;
    if !container.supports_child_spells() {
        debug!(
            "event={event} module=lifecycle status=skip reason=container_kind kind={} parent={}",
            container.kind, parent.uuid
        );
        return None;
    }
    Some(container)
}

/// Finished creation data for one link, or `None` if its source is missing.
///
/// Links with no stored overrides, or an empty patch, get the
/// materialization default.
async fn child_creation_data(
    store: &dyn DocumentStore,
    parent: &Document,
    link: &SpellLink,
) -> StoreResult<Option<DocumentData>> {
    let Some(spell) = store.fetch(&link.uuid).await? else {
        return Ok(None);
    };
    let patch = link
        .overrides
        .clone()
        .filter(|overrides| !overrides.is_empty())
        .unwrap_or_else(OverridePatch::materialization_default);
    let update = compile(&parent.id, &spell.data, &patch);
    let mut data = spell.data.apply(&update)?;
    data.clear_flag(flags::KNOWN_UUID);
    Ok(Some(data))
}
