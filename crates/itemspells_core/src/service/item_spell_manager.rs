//! Relationship manager for one parent item.
//!
//! # Responsibility
//! - Add, remove and reconfigure the parent's spell links.
//! - Keep the parent's `item-spells` list and each owned child's
//!   `parent-item` back-reference consistent.
//! - Own the parent's `SpellItemMap` cache and refresh it after mutations.
//!
//! # Invariants
//! - List writes made before a cache refresh never request a re-render; the
//!   render happens after the refreshed cache is published.
//! - A confirmation prompt is awaited before any delete.
//! - Multi-step operations are not rolled back if a later step fails.

use crate::context::Context;
use crate::engine::compiler::compile;
use crate::engine::migrator::migrate_persisted;
use crate::engine::resolver::{resolve, ChildSpellMap};
use crate::host::{ConfirmPrompt, RenderSink, DELETE_ORPHANED_SPELL_MESSAGE, PROMPT_TITLE};
use crate::model::document::{flags, Document};
use crate::model::override_patch::OverridePatch;
use crate::model::spell_link::SpellLink;
use crate::repo::document_repo::{DocumentStore, StoreError, UpdateOptions};
use crate::service::spell_item_map::SpellItemMap;
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

pub type ItemSpellsResult<T> = Result<T, ItemSpellsError>;

/// Errors from relationship operations.
#[derive(Debug)]
pub enum ItemSpellsError {
    Store(StoreError),
    /// The spell to materialize on an owned parent does not dereference.
    SourceNotFound(String),
    /// No cached child spell has this synthetic id.
    UnknownChildSpell(String),
    /// A stored flag does not have the expected shape.
    InvalidDocument(String),
}

impl Display for ItemSpellsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(err) => write!(f, "{err}"),
            Self::SourceNotFound(uuid) => write!(f, "spell source not found: {uuid}"),
            Self::UnknownChildSpell(id) => write!(f, "no child spell with id `{id}`"),
            Self::InvalidDocument(message) => write!(f, "invalid document: {message}"),
        }
    }
}

impl Error for ItemSpellsError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for ItemSpellsError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<serde_json::Error> for ItemSpellsError {
    fn from(value: serde_json::Error) -> Self {
        Self::InvalidDocument(value.to_string())
    }
}

/// Options for `ItemSpellManager::remove_spell_link`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemoveOptions {
    /// Delete the owned child instead of only unlinking it.
    pub also_delete: bool,
    /// The caller already confirmed the delete.
    pub skip_confirmation: bool,
}

/// What happened to the child spell after its link was removed.
#[derive(Debug, Clone, PartialEq)]
pub enum SpellRemoval {
    /// No owned child existed for the link; only the link was dropped.
    Detached,
    /// The owned child no longer existed.
    AlreadyGone,
    /// The owned child was kept with its back-reference cleared.
    Unlinked(Document),
    /// The owned child was deleted.
    Deleted,
}

/// Manages the spell links of one parent item.
pub struct ItemSpellManager {
    parent: Document,
    store: Arc<dyn DocumentStore>,
    prompt: Arc<dyn ConfirmPrompt>,
    renderer: Arc<dyn RenderSink>,
    cache: SpellItemMap,
}

impl ItemSpellManager {
    pub fn new(
        parent: Document,
        store: Arc<dyn DocumentStore>,
        prompt: Arc<dyn ConfirmPrompt>,
        renderer: Arc<dyn RenderSink>,
    ) -> Self {
        Self {
            parent,
            store,
            prompt,
            renderer,
            cache: SpellItemMap::new(),
        }
    }

    /// Parent as last written or read by this manager.
    pub fn parent(&self) -> &Document {
        &self.parent
    }

    pub fn cache(&self) -> &SpellItemMap {
        &self.cache
    }

    /// Raw stored links of the parent.
    pub fn spell_links(&self) -> ItemSpellsResult<Vec<SpellLink>> {
        Ok(self.parent.spell_links()?)
    }

    /// Migrates stored links if needed and re-derives the cache.
    pub async fn refresh(&mut self) -> ItemSpellsResult<&ChildSpellMap> {
        self.parent = migrate_persisted(self.store.as_ref(), &self.parent).await?;
        let links = self.spell_links()?;
        let items = resolve(self.store.as_ref(), &self.parent, &links).await?;
        self.cache.publish(&links, items);
        Ok(self.cache.items())
    }

    /// Resolved children, refreshing first when the cache is stale.
    pub async fn child_spells(&mut self) -> ItemSpellsResult<&ChildSpellMap> {
        if self.cache.is_stale() {
            self.refresh().await?;
        }
        Ok(self.cache.items())
    }

    /// Links a spell to the parent.
    ///
    /// On an owned parent the spell is first materialized as an owned child
    /// and the child's uuid is stored instead of `uuid`.
    pub async fn add_spell_link(
        &mut self,
        ctx: &Context,
        uuid: &str,
    ) -> ItemSpellsResult<&ChildSpellMap> {
        let stored_uuid = match self.parent.container.clone() {
            Some(container) => {
                let spell = self
                    .store
                    .fetch(uuid)
                    .await?
                    .ok_or_else(|| ItemSpellsError::SourceNotFound(uuid.to_string()))?;
                let update = compile(
                    &self.parent.id,
                    &spell.data,
                    &OverridePatch::materialization_default(),
                );
                let mut data = spell.data.apply(&update)?;
                data.clear_flag(flags::KNOWN_UUID);

                let child = self
                    .store
                    .create(&container, vec![data])
                    .await?
                    .into_iter()
                    .next()
                    .ok_or_else(|| {
                        ItemSpellsError::Store(StoreError::InvalidData(
                            "create returned no documents".to_string(),
                        ))
                    })?;
                child.uuid
            }
            None => uuid.to_string(),
        };

        let mut links = self.spell_links()?;
        links.push(SpellLink::new(stored_uuid.as_str()));
        self.persist_links(&links, UpdateOptions::silent()).await?;
        info!(
            "event=spell_link_add module=manager status=ok user={} parent={} link={stored_uuid}",
            ctx.user_id, self.parent.uuid
        );

        self.cache.invalidate();
        self.refresh().await?;
        self.renderer.render_document(&self.parent.uuid);
        if let Some(container) = &self.parent.container {
            self.renderer.render_container(container);
        }
        Ok(self.cache.items())
    }

    /// Removes the link to the child with synthetic id `child_id`.
    pub async fn remove_spell_link(
        &mut self,
        ctx: &Context,
        child_id: &str,
        options: RemoveOptions,
    ) -> ItemSpellsResult<SpellRemoval> {
        if self.cache.is_stale() {
            self.refresh().await?;
        }
        let child = self
            .cache
            .item(child_id)
            .cloned()
            .ok_or_else(|| ItemSpellsError::UnknownChildSpell(child_id.to_string()))?;

        // Materialized children are linked by their own uuid; synthesized ones
        // (unowned parents, unmaterialized or broken links) by the source uuid.
        let materialized = self.parent.is_embedded() && child.persisted;
        let uuid_to_remove = if materialized {
            child.uuid.clone()
        } else {
            child
                .known_uuid()
                .map(ToOwned::to_owned)
                .unwrap_or_else(|| child.uuid.clone())
        };

        let links: Vec<SpellLink> = self
            .spell_links()?
            .into_iter()
            .filter(|link| link.uuid != uuid_to_remove)
            .collect();
        self.cache.forget(child_id);
        self.cache.invalidate();
        self.persist_links(&links, UpdateOptions::default()).await?;
        info!(
            "event=spell_link_remove module=manager status=ok user={} parent={} link={uuid_to_remove}",
            ctx.user_id, self.parent.uuid
        );

        if !materialized {
            return Ok(SpellRemoval::Detached);
        }

        let Some(spell) = self.store.fetch_sync(&uuid_to_remove)? else {
            return Ok(SpellRemoval::AlreadyGone);
        };

        let should_delete = options.also_delete
            && (options.skip_confirmation
                || self
                    .prompt
                    .confirm(PROMPT_TITLE, DELETE_ORPHANED_SPELL_MESSAGE)
                    .await);

        if should_delete {
            self.store.delete(&spell.uuid).await?;
            info!(
                "event=child_spell_delete module=manager status=ok user={} child={}",
                ctx.user_id, spell.uuid
            );
            return Ok(SpellRemoval::Deleted);
        }

        let unlinked = self
            .store
            .unset_flag(&spell.uuid, flags::PARENT_ITEM, UpdateOptions::default())
            .await?;
        Ok(SpellRemoval::Unlinked(unlinked))
    }

    /// Replaces the stored override patch of one child in place.
    pub async fn update_overrides(
        &mut self,
        ctx: &Context,
        child_id: &str,
        overrides: OverridePatch,
    ) -> ItemSpellsResult<()> {
        if self.cache.is_stale() {
            self.refresh().await?;
        }
        let mut link_map = self.cache.links().clone();
        let Some(link) = link_map.get_mut(child_id) else {
            warn!(
                "event=overrides_update module=manager status=skip parent={} child={child_id}",
                self.parent.uuid
            );
            return Err(ItemSpellsError::UnknownChildSpell(child_id.to_string()));
        };
        link.overrides = Some(overrides);
        link.changes = None;

        let links: Vec<SpellLink> = link_map.into_values().collect();
        self.persist_links(&links, UpdateOptions::silent()).await?;
        info!(
            "event=overrides_update module=manager status=ok user={} parent={} child={child_id}",
            ctx.user_id, self.parent.uuid
        );

        self.cache.invalidate();
        self.refresh().await?;
        self.renderer.render_document(&self.parent.uuid);
        Ok(())
    }

    async fn persist_links(
        &mut self,
        links: &[SpellLink],
        options: UpdateOptions,
    ) -> ItemSpellsResult<()> {
        self.parent = self
            .store
            .set_flag(
                &self.parent.uuid,
                flags::ITEM_SPELLS,
                serde_json::to_value(links)?,
                options,
            )
            .await?;
        Ok(())
    }
}
