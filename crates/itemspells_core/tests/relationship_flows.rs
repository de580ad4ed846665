mod common;

use common::{
    gm, hero, links_of, parent_data, player, seed, store, fireball_data, RecordingRenderSink,
    ScriptedPrompt, FIREBALL_ID, PARENT_ID,
};
use itemspells_core::host::DELETE_ORPHANED_SPELL_MESSAGE;
use itemspells_core::model::document::ContainerRef;
use itemspells_core::model::object_path::get_path;
use itemspells_core::model::override_patch::{OverridePatch, PatchScalar, UsesOverride};
use itemspells_core::{
    Document, DocumentStore, ItemSpellManager, ItemSpellsError, RemoveOptions, SpellRemoval,
    SqliteDocumentStore,
};
use serde_json::json;
use std::sync::Arc;

const COMPENDIUM_FIREBALL: &str = "Compendium.spells.Item.fireball0000000a";

struct Fixture {
    store: Arc<SqliteDocumentStore>,
    prompt: Arc<ScriptedPrompt>,
    renderer: Arc<RecordingRenderSink>,
    manager: ItemSpellManager,
}

fn fixture(parent: Document, answer: bool) -> Fixture {
    let store = store();
    seed(&store, Document::compendium("spells", FIREBALL_ID, fireball_data()));
    let parent = seed(&store, parent);
    let prompt = ScriptedPrompt::answering(answer);
    let renderer = RecordingRenderSink::new();
    let manager = ItemSpellManager::new(parent, store.clone(), prompt.clone(), renderer.clone());
    Fixture {
        store,
        prompt,
        renderer,
        manager,
    }
}

fn owned_parent() -> Document {
    Document::embedded(hero(), PARENT_ID, parent_data(json!([])))
}

/// Owned parent with Fireball already materialized; returns the child.
async fn owned_with_child(answer: bool) -> (Fixture, Document) {
    let mut fx = fixture(owned_parent(), answer);
    let child = fx
        .manager
        .add_spell_link(&gm(), COMPENDIUM_FIREBALL)
        .await
        .unwrap()
        .values()
        .next()
        .cloned()
        .unwrap();
    (fx, child)
}

#[tokio::test]
async fn add_on_owned_parent_materializes_child() {
    let mut fx = fixture(owned_parent(), true);
    let before = links_of(fx.manager.parent()).len();

    let children = fx
        .manager
        .add_spell_link(&gm(), COMPENDIUM_FIREBALL)
        .await
        .unwrap()
        .clone();

    assert_eq!(children.len(), 1);
    let child = children.values().next().unwrap();
    assert!(child.persisted);
    assert_eq!(child.container, Some(hero()));
    assert_eq!(child.parent_reference(), Some(PARENT_ID));
    assert_eq!(child.known_uuid(), None);
    assert_eq!(
        get_path(&child.data.system, "activities.saveFireball0000.consumption"),
        Some(&json!({
            "spellSlot": false,
            "targets": [{
                "type": "itemUses",
                "target": PARENT_ID,
                "value": "1",
                "scaling": { "mode": "", "formula": "" }
            }]
        }))
    );

    let stored_parent = fx.store.fetch(&fx.manager.parent().uuid).await.unwrap().unwrap();
    assert_eq!(links_of(&stored_parent).len(), before + 1);
    assert_eq!(
        links_of(&stored_parent),
        vec![json!({ "uuid": child.uuid, "overrides": {} })]
    );

    let back_referenced = children
        .values()
        .filter(|spell| spell.parent_reference() == Some(PARENT_ID))
        .count();
    assert_eq!(back_referenced, 1);

    assert_eq!(fx.renderer.documents(), vec![stored_parent.uuid.clone()]);
    assert_eq!(fx.renderer.containers(), vec![hero().id]);
}

#[tokio::test]
async fn add_on_owned_parent_requires_existing_source() {
    let mut fx = fixture(owned_parent(), true);
    let err = fx
        .manager
        .add_spell_link(&gm(), "Compendium.spells.Item.nothing000000000")
        .await
        .unwrap_err();
    assert!(matches!(err, ItemSpellsError::SourceNotFound(_)));
    assert!(links_of(fx.manager.parent()).is_empty());
}

#[tokio::test]
async fn add_on_unowned_parent_stores_source_uuid() {
    let mut fx = fixture(Document::world(PARENT_ID, parent_data(json!([]))), true);
    let children = fx
        .manager
        .add_spell_link(&gm(), COMPENDIUM_FIREBALL)
        .await
        .unwrap()
        .clone();

    let child = &children[FIREBALL_ID];
    assert!(!child.persisted);
    assert_eq!(child.known_uuid(), Some(COMPENDIUM_FIREBALL));
    assert_eq!(
        links_of(fx.manager.parent()),
        vec![json!({ "uuid": COMPENDIUM_FIREBALL, "overrides": {} })]
    );
    assert!(fx.renderer.containers().is_empty());
}

#[tokio::test]
async fn remove_without_delete_unlinks_owned_child() {
    let (mut fx, child) = owned_with_child(true).await;

    let removal = fx
        .manager
        .remove_spell_link(&player(), &child.id, RemoveOptions::default())
        .await
        .unwrap();

    let unlinked = match removal {
        SpellRemoval::Unlinked(document) => document,
        other => panic!("expected unlink, got {other:?}"),
    };
    assert_eq!(unlinked.parent_reference(), None);
    assert!(links_of(fx.manager.parent()).is_empty());
    let stored = fx.store.fetch(&child.uuid).await.unwrap().unwrap();
    assert_eq!(stored.parent_reference(), None);
    assert!(fx.prompt.asked().is_empty());
    assert!(fx.manager.cache().item(&child.id).is_none());
}

#[tokio::test]
async fn remove_with_delete_asks_then_deletes() {
    let (mut fx, child) = owned_with_child(true).await;
    let options = RemoveOptions {
        also_delete: true,
        skip_confirmation: false,
    };

    let removal = fx
        .manager
        .remove_spell_link(&gm(), &child.id, options)
        .await
        .unwrap();

    assert_eq!(removal, SpellRemoval::Deleted);
    assert_eq!(fx.prompt.asked(), vec![DELETE_ORPHANED_SPELL_MESSAGE.to_string()]);
    assert!(fx.store.fetch(&child.uuid).await.unwrap().is_none());
}

#[tokio::test]
async fn declined_delete_falls_back_to_unlink() {
    let (mut fx, child) = owned_with_child(false).await;
    let options = RemoveOptions {
        also_delete: true,
        skip_confirmation: false,
    };

    let removal = fx
        .manager
        .remove_spell_link(&gm(), &child.id, options)
        .await
        .unwrap();

    assert!(matches!(removal, SpellRemoval::Unlinked(_)));
    assert_eq!(fx.prompt.asked().len(), 1);
    assert!(fx.store.fetch(&child.uuid).await.unwrap().is_some());
}

#[tokio::test]
async fn confirmed_delete_skips_prompt() {
    let (mut fx, child) = owned_with_child(false).await;
    let options = RemoveOptions {
        also_delete: true,
        skip_confirmation: true,
    };

    let removal = fx
        .manager
        .remove_spell_link(&gm(), &child.id, options)
        .await
        .unwrap();

    assert_eq!(removal, SpellRemoval::Deleted);
    assert!(fx.prompt.asked().is_empty());
}

#[tokio::test]
async fn remove_from_unowned_parent_only_detaches() {
    let parent = Document::world(
        PARENT_ID,
        parent_data(json!([{ "uuid": COMPENDIUM_FIREBALL, "overrides": {} }])),
    );
    let mut fx = fixture(parent, true);

    let removal = fx
        .manager
        .remove_spell_link(&gm(), FIREBALL_ID, RemoveOptions::default())
        .await
        .unwrap();

    assert_eq!(removal, SpellRemoval::Detached);
    assert!(links_of(fx.manager.parent()).is_empty());
    assert!(fx.store.fetch(COMPENDIUM_FIREBALL).await.unwrap().is_some());
}

#[tokio::test]
async fn broken_link_on_owned_parent_is_removed() {
    let parent = Document::embedded(
        hero(),
        PARENT_ID,
        parent_data(json!([
            { "uuid": "Compendium.spells.Item.gone000000000000", "overrides": {} }
        ])),
    );
    let mut fx = fixture(parent, true);
    let options = RemoveOptions {
        also_delete: true,
        skip_confirmation: true,
    };

    let removal = fx
        .manager
        .remove_spell_link(&gm(), "gone000000000000", options)
        .await
        .unwrap();

    assert_eq!(removal, SpellRemoval::Detached);
    assert!(links_of(fx.manager.parent()).is_empty());
    let stored = fx.store.fetch(&fx.manager.parent().uuid).await.unwrap().unwrap();
    assert!(links_of(&stored).is_empty());
}

#[tokio::test]
async fn unmaterialized_link_on_vehicle_item_keeps_source() {
    let vehicle = ContainerRef::new("cart000000000000", "vehicle");
    let parent = Document::embedded(
        vehicle,
        PARENT_ID,
        parent_data(json!([{ "uuid": COMPENDIUM_FIREBALL, "overrides": {} }])),
    );
    let mut fx = fixture(parent, true);
    let options = RemoveOptions {
        also_delete: true,
        skip_confirmation: true,
    };

    let removal = fx
        .manager
        .remove_spell_link(&gm(), FIREBALL_ID, options)
        .await
        .unwrap();

    assert_eq!(removal, SpellRemoval::Detached);
    assert!(links_of(fx.manager.parent()).is_empty());
    assert!(fx.store.fetch(COMPENDIUM_FIREBALL).await.unwrap().is_some());
}

#[tokio::test]
async fn remove_unknown_child_is_an_error() {
    let mut fx = fixture(owned_parent(), true);
    let err = fx
        .manager
        .remove_spell_link(&gm(), "nope000000000000", RemoveOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ItemSpellsError::UnknownChildSpell(_)));
}

#[tokio::test]
async fn update_overrides_replaces_patch_in_place() {
    let parent = Document::world(
        PARENT_ID,
        parent_data(json!([
            { "uuid": COMPENDIUM_FIREBALL, "changes": { "system.uses.max": 2 } },
            { "uuid": "Item.other0000000000" }
        ])),
    );
    let mut fx = fixture(parent, true);
    let patch = OverridePatch {
        uses: Some(UsesOverride {
            max: Some(PatchScalar::from(4_i64)),
            recovery: None,
        }),
        ..OverridePatch::default()
    };

    fx.manager
        .update_overrides(&gm(), FIREBALL_ID, patch)
        .await
        .unwrap();

    assert_eq!(
        links_of(fx.manager.parent()),
        vec![
            json!({ "uuid": COMPENDIUM_FIREBALL, "overrides": { "uses": { "max": 4 } } }),
            json!({ "uuid": "Item.other0000000000" }),
        ]
    );
    let child = fx.manager.cache().item(FIREBALL_ID).unwrap();
    assert_eq!(get_path(&child.data.system, "uses.max"), Some(&json!(4)));
    assert_eq!(fx.renderer.documents(), vec![format!("Item.{PARENT_ID}")]);
}
