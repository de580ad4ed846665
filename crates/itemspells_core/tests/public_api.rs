mod common;

use common::{
    fireball_data, hero, parent_data, seed, seed_world_spells, store, FIREBALL_ID, PARENT_ID,
    RAY_ID,
};
use itemspells_core::model::document::{flags, DocumentData};
use itemspells_core::{
    build_spells_tab, get_child_spells, get_parent_item, get_parent_reference_id, is_linked_item,
    Context, Document,
};
use serde_json::json;

fn owned_child(id: &str, reference: &str) -> Document {
    let mut data = fireball_data();
    data.set_flag(flags::PARENT_ITEM, json!(reference));
    Document::embedded(hero(), id, data)
}

#[test]
fn linked_item_reports_links_only_when_present() {
    let linked = Document::world(PARENT_ID, parent_data(json!([{ "uuid": "Item.a" }])));
    assert_eq!(is_linked_item(&linked).map(|links| links.len()), Some(1));

    let empty = Document::world(PARENT_ID, parent_data(json!([])));
    assert!(is_linked_item(&empty).is_none());

    let malformed = Document::world(PARENT_ID, parent_data(json!("not a list")));
    assert!(is_linked_item(&malformed).is_none());
}

#[test]
fn parent_reference_is_raw_flag_value() {
    let child = owned_child("child1000000000a", "Actor.hero000000000000.Item.wand0000000000aa");
    assert_eq!(
        get_parent_reference_id(&child),
        Some("Actor.hero000000000000.Item.wand0000000000aa")
    );
    let plain = Document::world("plain00000000000", DocumentData::new("Light", "spell"));
    assert_eq!(get_parent_reference_id(&plain), None);
}

#[tokio::test]
async fn parent_item_is_found_among_container_items() {
    let store = store();
    let parent = seed(
        &store,
        Document::embedded(hero(), PARENT_ID, parent_data(json!([]))),
    );
    let child = seed(&store, owned_child("child1000000000a", &parent.uuid));

    let found = get_parent_item(store.as_ref(), &child, true, None)
        .await
        .unwrap();
    assert_eq!(found, Some(parent.clone()));

    let provided = vec![parent.clone()];
    let from_provided =
        get_parent_item(store.as_ref(), &child, false, Some(provided.as_slice()))
            .await
            .unwrap();
    assert_eq!(from_provided, Some(parent));

    let none = get_parent_item(store.as_ref(), &child, false, Some(&[][..]))
        .await
        .unwrap();
    assert!(none.is_none());
}

#[tokio::test]
async fn parent_item_of_unowned_spell_is_fetched_by_uuid() {
    let store = store();
    let parent = seed(&store, Document::world(PARENT_ID, parent_data(json!([]))));
    let mut data = DocumentData::new("Light", "spell");
    data.set_flag(flags::PARENT_ITEM, json!(parent.uuid));
    let spell = Document::world("light00000000000", data);

    assert_eq!(
        get_parent_item(store.as_ref(), &spell, false, None)
            .await
            .unwrap(),
        Some(parent)
    );
    assert!(get_parent_item(store.as_ref(), &spell, true, None)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn child_spells_filter_container_items_or_resolve() {
    let store = store();
    seed_world_spells(&store);
    let parent = seed(
        &store,
        Document::embedded(
            hero(),
            PARENT_ID,
            parent_data(json!([{ "uuid": "Actor.hero000000000000.Item.child1000000000a" }])),
        ),
    );
    seed(&store, owned_child("child1000000000a", PARENT_ID));
    seed(&store, owned_child("child2000000000a", "someoneelse00000"));

    let embedded = get_child_spells(store.as_ref(), &parent, true, None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(embedded.keys().collect::<Vec<_>>(), vec!["child1000000000a"]);

    let world = Document::world(
        PARENT_ID,
        parent_data(json!([
            { "uuid": format!("Item.{FIREBALL_ID}") },
            { "uuid": format!("Item.{RAY_ID}"), "changes": { "system.uses.max": 2 } }
        ])),
    );
    assert!(get_child_spells(store.as_ref(), &world, true, None)
        .await
        .unwrap()
        .is_none());
    let resolved = get_child_spells(store.as_ref(), &world, false, None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        resolved.keys().collect::<Vec<_>>(),
        vec![FIREBALL_ID, RAY_ID]
    );
    assert!(resolved.values().all(|child| !child.persisted));

    let bare = Document::world("bare000000000000", DocumentData::new("Rock", "loot"));
    assert!(get_child_spells(store.as_ref(), &bare, false, None)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn tab_view_lists_resolved_children() {
    let store = store();
    seed_world_spells(&store);
    let parent = Document::world(
        PARENT_ID,
        parent_data(json!([
            { "uuid": format!("Item.{RAY_ID}") },
            { "uuid": format!("Item.{FIREBALL_ID}") }
        ])),
    );
    let children = get_child_spells(store.as_ref(), &parent, false, None)
        .await
        .unwrap()
        .unwrap();

    let tab = build_spells_tab(&Context::new("gm", true, "4.1.0"), &parent, &children);
    let names: Vec<&str> = tab.rows.iter().map(|row| row.name.as_str()).collect();
    assert_eq!(names, vec!["Scorching Ray", "Fireball"]);
    assert!(tab.rows[0].attack.is_some());
    assert!(tab.rows[1].save.is_some());
    assert!(!tab.conceal_details);
}
