#![allow(dead_code)]

use async_trait::async_trait;
use itemspells_core::model::document::{flags, ContainerRef, Document, DocumentData};
use itemspells_core::{ConfirmPrompt, Context, RenderSink, SqliteDocumentStore};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

pub const PARENT_ID: &str = "wand0000000000aa";
pub const FIREBALL_ID: &str = "fireball0000000a";
pub const RAY_ID: &str = "scorchray000000a";

pub fn store() -> Arc<SqliteDocumentStore> {
    Arc::new(SqliteDocumentStore::open_in_memory().unwrap())
}

pub fn hero() -> ContainerRef {
    ContainerRef::new("hero000000000000", "character")
}

pub fn gm() -> Context {
    Context::new("gm", true, "4.1.0")
}

pub fn player() -> Context {
    Context::new("player", false, "4.1.0")
}

/// Spell with one save activity.
pub fn fireball_data() -> DocumentData {
    DocumentData::new("Fireball", "spell")
        .with_img("icons/fireball.webp")
        .with_system(json!({
            "level": 3,
            "preparation": { "mode": "prepared" },
            "uses": { "max": "", "spent": 2, "recovery": [] },
            "activities": {
                "saveFireball0000": {
                    "type": "save",
                    "consumption": { "spellSlot": true, "targets": [] },
                    "save": { "ability": ["dex"], "dc": { "calculation": "spellcasting", "formula": "" } }
                }
            }
        }))
}

/// Spell with one attack activity.
pub fn scorching_ray_data() -> DocumentData {
    DocumentData::new("Scorching Ray", "spell").with_system(json!({
        "level": 2,
        "preparation": { "mode": "prepared" },
        "activities": {
            "attackRay0000000": {
                "type": "attack",
                "consumption": { "spellSlot": true, "targets": [] },
                "attack": { "ability": "", "bonus": "", "flat": false }
            }
        }
    }))
}

pub fn parent_data(links: Value) -> DocumentData {
    let mut data = DocumentData::new("Wand of Fire", "equipment").with_system(json!({
        "identified": true,
        "uses": { "max": 7 }
    }));
    data.set_flag(flags::ITEM_SPELLS, links);
    data
}

pub fn seed(store: &SqliteDocumentStore, document: Document) -> Document {
    store.insert(&document).unwrap();
    document
}

pub fn seed_world_spells(store: &SqliteDocumentStore) -> (Document, Document) {
    (
        seed(store, Document::world(FIREBALL_ID, fireball_data())),
        seed(store, Document::world(RAY_ID, scorching_ray_data())),
    )
}

pub fn links_of(document: &Document) -> Vec<Value> {
    match document.get_flag(flags::ITEM_SPELLS) {
        Some(Value::Array(links)) => links.clone(),
        _ => Vec::new(),
    }
}

/// Prompt double that answers from a script and records every question.
pub struct ScriptedPrompt {
    answer: bool,
    asked: Mutex<Vec<String>>,
}

impl ScriptedPrompt {
    pub fn answering(answer: bool) -> Arc<Self> {
        Arc::new(Self {
            answer,
            asked: Mutex::new(Vec::new()),
        })
    }

    pub fn asked(&self) -> Vec<String> {
        self.asked.lock().unwrap().clone()
    }
}

#[async_trait]
impl ConfirmPrompt for ScriptedPrompt {
    async fn confirm(&self, _title: &str, message: &str) -> bool {
        self.asked.lock().unwrap().push(message.to_string());
        self.answer
    }
}

#[derive(Default)]
pub struct RecordingRenderSink {
    documents: Mutex<Vec<String>>,
    containers: Mutex<Vec<String>>,
}

impl RecordingRenderSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn documents(&self) -> Vec<String> {
        self.documents.lock().unwrap().clone()
    }

    pub fn containers(&self) -> Vec<String> {
        self.containers.lock().unwrap().clone()
    }
}

impl RenderSink for RecordingRenderSink {
    fn render_document(&self, uuid: &str) {
        self.documents.lock().unwrap().push(uuid.to_string());
    }

    fn render_container(&self, container: &ContainerRef) {
        self.containers.lock().unwrap().push(container.id.clone());
    }
}
