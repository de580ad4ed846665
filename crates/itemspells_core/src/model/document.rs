//! Item document model.
//!
//! # Responsibility
//! - Define the host document shape (`Document` + raw `DocumentData`).
//! - Provide flag accessors for the module-scoped relationship flags.
//!
//! # Invariants
//! - `uuid` is derived from `id` plus its owner (world, compendium pack or
//!   container); it is never edited independently.
//! - `persisted == false` marks synthesized children and placeholders.

use crate::model::object_path::{get_path, FieldAssignmentSet};
use crate::model::spell_link::SpellLink;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Flag namespace owned by this crate.
pub const MODULE_ID: &str = "items-with-spells-5e";

/// Flag keys under [`MODULE_ID`].
pub mod flags {
    /// Ordered spell-link list on a parent item.
    pub const ITEM_SPELLS: &str = "item-spells";
    /// Back-reference from an owned child to its parent (id or uuid).
    pub const PARENT_ITEM: &str = "parent-item";
    /// Source reference recorded on synthesized children.
    pub const KNOWN_UUID: &str = "original-uuid";
}

/// Section grouping tag written by a third-party sheet.
pub const SHEET_SECTION_FLAG_PATH: &str = "flags.tidy5e-sheet.section";

/// Item type tag for spells.
pub const SPELL_TYPE: &str = "spell";

const DOCUMENT_ID_LEN: usize = 16;

/// Stable document identifier (16 alphanumeric chars for created documents).
pub type DocumentId = String;

/// Returns the dotted path of a module flag, e.g. `flags.<ns>.parent-item`.
pub fn flag_path(key: &str) -> String {
    format!("flags.{MODULE_ID}.{key}")
}

/// Returns the last `.`-separated segment of a uuid.
pub fn synthetic_id(uuid: &str) -> &str {
    uuid.rsplit('.').next().unwrap_or(uuid)
}

/// Generates a fresh document id.
pub fn new_document_id() -> DocumentId {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(DOCUMENT_ID_LEN);
    id
}

/// Owning container (actor) of an embedded document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContainerRef {
    pub id: String,
    /// Container type tag, e.g. `character`, `npc`, `group`, `vehicle`.
    pub kind: String,
}

impl ContainerRef {
    pub fn new(id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
        }
    }

    /// Group and vehicle containers never host child spells.
    pub fn supports_child_spells(&self) -> bool {
        !matches!(self.kind.as_str(), "group" | "vehicle")
    }

    pub fn uuid(&self) -> String {
        format!("Actor.{}", self.id)
    }
}

/// Raw document source data, as cloned and patched by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentData {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub img: Option<String>,
    #[serde(rename = "type")]
    pub doc_type: String,
    #[serde(default = "empty_object")]
    pub system: Value,
    #[serde(default)]
    pub flags: Map<String, Value>,
}

impl DocumentData {
    pub fn new(name: impl Into<String>, doc_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            img: None,
            doc_type: doc_type.into(),
            system: empty_object(),
            flags: Map::new(),
        }
    }

    pub fn with_system(mut self, system: Value) -> Self {
        self.system = system;
        self
    }

    pub fn with_img(mut self, img: impl Into<String>) -> Self {
        self.img = Some(img.into());
        self
    }

    /// Returns a copy with `changes` applied.
    pub fn apply(&self, changes: &FieldAssignmentSet) -> Result<Self, serde_json::Error> {
        let mut raw = serde_json::to_value(self)?;
        changes.apply_to(&mut raw);
        serde_json::from_value(raw)
    }

    pub fn get_flag(&self, key: &str) -> Option<&Value> {
        self.flags.get(MODULE_ID)?.get(key)
    }

    pub fn set_flag(&mut self, key: &str, value: Value) {
        let scope = self
            .flags
            .entry(MODULE_ID.to_string())
            .or_insert_with(empty_object);
        if !scope.is_object() {
            *scope = empty_object();
        }
        if let Value::Object(scope) = scope {
            scope.insert(key.to_string(), value);
        }
    }

    pub fn clear_flag(&mut self, key: &str) {
        if let Some(Value::Object(scope)) = self.flags.get_mut(MODULE_ID) {
            scope.remove(key);
        }
    }

    pub fn system_field(&self, path: &str) -> Option<&Value> {
        get_path(&self.system, path)
    }

    pub fn has_flag_path(&self, path: &str) -> bool {
        path.strip_prefix("flags.")
            .and_then(|rest| get_path_in_map(&self.flags, rest))
            .is_some()
    }
}

/// Host document: identity, ownership and raw data.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: DocumentId,
    pub uuid: String,
    pub container: Option<ContainerRef>,
    pub pack: Option<String>,
    pub persisted: bool,
    pub data: DocumentData,
}

impl Document {
    /// A world-level (sidebar) item, uuid `Item.<id>`.
    pub fn world(id: impl Into<String>, data: DocumentData) -> Self {
        let id = id.into();
        Self {
            uuid: format!("Item.{id}"),
            id,
            container: None,
            pack: None,
            persisted: true,
            data,
        }
    }

    /// A compendium item, uuid `Compendium.<pack>.Item.<id>`.
    pub fn compendium(pack: impl Into<String>, id: impl Into<String>, data: DocumentData) -> Self {
        let pack = pack.into();
        let id = id.into();
        Self {
            uuid: format!("Compendium.{pack}.Item.{id}"),
            id,
            container: None,
            pack: Some(pack),
            persisted: true,
            data,
        }
    }

    /// An item owned by `container`, uuid `Actor.<container>.Item.<id>`.
    pub fn embedded(container: ContainerRef, id: impl Into<String>, data: DocumentData) -> Self {
        let id = id.into();
        Self {
            uuid: format!("{}.Item.{id}", container.uuid()),
            id,
            container: Some(container),
            pack: None,
            persisted: true,
            data,
        }
    }

    /// A non-persisted document, optionally parented under `container`.
    pub fn temporary(
        id: impl Into<String>,
        container: Option<ContainerRef>,
        data: DocumentData,
    ) -> Self {
        let mut document = match container {
            Some(container) => Self::embedded(container, id, data),
            None => Self::world(id, data),
        };
        document.persisted = false;
        document
    }

    pub fn name(&self) -> &str {
        &self.data.name
    }

    pub fn doc_type(&self) -> &str {
        &self.data.doc_type
    }

    pub fn is_embedded(&self) -> bool {
        self.container.is_some()
    }

    pub fn get_flag(&self, key: &str) -> Option<&Value> {
        self.data.get_flag(key)
    }

    /// Value of the `parent-item` back-reference, if set.
    pub fn parent_reference(&self) -> Option<&str> {
        self.get_flag(flags::PARENT_ITEM).and_then(Value::as_str)
    }

    /// Value of the `original-uuid` flag, if set.
    pub fn known_uuid(&self) -> Option<&str> {
        self.get_flag(flags::KNOWN_UUID).and_then(Value::as_str)
    }

    /// True when `reference` names this document by id or uuid.
    pub fn is_referenced_by(&self, reference: &str) -> bool {
        reference == self.id || reference == self.uuid
    }

    /// True when this document's back-reference names `parent`.
    pub fn is_child_of(&self, parent: &Document) -> bool {
        self.parent_reference()
            .is_some_and(|reference| parent.is_referenced_by(reference))
    }

    /// `system.identified === false`; absent means identified.
    pub fn is_unidentified(&self) -> bool {
        self.data.system_field("identified") == Some(&Value::Bool(false))
    }

    /// Parses the `item-spells` flag; an absent flag is an empty list.
    pub fn spell_links(&self) -> Result<Vec<SpellLink>, serde_json::Error> {
        match self.get_flag(flags::ITEM_SPELLS) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(value) => serde_json::from_value(value.clone()),
        }
    }
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

fn get_path_in_map<'a>(map: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let (head, rest) = match path.split_once('.') {
        Some((head, rest)) => (head, Some(rest)),
        None => (path, None),
    };
    let node = map.get(head)?;
    match rest {
        Some(rest) => get_path(node, rest),
        None => Some(node),
    }
}
