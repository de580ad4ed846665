//! Dotted-path access into JSON document data.
//!
//! Paths use `.` as the only separator (`system.uses.max`). Keys that contain
//! a dot cannot be addressed.

use serde_json::{Map, Value};

/// A single change to apply at a dotted path.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldChange {
    Set(Value),
    Unset,
}

/// Ordered set of field assignments produced by override compilation.
///
/// # Invariants
/// - Assignments apply in insertion order; a later write to the same path wins.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldAssignmentSet {
    entries: Vec<(String, FieldChange)>,
}

impl FieldAssignmentSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, path: impl Into<String>, value: Value) -> &mut Self {
        self.entries.push((path.into(), FieldChange::Set(value)));
        self
    }

    pub fn unset(&mut self, path: impl Into<String>) -> &mut Self {
        self.entries.push((path.into(), FieldChange::Unset));
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldChange)> {
        self.entries
            .iter()
            .map(|(path, change)| (path.as_str(), change))
    }

    /// Returns the effective change for `path`, if any.
    pub fn get(&self, path: &str) -> Option<&FieldChange> {
        self.entries
            .iter()
            .rev()
            .find(|(candidate, _)| candidate == path)
            .map(|(_, change)| change)
    }

    /// Writes every assignment into `root`, creating intermediate objects.
    pub fn apply_to(&self, root: &mut Value) {
        for (path, change) in &self.entries {
            match change {
                FieldChange::Set(value) => set_path(root, path, value.clone()),
                FieldChange::Unset => {
                    unset_path(root, path);
                }
            }
        }
    }
}

/// Reads the value at `path`.
pub fn get_path<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(root, |node, key| node.as_object()?.get(key))
}

/// Writes `value` at `path`, replacing any non-object node along the way.
pub fn set_path(root: &mut Value, path: &str, value: Value) {
    let (parents, leaf) = split_leaf(path);
    let mut node = root;
    if let Some(parents) = parents {
        for key in parents.split('.') {
            node = ensure_object(node)
                .entry(key.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
        }
    }
    ensure_object(node).insert(leaf.to_string(), value);
}

/// Removes the value at `path`, returning it when present.
pub fn unset_path(root: &mut Value, path: &str) -> Option<Value> {
    let (parents, leaf) = split_leaf(path);
    let mut node = root;
    if let Some(parents) = parents {
        for key in parents.split('.') {
            node = node.as_object_mut()?.get_mut(key)?;
        }
    }
    node.as_object_mut()?.remove(leaf)
}

/// Expands a flat object keyed by dotted paths into a nested object.
pub fn expand_object(flat: &Map<String, Value>) -> Value {
    let mut expanded = Value::Object(Map::new());
    for (path, value) in flat {
        set_path(&mut expanded, path, value.clone());
    }
    expanded
}

/// JavaScript-style truthiness, used for sparse patch fields.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn split_leaf(path: &str) -> (Option<&str>, &str) {
    match path.rsplit_once('.') {
        Some((parents, leaf)) => (Some(parents), leaf),
        None => (None, path),
    }
}

fn ensure_object(node: &mut Value) -> &mut Map<String, Value> {
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    match node {
        Value::Object(map) => map,
        _ => unreachable!("node was replaced with an object above"),
    }
}
