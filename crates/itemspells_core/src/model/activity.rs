//! Activity entries exposed by spell data under `system.activities`.

use serde_json::Value;

/// Closed set of activity kinds the compiler distinguishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivityKind {
    Save,
    Attack,
    Other(String),
}

impl ActivityKind {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "save" => Self::Save,
            "attack" => Self::Attack,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Save => "save",
            Self::Attack => "attack",
            Self::Other(tag) => tag,
        }
    }
}

/// Borrowed view of one activity.
#[derive(Debug, Clone)]
pub struct ActivityRef<'a> {
    pub id: &'a str,
    pub kind: ActivityKind,
    pub data: &'a Value,
}

impl<'a> ActivityRef<'a> {
    /// Path prefix of this activity inside document data.
    pub fn path(&self) -> String {
        format!("system.activities.{}", self.id)
    }

    pub fn field(&self, path: &str) -> Option<&'a Value> {
        crate::model::object_path::get_path(self.data, path)
    }
}

/// Lists the activities of `system` in storage order.
pub fn activities(system: &Value) -> Vec<ActivityRef<'_>> {
    let Some(entries) = system.get("activities").and_then(Value::as_object) else {
        return Vec::new();
    };
    entries
        .iter()
        .map(|(id, data)| ActivityRef {
            id: id.as_str(),
            kind: ActivityKind::from_tag(data.get("type").and_then(Value::as_str).unwrap_or("")),
            data,
        })
        .collect()
}

/// First activity of `kind`, if any.
pub fn first_of_kind<'a>(system: &'a Value, kind: &ActivityKind) -> Option<ActivityRef<'a>> {
    activities(system)
        .into_iter()
        .find(|activity| &activity.kind == kind)
}
