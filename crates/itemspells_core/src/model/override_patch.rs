//! Current-schema override patch.
//!
//! A patch is sparse: every field is optional and an unset field means
//! "keep the spell's own value".

use crate::model::object_path::is_truthy;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::fmt::{Display, Formatter};

/// Sentinel meaning "do not override" for ability/calculation selects.
pub const NO_OVERRIDE: &str = "noOverride";

/// Charges spent per cast when a spell is materialized without explicit overrides.
pub const DEFAULT_CHARGE_COST: i64 = 1;

/// Number-or-formula value as entered in the overrides form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PatchScalar {
    Number(Number),
    Text(String),
}

impl PatchScalar {
    /// Reads a scalar from arbitrary JSON; objects, arrays and null yield `None`.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(number) => Some(Self::Number(number.clone())),
            Value::String(text) => Some(Self::Text(text.clone())),
            _ => None,
        }
    }

    /// Present and truthy.
    pub fn is_set(&self) -> bool {
        is_truthy(&self.to_value())
    }

    pub fn to_value(&self) -> Value {
        match self {
            Self::Number(number) => Value::Number(number.clone()),
            Self::Text(text) => Value::String(text.clone()),
        }
    }
}

impl Display for PatchScalar {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(number) => write!(f, "{number}"),
            Self::Text(text) => f.write_str(text),
        }
    }
}

impl From<i64> for PatchScalar {
    fn from(value: i64) -> Self {
        Self::Number(Number::from(value))
    }
}

impl From<&str> for PatchScalar {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsesOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<PatchScalar>,
    /// Recovery period tag (`day`, `lr`, ...); empty means no recovery.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recovery: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConsumptionOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<PatchScalar>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scaling: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SaveActivityOverride {
    /// `noOverride`, `""` (flat formula), `spellcasting` or an ability key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calculation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula: Option<PatchScalar>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttackActivityOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ability: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bonus: Option<PatchScalar>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flat: Option<bool>,
}

/// Sparse deviations from a spell's own data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverridePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uses: Option<UsesOverride>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consumption: Option<ConsumptionOverride>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub save_activity: Option<SaveActivityOverride>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attack_activity: Option<AttackActivityOverride>,
}

impl OverridePatch {
    /// Patch used when a spell is materialized on an owned parent without
    /// stored overrides: each cast spends one charge of the parent.
    pub fn materialization_default() -> Self {
        Self {
            consumption: Some(ConsumptionOverride {
                value: Some(PatchScalar::from(DEFAULT_CHARGE_COST)),
                scaling: None,
            }),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}
