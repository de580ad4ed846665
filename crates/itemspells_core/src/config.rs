//! Module settings and logging configuration.
//!
//! # Responsibility
//! - Load the JSON configuration file used by tools embedding the core.
//! - Answer item-type eligibility for the spells tab and lifecycle hooks.
//!
//! # Invariants
//! - Every field has a default; an empty `{}` file is a valid config.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

const DEFAULT_INCLUDED_ITEM_TYPES: &[&str] =
    &["weapon", "equipment", "consumable", "tool", "loot", "container"];
const DEFAULT_MAX_LOG_FILE_SIZE_BYTES: u64 = 10 * 1024 * 1024;
const DEFAULT_MAX_LOG_FILES: usize = 5;

/// Answers whether an item type may carry child spells.
pub trait TypeEligibility: Send + Sync {
    fn is_type_included(&self, type_tag: &str) -> bool;
}

/// Per-world module settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ModuleSettings {
    /// Item types that show the spells tab and materialize child spells.
    pub included_item_types: BTreeSet<String>,
    /// Hide spells of items that are not equipped.
    pub exclude_unequipped: bool,
}

impl Default for ModuleSettings {
    fn default() -> Self {
        Self {
            included_item_types: DEFAULT_INCLUDED_ITEM_TYPES
                .iter()
                .map(|value| value.to_string())
                .collect(),
            exclude_unequipped: false,
        }
    }
}

impl TypeEligibility for ModuleSettings {
    fn is_type_included(&self, type_tag: &str) -> bool {
        self.included_item_types.contains(type_tag.trim())
    }
}

/// Rolling file log settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LogSettings {
    /// One of `trace|debug|info|warn|error`.
    pub level: String,
    /// Absolute directory for log files; `None` disables file logging.
    pub dir: Option<PathBuf>,
    pub max_file_size_bytes: u64,
    pub max_files: usize,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: crate::logging::default_log_level().to_string(),
            dir: None,
            max_file_size_bytes: DEFAULT_MAX_LOG_FILE_SIZE_BYTES,
            max_files: DEFAULT_MAX_LOG_FILES,
        }
    }
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub settings: ModuleSettings,
    pub logging: LogSettings,
}

impl CoreConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(raw).map_err(ConfigError::Parse)
    }

    /// Reads and parses a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse(serde_json::Error),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid config: {err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Read { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
        }
    }
}
