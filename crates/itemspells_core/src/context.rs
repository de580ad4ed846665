//! Per-operation caller context.
//!
//! Replaces ambient globals (current user, game system version): every
//! service call receives one explicitly.

/// Identity and environment of the caller performing an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Context {
    pub user_id: String,
    /// Privileged (game master) caller.
    pub is_gm: bool,
    /// Version of the active game system, dotted numeric (`4.1.2`).
    pub system_version: String,
}

impl Context {
    pub fn new(user_id: impl Into<String>, is_gm: bool, system_version: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            is_gm,
            system_version: system_version.into(),
        }
    }

    /// True when a hook fired for `acting_user_id` should be handled here.
    pub fn is_acting_user(&self, acting_user_id: &str) -> bool {
        self.user_id == acting_user_id
    }

    /// True when the active system version is strictly newer than `target`.
    pub fn system_newer_than(&self, target: &str) -> bool {
        is_newer_version(&self.system_version, target)
    }
}

/// Compares dotted numeric versions; missing or non-numeric parts count as 0.
pub fn is_newer_version(version: &str, target: &str) -> bool {
    let left = version_parts(version);
    let right = version_parts(target);
    let len = left.len().max(right.len());
    for index in 0..len {
        let a = left.get(index).copied().unwrap_or(0);
        let b = right.get(index).copied().unwrap_or(0);
        if a != b {
            return a > b;
        }
    }
    false
}

fn version_parts(version: &str) -> Vec<u64> {
    version
        .trim()
        .split('.')
        .map(|part| part.parse().unwrap_or(0))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{is_newer_version, Context};

    #[test]
    fn version_comparison_is_numeric() {
        assert!(is_newer_version("4.0.0", "3.1.99"));
        assert!(is_newer_version("3.1.100", "3.1.99"));
        assert!(!is_newer_version("3.1.99", "3.1.99"));
        assert!(!is_newer_version("3.1", "3.1.99"));
        assert!(is_newer_version("10", "9.9.9"));
    }

    #[test]
    fn acting_user_must_match_context() {
        let ctx = Context::new("player-1", false, "4.1.0");
        assert!(ctx.is_acting_user("player-1"));
        assert!(!ctx.is_acting_user("gm"));
        assert!(ctx.system_newer_than("3.1.99"));
    }
}
