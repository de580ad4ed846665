//! Legacy `changes` to current `overrides` migration.
//!
//! # Responsibility
//! - Translate path-keyed legacy patches into semantic override fields.
//! - Persist migrated lists lazily, only when something changed.
//!
//! # Invariants
//! - Idempotent: migrated entries carry no `changes`, so a second pass is a
//!   no-op and reports `changed == false`.
//! - Legacy input is assumed well-formed; unknown legacy keys are dropped.

use crate::model::document::{flags, Document};
use crate::model::object_path::{expand_object, get_path, is_truthy};
use crate::model::override_patch::{
    AttackActivityOverride, ConsumptionOverride, OverridePatch, PatchScalar, SaveActivityOverride,
    UsesOverride,
};
use crate::model::spell_link::SpellLink;
use crate::repo::document_repo::{DocumentStore, StoreResult, UpdateOptions};
use log::info;
use serde_json::{Map, Value};

/// Retired recovery period mapped to "no recovery".
const RETIRED_CHARGES_PERIOD: &str = "charges";

/// Result of migrating one spell-link list.
#[derive(Debug, Clone, PartialEq)]
pub struct MigrationOutcome {
    pub links: Vec<SpellLink>,
    pub changed: bool,
}

/// Migrates every legacy entry of `links`.
pub fn migrate(links: Vec<SpellLink>) -> MigrationOutcome {
    let mut changed = false;
    let links = links
        .into_iter()
        .map(|link| {
            let (link, migrated) = migrate_link(link);
            changed |= migrated;
            link
        })
        .collect();
    MigrationOutcome { links, changed }
}

/// Migrates a single entry; returns whether it was legacy.
pub fn migrate_link(mut link: SpellLink) -> (SpellLink, bool) {
    let Some(changes) = link.changes.take() else {
        return (link, false);
    };
    let current = link.overrides.take().unwrap_or_default();
    link.overrides = Some(translate_changes(&changes, current));
    (link, true)
}

/// Migrates the parent's stored list and writes it back when needed.
///
/// The write never requests a re-render. Returns the parent as it is stored
/// after the call.
pub async fn migrate_persisted<S>(store: &S, parent: &Document) -> StoreResult<Document>
where
    S: DocumentStore + ?Sized,
{
    let outcome = migrate(parent.spell_links()?);
    if !outcome.changed {
        return Ok(parent.clone());
    }

    info!(
        "event=flag_migration module=migrator status=ok parent={} entries={}",
        parent.uuid,
        outcome.links.len()
    );
    store
        .set_flag(
            &parent.uuid,
            flags::ITEM_SPELLS,
            serde_json::to_value(&outcome.links)?,
            UpdateOptions::silent(),
        )
        .await
}

/// Legacy fields fill only what the entry's current overrides leave unset.
fn translate_changes(changes: &Map<String, Value>, mut patch: OverridePatch) -> OverridePatch {
    let legacy = expand_object(changes);
    let field = |path: &str| get_path(&legacy, path).filter(|value| !value.is_null());

    let max = field("system.uses.max").and_then(PatchScalar::from_value);
    let recovery = field("system.uses.per")
        .and_then(Value::as_str)
        .map(|period| match period {
            RETIRED_CHARGES_PERIOD => String::new(),
            other => other.to_string(),
        });
    if max.is_some() || recovery.is_some() {
        let uses = patch.uses.get_or_insert_with(UsesOverride::default);
        uses.max = uses.max.take().or(max);
        uses.recovery = uses.recovery.take().or(recovery);
    }

    let value = field("system.consume.amount").and_then(PatchScalar::from_value);
    let scaling = field("system.consume.scale").map(is_truthy);
    if value.is_some() || scaling.is_some() {
        let consumption = patch
            .consumption
            .get_or_insert_with(ConsumptionOverride::default);
        consumption.value = consumption.value.take().or(value);
        consumption.scaling = consumption.scaling.or(scaling);
    }

    let calculation = field("system.save.scaling")
        .and_then(Value::as_str)
        .map(|scaling| match scaling {
            "spell" => "spellcasting".to_string(),
            "flat" => String::new(),
            other => other.to_string(),
        });
    let formula = field("system.save.dc").and_then(PatchScalar::from_value);
    if calculation.is_some() || formula.is_some() {
        let save = patch
            .save_activity
            .get_or_insert_with(SaveActivityOverride::default);
        save.calculation = save.calculation.take().or(calculation);
        save.formula = save.formula.take().or(formula);
    }

    let bonus = field("system.attack.bonus")
        .or_else(|| field("system.attackBonus"))
        .and_then(PatchScalar::from_value);
    if bonus.is_some() {
        let attack = patch
            .attack_activity
            .get_or_insert_with(AttackActivityOverride::default);
        attack.bonus = attack.bonus.take().or(bonus);
        attack.flat = Some(true);
    }

    patch
}
