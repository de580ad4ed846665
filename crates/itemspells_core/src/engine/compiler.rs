//! Override patch compilation.
//!
//! # Responsibility
//! - Turn a sparse `OverridePatch` into concrete assignments on spell data.
//!
//! # Invariants
//! - Pure: same inputs always yield the same assignment set.
//! - Absent or falsy patch fields mean "no override".

use crate::model::activity::{activities, ActivityKind, ActivityRef};
use crate::model::document::{flag_path, flags, DocumentData, SHEET_SECTION_FLAG_PATH};
use crate::model::object_path::FieldAssignmentSet;
use crate::model::override_patch::{
    AttackActivityOverride, ConsumptionOverride, OverridePatch, SaveActivityOverride, UsesOverride,
    NO_OVERRIDE,
};
use serde_json::{json, Value};

/// Preparation mode forced on every child spell.
pub const AT_WILL_MODE: &str = "atwill";
/// Consumption target type that spends the parent item's charges.
pub const ITEM_USES_TARGET: &str = "itemUses";
/// Recovery type written with an overridden recovery period.
pub const RECOVER_ALL: &str = "recoverAll";

/// Compiles `patch` against `source` for a child of `parent_id`.
pub fn compile(parent_id: &str, source: &DocumentData, patch: &OverridePatch) -> FieldAssignmentSet {
    let mut update = FieldAssignmentSet::new();
    update.set(flag_path(flags::PARENT_ITEM), Value::String(parent_id.to_string()));
    update.set("system.preparation.mode", json!(AT_WILL_MODE));
    update.set("system.uses.spent", json!(0));

    if source.has_flag_path(SHEET_SECTION_FLAG_PATH) {
        update.unset(SHEET_SECTION_FLAG_PATH);
    }

    if let Some(uses) = &patch.uses {
        compile_uses(&mut update, uses);
    }

    let target = patch
        .consumption
        .as_ref()
        .and_then(|consumption| consumption_target(parent_id, consumption));

    for activity in activities(&source.system) {
        let prefix = activity.path();
        update.set(format!("{prefix}.consumption.spellSlot"), Value::Bool(false));
        if let Some(target) = &target {
            update.set(
                format!("{prefix}.consumption.targets"),
                Value::Array(vec![target.clone()]),
            );
        }

        match activity.kind {
            ActivityKind::Save => {
                if let Some(save) = &patch.save_activity {
                    compile_save(&mut update, &activity, save);
                }
            }
            ActivityKind::Attack => {
                if let Some(attack) = &patch.attack_activity {
                    compile_attack(&mut update, &activity, attack);
                }
            }
            ActivityKind::Other(_) => {}
        }
    }

    update
}

fn compile_uses(update: &mut FieldAssignmentSet, uses: &UsesOverride) {
    let Some(max) = uses.max.as_ref().filter(|max| max.is_set()) else {
        return;
    };
    update.set("system.uses.max", max.to_value());

    let recovery = match uses.recovery.as_deref().filter(|period| !period.is_empty()) {
        Some(period) => json!([{ "period": period, "type": RECOVER_ALL }]),
        None => json!([]),
    };
    update.set("system.uses.recovery", recovery);
}

fn consumption_target(parent_id: &str, consumption: &ConsumptionOverride) -> Option<Value> {
    let value = consumption.value.as_ref().filter(|value| value.is_set())?;
    let scaling_mode = if consumption.scaling.unwrap_or(false) {
        "amount"
    } else {
        ""
    };
    Some(json!({
        "type": ITEM_USES_TARGET,
        "target": parent_id,
        "value": value.to_string(),
        "scaling": { "mode": scaling_mode, "formula": "" }
    }))
}

fn compile_save(
    update: &mut FieldAssignmentSet,
    activity: &ActivityRef<'_>,
    save: &SaveActivityOverride,
) {
    let Some(calculation) = save.calculation.as_deref() else {
        return;
    };
    if calculation == NO_OVERRIDE {
        return;
    }

    let prefix = activity.path();
    update.set(format!("{prefix}.save.dc.calculation"), json!(calculation));
    if calculation.is_empty() {
        if let Some(formula) = save.formula.as_ref().filter(|formula| formula.is_set()) {
            update.set(format!("{prefix}.save.dc.formula"), json!(formula.to_string()));
        }
    }
}

fn compile_attack(
    update: &mut FieldAssignmentSet,
    activity: &ActivityRef<'_>,
    attack: &AttackActivityOverride,
) {
    let prefix = activity.path();
    if let Some(ability) = attack.ability.as_deref().filter(|ability| *ability != NO_OVERRIDE) {
        update.set(format!("{prefix}.attack.ability"), json!(ability));
    }
    if let Some(bonus) = attack.bonus.as_ref().filter(|bonus| bonus.is_set()) {
        update.set(format!("{prefix}.attack.bonus"), json!(bonus.to_string()));
    }
    if let Some(flat) = attack.flat {
        update.set(format!("{prefix}.attack.flat"), Value::Bool(flat));
    }
}
