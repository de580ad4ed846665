//! View model for a parent's spells tab.
//!
//! Rows are built from resolved children only; nothing here touches the store.

use crate::context::Context;
use crate::engine::resolver::ChildSpellMap;
use crate::model::activity::{activities, first_of_kind, ActivityKind, ActivityRef};
use crate::model::document::Document;
use crate::model::object_path::is_truthy;
use serde::Serialize;
use serde_json::Value;

/// Whole spells tab for one parent.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpellTab {
    pub parent_uuid: String,
    pub is_embedded: bool,
    /// Hide override details from non-GM users on unidentified parents.
    pub conceal_details: bool,
    pub rows: Vec<SpellTabRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpellTabRow {
    pub id: String,
    pub name: String,
    pub img: Option<String>,
    /// Real owned child rather than a synthesized one.
    pub embedded: bool,
    pub uses_max: Option<Value>,
    pub save: Option<SaveDisplay>,
    pub attack: Option<AttackDisplay>,
    /// First consumption target pointing at the parent.
    pub parent_consumption: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveDisplay {
    pub activity_id: String,
    pub calculation: String,
    pub formula: Option<String>,
    /// Whether the DC is meaningful outside an owning actor.
    pub display: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttackDisplay {
    pub activity_id: String,
    pub ability: Option<String>,
    pub bonus: Option<String>,
    pub flat: bool,
    pub display: bool,
}

/// Builds the tab rows for `parent` from its resolved children, in order.
pub fn build_spells_tab(ctx: &Context, parent: &Document, children: &ChildSpellMap) -> SpellTab {
    let rows = children
        .iter()
        .map(|(id, child)| build_row(parent, id, child))
        .collect();
    SpellTab {
        parent_uuid: parent.uuid.clone(),
        is_embedded: parent.is_embedded(),
        conceal_details: !ctx.is_gm && parent.is_unidentified(),
        rows,
    }
}

fn build_row(parent: &Document, id: &str, child: &Document) -> SpellTabRow {
    let embedded = child.persisted && child.is_embedded();
    let system = &child.data.system;
    SpellTabRow {
        id: id.to_string(),
        name: child.name().to_string(),
        img: child.data.img.clone(),
        embedded,
        uses_max: child.data.system_field("uses.max").cloned(),
        save: first_of_kind(system, &ActivityKind::Save)
            .map(|activity| save_display(&activity, embedded)),
        attack: first_of_kind(system, &ActivityKind::Attack)
            .map(|activity| attack_display(&activity, embedded)),
        parent_consumption: parent_consumption(system, &parent.id),
    }
}

fn save_display(activity: &ActivityRef<'_>, embedded: bool) -> SaveDisplay {
    let calculation = text_field(activity, "save.dc.calculation").unwrap_or_default();
    let formula = text_field(activity, "save.dc.formula").filter(|formula| !formula.is_empty());
    let has_dc = !calculation.is_empty() || formula.is_some();
    SaveDisplay {
        activity_id: activity.id.to_string(),
        display: has_dc && (embedded || calculation.is_empty()),
        calculation,
        formula,
    }
}

fn attack_display(activity: &ActivityRef<'_>, embedded: bool) -> AttackDisplay {
    let flat = activity.field("attack.flat").is_some_and(is_truthy);
    AttackDisplay {
        activity_id: activity.id.to_string(),
        ability: text_field(activity, "attack.ability"),
        bonus: text_field(activity, "attack.bonus").filter(|bonus| !bonus.is_empty()),
        flat,
        display: embedded || flat,
    }
}

fn parent_consumption(system: &Value, parent_id: &str) -> Option<Value> {
    activities(system).into_iter().find_map(|activity| {
        activity
            .field("consumption.targets")?
            .as_array()?
            .iter()
            .find(|target| target.get("target").and_then(Value::as_str) == Some(parent_id))
            .cloned()
    })
}

fn text_field(activity: &ActivityRef<'_>, path: &str) -> Option<String> {
    match activity.field(path)? {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::build_spells_tab;
    use crate::context::Context;
    use crate::engine::resolver::ChildSpellMap;
    use crate::model::document::{ContainerRef, Document, DocumentData};
    use serde_json::json;

    fn spell_system(parent_id: &str) -> serde_json::Value {
        json!({
            "activities": {
                "save0000": {
                    "type": "save",
                    "save": { "dc": { "calculation": "spellcasting", "formula": "" } },
                    "consumption": { "targets": [] }
                },
                "atk00000": {
                    "type": "attack",
                    "attack": { "ability": "", "bonus": "2", "flat": false },
                    "consumption": {
                        "targets": [{ "type": "itemUses", "target": parent_id, "value": "1" }]
                    }
                }
            }
        })
    }

    #[test]
    fn synthesized_children_hide_actor_dependent_values() {
        let parent = Document::world(
            "wand0000000000aa",
            DocumentData::new("Wand", "equipment").with_system(json!({ "identified": false })),
        );
        let child = Document::temporary(
            "fireball00000000",
            None,
            DocumentData::new("Fireball", "spell").with_system(spell_system(&parent.id)),
        );
        let mut children = ChildSpellMap::new();
        children.insert(child.id.clone(), child);

        let tab = build_spells_tab(&Context::new("player", false, "4.0.0"), &parent, &children);
        assert!(tab.conceal_details);
        assert!(!tab.is_embedded);
        let row = &tab.rows[0];
        assert!(!row.embedded);
        assert!(!row.save.as_ref().is_some_and(|save| save.display));
        assert!(!row.attack.as_ref().is_some_and(|attack| attack.display));
        assert_eq!(
            row.parent_consumption.as_ref().and_then(|target| target.get("value")),
            Some(&json!("1"))
        );
    }

    #[test]
    fn owned_children_show_save_and_attack() {
        let container = ContainerRef::new("hero000000000000", "character");
        let parent = Document::embedded(
            container.clone(),
            "wand0000000000aa",
            DocumentData::new("Wand", "equipment"),
        );
        let child = Document::embedded(
            container,
            "fireball00000000",
            DocumentData::new("Fireball", "spell").with_system(spell_system(&parent.id)),
        );
        let mut children = ChildSpellMap::new();
        children.insert(child.id.clone(), child);

        let tab = build_spells_tab(&Context::new("gm", true, "4.0.0"), &parent, &children);
        assert!(!tab.conceal_details);
        let row = &tab.rows[0];
        assert!(row.embedded);
        assert!(row.save.as_ref().is_some_and(|save| save.display));
        let attack = row.attack.as_ref().map(|attack| (attack.display, attack.bonus.clone()));
        assert_eq!(attack, Some((true, Some("2".to_string()))));
    }
}
