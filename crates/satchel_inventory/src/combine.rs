//! Item combination
//!
//! A combine pairs an active instance with a second one. The rule on the
//! active item keyed by the second item's GUID drives most of the outcome;
//! the mirrored rule on the second item only decides whether the second
//! instance is consumed.

use crate::custom_data::CustomData;
use crate::error::{InventoryError, Result};
use crate::instance::{InstanceId, ItemInstance};
use crate::inventory::{AddOutcome, Inventory};
use crate::item::{CombineRule, InheritSource, ItemDefinition};
use std::collections::{BTreeMap, BTreeSet};

/// What a combine did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CombineOutcome {
    /// Units taken from each input, active first
    pub consumed: Vec<(InstanceId, u16)>,
    /// Inputs that were used up
    pub destroyed: Vec<InstanceId>,
    /// Placement of the result item
    pub result: Option<AddOutcome>,
    /// Player item equipped afterwards
    pub equipped: Option<usize>,
    /// The equipped player item was told about the combine
    pub notified_player_item: bool,
    /// The external combine event fired
    pub event_fired: bool,
}

/// Payload attached to a combine result
fn result_custom_data(rule: &CombineRule, active: &ItemInstance, second: &ItemInstance) -> CustomData {
    if !rule.have_custom_data {
        return CustomData::empty();
    }
    if rule.inherit_custom_data {
        let source = match rule.inherit_from {
            InheritSource::Active => &active.custom_data,
            InheritSource::Second => &second.custom_data,
        };
        return CustomData::inherit(source, rule.inherit_key.as_deref());
    }
    rule.custom_data.clone().map(CustomData::from).unwrap_or_default()
}

impl Inventory {
    /// GUIDs the active instance can currently be combined with.
    ///
    /// Includes the equipped player item when it is carried, combinable and
    /// a rule target, plus every other carried item the active item has a
    /// rule for. Crafting rules also require both sides to hold enough units.
    pub fn combinable_partners(&self, active: InstanceId) -> Result<BTreeSet<String>> {
        let instance = self
            .carrying
            .get(&active)
            .ok_or(InventoryError::UnknownInstance(active))?;
        let def = self.catalog.require(&instance.guid)?;
        let mut partners = BTreeSet::new();
        if !def.flags.combinable {
            return Ok(partners);
        }

        if let Some(index) = self.hooks.equipped_index() {
            let equipped = self
                .carrying
                .values()
                .filter(|i| i.id != active)
                .filter_map(|i| self.catalog.get(&i.guid))
                .find(|d| d.equips() == Some(index));
            if let Some(equipped) = equipped {
                if equipped.flags.combinable && def.combine_rule(&equipped.guid).is_some() {
                    partners.insert(equipped.guid.clone());
                }
            }
        }

        for other in self.carrying.values().filter(|i| i.id != active) {
            let Some(rule) = def.combine_rule(&other.guid) else {
                continue;
            };
            if rule.is_crafting
                && (instance.quantity < rule.required_current_amount
                    || other.quantity < rule.required_second_amount)
            {
                continue;
            }
            partners.insert(other.guid.clone());
        }
        Ok(partners)
    }

    /// Combine two carried instances.
    ///
    /// Steps run in a fixed order: consume the active item (one unit, or
    /// the crafting amount), consume the second item, equip the selected
    /// player item, then spawn the result. Every precondition, including
    /// room for the result, is checked before anything changes.
    pub fn combine(&mut self, active: InstanceId, second: InstanceId) -> Result<CombineOutcome> {
        let active_item = self
            .carrying
            .get(&active)
            .ok_or(InventoryError::UnknownInstance(active))?
            .clone();
        if active == second {
            return Err(InventoryError::NotPermitted {
                guid: active_item.guid,
                action: "combined with itself",
            });
        }
        let second_item = self
            .carrying
            .get(&second)
            .ok_or(InventoryError::UnknownInstance(second))?
            .clone();

        let active_def = self.catalog.require(&active_item.guid)?;
        let second_def = self.catalog.require(&second_item.guid)?;
        let active_rule = active_def.combine_rule(&second_item.guid).cloned();
        let second_rule = second_def.combine_rule(&active_item.guid).cloned();
        let second_equips = second_def.equips();
        let active_combinable = active_def.flags.combinable;

        if active_rule.is_none() && second_rule.is_none() {
            log::warn!(
                "No combine rule between '{}' and '{}'",
                active_item.guid,
                second_item.guid
            );
            return Err(InventoryError::NoCombineRule {
                active: active_item.guid,
                second: second_item.guid,
            });
        }
        if !active_combinable {
            log::warn!("'{}' is not combinable", active_item.guid);
            return Err(InventoryError::NotPermitted {
                guid: active_item.guid,
                action: "combined",
            });
        }
        let crafting = active_rule.as_ref().is_some_and(|r| r.is_crafting);

        let mut removals: Vec<(InstanceId, u16)> = Vec::new();
        let mut notify = false;
        match &active_rule {
            Some(rule) if rule.is_crafting => {
                for (item, required) in [
                    (&active_item, rule.required_current_amount),
                    (&second_item, rule.required_second_amount),
                ] {
                    if item.quantity < required {
                        log::warn!(
                            "Crafting needs {}x '{}', only {} carried",
                            required,
                            item.guid,
                            item.quantity
                        );
                        return Err(InventoryError::InsufficientQuantity {
                            guid: item.guid.clone(),
                            required,
                            available: item.quantity,
                        });
                    }
                    removals.push((item.id, required));
                }
            }
            Some(rule) => {
                notify = second_equips.is_some_and(|index| self.hooks.is_equipped(index))
                    && self.hooks.can_combine();
                if !rule.keep_after_combine {
                    removals.push((active, 1));
                }
            }
            None => {}
        }

        if !crafting {
            let remove_second = match (&active_rule, &second_rule) {
                (Some(rule), _) if rule.remove_second_item => true,
                (_, Some(rule)) => !rule.keep_after_combine,
                _ => false,
            };
            if remove_second {
                removals.push((second, 1));
            }
        }

        // Plan the result against the grid as it will be after consumption
        let pending: BTreeMap<InstanceId, u16> = removals.iter().copied().collect();
        let mut scratch = self.grid.clone();
        for item in [&active_item, &second_item] {
            if pending.get(&item.id).is_some_and(|amount| *amount >= item.quantity) {
                scratch.vacate(item.id);
            }
        }

        let result_plan = match active_rule.as_ref() {
            Some(rule) => match &rule.result {
                Some(result_guid) => {
                    let quantity = if crafting { rule.result_amount } else { 1 };
                    let custom_data = result_custom_data(rule, &active_item, &second_item);
                    let plan = self
                        .plan_add(&scratch, result_guid, quantity as u32, custom_data, &pending)
                        .map_err(|e| {
                            log::warn!(
                                "Combining '{}' with '{}' has no room for the result: {}",
                                active_item.guid,
                                second_item.guid,
                                e
                            );
                            e
                        })?;
                    Some(plan)
                }
                None => None,
            },
            None => None,
        };

        let mut outcome = CombineOutcome::default();
        if notify {
            self.hooks.notify_combine(&active_item);
            outcome.notified_player_item = true;
        }

        for (id, amount) in removals {
            let remaining = self.decrement(id, amount)?;
            outcome.consumed.push((id, amount));
            if remaining == 0 {
                outcome.destroyed.push(id);
            }
        }

        if let Some(rule) = &active_rule {
            if rule.event_after_combine {
                self.hooks
                    .combine_event(&active_item.guid, &second_item.guid);
                outcome.event_fired = true;
            }
            if !crafting && rule.select_after_combine {
                if let Some(index) = rule.player_item_index {
                    self.hooks.equip(index);
                    outcome.equipped = Some(index);
                }
            }
        }

        if let Some(plan) = result_plan {
            outcome.result = Some(self.commit_add(plan)?);
        }

        log::debug!(
            "Combined '{}' {} with '{}' {}",
            active_item.guid,
            active,
            second_item.guid,
            second
        );
        Ok(outcome)
    }

    /// Whether `active` has a rule for `second`'s item, or the reverse
    pub fn can_combine(&self, active: InstanceId, second: InstanceId) -> bool {
        let (Some(a), Some(b)) = (self.carrying.get(&active), self.carrying.get(&second)) else {
            return false;
        };
        let has_rule = |from: &str, to: &str| {
            self.catalog
                .get(from)
                .and_then(|d: &ItemDefinition| d.combine_rule(to))
                .is_some()
        };
        active != second && (has_rule(&a.guid, &b.guid) || has_rule(&b.guid, &a.guid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ItemCatalog;
    use crate::config::InventoryConfig;
    use crate::grid::GridPosition;
    use crate::hooks::PlayerHooks;
    use crate::item::ItemDefinition;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct RecordingHooks {
        calls: Arc<Mutex<Vec<String>>>,
        equipped: Option<usize>,
        combinable: bool,
    }

    impl PlayerHooks for RecordingHooks {
        fn equip(&mut self, index: usize) {
            self.equipped = Some(index);
            self.calls.lock().push(format!("equip {}", index));
        }

        fn equipped_index(&self) -> Option<usize> {
            self.equipped
        }

        fn deselect(&mut self) {
            self.equipped = None;
            self.calls.lock().push("deselect".into());
        }

        fn can_combine(&self) -> bool {
            self.combinable
        }

        fn notify_combine(&mut self, consumed: &ItemInstance) {
            self.calls.lock().push(format!("notify {}", consumed.guid));
        }

        fn combine_event(&mut self, active: &str, second: &str) {
            self.calls.lock().push(format!("event {}+{}", active, second));
        }
    }

    fn catalog() -> ItemCatalog {
        ItemCatalog::new(vec![
            ItemDefinition::new("key", "Key").with_combine_rule(CombineRule::new("lock")),
            ItemDefinition::new("lock", "Lock"),
            ItemDefinition::new("herb", "Herb")
                .stackable(10)
                .with_combine_rule(CombineRule::new("bottle").crafting(2, 1).with_result("potion", 1)),
            ItemDefinition::new("bottle", "Bottle").stackable(5),
            ItemDefinition::new("potion", "Potion").stackable(5),
            ItemDefinition::new("battery", "Battery")
                .stackable(4)
                .with_combine_rule(CombineRule::new("flashlight").event_after_combine()),
            ItemDefinition::new("flashlight", "Flashlight")
                .player_item(0)
                .with_combine_rule(CombineRule::new("battery").keep_after_combine()),
            ItemDefinition::new("cassette", "Cassette").with_combine_rule(
                CombineRule::new("recorder")
                    .remove_second_item()
                    .with_result("loaded_recorder", 1)
                    .inherit_custom_data(InheritSource::Active, Some("track"))
                    .select_after_combine(3),
            ),
            ItemDefinition::new("recorder", "Recorder").with_size(2, 1),
            ItemDefinition::new("loaded_recorder", "Loaded Recorder").with_size(2, 1),
            ItemDefinition::new("fuse", "Fuse")
                .stackable(3)
                .with_combine_rule(CombineRule::new("panel")),
            ItemDefinition::new("panel", "Panel")
                .stackable(3)
                .with_combine_rule(CombineRule::new("fuse")),
            ItemDefinition::new("ink", "Ink").with_combine_rule(
                CombineRule::new("pen")
                    .keep_after_combine()
                    .with_result("letter", 1)
                    .with_custom_data(r#"{"color":"blue"}"#),
            ),
            ItemDefinition::new("pen", "Pen"),
            ItemDefinition::new("letter", "Letter"),
            ItemDefinition::new("lens", "Lens").with_combine_rule(
                CombineRule::new("camera")
                    .with_result("photo", 1)
                    .inherit_custom_data(InheritSource::Second, Some("film")),
            ),
            ItemDefinition::new("camera", "Camera").with_size(2, 1),
            ItemDefinition::new("photo", "Photo"),
        ])
        .unwrap()
    }

    fn inventory(rows: u16, columns: u16) -> Inventory {
        Inventory::new(InventoryConfig::new(rows, columns), catalog()).unwrap()
    }

    fn add(inv: &mut Inventory, guid: &str, quantity: u32) -> InstanceId {
        inv.add_item(guid, quantity, "").unwrap().created[0]
    }

    #[test]
    fn test_key_consumed_by_lock() {
        let mut inv = inventory(5, 5);
        let key = add(&mut inv, "key", 1);
        let lock = add(&mut inv, "lock", 1);

        let outcome = inv.combine(key, lock).unwrap();

        assert_eq!(outcome.destroyed, vec![key]);
        assert!(outcome.result.is_none());
        assert!(inv.instance(key).is_none());
        assert_eq!(inv.instance(lock).unwrap().quantity, 1);
        assert_eq!(inv.instances().count(), 1);
        inv.validate().unwrap();
    }

    #[test]
    fn test_crafting_consumes_required_amounts() {
        let mut inv = inventory(5, 5);
        let herb = add(&mut inv, "herb", 3);
        let bottle = add(&mut inv, "bottle", 1);

        let outcome = inv.combine(herb, bottle).unwrap();

        assert_eq!(outcome.consumed, vec![(herb, 2), (bottle, 1)]);
        assert_eq!(inv.instance(herb).unwrap().quantity, 1);
        assert!(inv.instance(bottle).is_none());

        let created = outcome.result.unwrap().created;
        assert_eq!(created.len(), 1);
        let potion = inv.instance(created[0]).unwrap();
        assert_eq!(potion.guid, "potion");
        assert_eq!(potion.quantity, 1);
        // The bottle's cell is the first free one
        assert_eq!(potion.position, GridPosition::new(1, 0));
        inv.validate().unwrap();
    }

    #[test]
    fn test_crafting_insufficient_quantity() {
        let mut inv = inventory(5, 5);
        let herb = add(&mut inv, "herb", 1);
        let bottle = add(&mut inv, "bottle", 1);

        assert_eq!(
            inv.combine(herb, bottle),
            Err(InventoryError::InsufficientQuantity {
                guid: "herb".into(),
                required: 2,
                available: 1
            })
        );
        assert_eq!(inv.count("herb"), 1);
        assert_eq!(inv.count("bottle"), 1);
    }

    #[test]
    fn test_no_rule() {
        let mut inv = inventory(5, 5);
        let lock = add(&mut inv, "lock", 1);
        let bottle = add(&mut inv, "bottle", 1);

        assert!(!inv.can_combine(lock, bottle));
        assert_eq!(
            inv.combine(lock, bottle),
            Err(InventoryError::NoCombineRule {
                active: "lock".into(),
                second: "bottle".into()
            })
        );
        assert!(inv.combine(lock, lock).is_err());
    }

    #[test]
    fn test_equipped_player_item_notified() {
        let hooks = RecordingHooks {
            equipped: Some(0),
            combinable: true,
            ..Default::default()
        };
        let calls = hooks.calls.clone();
        let mut inv = inventory(5, 5).with_hooks(hooks);
        let battery = add(&mut inv, "battery", 3);
        let flashlight = add(&mut inv, "flashlight", 1);

        let outcome = inv.combine(battery, flashlight).unwrap();

        assert!(outcome.notified_player_item);
        assert!(outcome.event_fired);
        // One unit only, and the flashlight keeps itself
        assert_eq!(inv.instance(battery).unwrap().quantity, 2);
        assert!(inv.instance(flashlight).is_some());
        assert_eq!(
            *calls.lock(),
            vec!["notify battery".to_string(), "event battery+flashlight".to_string()]
        );
    }

    #[test]
    fn test_not_notified_when_not_equipped() {
        let hooks = RecordingHooks {
            combinable: true,
            ..Default::default()
        };
        let calls = hooks.calls.clone();
        let mut inv = inventory(5, 5).with_hooks(hooks);
        let battery = add(&mut inv, "battery", 1);
        let flashlight = add(&mut inv, "flashlight", 1);

        let outcome = inv.combine(battery, flashlight).unwrap();
        assert!(!outcome.notified_player_item);
        assert_eq!(outcome.destroyed, vec![battery]);
        assert!(!calls.lock().iter().any(|c| c.starts_with("notify")));
    }

    #[test]
    fn test_result_inherits_custom_data_and_selects() {
        let hooks = RecordingHooks::default();
        let calls = hooks.calls.clone();
        let mut inv = inventory(5, 5).with_hooks(hooks);
        let cassette = inv
            .add_item("cassette", 1, r#"{"track":{"side":"B"}}"#)
            .unwrap()
            .created[0];
        let recorder = add(&mut inv, "recorder", 1);

        let outcome = inv.combine(cassette, recorder).unwrap();

        assert_eq!(outcome.destroyed, vec![cassette, recorder]);
        assert_eq!(outcome.equipped, Some(3));
        let loaded = inv.instance(outcome.result.unwrap().created[0]).unwrap();
        assert_eq!(loaded.guid, "loaded_recorder");
        assert_eq!(loaded.custom_data.as_str(), r#"{"side":"B"}"#);
        assert_eq!(*calls.lock(), vec!["equip 3".to_string()]);
        assert_eq!(inv.instances().count(), 1);
    }

    #[test]
    fn test_result_uses_freed_cells() {
        // 1x3 grid fully used: the 2x1 result only fits once both inputs go
        let mut inv = inventory(1, 3);
        let cassette = add(&mut inv, "cassette", 1);
        let recorder = add(&mut inv, "recorder", 1);
        assert_eq!(inv.free_cells(), 0);

        let outcome = inv.combine(cassette, recorder).unwrap();
        let loaded = inv.instance(outcome.result.unwrap().created[0]).unwrap();
        assert_eq!(loaded.position, GridPosition::new(0, 0));
        inv.validate().unwrap();
    }

    #[test]
    fn test_combine_atomic_when_result_does_not_fit() {
        // Crafting leaves one herb behind and the bottle fills its cell,
        // so a 1x2 grid has no room for the potion
        let mut inv = inventory(1, 2);
        let herb = add(&mut inv, "herb", 3);
        let bottle = add(&mut inv, "bottle", 2);

        assert!(matches!(
            inv.combine(herb, bottle),
            Err(InventoryError::CapacityExhausted { .. })
        ));
        assert_eq!(inv.count("herb"), 3);
        assert_eq!(inv.count("bottle"), 2);
        assert_eq!(inv.count("potion"), 0);
    }

    #[test]
    fn test_combinable_partners() {
        let hooks = RecordingHooks {
            equipped: Some(0),
            combinable: true,
            ..Default::default()
        };
        let mut inv = inventory(5, 5).with_hooks(hooks);
        let herb = add(&mut inv, "herb", 1);
        add(&mut inv, "bottle", 1);
        let battery = add(&mut inv, "battery", 1);
        add(&mut inv, "flashlight", 1);
        let lock = add(&mut inv, "lock", 1);

        // One herb is not enough to craft
        assert!(inv.combinable_partners(herb).unwrap().is_empty());
        inv.add_item("herb", 1, "").unwrap();
        assert_eq!(
            inv.combinable_partners(herb).unwrap(),
            BTreeSet::from(["bottle".to_string()])
        );

        assert_eq!(
            inv.combinable_partners(battery).unwrap(),
            BTreeSet::from(["flashlight".to_string()])
        );
        assert!(inv.combinable_partners(lock).unwrap().is_empty());
    }

    #[test]
    fn test_second_rule_consumes_second_item() {
        let mut inv = inventory(5, 5);
        let fuse = add(&mut inv, "fuse", 2);
        let panel = add(&mut inv, "panel", 2);

        let outcome = inv.combine(fuse, panel).unwrap();

        assert_eq!(outcome.consumed, vec![(fuse, 1), (panel, 1)]);
        assert!(outcome.destroyed.is_empty());
        assert_eq!(inv.count("fuse"), 1);
        assert_eq!(inv.count("panel"), 1);
        inv.validate().unwrap();
    }

    #[test]
    fn test_result_gets_configured_custom_data() {
        let mut inv = inventory(5, 5);
        let ink = inv.add_item("ink", 1, r#"{"level":3}"#).unwrap().created[0];
        let pen = add(&mut inv, "pen", 1);

        let outcome = inv.combine(ink, pen).unwrap();

        // Neither input is consumed
        assert!(outcome.consumed.is_empty());
        assert!(inv.instance(ink).is_some());
        assert!(inv.instance(pen).is_some());
        let letter = inv.instance(outcome.result.unwrap().created[0]).unwrap();
        assert_eq!(letter.guid, "letter");
        assert_eq!(letter.custom_data.as_str(), r#"{"color":"blue"}"#);
    }

    #[test]
    fn test_result_inherits_from_second_item() {
        let mut inv = inventory(5, 5);
        let lens = inv.add_item("lens", 1, r#"{"film":{"iso":100}}"#).unwrap().created[0];
        let camera = inv
            .add_item("camera", 1, r#"{"film":{"iso":400}}"#)
            .unwrap()
            .created[0];

        let outcome = inv.combine(lens, camera).unwrap();

        assert_eq!(outcome.destroyed, vec![lens]);
        assert!(inv.instance(camera).is_some());
        let photo = inv.instance(outcome.result.unwrap().created[0]).unwrap();
        assert_eq!(photo.custom_data.as_str(), r#"{"iso":400}"#);
    }

    #[test]
    fn test_non_combinable_active_item_rejected() {
        let mut inv = inventory(5, 5);
        let lock = add(&mut inv, "lock", 1);
        let key = add(&mut inv, "key", 1);

        assert!(inv.combinable_partners(lock).unwrap().is_empty());
        assert_eq!(
            inv.combine(lock, key),
            Err(InventoryError::NotPermitted {
                guid: "lock".into(),
                action: "combined"
            })
        );
        assert!(inv.instance(key).is_some());
        assert!(inv.instance(lock).is_some());
    }
}
