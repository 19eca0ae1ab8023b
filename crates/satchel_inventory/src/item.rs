//! Item definitions and combine rules

use serde::{Deserialize, Serialize};

/// How an item behaves when used from the inventory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UsableType {
    /// Not usable
    None,
    /// Equips a player item (weapon, flashlight, ...)
    PlayerItem,
    /// Restores health and is consumed
    HealthItem,
    /// Forwards to an application-defined handler and is consumed
    CustomEvent,
}

impl Default for UsableType {
    fn default() -> Self {
        Self::None
    }
}

/// Grid orientation of a placed item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Orientation {
    /// Width along columns
    Horizontal,
    /// Width and height swapped
    Vertical,
}

impl Default for Orientation {
    fn default() -> Self {
        Self::Horizontal
    }
}

impl Orientation {
    /// Effective (columns, rows) of a `width` x `height` item
    #[inline]
    pub fn apply(self, width: u16, height: u16) -> (u16, u16) {
        match self {
            Self::Horizontal => (width, height),
            Self::Vertical => (height, width),
        }
    }
}

/// Behaviour flags of an item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemFlags {
    pub stackable: bool,
    pub usable: bool,
    pub examinable: bool,
    pub combinable: bool,
    pub droppable: bool,
    pub discardable: bool,
    pub bind_shortcut: bool,
}

impl Default for ItemFlags {
    fn default() -> Self {
        Self {
            stackable: false,
            usable: false,
            examinable: true,
            combinable: false,
            droppable: true,
            discardable: true,
            bind_shortcut: false,
        }
    }
}

/// Which instance a combine result inherits custom data from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InheritSource {
    Active,
    Second,
}

impl Default for InheritSource {
    fn default() -> Self {
        Self::Active
    }
}

/// What happens when the owning item is combined with `partner`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombineRule {
    /// GUID of the item this rule pairs with
    pub partner: String,
    /// Consume fixed amounts from both sides and produce `result_amount`
    pub is_crafting: bool,
    /// Keep the owning item after a non-crafting combine
    pub keep_after_combine: bool,
    /// Consume one unit of the partner
    pub remove_second_item: bool,
    /// Fire the external combine event
    pub event_after_combine: bool,
    /// Equip `player_item_index` afterwards
    pub select_after_combine: bool,
    /// Attach custom data to the result
    pub have_custom_data: bool,
    /// Take the result's custom data from one of the inputs
    pub inherit_custom_data: bool,
    pub required_current_amount: u16,
    pub required_second_amount: u16,
    /// GUID of the item produced, if any
    pub result: Option<String>,
    pub result_amount: u16,
    pub player_item_index: Option<usize>,
    /// Payload attached to the result when not inherited
    pub custom_data: Option<String>,
    pub inherit_from: InheritSource,
    /// Dot-separated JSON path looked up in the inherited payload
    pub inherit_key: Option<String>,
}

impl Default for CombineRule {
    fn default() -> Self {
        Self {
            partner: String::new(),
            is_crafting: false,
            keep_after_combine: false,
            remove_second_item: false,
            event_after_combine: false,
            select_after_combine: false,
            have_custom_data: false,
            inherit_custom_data: false,
            required_current_amount: 1,
            required_second_amount: 1,
            result: None,
            result_amount: 1,
            player_item_index: None,
            custom_data: None,
            inherit_from: InheritSource::Active,
            inherit_key: None,
        }
    }
}

impl CombineRule {
    /// Create a rule pairing with `partner`
    pub fn new(partner: impl Into<String>) -> Self {
        Self {
            partner: partner.into(),
            ..Default::default()
        }
    }

    /// Make this a crafting rule
    pub fn crafting(mut self, current: u16, second: u16) -> Self {
        self.is_crafting = true;
        self.required_current_amount = current.max(1);
        self.required_second_amount = second.max(1);
        self
    }

    /// Produce `amount` of `guid`
    pub fn with_result(mut self, guid: impl Into<String>, amount: u16) -> Self {
        self.result = Some(guid.into());
        self.result_amount = amount.max(1);
        self
    }

    pub fn keep_after_combine(mut self) -> Self {
        self.keep_after_combine = true;
        self
    }

    pub fn remove_second_item(mut self) -> Self {
        self.remove_second_item = true;
        self
    }

    pub fn event_after_combine(mut self) -> Self {
        self.event_after_combine = true;
        self
    }

    /// Equip a player item after combining
    pub fn select_after_combine(mut self, player_item_index: usize) -> Self {
        self.select_after_combine = true;
        self.player_item_index = Some(player_item_index);
        self
    }

    /// Attach a fixed payload to the result
    pub fn with_custom_data(mut self, data: impl Into<String>) -> Self {
        self.have_custom_data = true;
        self.custom_data = Some(data.into());
        self
    }

    /// Inherit the result payload from an input
    pub fn inherit_custom_data(mut self, from: InheritSource, key: Option<&str>) -> Self {
        self.have_custom_data = true;
        self.inherit_custom_data = true;
        self.inherit_from = from;
        self.inherit_key = key.map(str::to_string);
        self
    }
}

/// Immutable item template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDefinition {
    /// Unique key
    pub guid: String,
    /// Display name
    #[serde(default)]
    pub title: String,
    /// Columns occupied when horizontal
    pub width: u16,
    /// Rows occupied when horizontal
    pub height: u16,
    /// Maximum stack size (0 = unlimited)
    #[serde(default)]
    pub max_stack: u16,
    #[serde(default)]
    pub flags: ItemFlags,
    #[serde(default)]
    pub usable_type: UsableType,
    /// Player item equipped by `UsableType::PlayerItem`
    #[serde(default)]
    pub player_item_index: Option<usize>,
    /// Health restored by `UsableType::HealthItem`
    #[serde(default)]
    pub health_points: u32,
    #[serde(default)]
    pub combine_rules: Vec<CombineRule>,
}

impl ItemDefinition {
    /// Create a 1x1, non-stackable item
    pub fn new(guid: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            guid: guid.into(),
            title: title.into(),
            width: 1,
            height: 1,
            max_stack: 0,
            flags: ItemFlags::default(),
            usable_type: UsableType::None,
            player_item_index: None,
            health_points: 0,
            combine_rules: Vec::new(),
        }
    }

    /// Set grid size
    pub fn with_size(mut self, width: u16, height: u16) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Make stackable up to `max` (0 = unlimited)
    pub fn stackable(mut self, max: u16) -> Self {
        self.flags.stackable = true;
        self.max_stack = max;
        self
    }

    /// Set all flags
    pub fn with_flags(mut self, flags: ItemFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Equip player item `index` on use
    pub fn player_item(mut self, index: usize) -> Self {
        self.flags.usable = true;
        self.usable_type = UsableType::PlayerItem;
        self.player_item_index = Some(index);
        self
    }

    /// Heal `points` on use
    pub fn health_item(mut self, points: u32) -> Self {
        self.flags.usable = true;
        self.usable_type = UsableType::HealthItem;
        self.health_points = points;
        self
    }

    /// Fire a custom event on use
    pub fn custom_event(mut self) -> Self {
        self.flags.usable = true;
        self.usable_type = UsableType::CustomEvent;
        self
    }

    /// Allow binding to a shortcut slot
    pub fn bindable(mut self) -> Self {
        self.flags.bind_shortcut = true;
        self
    }

    /// Add a combine rule and mark the item combinable
    pub fn with_combine_rule(mut self, rule: CombineRule) -> Self {
        self.flags.combinable = true;
        self.combine_rules.push(rule);
        self
    }

    /// Forbid dropping and discarding
    pub fn non_droppable(mut self) -> Self {
        self.flags.droppable = false;
        self.flags.discardable = false;
        self
    }

    /// Rule pairing this item with `partner`
    pub fn combine_rule(&self, partner: &str) -> Option<&CombineRule> {
        self.combine_rules.iter().find(|r| r.partner == partner)
    }

    /// Largest quantity one instance may hold
    pub fn stack_limit(&self) -> u16 {
        if !self.flags.stackable {
            1
        } else if self.max_stack == 0 {
            u16::MAX
        } else {
            self.max_stack
        }
    }

    /// Effective size for an orientation
    pub fn footprint(&self, orientation: Orientation) -> (u16, u16) {
        orientation.apply(self.width, self.height)
    }

    /// Width differs from height
    pub fn is_rotatable(&self) -> bool {
        self.width != self.height
    }

    /// Player item this definition equips, if any
    pub fn equips(&self) -> Option<usize> {
        match self.usable_type {
            UsableType::PlayerItem => self.player_item_index,
            _ => None,
        }
    }
}
