//! The player aggregate and everything it owns: items, equipment, pets,
//! techniques, quests, and secret realms.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::data::{self, FamilyBackground, REALMS, SECT_RANKS, SectChoice, TalentGrade};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Gender {
    #[default]
    #[serde(rename = "Nam")]
    Male,
    #[serde(rename = "Nữ")]
    Female,
}

impl Gender {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Male => "Nam",
            Self::Female => "Nữ",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ItemType {
    Weapon,
    Armor,
    Accessory,
    Consumable,
    TechniqueScroll,
    Material,
}

impl ItemType {
    #[must_use]
    pub const fn is_equippable(self) -> bool {
        matches!(self, Self::Weapon | Self::Armor | Self::Accessory)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TechniqueRank {
    #[serde(rename = "Phàm phẩm")]
    PhamPham,
    #[serde(rename = "Linh phẩm")]
    LinhPham,
    #[serde(rename = "Tiên phẩm")]
    TienPham,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TechniqueEffects {
    #[serde(default)]
    pub cultivation_bonus: f64,
}

/// A passive-bonus cultivation method. The bonus feeds every tick's gain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CultivationTechnique {
    pub name: String,
    pub rank: TechniqueRank,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub effects: TechniqueEffects,
}

impl CultivationTechnique {
    #[must_use]
    pub const fn bonus(&self) -> f64 {
        self.effects.cultivation_bonus
    }
}

/// Sparse numeric deltas carried by an item. Missing keys parse as zero so
/// AI-supplied items never fail to deserialize.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ItemEffects {
    #[serde(default)]
    pub attack: f64,
    #[serde(default)]
    pub defense: f64,
    #[serde(default)]
    pub health: f64,
    #[serde(default)]
    pub cultivation: f64,
}

/// Immutable once created; identity is the synthetic `id`. An item is owned
/// by exactly one container at a time; moving it is remove-then-insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub effects: ItemEffects,
    #[serde(default)]
    pub cost: Option<i64>,
    #[serde(default)]
    pub technique: Option<CultivationTechnique>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EquipSlot {
    Weapon,
    Armor,
    Accessory,
}

impl EquipSlot {
    #[must_use]
    pub const fn for_item_type(item_type: ItemType) -> Option<Self> {
        match item_type {
            ItemType::Weapon => Some(Self::Weapon),
            ItemType::Armor => Some(Self::Armor),
            ItemType::Accessory => Some(Self::Accessory),
            _ => None,
        }
    }
}

/// Three named slots. An item lives in at most one slot or the inventory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Equipment {
    #[serde(default)]
    pub weapon: Option<Item>,
    #[serde(default)]
    pub armor: Option<Item>,
    #[serde(default)]
    pub accessory: Option<Item>,
}

impl Equipment {
    #[must_use]
    pub fn slot(&self, slot: EquipSlot) -> &Option<Item> {
        match slot {
            EquipSlot::Weapon => &self.weapon,
            EquipSlot::Armor => &self.armor,
            EquipSlot::Accessory => &self.accessory,
        }
    }

    pub fn slot_mut(&mut self, slot: EquipSlot) -> &mut Option<Item> {
        match slot {
            EquipSlot::Weapon => &mut self.weapon,
            EquipSlot::Armor => &mut self.armor,
            EquipSlot::Accessory => &mut self.accessory,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PetEffects {
    #[serde(default)]
    pub cultivation_bonus_per_year: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pet {
    pub id: String,
    pub name: String,
    pub species: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub effects: PetEffects,
}

/// Reward granted when a quest or secret realm completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Reward {
    #[serde(default)]
    pub linh_thach: i64,
    #[serde(default)]
    pub cultivation: f64,
    #[serde(default)]
    pub item: Option<Item>,
}

/// A location-bound, multi-tick side-track with a per-tick health cost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quest {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub location: String,
    pub duration: u32,
    #[serde(default)]
    pub reward: Reward,
    #[serde(default)]
    pub health_cost_per_turn: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveQuest {
    #[serde(flatten)]
    pub quest: Quest,
    #[serde(default)]
    pub progress: u32,
}

/// A multi-tick expedition with a large deferred reward. Mutually exclusive
/// with quests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecretRealm {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub duration: u32,
    #[serde(default)]
    pub progress: u32,
    #[serde(default)]
    pub reward: Reward,
}

fn default_max_health() -> f64 {
    100.0
}

fn default_gain_modifier() -> f64 {
    1.0
}

fn default_realm_name() -> String {
    REALMS[0].name.to_string()
}

fn default_next_threshold() -> f64 {
    REALMS[1].min_cultivation
}

fn default_sect() -> String {
    data::FREE_CULTIVATOR.to_string()
}

fn default_sect_rank() -> String {
    SECT_RANKS[0].name.to_string()
}

fn default_location() -> String {
    data::LOCATIONS[0].name.to_string()
}

/// The single mutable aggregate owned by `GameState`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub name: String,
    #[serde(default)]
    pub gender: Gender,
    pub age: f64,
    pub health: f64,
    #[serde(default = "default_max_health")]
    pub max_health: f64,
    #[serde(default = "default_realm_name")]
    pub realm: String,
    #[serde(default)]
    pub cultivation: f64,
    #[serde(default = "default_next_threshold")]
    pub cultivation_for_next_realm: f64,
    #[serde(default)]
    pub attack: f64,
    #[serde(default)]
    pub defense: f64,
    #[serde(default)]
    pub inventory: Vec<Item>,
    #[serde(default)]
    pub equipment: Equipment,
    #[serde(default)]
    pub linh_thach: i64,
    #[serde(default)]
    pub cultivation_technique: Option<CultivationTechnique>,
    #[serde(default = "default_location")]
    pub current_location: String,
    #[serde(default)]
    pub active_quest: Option<ActiveQuest>,
    #[serde(default)]
    pub talents: Vec<String>,
    #[serde(default)]
    pub talent_cultivation_bonus: f64,
    #[serde(default)]
    pub avatar_url: String,
    #[serde(default)]
    pub spouse_id: Option<String>,
    #[serde(default = "default_sect")]
    pub sect: String,
    #[serde(default)]
    pub family: String,
    #[serde(default = "default_sect_rank")]
    pub sect_rank: String,
    #[serde(default)]
    pub pets: Vec<Pet>,
    #[serde(default = "default_gain_modifier")]
    pub linh_thach_gain_modifier: f64,
    #[serde(default = "default_gain_modifier")]
    pub cultivation_gain_modifier: f64,
}

impl Player {
    /// Sum of the per-tick passive bonuses from technique, talent, and pets.
    #[must_use]
    pub fn passive_bonus(&self) -> f64 {
        let technique = self
            .cultivation_technique
            .as_ref()
            .map_or(0.0, CultivationTechnique::bonus);
        let pets: f64 = self
            .pets
            .iter()
            .map(|p| p.effects.cultivation_bonus_per_year)
            .sum();
        technique + self.talent_cultivation_bonus + pets
    }

    #[must_use]
    pub fn realm_index(&self) -> usize {
        data::realm_index(&self.realm).unwrap_or(0)
    }

    /// Move an inventory item into its equipment slot, returning the
    /// displaced item (if any) to the inventory. Stat deltas follow the item.
    pub fn equip_item(&mut self, item_id: &str) -> Option<String> {
        let idx = self.inventory.iter().position(|i| i.id == item_id)?;
        let slot = EquipSlot::for_item_type(self.inventory[idx].item_type)?;
        let item = self.inventory.remove(idx);

        if let Some(old) = self.equipment.slot_mut(slot).take() {
            self.attack -= old.effects.attack;
            self.defense -= old.effects.defense;
            self.inventory.push(old);
        }
        self.attack += item.effects.attack;
        self.defense += item.effects.defense;
        let name = item.name.clone();
        *self.equipment.slot_mut(slot) = Some(item);
        Some(name)
    }

    /// Reverse of `equip_item`.
    pub fn unequip_item(&mut self, item_id: &str) -> Option<String> {
        for slot in [EquipSlot::Weapon, EquipSlot::Armor, EquipSlot::Accessory] {
            let matches = self
                .equipment
                .slot(slot)
                .as_ref()
                .is_some_and(|i| i.id == item_id);
            if matches {
                if let Some(item) = self.equipment.slot_mut(slot).take() {
                    self.attack -= item.effects.attack;
                    self.defense -= item.effects.defense;
                    let name = item.name.clone();
                    self.inventory.push(item);
                    return Some(name);
                }
            }
        }
        None
    }

    /// Consume a consumable: heal capped at missing health, grant cultivation.
    /// Returns `(name, healed, cultivation)` when the item was used.
    pub fn use_item(&mut self, item_id: &str) -> Option<(String, f64, f64)> {
        let idx = self
            .inventory
            .iter()
            .position(|i| i.id == item_id && i.item_type == ItemType::Consumable)?;
        let item = self.inventory.remove(idx);
        let healed = (self.max_health - self.health)
            .min(item.effects.health)
            .max(0.0);
        self.health += healed;
        self.cultivation += item.effects.cultivation;
        Some((item.name, healed, item.effects.cultivation))
    }

    /// Learn a technique scroll, replacing the current technique and
    /// consuming the scroll. Returns `(new_name, old_name)`.
    pub fn learn_technique(&mut self, item_id: &str) -> Option<(String, Option<String>)> {
        let idx = self.inventory.iter().position(|i| {
            i.id == item_id && i.item_type == ItemType::TechniqueScroll && i.technique.is_some()
        })?;
        let item = self.inventory.remove(idx);
        let technique = item.technique?;
        let old = self
            .cultivation_technique
            .replace(technique)
            .map(|t| t.name);
        let new_name = self
            .cultivation_technique
            .as_ref()
            .map(|t| t.name.clone())
            .unwrap_or_default();
        Some((new_name, old))
    }

    /// Discard an inventory item. Equipped items cannot be dropped.
    pub fn drop_item(&mut self, item_id: &str) -> Option<String> {
        let idx = self.inventory.iter().position(|i| i.id == item_id)?;
        Some(self.inventory.remove(idx).name)
    }
}

/// Choices made on the character creation screen.
#[derive(Debug, Clone)]
pub struct CharacterOptions {
    pub name: String,
    pub gender: Gender,
    pub talent: TalentGrade,
    pub family: FamilyBackground,
    pub sect: SectChoice,
    pub avatar_url: String,
    pub nsfw_allowed: bool,
}

/// Build the starting player from creation choices. Item ids are drawn from
/// the caller's serial source so they stay unique within the save.
#[must_use]
pub fn create_player(
    options: &CharacterOptions,
    next_item_id: &mut impl FnMut(&str) -> String,
) -> Player {
    let sect = data::sect_details(options.sect);
    let trimmed = options.name.trim();
    let name = if trimmed.is_empty() {
        "Vô Danh".to_string()
    } else {
        trimmed.to_string()
    };

    let mut player = Player {
        name,
        gender: options.gender,
        age: 16.0,
        health: 100.0,
        max_health: 100.0,
        realm: REALMS[0].name.to_string(),
        cultivation: 0.0,
        cultivation_for_next_realm: REALMS[1].min_cultivation,
        attack: 5.0,
        defense: 5.0,
        inventory: Vec::new(),
        equipment: Equipment::default(),
        linh_thach: 10,
        cultivation_technique: Some(CultivationTechnique {
            name: "Dẫn Khí Quyết".to_string(),
            rank: TechniqueRank::PhamPham,
            description: "Công pháp cơ bản để dẫn linh khí vào cơ thể.".to_string(),
            effects: TechniqueEffects {
                cultivation_bonus: 5.0,
            },
        }),
        current_location: sect.name.to_string(),
        active_quest: None,
        talents: vec![options.talent.display_name().to_string()],
        talent_cultivation_bonus: options.talent.cultivation_bonus(),
        avatar_url: options.avatar_url.clone(),
        spouse_id: None,
        sect: sect.name.to_string(),
        family: String::new(),
        sect_rank: SECT_RANKS[0].name.to_string(),
        pets: Vec::new(),
        linh_thach_gain_modifier: 1.0,
        cultivation_gain_modifier: 1.0,
    };

    match options.family {
        FamilyBackground::Merchant => {
            player.family = "thương nhân".to_string();
            player.linh_thach += 500;
        }
        FamilyBackground::Martial => {
            player.family = "võ gia".to_string();
            player.max_health = (player.max_health * 1.1).round();
            player.health = player.max_health;
        }
        FamilyBackground::Fallen => {
            player.family = "suy tàn".to_string();
            player.cultivation_technique = Some(CultivationTechnique {
                name: "Công Pháp Gia Truyền".to_string(),
                rank: TechniqueRank::PhamPham,
                description: "Một công pháp cổ xưa từ gia tộc đã suy tàn.".to_string(),
                effects: TechniqueEffects {
                    cultivation_bonus: 8.0,
                },
            });
        }
    }

    player.attack += sect.attack;
    player.defense += sect.defense;
    if sect.max_health > 0.0 {
        player.max_health += sect.max_health;
        player.health = player.max_health;
    }
    player.linh_thach += sect.linh_thach;
    if let Some(technique) = &sect.starting_technique {
        player.cultivation_technique = Some(technique.clone());
    }

    for starter in &sect.starter_items {
        let item = Item {
            id: next_item_id(starter.name),
            name: starter.name.to_string(),
            item_type: starter.item_type,
            description: starter.description.to_string(),
            effects: ItemEffects {
                attack: starter.attack,
                defense: 0.0,
                health: starter.health,
                cultivation: 0.0,
            },
            cost: Some(0),
            technique: None,
        };
        player.inventory.push(item);
    }

    // Sword-sect disciples start with their blade drawn.
    if options.sect == SectChoice::ThienKiem {
        if let Some(weapon_id) = player
            .inventory
            .iter()
            .find(|i| i.item_type == ItemType::Weapon)
            .map(|i| i.id.clone())
        {
            player.equip_item(&weapon_id);
        }
    }

    player
}
