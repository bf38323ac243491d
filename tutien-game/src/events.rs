//! Oracle payload types: the yearly event, its choices, and the typed
//! effects bag. Everything the oracle sends is optional and coerced to a
//! no-op when missing or malformed; gameplay never fails on a bad payload.

use serde::{Deserialize, Serialize};

use crate::player::{CultivationTechnique, ItemEffects, ItemType, PetEffects, Quest, Reward};

/// Item payload as the oracle supplies it (no id yet; the resolver mints one).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewItemData {
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

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPetData {
    pub name: String,
    pub species: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub effects: PetEffects,
}

/// Quest payload without id or progress; a blank title gets a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewQuestData {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: String,
    #[serde(default = "default_quest_duration")]
    pub duration: u32,
    #[serde(default)]
    pub reward: Reward,
    #[serde(default)]
    pub health_cost_per_turn: f64,
}

fn default_quest_duration() -> u32 {
    1
}

impl NewQuestData {
    #[must_use]
    pub fn into_quest(self, id: String) -> Quest {
        let title = if self.title.trim().is_empty() {
            "Nhiệm vụ vô danh".to_string()
        } else {
            self.title
        };
        Quest {
            id,
            title,
            description: self.description,
            location: self.location,
            duration: self.duration.max(1),
            reward: self.reward,
            health_cost_per_turn: self.health_cost_per_turn,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSecretRealmData {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_quest_duration")]
    pub duration: u32,
    #[serde(default)]
    pub reward: Reward,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipDelta {
    pub npc_id: String,
    #[serde(default)]
    pub points: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpouseRef {
    pub npc_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TournamentAction {
    Join,
    Decline,
    Fight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuctionAction {
    Join,
    Decline,
    Bid,
    Pass,
    Leave,
}

/// The effects bag on one choice. Keys are independent and all optional;
/// unknown keys from the oracle are dropped by serde.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceEffects {
    #[serde(default)]
    pub cultivation_gained: Option<f64>,
    #[serde(default)]
    pub health_change: Option<f64>,
    #[serde(default)]
    pub linh_thach_change: Option<i64>,
    #[serde(default)]
    pub new_item: Option<NewItemData>,
    #[serde(default)]
    pub new_quest: Option<NewQuestData>,
    #[serde(default)]
    pub new_pet: Option<NewPetData>,
    #[serde(default)]
    pub start_secret_realm: Option<NewSecretRealmData>,
    #[serde(default)]
    pub relationship_change: Option<RelationshipDelta>,
    #[serde(default)]
    pub new_spouse: Option<SpouseRef>,
    #[serde(default)]
    pub dual_cultivation: Option<bool>,
    #[serde(default)]
    pub tournament_action: Option<TournamentAction>,
    #[serde(default)]
    pub auction_action: Option<AuctionAction>,
    #[serde(default)]
    pub breakthrough_attempt: Option<bool>,
}

impl ChoiceEffects {
    /// Dispatches that bypass the generic resolver.
    #[must_use]
    pub const fn is_special(&self) -> bool {
        self.tournament_action.is_some()
            || self.auction_action.is_some()
            || matches!(self.breakthrough_attempt, Some(true))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventChoice {
    #[serde(default)]
    pub text: String,
    /// Optional success chance percentage (1-100). Absent means guaranteed.
    #[serde(default)]
    pub success_chance: Option<u8>,
    #[serde(default)]
    pub effects: ChoiceEffects,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearlyEvent {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub choices: Vec<EventChoice>,
}

impl YearlyEvent {
    /// Whether the payload is usable as-is. A missing description or empty
    /// choice list means the caller must substitute the fallback event.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        !self.description.trim().is_empty() && !self.choices.is_empty()
    }

    /// Repair choice labels the oracle left blank.
    pub fn normalize(&mut self) {
        for (idx, choice) in self.choices.iter_mut().enumerate() {
            if choice.text.trim().is_empty() {
                choice.text = format!("Lựa chọn {}", idx + 1);
            }
            if let Some(chance) = choice.success_chance {
                choice.success_chance = Some(chance.clamp(1, 100));
            }
        }
    }
}

/// Deterministic local event used whenever the oracle fails or returns a
/// malformed payload: meditate for cultivation, or rest for health.
#[must_use]
pub fn fallback_event(location: &str, technique_bonus: f64) -> YearlyEvent {
    YearlyEvent {
        description: format!(
            "Một năm trôi qua trong tĩnh lặng khi bạn đang ở {location}. Bạn quyết định tập trung vào việc gì?"
        ),
        choices: vec![
            EventChoice {
                text: "Chuyên tâm tu luyện.".to_string(),
                success_chance: None,
                effects: ChoiceEffects {
                    cultivation_gained: Some(25.0 + technique_bonus),
                    ..ChoiceEffects::default()
                },
            },
            EventChoice {
                text: "Tịnh dưỡng, phục hồi.".to_string(),
                success_chance: None,
                effects: ChoiceEffects {
                    health_change: Some(20.0),
                    ..ChoiceEffects::default()
                },
            },
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effects_bag_tolerates_unknown_and_missing_keys() {
        let json = r#"{
            "text": "Nhặt lấy thanh kiếm.",
            "effects": {
                "cultivationGained": 10,
                "mysteryKnob": 42,
                "newItem": { "name": "Cổ Kiếm", "type": "weapon" }
            }
        }"#;
        let choice: EventChoice = serde_json::from_str(json).unwrap();
        assert_eq!(choice.effects.cultivation_gained, Some(10.0));
        let item = choice.effects.new_item.unwrap();
        assert_eq!(item.name, "Cổ Kiếm");
        assert_eq!(item.item_type, ItemType::Weapon);
        assert!(choice.effects.new_quest.is_none());
    }

    #[test]
    fn empty_effects_is_a_noop_bag() {
        let choice: EventChoice = serde_json::from_str(r#"{"text": "Bỏ qua."}"#).unwrap();
        assert_eq!(choice.effects, ChoiceEffects::default());
        assert!(!choice.effects.is_special());
    }

    #[test]
    fn malformed_event_detected() {
        let event: YearlyEvent = serde_json::from_str(r#"{"description": ""}"#).unwrap();
        assert!(!event.is_well_formed());
        let event: YearlyEvent =
            serde_json::from_str(r#"{"description": "x", "choices": []}"#).unwrap();
        assert!(!event.is_well_formed());
    }

    #[test]
    fn normalize_fills_blank_choice_text() {
        let mut event = YearlyEvent {
            description: "Sự kiện".to_string(),
            choices: vec![EventChoice {
                text: "  ".to_string(),
                success_chance: Some(0),
                effects: ChoiceEffects::default(),
            }],
        };
        event.normalize();
        assert_eq!(event.choices[0].text, "Lựa chọn 1");
        assert_eq!(event.choices[0].success_chance, Some(1));
    }

    #[test]
    fn blank_quest_title_is_defaulted() {
        let data = NewQuestData {
            title: " ".to_string(),
            description: String::new(),
            location: "Rừng Rậm".to_string(),
            duration: 0,
            reward: Reward::default(),
            health_cost_per_turn: 0.0,
        };
        let quest = data.into_quest("quest-1".to_string());
        assert_eq!(quest.title, "Nhiệm vụ vô danh");
        assert_eq!(quest.duration, 1);
    }
}
