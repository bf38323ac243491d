//! Save repair. Runs after every load and after each event resolution so a
//! malformed oracle payload or a hand-edited save can never wedge the game.
//! Repairs are confessed in the event log; the whole pass is idempotent.

use std::collections::HashSet;

use log::warn;

use crate::data::{self, REALMS, SECT_RANKS, SECTS};
use crate::npc::RelationshipStatus;
use crate::state::GameState;

fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() { value } else { fallback }
}

/// Highest realm whose entry threshold the given cultivation meets.
fn realm_for_cultivation(cultivation: f64) -> usize {
    REALMS
        .iter()
        .rposition(|r| cultivation >= r.min_cultivation)
        .unwrap_or(0)
}

/// Serial embedded in an `item-<n>-<name>` id, if the id has that shape.
fn item_id_serial(id: &str) -> Option<u64> {
    id.strip_prefix("item-")?.split('-').next()?.parse().ok()
}

/// Repair every reachable invariant violation in place, then run the
/// longevity and health death checks. Returns whether the player is dead.
pub fn sanitize(state: &mut GameState) -> bool {
    sanitize_player(state);
    sanitize_npcs(state);
    sanitize_side_tracks(state);
    sanitize_serials(state);
    check_death(state);
    state.is_game_over
}

fn sanitize_player(state: &mut GameState) {
    let mut repairs: Vec<String> = Vec::new();
    let player = &mut state.player;

    player.max_health = finite_or(player.max_health, 100.0).max(1.0);
    player.health = finite_or(player.health, player.max_health);
    player.health = player.health.clamp(0.0, player.max_health);
    player.age = finite_or(player.age, 16.0).max(0.0);
    player.cultivation = finite_or(player.cultivation, 0.0).max(0.0);
    player.attack = finite_or(player.attack, 0.0).max(0.0);
    player.defense = finite_or(player.defense, 0.0).max(0.0);
    player.linh_thach = player.linh_thach.max(0);
    player.linh_thach_gain_modifier = finite_or(player.linh_thach_gain_modifier, 1.0).max(0.0);
    player.cultivation_gain_modifier = finite_or(player.cultivation_gain_modifier, 1.0).max(0.0);
    player.talent_cultivation_bonus = finite_or(player.talent_cultivation_bonus, 0.0).max(0.0);

    let realm_idx = match data::realm_index(&player.realm) {
        Some(idx) => idx,
        None => {
            warn!("unknown realm {:?}, resetting progression", player.realm);
            repairs.push(format!(
                "Dữ liệu tu luyện bị hỏng (cảnh giới \"{}\" không tồn tại). Tu vi đặt lại về {}.",
                player.realm, REALMS[0].name
            ));
            player.realm = REALMS[0].name.to_string();
            player.cultivation = 0.0;
            0
        }
    };
    // The threshold always tracks the stored realm; the top realm uses an
    // unreachable sentinel so a pending breakthrough can never re-arm there.
    player.cultivation_for_next_realm = REALMS
        .get(realm_idx + 1)
        .map_or(f64::MAX, |r| r.min_cultivation);

    if player.sect.trim().is_empty() {
        player.sect = data::FREE_CULTIVATOR.to_string();
    }
    let sect_known = SECTS.iter().any(|s| s.name == player.sect);
    if sect_known && data::rank_index(&player.sect_rank).is_none() {
        warn!("unknown sect rank {:?}, demoting", player.sect_rank);
        repairs.push(format!(
            "Dữ liệu chức vị bị hỏng (\"{}\"). Trở về {}.",
            player.sect_rank, SECT_RANKS[0].name
        ));
        player.sect_rank = SECT_RANKS[0].name.to_string();
    }
    if data::location_by_name(&player.current_location).is_none() {
        player.current_location = data::LOCATIONS[0].name.to_string();
    }

    // Duplicate item ids cause equip/drop to hit the wrong item. Equipped
    // copies win; later inventory copies are discarded.
    let mut seen: HashSet<String> = HashSet::new();
    for slot in [
        &player.equipment.weapon,
        &player.equipment.armor,
        &player.equipment.accessory,
    ] {
        if let Some(item) = slot {
            seen.insert(item.id.clone());
        }
    }
    player.inventory.retain(|item| seen.insert(item.id.clone()));

    for text in repairs {
        state.push_log(text);
    }
}

fn sanitize_npcs(state: &mut GameState) {
    let mut seen: HashSet<String> = HashSet::new();
    state.npcs.retain(|npc| seen.insert(npc.id.clone()));

    for npc in &mut state.npcs {
        npc.cultivation = finite_or(npc.cultivation, 0.0).max(0.0);
        if data::realm_index(&npc.realm).is_none() {
            npc.realm = REALMS[realm_for_cultivation(npc.cultivation)]
                .name
                .to_string();
        }
        npc.status = if npc.is_lover {
            RelationshipStatus::Spouse
        } else {
            RelationshipStatus::from_points(npc.relationship_points)
        };
    }

    let spouse_valid = state
        .player
        .spouse_id
        .as_ref()
        .is_some_and(|id| state.npcs.iter().any(|npc| &npc.id == id && npc.is_lover));
    if !spouse_valid {
        state.player.spouse_id = None;
    }

    let conversation_valid = state
        .active_conversation
        .as_ref()
        .is_some_and(|c| state.npcs.iter().any(|npc| npc.id == c.npc_id));
    if !conversation_valid {
        state.active_conversation = None;
    }
}

fn sanitize_side_tracks(state: &mut GameState) {
    if let Some(active) = &mut state.player.active_quest {
        active.quest.duration = active.quest.duration.max(1);
        active.progress = active.progress.min(active.quest.duration);
    }
    if let Some(realm) = &mut state.active_secret_realm {
        realm.duration = realm.duration.max(1);
        realm.progress = realm.progress.min(realm.duration);
    }
    // The two side-tracks are mutually exclusive; the quest keeps priority.
    if state.player.active_quest.is_some() {
        state.active_secret_realm = None;
    }

    if state
        .tournament
        .as_ref()
        .is_some_and(|t| t.participants.is_empty())
    {
        state.tournament = None;
    }
    if state.auction.as_ref().is_some_and(|a| a.items.is_empty()) {
        state.auction = None;
    }
}

fn sanitize_serials(state: &mut GameState) {
    let mut max_serial = state.item_serial;
    let equipment = [
        &state.player.equipment.weapon,
        &state.player.equipment.armor,
        &state.player.equipment.accessory,
    ];
    let ids = state
        .player
        .inventory
        .iter()
        .map(|i| i.id.as_str())
        .chain(equipment.into_iter().flatten().map(|i| i.id.as_str()))
        .chain(state.shop_inventory.iter().map(|i| i.id.as_str()));
    for id in ids {
        if let Some(serial) = item_id_serial(id) {
            max_serial = max_serial.max(serial);
        }
    }
    state.item_serial = max_serial;

    let max_log = state.event_log.iter().map(|e| e.id).max().unwrap_or(0);
    state.log_serial = state.log_serial.max(max_log);
}

/// Longevity first, then health; each fires its log line exactly once.
fn check_death(state: &mut GameState) {
    if state.is_game_over {
        return;
    }
    let max_age = data::realm_by_name(&state.player.realm).map_or(REALMS[0].max_age, |r| r.max_age);
    if state.player.age >= max_age {
        state.is_game_over = true;
        state.push_major(format!(
            "Thọ nguyên cạn kiệt ở tuổi {:.0}. {} đã tọa hóa, để lại truyền thừa cho hậu nhân.",
            state.player.age, state.player.name
        ));
        return;
    }
    if state.player.health <= 0.0 {
        state.player.health = 0.0;
        state.is_game_over = true;
        state.push_major(format!(
            "Thương thế quá nặng, {} đã vẫn lạc. Con đường tu tiên chấm dứt tại đây.",
            state.player.name
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::{Item, ItemEffects, ItemType};
    use crate::state::testutil::sample_state;

    fn loose_item(id: &str) -> Item {
        Item {
            id: id.to_string(),
            name: "Linh Thạch Khoáng Mẫu".to_string(),
            item_type: ItemType::Material,
            description: String::new(),
            effects: ItemEffects::default(),
            cost: None,
            technique: None,
        }
    }

    #[test]
    fn sanitize_is_idempotent() {
        let mut state = sample_state();
        state.player.health = f64::NAN;
        state.player.realm = "Vô Danh Cảnh".to_string();
        state.player.linh_thach = -50;
        sanitize(&mut state);
        let once = state.clone();
        sanitize(&mut state);
        assert_eq!(state, once);
    }

    #[test]
    fn unknown_realm_resets_progression_with_confession() {
        let mut state = sample_state();
        state.player.realm = "???".to_string();
        state.player.cultivation = 6_000.0;
        sanitize(&mut state);
        assert_eq!(state.player.realm, "Luyện Khí");
        assert_eq!(state.player.cultivation, 0.0);
        assert_eq!(state.player.cultivation_for_next_realm, 1_000.0);
        assert!(state.event_log.iter().any(|e| e.text.contains("???")));
    }

    #[test]
    fn unknown_rank_only_repaired_for_known_sects() {
        let mut state = sample_state();
        state.player.sect_rank = "Chấp Sự".to_string();
        sanitize(&mut state);
        assert_eq!(state.player.sect_rank, "Ngoại Môn Đệ Tử");

        let mut free = sample_state();
        free.player.sect = "Tán Tu".to_string();
        free.player.sect_rank = "Chấp Sự".to_string();
        sanitize(&mut free);
        assert_eq!(free.player.sect_rank, "Chấp Sự");
    }

    #[test]
    fn longevity_death_fires_once_and_suppresses_health_death() {
        let mut state = sample_state();
        state.player.age = 120.0;
        state.player.health = 0.0;
        sanitize(&mut state);
        assert!(state.is_game_over);
        let death_lines = state.event_log.iter().filter(|e| e.is_major).count();
        assert_eq!(death_lines, 1);
        assert!(state.event_log[0].text.contains("Thọ nguyên"));
        sanitize(&mut state);
        assert_eq!(state.event_log.iter().filter(|e| e.is_major).count(), 1);
    }

    #[test]
    fn duplicate_item_ids_are_dropped() {
        let mut state = sample_state();
        state.player.inventory.push(loose_item("item-7-x"));
        state.player.inventory.push(loose_item("item-7-x"));
        sanitize(&mut state);
        let count = state
            .player
            .inventory
            .iter()
            .filter(|i| i.id == "item-7-x")
            .count();
        assert_eq!(count, 1);
    }

    #[test]
    fn item_serial_catches_up_to_seen_ids() {
        let mut state = sample_state();
        state.item_serial = 0;
        state.player.inventory.push(loose_item("item-41-x"));
        sanitize(&mut state);
        assert_eq!(state.item_serial, 41);
        assert_eq!(state.next_item_id("y"), "item-42-y");
    }

    #[test]
    fn stale_spouse_reference_is_cleared() {
        let mut state = sample_state();
        state.player.spouse_id = Some("npc_bien_mat".to_string());
        sanitize(&mut state);
        assert!(state.player.spouse_id.is_none());
    }

    #[test]
    fn quest_wins_over_secret_realm() {
        let mut state = sample_state();
        state.player.active_quest = Some(crate::player::ActiveQuest {
            quest: crate::player::Quest {
                id: "quest-1".to_string(),
                title: "Săn yêu thú".to_string(),
                description: String::new(),
                location: "Rừng Rậm".to_string(),
                duration: 3,
                reward: crate::player::Reward::default(),
                health_cost_per_turn: 5.0,
            },
            progress: 0,
        });
        state.active_secret_realm = Some(crate::player::SecretRealm {
            id: "realm-1".to_string(),
            name: "Cổ Mộ".to_string(),
            description: String::new(),
            duration: 2,
            progress: 0,
            reward: crate::player::Reward::default(),
        });
        sanitize(&mut state);
        assert!(state.player.active_quest.is_some());
        assert!(state.active_secret_realm.is_none());
    }
}
