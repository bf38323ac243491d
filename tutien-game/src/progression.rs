//! The time-advance step and the event resolver. A tick is half a year;
//! exactly one thing happens per tick: a side-track progresses, a gate event
//! fires, or the oracle is asked for a free event.

use log::debug;

use crate::data::{self, REALMS};
use crate::events::{ChoiceEffects, EventChoice, YearlyEvent, fallback_event};
use crate::npc::{RelationshipStatus, progress_npcs};
use crate::player::{Pet, Reward, SecretRealm};
use crate::sanitize::sanitize;
use crate::state::GameState;
use crate::{auction, shop, tournament};

/// Years between tournament invitations, measured from the starting age.
pub const TOURNAMENT_INTERVAL: u64 = 50;
/// Years between auction invitations; suppressed on tournament years.
pub const AUCTION_INTERVAL: u64 = 20;
/// Base breakthrough success percentage before the difficulty modifier.
pub const BREAKTHROUGH_BASE_CHANCE: f64 = 70.0;
/// Fraction of the realm span lost on a failed breakthrough.
pub const BREAKTHROUGH_FAILURE_LOSS: f64 = 0.2;

const STARTING_AGE: u64 = 16;

/// What a tick left for the engine to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickResult {
    /// Handled locally: side-track progressed, gate event presented, or the
    /// tick was refused (game over / event pending).
    Settled,
    /// Free tick; the caller should consult the oracle for a yearly event.
    NeedsOracle,
}

/// Advance one half-year tick. Steps 1 through 7 always apply; the branch at
/// the end decides what, if anything, confronts the player.
pub fn advance_time(state: &mut GameState) -> TickResult {
    if state.is_game_over || state.current_event.is_some() {
        return TickResult::Settled;
    }

    state.has_traveled_this_year = false;

    // 1. Recover a tenth of missing health.
    state.player.health = (state.player.health + state.player.max_health * 0.1)
        .round()
        .min(state.player.max_health);

    // 2. Half a year passes.
    let whole_year = advance_age(state);

    // 3. Passive cultivation gain.
    apply_passive_gain(state);

    // 4. Salary on whole-year boundaries.
    if whole_year {
        pay_salary(state);
    }

    shop::refresh_shop(state);

    // 5. At most one side-track consumes the tick.
    let consumed = tick_secret_realm(state) || tick_quest(state);

    // 6. The world moves on regardless.
    progress_npcs(&mut state.npcs, state.rng.as_mut());

    // 7. Repair and death checks.
    if sanitize(state) {
        return TickResult::Settled;
    }

    if consumed {
        return TickResult::Settled;
    }

    // 8. Gate events preempt the oracle.
    if state.is_breakthrough_pending {
        state.current_event = Some(breakthrough_event(&state.player.realm));
        return TickResult::Settled;
    }
    if breakthrough_eligible(state) {
        state.is_breakthrough_pending = true;
        state.push_major(format!(
            "Tu vi của bạn đã viên mãn! Bình cảnh {} bắt đầu lung lay, có thể thử đột phá.",
            state.player.realm
        ));
        return TickResult::Settled;
    }
    if whole_year {
        if let Some(years) = years_past_start(state) {
            if state.tournament.is_none() && years > 0 && years % TOURNAMENT_INTERVAL == 0 {
                state.current_event = Some(tournament::invitation_event());
                return TickResult::Settled;
            }
            if state.auction.is_none()
                && years > 0
                && years % AUCTION_INTERVAL == 0
                && years % TOURNAMENT_INTERVAL != 0
            {
                state.current_event = Some(auction::invitation_event());
                return TickResult::Settled;
            }
        }
    }

    TickResult::NeedsOracle
}

/// True when the tick landed on a whole-year boundary.
fn advance_age(state: &mut GameState) -> bool {
    state.player.age += 0.5;
    let whole = state.player.age.fract() == 0.0;
    if whole {
        state.year += 1;
    }
    whole
}

fn years_past_start(state: &GameState) -> Option<u64> {
    let age = state.player.age;
    if age.fract() != 0.0 || age < STARTING_AGE as f64 {
        return None;
    }
    Some(age as u64 - STARTING_AGE)
}

fn apply_passive_gain(state: &mut GameState) {
    let gain = (15.0 + state.player.passive_bonus()) / 2.0 * state.player.cultivation_gain_modifier;
    state.player.cultivation += gain;
}

fn pay_salary(state: &mut GameState) {
    if state.player.sect == data::FREE_CULTIVATOR {
        return;
    }
    let Some(rank) = data::rank_by_name(&state.player.sect_rank) else {
        return;
    };
    if rank.salary <= 0 {
        return;
    }
    let amount = (rank.salary as f64 * state.player.linh_thach_gain_modifier).round() as i64;
    state.player.linh_thach += amount;
    state.push_log(format!(
        "Bổng lộc {} của {}: {amount} linh thạch.",
        rank.name, state.player.sect
    ));
}

fn tick_secret_realm(state: &mut GameState) -> bool {
    let Some(realm) = state.active_secret_realm.as_mut() else {
        return false;
    };
    realm.progress += 1;
    if realm.progress >= realm.duration {
        let Some(finished) = state.active_secret_realm.take() else {
            return true;
        };
        state.push_major(format!(
            "Bạn đã khám phá xong {} và thu hoạch đầy mình!",
            finished.name
        ));
        apply_reward(state, &finished.reward);
    } else {
        let name = realm.name.clone();
        let progress = realm.progress;
        let duration = realm.duration;
        state.push_log(format!(
            "Bạn tiến sâu hơn vào {name} ({progress}/{duration})."
        ));
    }
    true
}

fn tick_quest(state: &mut GameState) -> bool {
    let at_location = state
        .player
        .active_quest
        .as_ref()
        .is_some_and(|q| q.quest.location == state.player.current_location);
    if !at_location {
        return false;
    }
    let Some(active) = state.player.active_quest.as_mut() else {
        return false;
    };
    active.progress += 1;
    state.player.health -= active.quest.health_cost_per_turn;

    if active.progress >= active.quest.duration {
        let Some(finished) = state.player.active_quest.take() else {
            return true;
        };
        state.push_major(format!(
            "Nhiệm vụ \"{}\" đã hoàn thành!",
            finished.quest.title
        ));
        apply_reward(state, &finished.quest.reward);
    } else {
        let title = active.quest.title.clone();
        let progress = active.progress;
        let duration = active.quest.duration;
        state.push_log(format!(
            "Nhiệm vụ \"{title}\" tiến triển ({progress}/{duration})."
        ));
    }
    true
}

fn apply_reward(state: &mut GameState, reward: &Reward) {
    if reward.linh_thach != 0 {
        let amount =
            (reward.linh_thach as f64 * state.player.linh_thach_gain_modifier).round() as i64;
        state.player.linh_thach += amount;
    }
    if reward.cultivation != 0.0 {
        state.player.cultivation += reward.cultivation * state.player.cultivation_gain_modifier;
    }
    if let Some(item) = &reward.item {
        let mut granted = item.clone();
        granted.id = state.next_item_id(&granted.name);
        state.push_log(format!("Nhận được vật phẩm: {}.", granted.name));
        state.player.inventory.push(granted);
    }
}

fn breakthrough_eligible(state: &GameState) -> bool {
    let idx = state.player.realm_index();
    REALMS.get(idx + 1).is_some()
        && state.player.cultivation >= state.player.cultivation_for_next_realm
}

fn breakthrough_event(realm: &str) -> YearlyEvent {
    YearlyEvent {
        description: format!(
            "Linh khí trong cơ thể cuồn cuộn, bình cảnh {realm} đã lỏng lẻo đến cực hạn. \
             Đột phá thành công sẽ bước lên cảnh giới mới, thất bại sẽ tổn thương nguyên khí."
        ),
        choices: vec![
            EventChoice {
                text: "Vận công đột phá!".to_string(),
                success_chance: None,
                effects: ChoiceEffects {
                    breakthrough_attempt: Some(true),
                    ..ChoiceEffects::default()
                },
            },
            EventChoice {
                text: "Tiếp tục củng cố đạo cơ.".to_string(),
                success_chance: None,
                effects: ChoiceEffects::default(),
            },
        ],
    }
}

/// Roll the breakthrough through the state RNG.
pub fn attempt_breakthrough(state: &mut GameState) {
    let roll = state.roll_percent();
    resolve_breakthrough(state, roll);
}

/// Breakthrough with an explicit roll in `[0, 100)`. Success when the roll
/// falls below `70 + difficulty modifier`.
pub fn resolve_breakthrough(state: &mut GameState, roll: f64) {
    state.is_breakthrough_pending = false;
    let idx = state.player.realm_index();
    let Some(next) = REALMS.get(idx + 1) else {
        return;
    };

    let chance = BREAKTHROUGH_BASE_CHANCE + state.difficulty.breakthrough_modifier();
    if roll < chance {
        state.player.realm = next.name.to_string();
        state.player.cultivation_for_next_realm = REALMS
            .get(idx + 2)
            .map_or(f64::MAX, |r| r.min_cultivation);
        state.player.max_health += 50.0;
        state.player.health = state.player.max_health;
        state.player.attack += 10.0;
        state.player.defense += 10.0;
        state.push_major(format!(
            "Đột phá thành công! Bạn đã bước vào cảnh giới {}.",
            next.name
        ));
        promote_if_eligible(state);
    } else {
        let span = next.min_cultivation - REALMS[idx].min_cultivation;
        state.player.cultivation =
            (state.player.cultivation - span * BREAKTHROUGH_FAILURE_LOSS).max(0.0);
        state.player.health -= state.player.max_health / 2.0;
        state.push_major(
            "Đột phá thất bại! Linh khí phản phệ, tu vi tổn hao nặng nề, thương thế trầm trọng.",
        );
    }
    sanitize(state);
}

/// Re-evaluate sect rank after a realm advance; promotion may carry the
/// sect's milestone technique.
fn promote_if_eligible(state: &mut GameState) {
    if state.player.sect == data::FREE_CULTIVATOR {
        return;
    }
    let eligible = data::eligible_rank(state.player.realm_index());
    let current_idx = data::rank_index(&state.player.sect_rank).unwrap_or(0);
    let eligible_idx = data::rank_index(eligible.name).unwrap_or(0);
    if eligible_idx <= current_idx {
        return;
    }
    state.player.sect_rank = eligible.name.to_string();
    state.push_major(format!(
        "{} thăng chức cho bạn lên {}!",
        state.player.sect, eligible.name
    ));

    if eligible.name == data::TECHNIQUE_MILESTONE_RANK {
        let milestone = data::milestone_technique();
        let current_bonus = state
            .player
            .cultivation_technique
            .as_ref()
            .map_or(0.0, |t| t.bonus());
        if milestone.bonus() > current_bonus {
            state.push_major(format!(
                "Tông môn ban thưởng công pháp trấn phái: {}!",
                milestone.name
            ));
            state.player.cultivation_technique = Some(milestone);
        }
    }
}

/// Apply a chosen event choice, rolling through the state RNG.
pub fn resolve_choice(state: &mut GameState, choice: &EventChoice) {
    let roll = if choice.effects.is_special() || choice.success_chance.is_none() {
        0.0
    } else {
        state.roll_percent()
    };
    resolve_choice_with_roll(state, choice, roll);
}

/// Apply a chosen event choice with an explicit success roll in `[0, 100)`.
/// The generic path is itself a half-year tick; the special actions dispatch
/// to their engines without consuming time.
pub fn resolve_choice_with_roll(state: &mut GameState, choice: &EventChoice, roll: f64) {
    let event_text = state
        .current_event
        .take()
        .map(|e| e.description)
        .unwrap_or_default();

    if choice.effects.is_special() {
        if let Some(action) = choice.effects.tournament_action {
            tournament::handle_action(state, action);
        } else if let Some(action) = choice.effects.auction_action {
            auction::handle_action(state, action);
        } else if choice.effects.breakthrough_attempt == Some(true) {
            attempt_breakthrough(state);
        }
        sanitize(state);
        return;
    }

    state.has_traveled_this_year = false;
    let whole_year = advance_age(state);
    apply_passive_gain(state);
    if whole_year {
        pay_salary(state);
    }

    let (succeeded, annotation) = match choice.success_chance {
        Some(chance) => {
            if roll < f64::from(chance) {
                (true, " (Thành công)")
            } else {
                (false, " (Thất bại)")
            }
        }
        None => (true, ""),
    };

    state.push_log(format!(
        "{event_text} Bạn đã chọn: \"{}\".{annotation}",
        choice.text
    ));

    if succeeded {
        apply_effects(state, &choice.effects);
    } else {
        let penalty = 5.0 + state.roll_unit() * 10.0;
        state.player.health -= penalty;
        debug!("choice failed, health penalty {penalty:.1}");
    }

    progress_npcs(&mut state.npcs, state.rng.as_mut());
    sanitize(state);
}

fn apply_effects(state: &mut GameState, effects: &ChoiceEffects) {
    let multiplier = state.difficulty.reward_multiplier();

    if let Some(gained) = effects.cultivation_gained {
        let mut scaled = gained * multiplier;
        if scaled > 0.0 {
            scaled *= state.player.cultivation_gain_modifier;
        }
        state.player.cultivation += scaled;
    }
    if let Some(delta) = effects.health_change {
        // Health swings are flat regardless of difficulty.
        state.player.health += delta;
    }
    if let Some(delta) = effects.linh_thach_change {
        let mut scaled = delta as f64 * multiplier;
        if scaled > 0.0 {
            scaled *= state.player.linh_thach_gain_modifier;
        }
        state.player.linh_thach += scaled.round() as i64;
    }

    if let Some(data) = &effects.new_item {
        let id = state.next_item_id(&data.name);
        let item = crate::player::Item {
            id,
            name: data.name.clone(),
            item_type: data.item_type,
            description: data.description.clone(),
            effects: data.effects,
            cost: data.cost,
            technique: data.technique.clone(),
        };
        state.push_log(format!("Nhận được vật phẩm: {}.", item.name));
        state.player.inventory.push(item);
    }

    if let Some(data) = &effects.new_pet {
        let id = state.mint_id("pet", &data.name);
        state.push_log(format!("Bạn thu phục linh thú {} ({}).", data.name, data.species));
        state.player.pets.push(Pet {
            id,
            name: data.name.clone(),
            species: data.species.clone(),
            description: data.description.clone(),
            effects: data.effects,
        });
    }

    let side_track_free =
        state.player.active_quest.is_none() && state.active_secret_realm.is_none();
    if let Some(data) = &effects.start_secret_realm {
        if side_track_free {
            let id = state.mint_id("realm", &data.name);
            state.push_major(format!("Bạn bước vào bí cảnh {}!", data.name));
            state.active_secret_realm = Some(SecretRealm {
                id,
                name: data.name.clone(),
                description: data.description.clone(),
                duration: data.duration.max(1),
                progress: 0,
                reward: data.reward.clone(),
            });
        }
    } else if let Some(data) = &effects.new_quest {
        if side_track_free {
            let id = state.mint_id("quest", &data.title);
            let quest = data.clone().into_quest(id);
            state.push_log(format!("Nhận nhiệm vụ mới: \"{}\" tại {}.", quest.title, quest.location));
            state.player.active_quest = Some(crate::player::ActiveQuest { quest, progress: 0 });
        }
    }

    if let Some(delta) = &effects.relationship_change {
        apply_relationship_change(state, &delta.npc_id, delta.points);
    }

    if let Some(spouse) = &effects.new_spouse {
        marry(state, &spouse.npc_id);
    }

    if effects.dual_cultivation == Some(true) {
        dual_cultivation(state);
    }
}

/// Oracle-supplied deltas are doubled so relationships move at a readable
/// pace.
fn apply_relationship_change(state: &mut GameState, npc_id: &str, points: i64) {
    let Some(npc) = state.npcs.iter_mut().find(|n| n.id == npc_id) else {
        return;
    };
    npc.adjust_relationship(points * 2);
    let name = npc.name.clone();
    let status = npc.status.as_str().to_string();
    if points >= 0 {
        state.push_log(format!("Quan hệ với {name} trở nên tốt hơn ({status})."));
    } else {
        state.push_log(format!("Quan hệ với {name} xấu đi ({status})."));
    }
}

fn marry(state: &mut GameState, npc_id: &str) {
    if state.player.spouse_id.is_some() {
        return;
    }
    let Some(npc) = state.npcs.iter_mut().find(|n| n.id == npc_id) else {
        return;
    };
    if npc.is_lover {
        return;
    }
    npc.is_lover = true;
    npc.status = RelationshipStatus::Spouse;
    state.player.spouse_id = Some(npc.id.clone());
    let name = npc.name.clone();
    state.push_major(format!(
        "Bạn và {name} kết thành đạo lữ, cùng nhau tu luyện đến bạc đầu!"
    ));
}

/// Ten percent of the remaining distance to the next realm, at least 50.
fn dual_cultivation(state: &mut GameState) {
    if state.player.spouse_id.is_none() {
        return;
    }
    let remaining =
        (state.player.cultivation_for_next_realm - state.player.cultivation).max(0.0);
    let gain = (remaining * 0.1).max(50.0);
    state.player.cultivation += gain;
    state.push_log(format!(
        "Song tu cùng đạo lữ, tu vi tăng {gain:.0} điểm."
    ));
}

/// Install the oracle's event, or the deterministic fallback when the
/// payload is unusable.
pub fn install_event(state: &mut GameState, event: Option<YearlyEvent>) {
    let technique_bonus = state
        .player
        .cultivation_technique
        .as_ref()
        .map_or(0.0, |t| t.bonus());
    let mut event = match event {
        Some(e) if e.is_well_formed() => e,
        _ => fallback_event(&state.player.current_location, technique_bonus),
    };
    event.normalize();
    state.current_event = Some(event);
}
