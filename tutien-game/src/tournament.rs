//! The Thiên Kiêu Chiến: a single-elimination bracket the player is invited
//! to at fixed year intervals. Joining costs a fixed fee; each round the
//! player fights exactly one match while the rest of the bracket resolves
//! itself.

use serde::{Deserialize, Serialize};

use crate::data;
use crate::events::{ChoiceEffects, EventChoice, TournamentAction, YearlyEvent};
use crate::state::{GameState, RankEntry};

pub const ENTRY_FEE: i64 = 2_000;
pub const POOL_SIZE: usize = 15;
pub const PARTICIPANT_COUNT: usize = 8;

/// Prize per round won, `(linh_thach, cultivation)`. Indexed by round,
/// clamped to the final entry.
pub const ROUND_REWARDS: [(i64, f64); 4] = [
    (1_000, 500.0),
    (2_500, 1_200.0),
    (5_000, 3_000.0),
    (15_000, 8_000.0),
];

/// One fighter in the bracket; the player appears as a stat snapshot taken
/// at join time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Combatant {
    pub name: String,
    #[serde(default)]
    pub title: String,
    pub attack: f64,
    pub defense: f64,
    #[serde(default)]
    pub is_player: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TournamentMatch {
    pub left: Combatant,
    pub right: Combatant,
    #[serde(default)]
    pub winner: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TournamentState {
    pub year: u32,
    #[serde(default = "default_active")]
    pub is_active: bool,
    /// 1-based.
    pub current_round: u32,
    #[serde(default)]
    pub participants: Vec<Combatant>,
    #[serde(default)]
    pub rounds: Vec<Vec<TournamentMatch>>,
}

fn default_active() -> bool {
    true
}

/// The gate event offering entry.
#[must_use]
pub fn invitation_event() -> YearlyEvent {
    YearlyEvent {
        description: format!(
            "Đại hội Thiên Kiêu Chiến sắp khai mạc! Các thiên tài trẻ tuổi từ khắp nơi đổ về \
             tranh tài. Phí báo danh là {ENTRY_FEE} linh thạch."
        ),
        choices: vec![
            EventChoice {
                text: "Báo danh tham gia.".to_string(),
                success_chance: None,
                effects: ChoiceEffects {
                    tournament_action: Some(TournamentAction::Join),
                    ..ChoiceEffects::default()
                },
            },
            EventChoice {
                text: "Bỏ qua, chuyên tâm tu luyện.".to_string(),
                success_chance: None,
                effects: ChoiceEffects {
                    tournament_action: Some(TournamentAction::Decline),
                    ..ChoiceEffects::default()
                },
            },
        ],
    }
}

fn match_event(round: u32, opponent: &Combatant) -> YearlyEvent {
    let title = if opponent.title.is_empty() {
        String::new()
    } else {
        format!(" \"{}\"", opponent.title)
    };
    YearlyEvent {
        description: format!(
            "Vòng {round}: đối thủ của bạn là {}{title}. Khí thế của hắn không hề tầm thường.",
            opponent.name
        ),
        choices: vec![EventChoice {
            text: "Xuất chiến!".to_string(),
            success_chance: None,
            effects: ChoiceEffects {
                tournament_action: Some(TournamentAction::Fight),
                ..ChoiceEffects::default()
            },
        }],
    }
}

/// Fight resolution on explicit jitter rolls in `[0, 1)`. Raw damage floors
/// at 1 so an outmatched fighter still chips, then both sides are scaled
/// into the `[0.8, 1.2]` band; the player takes ties.
#[must_use]
pub fn fight_with_rolls(
    player: &Combatant,
    opponent: &Combatant,
    player_roll: f64,
    opponent_roll: f64,
) -> bool {
    let player_damage = (player.attack - opponent.defense).max(1.0) * (0.8 + player_roll * 0.4);
    let opponent_damage = (opponent.attack - player.defense).max(1.0) * (0.8 + opponent_roll * 0.4);
    player_damage >= opponent_damage
}

/// Generated opponent stats orbit the player's own power, scaled by
/// difficulty.
fn generate_pool(state: &mut GameState) -> Vec<Combatant> {
    let base = (state.player.attack + state.player.defense) / 2.0;
    let scale = state.difficulty.opponent_multiplier();

    let mut names: Vec<&str> = data::OPPONENT_NAMES.to_vec();
    let mut titles: Vec<&str> = data::OPPONENT_TITLES.to_vec();
    let mut pool = Vec::with_capacity(POOL_SIZE);
    for _ in 0..POOL_SIZE.min(names.len()) {
        let name = names.remove(state.roll_index(names.len()));
        let title = titles.remove(state.roll_index(titles.len()));
        let attack = (base * (0.8 + state.roll_unit() * 0.4) * scale).round().max(1.0);
        let defense = (base * (0.8 + state.roll_unit() * 0.4) * scale).round().max(1.0);
        pool.push(Combatant {
            name: name.to_string(),
            title: title.to_string(),
            attack,
            defense,
            is_player: false,
        });
    }
    pool
}

fn player_combatant(state: &GameState) -> Combatant {
    Combatant {
        name: state.player.name.clone(),
        title: String::new(),
        attack: state.player.attack,
        defense: state.player.defense,
        is_player: true,
    }
}

fn pair_round(mut fighters: Vec<Combatant>, state: &mut GameState) -> Vec<TournamentMatch> {
    // Fisher-Yates so the player's path through the bracket varies.
    for i in (1..fighters.len()).rev() {
        let j = state.roll_index(i + 1);
        fighters.swap(i, j);
    }
    let mut matches = Vec::new();
    let mut iter = fighters.into_iter();
    while let (Some(left), Some(right)) = (iter.next(), iter.next()) {
        matches.push(TournamentMatch {
            left,
            right,
            winner: None,
        });
    }
    matches
}

fn present_player_match(state: &mut GameState) {
    let Some(tournament) = &state.tournament else {
        return;
    };
    let round = tournament.current_round;
    let opponent = tournament
        .rounds
        .get(round as usize - 1)
        .and_then(|matches| {
            matches.iter().find_map(|m| {
                if m.left.is_player {
                    Some(m.right.clone())
                } else if m.right.is_player {
                    Some(m.left.clone())
                } else {
                    None
                }
            })
        });
    if let Some(opponent) = opponent {
        state.current_event = Some(match_event(round, &opponent));
    } else {
        // Player has no match this round; the bracket is corrupt. Bail out.
        state.tournament = None;
    }
}

/// Dispatch target for `effects.tournamentAction`.
pub fn handle_action(state: &mut GameState, action: TournamentAction) {
    match action {
        TournamentAction::Join => join(state),
        TournamentAction::Decline => {
            state.push_log(
                "Bạn từ chối lời mời Thiên Kiêu Chiến, tiếp tục con đường tu luyện của riêng mình.",
            );
        }
        TournamentAction::Fight => fight(state),
    }
}

fn join(state: &mut GameState) {
    if state.player.linh_thach < ENTRY_FEE {
        state.push_log(format!(
            "Không đủ linh thạch để báo danh Thiên Kiêu Chiến (cần {ENTRY_FEE})."
        ));
        return;
    }
    state.player.linh_thach -= ENTRY_FEE;

    let mut pool = generate_pool(state);
    pool.truncate(PARTICIPANT_COUNT - 1);
    let mut participants = vec![player_combatant(state)];
    participants.append(&mut pool);

    let first_round = pair_round(participants.clone(), state);
    state.tournament = Some(TournamentState {
        year: state.year,
        is_active: true,
        current_round: 1,
        participants,
        rounds: vec![first_round],
    });
    state.push_major(format!(
        "Bạn đã báo danh Thiên Kiêu Chiến với {PARTICIPANT_COUNT} thiên tài tham dự!"
    ));
    present_player_match(state);
}

fn fight(state: &mut GameState) {
    let Some(tournament) = state.tournament.as_ref() else {
        state.push_log("Không có trận đấu nào đang chờ.");
        return;
    };
    let round_idx = tournament.current_round as usize - 1;
    let Some(my_match) = tournament
        .rounds
        .get(round_idx)
        .and_then(|ms| ms.iter().find(|m| m.left.is_player || m.right.is_player))
        .cloned()
    else {
        state.push_log("Không có trận đấu nào đang chờ.");
        state.tournament = None;
        return;
    };

    let (me, opponent) = if my_match.left.is_player {
        (my_match.left.clone(), my_match.right.clone())
    } else {
        (my_match.right.clone(), my_match.left.clone())
    };
    let my_roll = state.roll_unit();
    let their_roll = state.roll_unit();
    let won = fight_with_rolls(&me, &opponent, my_roll, their_roll);

    if !won {
        state.push_major(format!(
            "Bạn đã thất bại trước {} và bị loại khỏi Thiên Kiêu Chiến.",
            opponent.name
        ));
        state.tournament = None;
        return;
    }

    let round = state
        .tournament
        .as_ref()
        .map_or(1, |t| t.current_round);
    let reward_idx = (round as usize - 1).min(ROUND_REWARDS.len() - 1);
    let (linh_thach, cultivation) = ROUND_REWARDS[reward_idx];
    state.player.linh_thach += linh_thach;
    state.player.cultivation += cultivation;
    state.push_log(format!(
        "Bạn đánh bại {} ở vòng {round}, nhận {linh_thach} linh thạch và {cultivation:.0} điểm tu vi.",
        opponent.name
    ));

    let is_final = state
        .tournament
        .as_ref()
        .and_then(|t| t.rounds.get(round as usize - 1))
        .is_some_and(|ms| ms.len() == 1);
    if is_final {
        crown_champion(state);
        return;
    }

    advance_round(state, &me);
}

fn crown_champion(state: &mut GameState) {
    let rank = state.genius_ranking.len() as u32 + 1;
    let entry = RankEntry {
        rank,
        name: state.player.name.clone(),
        realm: state.player.realm.clone(),
        year: state.year,
        is_player: true,
    };
    state.genius_ranking.push(entry);
    state.push_major(format!(
        "{} đăng quang quán quân Thiên Kiêu Chiến, danh chấn thiên hạ! Bảng Thiên Kiêu ghi danh hạng {rank}.",
        state.player.name
    ));
    state.tournament = None;
}

/// Coin-flip the remaining matches, collect winners, pair the next round.
fn advance_round(state: &mut GameState, me: &Combatant) {
    let round_idx = match state.tournament.as_ref() {
        Some(t) => t.current_round as usize - 1,
        None => return,
    };

    let mut winners: Vec<Combatant> = vec![me.clone()];
    let others: Vec<TournamentMatch> = state
        .tournament
        .as_ref()
        .and_then(|t| t.rounds.get(round_idx))
        .map(|ms| {
            ms.iter()
                .filter(|m| !m.left.is_player && !m.right.is_player)
                .cloned()
                .collect()
        })
        .unwrap_or_default();
    for m in &others {
        let winner = if state.roll_unit() < 0.5 {
            m.left.clone()
        } else {
            m.right.clone()
        };
        winners.push(winner);
    }

    if let Some(t) = state.tournament.as_mut() {
        if let Some(matches) = t.rounds.get_mut(round_idx) {
            for m in matches.iter_mut() {
                if m.left.is_player || m.right.is_player {
                    m.winner = Some(me.name.clone());
                }
            }
        }
    }
    let next_round = pair_round(winners, state);
    if next_round.is_empty() {
        crown_champion(state);
        return;
    }
    if let Some(t) = state.tournament.as_mut() {
        t.current_round += 1;
        t.rounds.push(next_round);
    }
    present_player_match(state);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::testutil::sample_state;

    #[test]
    fn insufficient_funds_leaves_state_untouched() {
        let mut state = sample_state();
        state.player.linh_thach = 100;
        let log_before = state.event_log.len();
        handle_action(&mut state, TournamentAction::Join);
        assert!(state.tournament.is_none());
        assert_eq!(state.player.linh_thach, 100);
        assert_eq!(state.event_log.len(), log_before + 1);
        assert!(state.event_log[0].text.contains("Không đủ linh thạch"));
    }

    #[test]
    fn join_builds_a_power_of_two_bracket() {
        let mut state = sample_state().with_seed(7);
        state.player.linh_thach = 5_000;
        handle_action(&mut state, TournamentAction::Join);
        let tournament = state.tournament.as_ref().expect("tournament started");
        assert_eq!(state.player.linh_thach, 3_000);
        assert_eq!(tournament.participants.len(), PARTICIPANT_COUNT);
        assert_eq!(tournament.rounds[0].len(), PARTICIPANT_COUNT / 2);
        assert!(state.current_event.is_some());
    }

    #[test]
    fn winning_every_round_crowns_a_champion_in_three_fights() {
        // Without an RNG every jitter is the floor, so the stat snapshot
        // decides each match and the player's inflated stats always win.
        let mut state = sample_state();
        state.player.linh_thach = 5_000;
        state.player.attack = 1_000.0;
        state.player.defense = 1_000.0;
        handle_action(&mut state, TournamentAction::Join);

        let mut fights = 0;
        while state.tournament.is_some() {
            handle_action(&mut state, TournamentAction::Fight);
            fights += 1;
            assert!(fights <= 3, "bracket of 8 must finish in 3 rounds");
        }
        assert_eq!(fights, 3);
        assert_eq!(state.genius_ranking.len(), 1);
        assert_eq!(state.genius_ranking[0].rank, 1);
        assert!(state.genius_ranking[0].is_player);
    }

    #[test]
    fn losing_terminates_without_ranking_entry() {
        let mut state = sample_state();
        state.difficulty = crate::state::Difficulty::Nightmare;
        state.player.linh_thach = 5_000;
        state.player.attack = 10.0;
        state.player.defense = 0.0;
        handle_action(&mut state, TournamentAction::Join);
        // Nightmare pools orbit base 5 at x1.4, giving 6/6 opponents that
        // out-damage the undefended player.
        handle_action(&mut state, TournamentAction::Fight);
        assert!(state.tournament.is_none());
        assert!(state.genius_ranking.is_empty());
    }

    #[test]
    fn outmatched_fighters_still_chip_for_one() {
        let wall = Combatant {
            name: "a".to_string(),
            title: String::new(),
            attack: 1.0,
            defense: 10.0,
            is_player: true,
        };
        let mirror = Combatant {
            name: "b".to_string(),
            title: String::new(),
            attack: 1.0,
            defense: 10.0,
            is_player: false,
        };
        // Neither side pierces the other's defense, so both chip at the
        // floor of 1 and the jitter decides.
        assert!(fight_with_rolls(&wall, &mirror, 0.9, 0.0));
        assert!(!fight_with_rolls(&wall, &mirror, 0.0, 0.9));
    }

    #[test]
    fn ties_favor_the_player() {
        let a = Combatant {
            name: "a".to_string(),
            title: String::new(),
            attack: 10.0,
            defense: 5.0,
            is_player: true,
        };
        let b = Combatant {
            name: "b".to_string(),
            title: String::new(),
            attack: 10.0,
            defense: 5.0,
            is_player: false,
        };
        assert!(fight_with_rolls(&a, &b, 0.5, 0.5));
    }
}
