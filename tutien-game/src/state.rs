//! The root game state and its bookkeeping: event log, difficulty knobs,
//! seeded randomness, and id minting. All gameplay mutation happens through
//! free functions taking `&mut GameState`.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};

use crate::auction::AuctionState;
use crate::data;
use crate::events::YearlyEvent;
use crate::npc::Npc;
use crate::player::{Item, Player, SecretRealm};
use crate::tournament::TournamentState;

/// Difficulty picked at creation; immutable for the life of the save.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Difficulty {
    #[serde(rename = "đơn giản")]
    Simple,
    #[default]
    #[serde(rename = "trung bình")]
    Medium,
    #[serde(rename = "khó")]
    Hard,
    #[serde(rename = "ác mộng")]
    Nightmare,
}

impl Difficulty {
    /// Flat bonus added to the 70% breakthrough base chance.
    #[must_use]
    pub const fn breakthrough_modifier(self) -> f64 {
        match self {
            Self::Simple => 15.0,
            Self::Medium => 0.0,
            Self::Hard => -15.0,
            Self::Nightmare => -30.0,
        }
    }

    /// Scales positive event rewards.
    #[must_use]
    pub const fn reward_multiplier(self) -> f64 {
        match self {
            Self::Simple => 1.2,
            Self::Medium => 1.0,
            Self::Hard => 0.8,
            Self::Nightmare => 0.6,
        }
    }

    /// Scales generated opponent stats.
    #[must_use]
    pub const fn opponent_multiplier(self) -> f64 {
        match self {
            Self::Simple => 0.8,
            Self::Medium => 1.0,
            Self::Hard => 1.2,
            Self::Nightmare => 1.4,
        }
    }
}

/// One line of the narrative log. `is_major` marks entries the UI highlights.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventLogEntry {
    pub id: u64,
    pub year: u32,
    pub text: String,
    #[serde(default)]
    pub is_major: bool,
}

/// A tournament champion recorded on the genius ranking board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankEntry {
    pub rank: u32,
    pub name: String,
    pub realm: String,
    pub year: u32,
    #[serde(default)]
    pub is_player: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub speaker: String,
    pub text: String,
}

/// An open dialogue with one NPC. Carried in saves so a conversation can
/// resume after reload; the engine itself never reads the history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub npc_id: String,
    #[serde(default)]
    pub history: Vec<ChatMessage>,
}

fn default_true() -> bool {
    true
}

/// Everything a save file holds. Every field defaults so partial saves from
/// older versions deserialize cleanly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub player: Player,
    #[serde(default = "default_year")]
    pub year: u32,
    /// Newest entries first.
    #[serde(default)]
    pub event_log: Vec<EventLogEntry>,
    #[serde(default)]
    pub is_game_over: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default = "default_true")]
    pub game_started: bool,
    #[serde(default)]
    pub current_event: Option<YearlyEvent>,
    #[serde(default)]
    pub has_traveled_this_year: bool,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub tournament: Option<TournamentState>,
    #[serde(default)]
    pub genius_ranking: Vec<RankEntry>,
    #[serde(default)]
    pub npcs: Vec<Npc>,
    #[serde(default)]
    pub nsfw_allowed: bool,
    #[serde(default)]
    pub active_secret_realm: Option<SecretRealm>,
    #[serde(default)]
    pub shop_inventory: Vec<Item>,
    #[serde(default)]
    pub shop_last_refreshed: u32,
    #[serde(default)]
    pub is_breakthrough_pending: bool,
    #[serde(default)]
    pub auction: Option<AuctionState>,
    #[serde(default)]
    pub active_conversation: Option<Conversation>,
    #[serde(default)]
    pub seed: u64,
    #[serde(default)]
    pub item_serial: u64,
    #[serde(default)]
    pub log_serial: u64,
    #[serde(skip)]
    pub rng: Option<ChaCha20Rng>,
}

fn default_year() -> u32 {
    1
}

impl GameState {
    /// Fresh state around a newly created player.
    #[must_use]
    pub fn new(player: Player, difficulty: Difficulty, nsfw_allowed: bool) -> Self {
        Self {
            player,
            year: 1,
            event_log: Vec::new(),
            is_game_over: false,
            error: None,
            game_started: true,
            current_event: None,
            has_traveled_this_year: false,
            difficulty,
            tournament: None,
            genius_ranking: Vec::new(),
            npcs: data::INITIAL_NPCS.clone(),
            nsfw_allowed,
            active_secret_realm: None,
            shop_inventory: Vec::new(),
            shop_last_refreshed: 0,
            is_breakthrough_pending: false,
            auction: None,
            active_conversation: None,
            seed: 0,
            item_serial: 0,
            log_serial: 0,
            rng: None,
        }
    }

    /// Attach a deterministic RNG. The seed persists in saves so replays of
    /// the same save are reproducible.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self.rng = Some(ChaCha20Rng::seed_from_u64(seed));
        self
    }

    /// Rebuild the RNG after deserialization. Saves written without a seed
    /// stay RNG-less and roll the deterministic floor.
    pub fn rehydrate_rng(&mut self) {
        if self.rng.is_none() && self.seed != 0 {
            self.rng = Some(ChaCha20Rng::seed_from_u64(self.seed));
        }
    }

    /// Uniform roll in `[0, 100)`. Without an RNG the floor value 0.0 is
    /// returned, which makes chance checks succeed deterministically.
    pub fn roll_percent(&mut self) -> f64 {
        match self.rng.as_mut() {
            Some(rng) => rng.random_range(0.0..100.0),
            None => 0.0,
        }
    }

    /// Uniform roll in `[0, 1)`, floor 0.0 without an RNG.
    pub fn roll_unit(&mut self) -> f64 {
        match self.rng.as_mut() {
            Some(rng) => rng.random::<f64>(),
            None => 0.0,
        }
    }

    /// Uniform index below `len`, 0 without an RNG. `len` must be nonzero.
    pub fn roll_index(&mut self, len: usize) -> usize {
        match self.rng.as_mut() {
            Some(rng) => rng.random_range(0..len),
            None => 0,
        }
    }

    /// Mint a save-unique id. One serial feeds every prefix, so ids never
    /// collide across kinds either.
    pub fn mint_id(&mut self, prefix: &str, name: &str) -> String {
        self.item_serial += 1;
        format!("{prefix}-{}-{}", self.item_serial, name)
    }

    pub fn next_item_id(&mut self, name: &str) -> String {
        self.mint_id("item", name)
    }

    pub fn push_log(&mut self, text: impl Into<String>) {
        self.push_entry(text.into(), false);
    }

    pub fn push_major(&mut self, text: impl Into<String>) {
        self.push_entry(text.into(), true);
    }

    fn push_entry(&mut self, text: String, is_major: bool) {
        self.log_serial += 1;
        self.event_log.insert(
            0,
            EventLogEntry {
                id: self.log_serial,
                year: self.year,
                text,
                is_major,
            },
        );
    }

    /// Keep health inside `[0, max_health]` and flag death.
    pub fn clamp_health(&mut self) {
        self.player.health = self.player.health.clamp(0.0, self.player.max_health);
        if self.player.health <= 0.0 {
            self.player.health = 0.0;
            self.is_game_over = true;
        }
    }
}

/// Move to a named location. One trip per tick; the flag resets on advance.
/// A secret realm holds the player in place until it ends.
pub fn travel(state: &mut GameState, destination: &str) -> bool {
    if state.is_game_over || state.has_traveled_this_year || state.active_secret_realm.is_some() {
        return false;
    }
    let Some(location) = data::location_by_name(destination) else {
        return false;
    };
    if state.player.current_location == location.name {
        return false;
    }
    state.player.current_location = location.name.to_string();
    state.has_traveled_this_year = true;
    state.push_log(format!("Bạn đã lên đường đến {}.", location.name));
    true
}


#[cfg(test)]
mod tests {
    use super::testutil::sample_state;
    use super::*;

    #[test]
    fn log_is_newest_first_with_monotonic_ids() {
        let mut state = sample_state();
        state.push_log("một");
        state.push_major("hai");
        assert_eq!(state.event_log[0].text, "hai");
        assert!(state.event_log[0].is_major);
        assert!(state.event_log[0].id > state.event_log[1].id);
    }

    #[test]
    fn travel_once_per_year() {
        let mut state = sample_state();
        assert!(travel(&mut state, "Rừng Rậm"));
        assert_eq!(state.player.current_location, "Rừng Rậm");
        assert!(!travel(&mut state, "Thành Trấn"));
        state.has_traveled_this_year = false;
        assert!(travel(&mut state, "Thành Trấn"));
    }

    #[test]
    fn travel_rejects_unknown_and_current_location() {
        let mut state = sample_state();
        assert!(!travel(&mut state, "Âm Tào Địa Phủ"));
        assert!(!travel(&mut state, "Thiên Kiếm Tông"));
        assert!(!state.has_traveled_this_year);
    }

    #[test]
    fn secret_realm_pins_the_player_in_place() {
        let mut state = sample_state();
        state.active_secret_realm = Some(crate::player::SecretRealm {
            id: "realm-1".to_string(),
            name: "Cổ Mộ".to_string(),
            description: String::new(),
            duration: 3,
            progress: 0,
            reward: crate::player::Reward::default(),
        });
        assert!(!travel(&mut state, "Rừng Rậm"));
        assert_eq!(state.player.current_location, "Thiên Kiếm Tông");
    }

    #[test]
    fn seeded_rolls_are_reproducible() {
        let mut a = sample_state().with_seed(42);
        let mut b = sample_state().with_seed(42);
        for _ in 0..10 {
            assert_eq!(a.roll_percent().to_bits(), b.roll_percent().to_bits());
        }
    }

    #[test]
    fn no_rng_rolls_the_floor() {
        let mut state = sample_state();
        assert_eq!(state.roll_percent(), 0.0);
        assert_eq!(state.roll_index(7), 0);
    }

    #[test]
    fn rehydrate_restores_rng_from_seed() {
        let state = sample_state().with_seed(9);
        let json = serde_json::to_string(&state).unwrap();
        let mut restored: GameState = serde_json::from_str(&json).unwrap();
        assert!(restored.rng.is_none());
        restored.rehydrate_rng();
        assert!(restored.rng.is_some());
    }

    #[test]
    fn clamp_health_flags_death() {
        let mut state = sample_state();
        state.player.health = -5.0;
        state.clamp_health();
        assert_eq!(state.player.health, 0.0);
        assert!(state.is_game_over);
    }
}
