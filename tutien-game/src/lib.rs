//! Tu Tien Idle core: a platform-agnostic cultivation-life simulation.
//!
//! The crate owns the full game rules: the half-year time tick, breakthrough
//! gambles, tournaments, auctions, quests and secret realms, NPC
//! relationships, and the tolerant save format. Narrative text comes from an
//! external [`EventOracle`]; persistence goes through a
//! [`PersistenceGateway`]. Both are collaborator traits so hosts (web UI,
//! headless tester) plug in their own.
//!
//! [`GameEngine`] composes the two around a [`GameState`] and enforces the
//! turn discipline: one transition at a time, stale oracle responses
//! discarded by session generation.

pub mod auction;
pub mod data;
pub mod events;
pub mod npc;
pub mod player;
pub mod progression;
pub mod sanitize;
pub mod save;
pub mod shop;
pub mod state;
pub mod tournament;

use async_trait::async_trait;
use log::{debug, warn};
use serde::Serialize;
use thiserror::Error;

pub use events::{AuctionAction, ChoiceEffects, EventChoice, TournamentAction, YearlyEvent};
pub use npc::{Npc, RelationshipStatus};
pub use player::{CharacterOptions, Gender, Item, ItemType, Player};
pub use progression::{TickResult, advance_time, resolve_choice};
pub use sanitize::sanitize as sanitize_state;
pub use save::{MemoryGateway, PersistenceGateway, SaveError};
pub use state::{Difficulty, EventLogEntry, GameState};

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("oracle transport failure: {0}")]
    Transport(String),
    #[error("oracle returned a malformed payload: {0}")]
    Malformed(String),
}

/// Snapshot handed to the oracle when asking for a yearly event.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OracleContext<'a> {
    pub player: &'a Player,
    pub npcs: &'a [Npc],
    pub year: u32,
    pub difficulty: Difficulty,
    pub nsfw_allowed: bool,
}

/// The narrative generator. Implementations wrap an LLM client; tests use
/// scripted doubles.
#[async_trait]
pub trait EventOracle {
    async fn yearly_event(&self, context: &OracleContext<'_>) -> Result<YearlyEvent, OracleError>;
}

/// Where the engine is in its turn cycle. All transitions check this; the
/// host never has to debounce its own inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnginePhase {
    #[default]
    Idle,
    AwaitingOracle,
    AwaitingChoice,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no game in progress")]
    NoGame,
    #[error("engine is busy ({0:?})")]
    Busy(EnginePhase),
    #[error("choice index {0} is out of range")]
    BadChoice(usize),
    #[error(transparent)]
    Save(#[from] SaveError),
    #[error("storage failure: {0}")]
    Storage(#[from] anyhow::Error),
}

/// What `prepare_tick` left behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickPlan {
    /// Settled locally; if a gate event was presented the phase is
    /// `AwaitingChoice`, otherwise `Idle`.
    Settled,
    /// The oracle must be consulted; carry this generation into
    /// `commit_oracle_event`.
    NeedsOracle { generation: u64 },
}

/// Outcome of committing an oracle response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Committed,
    /// The response belonged to a superseded session and was discarded.
    Stale,
}

pub struct GameEngine<O, S> {
    oracle: O,
    storage: S,
    state: Option<GameState>,
    phase: EnginePhase,
    generation: u64,
}

impl<O, S> GameEngine<O, S>
where
    O: EventOracle,
    S: PersistenceGateway,
{
    pub fn new(oracle: O, storage: S) -> Self {
        Self {
            oracle,
            storage,
            state: None,
            phase: EnginePhase::Idle,
            generation: 0,
        }
    }

    #[must_use]
    pub fn state(&self) -> Option<&GameState> {
        self.state.as_ref()
    }

    #[must_use]
    pub fn phase(&self) -> EnginePhase {
        self.phase
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Start a fresh game. Supersedes any in-flight oracle request.
    pub fn new_game(
        &mut self,
        options: &CharacterOptions,
        difficulty: Difficulty,
        seed: u64,
    ) -> &GameState {
        let mut serial = 0u64;
        let player = player::create_player(options, &mut |name| {
            serial += 1;
            format!("item-{serial}-{name}")
        });
        let mut state = GameState::new(player, difficulty, options.nsfw_allowed).with_seed(seed);
        state.item_serial = serial;
        state.push_major(format!(
            "{} gia nhập {}, bắt đầu con đường tu tiên!",
            state.player.name, state.player.sect
        ));
        self.generation += 1;
        self.phase = EnginePhase::Idle;
        self.state.insert(state)
    }

    /// Load the stored document if one exists. Supersedes any in-flight
    /// oracle request.
    pub fn load_game(&mut self) -> Result<bool, EngineError> {
        let Some(raw) = self.storage.load()? else {
            return Ok(false);
        };
        let state = save::decode(&raw)?;
        self.phase = if state.current_event.is_some() {
            EnginePhase::AwaitingChoice
        } else {
            EnginePhase::Idle
        };
        self.state = Some(state);
        self.generation += 1;
        Ok(true)
    }

    /// Full-document overwrite of the store. Callable from any phase; the
    /// autosave timer reads the current snapshot.
    pub fn save_game(&mut self) -> Result<(), EngineError> {
        let state = self.state.as_ref().ok_or(EngineError::NoGame)?;
        let document = save::encode(state)?;
        self.storage.save(&document)?;
        Ok(())
    }

    /// Run the synchronous part of a tick. On `NeedsOracle` the engine
    /// parks in `AwaitingOracle` until `commit_oracle_event`.
    pub fn prepare_tick(&mut self) -> Result<TickPlan, EngineError> {
        if self.phase != EnginePhase::Idle {
            return Err(EngineError::Busy(self.phase));
        }
        let state = self.state.as_mut().ok_or(EngineError::NoGame)?;
        match progression::advance_time(state) {
            TickResult::NeedsOracle => {
                self.phase = EnginePhase::AwaitingOracle;
                Ok(TickPlan::NeedsOracle {
                    generation: self.generation,
                })
            }
            TickResult::Settled => {
                if state.current_event.is_some() {
                    self.phase = EnginePhase::AwaitingChoice;
                }
                Ok(TickPlan::Settled)
            }
        }
    }

    /// Install an oracle response for the given session generation. A
    /// mismatched generation means the session was replaced mid-flight; the
    /// response is dropped on the floor.
    pub fn commit_oracle_event(
        &mut self,
        generation: u64,
        result: Result<YearlyEvent, OracleError>,
    ) -> CommitOutcome {
        if generation != self.generation {
            warn!(
                "discarding oracle response for generation {generation} (current {})",
                self.generation
            );
            return CommitOutcome::Stale;
        }
        let Some(state) = self.state.as_mut() else {
            return CommitOutcome::Stale;
        };
        match result {
            Ok(event) => {
                state.error = None;
                progression::install_event(state, Some(event));
            }
            Err(err) => {
                debug!("oracle failed, installing fallback: {err}");
                state.error = Some(err.to_string());
                progression::install_event(state, None);
            }
        }
        self.phase = EnginePhase::AwaitingChoice;
        CommitOutcome::Committed
    }

    /// One full tick: prepare, consult the oracle if needed, commit.
    pub async fn advance_year(&mut self) -> Result<(), EngineError> {
        match self.prepare_tick()? {
            TickPlan::Settled => Ok(()),
            TickPlan::NeedsOracle { generation } => {
                let result = {
                    let state = self.state.as_ref().ok_or(EngineError::NoGame)?;
                    let context = OracleContext {
                        player: &state.player,
                        npcs: &state.npcs,
                        year: state.year,
                        difficulty: state.difficulty,
                        nsfw_allowed: state.nsfw_allowed,
                    };
                    self.oracle.yearly_event(&context).await
                };
                self.commit_oracle_event(generation, result);
                Ok(())
            }
        }
    }

    /// Resolve the pending event with the choice at `index`.
    pub fn choose(&mut self, index: usize) -> Result<(), EngineError> {
        if self.phase != EnginePhase::AwaitingChoice {
            return Err(EngineError::Busy(self.phase));
        }
        let state = self.state.as_mut().ok_or(EngineError::NoGame)?;
        let choice = state
            .current_event
            .as_ref()
            .and_then(|e| e.choices.get(index))
            .cloned()
            .ok_or(EngineError::BadChoice(index))?;
        progression::resolve_choice(state, &choice);
        // Tournament matches chain follow-up events; otherwise back to idle.
        self.phase = if state.current_event.is_some() {
            EnginePhase::AwaitingChoice
        } else {
            EnginePhase::Idle
        };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{FamilyBackground, SectChoice, TalentGrade};

    struct ScriptedOracle {
        event: YearlyEvent,
    }

    #[async_trait]
    impl EventOracle for ScriptedOracle {
        async fn yearly_event(
            &self,
            _context: &OracleContext<'_>,
        ) -> Result<YearlyEvent, OracleError> {
            Ok(self.event.clone())
        }
    }

    struct FailingOracle;

    #[async_trait]
    impl EventOracle for FailingOracle {
        async fn yearly_event(
            &self,
            _context: &OracleContext<'_>,
        ) -> Result<YearlyEvent, OracleError> {
            Err(OracleError::Transport("mất kết nối".to_string()))
        }
    }

    fn options() -> CharacterOptions {
        CharacterOptions {
            name: "Trần Phàm".to_string(),
            gender: Gender::Male,
            talent: TalentGrade::Tam,
            family: FamilyBackground::Merchant,
            sect: SectChoice::ThienKiem,
            avatar_url: String::new(),
            nsfw_allowed: false,
        }
    }

    fn scripted_event() -> YearlyEvent {
        YearlyEvent {
            description: "Một vị lão giả thần bí xuất hiện trước mặt bạn.".to_string(),
            choices: vec![EventChoice {
                text: "Nhận lấy cơ duyên.".to_string(),
                success_chance: None,
                effects: ChoiceEffects {
                    cultivation_gained: Some(100.0),
                    ..ChoiceEffects::default()
                },
            }],
        }
    }

    #[tokio::test]
    async fn full_turn_cycle() {
        let oracle = ScriptedOracle {
            event: scripted_event(),
        };
        let mut engine = GameEngine::new(oracle, MemoryGateway::default());
        engine.new_game(&options(), Difficulty::Medium, 5);
        assert_eq!(engine.phase(), EnginePhase::Idle);

        engine.advance_year().await.unwrap();
        assert_eq!(engine.phase(), EnginePhase::AwaitingChoice);
        let cultivation = engine.state().unwrap().player.cultivation;

        engine.choose(0).unwrap();
        assert_eq!(engine.phase(), EnginePhase::Idle);
        assert!(engine.state().unwrap().player.cultivation > cultivation);
    }

    #[tokio::test]
    async fn oracle_failure_surfaces_error_and_fallback() {
        let mut engine = GameEngine::new(FailingOracle, MemoryGateway::default());
        engine.new_game(&options(), Difficulty::Medium, 5);
        engine.advance_year().await.unwrap();

        let state = engine.state().unwrap();
        assert!(state.error.as_deref().unwrap_or("").contains("mất kết nối"));
        let event = state.current_event.as_ref().expect("fallback installed");
        assert!(event.is_well_formed());
        assert_eq!(engine.phase(), EnginePhase::AwaitingChoice);
    }

    #[test]
    fn stale_oracle_response_is_discarded() {
        let oracle = ScriptedOracle {
            event: scripted_event(),
        };
        let mut engine = GameEngine::new(oracle, MemoryGateway::default());
        engine.new_game(&options(), Difficulty::Medium, 5);

        let TickPlan::NeedsOracle { generation } = engine.prepare_tick().unwrap() else {
            panic!("first tick should consult the oracle");
        };

        // A new game supersedes the in-flight request.
        engine.new_game(&options(), Difficulty::Medium, 6);
        let outcome = engine.commit_oracle_event(generation, Ok(scripted_event()));
        assert_eq!(outcome, CommitOutcome::Stale);
        assert!(engine.state().unwrap().current_event.is_none());
        assert_eq!(engine.phase(), EnginePhase::Idle);
    }

    #[test]
    fn busy_engine_refuses_a_second_tick() {
        let oracle = ScriptedOracle {
            event: scripted_event(),
        };
        let mut engine = GameEngine::new(oracle, MemoryGateway::default());
        engine.new_game(&options(), Difficulty::Medium, 5);
        engine.prepare_tick().unwrap();
        assert!(matches!(
            engine.prepare_tick(),
            Err(EngineError::Busy(EnginePhase::AwaitingOracle))
        ));
    }

    #[tokio::test]
    async fn save_and_load_round_trip_through_the_gateway() {
        let oracle = ScriptedOracle {
            event: scripted_event(),
        };
        let mut engine = GameEngine::new(oracle, MemoryGateway::default());
        engine.new_game(&options(), Difficulty::Hard, 5);
        engine.advance_year().await.unwrap();
        engine.choose(0).unwrap();
        let age = engine.state().unwrap().player.age;
        engine.save_game().unwrap();

        assert!(engine.load_game().unwrap());
        let restored = engine.state().unwrap();
        assert_eq!(restored.player.age, age);
        assert_eq!(restored.difficulty, Difficulty::Hard);
        assert_eq!(engine.phase(), EnginePhase::Idle);
    }

    #[test]
    fn load_without_a_document_reports_absence() {
        let oracle = ScriptedOracle {
            event: scripted_event(),
        };
        let mut engine = GameEngine::new(oracle, MemoryGateway::default());
        assert!(!engine.load_game().unwrap());
        assert!(engine.state().is_none());
    }
}
