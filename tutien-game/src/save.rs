//! The persisted save document: a JSON mirror of `GameState` plus a version
//! number, with tolerant decoding and value-level migrations for legacy
//! documents.
//!
//! One format quirk: at the top of the realm ladder there is no next
//! threshold, so `cultivationForNextRealm` is stored as `f64::MAX`
//! (serialized as `1.7976931348623157e308`). Decoding re-derives the same
//! sentinel from the realm table.

use log::warn;
use serde_json::Value;
use thiserror::Error;

use crate::sanitize::sanitize;
use crate::state::GameState;

/// Bumped whenever decoding needs to treat older documents specially.
pub const SAVE_VERSION: u32 = 2;

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("save document is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("save document is not a JSON object")]
    NotAnObject,
    #[error("save document has no player")]
    MissingPlayer,
}

/// Storage collaborator. Documents are opaque strings; the gateway never
/// inspects them.
pub trait PersistenceGateway {
    fn load(&self) -> anyhow::Result<Option<String>>;
    fn save(&mut self, document: &str) -> anyhow::Result<()>;
}

/// In-memory gateway for tests and headless runs.
#[derive(Debug, Default)]
pub struct MemoryGateway {
    document: Option<String>,
}

impl PersistenceGateway for MemoryGateway {
    fn load(&self) -> anyhow::Result<Option<String>> {
        Ok(self.document.clone())
    }

    fn save(&mut self, document: &str) -> anyhow::Result<()> {
        self.document = Some(document.to_string());
        Ok(())
    }
}

/// Serialize a state into the versioned document.
pub fn encode(state: &GameState) -> Result<String, SaveError> {
    let mut doc = serde_json::to_value(state)?;
    if let Some(obj) = doc.as_object_mut() {
        obj.insert("saveVersion".to_string(), Value::from(SAVE_VERSION));
    }
    Ok(serde_json::to_string(&doc)?)
}

/// Rehydrate a raw document. Missing fields default; unknown fields are
/// ignored; documents without a player are rejected outright. The returned
/// state has been migrated, sanitized, and its RNG rehydrated.
pub fn decode(raw: &str) -> Result<GameState, SaveError> {
    let mut doc: Value = serde_json::from_str(raw)?;
    let obj = doc.as_object_mut().ok_or(SaveError::NotAnObject)?;
    if !obj.get("player").is_some_and(Value::is_object) {
        return Err(SaveError::MissingPlayer);
    }

    let version = obj
        .get("saveVersion")
        .and_then(Value::as_u64)
        .unwrap_or(1) as u32;
    let mut confessions: Vec<String> = Vec::new();
    if version < 2 {
        migrate_v1(obj, &mut confessions);
    }

    let mut state: GameState = serde_json::from_value(doc)?;
    for text in confessions {
        state.push_log(text);
    }
    state.rehydrate_rng();
    sanitize(&mut state);
    Ok(state)
}

/// Version 1 documents could carry quests without a duration, which would
/// otherwise run forever. Those quests are cancelled with a confession.
fn migrate_v1(obj: &mut serde_json::Map<String, Value>, confessions: &mut Vec<String>) {
    let Some(player) = obj.get_mut("player").and_then(Value::as_object_mut) else {
        return;
    };
    let broken_quest = player
        .get("activeQuest")
        .and_then(Value::as_object)
        .is_some_and(|q| !q.contains_key("duration"));
    if broken_quest {
        warn!("cancelling legacy quest without a duration");
        let title = player
            .get("activeQuest")
            .and_then(|q| q.get("title"))
            .and_then(Value::as_str)
            .unwrap_or("không rõ")
            .to_string();
        player.insert("activeQuest".to_string(), Value::Null);
        confessions.push(format!(
            "Nhiệm vụ cũ \"{title}\" không còn tương thích và đã bị hủy bỏ."
        ));
    }
}
