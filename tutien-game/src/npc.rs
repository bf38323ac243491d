//! NPC entities, relationship bands, and background progression.

use rand::Rng;
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::data::REALMS;
use crate::player::Gender;

/// Relationship bands, most hostile first. `Spouse` is never derived from
/// points; only marriage sets it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum RelationshipStatus {
    #[serde(rename = "Tử địch")]
    Nemesis,
    #[serde(rename = "Kẻ thù")]
    Enemy,
    #[default]
    #[serde(rename = "Xa lạ")]
    Stranger,
    #[serde(rename = "Người quen")]
    Acquaintance,
    #[serde(rename = "Bạn bè")]
    Friend,
    #[serde(rename = "Thân thiết")]
    Close,
    #[serde(rename = "Tri kỷ")]
    Soulmate,
    #[serde(rename = "Bạn đời")]
    Spouse,
}

impl RelationshipStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Nemesis => "Tử địch",
            Self::Enemy => "Kẻ thù",
            Self::Stranger => "Xa lạ",
            Self::Acquaintance => "Người quen",
            Self::Friend => "Bạn bè",
            Self::Close => "Thân thiết",
            Self::Soulmate => "Tri kỷ",
            Self::Spouse => "Bạn đời",
        }
    }

    /// Pure mapping from points to band.
    #[must_use]
    pub const fn from_points(points: i64) -> Self {
        if points <= -75 {
            Self::Nemesis
        } else if points <= -25 {
            Self::Enemy
        } else if points < 25 {
            Self::Stranger
        } else if points < 50 {
            Self::Acquaintance
        } else if points < 100 {
            Self::Friend
        } else if points < 200 {
            Self::Close
        } else {
            Self::Soulmate
        }
    }
}

impl fmt::Display for RelationshipStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Npc {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub gender: Gender,
    #[serde(default)]
    pub description: String,
    pub realm: String,
    #[serde(default)]
    pub cultivation: f64,
    #[serde(default)]
    pub relationship_points: i64,
    #[serde(default)]
    pub status: RelationshipStatus,
    #[serde(default)]
    pub is_lover: bool,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl Npc {
    /// Apply a relationship delta and re-derive the band. Lovers keep their
    /// spouse status regardless of points.
    pub fn adjust_relationship(&mut self, points: i64) {
        self.relationship_points = self.relationship_points.saturating_add(points);
        if !self.is_lover {
            self.status = RelationshipStatus::from_points(self.relationship_points);
        }
    }

    /// One background growth tick for this NPC. Pure per-NPC; the order of
    /// the roster does not matter. `rng: None` takes the deterministic floor.
    pub fn progress(&mut self, rng: Option<&mut ChaCha20Rng>) {
        let realm_idx = crate::data::realm_index(&self.realm).unwrap_or(0);
        let roll: f64 = rng.map_or(0.0, |r| r.random());
        #[allow(clippy::cast_precision_loss)]
        let rate = (10.0 + roll * 15.0) * (1.0 + realm_idx as f64 * 0.2) / 2.0;
        self.cultivation = (self.cultivation + rate).round();

        if realm_idx < REALMS.len() - 1 {
            let next = &REALMS[realm_idx + 1];
            if self.cultivation >= next.min_cultivation {
                self.realm = next.name.to_string();
            }
        }
    }
}

/// Advance every NPC by one tick.
pub fn progress_npcs(npcs: &mut [Npc], mut rng: Option<&mut ChaCha20Rng>) {
    for npc in npcs {
        npc.progress(rng.as_deref_mut());
    }
}
