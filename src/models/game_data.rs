//! # Per-User Progression Record
//!
//! One `UserGameData` document exists per user, stored at
//! `users/<userId>/gameData` in the remote document store. The engine
//! is the only writer; screens read it (directly or via subscription)
//! but never mutate it ad hoc.
//!
//! ## Invariants
//!
//! | Invariant | Enforced by |
//! |-----------|-------------|
//! | `xp` never decreases | XP amounts are unsigned and only added |
//! | `level == level_from_xp(xp)` | recomputed on every XP mutation |
//! | every badge has an achievements entry | unlock path writes both |
//! | one vibe entry per event | `vibes_history` keyed by event id |
//! | no duplicate event credits | `events_history` checked before append |
//!
//! ## Forward compatibility
//!
//! Every field carries a serde default, so records written by an older
//! client deserialize cleanly; missing newer fields come back as their
//! defaults and are filled in on the next persist.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::badges::BadgeId;
use crate::levels;
use crate::utils;

/// A single vibe rating for one event.
///
/// Keyed by event id in [`UserGameData::vibes_history`], so a user can
/// hold at most one stored rating per event; re-rating overwrites the
/// slot with the newest value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VibeEntry {
    /// Rating value, 1 to 5.
    pub nota: u8,
    /// When the rating was submitted, epoch milliseconds.
    pub timestamp: i64,
}

impl Default for VibeEntry {
    fn default() -> Self {
        Self {
            nota: 0,
            timestamp: 0,
        }
    }
}

/// Per-day challenge progress.
///
/// The day's challenge completes when the third vibe rating of that
/// day lands; `completed` latches and never resets within the day.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DailyChallenge {
    /// Vibe ratings submitted today.
    #[serde(rename = "vibesAvaliadasHoje")]
    pub vibes_rated_today: u32,
    /// Events credited today.
    #[serde(rename = "eventosVisitadosHoje")]
    pub events_visited_today: u32,
    /// Whether today's challenge already completed.
    pub completed: bool,
}

/// Audit entry paired with an unlocked badge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Achievement {
    /// Unlock moment, epoch milliseconds.
    pub unlocked_at: i64,
    /// Progress toward the badge at unlock time, when tracked.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<u32>,
    /// Progress ceiling, when tracked.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_progress: Option<u32>,
}

impl Default for Achievement {
    fn default() -> Self {
        Self {
            unlocked_at: 0,
            progress: None,
            max_progress: None,
        }
    }
}

impl Achievement {
    /// Achievement entry stamped with the current moment.
    pub fn unlocked_now() -> Self {
        Self {
            unlocked_at: utils::epoch_ms_now(),
            progress: None,
            max_progress: None,
        }
    }
}

/// Rollup fields recomputed on relevant writes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GameStats {
    /// Lifetime XP granted, mirrors `xp`.
    pub total_xp_earned: u64,
    /// Longest login streak ever reached.
    pub longest_streak: u32,
    /// Most-attended event category. Kept for wire compatibility;
    /// participation records carry no category to derive it from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub favorite_event_type: Option<String>,
    /// Arithmetic mean over all stored ratings, two decimals.
    pub average_vibe_rating: f64,
    /// Day of the first credited event.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_event_date: Option<NaiveDate>,
    /// Last XP-granting action, epoch milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_activity_date: Option<i64>,
}

/// The per-user progression document.
///
/// Created lazily on first read, mutated exclusively through
/// [`GameDataService`](crate::services::GameDataService) methods,
/// never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserGameData {
    /// Current level, at least 1. Always `level_from_xp(xp)`.
    pub level: u32,

    /// Lifetime accumulated experience. Monotonically non-decreasing.
    pub xp: u64,

    /// XP required to go from `level` to `level + 1` (cached tier cost).
    pub xp_to_next: u64,

    /// Distinct events the user is credited with attending.
    #[serde(rename = "eventosParticipados")]
    pub events_attended: u32,

    /// Vibe ratings submitted, counting every call (re-rating an event
    /// increments this even though the history slot is overwritten).
    #[serde(rename = "vibesAvaliadas")]
    pub vibes_rated: u32,

    /// Unlocked badges in unlock order (order is what screens display).
    pub badges: Vec<BadgeId>,

    /// Consecutive-day login streak.
    pub streak: u32,

    /// Last day the streak was evaluated. `None` until the first login
    /// update runs.
    pub last_login_date: Option<NaiveDate>,

    /// Event id → newest rating. At most one entry per event.
    pub vibes_history: BTreeMap<String, VibeEntry>,

    /// Append-only log of credited event ids, no duplicates.
    #[serde(rename = "eventosHistory")]
    pub events_history: Vec<String>,

    /// Day → challenge progress.
    pub daily_challenges: BTreeMap<NaiveDate, DailyChallenge>,

    /// Badge id → unlock audit entry. Superset of `badges`.
    pub achievements: BTreeMap<BadgeId, Achievement>,

    /// Derived rollups.
    pub stats: GameStats,
}

impl Default for UserGameData {
    fn default() -> Self {
        Self {
            level: 1,
            xp: 0,
            xp_to_next: levels::xp_to_next(1),
            events_attended: 0,
            vibes_rated: 0,
            badges: Vec::new(),
            streak: 0,
            last_login_date: None,
            vibes_history: BTreeMap::new(),
            events_history: Vec::new(),
            daily_challenges: BTreeMap::new(),
            achievements: BTreeMap::new(),
            stats: GameStats::default(),
        }
    }
}

impl UserGameData {
    /// Serialize the whole record into a store document.
    pub fn to_document(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    /// Deserialize a store document, tolerating missing newer fields.
    pub fn from_document(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    /// Project a subset of top-level wire keys for a partial update.
    ///
    /// Mutating operations persist only the fields they changed; the
    /// projection goes through the full serialization so the key names
    /// can never drift from the serde renames.
    pub fn partial(&self, keys: &[&str]) -> Result<Value, serde_json::Error> {
        let full = self.to_document()?;
        let mut out = serde_json::Map::new();
        if let Value::Object(map) = full {
            for key in keys {
                debug_assert!(
                    map.contains_key(*key),
                    "unknown wire key in partial projection: {}",
                    key
                );
                if let Some(value) = map.get(*key) {
                    out.insert((*key).to_string(), value.clone());
                }
            }
        }
        Ok(Value::Object(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_record() {
        let data = UserGameData::default();
        assert_eq!(data.level, 1);
        assert_eq!(data.xp, 0);
        assert_eq!(data.xp_to_next, 100);
        assert_eq!(data.streak, 0);
        assert!(data.badges.is_empty());
        assert!(data.last_login_date.is_none());
    }

    #[test]
    fn test_wire_keys() {
        let data = UserGameData::default();
        let doc = data.to_document().unwrap();
        let map = doc.as_object().unwrap();

        for key in [
            "level",
            "xp",
            "xpToNext",
            "eventosParticipados",
            "vibesAvaliadas",
            "badges",
            "streak",
            "vibesHistory",
            "eventosHistory",
            "dailyChallenges",
            "achievements",
            "stats",
        ] {
            assert!(map.contains_key(key), "missing wire key: {}", key);
        }
    }

    #[test]
    fn test_forward_compatible_read() {
        // A record written before streaks and challenges existed.
        let legacy = json!({
            "level": 2,
            "xp": 150,
            "xpToNext": 120,
            "vibesAvaliadas": 4,
        });

        let data = UserGameData::from_document(legacy).unwrap();
        assert_eq!(data.level, 2);
        assert_eq!(data.xp, 150);
        assert_eq!(data.vibes_rated, 4);
        assert_eq!(data.streak, 0);
        assert!(data.daily_challenges.is_empty());
    }

    #[test]
    fn test_partial_projection_uses_wire_keys() {
        let mut data = UserGameData::default();
        data.xp = 35;
        data.vibes_rated = 2;

        let patch = data.partial(&["xp", "vibesAvaliadas"]).unwrap();
        let map = patch.as_object().unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map["xp"], json!(35));
        assert_eq!(map["vibesAvaliadas"], json!(2));
    }

    #[test]
    fn test_roundtrip_with_nested_maps() {
        let mut data = UserGameData::default();
        data.vibes_history.insert(
            "ev1".to_string(),
            VibeEntry {
                nota: 5,
                timestamp: 1_700_000_000_000,
            },
        );
        data.daily_challenges.insert(
            NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            DailyChallenge {
                vibes_rated_today: 2,
                events_visited_today: 1,
                completed: false,
            },
        );
        data.badges.push(BadgeId::FirstVibe);
        data.achievements
            .insert(BadgeId::FirstVibe, Achievement::unlocked_now());

        let doc = data.to_document().unwrap();
        let back = UserGameData::from_document(doc).unwrap();
        assert_eq!(back, data);
    }
}
