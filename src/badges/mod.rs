//! # Badge Catalog
//!
//! Declarative badge definitions. Each badge is a table entry with a
//! progress counter and a threshold; a badge qualifies when its counter
//! reaches the threshold against the *post-mutation* record. New badges
//! are additive configuration, not new control flow.
//!
//! | Id | Qualifies when |
//! |----|----------------|
//! | `first_vibe` | 1 vibe rating |
//! | `first_event` | 1 event credited |
//! | `vibe_master` | 10 vibe ratings |
//! | `vibe_addict` | 50 vibe ratings |
//! | `streak_master` | 7-day streak |
//! | `streak_legend` | 30-day streak |
//! | `explorer` | 5 events credited |
//! | `event_enthusiast` | 20 events credited |
//! | `high_roller` | 20 ratings of 4+ |
//! | `critic` | 5 distinct rating values |
//! | `early_bird` | login before 08:00 (handled at login time) |
//! | `social_butterfly` | declared hook, not yet satisfiable |
//!
//! ## Reward XP
//!
//! Every badge carries an `xp_reward` that screens display next to the
//! unlock celebration. The reward is bookkeeping only: the XP balance
//! moves exclusively through the action that triggered the check (10
//! per rating, 25 per event, 50 per completed challenge), never through
//! the unlock itself.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::models::UserGameData;

/// Badge identifiers, serialized as the snake_case wire strings the
/// clients already store (`"first_vibe"`, `"streak_master"`, ...).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum BadgeId {
    FirstVibe,
    FirstEvent,
    VibeMaster,
    VibeAddict,
    StreakMaster,
    StreakLegend,
    Explorer,
    EventEnthusiast,
    HighRoller,
    Critic,
    EarlyBird,
    SocialButterfly,
}

impl BadgeId {
    /// Wire string for this badge.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FirstVibe => "first_vibe",
            Self::FirstEvent => "first_event",
            Self::VibeMaster => "vibe_master",
            Self::VibeAddict => "vibe_addict",
            Self::StreakMaster => "streak_master",
            Self::StreakLegend => "streak_legend",
            Self::Explorer => "explorer",
            Self::EventEnthusiast => "event_enthusiast",
            Self::HighRoller => "high_roller",
            Self::Critic => "critic",
            Self::EarlyBird => "early_bird",
            Self::SocialButterfly => "social_butterfly",
        }
    }

    /// Parse a wire string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "first_vibe" => Some(Self::FirstVibe),
            "first_event" => Some(Self::FirstEvent),
            "vibe_master" => Some(Self::VibeMaster),
            "vibe_addict" => Some(Self::VibeAddict),
            "streak_master" => Some(Self::StreakMaster),
            "streak_legend" => Some(Self::StreakLegend),
            "explorer" => Some(Self::Explorer),
            "event_enthusiast" => Some(Self::EventEnthusiast),
            "high_roller" => Some(Self::HighRoller),
            "critic" => Some(Self::Critic),
            "early_bird" => Some(Self::EarlyBird),
            "social_butterfly" => Some(Self::SocialButterfly),
            _ => None,
        }
    }

    /// Catalog entry for this badge.
    pub fn definition(&self) -> &'static Badge {
        BADGES
            .iter()
            .find(|b| b.id == *self)
            .expect("every BadgeId has a catalog entry")
    }
}

/// One catalog entry.
pub struct Badge {
    pub id: BadgeId,
    /// Display name.
    pub name: &'static str,
    /// Display description.
    pub description: &'static str,
    /// Reward shown on unlock. Informational, never added to the balance.
    pub xp_reward: u64,
    /// Counter value at which the badge qualifies.
    pub threshold: u32,
    /// Whether the generic check pass evaluates this badge. Badges
    /// whose condition depends on the wall clock of the triggering
    /// action (`early_bird`) or that are not yet satisfiable
    /// (`social_butterfly`) opt out.
    pub auto_check: bool,
    /// Current counter for this badge, read from a record.
    pub progress: fn(&UserGameData) -> u32,
}

impl Badge {
    /// Whether this badge's counter has reached its threshold.
    pub fn is_satisfied(&self, data: &UserGameData) -> bool {
        (self.progress)(data) >= self.threshold
    }
}

fn ratings_of_four_plus(data: &UserGameData) -> u32 {
    data.vibes_history.values().filter(|v| v.nota >= 4).count() as u32
}

fn distinct_rating_values(data: &UserGameData) -> u32 {
    data.vibes_history
        .values()
        .map(|v| v.nota)
        .collect::<BTreeSet<_>>()
        .len() as u32
}

fn unlocked(data: &UserGameData, id: BadgeId) -> u32 {
    u32::from(data.badges.contains(&id))
}

/// The full badge catalog. Thresholds here are contract: progress bars
/// and the unlock pass both read them from this table.
pub static BADGES: &[Badge] = &[
    Badge {
        id: BadgeId::FirstVibe,
        name: "Primeira Vibe",
        description: "Avalie a vibe de um evento",
        xp_reward: 20,
        threshold: 1,
        auto_check: true,
        progress: |d| d.vibes_rated,
    },
    Badge {
        id: BadgeId::FirstEvent,
        name: "Estreia",
        description: "Participe do seu primeiro evento",
        xp_reward: 30,
        threshold: 1,
        auto_check: true,
        progress: |d| d.events_attended,
    },
    Badge {
        id: BadgeId::VibeMaster,
        name: "Mestre das Vibes",
        description: "Avalie 10 eventos",
        xp_reward: 50,
        threshold: 10,
        auto_check: true,
        progress: |d| d.vibes_rated,
    },
    Badge {
        id: BadgeId::VibeAddict,
        name: "Viciado em Vibes",
        description: "Avalie 50 eventos",
        xp_reward: 150,
        threshold: 50,
        auto_check: true,
        progress: |d| d.vibes_rated,
    },
    Badge {
        id: BadgeId::StreakMaster,
        name: "Sequência de Fogo",
        description: "Faça login por 7 dias seguidos",
        xp_reward: 70,
        threshold: 7,
        auto_check: true,
        progress: |d| d.streak,
    },
    Badge {
        id: BadgeId::StreakLegend,
        name: "Lenda da Sequência",
        description: "Faça login por 30 dias seguidos",
        xp_reward: 200,
        threshold: 30,
        auto_check: true,
        progress: |d| d.streak,
    },
    Badge {
        id: BadgeId::Explorer,
        name: "Explorador",
        description: "Participe de 5 eventos",
        xp_reward: 60,
        threshold: 5,
        auto_check: true,
        progress: |d| d.events_attended,
    },
    Badge {
        id: BadgeId::EventEnthusiast,
        name: "Entusiasta",
        description: "Participe de 20 eventos",
        xp_reward: 120,
        threshold: 20,
        auto_check: true,
        progress: |d| d.events_attended,
    },
    Badge {
        id: BadgeId::HighRoller,
        name: "Só Vibe Boa",
        description: "Dê nota 4 ou 5 para 20 eventos",
        xp_reward: 100,
        threshold: 20,
        auto_check: true,
        progress: ratings_of_four_plus,
    },
    Badge {
        id: BadgeId::Critic,
        name: "Crítico",
        description: "Use todas as notas de 1 a 5",
        xp_reward: 80,
        threshold: 5,
        auto_check: true,
        progress: distinct_rating_values,
    },
    Badge {
        id: BadgeId::EarlyBird,
        name: "Madrugador",
        description: "Entre no app antes das 8h",
        xp_reward: 40,
        threshold: 1,
        // Depends on the wall clock of the login event, not on stored
        // data; the streak update unlocks it directly.
        auto_check: false,
        progress: |d| unlocked(d, BadgeId::EarlyBird),
    },
    Badge {
        id: BadgeId::SocialButterfly,
        name: "Borboleta Social",
        description: "Converse com outros participantes",
        xp_reward: 60,
        threshold: 1,
        // Declared for the catalog screens; no action feeds it yet.
        auto_check: false,
        progress: |_| 0,
    },
];

/// Badges that newly qualify against `data` and are not unlocked yet.
///
/// Only `auto_check` entries participate; the caller appends the
/// returned ids and writes matching achievement entries.
pub fn check_unlocks(data: &UserGameData) -> Vec<BadgeId> {
    BADGES
        .iter()
        .filter(|b| b.auto_check && !data.badges.contains(&b.id) && b.is_satisfied(data))
        .map(|b| b.id)
        .collect()
}

/// Progress toward one badge, for progress bars.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BadgeProgress {
    /// Counter value, clamped to `max`.
    pub current: u32,
    /// The badge's threshold.
    pub max: u32,
    /// `current / max`, as 0..=100.
    pub percentage: f64,
}

/// Progress toward `id` read from `data`. Total function: every badge
/// id has a catalog entry and a finite threshold.
pub fn badge_progress(id: BadgeId, data: &UserGameData) -> BadgeProgress {
    let badge = id.definition();
    let current = (badge.progress)(data).min(badge.threshold);
    BadgeProgress {
        current,
        max: badge.threshold,
        percentage: f64::from(current) / f64::from(badge.threshold) * 100.0,
    }
}
