//! # Services Module
//!
//! The two services that make up the core. They never call each other;
//! screens invoke them directly.
//!
//! | Service | Responsibility |
//! |---------|---------------|
//! | `GameDataService` | XP, levels, badges, streaks, daily challenges |
//! | `OfflineTicketCache` | Ticket snapshots for connectivity-free viewing |
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       SERVICES LAYER                         │
//! │                                                              │
//! │  ┌─────────────────────────┐  ┌──────────────────────────┐  │
//! │  │    GameDataService      │  │    OfflineTicketCache    │  │
//! │  │  • load_user_game_data  │  │  • download_with_progress│  │
//! │  │  • add_xp               │  │  • load_offline_tickets  │  │
//! │  │  • register_vibe_*      │  │  • has_offline_tickets   │  │
//! │  │  • register_event_*     │  │  • load_grouped          │  │
//! │  └───────────┬─────────────┘  └───────┬──────────┬───────┘  │
//! │              │                        │          │          │
//! │              ▼                        ▼          ▼          │
//! │       DocumentStore            DocumentStore  LocalStorage  │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod game_service;
pub mod offline_cache;

pub use game_service::{
    GameDataService, GameError, ParticipationOutcome, UserStatsView, VibeOutcome, XpOutcome,
    XpRewards, DAILY_CHALLENGE_GOAL, EARLY_BIRD_HOUR,
};
pub use offline_cache::{group_by_event, OfflineCacheError, OfflineTicketCache};
