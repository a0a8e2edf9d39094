//! # VibePass Core
//!
//! Progression engine and offline ticket cache for the VibePass event
//! app. This crate is the app's "hard" logic only: it owns no screens,
//! no HTTP surface and no storage engine. It consumes an injected
//! document store and device-local storage, and exposes two services
//! plus the pure functions they are built on.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          HOST APP                            │
//! │           (screens and navigation, not this crate)           │
//! └───────────────┬──────────────────────────┬───────────────────┘
//!                 │                          │
//!                 ▼                          ▼
//!    ┌─────────────────────┐    ┌──────────────────────────┐
//!    │   GameDataService   │    │    OfflineTicketCache    │
//!    │ xp · levels · badges│    │ snapshot · atomic replace│
//!    │ streaks · challenges│    │ resilient offline reads  │
//!    └──────────┬──────────┘    └──────┬──────────┬────────┘
//!               │                      │          │
//!               ▼                      ▼          ▼
//!        DocumentStore          DocumentStore  LocalStorage
//!     (users/<id>/gameData)     (eventos/…,    (one blob key)
//!                                ingressos/…)
//! ```
//!
//! ## Modules
//!
//! - `config`: Environment-driven deployment settings
//! - `models`: Wire-compatible records (game data, tickets)
//! - `store`: Storage contracts + in-memory reference implementations
//! - `levels`: The pure level curve
//! - `badges`: The declarative badge catalog
//! - `services`: The two services
//! - `utils`: Shared helpers
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use vibepass_core::config::AppConfig;
//! use vibepass_core::services::GameDataService;
//! use vibepass_core::store::MemoryDocumentStore;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let store = Arc::new(MemoryDocumentStore::new());
//! let service = GameDataService::new(store, AppConfig::default());
//!
//! let data = service.load_user_game_data("u1").await;
//! let outcome = service
//!     .register_vibe_evaluated("u1", data, "ev1", 5)
//!     .await
//!     .unwrap();
//! assert_eq!(outcome.data.xp, 10);
//! # }
//! ```

pub mod badges;
pub mod config;
pub mod levels;
pub mod models;
pub mod services;
pub mod store;
pub mod utils;

pub use badges::{BadgeId, BadgeProgress};
pub use config::AppConfig;
pub use models::{OfflineTicket, UserGameData};
pub use services::{GameDataService, OfflineTicketCache};
pub use store::{DocumentStore, LocalStorage, StorageProbe, StoreError};
