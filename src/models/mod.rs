//! # Data Models
//!
//! This module defines the records the core reads and writes. They are
//! wire-compatible with documents written by the mobile clients: Rust
//! fields use snake_case names with serde renames matching the keys an
//! existing deployment already stores (`eventosParticipados`,
//! `vibesHistory`, `nomeCompleto`, ...).
//!
//! ## Organization
//!
//! - `game_data.rs` - Per-user progression record and its nested types
//! - `tickets.rs` - Ticket provider records and the offline snapshot

pub mod game_data;
pub mod tickets;

pub use game_data::*;
pub use tickets::*;
