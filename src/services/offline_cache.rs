//! # Offline Ticket Cache
//!
//! Snapshots a chosen subset of a user's purchased tickets (with their
//! event metadata denormalized in) into device-local storage, so they
//! stay viewable without connectivity. The offline viewer reads from
//! this snapshot only. It is a point-in-time copy, never merged with
//! live data, and staleness is expected.
//!
//! ## Download Flow
//!
//! ```text
//! 1. Caller verifies free space ≥ the configured floor
//!                ↓
//! 2. download_with_progress() called with the selected event ids
//!                ↓
//! 3. Purchase mapping fetched once, then per selected event:
//!    fetch metadata, collect matching tickets, report progress
//!                ↓
//! 4. One serialized write replaces the whole cache blob
//!                ↓
//! 5. Progress reaches 100, summary returned
//! ```
//!
//! ## Why replace instead of merge?
//!
//! The cache is one blob written atomically at the end. A failure at
//! any earlier step leaves the previous snapshot untouched, so the
//! viewer never sees a half-updated cache. Incremental sync would be a
//! new feature, not a fix.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::models::{
    DownloadSummary, EventRecord, EventTicketGroup, OfflineTicket, PurchasedTicket, UserRecord,
};
use crate::store::{paths, DocumentStore, LocalStorage, StorageProbe, StoreError};

/// Errors that can occur in offline cache operations.
#[derive(Debug, thiserror::Error)]
pub enum OfflineCacheError {
    /// A selected event has no metadata record.
    #[error("Event not found: {0}")]
    EventNotFound(String),

    /// A store read or the local write failed.
    #[error("Store operation failed: {0}")]
    Store(#[from] StoreError),

    /// The ticket list could not be serialized.
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// The offline ticket cache service.
///
/// ## Usage
///
/// ```rust,ignore
/// let cache = OfflineTicketCache::new(store, local, probe, config);
///
/// if cache.has_required_space().await? {
///     let summary = cache
///         .download_with_progress(&selected, "12345678900", &user, |p| bar.set(p))
///         .await?;
/// }
///
/// // Later, offline:
/// let groups = cache.load_grouped().await;
/// ```
pub struct OfflineTicketCache {
    /// Remote store holding event metadata and purchase records
    /// (read-only from here).
    store: Arc<dyn DocumentStore>,

    /// Device-local storage holding the cache blob.
    local: Arc<dyn LocalStorage>,

    /// Free-space query for the precondition gate.
    probe: Arc<dyn StorageProbe>,

    /// Deployment settings (cache key, space floor).
    config: AppConfig,
}

impl OfflineTicketCache {
    /// Create a new cache service over injected stores.
    pub fn new(
        store: Arc<dyn DocumentStore>,
        local: Arc<dyn LocalStorage>,
        probe: Arc<dyn StorageProbe>,
        config: AppConfig,
    ) -> Self {
        Self {
            store,
            local,
            probe,
            config,
        }
    }

    // ==========================================
    // DOWNLOAD
    // ==========================================

    /// Whether free local storage meets the configured floor.
    ///
    /// The caller gates the download on this before offering the
    /// action; the download itself does not re-check.
    pub async fn has_required_space(&self) -> Result<bool, OfflineCacheError> {
        let free = self.probe.free_space_mb().await?;
        debug!(free, required = self.config.min_free_space_mb, "Free space probed");
        Ok(free >= self.config.min_free_space_mb)
    }

    /// Download the user's tickets for the selected events.
    ///
    /// See [`download_with_progress`](Self::download_with_progress);
    /// this variant discards progress.
    pub async fn perform_offline_download(
        &self,
        selected_event_ids: &[String],
        cpf: &str,
        user: &UserRecord,
    ) -> Result<DownloadSummary, OfflineCacheError> {
        self.download_with_progress(selected_event_ids, cpf, user, |_| {})
            .await
    }

    /// Download the user's tickets for the selected events, reporting
    /// progress after each event.
    ///
    /// Precondition: the caller has already verified free space via
    /// [`has_required_space`](Self::has_required_space).
    ///
    /// Events are processed one at a time, so progress is monotonic:
    /// after each event the callback receives
    /// `events_processed / events_selected * 100`, and the terminal
    /// `100` is emitted only after the cache write has completed.
    ///
    /// The whole cache is replaced by one serialized write: previous
    /// snapshots never survive a successful download, and any failure
    /// before the write leaves the previous snapshot intact.
    pub async fn download_with_progress(
        &self,
        selected_event_ids: &[String],
        cpf: &str,
        user: &UserRecord,
        mut on_progress: impl FnMut(u8) + Send,
    ) -> Result<DownloadSummary, OfflineCacheError> {
        let total = selected_event_ids.len();
        info!(cpf, events = total, "Starting offline download");

        // The purchase mapping is fetched once and scanned per event.
        let owned: HashMap<String, PurchasedTicket> =
            match self.store.get(&paths::user_tickets(cpf)).await? {
                Some(value) => serde_json::from_value(value)?,
                None => HashMap::new(),
            };

        let mut tickets: Vec<OfflineTicket> = Vec::new();

        for (index, event_id) in selected_event_ids.iter().enumerate() {
            let event: EventRecord = self
                .store
                .get(&paths::event(event_id))
                .await?
                .ok_or_else(|| OfflineCacheError::EventNotFound(event_id.clone()))
                .and_then(|value| serde_json::from_value(value).map_err(Into::into))?;

            let mut matches: Vec<(&String, &PurchasedTicket)> = owned
                .iter()
                .filter(|(_, ticket)| ticket.event_id == *event_id)
                .collect();
            matches.sort_by(|a, b| a.0.cmp(b.0));

            for (token, ticket) in matches {
                tickets.push(OfflineTicket {
                    cpf: user.cpf.clone(),
                    nome_completo: user.nome_completo.clone(),
                    email: user.email.clone(),
                    event_id: event_id.clone(),
                    nome_evento: event.nome_evento.clone(),
                    data_evento: event.data_evento.clone(),
                    local: event.local.clone(),
                    tipo: ticket.tipo.clone(),
                    token: token.clone(),
                });
            }

            debug!(event = event_id.as_str(), collected = tickets.len(), "Event processed");
            let processed = index + 1;
            if processed < total {
                on_progress((processed * 100 / total) as u8);
            }
        }

        let blob = serde_json::to_string(&tickets)?;
        self.local
            .set_item(&self.config.offline_cache_key, &blob)
            .await?;
        on_progress(100);

        let summary = DownloadSummary {
            total_tickets: tickets.len() as u32,
            events: total as u32,
            download_date: Utc::now(),
        };
        info!(
            cpf,
            tickets = summary.total_tickets,
            events = summary.events,
            "Offline download complete"
        );
        Ok(summary)
    }

    // ==========================================
    // READING
    // ==========================================

    /// Read the cached snapshot.
    ///
    /// An absent or malformed blob yields an empty list (logged), never
    /// an error; the offline screen must render regardless.
    pub async fn load_offline_tickets(&self) -> Vec<OfflineTicket> {
        match self.local.get_item(&self.config.offline_cache_key).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(tickets) => tickets,
                Err(e) => {
                    warn!(error = %e, "Offline cache blob malformed, treating as empty");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(error = %e, "Offline cache read failed, treating as empty");
                Vec::new()
            }
        }
    }

    /// Read the cached snapshot grouped by event, in snapshot order.
    pub async fn load_grouped(&self) -> Vec<EventTicketGroup> {
        group_by_event(&self.load_offline_tickets().await)
    }

    /// Whether a cached snapshot exists.
    ///
    /// Used by the app shell to decide whether to offer offline mode
    /// when connectivity drops. Never fails: any read error reads as
    /// "no cache".
    pub async fn has_offline_tickets(&self) -> bool {
        match self.local.get_item(&self.config.offline_cache_key).await {
            Ok(found) => found.is_some(),
            Err(e) => {
                warn!(error = %e, "Offline cache probe failed");
                false
            }
        }
    }

    /// Remove the cached snapshot.
    pub async fn clear_offline_tickets(&self) -> Result<(), OfflineCacheError> {
        self.local
            .remove_item(&self.config.offline_cache_key)
            .await?;
        info!("Offline cache cleared");
        Ok(())
    }
}

/// Group tickets by event for the offline viewer.
///
/// Pure derived view, recomputed on every load and never persisted.
/// Groups appear in first-occurrence order of their event in the
/// snapshot.
pub fn group_by_event(tickets: &[OfflineTicket]) -> Vec<EventTicketGroup> {
    let mut groups: Vec<EventTicketGroup> = Vec::new();
    for ticket in tickets {
        match groups.iter_mut().find(|g| g.event_id == ticket.event_id) {
            Some(group) => group.tickets.push(ticket.clone()),
            None => groups.push(EventTicketGroup {
                event_id: ticket.event_id.clone(),
                nome_evento: ticket.nome_evento.clone(),
                data_evento: ticket.data_evento.clone(),
                local: ticket.local.clone(),
                tickets: vec![ticket.clone()],
            }),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ticket(event_id: &str, token: &str) -> OfflineTicket {
        OfflineTicket {
            cpf: "111".to_string(),
            nome_completo: "Ana".to_string(),
            email: "ana@example.com".to_string(),
            event_id: event_id.to_string(),
            nome_evento: format!("Evento {}", event_id),
            data_evento: None,
            local: None,
            tipo: "Pista".to_string(),
            token: token.to_string(),
        }
    }

    #[test]
    fn test_group_by_event_first_occurrence_order() {
        let tickets = vec![
            ticket("b", "t1"),
            ticket("a", "t2"),
            ticket("b", "t3"),
        ];
        let groups = group_by_event(&tickets);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].event_id, "b");
        assert_eq!(groups[0].tickets.len(), 2);
        assert_eq!(groups[1].event_id, "a");
        assert_eq!(groups[1].tickets.len(), 1);
    }

    #[test]
    fn test_group_by_event_empty() {
        assert!(group_by_event(&[]).is_empty());
    }
}
