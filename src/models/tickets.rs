//! # Ticket Records
//!
//! Provider-side records read from the document store (events and the
//! per-user purchase mapping) and the denormalized snapshot records the
//! offline cache writes to local storage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Denormalized user fields captured at download time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    /// User identifier.
    pub cpf: String,
    pub nome_completo: String,
    pub email: String,
}

/// Event metadata as stored under `eventos/<eventId>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EventRecord {
    pub nome_evento: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_evento: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local: Option<String>,
}

impl Default for EventRecord {
    fn default() -> Self {
        Self {
            nome_evento: String::new(),
            data_evento: None,
            local: None,
        }
    }
}

/// One entry of a user's purchase mapping, keyed by ticket token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchasedTicket {
    /// Event the ticket belongs to.
    #[serde(rename = "eventid")]
    pub event_id: String,
    /// Ticket type/category.
    pub tipo: String,
}

/// A point-in-time ticket snapshot.
///
/// Created in bulk by the download operation with user and event fields
/// denormalized in, so the offline viewer renders without touching any
/// live data. The snapshot is never merged with live records; staleness
/// is expected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfflineTicket {
    pub cpf: String,
    pub nome_completo: String,
    pub email: String,
    pub event_id: String,
    pub nome_evento: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_evento: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local: Option<String>,
    pub tipo: String,
    /// Unique ticket code, the purchase record's key.
    pub token: String,
}

/// Result summary of a completed download, for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadSummary {
    pub total_tickets: u32,
    pub events: u32,
    pub download_date: DateTime<Utc>,
}

/// Tickets of one event, grouped for the offline viewer.
///
/// A pure derived view recomputed on every load, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTicketGroup {
    pub event_id: String,
    pub nome_evento: String,
    pub data_evento: Option<String>,
    pub local: Option<String>,
    pub tickets: Vec<OfflineTicket>,
}
