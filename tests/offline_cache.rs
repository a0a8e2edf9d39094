//! End-to-end tests for the offline ticket cache against the in-memory
//! stores.

use std::sync::Arc;

use serde_json::json;
use uuid::Uuid;

use vibepass_core::config::AppConfig;
use vibepass_core::models::UserRecord;
use vibepass_core::services::{group_by_event, OfflineCacheError, OfflineTicketCache};
use vibepass_core::store::{
    DocumentStore, FixedStorageProbe, LocalStorage, MemoryDocumentStore, MemoryLocalStorage,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("info")
        .with_test_writer()
        .try_init();
}

const CPF: &str = "12345678900";

fn user() -> UserRecord {
    UserRecord {
        cpf: CPF.to_string(),
        nome_completo: "Ana Souza".to_string(),
        email: "ana@example.com".to_string(),
    }
}

struct Fixture {
    cache: OfflineTicketCache,
    store: Arc<MemoryDocumentStore>,
    local: Arc<MemoryLocalStorage>,
    probe: FixedStorageProbe,
    /// Tokens per event id, in the order the cache will emit them.
    tokens: Vec<(String, Vec<String>)>,
}

/// Three events: A with two tickets, B with one, C with none.
async fn fixture() -> Fixture {
    init_tracing();
    let store = Arc::new(MemoryDocumentStore::new());
    let local = Arc::new(MemoryLocalStorage::new());
    let probe = FixedStorageProbe::new(500);

    store
        .set(
            "eventos/ev-a",
            json!({
                "nomeEvento": "Festival do Vale",
                "dataEvento": "12/09/2025 20:00",
                "local": "Arena Central"
            }),
        )
        .await
        .unwrap();
    store
        .set(
            "eventos/ev-b",
            json!({ "nomeEvento": "Sunset Sessions" }),
        )
        .await
        .unwrap();
    store
        .set("eventos/ev-c", json!({ "nomeEvento": "Feira Gastronômica" }))
        .await
        .unwrap();

    let mut a_tokens: Vec<String> = (0..2).map(|_| Uuid::new_v4().to_string()).collect();
    a_tokens.sort();
    let b_tokens = vec![Uuid::new_v4().to_string()];

    let mut purchases = serde_json::Map::new();
    for token in &a_tokens {
        purchases.insert(
            token.clone(),
            json!({ "eventid": "ev-a", "tipo": "Pista" }),
        );
    }
    purchases.insert(
        b_tokens[0].clone(),
        json!({ "eventid": "ev-b", "tipo": "VIP" }),
    );
    // A ticket owned by the user for an unselected event.
    purchases.insert(
        Uuid::new_v4().to_string(),
        json!({ "eventid": "ev-other", "tipo": "Pista" }),
    );
    store
        .set(&format!("ingressos/{}", CPF), json!(purchases))
        .await
        .unwrap();

    let cache = OfflineTicketCache::new(
        store.clone(),
        local.clone(),
        Arc::new(probe.clone()),
        AppConfig::default(),
    );

    Fixture {
        cache,
        store,
        local,
        probe,
        tokens: vec![
            ("ev-a".to_string(), a_tokens),
            ("ev-b".to_string(), b_tokens),
        ],
    }
}

#[tokio::test]
async fn download_denormalizes_and_replaces() {
    let fx = fixture().await;

    let selected = vec!["ev-a".to_string(), "ev-b".to_string()];
    let summary = fx
        .cache
        .perform_offline_download(&selected, CPF, &user())
        .await
        .unwrap();
    assert_eq!(summary.total_tickets, 3);
    assert_eq!(summary.events, 2);

    let tickets = fx.cache.load_offline_tickets().await;
    assert_eq!(tickets.len(), 3);

    let a_tickets: Vec<_> = tickets.iter().filter(|t| t.event_id == "ev-a").collect();
    assert_eq!(a_tickets.len(), 2);
    for ticket in &a_tickets {
        assert_eq!(ticket.cpf, CPF);
        assert_eq!(ticket.nome_completo, "Ana Souza");
        assert_eq!(ticket.email, "ana@example.com");
        assert_eq!(ticket.nome_evento, "Festival do Vale");
        assert_eq!(ticket.data_evento.as_deref(), Some("12/09/2025 20:00"));
        assert_eq!(ticket.local.as_deref(), Some("Arena Central"));
        assert_eq!(ticket.tipo, "Pista");
        assert!(fx.tokens[0].1.contains(&ticket.token));
    }

    let b_tickets: Vec<_> = tickets.iter().filter(|t| t.event_id == "ev-b").collect();
    assert_eq!(b_tickets.len(), 1);
    assert_eq!(b_tickets[0].tipo, "VIP");
    assert!(b_tickets[0].data_evento.is_none());

    // No ticket from the unselected event leaked in.
    assert!(tickets.iter().all(|t| t.event_id != "ev-other"));

    // A later download replaces the cache wholesale, even when the
    // selection has zero tickets.
    let summary = fx
        .cache
        .perform_offline_download(&["ev-c".to_string()], CPF, &user())
        .await
        .unwrap();
    assert_eq!(summary.total_tickets, 0);
    assert!(fx.cache.load_offline_tickets().await.is_empty());
    // The blob key still exists: the empty snapshot is a snapshot.
    assert!(fx.cache.has_offline_tickets().await);
}

#[tokio::test]
async fn download_reports_monotonic_progress() {
    let fx = fixture().await;

    let selected = vec![
        "ev-a".to_string(),
        "ev-b".to_string(),
        "ev-c".to_string(),
    ];
    let mut reported = Vec::new();
    fx.cache
        .download_with_progress(&selected, CPF, &user(), |p| reported.push(p))
        .await
        .unwrap();

    assert_eq!(reported, vec![33, 66, 100]);

    // Single-event download: the only report is the terminal 100,
    // after the write.
    let mut reported = Vec::new();
    fx.cache
        .download_with_progress(&["ev-a".to_string()], CPF, &user(), |p| reported.push(p))
        .await
        .unwrap();
    assert_eq!(reported, vec![100]);
}

#[tokio::test]
async fn failed_download_leaves_previous_cache() {
    let fx = fixture().await;

    fx.cache
        .perform_offline_download(&["ev-a".to_string()], CPF, &user())
        .await
        .unwrap();
    assert_eq!(fx.cache.load_offline_tickets().await.len(), 2);

    // Unknown event aborts the whole operation.
    let result = fx
        .cache
        .perform_offline_download(&["ev-missing".to_string()], CPF, &user())
        .await;
    assert!(matches!(result, Err(OfflineCacheError::EventNotFound(_))));
    assert_eq!(fx.cache.load_offline_tickets().await.len(), 2);

    // A store outage mid-fetch aborts too, same guarantee.
    fx.store.set_offline(true);
    let result = fx
        .cache
        .perform_offline_download(&["ev-b".to_string()], CPF, &user())
        .await;
    assert!(matches!(result, Err(OfflineCacheError::Store(_))));
    fx.store.set_offline(false);
    assert_eq!(fx.cache.load_offline_tickets().await.len(), 2);
}

#[tokio::test]
async fn offline_reads_never_fail() {
    let fx = fixture().await;

    // Nothing cached yet.
    assert!(fx.cache.load_offline_tickets().await.is_empty());
    assert!(!fx.cache.has_offline_tickets().await);

    fx.cache
        .perform_offline_download(&["ev-a".to_string()], CPF, &user())
        .await
        .unwrap();
    assert!(fx.cache.has_offline_tickets().await);

    // Corrupted blob reads as empty, never a crash.
    fx.local
        .set_item(&AppConfig::default().offline_cache_key, "{not json")
        .await
        .unwrap();
    assert!(fx.cache.load_offline_tickets().await.is_empty());

    // Device storage failing entirely reads as "no cache".
    fx.local.set_failing(true);
    assert!(fx.cache.load_offline_tickets().await.is_empty());
    assert!(!fx.cache.has_offline_tickets().await);
}

#[tokio::test]
async fn clear_removes_the_snapshot() {
    let fx = fixture().await;

    fx.cache
        .perform_offline_download(&["ev-a".to_string()], CPF, &user())
        .await
        .unwrap();
    assert!(fx.cache.has_offline_tickets().await);

    fx.cache.clear_offline_tickets().await.unwrap();
    assert!(!fx.cache.has_offline_tickets().await);
    assert!(fx.cache.load_offline_tickets().await.is_empty());
}

#[tokio::test]
async fn space_gate_uses_configured_floor() {
    let fx = fixture().await;

    fx.probe.set_free_mb(199);
    assert!(!fx.cache.has_required_space().await.unwrap());

    fx.probe.set_free_mb(200);
    assert!(fx.cache.has_required_space().await.unwrap());
}

#[tokio::test]
async fn grouped_view_follows_snapshot_order() {
    let fx = fixture().await;

    fx.cache
        .perform_offline_download(&["ev-a".to_string(), "ev-b".to_string()], CPF, &user())
        .await
        .unwrap();

    let groups = fx.cache.load_grouped().await;
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].event_id, "ev-a");
    assert_eq!(groups[0].nome_evento, "Festival do Vale");
    assert_eq!(groups[0].tickets.len(), 2);
    assert_eq!(groups[1].event_id, "ev-b");
    assert_eq!(groups[1].tickets.len(), 1);

    // Grouping is pure: same result when recomputed directly.
    let tickets = fx.cache.load_offline_tickets().await;
    assert_eq!(group_by_event(&tickets), groups);
}

#[tokio::test]
async fn download_with_no_purchases_yields_empty_snapshot() {
    init_tracing();
    let store = Arc::new(MemoryDocumentStore::new());
    let local = Arc::new(MemoryLocalStorage::new());
    store
        .set("eventos/ev-a", json!({ "nomeEvento": "Festival" }))
        .await
        .unwrap();

    let cache = OfflineTicketCache::new(
        store,
        local,
        Arc::new(FixedStorageProbe::new(500)),
        AppConfig::default(),
    );

    // No purchase mapping stored for this user at all.
    let summary = cache
        .perform_offline_download(&["ev-a".to_string()], CPF, &user())
        .await
        .unwrap();
    assert_eq!(summary.total_tickets, 0);
    assert!(cache.load_offline_tickets().await.is_empty());
    assert!(cache.has_offline_tickets().await);
}
