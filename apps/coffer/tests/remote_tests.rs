//! End-to-end tests: the reqwest transport against a live endpoint server.

#![allow(clippy::unwrap_used, clippy::panic)]

use coffer::api::{AppState, create_router};
use coffer::config::ServerConfig;
use coffer::{
    DocumentSource, HttpRemote, PersistenceCoordinator, RemoteAddress, RemoteEndpoint,
    SaveOutcome, TransportError, Vault,
};
use coffer_core::primitives::DOCUMENT_SLOT;
use coffer_core::{Collection, MemorySlots, SlotStore, StateDocument};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Serve an endpoint for deployment `home` on an ephemeral port.
///
/// Returns the URL template to reach it.
async fn spawn_endpoint(blobs: Arc<MemorySlots>) -> String {
    let config = ServerConfig {
        deployments: vec!["home".to_string()],
        rate_limit: 0,
        ..ServerConfig::default()
    };
    let state = AppState::new(blobs, config.deployments.clone());
    let router = create_router(state, &config);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    format!("http://{}/macros/s/{{id}}/exec", addr)
}

fn http() -> HttpRemote {
    HttpRemote::new(Duration::from_secs(5)).unwrap()
}

// =============================================================================
// TRANSPORT TESTS
// =============================================================================

#[tokio::test]
async fn read_of_fresh_endpoint_is_empty() {
    let template = spawn_endpoint(Arc::new(MemorySlots::new())).await;
    let address = RemoteAddress::resolve("home", &template);

    assert_eq!(http().read(&address).await.unwrap(), "");
}

#[tokio::test]
async fn write_then_read_round_trips_blob() {
    let blobs = Arc::new(MemorySlots::new());
    let template = spawn_endpoint(blobs.clone()).await;
    let address = RemoteAddress::resolve("home", &template);
    let remote = http();

    remote.write(&address, "OQQ=").await.unwrap();
    assert_eq!(remote.read(&address).await.unwrap(), "OQQ=");
    assert_eq!(blobs.read("home").unwrap().as_deref(), Some("OQQ="));
}

#[tokio::test]
async fn unknown_deployment_is_status_error() {
    let template = spawn_endpoint(Arc::new(MemorySlots::new())).await;
    let address = RemoteAddress::resolve("nobody", &template);

    assert_eq!(
        http().read(&address).await.err(),
        Some(TransportError::Status(404))
    );
}

#[tokio::test]
async fn full_endpoint_refuses_save() {
    let template = spawn_endpoint(Arc::new(MemorySlots::with_quota(8))).await;
    let address = RemoteAddress::resolve("home", &template);

    assert_eq!(
        http().write(&address, "a blob over quota").await.err(),
        Some(TransportError::Status(507))
    );
}

#[tokio::test]
async fn closed_port_is_unreachable() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let address = RemoteAddress::resolve(&format!("http://{}/macros/s/home/exec", addr), "");
    let result = http().read(&address).await;
    assert!(matches!(result, Err(TransportError::Unreachable { .. })));
}

// =============================================================================
// COORDINATOR ROUND TRIP
// =============================================================================

#[tokio::test]
async fn document_survives_remote_round_trip() {
    let blobs = Arc::new(MemorySlots::new());
    let template = spawn_endpoint(blobs.clone()).await;

    let coordinator =
        PersistenceCoordinator::new(MemorySlots::new(), http()).with_url_template(&template);
    let (mut vault, report) = Vault::open(coordinator).await;
    assert_eq!(report.source, DocumentSource::Defaults);

    let connected = vault.connect_remote("home").await.unwrap();
    assert_eq!(connected.reach_failure, None);
    assert_eq!(connected.migrated, Some(SaveOutcome::Remote));

    let added = vault
        .upsert_record(
            Collection::Subscriptions,
            json!({"id": "s1", "name": "music", "amount": 9.99})
                .as_object()
                .cloned()
                .unwrap(),
        )
        .await;
    assert_eq!(added.saved, SaveOutcome::Remote);
    assert_eq!(vault.coordinator().slots().read(DOCUMENT_SLOT).unwrap(), None);

    // A second device with the same identifier sees the same document.
    let other = MemorySlots::new();
    other
        .write(coffer_core::primitives::REMOTE_ENDPOINT_SLOT, "home")
        .unwrap();
    let coordinator = PersistenceCoordinator::new(other, http()).with_url_template(&template);
    let report = coordinator.load().await;

    assert_eq!(report.source, DocumentSource::Remote);
    assert_eq!(&report.document, vault.document());
    assert_ne!(report.document, StateDocument::new());
}

#[tokio::test]
async fn unreachable_remote_saves_locally() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let slots = MemorySlots::new();
    slots
        .write(
            coffer_core::primitives::REMOTE_ENDPOINT_SLOT,
            &format!("http://{}/macros/s/home/exec", addr),
        )
        .unwrap();
    let coordinator = PersistenceCoordinator::new(slots, http());

    let outcome = coordinator.save(&StateDocument::new()).await;
    assert!(matches!(outcome, SaveOutcome::LocalFallback { .. }));
    assert!(coordinator.slots().read(DOCUMENT_SLOT).unwrap().is_some());
}
