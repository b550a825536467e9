//! End-to-end tests for the synchronization core.
//!
//! Each test boots the real server (mutation API plus event channel)
//! on ephemeral ports with the in-memory store, then drives it with
//! the real HTTP client and sync controller.

use std::sync::Arc;
use std::time::Duration;

use listsync::backend::realtime::run_sync_channel;
use listsync::backend::server::init::build_app;
use listsync::backend::server::state::AppState;
use listsync::backend::store::MemoryStore;
use listsync::client::{ApiClient, ConnectionState, SyncController, SyncSignal};
use listsync::shared::model::ListItem;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};
use uuid::Uuid;

struct TestServer {
    http_url: String,
    sync_url: String,
    state: AppState,
}

async fn start_test_server() -> TestServer {
    let (router, state) = build_app(Arc::new(MemoryStore::new()));

    let http = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let http_addr = http.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(http, router).await.unwrap();
    });

    let sync = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let sync_addr = sync.local_addr().unwrap();
    tokio::spawn(run_sync_channel(sync, state.registry.clone()));

    // Give both listeners time to start serving.
    sleep(Duration::from_millis(50)).await;

    TestServer {
        http_url: format!("http://{http_addr}"),
        sync_url: format!("ws://{sync_addr}"),
        state,
    }
}

async fn signed_up(server: &TestServer, email: &str) -> (ApiClient, Uuid) {
    let mut client = ApiClient::new(server.http_url.clone());
    client.register(email, "password123").await.unwrap();
    let session = client.login(email, "password123").await.unwrap();
    (client, session.user_id)
}

/// Wait for the next non-state signal, skipping lifecycle noise.
async fn next_data_signal(rx: &mut mpsc::Receiver<SyncSignal>) -> SyncSignal {
    loop {
        let signal = timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("timed out waiting for signal")
            .expect("signal channel closed");
        if !matches!(signal, SyncSignal::StateChanged(_)) {
            return signal;
        }
    }
}

/// Wait until the controller reports the given state.
async fn wait_for_state(rx: &mut mpsc::Receiver<SyncSignal>, wanted: ConnectionState) {
    loop {
        let signal = timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("timed out waiting for state")
            .expect("signal channel closed");
        if signal == SyncSignal::StateChanged(wanted) {
            return;
        }
    }
}

#[tokio::test]
async fn test_register_login_and_personal_lists() {
    let server = start_test_server().await;
    let (client, _user_id) = signed_up(&server, "alice@example.com").await;

    client
        .create_list("Chores", &[ListItem::new("Dishes")])
        .await
        .unwrap();

    let lists = client.fetch_lists().await.unwrap();
    assert_eq!(lists.len(), 1);
    assert_eq!(lists[0].title, "Chores");
    assert_eq!(lists[0].items[0].text, "Dishes");

    client
        .update_list(lists[0].id, Some("Weekend chores"), None)
        .await
        .unwrap();
    let lists = client.fetch_lists().await.unwrap();
    assert_eq!(lists[0].title, "Weekend chores");

    // Bulk override replaces the whole set.
    client.override_lists(&[]).await.unwrap();
    assert!(client.fetch_lists().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_mutation_api_requires_token() {
    let server = start_test_server().await;
    let client = ApiClient::new(server.http_url.clone());

    // No login: client-side guard.
    assert!(client.fetch_lists().await.is_err());

    // Bad token: server-side 401.
    let raw = reqwest::Client::new()
        .get(format!("{}/lists", server.http_url))
        .bearer_auth("not-a-real-token")
        .send()
        .await
        .unwrap();
    assert_eq!(raw.status(), reqwest::StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_join_is_conflict_on_second_attempt() {
    let server = start_test_server().await;
    let (alice, _) = signed_up(&server, "alice@example.com").await;
    let (bob, bob_id) = signed_up(&server, "bob@example.com").await;

    alice.create_collab_list("Trip").await.unwrap();
    let list_id = alice.fetch_collab_ids().await.unwrap()[0];

    bob.join_collab_list(list_id).await.unwrap();
    let err = bob.join_collab_list(list_id).await.unwrap_err();
    match err {
        listsync::client::ApiClientError::Api { status, .. } => assert_eq!(status, 409),
        other => panic!("expected API error, got {other:?}"),
    }

    // Member set unchanged by the failed join.
    let list = bob.fetch_collab_list(list_id).await.unwrap();
    assert_eq!(list.members.iter().filter(|m| **m == bob_id).count(), 1);
}

#[tokio::test]
async fn test_update_fans_out_to_all_members_including_originator() {
    let server = start_test_server().await;
    let (alice, alice_id) = signed_up(&server, "alice@example.com").await;
    let (bob, bob_id) = signed_up(&server, "bob@example.com").await;

    alice.create_collab_list("Trip").await.unwrap();
    let list_id = alice.fetch_collab_ids().await.unwrap()[0];
    bob.join_collab_list(list_id).await.unwrap();

    let mut alice_sync = SyncController::new(server.sync_url.clone(), alice_id);
    let mut alice_signals = alice_sync.take_signal_rx().unwrap();
    alice_sync.subscribe(list_id).await;
    alice_sync.start().unwrap();

    let mut bob_sync = SyncController::new(server.sync_url.clone(), bob_id);
    let mut bob_signals = bob_sync.take_signal_rx().unwrap();
    bob_sync.subscribe(list_id).await;
    bob_sync.start().unwrap();

    wait_for_state(&mut alice_signals, ConnectionState::Subscribed).await;
    wait_for_state(&mut bob_signals, ConnectionState::Subscribed).await;
    // Let the subscribe frames reach the registry.
    sleep(Duration::from_millis(100)).await;

    alice
        .update_collab_list(list_id, None, Some(&[ListItem::new("Tent")]))
        .await
        .unwrap();

    // Both members, originator included, get the refresh signal.
    for signals in [&mut alice_signals, &mut bob_signals] {
        match next_data_signal(signals).await {
            SyncSignal::Refresh { list_id: id, generation } => {
                assert_eq!(id, list_id);
                assert_eq!(generation, 1);
            }
            other => panic!("expected Refresh, got {other:?}"),
        }
    }
    assert_eq!(alice_sync.generation(), 1);
    assert_eq!(bob_sync.generation(), 1);

    // Refresh means re-fetch: the new state is visible over HTTP.
    let list = bob.fetch_collab_list(list_id).await.unwrap();
    assert_eq!(list.items[0].text, "Tent");

    alice_sync.shutdown().await;
    bob_sync.shutdown().await;
}

#[tokio::test]
async fn test_fan_out_targets_only_the_addressed_list() {
    let server = start_test_server().await;
    let (alice, _) = signed_up(&server, "alice@example.com").await;
    let (carol, carol_id) = signed_up(&server, "carol@example.com").await;

    alice.create_collab_list("Trip").await.unwrap();
    carol.create_collab_list("Garden").await.unwrap();
    let trip = alice.fetch_collab_ids().await.unwrap()[0];
    let garden = carol.fetch_collab_ids().await.unwrap()[0];

    let mut carol_sync = SyncController::new(server.sync_url.clone(), carol_id);
    let mut carol_signals = carol_sync.take_signal_rx().unwrap();
    carol_sync.subscribe(garden).await;
    carol_sync.start().unwrap();
    wait_for_state(&mut carol_signals, ConnectionState::Subscribed).await;
    sleep(Duration::from_millis(100)).await;

    alice
        .update_collab_list(trip, Some("Road trip"), None)
        .await
        .unwrap();

    // Carol subscribed only to the other list; nothing arrives.
    sleep(Duration::from_millis(200)).await;
    assert!(carol_signals.try_recv().is_err());
    assert_eq!(carol_sync.generation(), 0);

    carol_sync.shutdown().await;
}

#[tokio::test]
async fn test_random_item_payload_and_no_persistence() {
    let server = start_test_server().await;
    let (alice, alice_id) = signed_up(&server, "alice@example.com").await;
    let (bob, bob_id) = signed_up(&server, "bob@example.com").await;

    alice.create_collab_list("Trip").await.unwrap();
    let list_id = alice.fetch_collab_ids().await.unwrap()[0];
    bob.join_collab_list(list_id).await.unwrap();

    let mut bob_sync = SyncController::new(server.sync_url.clone(), bob_id);
    let mut bob_signals = bob_sync.take_signal_rx().unwrap();
    bob_sync.subscribe(list_id).await;
    bob_sync.start().unwrap();
    wait_for_state(&mut bob_signals, ConnectionState::Subscribed).await;
    sleep(Duration::from_millis(100)).await;

    alice.draw_random_item(list_id, "Tent").await.unwrap();

    match next_data_signal(&mut bob_signals).await {
        SyncSignal::RandomItemDrawn { item, user_id, list_id: id } => {
            assert_eq!(item, "Tent");
            assert_eq!(user_id, alice_id);
            assert_eq!(id, list_id);
        }
        other => panic!("expected RandomItemDrawn, got {other:?}"),
    }

    // Display-only: no refresh, no generation bump, no stored change.
    assert_eq!(bob_sync.generation(), 0);
    let list = bob.fetch_collab_list(list_id).await.unwrap();
    assert!(list.items.is_empty());

    bob_sync.shutdown().await;
}

#[tokio::test]
async fn test_shutdown_cleans_up_server_registry() {
    let server = start_test_server().await;
    let (alice, alice_id) = signed_up(&server, "alice@example.com").await;

    alice.create_collab_list("Trip").await.unwrap();
    let list_id = alice.fetch_collab_ids().await.unwrap()[0];

    let mut sync = SyncController::new(server.sync_url.clone(), alice_id);
    let mut signals = sync.take_signal_rx().unwrap();
    sync.subscribe(list_id).await;
    sync.start().unwrap();
    wait_for_state(&mut signals, ConnectionState::Subscribed).await;
    sleep(Duration::from_millis(100)).await;

    assert_eq!(server.state.registry.subscriber_count(list_id), 1);
    assert_eq!(server.state.registry.connection_count(), 1);

    sync.shutdown().await;
    sleep(Duration::from_millis(200)).await;

    // Connection and its subscriptions are gone; later events have
    // no one to go to and nothing blows up.
    assert_eq!(server.state.registry.subscriber_count(list_id), 0);
    assert_eq!(server.state.registry.connection_count(), 0);
    alice
        .update_collab_list(list_id, Some("after close"), None)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_nonexistent_collab_list_is_404() {
    let server = start_test_server().await;
    let (alice, _) = signed_up(&server, "alice@example.com").await;

    let err = alice.fetch_collab_list(Uuid::new_v4()).await.unwrap_err();
    match err {
        listsync::client::ApiClientError::Api { status, .. } => assert_eq!(status, 404),
        other => panic!("expected API error, got {other:?}"),
    }
}
