//! Session integration tests
//!
//! Drive full sessions over scripted transports and a local WebSocket
//! server. No network access is needed.
//!
//! Run with: cargo test -p integration-tests --test session_tests

use std::sync::Arc;
use std::time::Duration;

use danmu_client::connection::{WsConnector, DEFAULT_HOST};
use danmu_client::protocol::{decode, encode_heartbeat, EnterRoomPayload, OpCode};
use danmu_client::{EventKind, Session, SessionConfig, SessionError, SessionState};
use integration_tests::*;
use serde_json::json;
use tokio::sync::mpsc;

const TIMEOUT: Duration = Duration::from_secs(5);

fn session(api: StaticRoomApi, connector: &ScriptedConnector, config: SessionConfig) -> Session {
    Session::builder(510)
        .room_api(Arc::new(api))
        .connector(Arc::new(connector.clone()))
        .config(config)
        .build()
        .expect("session builds")
}

fn enter_payload(frame: &bytes::Bytes) -> EnterRoomPayload {
    let packets = decode(frame);
    assert_eq!(packets.len(), 1);
    assert_eq!(packets[0].op(), Some(OpCode::Authentication));
    packets[0].json().expect("enter body is JSON")
}

/// Forward every custom command named in `cmds` into a channel
fn record_commands(session: &Session, cmds: &[&str]) -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    for cmd in cmds {
        let tx = tx.clone();
        session.handlers().on_command(*cmd, move |event| {
            tx.send(event.cmd().unwrap_or_default().to_string()).ok();
        });
    }
    rx
}

// ============================================================================
// Reconnect
// ============================================================================

#[tokio::test]
async fn test_reconnects_after_read_failure_and_resumes_dispatch() {
    let connector = ScriptedConnector::new([
        Script::Accept(vec![Step::Binary(command("FIRST")), Step::Fail]),
        Script::Accept(vec![Step::Binary(command("SECOND"))]),
    ]);
    let session = session(
        StaticRoomApi::new(21_452_505, &["a.example", "b.example"]),
        &connector,
        fast_config(),
    );
    let mut commands = record_commands(&session, &["FIRST", "SECOND"]);

    session.start().await.unwrap();

    assert_eq!(within(TIMEOUT, commands.recv()).await.unwrap().unwrap(), "FIRST");
    assert_eq!(within(TIMEOUT, commands.recv()).await.unwrap().unwrap(), "SECOND");

    assert_eq!(connector.attempts(), ["a.example", "b.example"]);
    assert_eq!(session.current_host().as_deref(), Some("b.example"));
    assert_eq!(session.state(), SessionState::Connected);
    assert!(connector.closed().contains(&0));

    // Both connections identified themselves the same way
    let first = enter_payload(&connector.sent_on(0)[0]);
    let second = enter_payload(&connector.sent_on(1)[0]);
    assert_eq!(first, second);
    assert_eq!(first.room_id, 21_452_505);
    assert_eq!(first.key, "test-token");

    session.shutdown().await;
}

#[tokio::test]
async fn test_failed_enter_frame_counts_as_connect_failure() {
    let connector = ScriptedConnector::new([
        Script::RejectEnter,
        Script::Accept(vec![Step::Binary(command("READY"))]),
    ]);
    let session = session(
        StaticRoomApi::new(1, &["a.example", "b.example"]),
        &connector,
        fast_config(),
    );
    let mut commands = record_commands(&session, &["READY"]);

    session.start().await.unwrap();

    assert_eq!(within(TIMEOUT, commands.recv()).await.unwrap().unwrap(), "READY");
    assert_eq!(connector.attempts(), ["a.example", "b.example"]);
    assert!(connector.sent_on(0).is_empty());

    session.shutdown().await;
}

#[tokio::test]
async fn test_state_passes_through_reconnecting() {
    let connector = ScriptedConnector::new([
        Script::Accept(vec![Step::Fail]),
        Script::Refuse,
        Script::Accept(vec![]),
    ]);
    let session = session(StaticRoomApi::new(1, &["a", "b"]), &connector, fast_config());
    let mut states = session.subscribe_state();

    session.start().await.unwrap();

    assert!(wait_for_state(&mut states, SessionState::Reconnecting, TIMEOUT).await);
    assert!(wait_for_state(&mut states, SessionState::Connected, TIMEOUT).await);
    assert_eq!(connector.attempts(), ["a", "b", "a"]);

    session.shutdown().await;
}

// ============================================================================
// Dispatch
// ============================================================================

#[tokio::test]
async fn test_unknown_command_reaches_only_its_custom_handler() {
    let connector = ScriptedConnector::new([Script::Accept(vec![Step::Binary(notification(
        &json!({"cmd": "UNKNOWN_CMD", "data": {}}),
    ))])]);
    let session = session(StaticRoomApi::new(1, &["a"]), &connector, fast_config());

    let (tx, mut rx) = mpsc::unbounded_channel();
    for kind in [
        EventKind::Danmaku,
        EventKind::Gift,
        EventKind::SuperChat,
        EventKind::GuardBuy,
        EventKind::InteractWord,
        EventKind::Live,
        EventKind::OnlineCount,
        EventKind::AuthReply,
    ] {
        let tx = tx.clone();
        session.handlers().on(kind, move |_| {
            tx.send(format!("builtin:{kind}")).ok();
        });
    }
    let custom_tx = tx.clone();
    session.handlers().on_command("UNKNOWN_CMD", move |event| {
        custom_tx
            .send(format!("custom:{}", event.cmd().unwrap_or_default()))
            .ok();
    });

    session.start().await.unwrap();

    assert_eq!(
        within(TIMEOUT, rx.recv()).await.unwrap().unwrap(),
        "custom:UNKNOWN_CMD"
    );
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(rx.try_recv().is_err());

    session.shutdown().await;
}

#[tokio::test]
async fn test_compressed_batches_reach_typed_handlers() {
    let batch = frame(&[
        zlib_batch(&[danmaku(7, "alice", "first"), gift("bob", "flower", 3)]),
        brotli_batch(&[danmaku(8, "carol", "second")]),
        heartbeat_reply(1234),
    ]);
    let connector = ScriptedConnector::new([Script::Accept(vec![Step::Binary(batch)])]);
    let session = session(StaticRoomApi::new(1, &["a"]), &connector, fast_config());

    let (tx, mut rx) = mpsc::unbounded_channel();
    let danmaku_tx = tx.clone();
    session.handlers().on_danmaku(move |d| {
        danmaku_tx.send(format!("{}:{}", d.uname, d.text)).ok();
    });
    let gift_tx = tx.clone();
    session.handlers().on_gift(move |g| {
        gift_tx.send(format!("{}x{}", g.gift_name, g.num)).ok();
    });
    session.handlers().on_online_count(move |count| {
        tx.send(format!("online:{count}")).ok();
    });

    session.start().await.unwrap();

    let mut seen = Vec::new();
    for _ in 0..4 {
        seen.push(within(TIMEOUT, rx.recv()).await.unwrap().unwrap());
    }
    seen.sort();
    assert_eq!(
        seen,
        ["alice:first", "carol:second", "flowerx3", "online:1234"]
    );

    session.shutdown().await;
}

#[tokio::test]
async fn test_text_frames_and_panics_do_not_stop_reading() {
    let connector = ScriptedConnector::new([Script::Accept(vec![
        Step::Text("hello".to_string()),
        Step::Binary(command("BOOM")),
        Step::Binary(command("AFTER")),
    ])]);
    let session = session(StaticRoomApi::new(1, &["a"]), &connector, fast_config());
    session.handlers().on_command("BOOM", |_| panic!("handler failure"));
    let mut commands = record_commands(&session, &["AFTER"]);

    session.start().await.unwrap();

    assert_eq!(within(TIMEOUT, commands.recv()).await.unwrap().unwrap(), "AFTER");
    assert!(wait_until(TIMEOUT, || session.dispatcher().panicked() == 1).await);
    assert_eq!(connector.attempts().len(), 1);

    session.shutdown().await;
}

// ============================================================================
// Hosts and discovery
// ============================================================================

#[tokio::test]
async fn test_host_rotation_wraps_around() {
    let connector = ScriptedConnector::new([
        Script::Refuse,
        Script::Refuse,
        Script::Refuse,
        Script::Accept(vec![]),
    ]);
    let session = session(
        StaticRoomApi::new(1, &["h0", "h1", "h2"]),
        &connector,
        fast_config(),
    );

    session.start().await.unwrap();

    assert_eq!(connector.attempts(), ["h0", "h1", "h2", "h0"]);
    assert_eq!(session.connect_attempts(), 4);
    assert_eq!(session.current_host().as_deref(), Some("h0"));

    session.shutdown().await;
}

#[tokio::test]
async fn test_discovery_failure_falls_back_to_default_host() {
    let connector = ScriptedConnector::new([Script::Accept(vec![])]);
    let mut api = StaticRoomApi::new(99, &["discovered"]);
    api.fail_room_info = true;
    api.fail_danmu_info = true;
    let session = session(api, &connector, fast_config());

    session.start().await.unwrap();

    assert_eq!(connector.attempts(), [DEFAULT_HOST]);
    assert_eq!(session.room_id(), 510);
    let enter = enter_payload(&connector.sent_on(0)[0]);
    assert_eq!(enter.room_id, 510);
    assert_eq!(enter.key, "");

    session.shutdown().await;
}

#[tokio::test]
async fn test_pinned_host_still_uses_discovered_token() {
    let connector = ScriptedConnector::new([Script::Accept(vec![])]);
    let session = session(StaticRoomApi::new(1, &["discovered"]), &connector, fast_config());
    session.set_host("pinned.example");

    session.start().await.unwrap();

    assert_eq!(connector.attempts(), ["pinned.example"]);
    assert_eq!(enter_payload(&connector.sent_on(0)[0]).key, "test-token");
    assert!(format!("{session:?}").contains("pinned_host: true"));

    session.shutdown().await;
}

#[tokio::test]
async fn test_use_default_host_overrides_discovery() {
    let connector = ScriptedConnector::new([Script::Accept(vec![])]);
    let session = session(StaticRoomApi::new(1, &["discovered"]), &connector, fast_config());
    session.use_default_host();

    session.start().await.unwrap();

    assert_eq!(connector.attempts(), [DEFAULT_HOST]);
    session.shutdown().await;
}

#[tokio::test]
async fn test_room_id_zero_without_discovery_is_fatal() {
    let connector = ScriptedConnector::new([Script::Accept(vec![])]);
    let mut api = StaticRoomApi::new(0, &["a"]);
    api.fail_room_info = true;
    let session = Session::builder(0)
        .room_api(Arc::new(api))
        .connector(Arc::new(connector.clone()))
        .config(fast_config())
        .build()
        .unwrap();

    let err = session.start().await.unwrap_err();
    assert!(matches!(err, SessionError::Discovery(_)));
    assert!(connector.attempts().is_empty());
    assert_eq!(session.state(), SessionState::Uninitialized);
}

// ============================================================================
// Cookie
// ============================================================================

#[tokio::test]
async fn test_cookie_without_markers_is_rejected_before_network() {
    let connector = ScriptedConnector::new([Script::Accept(vec![])]);
    let api = Arc::new({
        let mut api = StaticRoomApi::new(1, &["a"]);
        api.uid = 42;
        api
    });
    let session = Session::builder(1)
        .room_api(api.clone())
        .connector(Arc::new(connector.clone()))
        .config(fast_config())
        .cookie("SESSDATA=only")
        .build()
        .unwrap();

    let err = session.start().await.unwrap_err();
    assert!(matches!(err, SessionError::Configuration(_)));
    assert!(api.calls().is_empty());
    assert!(connector.attempts().is_empty());
    assert_eq!(session.state(), SessionState::Uninitialized);

    // Fixing the cookie makes the same session usable
    session.set_cookie(TEST_COOKIE).unwrap();
    session.start().await.unwrap();

    let enter = enter_payload(&connector.sent_on(0)[0]);
    assert_eq!(enter.uid, 42);
    assert_eq!(enter.buvid, TEST_BUVID);
    assert_eq!(session.uid(), 42);
    assert!(api.calls().contains(&"danmu_info:1:true".to_string()));

    assert!(matches!(
        session.set_cookie("late"),
        Err(SessionError::AlreadyStarted)
    ));
    session.shutdown().await;
}

// ============================================================================
// Heartbeat
// ============================================================================

#[tokio::test]
async fn test_heartbeats_are_sent_on_the_connection() {
    let connector = ScriptedConnector::new([Script::Accept(vec![])]);
    let session = session(StaticRoomApi::new(1, &["a"]), &connector, fast_config());

    session.start().await.unwrap();

    assert!(wait_until(TIMEOUT, || connector.sent_on(0).len() >= 3).await);
    let sent = connector.sent_on(0);
    assert_eq!(enter_payload(&sent[0]).room_id, 1);
    assert!(sent[1..].iter().all(|frame| *frame == encode_heartbeat()));

    session.shutdown().await;
}

// ============================================================================
// Stop and limits
// ============================================================================

#[tokio::test]
async fn test_stop_is_idempotent() {
    let connector = ScriptedConnector::new([Script::Accept(vec![])]);
    let session = session(StaticRoomApi::new(1, &["a"]), &connector, fast_config());

    session.start().await.unwrap();
    session.stop();
    session.stop();
    session.shutdown().await;

    assert_eq!(session.state(), SessionState::Closed);
    assert_eq!(connector.closed(), [0]);
    assert!(matches!(session.start().await, Err(SessionError::Stopped)));

    // No heartbeats after the supervisor is gone
    let sent = connector.all_sent().len();
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(connector.all_sent().len(), sent);
}

#[tokio::test]
async fn test_stop_interrupts_unbounded_connect_retries() {
    let connector = ScriptedConnector::new([]);
    let session = session(StaticRoomApi::new(1, &["a", "b"]), &connector, fast_config());

    let starter = session.clone();
    let start = tokio::spawn(async move { starter.start().await });

    assert!(wait_until(TIMEOUT, || connector.attempts().len() >= 3).await);
    session.stop();

    let result = within(TIMEOUT, start).await.unwrap().unwrap();
    assert!(matches!(result, Err(SessionError::Stopped)));
    assert_eq!(session.state(), SessionState::Closed);
}

#[tokio::test]
async fn test_connect_ceiling_during_start() {
    let connector = ScriptedConnector::new([]);
    let config = SessionConfig {
        max_connect_attempts: Some(2),
        ..fast_config()
    };
    let session = session(StaticRoomApi::new(1, &["a", "b", "c"]), &connector, config);

    let err = session.start().await.unwrap_err();
    assert!(matches!(
        err,
        SessionError::Connect { ref host, attempts: 2, .. } if host == "b"
    ));
    assert_eq!(session.state(), SessionState::Uninitialized);
}

#[tokio::test]
async fn test_connect_ceiling_in_background_closes_session() {
    let connector = ScriptedConnector::new([Script::Accept(vec![Step::Fail])]);
    let config = SessionConfig {
        max_connect_attempts: Some(1),
        ..fast_config()
    };
    let session = session(StaticRoomApi::new(1, &["a"]), &connector, config);
    let mut states = session.subscribe_state();

    session.start().await.unwrap();

    assert!(wait_for_state(&mut states, SessionState::Closed, TIMEOUT).await);
    assert_eq!(connector.attempts(), ["a", "a"]);
}

#[tokio::test]
async fn test_zero_heartbeat_interval_is_a_configuration_error() {
    let connector = ScriptedConnector::new([Script::Accept(vec![])]);
    let result = Session::builder(1)
        .room_api(Arc::new(StaticRoomApi::new(1, &["a"])))
        .connector(Arc::new(connector.clone()))
        .config(SessionConfig {
            heartbeat_interval: Duration::ZERO,
            ..fast_config()
        })
        .build();

    assert!(matches!(result, Err(SessionError::Configuration(_))));
    assert!(connector.attempts().is_empty());
}

#[tokio::test]
async fn test_shutdown_does_not_wait_for_saturated_handlers() {
    let connector = ScriptedConnector::new([Script::Accept(vec![Step::Binary(frame(&[
        command("SLOW"),
        command("SLOW"),
    ]))])]);
    let config = SessionConfig {
        max_in_flight_handlers: Some(1),
        ..fast_config()
    };
    let session = session(StaticRoomApi::new(1, &["a"]), &connector, config);

    let (started_tx, mut started) = mpsc::unbounded_channel();
    let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();
    let release_rx = parking_lot::Mutex::new(release_rx);
    session.handlers().on_command("SLOW", move |_| {
        started_tx.send(()).ok();
        release_rx.lock().recv_timeout(Duration::from_secs(3)).ok();
    });

    session.start().await.unwrap();
    within(TIMEOUT, started.recv()).await.unwrap();

    // The second SLOW is parked waiting for the only handler slot
    let begun = tokio::time::Instant::now();
    within(Duration::from_secs(1), session.shutdown())
        .await
        .expect("shutdown returns while a handler is still running");
    assert!(begun.elapsed() < Duration::from_secs(1));
    assert_eq!(session.state(), SessionState::Closed);
    assert_eq!(session.dispatcher().spawned(), 1);

    release_tx.send(()).ok();
}

// ============================================================================
// Real WebSocket
// ============================================================================

#[tokio::test]
async fn test_websocket_end_to_end() {
    let mut server = TestChatServer::start(vec![
        auth_reply(0),
        frame(&[danmaku(5, "viewer", "hello over ws"), command("ONLINE_RANK_COUNT")]),
    ])
    .await
    .unwrap();

    let session = Session::builder(77)
        .room_api(Arc::new(StaticRoomApi::new(21_452_505, &["unused"])))
        .connector(Arc::new(WsConnector::new().insecure()))
        .host(server.host())
        .config(fast_config())
        .build()
        .unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let auth_tx = tx.clone();
    session.handlers().on(EventKind::AuthReply, move |event| {
        auth_tx.send(format!("{:?}", event.kind())).ok();
    });
    let rank_tx = tx.clone();
    session.handlers().on(EventKind::OnlineRankCount, move |_| {
        rank_tx.send("rank".to_string()).ok();
    });
    session.handlers().on_danmaku(move |d| {
        tx.send(d.text).ok();
    });

    session.start().await.unwrap();

    let enter = within(TIMEOUT, server.received.recv()).await.unwrap().unwrap();
    assert_eq!(enter_payload(&enter).room_id, 21_452_505);

    let mut seen = Vec::new();
    for _ in 0..3 {
        seen.push(within(TIMEOUT, rx.recv()).await.unwrap().unwrap());
    }
    seen.sort();
    assert_eq!(seen, ["Some(AuthReply)", "hello over ws", "rank"]);

    // Heartbeat reaches the server over the same socket
    let heartbeat = within(TIMEOUT, server.received.recv()).await.unwrap().unwrap();
    assert_eq!(heartbeat, encode_heartbeat());

    session.shutdown().await;
}
