//! End-to-end session flows: two connection managers against one
//! coordinator over the in-process loopback transport. Frames cross the
//! link as serialized JSON, so everything but the socket is exercised.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use ws_lobby::{
    ClientConfig, ConnectionManager, Coordinator, LoopbackTransport, Message, RoomId, Seat,
    Subscription,
};

const STEP: Duration = Duration::from_millis(1000);

fn test_config() -> ClientConfig {
    ClientConfig::new()
        .with_reconnect_delay_ms(20)
        .with_join_timeout_ms(60)
}

struct Probe {
    rx: flume::Receiver<Message>,
    _subscription: Subscription,
}

impl Probe {
    fn watch(manager: &ConnectionManager, kind: &str) -> Self {
        let (tx, rx) = flume::unbounded();
        let subscription = manager.on(kind, move |message| {
            let _ = tx.send(message.clone());
        });
        Self {
            rx,
            _subscription: subscription,
        }
    }

    async fn next(&self) -> Message {
        tokio::time::timeout(STEP, self.rx.recv_async())
            .await
            .expect("timed out waiting for message")
            .expect("probe channel closed")
    }
}

async fn connect_named(manager: &ConnectionManager, name: &str) {
    let connected = Probe::watch(manager, "connected");
    assert!(manager.connect().await);
    connected.next().await;
    assert!(manager.set_player_name(name));
}

async fn create_room(host: &ConnectionManager) -> RoomId {
    let room_created = Probe::watch(host, "room-created");
    assert!(host.create_room());
    match room_created.next().await {
        Message::RoomCreated(p) => p.room_id,
        other => panic!("expected room-created, got {:?}", other),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_full_match_lifecycle() {
    let coordinator = Arc::new(Coordinator::new());
    let transport = Arc::new(LoopbackTransport::new(coordinator.clone()));
    let alice = ConnectionManager::new(test_config(), transport.clone());
    let bob = ConnectionManager::new(test_config(), transport.clone());

    connect_named(&alice, "Alice").await;
    connect_named(&bob, "Bob").await;

    // Lobby: create and join
    let room_id = create_room(&alice).await;
    let player_joined = Probe::watch(&alice, "player-joined");
    let room_joined = Probe::watch(&bob, "room-joined");
    assert!(bob.join_room(room_id.as_str()));
    player_joined.next().await;
    room_joined.next().await;

    assert!(alice.mirror().is_host);
    assert_eq!(alice.mirror().room_id, Some(room_id.clone()));
    assert!(!bob.mirror().is_host);
    assert_eq!(bob.mirror().peer_name.as_deref(), Some("Alice"));

    // Ready handshake: host first, then guest; game-start on both sides
    let bob_ready_update = Probe::watch(&bob, "player-ready-update");
    let alice_start = Probe::watch(&alice, "game-start");
    let bob_start = Probe::watch(&bob, "game-start");

    assert!(alice.set_ready());
    match bob_ready_update.next().await {
        Message::PlayerReadyUpdate(p) => {
            assert_eq!(p.player, Seat::Host);
            assert!(p.host_ready && !p.guest_ready);
        }
        other => panic!("expected player-ready-update, got {:?}", other),
    }

    assert!(bob.set_ready());
    let (to_alice, to_bob) = (alice_start.next().await, bob_start.next().await);
    match (&to_alice, &to_bob) {
        (Message::GameStart(a), Message::GameStart(b)) => {
            assert_eq!(a.host_name, "Alice");
            assert_eq!(b.host_name, "Alice");
            assert_eq!(a.guest_name, "Bob");
            assert_eq!(b.guest_name, "Bob");
            assert!(a.is_host);
            assert!(!b.is_host);
        }
        other => panic!("expected game-start pair, got {:?}", other),
    }
    assert!(alice.mirror().host_ready && alice.mirror().guest_ready);

    // In-game: opaque relay both directions
    let bob_update = Probe::watch(&bob, "game-update");
    let alice_update = Probe::watch(&alice, "game-update");
    let ball = json!({"ball": {"x": 0.25, "y": -1.0}, "tick": 7});
    assert!(alice.send_game_update(ball.clone()));
    match bob_update.next().await {
        Message::GameUpdate(v) => assert_eq!(v, ball),
        other => panic!("expected game-update, got {:?}", other),
    }
    let paddle = json!({"paddle": 3});
    assert!(bob.send_game_update(paddle.clone()));
    match alice_update.next().await {
        Message::GameUpdate(v) => assert_eq!(v, paddle),
        other => panic!("expected game-update, got {:?}", other),
    }

    // Restart: both notified, ready flags drop, seats keep their owners
    let alice_restart = Probe::watch(&alice, "game-restart");
    let bob_restart = Probe::watch(&bob, "game-restart");
    assert!(bob.request_restart());
    match alice_restart.next().await {
        Message::GameRestart(p) => assert_eq!(p.requested_by, "Bob"),
        other => panic!("expected game-restart, got {:?}", other),
    }
    bob_restart.next().await;
    assert!(!alice.mirror().host_ready && !alice.mirror().guest_ready);

    let room = coordinator.room(&room_id).expect("room still alive");
    assert!(!room.game_in_progress);
    assert!(room.guest.is_some());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_guest_drop_and_replacement() {
    let coordinator = Arc::new(Coordinator::new());
    let host_transport = Arc::new(LoopbackTransport::new(coordinator.clone()));
    let guest_transport = Arc::new(LoopbackTransport::new(coordinator.clone()));
    let alice = ConnectionManager::new(test_config(), host_transport.clone());
    let bob = ConnectionManager::new(test_config(), guest_transport.clone());

    connect_named(&alice, "Alice").await;
    connect_named(&bob, "Bob").await;
    let room_id = create_room(&alice).await;

    let player_joined = Probe::watch(&alice, "player-joined");
    let room_joined = Probe::watch(&bob, "room-joined");
    bob.join_room(room_id.as_str());
    player_joined.next().await;
    room_joined.next().await;

    // Bob leaves for good: host is told, the room stays up with an empty
    // guest seat
    let player_left = Probe::watch(&alice, "player-left");
    bob.disconnect();
    match player_left.next().await {
        Message::PlayerLeft(p) => assert_eq!(p.message, "Guest left the game"),
        other => panic!("expected player-left, got {:?}", other),
    }
    let room = coordinator.room(&room_id).expect("room survives guest loss");
    assert_eq!(room.guest, None);
    assert!(!room.guest_ready);

    // A new player takes the vacant seat
    let carol = ConnectionManager::new(test_config(), guest_transport.clone());
    connect_named(&carol, "Carol").await;
    let replacement_joined = Probe::watch(&alice, "player-joined");
    let carol_joined = Probe::watch(&carol, "room-joined");
    carol.join_room(room_id.as_str());
    match replacement_joined.next().await {
        Message::PlayerJoined(p) => assert_eq!(p.guest, "Carol"),
        other => panic!("expected player-joined, got {:?}", other),
    }
    carol_joined.next().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_host_drop_destroys_room_for_guest() {
    let coordinator = Arc::new(Coordinator::new());
    let host_transport = Arc::new(LoopbackTransport::new(coordinator.clone()));
    let guest_transport = Arc::new(LoopbackTransport::new(coordinator.clone()));
    let alice = ConnectionManager::new(test_config(), host_transport.clone());
    let bob = ConnectionManager::new(test_config(), guest_transport.clone());

    connect_named(&alice, "Alice").await;
    connect_named(&bob, "Bob").await;
    let room_id = create_room(&alice).await;
    let room_joined = Probe::watch(&bob, "room-joined");
    bob.join_room(room_id.as_str());
    room_joined.next().await;

    let player_left = Probe::watch(&bob, "player-left");
    alice.disconnect();
    match player_left.next().await {
        Message::PlayerLeft(p) => assert_eq!(p.message, "Host left the game"),
        other => panic!("expected player-left, got {:?}", other),
    }

    // Guest cannot survive host loss: room gone on both sides
    assert!(coordinator.room(&room_id).is_none());
    assert_eq!(bob.mirror().room_id, None);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_error_envelope_reaches_only_offender() {
    let coordinator = Arc::new(Coordinator::new());
    let transport = Arc::new(LoopbackTransport::new(coordinator.clone()));
    let alice = ConnectionManager::new(test_config(), transport.clone());
    let bob = ConnectionManager::new(test_config(), transport.clone());

    connect_named(&alice, "Alice").await;
    connect_named(&bob, "Bob").await;
    let _room_id = create_room(&alice).await;

    let alice_errors = Probe::watch(&alice, "error");
    let bob_errors = Probe::watch(&bob, "error");
    bob.join_room("nonexistent");
    match bob_errors.next().await {
        Message::Error(p) => assert_eq!(p.message, "Room not found"),
        other => panic!("expected error, got {:?}", other),
    }
    assert_eq!(bob.mirror().room_id, None);

    // The failure never leaked to the other connection
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(alice_errors.rx.is_empty());
}
