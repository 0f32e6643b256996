//! Client-side connection manager
//!
//! Owns the duplex link lifecycle and hides transport flakiness from the
//! game layer: automatic reconnect with a fixed delay, join-request
//! timeout, and a local [`SessionMirror`] updated before handlers run.
//! The game layer only ever talks to this type - the operation methods
//! going out, the [`on`](ConnectionManager::on) registry coming in.

mod handlers;
mod mirror;

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde_json::Value;

use crate::config::ClientConfig;
use crate::error::{LobbyError, Result};
use crate::protocol::{JoinRoom, JoinTimeout, Message, SetName};
use crate::transport::{Transport, TransportEvent};
use crate::types::RoomId;

use handlers::HandlerRegistry;
pub use handlers::Subscription;
pub use mirror::SessionMirror;

#[derive(Default)]
struct LinkState {
    mirror: SessionMirror,
    /// Outbound frame channel of the current link; `None` while closed.
    /// Dropping it closes the link from our side.
    outbound: Option<flume::Sender<String>>,
    /// Bumped on every established link and on explicit disconnect, so
    /// stale readers and reconnect loops become no-ops
    generation: u64,
    /// Bumped whenever a join timer is armed or must be cancelled; a timer
    /// only fires if its sequence number is still current
    join_timer_seq: u64,
}

struct ManagerInner {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    handlers: Arc<HandlerRegistry>,
    state: Mutex<LinkState>,
}

/// Connection manager for one player
///
/// Cheap to clone; clones share the same link, mirror, and handlers.
#[derive(Clone)]
pub struct ConnectionManager {
    inner: Arc<ManagerInner>,
}

impl ConnectionManager {
    /// Create a manager over an explicit transport (tests use the loopback)
    pub fn new(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            inner: Arc::new(ManagerInner {
                config,
                transport,
                handlers: Arc::new(HandlerRegistry::default()),
                state: Mutex::new(LinkState::default()),
            }),
        }
    }

    /// Create a manager over the production WebSocket transport
    pub fn websocket(config: ClientConfig) -> Self {
        Self::new(config, Arc::new(crate::transport::WsTransport::new()))
    }

    fn state(&self) -> MutexGuard<'_, LinkState> {
        self.inner.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Open the link
    ///
    /// Idempotent: returns `true` immediately when already open. Returns
    /// `false` on failure without scheduling a retry - automatic reconnect
    /// only starts once an established link is lost.
    pub async fn connect(&self) -> bool {
        if self.is_connected() {
            return true;
        }
        let expected_generation = self.state().generation;
        self.establish(expected_generation).await
    }

    /// Open a new link, but only install it if the generation is still
    /// `expected_generation` once the open completes. A `disconnect()`
    /// landing while the open is in flight bumps the generation, so the
    /// freshly opened link is dropped instead of resurrecting the manager.
    async fn establish(&self, expected_generation: u64) -> bool {
        let link = match self.inner.transport.open(&self.inner.config.url).await {
            Ok(link) => link,
            Err(e) => {
                tracing::warn!("failed to open transport: {}", e);
                return false;
            }
        };

        let (generation, pending) = {
            let mut state = self.state();
            // A concurrent connect may have won; keep the live link
            if state
                .outbound
                .as_ref()
                .is_some_and(|out| !out.is_disconnected())
            {
                return true;
            }
            if state.generation != expected_generation {
                tracing::debug!("link superseded while opening, dropping it");
                return false;
            }
            state.generation += 1;
            state.outbound = Some(link.outbound);
            state.mirror.connected = true;
            (state.generation, state.mirror.pending_join_room_id.clone())
        };
        tracing::info!("link established");
        self.spawn_reader(link.inbound, generation);

        // A join recorded before the link dropped is replayed so the guest
        // lands back in its room
        if let Some(room_id) = pending {
            tracing::info!("replaying join for room '{}'", room_id);
            self.join_room(room_id.as_str());
        }
        true
    }

    fn spawn_reader(&self, inbound: flume::Receiver<TransportEvent>, generation: u64) {
        let manager = self.clone();
        tokio::spawn(async move {
            loop {
                match inbound.recv_async().await {
                    Ok(TransportEvent::Frame(frame)) => {
                        if manager.state().generation != generation {
                            // Superseded link; leftover frames are stale
                            return;
                        }
                        manager.dispatch_frame(&frame);
                    }
                    Ok(TransportEvent::Closed) | Err(_) => break,
                }
            }
            manager.handle_link_loss(generation);
        });
    }

    /// React to a link lost underneath us (not caller-initiated)
    fn handle_link_loss(&self, generation: u64) {
        {
            let mut state = self.state();
            if state.generation != generation {
                return;
            }
            state.outbound = None;
            state.mirror.connected = false;
        }
        let delay = Duration::from_millis(self.inner.config.reconnect_delay_ms);
        tracing::info!("link lost, reconnecting in {:?}", delay);

        let manager = self.clone();
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(delay).await;
                if manager.state().generation != generation {
                    // Explicit disconnect or a newer link arrived meanwhile
                    return;
                }
                if manager.establish(generation).await {
                    return;
                }
                tracing::debug!("reconnect attempt failed, retrying in {:?}", delay);
            }
        });
    }

    fn dispatch_frame(&self, frame: &str) {
        let message = match Message::decode(frame) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!("ignoring malformed inbound frame: {}", e);
                return;
            }
        };
        {
            let mut state = self.state();
            state.mirror.apply(&message);
            if matches!(message, Message::RoomCreated(_) | Message::RoomJoined(_)) {
                // The join was answered; any armed join timer is now stale
                state.join_timer_seq += 1;
            }
        }
        self.inner.handlers.dispatch(&message);
    }

    /// Close the link and stop all background work
    ///
    /// The only way to end the automatic reconnect loop. Cancels any armed
    /// join timer and resets the mirror to initial values.
    pub fn disconnect(&self) {
        let mut state = self.state();
        state.generation += 1;
        state.join_timer_seq += 1;
        state.outbound = None;
        state.mirror.reset();
        tracing::info!("disconnected");
    }

    /// Serialize and send one message; `false` when the link is closed
    pub fn send(&self, message: Message) -> bool {
        match self.try_send(&message) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!("send of '{}' dropped: {}", message.kind(), e);
                false
            }
        }
    }

    fn try_send(&self, message: &Message) -> Result<()> {
        let outbound = self.state().outbound.clone();
        let Some(outbound) = outbound else {
            return Err(LobbyError::TransportUnavailable);
        };
        let frame = message.encode()?;
        outbound
            .send(frame)
            .map_err(|_| LobbyError::TransportUnavailable)
    }

    /// Ask the coordinator for a fresh room with us as host
    pub fn create_room(&self) -> bool {
        self.send(Message::CreateRoom)
    }

    /// Request the guest seat of `room_id`
    ///
    /// Records the id for replay after a reconnect and arms the join timer;
    /// if no `room-joined`/`room-created` arrives in time, a synthetic
    /// `join-timeout` is dispatched to local handlers only.
    pub fn join_room(&self, room_id: &str) -> bool {
        let room_id = RoomId::from(room_id);
        let seq = {
            let mut state = self.state();
            state.mirror.pending_join_room_id = Some(room_id.clone());
            state.join_timer_seq += 1;
            state.join_timer_seq
        };

        let sent = self.send(Message::JoinRoom(JoinRoom {
            room_id: room_id.clone(),
        }));

        let manager = self.clone();
        let timeout = Duration::from_millis(self.inner.config.join_timeout_ms);
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            if manager.state().join_timer_seq != seq {
                return;
            }
            tracing::debug!("room '{}': {}", room_id, LobbyError::JoinTimedOut);
            manager
                .inner
                .handlers
                .dispatch(&Message::JoinTimeout(JoinTimeout { room_id }));
        });
        sent
    }

    /// Submit our display name
    pub fn set_player_name(&self, name: &str) -> bool {
        self.state().mirror.player_name = Some(name.to_string());
        self.send(Message::SetName(SetName {
            name: name.to_string(),
        }))
    }

    /// Signal readiness to start
    pub fn set_ready(&self) -> bool {
        self.send(Message::PlayerReady)
    }

    /// Relay an opaque game-state payload to our peer
    pub fn send_game_update(&self, data: Value) -> bool {
        self.send(Message::GameUpdate(data))
    }

    /// Ask for a fresh match in the current room
    pub fn request_restart(&self) -> bool {
        self.send(Message::RestartGame)
    }

    /// Register a handler for one envelope kind
    pub fn on(
        &self,
        kind: &str,
        handler: impl Fn(&Message) + Send + Sync + 'static,
    ) -> Subscription {
        self.inner
            .handlers
            .register(Some(kind.to_string()), handler)
    }

    /// Register a handler invoked for every inbound message
    pub fn on_any(&self, handler: impl Fn(&Message) + Send + Sync + 'static) -> Subscription {
        self.inner.handlers.register(None, handler)
    }

    /// Snapshot of the local session mirror
    pub fn mirror(&self) -> SessionMirror {
        self.state().mirror.clone()
    }

    /// Whether the link is currently open
    pub fn is_connected(&self) -> bool {
        let state = self.state();
        state.mirror.connected
            && state
                .outbound
                .as_ref()
                .is_some_and(|out| !out.is_disconnected())
    }
}
