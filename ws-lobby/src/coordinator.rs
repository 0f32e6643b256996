//! Session coordinator - the authoritative registry of players and rooms
//!
//! One [`Coordinator`] instance owns all session state. The transport layer
//! attaches a player per accepted connection, feeds it decoded inbound
//! messages, and detaches it when the stream closes. Every operation runs
//! under a single registry lock: the read-modify-write of a room and all of
//! its response/broadcast sends are one critical section, so no connection
//! can observe a half-applied transition (in particular, the
//! both-ready → `game-start` step is both-or-neither). Sends are
//! non-blocking channel writes, so the lock is never held across I/O.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use serde_json::Value;

use crate::error::LobbyError;
use crate::protocol::{
    Connected, ErrorPayload, GameRestart, GameStart, JoinRoom, Message, PlayerJoined, PlayerLeft,
    PlayerReadyUpdate, ReadyAcknowledged, RoomCreated, RoomJoined, Seat, SetName,
};
use crate::types::{default_display_name, PlayerId, RoomId};

/// A two-seat game room
///
/// The room is owned by its host's connection lifecycle: the host leaving
/// destroys it, a guest leaving only vacates the guest seat.
#[derive(Debug, Clone)]
pub struct Room {
    /// Room code
    pub id: RoomId,
    /// Player occupying the host seat
    pub host: PlayerId,
    /// Player occupying the guest seat, if any
    pub guest: Option<PlayerId>,
    /// Host signaled ready to start
    pub host_ready: bool,
    /// Guest signaled ready to start
    pub guest_ready: bool,
    /// Both seats were simultaneously ready and game-start was emitted
    pub game_in_progress: bool,
}

impl Room {
    fn new(id: RoomId, host: PlayerId) -> Self {
        Self {
            id,
            host,
            guest: None,
            host_ready: false,
            guest_ready: false,
            game_in_progress: false,
        }
    }

    fn seat_of(&self, player: &PlayerId) -> Option<Seat> {
        if self.host == *player {
            Some(Seat::Host)
        } else if self.guest.as_ref() == Some(player) {
            Some(Seat::Guest)
        } else {
            None
        }
    }
}

/// Server-side record of one connected player
#[derive(Debug)]
struct PlayerEntry {
    id: PlayerId,
    name: String,
    /// Outbound handle; the transport task drains the paired receiver
    handle: flume::Sender<Message>,
    /// Back-reference to the room this player occupies (not ownership)
    room: Option<RoomId>,
    /// Room this player last tried to join; cleaned up on disconnect
    pending_join: Option<RoomId>,
}

impl PlayerEntry {
    /// Whether the player's connection can still receive messages
    fn is_live(&self) -> bool {
        !self.handle.is_disconnected()
    }
}

#[derive(Debug, Default)]
struct Registry {
    players: HashMap<PlayerId, PlayerEntry>,
    rooms: HashMap<RoomId, Room>,
}

/// The authoritative session registry
///
/// Constructed once and shared by `Arc`; never accessed through globals, so
/// tests can run independent coordinators side by side.
#[derive(Debug, Default)]
pub struct Coordinator {
    registry: Mutex<Registry>,
}

impl Coordinator {
    /// Create an empty coordinator
    pub fn new() -> Self {
        Self::default()
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        // A poisoned lock only means a panic elsewhere; the registry itself
        // is still consistent because every critical section is short
        self.registry.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register an accepted connection
    ///
    /// Mints a player with a generated id and a default display name and
    /// sends `connected{id}` to that connection only. Always succeeds.
    pub fn attach(&self, handle: flume::Sender<Message>) -> PlayerId {
        let id = PlayerId::generate();
        let entry = PlayerEntry {
            id: id.clone(),
            name: default_display_name(&id),
            handle,
            room: None,
            pending_join: None,
        };
        notify(&entry, Message::Connected(Connected { id: id.clone() }));

        let mut registry = self.registry();
        registry.players.insert(id.clone(), entry);
        tracing::info!("player '{}' connected", id);
        id
    }

    /// Process one inbound message from a connection
    ///
    /// Validation failures become an `error` envelope for the sender only;
    /// they never affect other rooms or players.
    pub fn handle_message(&self, player_id: &PlayerId, message: Message) {
        match message {
            Message::SetName(payload) => self.set_name(player_id, payload),
            Message::CreateRoom => self.create_room(player_id),
            Message::JoinRoom(payload) => self.join_room(player_id, payload),
            Message::PlayerReady => self.set_ready(player_id),
            Message::GameUpdate(payload) => self.relay_update(player_id, payload),
            Message::RestartGame => self.restart_game(player_id),
            Message::Unknown { kind, .. } => {
                tracing::warn!("player '{}' sent unknown message type '{}'", player_id, kind);
            }
            other => {
                tracing::warn!(
                    "player '{}' sent server-bound stream a '{}' message, ignoring",
                    player_id,
                    other.kind()
                );
            }
        }
    }

    /// Handle a closed connection
    ///
    /// Host leaving destroys the room and notifies the guest; guest leaving
    /// vacates the seat (room survives for a rejoin) and notifies the host.
    /// The player record is removed unconditionally.
    pub fn detach(&self, player_id: &PlayerId) {
        let mut registry = self.registry();
        let Some(player) = registry.players.get(player_id) else {
            return;
        };
        let room_id = player.room.clone();
        let pending = player.pending_join.clone();

        if let Some(room_id) = room_id {
            if let Some(room) = registry.rooms.get(&room_id).cloned() {
                match room.seat_of(player_id) {
                    Some(Seat::Host) => {
                        if let Some(guest_id) = &room.guest {
                            if let Some(guest) = registry.players.get(guest_id) {
                                notify(
                                    guest,
                                    Message::PlayerLeft(PlayerLeft {
                                        message: "Host left the game".to_string(),
                                    }),
                                );
                            }
                            if let Some(guest) = registry.players.get_mut(guest_id) {
                                guest.room = None;
                            }
                        }
                        registry.rooms.remove(&room_id);
                        tracing::info!("room '{}' destroyed, host '{}' left", room_id, player_id);
                    }
                    Some(Seat::Guest) => {
                        if let Some(host) = registry.players.get(&room.host) {
                            notify(
                                host,
                                Message::PlayerLeft(PlayerLeft {
                                    message: "Guest left the game".to_string(),
                                }),
                            );
                        }
                        if let Some(room) = registry.rooms.get_mut(&room_id) {
                            room.guest = None;
                            room.guest_ready = false;
                        }
                        tracing::info!(
                            "guest '{}' left room '{}', room kept for rejoin",
                            player_id,
                            room_id
                        );
                    }
                    None => {}
                }
            }
        }

        // A join attempt that never completed may still hold the guest seat
        if let Some(pending_id) = pending {
            if let Some(room) = registry.rooms.get_mut(&pending_id) {
                if room.guest.as_ref() == Some(player_id) {
                    room.guest = None;
                    room.guest_ready = false;
                }
            }
        }

        registry.players.remove(player_id);
        tracing::info!("player '{}' disconnected", player_id);
    }

    fn set_name(&self, player_id: &PlayerId, payload: SetName) {
        let mut registry = self.registry();
        let Some(player) = registry.players.get_mut(player_id) else {
            return;
        };
        let trimmed = payload.name.trim();
        player.name = if trimmed.is_empty() {
            default_display_name(player_id)
        } else {
            trimmed.to_string()
        };
        tracing::info!("player '{}' set name to '{}'", player_id, player.name);
    }

    fn create_room(&self, player_id: &PlayerId) {
        let mut registry = self.registry();
        let room_id = RoomId::generate();
        registry
            .rooms
            .insert(room_id.clone(), Room::new(room_id.clone(), player_id.clone()));

        let Some(player) = registry.players.get_mut(player_id) else {
            return;
        };
        player.room = Some(room_id.clone());
        let name = player.name.clone();
        notify(
            player,
            Message::RoomCreated(RoomCreated {
                room_id: room_id.clone(),
                name: name.clone(),
            }),
        );
        tracing::info!("player '{}' created room '{}'", name, room_id);
    }

    fn join_room(&self, player_id: &PlayerId, payload: JoinRoom) {
        let mut registry = self.registry();
        let room_id = payload.room_id;

        let Some(room) = registry.rooms.get(&room_id).cloned() else {
            self.reject(&registry, player_id, &LobbyError::RoomNotFound);
            return;
        };
        if room.host == *player_id {
            self.reject(&registry, player_id, &LobbyError::AlreadyHost);
            return;
        }

        if let Some(player) = registry.players.get_mut(player_id) {
            player.pending_join = Some(room_id.clone());
        }

        if let Some(incumbent_id) = &room.guest {
            // Replace-if-not-open rejoin: a guest whose connection is gone
            // may be superseded, typically the same person reconnecting
            let incumbent_live = registry
                .players
                .get(incumbent_id)
                .map(PlayerEntry::is_live)
                .unwrap_or(false);
            if incumbent_live {
                self.reject(&registry, player_id, &LobbyError::RoomFull);
                return;
            }
            tracing::info!(
                "player '{}' rejoining room '{}', replacing stale guest '{}'",
                player_id,
                room_id,
                incumbent_id
            );
        }

        self.seat_guest(&mut registry, player_id, &room_id);
    }

    /// Put the caller in the guest seat and emit both join notifications
    fn seat_guest(&self, registry: &mut Registry, player_id: &PlayerId, room_id: &RoomId) {
        let (guest_name, host_id) = {
            let Some(room) = registry.rooms.get_mut(room_id) else {
                return;
            };
            room.guest = Some(player_id.clone());
            room.host_ready = false;
            room.guest_ready = false;
            let host_id = room.host.clone();

            let Some(player) = registry.players.get_mut(player_id) else {
                return;
            };
            player.room = Some(room_id.clone());
            (player.name.clone(), host_id)
        };

        let host_name = registry
            .players
            .get(&host_id)
            .map(|host| host.name.clone())
            .unwrap_or_else(|| "Unknown".to_string());

        if let Some(host) = registry.players.get(&host_id) {
            notify(
                host,
                Message::PlayerJoined(PlayerJoined {
                    guest: guest_name.clone(),
                    guest_id: player_id.clone(),
                }),
            );
        }
        if let Some(player) = registry.players.get(player_id) {
            notify(
                player,
                Message::RoomJoined(RoomJoined {
                    room_id: room_id.clone(),
                    host: host_name,
                    host_id,
                }),
            );
        }
        tracing::info!("player '{}' joined room '{}' as guest", guest_name, room_id);
    }

    fn set_ready(&self, player_id: &PlayerId) {
        let mut registry = self.registry();
        let Some(room_id) = self.room_of(&registry, player_id) else {
            self.reject(&registry, player_id, &LobbyError::NotInRoom);
            return;
        };
        let Some(room) = registry.rooms.get_mut(&room_id) else {
            self.reject(&registry, player_id, &LobbyError::RoomNotFound);
            return;
        };
        let Some(guest_id) = room.guest.clone() else {
            self.reject(&registry, player_id, &LobbyError::WaitingForPeer);
            return;
        };

        // The transition fires only when this update flips the pair to
        // both-ready; an already-ready player repeating the request must
        // not duplicate game-start
        let was_both_ready = room.host_ready && room.guest_ready;
        let seat = match room.seat_of(player_id) {
            Some(seat) => seat,
            None => return,
        };
        match seat {
            Seat::Host => room.host_ready = true,
            Seat::Guest => room.guest_ready = true,
        }
        let host_ready = room.host_ready;
        let guest_ready = room.guest_ready;
        let host_id = room.host.clone();
        let start_game = host_ready && guest_ready && !was_both_ready;
        if start_game {
            room.game_in_progress = true;
        }

        if let Some(player) = registry.players.get(player_id) {
            notify(
                player,
                Message::ReadyAcknowledged(ReadyAcknowledged {
                    success: true,
                    host_ready,
                    guest_ready,
                }),
            );
        }

        let peer_id = match seat {
            Seat::Host => &guest_id,
            Seat::Guest => &host_id,
        };
        if let Some(peer) = registry.players.get(peer_id) {
            notify(
                peer,
                Message::PlayerReadyUpdate(PlayerReadyUpdate {
                    player: seat,
                    ready: true,
                    host_ready,
                    guest_ready,
                }),
            );
        }
        tracing::info!("player '{}' is ready in room '{}'", player_id, room_id);

        if start_game {
            let (Some(host), Some(guest)) = (
                registry.players.get(&host_id),
                registry.players.get(&guest_id),
            ) else {
                tracing::error!("room '{}' missing occupant records at game start", room_id);
                return;
            };
            let start = GameStart {
                host_name: host.name.clone(),
                guest_name: guest.name.clone(),
                is_host: true,
            };
            notify(host, Message::GameStart(start.clone()));
            notify(
                guest,
                Message::GameStart(GameStart {
                    is_host: false,
                    ..start.clone()
                }),
            );
            tracing::info!(
                "game starting in room '{}' between '{}' and '{}'",
                room_id,
                start.host_name,
                start.guest_name
            );
        }
    }

    /// Opaque relay: forward the payload to the caller's peer verbatim.
    /// Silently dropped when the caller has no room or no peer.
    fn relay_update(&self, player_id: &PlayerId, payload: Value) {
        let registry = self.registry();
        let Some(room_id) = self.room_of(&registry, player_id) else {
            return;
        };
        let Some(room) = registry.rooms.get(&room_id) else {
            return;
        };
        let peer_id = match room.seat_of(player_id) {
            Some(Seat::Host) => room.guest.clone(),
            Some(Seat::Guest) => Some(room.host.clone()),
            None => None,
        };
        let Some(peer_id) = peer_id else {
            return;
        };
        if let Some(peer) = registry.players.get(&peer_id) {
            tracing::debug!(
                "relaying game update '{}' -> '{}' in room '{}'",
                player_id,
                peer_id,
                room_id
            );
            notify(peer, Message::GameUpdate(payload));
        }
    }

    fn restart_game(&self, player_id: &PlayerId) {
        let mut registry = self.registry();
        let Some(room_id) = self.room_of(&registry, player_id) else {
            self.reject(&registry, player_id, &LobbyError::NotInRoom);
            return;
        };
        let Some(room) = registry.rooms.get_mut(&room_id) else {
            self.reject(&registry, player_id, &LobbyError::RoomNotFound);
            return;
        };
        let Some(guest_id) = room.guest.clone() else {
            self.reject_message(
                &registry,
                player_id,
                "Cannot restart: waiting for another player to join",
            );
            return;
        };

        room.host_ready = false;
        room.guest_ready = false;
        room.game_in_progress = false;
        let host_id = room.host.clone();

        let (Some(host), Some(guest)) = (
            registry.players.get(&host_id),
            registry.players.get(&guest_id),
        ) else {
            self.reject_message(&registry, player_id, "Cannot restart: player disconnected");
            return;
        };
        let requested_by = registry
            .players
            .get(player_id)
            .map(|p| p.name.clone())
            .unwrap_or_default();
        let restart = GameRestart {
            requested_by: requested_by.clone(),
            host_name: host.name.clone(),
            guest_name: guest.name.clone(),
        };
        notify(host, Message::GameRestart(restart.clone()));
        notify(guest, Message::GameRestart(restart));
        tracing::info!("game restarted in room '{}' by '{}'", room_id, requested_by);
    }

    fn room_of(&self, registry: &Registry, player_id: &PlayerId) -> Option<RoomId> {
        registry.players.get(player_id).and_then(|p| p.room.clone())
    }

    fn reject(&self, registry: &Registry, player_id: &PlayerId, error: &LobbyError) {
        self.reject_message(registry, player_id, &error.to_string());
    }

    fn reject_message(&self, registry: &Registry, player_id: &PlayerId, message: &str) {
        if let Some(player) = registry.players.get(player_id) {
            tracing::debug!("rejecting request from '{}': {}", player_id, message);
            notify(
                player,
                Message::Error(ErrorPayload {
                    message: message.to_string(),
                }),
            );
        }
    }

    /// Snapshot of a room's current state, if it exists
    pub fn room(&self, room_id: &RoomId) -> Option<Room> {
        self.registry().rooms.get(room_id).cloned()
    }

    /// Room currently occupied by a player, if any
    pub fn room_of_player(&self, player_id: &PlayerId) -> Option<RoomId> {
        let registry = self.registry();
        self.room_of(&registry, player_id)
    }

    /// Number of connected players
    pub fn player_count(&self) -> usize {
        self.registry().players.len()
    }

    /// Number of active rooms
    pub fn room_count(&self) -> usize {
        self.registry().rooms.len()
    }
}

/// Send to a connection handle; a closed handle drops the message without
/// panicking
fn notify(entry: &PlayerEntry, message: Message) {
    if entry.handle.send(message).is_err() {
        tracing::debug!("handle for player '{}' closed, message dropped", entry.id);
    }
}
