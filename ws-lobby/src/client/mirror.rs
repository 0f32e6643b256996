//! Local mirror of session state
//!
//! The connection manager applies every inbound message to the mirror
//! before fanning out to handlers, so a handler reading the mirror always
//! sees state consistent with the message it was handed.

use crate::protocol::Message;
use crate::types::{PlayerId, RoomId};

/// Client-side copy of the session flags the coordinator holds for us
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionMirror {
    /// Our id, assigned by the coordinator on accept
    pub player_id: Option<PlayerId>,
    /// Name we last submitted
    pub player_name: Option<String>,
    /// Whether we hold the host seat of our room
    pub is_host: bool,
    /// Room we occupy, if any
    pub room_id: Option<RoomId>,
    /// Display name of the other occupant
    pub peer_name: Option<String>,
    pub host_ready: bool,
    pub guest_ready: bool,
    /// Transport link is open
    pub connected: bool,
    /// Room we last asked to join; replayed after a reconnect
    pub pending_join_room_id: Option<RoomId>,
}

impl SessionMirror {
    /// Fold one inbound message into the mirror
    pub(crate) fn apply(&mut self, message: &Message) {
        match message {
            Message::Connected(p) => {
                self.player_id = Some(p.id.clone());
            }
            Message::RoomCreated(p) => {
                self.room_id = Some(p.room_id.clone());
                self.is_host = true;
                self.peer_name = None;
                self.host_ready = false;
                self.guest_ready = false;
            }
            Message::RoomJoined(p) => {
                self.room_id = Some(p.room_id.clone());
                self.is_host = false;
                self.peer_name = Some(p.host.clone());
                self.host_ready = false;
                self.guest_ready = false;
                self.pending_join_room_id = Some(p.room_id.clone());
            }
            Message::PlayerJoined(p) => {
                self.peer_name = Some(p.guest.clone());
            }
            Message::ReadyAcknowledged(p) => {
                self.host_ready = p.host_ready;
                self.guest_ready = p.guest_ready;
            }
            Message::PlayerReadyUpdate(p) => {
                self.host_ready = p.host_ready;
                self.guest_ready = p.guest_ready;
            }
            Message::GameStart(p) => {
                self.is_host = p.is_host;
                self.peer_name = Some(if p.is_host {
                    p.guest_name.clone()
                } else {
                    p.host_name.clone()
                });
            }
            Message::PlayerLeft(_) => {
                self.peer_name = None;
                self.host_ready = false;
                self.guest_ready = false;
                // A guest cannot survive host loss; the room is gone
                if !self.is_host {
                    self.room_id = None;
                    self.pending_join_room_id = None;
                }
            }
            Message::GameRestart(_) => {
                self.host_ready = false;
                self.guest_ready = false;
            }
            _ => {}
        }
    }

    /// Back to initial values; used on explicit disconnect
    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }
}
