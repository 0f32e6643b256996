//! Wire protocol for the lobby
//!
//! Every frame on the duplex stream is a JSON envelope
//! `{"type": "<kebab-case kind>", "data": {...}}`. The [`Message`] enum is
//! the closed catalogue of known kinds; anything else decodes into
//! [`Message::Unknown`] so an older client never tears down a connection.
//!
//! `join-timeout` is special: it is synthesized locally by the connection
//! manager when a join request goes unanswered, and is never put on the wire.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{LobbyError, Result};
use crate::types::{PlayerId, RoomId};

/// Which seat of a room a player occupies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Seat {
    /// Room creator; the room lives and dies with this connection
    Host,
    /// Second occupant; the seat may be vacated and re-filled
    Guest,
}

impl std::fmt::Display for Seat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Seat::Host => write!(f, "host"),
            Seat::Guest => write!(f, "guest"),
        }
    }
}

/// `connected` payload - first message on every accepted connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connected {
    pub id: PlayerId,
}

/// `set-name` payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetName {
    pub name: String,
}

/// `room-created` payload - sent to the creator only
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomCreated {
    pub room_id: RoomId,
    pub name: String,
}

/// `join-room` payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRoom {
    pub room_id: RoomId,
}

/// `room-joined` payload - sent to the joining guest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomJoined {
    pub room_id: RoomId,
    pub host: String,
    pub host_id: PlayerId,
}

/// `player-joined` payload - sent to the host when a guest arrives
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerJoined {
    pub guest: String,
    pub guest_id: PlayerId,
}

/// `ready-acknowledged` payload - echoed to the player who readied up
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadyAcknowledged {
    pub success: bool,
    pub host_ready: bool,
    pub guest_ready: bool,
}

/// `player-ready-update` payload - sent to the peer of the player who readied up
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerReadyUpdate {
    pub player: Seat,
    pub ready: bool,
    pub host_ready: bool,
    pub guest_ready: bool,
}

/// `game-start` payload - sent to both occupants in one transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStart {
    pub host_name: String,
    pub guest_name: String,
    pub is_host: bool,
}

/// `game-restart` payload - sent to both occupants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameRestart {
    pub requested_by: String,
    pub host_name: String,
    pub guest_name: String,
}

/// `player-left` payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerLeft {
    pub message: String,
}

/// `error` payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    pub message: String,
}

/// `join-timeout` payload - client-local synthetic event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinTimeout {
    pub room_id: RoomId,
}

/// A protocol message, one variant per envelope kind
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// S→C on accept
    Connected(Connected),
    /// C→S
    SetName(SetName),
    /// C→S
    CreateRoom,
    /// S→C, to the creator
    RoomCreated(RoomCreated),
    /// C→S
    JoinRoom(JoinRoom),
    /// S→C, to the joining guest
    RoomJoined(RoomJoined),
    /// S→C, to the host
    PlayerJoined(PlayerJoined),
    /// C→S
    PlayerReady,
    /// S→C, to the requester
    ReadyAcknowledged(ReadyAcknowledged),
    /// S→C, to the peer
    PlayerReadyUpdate(PlayerReadyUpdate),
    /// S→C, to both occupants
    GameStart(GameStart),
    /// Opaque relay, bidirectional; the coordinator never interprets it
    GameUpdate(Value),
    /// C→S
    RestartGame,
    /// S→C, to both occupants
    GameRestart(GameRestart),
    /// S→C
    PlayerLeft(PlayerLeft),
    /// S→C, validation failure for the offending connection only
    Error(ErrorPayload),
    /// Client-local synthetic event, never sent over the wire
    JoinTimeout(JoinTimeout),
    /// Fallback for kinds outside the catalogue
    Unknown {
        /// The unrecognized `type` field
        kind: String,
        /// The payload, preserved verbatim
        data: Value,
    },
}

/// Raw `{type, data}` envelope used as the (de)serialization pivot
#[derive(Debug, Serialize, Deserialize)]
struct RawEnvelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Value,
}

impl Message {
    /// The envelope `type` string for this message
    pub fn kind(&self) -> &str {
        match self {
            Message::Connected(_) => "connected",
            Message::SetName(_) => "set-name",
            Message::CreateRoom => "create-room",
            Message::RoomCreated(_) => "room-created",
            Message::JoinRoom(_) => "join-room",
            Message::RoomJoined(_) => "room-joined",
            Message::PlayerJoined(_) => "player-joined",
            Message::PlayerReady => "player-ready",
            Message::ReadyAcknowledged(_) => "ready-acknowledged",
            Message::PlayerReadyUpdate(_) => "player-ready-update",
            Message::GameStart(_) => "game-start",
            Message::GameUpdate(_) => "game-update",
            Message::RestartGame => "restart-game",
            Message::GameRestart(_) => "game-restart",
            Message::PlayerLeft(_) => "player-left",
            Message::Error(_) => "error",
            Message::JoinTimeout(_) => "join-timeout",
            Message::Unknown { kind, .. } => kind,
        }
    }

    /// Serialize into a JSON text frame
    ///
    /// Fails for [`Message::JoinTimeout`], which exists only for local
    /// handler dispatch.
    pub fn encode(&self) -> Result<String> {
        let data = match self {
            Message::Connected(p) => serde_json::to_value(p)?,
            Message::SetName(p) => serde_json::to_value(p)?,
            Message::CreateRoom => Value::Object(Default::default()),
            Message::RoomCreated(p) => serde_json::to_value(p)?,
            Message::JoinRoom(p) => serde_json::to_value(p)?,
            Message::RoomJoined(p) => serde_json::to_value(p)?,
            Message::PlayerJoined(p) => serde_json::to_value(p)?,
            Message::PlayerReady => Value::Object(Default::default()),
            Message::ReadyAcknowledged(p) => serde_json::to_value(p)?,
            Message::PlayerReadyUpdate(p) => serde_json::to_value(p)?,
            Message::GameStart(p) => serde_json::to_value(p)?,
            Message::GameUpdate(v) => v.clone(),
            Message::RestartGame => Value::Object(Default::default()),
            Message::GameRestart(p) => serde_json::to_value(p)?,
            Message::PlayerLeft(p) => serde_json::to_value(p)?,
            Message::Error(p) => serde_json::to_value(p)?,
            Message::JoinTimeout(_) => {
                return Err(LobbyError::Protocol(
                    "join-timeout is a client-local event".to_string(),
                ));
            }
            Message::Unknown { data, .. } => data.clone(),
        };
        let envelope = RawEnvelope {
            kind: self.kind().to_string(),
            data,
        };
        Ok(serde_json::to_string(&envelope)?)
    }

    /// Parse a JSON text frame into a message
    ///
    /// A missing `data` field is treated as an empty object. A `type`
    /// outside the catalogue yields [`Message::Unknown`] rather than an error.
    pub fn decode(frame: &str) -> Result<Message> {
        let envelope: RawEnvelope = serde_json::from_str(frame)?;
        let data = match envelope.data {
            Value::Null => Value::Object(Default::default()),
            other => other,
        };
        let message = match envelope.kind.as_str() {
            "connected" => Message::Connected(serde_json::from_value(data)?),
            "set-name" => Message::SetName(serde_json::from_value(data)?),
            "create-room" => Message::CreateRoom,
            "room-created" => Message::RoomCreated(serde_json::from_value(data)?),
            "join-room" => Message::JoinRoom(serde_json::from_value(data)?),
            "room-joined" => Message::RoomJoined(serde_json::from_value(data)?),
            "player-joined" => Message::PlayerJoined(serde_json::from_value(data)?),
            "player-ready" => Message::PlayerReady,
            "ready-acknowledged" => Message::ReadyAcknowledged(serde_json::from_value(data)?),
            "player-ready-update" => Message::PlayerReadyUpdate(serde_json::from_value(data)?),
            "game-start" => Message::GameStart(serde_json::from_value(data)?),
            "game-update" => Message::GameUpdate(data),
            "restart-game" => Message::RestartGame,
            "game-restart" => Message::GameRestart(serde_json::from_value(data)?),
            "player-left" => Message::PlayerLeft(serde_json::from_value(data)?),
            "error" => Message::Error(serde_json::from_value(data)?),
            // Inbound join-timeout would have to come off the wire, which
            // nothing legitimately does; treat it as unknown
            _ => Message::Unknown {
                kind: envelope.kind,
                data,
            },
        };
        Ok(message)
    }
}
