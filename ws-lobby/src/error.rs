/// Error types for the ws-lobby library
use thiserror::Error;

/// Result type alias for lobby operations
pub type Result<T> = std::result::Result<T, LobbyError>;

/// Errors that can occur in lobby operations
///
/// Validation failures (`RoomNotFound` .. `WaitingForPeer`) are never fatal:
/// the coordinator turns them into an `error` envelope for the offending
/// connection and carries on. Their `Display` strings are the exact messages
/// put on the wire.
#[derive(Debug, Error)]
pub enum LobbyError {
    /// No room exists with the requested code
    #[error("Room not found")]
    RoomNotFound,

    /// Room already has a live guest
    #[error("Room is full")]
    RoomFull,

    /// A host tried to join its own room as guest
    #[error("You are already the host of this room")]
    AlreadyHost,

    /// Operation requires room membership
    #[error("You are not in a room")]
    NotInRoom,

    /// Operation requires a guest to be present
    #[error("Waiting for another player to join")]
    WaitingForPeer,

    /// Send attempted while the transport is closed
    #[error("Transport is not open")]
    TransportUnavailable,

    /// Client-local join timeout elapsed; never a protocol error
    #[error("Join request timed out")]
    JoinTimedOut,

    /// Message violates the wire protocol (bad envelope, local-only kind)
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Transport-level failure (handshake, socket teardown)
    #[error("Transport error: {0}")]
    Transport(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
