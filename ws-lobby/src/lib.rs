//! # ws-lobby
//!
//! A matchmaking and session-synchronization layer for two-player
//! real-time games, built on WebSockets.
//!
//! ## Overview
//!
//! Two halves cooperate over a JSON envelope protocol:
//!
//! - The [`Coordinator`] is the server-side authority: it registers
//!   players, runs the two-seat room lifecycle (create, join, ready,
//!   start, restart, leave), and relays opaque game-state updates between
//!   a room's occupants.
//! - The [`ConnectionManager`] is the client side: it keeps one persistent
//!   connection alive through transient failures (fixed-delay reconnect,
//!   join replay), maintains a local [`SessionMirror`] of the session
//!   flags, and fans inbound messages out to registered handlers.
//!
//! The game itself - rendering, physics, input - sits on top and only
//! talks to the [`ConnectionManager`].
//!
//! ## Key Features
//!
//! - Two-seat rooms with host-owned lifecycle and guest rejoin-after-drop
//! - Atomic both-ready → game-start transition
//! - Opaque game-update relay between room occupants
//! - Automatic reconnect with pending-join replay
//! - Client-local join timeout events
//! - Pluggable transport; an in-process loopback makes full session flows
//!   testable without sockets
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use ws_lobby::{ClientConfig, ConnectionManager, Coordinator, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Server side
//!     let coordinator = Arc::new(Coordinator::new());
//!     tokio::spawn(ws_lobby::serve(ServerConfig::default(), coordinator));
//!
//!     // Client side
//!     let manager = ConnectionManager::websocket(ClientConfig::default());
//!     if manager.connect().await {
//!         manager.set_player_name("Alice");
//!         manager.create_room();
//!     }
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod client;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod protocol;
pub mod server;
pub mod transport;
pub mod types;

// Re-exports for convenience
pub use client::{ConnectionManager, SessionMirror, Subscription};
pub use config::{ClientConfig, ServerConfig};
pub use coordinator::{Coordinator, Room};
pub use error::{LobbyError, Result};
pub use protocol::{Message, Seat};
pub use server::serve;
pub use transport::{LoopbackTransport, Transport, TransportEvent, TransportLink, WsTransport};
pub use types::{PlayerId, RoomId};
