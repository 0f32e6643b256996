//! Transport abstraction consumed by the connection manager
//!
//! A transport turns a URL into a [`TransportLink`]: a pair of channels
//! carrying raw text frames. The production implementation is
//! [`WsTransport`]; [`LoopbackTransport`] wires a client straight into an
//! in-process [`Coordinator`](crate::Coordinator) so session flows can be
//! tested without sockets.

mod loopback;
mod ws;

use std::future::Future;
use std::pin::Pin;

use crate::error::Result;

pub use loopback::LoopbackTransport;
pub use ws::WsTransport;

/// Inbound side of a link
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// One text frame arrived
    Frame(String),
    /// The peer or the network closed the link; no further frames follow
    Closed,
}

/// An open duplex link
///
/// Dropping `outbound` closes the link from our side; the pump tasks behind
/// it tear the stream down. Sending after the link died fails with a channel
/// error rather than panicking.
pub struct TransportLink {
    /// Raw frames to write to the stream
    pub outbound: flume::Sender<String>,
    /// Frames read from the stream, terminated by [`TransportEvent::Closed`]
    pub inbound: flume::Receiver<TransportEvent>,
}

/// Boxed future returned by [`Transport::open`]
pub type OpenFuture<'a> = Pin<Box<dyn Future<Output = Result<TransportLink>> + Send + 'a>>;

/// Factory for duplex links
pub trait Transport: Send + Sync + 'static {
    /// Open a new link to the given URL
    fn open(&self, url: &str) -> OpenFuture<'_>;
}
