//! WebSocket front end for the coordinator
//!
//! One task per accepted connection: the upgrade is checked against the
//! configured path, the player is attached to the coordinator, a writer
//! task drains the player's outbound channel into the socket, and the read
//! loop feeds decoded frames back in. Stream end or error detaches the
//! player, which is what drives the room-lifecycle disconnect semantics.

use std::net::SocketAddr;
use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::Message as WsMessage;

use crate::config::ServerConfig;
use crate::coordinator::Coordinator;
use crate::error::Result;
use crate::protocol::Message;

/// Bind and serve forever
pub async fn serve(config: ServerConfig, coordinator: Arc<Coordinator>) -> Result<()> {
    let listener = TcpListener::bind(&config.bind_addr).await?;
    tracing::info!(
        "lobby listening on {} (path '{}')",
        config.bind_addr,
        config.ws_path
    );
    loop {
        let (stream, addr) = listener.accept().await?;
        let ws_path = config.ws_path.clone();
        let coordinator = coordinator.clone();
        tokio::spawn(async move {
            handle_connection(stream, addr, ws_path, coordinator).await;
        });
    }
}

async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    ws_path: String,
    coordinator: Arc<Coordinator>,
) {
    // Only upgrade requests for our path; the port may carry other services
    let check_path = |request: &Request, response: Response| {
        if request.uri().path() == ws_path {
            Ok(response)
        } else {
            tracing::debug!(
                "rejected upgrade for '{}' from {}",
                request.uri().path(),
                addr
            );
            let mut rejection = ErrorResponse::new(Some("no such endpoint".to_string()));
            *rejection.status_mut() = StatusCode::NOT_FOUND;
            Err(rejection)
        }
    };
    let websocket = match accept_hdr_async(stream, check_path).await {
        Ok(websocket) => websocket,
        Err(e) => {
            tracing::debug!("handshake with {} failed: {}", addr, e);
            return;
        }
    };

    let (mut sink, mut source) = websocket.split();
    let (tx, rx) = flume::unbounded::<Message>();
    let player_id = coordinator.attach(tx);
    tracing::debug!("player '{}' is {}", player_id, addr);

    let writer_id = player_id.clone();
    let writer = tokio::spawn(async move {
        while let Ok(message) = rx.recv_async().await {
            let frame = match message.encode() {
                Ok(frame) => frame,
                Err(e) => {
                    tracing::error!("failed to encode message for '{}': {}", writer_id, e);
                    continue;
                }
            };
            if sink.send(WsMessage::Text(frame.into())).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });

    while let Some(item) = source.next().await {
        match item {
            Ok(WsMessage::Text(text)) => match Message::decode(text.as_str()) {
                Ok(message) => coordinator.handle_message(&player_id, message),
                Err(e) => {
                    tracing::warn!("player '{}' sent malformed frame: {}", player_id, e);
                }
            },
            Ok(WsMessage::Close(_)) => break,
            Ok(_) => {
                // Ping/pong answered by tungstenite; binary frames ignored
            }
            Err(e) => {
                tracing::debug!("read from '{}' failed: {}", player_id, e);
                break;
            }
        }
    }

    // Detach drops the outbound handle, so the writer drains and exits;
    // abort covers a sink wedged on a dead peer
    coordinator.detach(&player_id);
    writer.abort();
}
