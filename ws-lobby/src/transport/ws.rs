//! WebSocket transport backed by tokio-tungstenite

use futures::{SinkExt, StreamExt};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;

use super::{OpenFuture, Transport, TransportEvent, TransportLink};
use crate::error::LobbyError;

/// Production transport: one WebSocket connection per link
#[derive(Debug, Default)]
pub struct WsTransport;

impl WsTransport {
    pub fn new() -> Self {
        Self
    }
}

impl Transport for WsTransport {
    fn open(&self, url: &str) -> OpenFuture<'_> {
        let url = url.to_string();
        Box::pin(async move {
            let (stream, _response) = connect_async(url.as_str())
                .await
                .map_err(|e| LobbyError::Transport(e.to_string()))?;
            tracing::debug!("websocket open to {}", url);
            let (mut sink, mut source) = stream.split();

            let (out_tx, out_rx) = flume::unbounded::<String>();
            let (in_tx, in_rx) = flume::unbounded::<TransportEvent>();

            // Writer: drain outbound frames into the socket; the channel
            // closing (link dropped) closes the socket
            tokio::spawn(async move {
                while let Ok(frame) = out_rx.recv_async().await {
                    if let Err(e) = sink.send(WsMessage::Text(frame.into())).await {
                        tracing::debug!("websocket write failed: {}", e);
                        break;
                    }
                }
                let _ = sink.close().await;
            });

            // Reader: forward text frames, terminate with Closed
            tokio::spawn(async move {
                loop {
                    match source.next().await {
                        Some(Ok(WsMessage::Text(text))) => {
                            if in_tx.send(TransportEvent::Frame(text.to_string())).is_err() {
                                break;
                            }
                        }
                        Some(Ok(WsMessage::Close(_))) | None => break,
                        Some(Ok(_)) => {
                            // Ping/pong handled by tungstenite; binary ignored
                        }
                        Some(Err(e)) => {
                            tracing::debug!("websocket read failed: {}", e);
                            break;
                        }
                    }
                }
                let _ = in_tx.send(TransportEvent::Closed);
            });

            Ok(TransportLink {
                outbound: out_tx,
                inbound: in_rx,
            })
        })
    }
}
