//! In-process transport wiring clients straight into a coordinator
//!
//! Frames still cross the link as serialized JSON, so the full protocol
//! path is exercised; only the socket is missing. The transport can refuse
//! new links and sever open ones to simulate network failure.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use super::{OpenFuture, Transport, TransportEvent, TransportLink};
use crate::coordinator::Coordinator;
use crate::error::LobbyError;
use crate::protocol::Message;

/// One open loopback link, kept so the transport can sever it later
struct LinkControl {
    in_tx: flume::Sender<TransportEvent>,
    kill_tx: flume::Sender<()>,
}

/// Test transport: every opened link attaches to the same [`Coordinator`]
pub struct LoopbackTransport {
    coordinator: Arc<Coordinator>,
    refuse: AtomicBool,
    links: Mutex<Vec<LinkControl>>,
}

impl LoopbackTransport {
    pub fn new(coordinator: Arc<Coordinator>) -> Self {
        Self {
            coordinator,
            refuse: AtomicBool::new(false),
            links: Mutex::new(Vec::new()),
        }
    }

    /// Make subsequent `open` calls fail, as an unreachable server would
    pub fn set_refuse(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::SeqCst);
    }

    /// Drop every open link, as a network partition would: each client sees
    /// `Closed` and the coordinator sees the players disconnect
    pub fn sever_all(&self) {
        let links = {
            let mut guard = self.links.lock().unwrap_or_else(|e| e.into_inner());
            std::mem::take(&mut *guard)
        };
        for link in links {
            let _ = link.kill_tx.send(());
            let _ = link.in_tx.send(TransportEvent::Closed);
        }
    }
}

impl Transport for LoopbackTransport {
    fn open(&self, _url: &str) -> OpenFuture<'_> {
        Box::pin(async move {
            if self.refuse.load(Ordering::SeqCst) {
                return Err(LobbyError::Transport("connection refused".to_string()));
            }

            let (to_client_tx, to_client_rx) = flume::unbounded::<Message>();
            let player_id = self.coordinator.attach(to_client_tx);

            let (out_tx, out_rx) = flume::unbounded::<String>();
            let (in_tx, in_rx) = flume::unbounded::<TransportEvent>();
            let (kill_tx, kill_rx) = flume::unbounded::<()>();

            self.links
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(LinkControl {
                    in_tx: in_tx.clone(),
                    kill_tx,
                });

            // Server -> client: coordinator messages become frames
            let downstream = in_tx.clone();
            tokio::spawn(async move {
                while let Ok(message) = to_client_rx.recv_async().await {
                    match message.encode() {
                        Ok(frame) => {
                            if downstream.send(TransportEvent::Frame(frame)).is_err() {
                                break;
                            }
                        }
                        Err(e) => tracing::error!("loopback failed to encode message: {}", e),
                    }
                }
                let _ = downstream.send(TransportEvent::Closed);
            });

            // Client -> server: frames are decoded and fed to the
            // coordinator; link death detaches the player
            let coordinator = self.coordinator.clone();
            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        frame = out_rx.recv_async() => match frame {
                            Ok(frame) => match Message::decode(&frame) {
                                Ok(message) => coordinator.handle_message(&player_id, message),
                                Err(e) => {
                                    tracing::warn!("loopback received malformed frame: {}", e);
                                }
                            },
                            Err(_) => break,
                        },
                        _ = kill_rx.recv_async() => break,
                    }
                }
                coordinator.detach(&player_id);
            });

            Ok(TransportLink {
                outbound: out_tx,
                inbound: in_rx,
            })
        })
    }
}
