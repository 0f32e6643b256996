//! Inbound message handler registry
//!
//! Registrations are identified by id and removed through the
//! [`Subscription`] returned at registration time, so removing one handler
//! can never unhook another.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use crate::protocol::Message;

type Callback = Arc<dyn Fn(&Message) + Send + Sync>;

struct HandlerEntry {
    id: u64,
    /// Envelope kind this handler wants, or `None` for every message
    filter: Option<String>,
    callback: Callback,
}

#[derive(Default)]
pub(crate) struct HandlerRegistry {
    next_id: AtomicU64,
    entries: Mutex<Vec<HandlerEntry>>,
}

impl HandlerRegistry {
    pub(crate) fn register(
        self: &Arc<Self>,
        filter: Option<String>,
        callback: impl Fn(&Message) + Send + Sync + 'static,
    ) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(HandlerEntry {
                id,
                filter,
                callback: Arc::new(callback),
            });
        Subscription {
            id,
            registry: Arc::downgrade(self),
        }
    }

    fn remove(&self, id: u64) {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .retain(|entry| entry.id != id);
    }

    /// Invoke matching handlers in registration order: kind-specific first,
    /// then catch-alls. A panicking handler is logged and skipped; the rest
    /// still run.
    pub(crate) fn dispatch(&self, message: &Message) {
        let kind = message.kind();
        let (typed, wildcard): (Vec<Callback>, Vec<Callback>) = {
            let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
            let typed = entries
                .iter()
                .filter(|e| e.filter.as_deref() == Some(kind))
                .map(|e| e.callback.clone())
                .collect();
            let wildcard = entries
                .iter()
                .filter(|e| e.filter.is_none())
                .map(|e| e.callback.clone())
                .collect();
            (typed, wildcard)
        };
        for callback in typed.into_iter().chain(wildcard) {
            if catch_unwind(AssertUnwindSafe(|| callback(message))).is_err() {
                tracing::error!("handler for '{}' panicked, continuing dispatch", kind);
            }
        }
    }
}

/// Handle to one handler registration; dropping or closing it removes
/// exactly that handler
#[must_use = "dropping a subscription removes its handler"]
pub struct Subscription {
    id: u64,
    registry: Weak<HandlerRegistry>,
}

impl Subscription {
    /// Remove the registration now
    pub fn close(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn ready_message() -> Message {
        Message::PlayerReady
    }

    #[test]
    fn test_dispatch_order_and_filtering() {
        let registry = Arc::new(HandlerRegistry::default());
        let log = Arc::new(Mutex::new(Vec::new()));

        let l1 = log.clone();
        let _a = registry.register(Some("player-ready".to_string()), move |_| {
            l1.lock().unwrap().push("typed-1");
        });
        let l2 = log.clone();
        let _b = registry.register(None, move |_| {
            l2.lock().unwrap().push("wildcard");
        });
        let l3 = log.clone();
        let _c = registry.register(Some("player-ready".to_string()), move |_| {
            l3.lock().unwrap().push("typed-2");
        });
        let l4 = log.clone();
        let _d = registry.register(Some("game-start".to_string()), move |_| {
            l4.lock().unwrap().push("other-kind");
        });

        registry.dispatch(&ready_message());
        assert_eq!(*log.lock().unwrap(), vec!["typed-1", "typed-2", "wildcard"]);
    }

    #[test]
    fn test_subscription_close_removes_only_itself() {
        let registry = Arc::new(HandlerRegistry::default());
        let hits = Arc::new(AtomicUsize::new(0));

        let h1 = hits.clone();
        let first = registry.register(None, move |_| {
            h1.fetch_add(1, Ordering::SeqCst);
        });
        let h2 = hits.clone();
        let _second = registry.register(None, move |_| {
            h2.fetch_add(10, Ordering::SeqCst);
        });

        first.close();
        registry.dispatch(&ready_message());
        assert_eq!(hits.load(Ordering::SeqCst), 10);
    }

    #[test]
    fn test_panicking_handler_is_isolated() {
        let registry = Arc::new(HandlerRegistry::default());
        let hits = Arc::new(AtomicUsize::new(0));

        let _bad = registry.register(None, |_| panic!("observer bug"));
        let h = hits.clone();
        let _good = registry.register(None, move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        });

        registry.dispatch(&ready_message());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
