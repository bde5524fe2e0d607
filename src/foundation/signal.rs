//! Strongly typed publish/subscribe signals.
//!
//! Every connection returns a [`SubscriptionToken`] which must be handed back to
//! [`Signal::disconnect`]. [`Subscriptions`] collects tokens for a component so all of them can
//! be released together when an account session ends.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

type Handler<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct SignalInner<T> {
    next_id: AtomicU64,
    handlers: Mutex<Vec<(u64, Handler<T>)>>,
}

/// Cloneable handle to a shared list of handlers. Clones emit to the same handlers.
pub struct Signal<T> {
    inner: Arc<SignalInner<T>>,
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for Signal<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("handlers", &self.handler_count())
            .finish()
    }
}

/// Opaque receipt for one connected handler.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionToken(u64);

impl<T> Signal<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SignalInner {
                next_id: AtomicU64::new(0),
                handlers: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Connect `handler`; it runs synchronously on every [`Signal::emit`].
    pub fn connect<F>(&self, handler: F) -> SubscriptionToken
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.handlers().push((id, Arc::new(handler)));
        SubscriptionToken(id)
    }

    /// Remove the handler behind `token`. Returns `false` if it was already gone.
    pub fn disconnect(&self, token: SubscriptionToken) -> bool {
        let mut handlers = self.handlers();
        let before = handlers.len();
        handlers.retain(|(id, _)| *id != token.0);
        handlers.len() != before
    }

    /// Invoke every connected handler with `value`.
    ///
    /// Handlers are snapshotted first, so a handler may connect or disconnect re-entrantly.
    pub fn emit(&self, value: &T) {
        let snapshot: Vec<Handler<T>> = self
            .handlers()
            .iter()
            .map(|(_, h)| Arc::clone(h))
            .collect();
        for handler in snapshot {
            handler(value);
        }
    }

    pub fn handler_count(&self) -> usize {
        self.handlers().len()
    }

    fn handlers(&self) -> std::sync::MutexGuard<'_, Vec<(u64, Handler<T>)>> {
        self.inner
            .handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Tokens held by one component, released together.
#[derive(Default)]
pub struct Subscriptions {
    disconnectors: Vec<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscriptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connect `handler` to `signal` and remember the token.
    pub fn connect<T, F>(&mut self, signal: &Signal<T>, handler: F)
    where
        T: 'static,
        F: Fn(&T) + Send + Sync + 'static,
    {
        let token = signal.connect(handler);
        let signal = signal.clone();
        self.disconnectors.push(Box::new(move || {
            signal.disconnect(token);
        }));
    }

    pub fn len(&self) -> usize {
        self.disconnectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.disconnectors.is_empty()
    }

    pub fn disconnect_all(&mut self) {
        for disconnect in self.disconnectors.drain(..) {
            disconnect();
        }
    }
}

impl Drop for Subscriptions {
    fn drop(&mut self) {
        self.disconnect_all();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/signal.rs"]
mod tests;
