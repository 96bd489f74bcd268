//! One-shot readiness barrier.
//!
//! Any number of callers can ask to be notified once some shared
//! resource (a player API, a backend connection) has loaded. The first
//! subscriber is told to start the load. Every subscriber runs exactly
//! once, in registration order, when the barrier resolves. Subscribers
//! that arrive after resolution run immediately.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;

type Callback<T> = Box<dyn FnOnce(&T) + Send>;

enum State<T> {
    Idle,
    Loading(Vec<Callback<T>>),
    Ready(T),
}

/// Shared barrier; clones observe the same state.
pub struct ReadyBarrier<T> {
    state: Arc<Mutex<State<T>>>,
    ready_tx: Arc<watch::Sender<bool>>,
}

impl<T> Clone for ReadyBarrier<T> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            ready_tx: self.ready_tx.clone(),
        }
    }
}

impl<T: Clone + Send + 'static> Default for ReadyBarrier<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + 'static> ReadyBarrier<T> {
    pub fn new() -> Self {
        let (ready_tx, _) = watch::channel(false);
        Self {
            state: Arc::new(Mutex::new(State::Idle)),
            ready_tx: Arc::new(ready_tx),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register `callback`.
    ///
    /// Returns `true` for the first subscriber, which is responsible
    /// for starting the load and eventually calling [`resolve`](Self::resolve).
    pub fn subscribe(&self, callback: impl FnOnce(&T) + Send + 'static) -> bool {
        let mut state = self.lock();
        if matches!(*state, State::Idle) {
            *state = State::Loading(vec![Box::new(callback)]);
            return true;
        }
        let value = match &mut *state {
            State::Loading(pending) => {
                pending.push(Box::new(callback));
                return false;
            }
            State::Ready(value) => value.clone(),
            State::Idle => return false,
        };
        drop(state);
        callback(&value);
        false
    }

    /// Mark the barrier ready and run every pending subscriber.
    ///
    /// Only the first call has any effect; returns whether it was this one.
    pub fn resolve(&self, value: T) -> bool {
        let pending = {
            let mut state = self.lock();
            if matches!(*state, State::Ready(_)) {
                return false;
            }
            match std::mem::replace(&mut *state, State::Ready(value.clone())) {
                State::Loading(pending) => pending,
                _ => Vec::new(),
            }
        };
        tracing::debug!(subscribers = pending.len(), "Ready barrier resolved");
        for callback in pending {
            callback(&value);
        }
        self.ready_tx.send_replace(true);
        true
    }

    pub fn is_ready(&self) -> bool {
        matches!(*self.lock(), State::Ready(_))
    }

    /// The resolved value, if any.
    pub fn get(&self) -> Option<T> {
        match &*self.lock() {
            State::Ready(value) => Some(value.clone()),
            _ => None,
        }
    }

    /// Wait until the barrier resolves.
    pub async fn wait(&self) -> T {
        let mut rx = self.ready_tx.subscribe();
        loop {
            if let Some(value) = self.get() {
                return value;
            }
            // The sender is owned by `self`, so this cannot fail.
            let _ = rx.changed().await;
        }
    }
}
