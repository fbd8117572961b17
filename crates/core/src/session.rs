// Serialized session mutation
//
// Native callbacks may arrive on any thread, including synchronously from
// inside a native call the driver is making while it holds the session lock.
// Callbacks are therefore posted to a queue and drained by whichever thread
// owns the lock. Notifications are staged in an outbox while the lock is held,
// so the outbox order is the mutation order. One thread at a time delivers the
// outbox to observers, after the session lock is released, so observers may
// call back into the player.

use crate::callback::{CallbackEvent, CallbackManager};
use parking_lot::Mutex;
use std::collections::VecDeque;

/// Session state driven by a backend's native events
pub trait SessionState: Send {
    type Event: Send;

    /// Apply one native event
    fn handle_event(&mut self, event: Self::Event);

    /// Notifications produced since the last call
    fn take_notifications(&mut self) -> Vec<CallbackEvent>;
}

pub struct SessionCell<S: SessionState> {
    state: Mutex<S>,
    queue: Mutex<VecDeque<S::Event>>,
    outbox: Mutex<VecDeque<CallbackEvent>>,
    // Held by the thread currently delivering the outbox
    dispatching: Mutex<()>,
    callbacks: CallbackManager,
}

impl<S: SessionState> SessionCell<S> {
    pub fn new(state: S) -> Self {
        Self {
            state: Mutex::new(state),
            queue: Mutex::new(VecDeque::new()),
            outbox: Mutex::new(VecDeque::new()),
            dispatching: Mutex::new(()),
            callbacks: CallbackManager::new(),
        }
    }

    pub fn callbacks(&self) -> &CallbackManager {
        &self.callbacks
    }

    /// Run `f` with exclusive access to the session, then apply any native
    /// events that arrived meanwhile and dispatch the resulting notifications
    pub fn with<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        let result = {
            let mut state = self.state.lock();
            let result = f(&mut state);
            self.drain(&mut state);
            self.stage(&mut state);
            result
        };
        self.pump();
        self.flush();
        result
    }

    /// Queue a native event. It is applied immediately when the session is
    /// free, otherwise by the thread currently holding it.
    pub fn post(&self, event: S::Event) {
        self.queue.lock().push_back(event);
        self.pump();
        self.flush();
    }

    fn drain(&self, state: &mut S) {
        loop {
            let next = self.queue.lock().pop_front();
            match next {
                Some(event) => state.handle_event(event),
                None => break,
            }
        }
    }

    // Must be called with the session locked
    fn stage(&self, state: &mut S) {
        let notifications = state.take_notifications();
        if !notifications.is_empty() {
            self.outbox.lock().extend(notifications);
        }
    }

    fn pump(&self) {
        while !self.queue.lock().is_empty() {
            let Some(mut state) = self.state.try_lock() else {
                // The holder drains the queue before it releases the lock
                return;
            };
            self.drain(&mut state);
            self.stage(&mut state);
        }
    }

    fn flush(&self) {
        loop {
            // Never deliver under the session lock; its holder flushes after release
            if self.state.is_locked() {
                return;
            }
            {
                let Some(_dispatching) = self.dispatching.try_lock() else {
                    // The dispatching thread delivers what we staged
                    return;
                };
                loop {
                    let next = self.outbox.lock().pop_front();
                    match next {
                        Some(event) => self.callbacks.dispatch_event(event),
                        None => break,
                    }
                }
            }
            // Staged after the last pop but before the release
            if self.outbox.lock().is_empty() {
                break;
            }
        }
    }
}
