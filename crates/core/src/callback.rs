// Observer mechanism for player notifications
// Events are queued while the session lock is held and dispatched after it is released

use crate::metadata::Metadata;
use crate::state::ExternalState;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Player notifications
#[derive(Debug, Clone, PartialEq)]
pub enum CallbackEvent {
    /// External state changed
    StateChanged {
        old_state: ExternalState,
        new_state: ExternalState,
    },

    /// Periodic position update while playing, in seconds
    PositionChanged { position: f64 },

    /// Duration became known after a successful prepare, in seconds
    DurationChanged { duration: f64 },

    /// Combined metadata changed
    MetadataChanged { metadata: Metadata },
}

/// Player callback trait
/// Implementations should be lightweight and non-blocking
pub trait PlayerCallback: Send + Sync {
    /// Called when an event occurs
    fn on_event(&self, event: CallbackEvent);
}

/// Handle returned by [`CallbackManager::add_callback`], used to detach an observer
pub type CallbackId = u64;

/// Callback manager for handling multiple observers
pub struct CallbackManager {
    callbacks: Mutex<Vec<(CallbackId, Arc<dyn PlayerCallback>)>>,
    next_id: AtomicU64,
}

impl CallbackManager {
    pub fn new() -> Self {
        Self {
            callbacks: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn add_callback(&self, callback: Arc<dyn PlayerCallback>) -> CallbackId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.callbacks.lock().push((id, callback));
        id
    }

    pub fn remove_callback(&self, id: CallbackId) -> bool {
        let mut callbacks = self.callbacks.lock();
        let before = callbacks.len();
        callbacks.retain(|(existing, _)| *existing != id);
        callbacks.len() != before
    }

    pub fn clear_callbacks(&self) {
        self.callbacks.lock().clear();
    }

    pub fn dispatch_event(&self, event: CallbackEvent) {
        // Snapshot so observers may add or remove callbacks from inside on_event
        let callbacks: Vec<Arc<dyn PlayerCallback>> = self
            .callbacks
            .lock()
            .iter()
            .map(|(_, callback)| callback.clone())
            .collect();

        for callback in callbacks {
            callback.on_event(event.clone());
        }
    }

    pub fn dispatch_all(&self, events: Vec<CallbackEvent>) {
        for event in events {
            self.dispatch_event(event);
        }
    }
}

impl Default for CallbackManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Recording callback for tests
#[cfg(any(test, feature = "test-support"))]
pub struct TestCallback {
    events: Mutex<Vec<CallbackEvent>>,
}

#[cfg(any(test, feature = "test-support"))]
impl TestCallback {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn get_events(&self) -> Vec<CallbackEvent> {
        self.events.lock().clone()
    }

    /// New states, in the order they were announced
    pub fn states(&self) -> Vec<ExternalState> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                CallbackEvent::StateChanged { new_state, .. } => Some(*new_state),
                _ => None,
            })
            .collect()
    }

    pub fn positions(&self) -> Vec<f64> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                CallbackEvent::PositionChanged { position } => Some(*position),
                _ => None,
            })
            .collect()
    }

    pub fn durations(&self) -> Vec<f64> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                CallbackEvent::DurationChanged { duration } => Some(*duration),
                _ => None,
            })
            .collect()
    }

    pub fn metadata_events(&self) -> Vec<Metadata> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                CallbackEvent::MetadataChanged { metadata } => Some(metadata.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

#[cfg(any(test, feature = "test-support"))]
impl Default for TestCallback {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "test-support"))]
impl PlayerCallback for TestCallback {
    fn on_event(&self, event: CallbackEvent) {
        self.events.lock().push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_reaches_every_callback() {
        let manager = CallbackManager::new();
        let first = Arc::new(TestCallback::new());
        let second = Arc::new(TestCallback::new());
        manager.add_callback(first.clone());
        manager.add_callback(second.clone());

        manager.dispatch_event(CallbackEvent::PositionChanged { position: 1.5 });

        assert_eq!(first.positions(), vec![1.5]);
        assert_eq!(second.positions(), vec![1.5]);
    }

    #[test]
    fn test_removed_callback_is_not_called() {
        let manager = CallbackManager::new();
        let callback = Arc::new(TestCallback::new());
        let id = manager.add_callback(callback.clone());

        assert!(manager.remove_callback(id));
        assert!(!manager.remove_callback(id));

        manager.dispatch_event(CallbackEvent::DurationChanged { duration: 3.0 });
        assert!(callback.get_events().is_empty());
    }

    struct SelfRemoving {
        manager: Arc<CallbackManager>,
        id: Mutex<Option<CallbackId>>,
        calls: Mutex<u32>,
    }

    impl PlayerCallback for SelfRemoving {
        fn on_event(&self, _event: CallbackEvent) {
            *self.calls.lock() += 1;
            if let Some(id) = self.id.lock().take() {
                self.manager.remove_callback(id);
            }
        }
    }

    #[test]
    fn test_callback_can_detach_itself_during_dispatch() {
        let manager = Arc::new(CallbackManager::new());
        let callback = Arc::new(SelfRemoving {
            manager: manager.clone(),
            id: Mutex::new(None),
            calls: Mutex::new(0),
        });
        let id = manager.add_callback(callback.clone());
        *callback.id.lock() = Some(id);

        manager.dispatch_event(CallbackEvent::PositionChanged { position: 0.0 });
        manager.dispatch_event(CallbackEvent::PositionChanged { position: 1.0 });

        assert_eq!(*callback.calls.lock(), 1);
    }
}
