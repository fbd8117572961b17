// Shared state reconciliation
//
// Both drivers translate their native callbacks into lifecycle transitions and
// override signals on a Reconciler. It makes no native calls: it tracks the
// lifecycle, derives the external state from it, applies the seek/buffer,
// autoplay and error rules, and queues the resulting notifications.

use crate::callback::CallbackEvent;
use crate::state::{ExternalState, InternalLifecycle};

#[derive(Debug)]
pub struct Reconciler {
    lifecycle: InternalLifecycle,
    state: ExternalState,
    should_autoplay: bool,
    seekable: bool,
    pending: Vec<CallbackEvent>,
}

impl Reconciler {
    pub fn new() -> Self {
        Self {
            lifecycle: InternalLifecycle::Idle,
            state: ExternalState::Unloaded,
            should_autoplay: false,
            seekable: true,
            pending: Vec::new(),
        }
    }

    pub fn lifecycle(&self) -> InternalLifecycle {
        self.lifecycle
    }

    pub fn state(&self) -> ExternalState {
        self.state
    }

    pub fn is_seekable(&self) -> bool {
        self.seekable
    }

    pub fn should_autoplay(&self) -> bool {
        self.should_autoplay
    }

    pub fn is_in(&self, states: &[InternalLifecycle]) -> bool {
        self.lifecycle.is_any_of(states)
    }

    /// Start a new session. Loading is always announced, even when already loading.
    pub fn begin_load(&mut self, autoplay: bool) {
        self.should_autoplay = autoplay;
        self.seekable = true;
        self.lifecycle = InternalLifecycle::Idle;

        let old_state = self.state;
        self.state = ExternalState::Loading;
        log::debug!("State {:?} -> {:?} (load)", old_state, self.state);
        self.pending.push(CallbackEvent::StateChanged {
            old_state,
            new_state: ExternalState::Loading,
        });
    }

    /// Record a lifecycle step without re-deriving the external state.
    /// Used while an override (load, seek, pending start) pins the state.
    pub fn track(&mut self, lifecycle: InternalLifecycle) {
        if self.lifecycle == InternalLifecycle::Error {
            log::debug!("Ignoring lifecycle {:?} after error", lifecycle);
            return;
        }
        self.lifecycle = lifecycle;
    }

    /// Move to a new lifecycle and project it onto the external state.
    /// Returns false when the transition was ignored because the session errored.
    pub fn advance(&mut self, lifecycle: InternalLifecycle) -> bool {
        if self.lifecycle == InternalLifecycle::Error && lifecycle != InternalLifecycle::Error {
            log::debug!("Ignoring lifecycle {:?} after error", lifecycle);
            return false;
        }
        self.lifecycle = lifecycle;
        self.set_state(lifecycle.project());
        true
    }

    /// Native prepare finished. Returns true when a pending autoplay must start playback now.
    pub fn prepared(&mut self, duration: f64) -> bool {
        if !self.advance(InternalLifecycle::Prepared) {
            return false;
        }
        self.pending.push(CallbackEvent::DurationChanged { duration });
        self.take_autoplay()
    }

    /// Force Loading while a seek, buffering stall or start confirmation is outstanding
    pub fn begin_transient(&mut self) {
        if self.lifecycle == InternalLifecycle::Error {
            return;
        }
        self.set_state(ExternalState::Loading);
    }

    /// Re-derive the state after a transient override, unless something else
    /// (an error, a completion) replaced Loading in the meantime
    pub fn resync(&mut self) {
        if self.state == ExternalState::Loading {
            self.set_state(self.lifecycle.project());
        }
    }

    pub fn mark_not_seekable(&mut self) {
        if self.seekable {
            log::info!("Media reported as not seekable");
        }
        self.seekable = false;
    }

    pub fn request_autoplay(&mut self) {
        self.should_autoplay = true;
    }

    pub fn clear_autoplay(&mut self) {
        self.should_autoplay = false;
    }

    fn take_autoplay(&mut self) -> bool {
        std::mem::take(&mut self.should_autoplay)
    }

    /// Native error: terminal until the next load
    pub fn fail(&mut self) {
        self.lifecycle = InternalLifecycle::Error;
        self.set_state(ExternalState::Errored);
    }

    /// Session destroyed
    pub fn reset(&mut self) {
        self.lifecycle = InternalLifecycle::Ended;
        self.should_autoplay = false;
        self.seekable = true;
        self.set_state(ExternalState::Unloaded);
    }

    /// Queue a non-state notification (position, metadata)
    pub fn notify(&mut self, event: CallbackEvent) {
        self.pending.push(event);
    }

    pub fn take_notifications(&mut self) -> Vec<CallbackEvent> {
        std::mem::take(&mut self.pending)
    }

    fn set_state(&mut self, new_state: ExternalState) {
        if new_state == self.state {
            return;
        }
        let old_state = self.state;
        self.state = new_state;
        log::debug!("State {:?} -> {:?} (lifecycle {:?})", old_state, new_state, self.lifecycle);
        self.pending.push(CallbackEvent::StateChanged {
            old_state,
            new_state,
        });
    }
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new()
    }
}
