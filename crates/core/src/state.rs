// Externally visible player state and the backend-private lifecycle it is projected from

use std::fmt;

/// The only state observers see
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExternalState {
    /// No media loaded
    Unloaded,
    /// Media is preparing, seeking, buffering or waiting to start
    Loading,
    /// Media is ready to play from the current position
    Loaded,
    /// Media is playing
    Playing,
    /// Media is paused mid-stream
    Paused,
    /// The native player reported an error; only a new load recovers
    Errored,
}

impl Default for ExternalState {
    fn default() -> Self {
        ExternalState::Unloaded
    }
}

impl fmt::Display for ExternalState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            ExternalState::Unloaded => "unloaded",
            ExternalState::Loading => "loading",
            ExternalState::Loaded => "loaded",
            ExternalState::Playing => "playing",
            ExternalState::Paused => "paused",
            ExternalState::Errored => "errored",
        };
        f.write_str(name)
    }
}

/// Fine-grained native lifecycle, modelled on the MediaPlayer state diagram
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InternalLifecycle {
    Idle,
    Initialized,
    Preparing,
    Prepared,
    Started,
    Paused,
    PlaybackCompleted,
    Stopped,
    Ended,
    Error,
}

impl Default for InternalLifecycle {
    fn default() -> Self {
        InternalLifecycle::Idle
    }
}

impl InternalLifecycle {
    /// Every lifecycle value, in declaration order
    pub const ALL: [InternalLifecycle; 10] = [
        InternalLifecycle::Idle,
        InternalLifecycle::Initialized,
        InternalLifecycle::Preparing,
        InternalLifecycle::Prepared,
        InternalLifecycle::Started,
        InternalLifecycle::Paused,
        InternalLifecycle::PlaybackCompleted,
        InternalLifecycle::Stopped,
        InternalLifecycle::Ended,
        InternalLifecycle::Error,
    ];

    /// States from which a start may be issued
    pub const STARTABLE: &'static [InternalLifecycle] = &[
        InternalLifecycle::Prepared,
        InternalLifecycle::Started,
        InternalLifecycle::Paused,
        InternalLifecycle::PlaybackCompleted,
    ];

    /// States from which a pause may be issued
    pub const PAUSABLE: &'static [InternalLifecycle] =
        &[InternalLifecycle::Started, InternalLifecycle::Paused];

    /// States in which a seek may be issued
    pub const SEEKABLE: &'static [InternalLifecycle] = Self::STARTABLE;

    /// States in which duration and position are meaningful:
    /// prepared or later, and not yet ended
    pub const TIMED: &'static [InternalLifecycle] = &[
        InternalLifecycle::Prepared,
        InternalLifecycle::Started,
        InternalLifecycle::Paused,
        InternalLifecycle::Stopped,
        InternalLifecycle::PlaybackCompleted,
    ];

    /// States in which the native volume may be set
    pub const VOLUME_SETTABLE: &'static [InternalLifecycle] = &[
        InternalLifecycle::Idle,
        InternalLifecycle::Initialized,
        InternalLifecycle::Prepared,
        InternalLifecycle::Started,
        InternalLifecycle::Paused,
        InternalLifecycle::Stopped,
        InternalLifecycle::PlaybackCompleted,
    ];

    pub fn is_any_of(self, states: &[InternalLifecycle]) -> bool {
        states.contains(&self)
    }

    /// Project the lifecycle onto the external state machine
    pub fn project(self) -> ExternalState {
        match self {
            InternalLifecycle::Idle
            | InternalLifecycle::Initialized
            | InternalLifecycle::Stopped
            | InternalLifecycle::Ended => ExternalState::Unloaded,
            InternalLifecycle::Preparing => ExternalState::Loading,
            InternalLifecycle::Prepared | InternalLifecycle::PlaybackCompleted => {
                ExternalState::Loaded
            }
            InternalLifecycle::Started => ExternalState::Playing,
            InternalLifecycle::Paused => ExternalState::Paused,
            InternalLifecycle::Error => ExternalState::Errored,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_projection_table() {
        use ExternalState as E;
        use InternalLifecycle as L;

        let expected = [
            (L::Idle, E::Unloaded),
            (L::Initialized, E::Unloaded),
            (L::Preparing, E::Loading),
            (L::Prepared, E::Loaded),
            (L::Started, E::Playing),
            (L::Paused, E::Paused),
            (L::PlaybackCompleted, E::Loaded),
            (L::Stopped, E::Unloaded),
            (L::Ended, E::Unloaded),
            (L::Error, E::Errored),
        ];
        for (lifecycle, state) in expected {
            assert_eq!(lifecycle.project(), state, "{:?}", lifecycle);
        }
    }

    #[test]
    fn test_timed_states_exclude_unprepared_and_ended() {
        assert!(!InternalLifecycle::Idle.is_any_of(InternalLifecycle::TIMED));
        assert!(!InternalLifecycle::Preparing.is_any_of(InternalLifecycle::TIMED));
        assert!(!InternalLifecycle::Ended.is_any_of(InternalLifecycle::TIMED));
        assert!(!InternalLifecycle::Error.is_any_of(InternalLifecycle::TIMED));
        assert!(InternalLifecycle::PlaybackCompleted.is_any_of(InternalLifecycle::TIMED));
    }
}
