// Core audio player trait
// Both backend drivers implement this with identical semantics. Every method
// is safe to call in any state: calls that make no sense in the current state
// are silent no-ops, and native failures surface only as ExternalState::Errored.

use crate::callback::{CallbackId, PlayerCallback};
use crate::metadata::Metadata;
use crate::state::ExternalState;
use std::sync::Arc;

/// Backend-dependent feature availability
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// The loaded media accepts position changes
    pub can_seek: bool,
    /// Playback speed can be changed
    pub can_set_speed: bool,
    /// Volume is read back from the native player rather than cached
    pub can_read_volume: bool,
}

pub trait AudioPlayer: Send + Sync {
    /// Load and prepare audio from a URI (local file, remote file or stream).
    /// Any loaded media is stopped first.
    fn load_audio(&self, uri: &str, autoplay: bool);

    /// Start or resume playback
    fn play(&self);

    /// Pause playback and cancel a pending autoplay
    fn pause(&self);

    /// Same as play
    fn resume(&self) {
        self.play();
    }

    /// Pause and rewind to the start, keeping the media loaded
    fn stop(&self);

    /// Stop playback and release the native player
    fn unload(&self);

    fn get_state(&self) -> ExternalState;

    /// Duration in seconds, or -1 when not known in the current state
    fn get_duration(&self) -> f64;

    /// Position in seconds, or -1 when not known in the current state
    fn get_position(&self) -> f64;

    fn set_position(&self, seconds: f64);

    fn seek_to(&self, seconds: f64) {
        self.set_position(seconds);
    }

    fn get_position_update_frequency(&self) -> f64;

    fn set_position_update_frequency(&self, seconds: f64);

    fn can_set_speed(&self) -> bool {
        self.capabilities().can_set_speed
    }

    /// Playback speed, 1.0 being normal
    fn get_speed(&self) -> f64;

    fn set_speed(&self, speed: f64);

    // Stored only, playback does not loop
    fn get_loop_count(&self) -> i32;
    fn set_loop_count(&self, count: i32);
    fn get_loop_count_goal(&self) -> i32;
    fn set_loop_count_goal(&self, count: i32);

    /// Volume between 0.0 and 1.0
    fn get_volume(&self) -> f64;

    fn set_volume(&self, volume: f64);

    /// Native metadata overlaid with the external metadata
    fn get_combined_metadata(&self) -> Metadata;

    /// Replace the external metadata and announce the recombined result
    fn set_external_metadata(&self, metadata: Metadata);

    fn capabilities(&self) -> Capabilities;

    fn add_callback(&self, callback: Arc<dyn PlayerCallback>) -> CallbackId;

    fn remove_callback(&self, id: CallbackId) -> bool;
}

/// Inert loop counters shared by both drivers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopCounters {
    pub count: i32,
    pub goal: i32,
}
