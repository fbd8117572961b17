// Native AVPlayer boundary
// Mirrors the subset of AVPlayer / AVPlayerItem / AVAudioSession the driver
// uses. Unlike MediaPlayer, AVPlayer reports its own status, so the native
// side pushes status changes through an observer.

use duet_core::{AudioError, NativeMetadataItem, Result};
use std::sync::Arc;

/// AVPlayerItem.status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemStatus {
    Unknown,
    ReadyToPlay,
    Failed,
}

/// AVPlayer.timeControlStatus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeControlStatus {
    Paused,
    WaitingToPlayAtSpecifiedRate,
    Playing,
}

/// Key-path observer for the current item and its player.
/// Calls may arrive on any thread.
pub trait AvPlayerObserver: Send + Sync {
    fn on_item_status(&self, status: ItemStatus);

    fn on_time_control_status(&self, status: TimeControlStatus);

    /// Completion of a `seek_to`; `finished` is false when a newer seek interrupted it
    fn on_seek_finished(&self, finished: bool);

    /// AVPlayerItemDidPlayToEndTime
    fn on_played_to_end(&self);

    /// The asset's metadata changed
    fn on_metadata_changed(&self);

    /// The item has no seekable time ranges
    fn on_not_seekable(&self);
}

pub trait AvPlayerHandle: Send {
    /// Swap the current item in place. `None` clears it.
    fn replace_current_item(&mut self, uri: Option<&str>) -> Result<()>;

    /// Observe the current item (status, metadata, end, seeks) and the player's time control status
    fn add_item_observer(&mut self, observer: Arc<dyn AvPlayerObserver>);

    fn remove_item_observer(&mut self);

    fn play(&mut self);

    fn pause(&mut self);

    /// Asynchronous; completion arrives via on_seek_finished
    fn seek_to(&mut self, seconds: f64) -> Result<()>;

    /// Seconds; NaN while indefinite
    fn current_time(&self) -> f64;

    /// Seconds of the current item; NaN while indefinite
    fn duration(&self) -> f64;

    fn rate(&self) -> f64;

    fn set_rate(&mut self, rate: f64);

    fn volume(&self) -> f64;

    fn set_volume(&mut self, volume: f64);

    fn time_control_status(&self) -> TimeControlStatus;

    /// Error of the current item once its status is Failed
    fn item_error(&self) -> Option<AudioError>;

    fn metadata(&self) -> Vec<NativeMetadataItem>;
}

/// Creates a native player with `uri` as its first item
pub trait AvPlayerFactory: Send + Sync {
    fn create(&self, uri: &str) -> Result<Box<dyn AvPlayerHandle>>;
}

/// Host audio session (AVAudioSession with the playback category)
pub trait AudioSession: Send + Sync {
    fn activate(&self) -> Result<()>;

    fn deactivate(&self) -> Result<()>;
}

/// Audio session for hosts that manage it themselves
pub struct NoopAudioSession;

impl AudioSession for NoopAudioSession {
    fn activate(&self) -> Result<()> {
        Ok(())
    }

    fn deactivate(&self) -> Result<()> {
        Ok(())
    }
}
