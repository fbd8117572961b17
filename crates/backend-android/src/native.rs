// Native MediaPlayer boundary
// Mirrors the subset of android.media.MediaPlayer the driver uses. Times are in
// milliseconds here and converted to seconds by the driver.

use duet_core::{NativeMetadataItem, Result};
use std::sync::Arc;

/// Listener registered on a native player.
/// Calls may arrive on any thread.
pub trait MediaPlayerListener: Send + Sync {
    fn on_prepared(&self);

    fn on_completion(&self);

    /// Returns true when the error was handled
    fn on_error(&self, what: i32, extra: i32) -> bool;

    /// Returns true when the info was handled
    fn on_info(&self, what: i32, extra: i32) -> bool;

    fn on_seek_complete(&self);

    fn on_buffering_update(&self, percent: i32);
}

/// A single native player instance
pub trait MediaPlayerHandle: Send {
    /// Route output through the music stream
    fn set_audio_stream_type_music(&mut self) -> Result<()>;

    fn set_data_source(&mut self, uri: &str) -> Result<()>;

    /// Begin asynchronous preparation; completion arrives via on_prepared
    fn prepare_async(&mut self) -> Result<()>;

    fn start(&mut self) -> Result<()>;

    fn pause(&mut self) -> Result<()>;

    fn stop(&mut self) -> Result<()>;

    /// Asynchronous; completion arrives via on_seek_complete
    fn seek_to(&mut self, position_ms: i32) -> Result<()>;

    fn get_duration_ms(&self) -> Result<i32>;

    fn get_current_position_ms(&self) -> Result<i32>;

    fn set_volume(&mut self, left: f32, right: f32) -> Result<()>;

    /// Register or detach (None) the listener for every callback
    fn set_listener(&mut self, listener: Option<Arc<dyn MediaPlayerListener>>);

    /// Metadata of the loaded media, if the platform exposes any
    fn metadata(&self) -> Vec<NativeMetadataItem> {
        Vec::new()
    }

    /// Free the native resources. The handle is unusable afterwards.
    fn release(&mut self);
}

/// Creates native players, one per session
pub trait MediaPlayerFactory: Send + Sync {
    fn create(&self) -> Result<Box<dyn MediaPlayerHandle>>;
}
