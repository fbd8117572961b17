// Android backend for Duet
// Drives a MediaPlayer-style native player whose lifecycle must be tracked by the caller

pub mod codes;
pub mod native;
pub mod player;

#[cfg(feature = "jni")]
pub mod jni_bindings;

#[cfg(any(test, feature = "test-support"))]
pub mod fake;

pub use native::{MediaPlayerFactory, MediaPlayerHandle, MediaPlayerListener};
pub use player::{AndroidAudioPlayer, MediaPlayerEvent};

#[cfg(feature = "jni")]
pub use jni_bindings::{JniMediaPlayer, JniMediaPlayerFactory};
