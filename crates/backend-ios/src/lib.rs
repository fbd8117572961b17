// iOS backend for Duet
// Drives an AVPlayer-style native player that reports its own status

pub mod native;
pub mod player;

#[cfg(any(test, feature = "test-support"))]
pub mod fake;

pub use native::{
    AudioSession, AvPlayerFactory, AvPlayerHandle, AvPlayerObserver, ItemStatus,
    NoopAudioSession, TimeControlStatus,
};
pub use player::{AvPlayerEvent, IosAudioPlayer};
