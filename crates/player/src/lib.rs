// Duet audio player
// One AudioPlayer contract over two native backends: a lifecycle-tracked
// MediaPlayer (Android) and a status-tracked AVPlayer (iOS)

use duet_backend_android::{AndroidAudioPlayer, MediaPlayerFactory};
use duet_backend_ios::{AudioSession, AvPlayerFactory, IosAudioPlayer};
use duet_core::poller::poll_interval;
use std::sync::{Arc, Once};

// Re-exports
pub use duet_core::{
    AudioError, AudioPlayer, CallbackEvent, CallbackId, Capabilities, ExternalState, Metadata,
    MetadataValue, PlayerCallback, PlayerConfig, Result,
};

pub mod android {
    pub use duet_backend_android::*;
}

pub mod ios {
    pub use duet_backend_ios::*;
}

static INIT_LOGGER: Once = Once::new();

/// Native player to drive
#[derive(Clone)]
pub enum NativeBackend {
    /// MediaPlayer; the driver tracks the native lifecycle itself
    Android(Arc<dyn MediaPlayerFactory>),
    /// AVPlayer; the native player reports its own status
    Ios {
        factory: Arc<dyn AvPlayerFactory>,
        audio_session: Arc<dyn AudioSession>,
    },
}

impl NativeBackend {
    pub fn name(&self) -> &'static str {
        match self {
            NativeBackend::Android(_) => "android",
            NativeBackend::Ios { .. } => "ios",
        }
    }
}

// Initialize logging based on platform
pub fn init_logging(config: &PlayerConfig) {
    INIT_LOGGER.call_once(|| {
        #[cfg(target_os = "android")]
        {
            android_logger::init_once(
                android_logger::Config::default()
                    .with_max_level(config.log_level)
                    .with_tag(config.log_tag.clone()),
            );
        }

        #[cfg(not(target_os = "android"))]
        {
            let _ = env_logger::builder()
                .is_test(false)
                .filter_level(config.log_level)
                .try_init();
        }
    });
}

/// Create a player over the given native backend
pub fn create_player(backend: NativeBackend, config: &PlayerConfig) -> Result<Box<dyn AudioPlayer>> {
    init_logging(config);

    if poll_interval(config.position_update_frequency_secs).is_none() {
        return Err(AudioError::InitializationError(format!(
            "Invalid position update frequency: {}",
            config.position_update_frequency_secs
        )));
    }

    log::info!("Creating {} audio player", backend.name());
    match backend {
        NativeBackend::Android(factory) => Ok(Box::new(AndroidAudioPlayer::new(factory, config))),
        NativeBackend::Ios {
            factory,
            audio_session,
        } => Ok(Box::new(IosAudioPlayer::new(factory, audio_session, config))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duet_backend_android::fake::FakeMediaPlayerFactory;
    use duet_backend_ios::fake::FakeAvPlayerFactory;
    use duet_backend_ios::NoopAudioSession;

    #[test]
    fn test_player_creation() {
        let android = create_player(
            NativeBackend::Android(Arc::new(FakeMediaPlayerFactory::new())),
            &PlayerConfig::default(),
        );
        assert!(android.is_ok());

        let ios = create_player(
            NativeBackend::Ios {
                factory: Arc::new(FakeAvPlayerFactory::new()),
                audio_session: Arc::new(NoopAudioSession),
            },
            &PlayerConfig::default(),
        );
        let ios = ios.unwrap();
        assert_eq!(ios.get_state(), ExternalState::Unloaded);
        assert!(ios.capabilities().can_set_speed);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = PlayerConfig::default();
        config.position_update_frequency_secs = 0.0;

        let result = create_player(
            NativeBackend::Android(Arc::new(FakeMediaPlayerFactory::new())),
            &config,
        );
        assert!(matches!(result, Err(AudioError::InitializationError(_))));
    }

    #[test]
    fn test_init_logging_is_idempotent() {
        let config = PlayerConfig::default();
        init_logging(&config);
        init_logging(&config);
    }
}
