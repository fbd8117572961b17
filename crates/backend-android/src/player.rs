// Android audio player driving a MediaPlayer-style native handle
// MediaPlayer has no state query, so the driver tracks the native lifecycle
// itself and gates every native call on it.

use crate::codes::{
    media_error_name, media_info_name, MEDIA_INFO_BUFFERING_END, MEDIA_INFO_BUFFERING_START,
    MEDIA_INFO_METADATA_UPDATE, MEDIA_INFO_NOT_SEEKABLE,
};
use crate::native::{MediaPlayerFactory, MediaPlayerHandle, MediaPlayerListener};
use duet_core::metadata::combine;
use duet_core::poller::poll_interval;
use duet_core::{
    AudioError, AudioPlayer, CallbackEvent, CallbackId, Capabilities, ExternalState,
    InternalLifecycle, LoopCounters, Metadata, PlayerCallback, PlayerConfig, PositionPoller,
    Reconciler, SessionCell, SessionState,
};
use std::sync::{Arc, Weak};

/// Callback reported by the native player
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaPlayerEvent {
    Prepared,
    Completion,
    Error { what: i32, extra: i32 },
    Info { what: i32, extra: i32 },
    SeekComplete,
    BufferingUpdate { percent: i32 },
}

#[derive(Debug)]
pub enum AndroidEvent {
    /// Native callback tagged with the session that registered the listener
    Native { session: u64, event: MediaPlayerEvent },
    PositionTick { generation: u64 },
}

/// Listener handed to the native player. Holds the driver weakly so a
/// callback racing the player's destruction is dropped.
struct SessionListener {
    owner: Weak<SessionCell<AndroidSession>>,
    session: u64,
}

impl SessionListener {
    fn forward(&self, event: MediaPlayerEvent) {
        match self.owner.upgrade() {
            Some(cell) => cell.post(AndroidEvent::Native {
                session: self.session,
                event,
            }),
            None => log::trace!("Dropping {:?}: player is gone", event),
        }
    }
}

impl MediaPlayerListener for SessionListener {
    fn on_prepared(&self) {
        self.forward(MediaPlayerEvent::Prepared);
    }

    fn on_completion(&self) {
        self.forward(MediaPlayerEvent::Completion);
    }

    fn on_error(&self, what: i32, extra: i32) -> bool {
        self.forward(MediaPlayerEvent::Error { what, extra });
        true
    }

    fn on_info(&self, what: i32, extra: i32) -> bool {
        self.forward(MediaPlayerEvent::Info { what, extra });
        true
    }

    fn on_seek_complete(&self) {
        self.forward(MediaPlayerEvent::SeekComplete);
    }

    fn on_buffering_update(&self, percent: i32) {
        self.forward(MediaPlayerEvent::BufferingUpdate { percent });
    }
}

pub struct AndroidSession {
    factory: Arc<dyn MediaPlayerFactory>,
    owner: Weak<SessionCell<AndroidSession>>,
    handle: Option<Box<dyn MediaPlayerHandle>>,
    session_id: u64,
    reconciler: Reconciler,
    poller: Option<PositionPoller>,
    position_update_frequency: f64,
    // MediaPlayer cannot report its volume
    last_known_volume: f64,
    external_metadata: Metadata,
    loops: LoopCounters,
}

impl AndroidSession {
    fn new(
        factory: Arc<dyn MediaPlayerFactory>,
        config: &PlayerConfig,
        owner: Weak<SessionCell<AndroidSession>>,
    ) -> Self {
        Self {
            factory,
            owner,
            handle: None,
            session_id: 0,
            reconciler: Reconciler::new(),
            poller: None,
            position_update_frequency: config.position_update_frequency_secs,
            last_known_volume: 1.0,
            external_metadata: Metadata::new(),
            loops: LoopCounters::default(),
        }
    }

    fn load_audio(&mut self, uri: &str, autoplay: bool) {
        log::info!("Loading audio: {}", uri);
        self.reconciler.begin_load(autoplay);
        self.release_session();

        let handle = match self.factory.create() {
            Ok(handle) => handle,
            Err(e) => {
                self.fail(e);
                return;
            }
        };

        self.session_id += 1;
        self.handle = Some(handle);
        if let Some(handle) = self.handle.as_mut() {
            handle.set_listener(Some(Arc::new(SessionListener {
                owner: self.owner.clone(),
                session: self.session_id,
            })));
        }
        self.start_poller();

        if let Err(e) = self.open(uri) {
            self.fail(e);
        }
    }

    fn open(&mut self, uri: &str) -> duet_core::Result<()> {
        let handle = self
            .handle
            .as_mut()
            .ok_or_else(|| AudioError::InvalidState("No native player".to_string()))?;

        handle.set_audio_stream_type_music()?;
        handle.set_data_source(uri)?;
        self.reconciler.track(InternalLifecycle::Initialized);
        handle.prepare_async()?;
        self.reconciler.track(InternalLifecycle::Preparing);
        Ok(())
    }

    fn play(&mut self) {
        let Some(handle) = self.handle.as_mut() else {
            log::debug!("play() ignored: nothing loaded");
            return;
        };
        if self.reconciler.lifecycle() == InternalLifecycle::Started {
            log::debug!("play() ignored: already started");
            return;
        }
        if !self.reconciler.is_in(InternalLifecycle::STARTABLE) {
            log::debug!("play() ignored in {:?}", self.reconciler.lifecycle());
            return;
        }

        self.reconciler.begin_transient();
        match handle.start() {
            Ok(()) => {
                self.reconciler.advance(InternalLifecycle::Started);
            }
            Err(e) => self.fail(e),
        }
    }

    fn pause(&mut self) {
        self.reconciler.clear_autoplay();
        let Some(handle) = self.handle.as_mut() else {
            return;
        };
        if !self.reconciler.is_in(InternalLifecycle::PAUSABLE) {
            log::debug!("pause() ignored in {:?}", self.reconciler.lifecycle());
            return;
        }

        match handle.pause() {
            Ok(()) => {
                self.reconciler.advance(InternalLifecycle::Paused);
            }
            Err(e) => self.fail(e),
        }
    }

    fn stop(&mut self) {
        self.pause();
        self.set_position(0.0);
    }

    fn unload(&mut self) {
        if self.handle.is_none() && self.reconciler.state() == ExternalState::Unloaded {
            log::debug!("unload() ignored: nothing loaded");
            return;
        }
        log::info!("Unloading audio");
        self.release_session();
        self.reconciler.reset();
    }

    fn duration(&self) -> f64 {
        match self.handle.as_ref() {
            Some(handle) if self.reconciler.is_in(InternalLifecycle::TIMED) => {
                to_seconds(handle.get_duration_ms())
            }
            _ => -1.0,
        }
    }

    fn position(&self) -> f64 {
        match self.handle.as_ref() {
            Some(handle) if self.reconciler.is_in(InternalLifecycle::TIMED) => {
                to_seconds(handle.get_current_position_ms())
            }
            _ => -1.0,
        }
    }

    fn set_position(&mut self, seconds: f64) {
        let Some(handle) = self.handle.as_mut() else {
            return;
        };
        if !self.reconciler.is_seekable() || !self.reconciler.is_in(InternalLifecycle::SEEKABLE) {
            log::debug!("Seek to {}s ignored in {:?}", seconds, self.reconciler.lifecycle());
            return;
        }

        let millis = (seconds.max(0.0) * 1000.0).round().min(i32::MAX as f64) as i32;
        match handle.seek_to(millis) {
            Ok(()) => self.reconciler.begin_transient(),
            Err(e) => self.fail(e),
        }
    }

    fn set_position_update_frequency(&mut self, seconds: f64) {
        if poll_interval(seconds).is_none() {
            log::warn!("Ignoring invalid position update frequency: {}", seconds);
            return;
        }
        self.position_update_frequency = seconds;
        if self.handle.is_some() && self.reconciler.lifecycle() != InternalLifecycle::Error {
            self.start_poller();
        }
    }

    fn set_volume(&mut self, volume: f64) {
        let volume = if volume.is_nan() { 1.0 } else { volume.clamp(0.0, 1.0) };
        let Some(handle) = self.handle.as_mut() else {
            return;
        };
        if !self.reconciler.is_in(InternalLifecycle::VOLUME_SETTABLE) {
            log::debug!("set_volume() ignored in {:?}", self.reconciler.lifecycle());
            return;
        }

        match handle.set_volume(volume as f32, volume as f32) {
            Ok(()) => self.last_known_volume = volume,
            Err(e) => self.fail(e),
        }
    }

    fn combined_metadata(&self) -> Metadata {
        let native = self.handle.as_ref().map(|h| h.metadata()).unwrap_or_default();
        combine(&native, &self.external_metadata)
    }

    fn set_external_metadata(&mut self, metadata: Metadata) {
        self.external_metadata = metadata;
        self.notify_metadata();
    }

    fn notify_metadata(&mut self) {
        let metadata = self.combined_metadata();
        self.reconciler.notify(CallbackEvent::MetadataChanged { metadata });
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            can_seek: self.handle.is_some() && self.reconciler.is_seekable(),
            can_set_speed: false,
            can_read_volume: false,
        }
    }

    fn fail(&mut self, error: AudioError) {
        log::error!("[MediaPlayer] {}", error);
        self.stop_poller();
        self.reconciler.fail();
    }

    fn start_poller(&mut self) {
        self.stop_poller();
        let Some(interval) = poll_interval(self.position_update_frequency) else {
            return;
        };

        let owner = self.owner.clone();
        let result = PositionPoller::start(interval, move |generation| match owner.upgrade() {
            Some(cell) => {
                cell.post(AndroidEvent::PositionTick { generation });
                true
            }
            None => false,
        });
        match result {
            Ok(poller) => self.poller = Some(poller),
            Err(e) => log::error!("Position updates unavailable: {}", e),
        }
    }

    fn stop_poller(&mut self) {
        if let Some(poller) = self.poller.take() {
            poller.cancel();
        }
    }

    // Cancel polling and detach listeners before the handle is released
    fn release_session(&mut self) {
        let Some(mut handle) = self.handle.take() else {
            return;
        };
        self.stop_poller();
        handle.set_listener(None);
        if let Err(e) = handle.stop() {
            log::debug!("stop() during release failed: {}", e);
        }
        handle.release();
        self.external_metadata.clear();
        self.last_known_volume = 1.0;
    }

    fn on_native_event(&mut self, event: MediaPlayerEvent) {
        match event {
            MediaPlayerEvent::Prepared => {
                if self.reconciler.lifecycle() != InternalLifecycle::Preparing {
                    log::debug!("Ignoring prepared in {:?}", self.reconciler.lifecycle());
                    return;
                }
                let duration = self
                    .handle
                    .as_ref()
                    .map(|h| to_seconds(h.get_duration_ms()))
                    .unwrap_or(-1.0);
                log::info!("Prepared (duration {}s)", duration);
                if self.reconciler.prepared(duration) {
                    self.play();
                }
            }
            MediaPlayerEvent::Completion => {
                log::info!("Playback completed");
                self.stop();
                self.reconciler.advance(InternalLifecycle::PlaybackCompleted);
            }
            MediaPlayerEvent::Error { what, extra } => {
                self.fail(AudioError::NativeError {
                    domain: media_error_name(what).to_string(),
                    code: what as i64,
                    description: format!("extra {} ({})", extra, media_error_name(extra)),
                });
            }
            MediaPlayerEvent::Info { what, extra } => match what {
                MEDIA_INFO_BUFFERING_START => self.reconciler.begin_transient(),
                MEDIA_INFO_BUFFERING_END => self.reconciler.resync(),
                MEDIA_INFO_NOT_SEEKABLE => self.reconciler.mark_not_seekable(),
                MEDIA_INFO_METADATA_UPDATE => self.notify_metadata(),
                _ => log::debug!("[MediaPlayer] Info: {} ({})", media_info_name(what), extra),
            },
            MediaPlayerEvent::SeekComplete => self.reconciler.resync(),
            MediaPlayerEvent::BufferingUpdate { percent } => {
                log::trace!("Buffered {}%", percent);
            }
        }
    }
}

impl SessionState for AndroidSession {
    type Event = AndroidEvent;

    fn handle_event(&mut self, event: AndroidEvent) {
        match event {
            AndroidEvent::Native { session, event } => {
                if self.handle.is_none() || session != self.session_id {
                    log::debug!("Ignoring {:?} from stale session {}", event, session);
                    return;
                }
                self.on_native_event(event);
            }
            AndroidEvent::PositionTick { generation } => {
                let live = self.poller.as_ref().map(PositionPoller::generation);
                if live != Some(generation) {
                    return;
                }
                if self.reconciler.state() == ExternalState::Playing {
                    let position = self.position();
                    self.reconciler.notify(CallbackEvent::PositionChanged { position });
                }
            }
        }
    }

    fn take_notifications(&mut self) -> Vec<CallbackEvent> {
        self.reconciler.take_notifications()
    }
}

impl Drop for AndroidSession {
    fn drop(&mut self) {
        self.release_session();
    }
}

fn to_seconds(millis: duet_core::Result<i32>) -> f64 {
    match millis {
        Ok(ms) if ms >= 0 => ms as f64 / 1000.0,
        Ok(_) => -1.0,
        Err(e) => {
            log::warn!("[MediaPlayer] time query failed: {}", e);
            -1.0
        }
    }
}

/// Android audio player
pub struct AndroidAudioPlayer {
    cell: Arc<SessionCell<AndroidSession>>,
}

impl AndroidAudioPlayer {
    pub fn new(factory: Arc<dyn MediaPlayerFactory>, config: &PlayerConfig) -> Self {
        log::info!("Initializing Android audio player");
        let cell = Arc::new_cyclic(|owner| {
            SessionCell::new(AndroidSession::new(factory, config, owner.clone()))
        });
        Self { cell }
    }

    /// Current native lifecycle, for diagnostics
    pub fn lifecycle(&self) -> InternalLifecycle {
        self.cell.with(|s| s.reconciler.lifecycle())
    }
}

impl AudioPlayer for AndroidAudioPlayer {
    fn load_audio(&self, uri: &str, autoplay: bool) {
        self.cell.with(|s| s.load_audio(uri, autoplay));
    }

    fn play(&self) {
        self.cell.with(|s| s.play());
    }

    fn pause(&self) {
        self.cell.with(|s| s.pause());
    }

    fn stop(&self) {
        self.cell.with(|s| s.stop());
    }

    fn unload(&self) {
        self.cell.with(|s| s.unload());
    }

    fn get_state(&self) -> ExternalState {
        self.cell.with(|s| s.reconciler.state())
    }

    fn get_duration(&self) -> f64 {
        self.cell.with(|s| s.duration())
    }

    fn get_position(&self) -> f64 {
        self.cell.with(|s| s.position())
    }

    fn set_position(&self, seconds: f64) {
        self.cell.with(|s| s.set_position(seconds));
    }

    fn get_position_update_frequency(&self) -> f64 {
        self.cell.with(|s| s.position_update_frequency)
    }

    fn set_position_update_frequency(&self, seconds: f64) {
        self.cell.with(|s| s.set_position_update_frequency(seconds));
    }

    fn get_speed(&self) -> f64 {
        1.0
    }

    fn set_speed(&self, speed: f64) {
        log::debug!("set_speed({}) ignored: speed control unavailable", speed);
    }

    fn get_loop_count(&self) -> i32 {
        self.cell.with(|s| s.loops.count)
    }

    fn set_loop_count(&self, count: i32) {
        self.cell.with(|s| s.loops.count = count);
    }

    fn get_loop_count_goal(&self) -> i32 {
        self.cell.with(|s| s.loops.goal)
    }

    fn set_loop_count_goal(&self, count: i32) {
        self.cell.with(|s| s.loops.goal = count);
    }

    fn get_volume(&self) -> f64 {
        self.cell.with(|s| s.last_known_volume)
    }

    fn set_volume(&self, volume: f64) {
        self.cell.with(|s| s.set_volume(volume));
    }

    fn get_combined_metadata(&self) -> Metadata {
        self.cell.with(|s| s.combined_metadata())
    }

    fn set_external_metadata(&self, metadata: Metadata) {
        self.cell.with(|s| s.set_external_metadata(metadata));
    }

    fn capabilities(&self) -> Capabilities {
        self.cell.with(|s| s.capabilities())
    }

    fn add_callback(&self, callback: Arc<dyn PlayerCallback>) -> CallbackId {
        self.cell.callbacks().add_callback(callback)
    }

    fn remove_callback(&self, id: CallbackId) -> bool {
        self.cell.callbacks().remove_callback(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codes::{MEDIA_ERROR_IO, MEDIA_ERROR_UNKNOWN};
    use crate::fake::{FakeMediaPlayerControl, FakeMediaPlayerFactory};
    use duet_core::{MetadataValue, TestCallback};
    use parking_lot::Mutex;
    use std::time::Duration;
    use ExternalState as E;
    use InternalLifecycle as L;

    const URI: &str = "https://example.com/episode.mp3";

    fn setup() -> (AndroidAudioPlayer, Arc<FakeMediaPlayerFactory>, Arc<TestCallback>) {
        let factory = Arc::new(FakeMediaPlayerFactory::new().with_duration_ms(180_000));
        // Slow enough that no tick lands during a test
        let config = PlayerConfig::new().with_position_update_frequency(60.0);
        let player = AndroidAudioPlayer::new(factory.clone(), &config);
        let observer = Arc::new(TestCallback::new());
        player.add_callback(observer.clone());
        (player, factory, observer)
    }

    fn loaded() -> (AndroidAudioPlayer, Arc<FakeMediaPlayerFactory>, Arc<TestCallback>) {
        let (player, factory, observer) = setup();
        player.load_audio(URI, false);
        factory.last().prepared();
        observer.clear();
        (player, factory, observer)
    }

    #[test]
    fn test_load_prepares_native_player() {
        let (player, factory, observer) = setup();

        player.load_audio(URI, false);
        assert_eq!(player.get_state(), E::Loading);
        assert_eq!(player.lifecycle(), L::Preparing);

        let native = factory.last();
        assert_eq!(native.data_source().as_deref(), Some(URI));
        assert_eq!(
            native.calls(),
            vec!["set_listener", "set_audio_stream_type_music", "set_data_source", "prepare_async"]
        );

        native.prepared();
        assert_eq!(player.get_state(), E::Loaded);
        assert_eq!(observer.states(), vec![E::Loading, E::Loaded]);
        assert_eq!(observer.durations(), vec![180.0]);
        assert_eq!(player.get_duration(), 180.0);
    }

    #[test]
    fn test_autoplay_starts_once_prepared() {
        let (player, factory, observer) = setup();

        player.load_audio(URI, true);
        factory.last().prepared();

        assert_eq!(player.get_state(), E::Playing);
        assert_eq!(observer.states(), vec![E::Loading, E::Loaded, E::Loading, E::Playing]);
        assert!(factory.last().calls().contains(&"start".to_string()));
    }

    #[test]
    fn test_pause_before_prepared_cancels_autoplay() {
        let (player, factory, observer) = setup();

        player.load_audio(URI, true);
        player.pause();
        factory.last().prepared();

        assert_eq!(player.get_state(), E::Loaded);
        assert_eq!(observer.states(), vec![E::Loading, E::Loaded]);
    }

    #[test]
    fn test_play_pause_resume() {
        let (player, _factory, observer) = loaded();

        player.play();
        assert_eq!(player.get_state(), E::Playing);
        player.pause();
        assert_eq!(player.get_state(), E::Paused);
        player.resume();
        assert_eq!(player.get_state(), E::Playing);

        assert_eq!(
            observer.states(),
            vec![E::Loading, E::Playing, E::Paused, E::Loading, E::Playing]
        );
    }

    #[test]
    fn test_repeated_play_and_pause_are_silent() {
        let (player, _factory, observer) = loaded();

        player.play();
        player.play();
        player.pause();
        player.pause();

        assert_eq!(observer.states(), vec![E::Loading, E::Playing, E::Paused]);
    }

    #[test]
    fn test_calls_before_load_are_noops() {
        let (player, factory, observer) = setup();

        player.play();
        player.pause();
        player.stop();
        player.set_position(10.0);
        player.set_volume(0.5);
        player.unload();

        assert_eq!(player.get_state(), E::Unloaded);
        assert_eq!(player.get_duration(), -1.0);
        assert_eq!(player.get_position(), -1.0);
        assert_eq!(player.get_volume(), 1.0);
        assert_eq!(factory.created_count(), 0);
        assert!(observer.states().is_empty());
    }

    #[test]
    fn test_seek_reports_loading_until_complete() {
        let (player, factory, observer) = loaded();
        player.play();
        observer.clear();

        player.set_position(42.5);
        assert_eq!(player.get_state(), E::Loading);
        assert_eq!(factory.last().position_ms(), 42_500);

        factory.last().seek_complete();
        assert_eq!(player.get_state(), E::Playing);
        assert_eq!(observer.states(), vec![E::Loading, E::Playing]);
    }

    #[test]
    fn test_negative_seek_clamps_to_start() {
        let (player, factory, _observer) = loaded();
        factory.last().set_position_ms(5_000);

        player.set_position(-3.0);
        assert_eq!(factory.last().position_ms(), 0);
    }

    #[test]
    fn test_seek_complete_after_pause_keeps_paused() {
        let (player, factory, _observer) = loaded();
        player.play();
        player.set_position(10.0);
        player.pause();

        factory.last().seek_complete();
        assert_eq!(player.get_state(), E::Paused);
    }

    #[test]
    fn test_not_seekable_media_ignores_seeks() {
        let (player, factory, observer) = loaded();

        factory.last().info(MEDIA_INFO_NOT_SEEKABLE, 0);
        assert!(!player.capabilities().can_seek);

        player.set_position(30.0);
        assert_eq!(player.get_state(), E::Loaded);
        assert!(!factory.last().calls().contains(&"seek_to".to_string()));
        assert!(observer.states().is_empty());
    }

    #[test]
    fn test_buffering_stall_reports_loading() {
        let (player, factory, observer) = loaded();
        player.play();
        observer.clear();

        factory.last().info(MEDIA_INFO_BUFFERING_START, 0);
        assert_eq!(player.get_state(), E::Loading);
        factory.last().info(MEDIA_INFO_BUFFERING_END, 0);
        assert_eq!(player.get_state(), E::Playing);
        assert_eq!(observer.states(), vec![E::Loading, E::Playing]);
    }

    #[test]
    fn test_completion_rewinds_to_loaded() {
        let (player, factory, observer) = loaded();
        player.play();
        factory.last().set_position_ms(180_000);
        observer.clear();

        factory.last().complete();

        assert_eq!(player.get_state(), E::Loaded);
        assert_eq!(factory.last().position_ms(), 0);
        assert_eq!(observer.states(), vec![E::Paused, E::Loading, E::Loaded]);

        // A late seek completion from the implicit rewind changes nothing
        factory.last().seek_complete();
        assert_eq!(player.get_state(), E::Loaded);

        player.play();
        assert_eq!(player.get_state(), E::Playing);
    }

    #[test]
    fn test_native_error_is_terminal_until_reload() {
        let (player, factory, observer) = loaded();
        player.play();
        observer.clear();

        factory.last().error(MEDIA_ERROR_UNKNOWN, MEDIA_ERROR_IO);
        assert_eq!(player.get_state(), E::Errored);

        factory.last().seek_complete();
        factory.last().info(MEDIA_INFO_BUFFERING_END, 0);
        player.play();
        player.pause();
        assert_eq!(player.get_state(), E::Errored);
        assert_eq!(observer.states(), vec![E::Errored]);

        player.load_audio(URI, false);
        factory.last().prepared();
        assert_eq!(player.get_state(), E::Loaded);
    }

    #[test]
    fn test_data_source_failure_errors() {
        let (player, factory, observer) = setup();
        factory.fail_next_data_source();

        player.load_audio("file:///missing.mp3", true);

        assert_eq!(player.get_state(), E::Errored);
        assert_eq!(observer.states(), vec![E::Loading, E::Errored]);
        assert!(!factory.last().calls().contains(&"prepare_async".to_string()));
    }

    #[test]
    fn test_unload_releases_and_resets() {
        let (player, factory, observer) = loaded();
        player.set_volume(0.3);
        player.set_external_metadata(Metadata::from([(
            "title".to_string(),
            MetadataValue::from("Pilot"),
        )]));
        observer.clear();

        player.unload();

        let native = factory.last();
        assert!(native.is_released());
        assert!(!native.has_listener());
        assert_eq!(player.get_state(), E::Unloaded);
        assert_eq!(player.get_volume(), 1.0);
        assert!(player.get_combined_metadata().is_empty());
        assert_eq!(observer.states(), vec![E::Unloaded]);
    }

    #[test]
    fn test_reload_releases_previous_session() {
        let (player, factory, observer) = loaded();
        let first = factory.last();

        player.load_audio("https://example.com/next.mp3", false);

        assert!(first.is_released());
        assert_eq!(factory.created_count(), 2);
        assert_eq!(observer.states(), vec![E::Loading]);
    }

    #[test]
    fn test_late_callbacks_from_released_session_are_ignored() {
        let (player, factory, observer) = loaded();
        let first = factory.last();
        player.load_audio("https://example.com/next.mp3", false);
        observer.clear();

        first.prepared();
        first.error(MEDIA_ERROR_UNKNOWN, 0);
        first.complete();

        assert_eq!(player.get_state(), E::Loading);
        assert!(observer.get_events().is_empty());
    }

    #[test]
    fn test_volume_is_clamped_and_cached() {
        let (player, factory, _observer) = loaded();

        player.set_volume(0.3);
        assert_eq!(player.get_volume(), 0.3);
        assert_eq!(factory.last().volume(), (0.3, 0.3));

        player.set_volume(4.0);
        assert_eq!(player.get_volume(), 1.0);
        player.set_volume(-1.0);
        assert_eq!(player.get_volume(), 0.0);
    }

    #[test]
    fn test_speed_is_fixed() {
        let (player, _factory, _observer) = loaded();

        assert!(!player.can_set_speed());
        player.set_speed(2.0);
        assert_eq!(player.get_speed(), 1.0);
    }

    #[test]
    fn test_loop_counters_are_inert() {
        let (player, factory, _observer) = loaded();

        player.set_loop_count_goal(3);
        player.set_loop_count(1);
        player.play();
        factory.last().complete();

        assert_eq!(player.get_loop_count_goal(), 3);
        assert_eq!(player.get_loop_count(), 1);
        assert_eq!(player.get_state(), E::Loaded);
    }

    #[test]
    fn test_external_metadata_wins_over_native() {
        let (player, factory, observer) = loaded();
        factory.last().set_metadata(vec![
            duet_core::NativeMetadataItem::text("title", "Native title"),
            duet_core::NativeMetadataItem::text("artist", "Native artist"),
        ]);

        player.set_external_metadata(Metadata::from([(
            "title".to_string(),
            MetadataValue::from("Custom title"),
        )]));

        let combined = player.get_combined_metadata();
        assert_eq!(combined["title"], MetadataValue::from("Custom title"));
        assert_eq!(combined["artist"], MetadataValue::from("Native artist"));
        assert_eq!(observer.metadata_events(), vec![combined]);
    }

    #[test]
    fn test_position_ticks_only_while_playing() {
        let factory = Arc::new(FakeMediaPlayerFactory::new().with_duration_ms(60_000));
        let config = PlayerConfig::new().with_position_update_frequency(0.02);
        let player = AndroidAudioPlayer::new(factory.clone(), &config);
        let observer = Arc::new(TestCallback::new());
        player.add_callback(observer.clone());

        player.load_audio(URI, false);
        factory.last().prepared();
        std::thread::sleep(Duration::from_millis(100));
        assert!(observer.positions().is_empty());

        factory.last().set_position_ms(1_500);
        player.play();
        std::thread::sleep(Duration::from_millis(150));
        assert!(observer.positions().contains(&1.5));

        player.unload();
        // Let a tick dispatched just before the unload land
        std::thread::sleep(Duration::from_millis(20));
        observer.clear();
        std::thread::sleep(Duration::from_millis(100));
        assert!(observer.positions().is_empty());
    }

    #[test]
    fn test_invalid_position_update_frequency_is_ignored() {
        let (player, _factory, _observer) = setup();

        player.set_position_update_frequency(0.0);
        player.set_position_update_frequency(f64::NAN);
        player.set_position_update_frequency(1e30);
        assert_eq!(player.get_position_update_frequency(), 60.0);

        player.set_position_update_frequency(0.5);
        assert_eq!(player.get_position_update_frequency(), 0.5);
    }

    #[test]
    fn test_frequency_change_restarts_polling() {
        let (player, factory, observer) = loaded();
        factory.last().set_position_ms(2_000);
        player.play();
        std::thread::sleep(Duration::from_millis(100));
        assert!(observer.positions().is_empty());

        player.set_position_update_frequency(0.02);
        std::thread::sleep(Duration::from_millis(150));
        assert!(observer.positions().contains(&2.0));

        player.unload();
        std::thread::sleep(Duration::from_millis(20));
        observer.clear();
        std::thread::sleep(Duration::from_millis(100));
        assert!(observer.positions().is_empty());
    }

    // Fails the native player from another thread as soon as play() announces Loading
    struct FailOnStart {
        native: Mutex<Option<FakeMediaPlayerControl>>,
        transitions: Mutex<Vec<(ExternalState, ExternalState)>>,
    }

    impl PlayerCallback for FailOnStart {
        fn on_event(&self, event: CallbackEvent) {
            let CallbackEvent::StateChanged {
                old_state,
                new_state,
            } = event
            else {
                return;
            };
            self.transitions.lock().push((old_state, new_state));
            if new_state == E::Loading {
                if let Some(native) = self.native.lock().take() {
                    std::thread::spawn(move || native.error(MEDIA_ERROR_UNKNOWN, MEDIA_ERROR_IO))
                        .join()
                        .unwrap();
                }
            }
        }
    }

    #[test]
    fn test_error_from_other_thread_is_announced_in_order() {
        let (player, factory, _observer) = loaded();
        let observer = Arc::new(FailOnStart {
            native: Mutex::new(Some(factory.last())),
            transitions: Mutex::new(Vec::new()),
        });
        player.add_callback(observer.clone());

        player.play();

        assert_eq!(player.get_state(), E::Errored);
        assert_eq!(
            *observer.transitions.lock(),
            vec![
                (E::Loaded, E::Loading),
                (E::Loading, E::Playing),
                (E::Playing, E::Errored),
            ]
        );
    }
}
