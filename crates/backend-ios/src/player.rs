// iOS audio player driving an AVPlayer-style native handle
// The native player reports item readiness and its time control status
// through key-path observation; the driver maps those onto the shared
// lifecycle. One native player is reused across loads and only swapped
// out after an error or an unload.

use crate::native::{
    AudioSession, AvPlayerFactory, AvPlayerHandle, AvPlayerObserver, ItemStatus,
    TimeControlStatus,
};
use duet_core::metadata::combine;
use duet_core::poller::poll_interval;
use duet_core::{
    AudioError, AudioPlayer, CallbackEvent, CallbackId, Capabilities, ExternalState,
    InternalLifecycle, LoopCounters, Metadata, PlayerCallback, PlayerConfig, PositionPoller,
    Reconciler, SessionCell, SessionState,
};
use std::sync::{Arc, Weak};

/// Change reported by the key-path observer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvPlayerEvent {
    ItemStatus(ItemStatus),
    TimeControlStatus(TimeControlStatus),
    SeekFinished { finished: bool },
    PlayedToEnd,
    MetadataChanged,
    NotSeekable,
}

#[derive(Debug)]
pub enum IosEvent {
    /// Observer callback tagged with the item it was registered on
    Item { item: u64, event: AvPlayerEvent },
    PositionTick { generation: u64 },
}

/// Key-path observer proxy. Holds the driver weakly so the native player
/// never keeps it alive.
struct KeyPathObserver {
    owner: Weak<SessionCell<IosSession>>,
    item: u64,
}

impl KeyPathObserver {
    fn forward(&self, event: AvPlayerEvent) {
        if let Some(cell) = self.owner.upgrade() {
            cell.post(IosEvent::Item {
                item: self.item,
                event,
            });
        }
    }
}

impl AvPlayerObserver for KeyPathObserver {
    fn on_item_status(&self, status: ItemStatus) {
        self.forward(AvPlayerEvent::ItemStatus(status));
    }

    fn on_time_control_status(&self, status: TimeControlStatus) {
        self.forward(AvPlayerEvent::TimeControlStatus(status));
    }

    fn on_seek_finished(&self, finished: bool) {
        self.forward(AvPlayerEvent::SeekFinished { finished });
    }

    fn on_played_to_end(&self) {
        self.forward(AvPlayerEvent::PlayedToEnd);
    }

    fn on_metadata_changed(&self) {
        self.forward(AvPlayerEvent::MetadataChanged);
    }

    fn on_not_seekable(&self) {
        self.forward(AvPlayerEvent::NotSeekable);
    }
}

pub struct IosSession {
    factory: Arc<dyn AvPlayerFactory>,
    audio_session: Arc<dyn AudioSession>,
    owner: Weak<SessionCell<IosSession>>,
    handle: Option<Box<dyn AvPlayerHandle>>,
    item_id: u64,
    reconciler: Reconciler,
    // play() issued, native layer not yet confirmed playing
    awaiting_start: bool,
    speed: f64,
    poller: Option<PositionPoller>,
    position_update_frequency: f64,
    external_metadata: Metadata,
    loops: LoopCounters,
}

impl IosSession {
    fn new(
        factory: Arc<dyn AvPlayerFactory>,
        audio_session: Arc<dyn AudioSession>,
        config: &PlayerConfig,
        owner: Weak<SessionCell<IosSession>>,
    ) -> Self {
        Self {
            factory,
            audio_session,
            owner,
            handle: None,
            item_id: 0,
            reconciler: Reconciler::new(),
            awaiting_start: false,
            speed: 1.0,
            poller: None,
            position_update_frequency: config.position_update_frequency_secs,
            external_metadata: Metadata::new(),
            loops: LoopCounters::default(),
        }
    }

    fn load_audio(&mut self, uri: &str, autoplay: bool) {
        log::info!("Loading audio: {}", uri);
        let errored = self.reconciler.lifecycle() == InternalLifecycle::Error;
        self.reconciler.begin_load(autoplay);
        self.awaiting_start = false;

        if errored {
            self.release_player();
        }

        let result = if self.handle.is_some() {
            self.replace_item(uri)
        } else {
            self.create_player(uri)
        };
        if let Err(e) = result {
            self.fail(e);
            return;
        }

        self.item_id += 1;
        let observer = Arc::new(KeyPathObserver {
            owner: self.owner.clone(),
            item: self.item_id,
        });
        if let Some(handle) = self.handle.as_mut() {
            handle.add_item_observer(observer);
        }
        self.reconciler.track(InternalLifecycle::Preparing);

        if let Err(e) = self.audio_session.activate() {
            log::warn!("Failed to activate audio session: {}", e);
        }
        self.start_poller();
    }

    fn create_player(&mut self, uri: &str) -> duet_core::Result<()> {
        let handle = self.factory.create(uri)?;
        self.handle = Some(handle);
        Ok(())
    }

    // Reuse the native player with a new item
    fn replace_item(&mut self, uri: &str) -> duet_core::Result<()> {
        let handle = self
            .handle
            .as_mut()
            .ok_or_else(|| AudioError::InvalidState("No native player".to_string()))?;

        handle.pause();
        handle.remove_item_observer();
        self.external_metadata.clear();
        handle.replace_current_item(Some(uri))
    }

    fn play(&mut self) {
        let Some(handle) = self.handle.as_mut() else {
            log::debug!("play() ignored: nothing loaded");
            return;
        };
        match self.reconciler.lifecycle() {
            InternalLifecycle::Started => {
                log::debug!("play() ignored: already started");
                return;
            }
            InternalLifecycle::Idle
            | InternalLifecycle::Initialized
            | InternalLifecycle::Preparing => {
                log::debug!("Item not ready, deferring play()");
                self.reconciler.request_autoplay();
                return;
            }
            lifecycle if !lifecycle.is_any_of(InternalLifecycle::STARTABLE) => {
                log::debug!("play() ignored in {:?}", lifecycle);
                return;
            }
            _ => {}
        }

        self.reconciler.begin_transient();
        self.reconciler.track(InternalLifecycle::Started);
        self.awaiting_start = true;
        handle.play();
        if self.speed != 1.0 {
            handle.set_rate(self.speed);
        }
    }

    fn confirm_start(&mut self) {
        if self.awaiting_start {
            self.awaiting_start = false;
            log::debug!("Playback confirmed by native player");
        }
        self.reconciler.resync();
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

        handle.pause();
        self.awaiting_start = false;
        self.reconciler.advance(InternalLifecycle::Paused);
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
        self.release_player();
        self.reconciler.reset();
    }

    // Observers and polling go first; the audio session is released last
    fn release_player(&mut self) {
        let Some(mut handle) = self.handle.take() else {
            return;
        };
        self.stop_poller();
        handle.pause();
        handle.remove_item_observer();
        if let Err(e) = handle.replace_current_item(None) {
            log::debug!("Clearing the current item failed: {}", e);
        }
        drop(handle);

        self.awaiting_start = false;
        self.external_metadata.clear();
        if let Err(e) = self.audio_session.deactivate() {
            log::warn!("Failed to deactivate audio session: {}", e);
        }
    }

    fn duration(&self) -> f64 {
        match self.handle.as_ref() {
            Some(handle) if self.reconciler.is_in(InternalLifecycle::TIMED) => {
                finite_or_unknown(handle.duration())
            }
            _ => -1.0,
        }
    }

    fn position(&self) -> f64 {
        match self.handle.as_ref() {
            Some(handle) if self.reconciler.is_in(InternalLifecycle::TIMED) => {
                finite_or_unknown(handle.current_time())
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

        match handle.seek_to(seconds.max(0.0)) {
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

    fn set_speed(&mut self, speed: f64) {
        if !speed.is_finite() || speed <= 0.0 {
            log::warn!("Ignoring invalid speed: {}", speed);
            return;
        }
        self.speed = speed;
        if self.reconciler.lifecycle() == InternalLifecycle::Started {
            if let Some(handle) = self.handle.as_mut() {
                handle.set_rate(speed);
            }
        }
    }

    fn volume(&self) -> f64 {
        self.handle.as_ref().map(|h| h.volume()).unwrap_or(1.0)
    }

    fn set_volume(&mut self, volume: f64) {
        let volume = if volume.is_nan() { 1.0 } else { volume.clamp(0.0, 1.0) };
        if self.reconciler.lifecycle() == InternalLifecycle::Error {
            return;
        }
        if let Some(handle) = self.handle.as_mut() {
            handle.set_volume(volume);
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
            can_set_speed: true,
            can_read_volume: true,
        }
    }

    fn fail(&mut self, error: AudioError) {
        log::error!("[AVPlayer] {}", error);
        self.awaiting_start = false;
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
                cell.post(IosEvent::PositionTick { generation });
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

    fn on_position_tick(&mut self) {
        if self.awaiting_start {
            let playing = self
                .handle
                .as_ref()
                .map(|h| h.time_control_status() == TimeControlStatus::Playing)
                .unwrap_or(false);
            if playing {
                self.confirm_start();
            }
        }
        if self.reconciler.state() == ExternalState::Playing {
            let position = self.position();
            self.reconciler.notify(CallbackEvent::PositionChanged { position });
        }
    }

    fn on_item_event(&mut self, event: AvPlayerEvent) {
        let started = self.reconciler.lifecycle() == InternalLifecycle::Started;
        match event {
            AvPlayerEvent::ItemStatus(ItemStatus::ReadyToPlay) => {
                if self.reconciler.lifecycle() != InternalLifecycle::Preparing {
                    return;
                }
                let duration = self.handle.as_ref().map(|h| finite_or_unknown(h.duration()));
                let duration = duration.unwrap_or(-1.0);
                log::info!("Ready to play (duration {}s)", duration);
                if self.reconciler.prepared(duration) {
                    self.play();
                }
            }
            AvPlayerEvent::ItemStatus(ItemStatus::Failed) => {
                let error = self
                    .handle
                    .as_ref()
                    .and_then(|h| h.item_error())
                    .unwrap_or_else(|| AudioError::LoadError("Item failed".to_string()));
                self.fail(error);
            }
            AvPlayerEvent::ItemStatus(ItemStatus::Unknown) => {}
            AvPlayerEvent::TimeControlStatus(status) if started => match status {
                TimeControlStatus::Playing => self.confirm_start(),
                TimeControlStatus::WaitingToPlayAtSpecifiedRate => {
                    self.reconciler.begin_transient()
                }
                // Paused by the system (interruption, end of item)
                TimeControlStatus::Paused => {
                    self.awaiting_start = false;
                    self.reconciler.advance(InternalLifecycle::Paused);
                }
            },
            AvPlayerEvent::TimeControlStatus(status) => {
                log::trace!("Time control {:?} in {:?}", status, self.reconciler.lifecycle());
            }
            AvPlayerEvent::SeekFinished { finished: true } => self.reconciler.resync(),
            AvPlayerEvent::SeekFinished { finished: false } => {
                log::debug!("Seek interrupted by a newer seek");
            }
            AvPlayerEvent::PlayedToEnd => {
                log::info!("Playback completed");
                self.stop();
                self.reconciler.advance(InternalLifecycle::PlaybackCompleted);
            }
            AvPlayerEvent::MetadataChanged => self.notify_metadata(),
            AvPlayerEvent::NotSeekable => self.reconciler.mark_not_seekable(),
        }
    }
}

impl SessionState for IosSession {
    type Event = IosEvent;

    fn handle_event(&mut self, event: IosEvent) {
        match event {
            IosEvent::Item { item, event } => {
                if self.handle.is_none() || item != self.item_id {
                    log::debug!("Ignoring {:?} from stale item {}", event, item);
                    return;
                }
                self.on_item_event(event);
            }
            IosEvent::PositionTick { generation } => {
                if self.poller.as_ref().map(PositionPoller::generation) == Some(generation) {
                    self.on_position_tick();
                }
            }
        }
    }

    fn take_notifications(&mut self) -> Vec<CallbackEvent> {
        self.reconciler.take_notifications()
    }
}

impl Drop for IosSession {
    fn drop(&mut self) {
        self.release_player();
    }
}

fn finite_or_unknown(seconds: f64) -> f64 {
    if seconds.is_finite() && seconds >= 0.0 {
        seconds
    } else {
        -1.0
    }
}

/// iOS audio player
pub struct IosAudioPlayer {
    cell: Arc<SessionCell<IosSession>>,
}

impl IosAudioPlayer {
    pub fn new(
        factory: Arc<dyn AvPlayerFactory>,
        audio_session: Arc<dyn AudioSession>,
        config: &PlayerConfig,
    ) -> Self {
        log::info!("Initializing iOS audio player");
        let cell = Arc::new_cyclic(|owner| {
            SessionCell::new(IosSession::new(factory, audio_session, config, owner.clone()))
        });
        Self { cell }
    }

    /// Current tracked lifecycle, for diagnostics
    pub fn lifecycle(&self) -> InternalLifecycle {
        self.cell.with(|s| s.reconciler.lifecycle())
    }
}

impl AudioPlayer for IosAudioPlayer {
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
        self.cell.with(|s| s.speed)
    }

    fn set_speed(&self, speed: f64) {
        self.cell.with(|s| s.set_speed(speed));
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
        self.cell.with(|s| s.volume())
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
