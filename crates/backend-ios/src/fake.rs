// In-memory AVPlayer for tests
// By default the fake answers play()/pause() with the matching time control
// status, as AVPlayer's key-path observation does. Everything else is fired
// by the test.

use crate::native::{
    AudioSession, AvPlayerFactory, AvPlayerHandle, AvPlayerObserver, ItemStatus,
    TimeControlStatus,
};
use duet_core::{AudioError, NativeMetadataItem, Result};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

struct FakeState {
    calls: Vec<String>,
    current_uri: Option<String>,
    observer: Option<Arc<dyn AvPlayerObserver>>,
    // Last observer ever registered, even once removed
    last_observer: Option<Arc<dyn AvPlayerObserver>>,
    manual_status: bool,
    time_control: TimeControlStatus,
    item_error: Option<AudioError>,
    duration: f64,
    current_time: f64,
    rate: f64,
    volume: f64,
    last_seek: Option<f64>,
    metadata: Vec<NativeMetadataItem>,
}

pub struct FakeAvPlayer {
    state: Arc<Mutex<FakeState>>,
}

impl FakeAvPlayer {
    fn record(&self, call: &str) {
        self.state.lock().calls.push(call.to_string());
    }

    fn report(&self, status: TimeControlStatus) {
        let observer = {
            let mut state = self.state.lock();
            if state.manual_status || state.time_control == status {
                return;
            }
            state.time_control = status;
            state.observer.clone()
        };
        if let Some(observer) = observer {
            observer.on_time_control_status(status);
        }
    }
}

impl AvPlayerHandle for FakeAvPlayer {
    fn replace_current_item(&mut self, uri: Option<&str>) -> Result<()> {
        self.record("replace_current_item");
        let mut state = self.state.lock();
        state.current_uri = uri.map(str::to_string);
        state.current_time = 0.0;
        state.item_error = None;
        state.last_seek = None;
        Ok(())
    }

    fn add_item_observer(&mut self, observer: Arc<dyn AvPlayerObserver>) {
        self.record("add_item_observer");
        let mut state = self.state.lock();
        state.last_observer = Some(observer.clone());
        state.observer = Some(observer);
    }

    fn remove_item_observer(&mut self) {
        self.record("remove_item_observer");
        self.state.lock().observer = None;
    }

    fn play(&mut self) {
        self.record("play");
        self.state.lock().rate = 1.0;
        self.report(TimeControlStatus::Playing);
    }

    fn pause(&mut self) {
        self.record("pause");
        self.state.lock().rate = 0.0;
        self.report(TimeControlStatus::Paused);
    }

    fn seek_to(&mut self, seconds: f64) -> Result<()> {
        self.record("seek_to");
        let mut state = self.state.lock();
        state.last_seek = Some(seconds);
        state.current_time = seconds;
        Ok(())
    }

    fn current_time(&self) -> f64 {
        self.state.lock().current_time
    }

    fn duration(&self) -> f64 {
        self.state.lock().duration
    }

    fn rate(&self) -> f64 {
        self.state.lock().rate
    }

    fn set_rate(&mut self, rate: f64) {
        self.record("set_rate");
        self.state.lock().rate = rate;
    }

    fn volume(&self) -> f64 {
        self.state.lock().volume
    }

    fn set_volume(&mut self, volume: f64) {
        self.record("set_volume");
        self.state.lock().volume = volume;
    }

    fn time_control_status(&self) -> TimeControlStatus {
        self.state.lock().time_control
    }

    fn item_error(&self) -> Option<AudioError> {
        self.state.lock().item_error.clone()
    }

    fn metadata(&self) -> Vec<NativeMetadataItem> {
        self.state.lock().metadata.clone()
    }
}

/// Test-side view of one fake native player
#[derive(Clone)]
pub struct FakeAvPlayerControl {
    state: Arc<Mutex<FakeState>>,
}

impl FakeAvPlayerControl {
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }

    pub fn current_uri(&self) -> Option<String> {
        self.state.lock().current_uri.clone()
    }

    pub fn has_observer(&self) -> bool {
        self.state.lock().observer.is_some()
    }

    /// The most recently registered observer, even after it was removed
    pub fn stale_observer(&self) -> Arc<dyn AvPlayerObserver> {
        self.state
            .lock()
            .last_observer
            .clone()
            .expect("no observer registered on fake AVPlayer")
    }

    pub fn rate(&self) -> f64 {
        self.state.lock().rate
    }

    pub fn volume(&self) -> f64 {
        self.state.lock().volume
    }

    pub fn last_seek(&self) -> Option<f64> {
        self.state.lock().last_seek
    }

    pub fn set_current_time(&self, seconds: f64) {
        self.state.lock().current_time = seconds;
    }

    pub fn set_metadata(&self, metadata: Vec<NativeMetadataItem>) {
        self.state.lock().metadata = metadata;
    }

    /// Change the native status without notifying the observer
    pub fn set_time_control_status(&self, status: TimeControlStatus) {
        self.state.lock().time_control = status;
    }

    pub fn ready(&self) {
        self.fire(|o| o.on_item_status(ItemStatus::ReadyToPlay));
    }

    pub fn fail(&self, domain: &str, code: i64, description: &str) {
        self.state.lock().item_error = Some(AudioError::NativeError {
            domain: domain.to_string(),
            code,
            description: description.to_string(),
        });
        self.fire(|o| o.on_item_status(ItemStatus::Failed));
    }

    pub fn time_control(&self, status: TimeControlStatus) {
        self.state.lock().time_control = status;
        self.fire(|o| o.on_time_control_status(status));
    }

    pub fn seek_finished(&self, finished: bool) {
        self.fire(|o| o.on_seek_finished(finished));
    }

    pub fn played_to_end(&self) {
        self.fire(|o| o.on_played_to_end());
    }

    pub fn metadata_changed(&self) {
        self.fire(|o| o.on_metadata_changed());
    }

    pub fn not_seekable(&self) {
        self.fire(|o| o.on_not_seekable());
    }

    // The lock is released before calling out, as the driver calls back in
    fn fire(&self, f: impl FnOnce(&dyn AvPlayerObserver)) {
        let observer = self.state.lock().observer.clone();
        match observer {
            Some(observer) => f(observer.as_ref()),
            None => log::debug!("No observer registered on fake AVPlayer"),
        }
    }
}

/// Factory producing fake players and keeping a control for each
pub struct FakeAvPlayerFactory {
    created: Mutex<Vec<FakeAvPlayerControl>>,
    duration: f64,
    manual_status: bool,
    fail_next: AtomicBool,
}

impl FakeAvPlayerFactory {
    pub fn new() -> Self {
        Self {
            created: Mutex::new(Vec::new()),
            duration: f64::NAN,
            manual_status: false,
            fail_next: AtomicBool::new(false),
        }
    }

    /// Duration every created item reports
    pub fn with_duration(mut self, seconds: f64) -> Self {
        self.duration = seconds;
        self
    }

    /// Do not answer play()/pause() with a time control status change
    pub fn with_manual_status(mut self) -> Self {
        self.manual_status = true;
        self
    }

    /// Make the next create() fail
    pub fn fail_next_create(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    pub fn created_count(&self) -> usize {
        self.created.lock().len()
    }

    /// Control of the most recently created player.
    /// Panics when nothing was created yet.
    pub fn last(&self) -> FakeAvPlayerControl {
        self.created
            .lock()
            .last()
            .cloned()
            .expect("no fake AVPlayer created yet")
    }
}

impl Default for FakeAvPlayerFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl AvPlayerFactory for FakeAvPlayerFactory {
    fn create(&self, uri: &str) -> Result<Box<dyn AvPlayerHandle>> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(AudioError::InitializationError(format!(
                "Cannot create player for {}",
                uri
            )));
        }

        let state = Arc::new(Mutex::new(FakeState {
            calls: Vec::new(),
            current_uri: Some(uri.to_string()),
            observer: None,
            last_observer: None,
            manual_status: self.manual_status,
            time_control: TimeControlStatus::Paused,
            item_error: None,
            duration: self.duration,
            current_time: 0.0,
            rate: 0.0,
            volume: 1.0,
            last_seek: None,
            metadata: Vec::new(),
        }));
        self.created.lock().push(FakeAvPlayerControl {
            state: state.clone(),
        });
        Ok(Box::new(FakeAvPlayer { state }))
    }
}

/// Audio session recording whether it is active
pub struct FakeAudioSession {
    active: AtomicBool,
}

impl FakeAudioSession {
    pub fn new() -> Self {
        Self {
            active: AtomicBool::new(false),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

impl Default for FakeAudioSession {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioSession for FakeAudioSession {
    fn activate(&self) -> Result<()> {
        self.active.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn deactivate(&self) -> Result<()> {
        self.active.store(false, Ordering::SeqCst);
        Ok(())
    }
}
