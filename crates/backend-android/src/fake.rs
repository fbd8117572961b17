// In-memory MediaPlayer for tests
// Records every native call and lets the test fire listener callbacks by hand.

use crate::native::{MediaPlayerFactory, MediaPlayerHandle, MediaPlayerListener};
use duet_core::{AudioError, NativeMetadataItem, Result};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Default)]
struct FakeState {
    calls: Vec<String>,
    data_source: Option<String>,
    listener: Option<Arc<dyn MediaPlayerListener>>,
    // Kept after detaching to simulate callbacks already in flight
    detached: Option<Arc<dyn MediaPlayerListener>>,
    duration_ms: i32,
    position_ms: i32,
    volume: (f32, f32),
    metadata: Vec<NativeMetadataItem>,
    fail_data_source: bool,
    released: bool,
}

pub struct FakeMediaPlayer {
    state: Arc<Mutex<FakeState>>,
}

impl FakeMediaPlayer {
    fn record(&self, call: &str) -> Result<()> {
        let mut state = self.state.lock();
        if state.released {
            return Err(AudioError::InvalidState(format!("{} after release", call)));
        }
        state.calls.push(call.to_string());
        Ok(())
    }
}

impl MediaPlayerHandle for FakeMediaPlayer {
    fn set_audio_stream_type_music(&mut self) -> Result<()> {
        self.record("set_audio_stream_type_music")
    }

    fn set_data_source(&mut self, uri: &str) -> Result<()> {
        self.record("set_data_source")?;
        let mut state = self.state.lock();
        if state.fail_data_source {
            return Err(AudioError::LoadError(format!("Cannot open {}", uri)));
        }
        state.data_source = Some(uri.to_string());
        Ok(())
    }

    fn prepare_async(&mut self) -> Result<()> {
        self.record("prepare_async")
    }

    fn start(&mut self) -> Result<()> {
        self.record("start")
    }

    fn pause(&mut self) -> Result<()> {
        self.record("pause")
    }

    fn stop(&mut self) -> Result<()> {
        self.record("stop")
    }

    fn seek_to(&mut self, position_ms: i32) -> Result<()> {
        self.record("seek_to")?;
        self.state.lock().position_ms = position_ms;
        Ok(())
    }

    fn get_duration_ms(&self) -> Result<i32> {
        Ok(self.state.lock().duration_ms)
    }

    fn get_current_position_ms(&self) -> Result<i32> {
        Ok(self.state.lock().position_ms)
    }

    fn set_volume(&mut self, left: f32, right: f32) -> Result<()> {
        self.record("set_volume")?;
        self.state.lock().volume = (left, right);
        Ok(())
    }

    fn set_listener(&mut self, listener: Option<Arc<dyn MediaPlayerListener>>) {
        let mut state = self.state.lock();
        state.calls.push("set_listener".to_string());
        match listener {
            Some(listener) => state.listener = Some(listener),
            None => state.detached = state.listener.take(),
        }
    }

    fn metadata(&self) -> Vec<NativeMetadataItem> {
        self.state.lock().metadata.clone()
    }

    fn release(&mut self) {
        let mut state = self.state.lock();
        state.calls.push("release".to_string());
        state.released = true;
    }
}

/// Test-side view of one fake native player
#[derive(Clone)]
pub struct FakeMediaPlayerControl {
    state: Arc<Mutex<FakeState>>,
}

impl FakeMediaPlayerControl {
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }

    pub fn data_source(&self) -> Option<String> {
        self.state.lock().data_source.clone()
    }

    pub fn position_ms(&self) -> i32 {
        self.state.lock().position_ms
    }

    pub fn set_position_ms(&self, position_ms: i32) {
        self.state.lock().position_ms = position_ms;
    }

    pub fn volume(&self) -> (f32, f32) {
        self.state.lock().volume
    }

    pub fn set_metadata(&self, metadata: Vec<NativeMetadataItem>) {
        self.state.lock().metadata = metadata;
    }

    pub fn is_released(&self) -> bool {
        self.state.lock().released
    }

    pub fn has_listener(&self) -> bool {
        self.state.lock().listener.is_some()
    }

    pub fn prepared(&self) {
        self.fire(|l| l.on_prepared());
    }

    pub fn complete(&self) {
        self.fire(|l| l.on_completion());
    }

    pub fn error(&self, what: i32, extra: i32) {
        self.fire(|l| {
            l.on_error(what, extra);
        });
    }

    pub fn info(&self, what: i32, extra: i32) {
        self.fire(|l| {
            l.on_info(what, extra);
        });
    }

    pub fn seek_complete(&self) {
        self.fire(|l| l.on_seek_complete());
    }

    pub fn buffering(&self, percent: i32) {
        self.fire(|l| l.on_buffering_update(percent));
    }

    // The lock is released before calling out, as the driver calls back in
    fn fire(&self, f: impl FnOnce(&dyn MediaPlayerListener)) {
        let listener = {
            let state = self.state.lock();
            state.listener.clone().or_else(|| state.detached.clone())
        };
        match listener {
            Some(listener) => f(listener.as_ref()),
            None => log::debug!("No listener registered on fake player"),
        }
    }
}

/// Factory producing fake players and keeping a control for each
pub struct FakeMediaPlayerFactory {
    created: Mutex<Vec<FakeMediaPlayerControl>>,
    duration_ms: i32,
    fail_next_data_source: AtomicBool,
}

impl FakeMediaPlayerFactory {
    pub fn new() -> Self {
        Self {
            created: Mutex::new(Vec::new()),
            duration_ms: -1,
            fail_next_data_source: AtomicBool::new(false),
        }
    }

    /// Duration every created player reports
    pub fn with_duration_ms(mut self, duration_ms: i32) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    /// Make the next player reject its data source
    pub fn fail_next_data_source(&self) {
        self.fail_next_data_source.store(true, Ordering::SeqCst);
    }

    pub fn created_count(&self) -> usize {
        self.created.lock().len()
    }

    /// Control of the most recently created player.
    /// Panics when nothing was created yet.
    pub fn last(&self) -> FakeMediaPlayerControl {
        self.created
            .lock()
            .last()
            .cloned()
            .expect("no fake MediaPlayer created yet")
    }
}

impl Default for FakeMediaPlayerFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaPlayerFactory for FakeMediaPlayerFactory {
    fn create(&self) -> Result<Box<dyn MediaPlayerHandle>> {
        let state = Arc::new(Mutex::new(FakeState {
            duration_ms: self.duration_ms,
            volume: (1.0, 1.0),
            fail_data_source: self.fail_next_data_source.swap(false, Ordering::SeqCst),
            ..FakeState::default()
        }));
        self.created.lock().push(FakeMediaPlayerControl {
            state: state.clone(),
        });
        Ok(Box::new(FakeMediaPlayer { state }))
    }
}
