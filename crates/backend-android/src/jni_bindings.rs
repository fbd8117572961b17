// JNI bindings for android.media.MediaPlayer
// JniMediaPlayer drives a Java MediaPlayer; the Java class
// com.duet.audio.NativeMediaPlayerListener implements every MediaPlayer
// listener interface and forwards each callback to the exported functions
// below, keyed by the id it was constructed with.

use crate::native::{MediaPlayerFactory, MediaPlayerHandle, MediaPlayerListener};
use duet_core::{AudioError, Result};
use jni::objects::{GlobalRef, JClass, JObject, JValue};
use jni::sys::{jboolean, jint, jlong, JNI_TRUE};
use jni::{JNIEnv, JavaVM};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

const MEDIA_PLAYER_CLASS: &str = "android/media/MediaPlayer";
const LISTENER_CLASS: &str = "com/duet/audio/NativeMediaPlayerListener";

/// AudioManager.STREAM_MUSIC
const STREAM_MUSIC: jint = 3;

const LISTENER_SETTERS: [(&str, &str); 6] = [
    ("setOnPreparedListener", "(Landroid/media/MediaPlayer$OnPreparedListener;)V"),
    ("setOnCompletionListener", "(Landroid/media/MediaPlayer$OnCompletionListener;)V"),
    ("setOnErrorListener", "(Landroid/media/MediaPlayer$OnErrorListener;)V"),
    ("setOnInfoListener", "(Landroid/media/MediaPlayer$OnInfoListener;)V"),
    ("setOnSeekCompleteListener", "(Landroid/media/MediaPlayer$OnSeekCompleteListener;)V"),
    (
        "setOnBufferingUpdateListener",
        "(Landroid/media/MediaPlayer$OnBufferingUpdateListener;)V",
    ),
];

static LISTENER_REGISTRY: Lazy<Mutex<HashMap<i64, Arc<dyn MediaPlayerListener>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

static NEXT_LISTENER_ID: AtomicI64 = AtomicI64::new(1);

fn registered_listener(listener_id: jlong) -> Option<Arc<dyn MediaPlayerListener>> {
    let found = LISTENER_REGISTRY.lock().get(&listener_id).cloned();
    if found.is_none() {
        log::debug!("No listener registered for id {}", listener_id);
    }
    found
}

fn to_audio_error(env: &mut JNIEnv, error: jni::errors::Error) -> AudioError {
    if let jni::errors::Error::JavaException = error {
        let _ = env.exception_describe();
        let _ = env.exception_clear();
        return AudioError::InvalidState("MediaPlayer threw an exception".to_string());
    }
    AudioError::JniError(error.to_string())
}

pub struct JniMediaPlayerFactory {
    vm: Arc<JavaVM>,
}

impl JniMediaPlayerFactory {
    pub fn new(vm: JavaVM) -> Self {
        Self { vm: Arc::new(vm) }
    }

    pub fn from_env(env: &JNIEnv) -> Result<Self> {
        let vm = env
            .get_java_vm()
            .map_err(|e| AudioError::JniError(format!("Failed to get JavaVM: {}", e)))?;
        Ok(Self::new(vm))
    }
}

impl MediaPlayerFactory for JniMediaPlayerFactory {
    fn create(&self) -> Result<Box<dyn MediaPlayerHandle>> {
        let mut env = self
            .vm
            .attach_current_thread()
            .map_err(|e| AudioError::InitializationError(format!("Failed to attach thread: {}", e)))?;

        let player = env
            .new_object(MEDIA_PLAYER_CLASS, "()V", &[])
            .and_then(|object| env.new_global_ref(object))
            .map_err(|e| to_audio_error(&mut *env, e))?;

        log::debug!("Created native MediaPlayer");
        Ok(Box::new(JniMediaPlayer {
            vm: self.vm.clone(),
            player,
            listener_id: None,
        }))
    }
}

pub struct JniMediaPlayer {
    vm: Arc<JavaVM>,
    player: GlobalRef,
    listener_id: Option<i64>,
}

impl JniMediaPlayer {
    fn with_env<R>(
        &self,
        f: impl FnOnce(&mut JNIEnv, &JObject) -> jni::errors::Result<R>,
    ) -> Result<R> {
        let mut env = self
            .vm
            .attach_current_thread()
            .map_err(|e| AudioError::JniError(format!("Failed to attach thread: {}", e)))?;
        let result = f(&mut *env, self.player.as_obj());
        result.map_err(|e| to_audio_error(&mut *env, e))
    }

    fn call_void(&self, method: &str, signature: &str, args: &[JValue]) -> Result<()> {
        self.with_env(|env, player| env.call_method(player, method, signature, args).map(|_| ()))
    }

    fn call_int(&self, method: &str) -> Result<i32> {
        self.with_env(|env, player| env.call_method(player, method, "()I", &[])?.i())
    }

    fn install_listener_object(&self, listener_id: Option<i64>) -> Result<()> {
        self.with_env(|env, player| {
            let bridge = match listener_id {
                Some(id) => env.new_object(LISTENER_CLASS, "(J)V", &[JValue::Long(id)])?,
                None => JObject::null(),
            };
            for (setter, signature) in LISTENER_SETTERS {
                env.call_method(player, setter, signature, &[JValue::Object(&bridge)])?;
            }
            Ok(())
        })
    }

    fn unregister(&mut self) {
        if let Some(id) = self.listener_id.take() {
            LISTENER_REGISTRY.lock().remove(&id);
        }
    }
}

impl MediaPlayerHandle for JniMediaPlayer {
    fn set_audio_stream_type_music(&mut self) -> Result<()> {
        self.call_void("setAudioStreamType", "(I)V", &[JValue::Int(STREAM_MUSIC)])
    }

    fn set_data_source(&mut self, uri: &str) -> Result<()> {
        self.with_env(|env, player| {
            let source = env.new_string(uri)?;
            env.call_method(
                player,
                "setDataSource",
                "(Ljava/lang/String;)V",
                &[JValue::Object(&source)],
            )
            .map(|_| ())
        })
        .map_err(|e| AudioError::LoadError(format!("{}: {}", uri, e)))
    }

    fn prepare_async(&mut self) -> Result<()> {
        self.call_void("prepareAsync", "()V", &[])
    }

    fn start(&mut self) -> Result<()> {
        self.call_void("start", "()V", &[])
    }

    fn pause(&mut self) -> Result<()> {
        self.call_void("pause", "()V", &[])
    }

    fn stop(&mut self) -> Result<()> {
        self.call_void("stop", "()V", &[])
    }

    fn seek_to(&mut self, position_ms: i32) -> Result<()> {
        self.call_void("seekTo", "(I)V", &[JValue::Int(position_ms)])
    }

    fn get_duration_ms(&self) -> Result<i32> {
        self.call_int("getDuration")
    }

    fn get_current_position_ms(&self) -> Result<i32> {
        self.call_int("getCurrentPosition")
    }

    fn set_volume(&mut self, left: f32, right: f32) -> Result<()> {
        self.call_void("setVolume", "(FF)V", &[JValue::Float(left), JValue::Float(right)])
    }

    fn set_listener(&mut self, listener: Option<Arc<dyn MediaPlayerListener>>) {
        self.unregister();

        let id = listener.map(|listener| {
            let id = NEXT_LISTENER_ID.fetch_add(1, Ordering::Relaxed);
            LISTENER_REGISTRY.lock().insert(id, listener);
            id
        });
        self.listener_id = id;

        if let Err(e) = self.install_listener_object(id) {
            log::error!("Failed to install MediaPlayer listeners: {}", e);
        }
    }

    fn release(&mut self) {
        self.unregister();
        if let Err(e) = self.call_void("release", "()V", &[]) {
            log::warn!("MediaPlayer.release() failed: {}", e);
        }
    }
}

impl Drop for JniMediaPlayer {
    fn drop(&mut self) {
        self.unregister();
    }
}

#[no_mangle]
pub extern "system" fn Java_com_duet_audio_NativeMediaPlayerListener_nativeOnPrepared(
    _env: JNIEnv,
    _class: JClass,
    listener_id: jlong,
) {
    if let Some(listener) = registered_listener(listener_id) {
        listener.on_prepared();
    }
}

#[no_mangle]
pub extern "system" fn Java_com_duet_audio_NativeMediaPlayerListener_nativeOnCompletion(
    _env: JNIEnv,
    _class: JClass,
    listener_id: jlong,
) {
    if let Some(listener) = registered_listener(listener_id) {
        listener.on_completion();
    }
}

#[no_mangle]
pub extern "system" fn Java_com_duet_audio_NativeMediaPlayerListener_nativeOnError(
    _env: JNIEnv,
    _class: JClass,
    listener_id: jlong,
    what: jint,
    extra: jint,
) -> jboolean {
    match registered_listener(listener_id) {
        Some(listener) => listener.on_error(what, extra) as jboolean,
        // Claim it anyway so MediaPlayer does not fire a completion after the error
        None => JNI_TRUE,
    }
}

#[no_mangle]
pub extern "system" fn Java_com_duet_audio_NativeMediaPlayerListener_nativeOnInfo(
    _env: JNIEnv,
    _class: JClass,
    listener_id: jlong,
    what: jint,
    extra: jint,
) -> jboolean {
    match registered_listener(listener_id) {
        Some(listener) => listener.on_info(what, extra) as jboolean,
        None => JNI_TRUE,
    }
}

#[no_mangle]
pub extern "system" fn Java_com_duet_audio_NativeMediaPlayerListener_nativeOnSeekComplete(
    _env: JNIEnv,
    _class: JClass,
    listener_id: jlong,
) {
    if let Some(listener) = registered_listener(listener_id) {
        listener.on_seek_complete();
    }
}

#[no_mangle]
pub extern "system" fn Java_com_duet_audio_NativeMediaPlayerListener_nativeOnBufferingUpdate(
    _env: JNIEnv,
    _class: JClass,
    listener_id: jlong,
    percent: jint,
) {
    if let Some(listener) = registered_listener(listener_id) {
        listener.on_buffering_update(percent);
    }
}
