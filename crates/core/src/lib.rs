// Core types for Duet audio players
// Platform-independent state reconciliation shared by the Android and iOS drivers

pub mod callback;
pub mod config;
pub mod error;
pub mod metadata;
pub mod player;
pub mod poller;
pub mod reconciler;
pub mod session;
pub mod state;

// Re-export commonly used types
pub use callback::{CallbackEvent, CallbackId, CallbackManager, PlayerCallback};
pub use config::PlayerConfig;
pub use error::{AudioError, Result};
pub use metadata::{Metadata, MetadataValue, NativeMetadataItem};
pub use player::{AudioPlayer, Capabilities, LoopCounters};
pub use poller::PositionPoller;
pub use reconciler::Reconciler;
pub use session::{SessionCell, SessionState};
pub use state::{ExternalState, InternalLifecycle};

#[cfg(any(test, feature = "test-support"))]
pub use callback::TestCallback;
