// Error handling at the native boundary
// Playback methods never return these to callers; drivers log them and
// surface them as the Errored state.

use std::fmt;

/// Audio backend error types
#[derive(Debug, Clone, PartialEq)]
pub enum AudioError {
    /// Failed to create the native player
    InitializationError(String),

    /// Failed to set or open the data source
    LoadError(String),

    /// Native playback call failed
    PlaybackError(String),

    /// Native call made in a state the native player rejects
    InvalidState(String),

    /// JNI error (Android binding)
    JniError(String),

    /// Native error reported asynchronously by the backend
    NativeError {
        domain: String,
        code: i64,
        description: String,
    },

    /// Generic error
    Other(String),
}

impl fmt::Display for AudioError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AudioError::InitializationError(msg) => write!(f, "Initialization error: {}", msg),
            AudioError::LoadError(msg) => write!(f, "Load error: {}", msg),
            AudioError::PlaybackError(msg) => write!(f, "Playback error: {}", msg),
            AudioError::InvalidState(msg) => write!(f, "Invalid state: {}", msg),
            AudioError::JniError(msg) => write!(f, "JNI error: {}", msg),
            AudioError::NativeError {
                domain,
                code,
                description,
            } => write!(f, "Native error [{}:{}]: {}", domain, code, description),
            AudioError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for AudioError {}

/// Result type alias for native audio operations
pub type Result<T> = std::result::Result<T, AudioError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_error_display() {
        let err = AudioError::NativeError {
            domain: "AVFoundationErrorDomain".to_string(),
            code: -11800,
            description: "The operation could not be completed".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Native error [AVFoundationErrorDomain:-11800]: The operation could not be completed"
        );
    }
}
