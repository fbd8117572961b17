// Player configuration

use crate::poller::{poll_interval, DEFAULT_POSITION_UPDATE_FREQUENCY_SECS};

/// Default log tag (Android logcat)
pub const DEFAULT_LOG_TAG: &str = "DuetAudio";

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerConfig {
    /// Seconds between position notifications while playing
    pub position_update_frequency_secs: f64,
    pub log_level: log::LevelFilter,
    pub log_tag: String,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            position_update_frequency_secs: DEFAULT_POSITION_UPDATE_FREQUENCY_SECS,
            log_level: log::LevelFilter::Info,
            log_tag: DEFAULT_LOG_TAG.to_string(),
        }
    }
}

impl PlayerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Invalid (non-positive, non-finite or unrepresentable) frequencies keep the current value
    pub fn with_position_update_frequency(mut self, seconds: f64) -> Self {
        if poll_interval(seconds).is_some() {
            self.position_update_frequency_secs = seconds;
        } else {
            log::warn!("Ignoring invalid position update frequency: {}", seconds);
        }
        self
    }

    pub fn with_log_level(mut self, level: log::LevelFilter) -> Self {
        self.log_level = level;
        self
    }

    pub fn with_log_tag(mut self, tag: impl Into<String>) -> Self {
        self.log_tag = tag.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PlayerConfig::default();
        assert_eq!(config.position_update_frequency_secs, 1.0);
        assert_eq!(config.log_level, log::LevelFilter::Info);
        assert_eq!(config.log_tag, "DuetAudio");
    }

    #[test]
    fn test_invalid_frequency_is_ignored() {
        let config = PlayerConfig::new()
            .with_position_update_frequency(0.25)
            .with_position_update_frequency(-2.0)
            .with_position_update_frequency(f64::INFINITY)
            .with_position_update_frequency(1e30);
        assert_eq!(config.position_update_frequency_secs, 0.25);
    }
}
