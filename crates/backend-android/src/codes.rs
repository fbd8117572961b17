// MediaPlayer diagnostic codes
// Names are only used in log messages

use once_cell::sync::Lazy;
use std::collections::HashMap;

pub const MEDIA_ERROR_UNKNOWN: i32 = 1;
pub const MEDIA_ERROR_SERVER_DIED: i32 = 100;
pub const MEDIA_ERROR_NOT_VALID_FOR_PROGRESSIVE_PLAYBACK: i32 = 200;
pub const MEDIA_ERROR_IO: i32 = -1004;
pub const MEDIA_ERROR_MALFORMED: i32 = -1007;
pub const MEDIA_ERROR_UNSUPPORTED: i32 = -1010;
pub const MEDIA_ERROR_TIMED_OUT: i32 = -110;
pub const MEDIA_ERROR_SYSTEM: i32 = i32::MIN;

pub const MEDIA_INFO_UNKNOWN: i32 = 1;
pub const MEDIA_INFO_STARTED_AS_NEXT: i32 = 2;
pub const MEDIA_INFO_VIDEO_RENDERING_START: i32 = 3;
pub const MEDIA_INFO_VIDEO_TRACK_LAGGING: i32 = 700;
pub const MEDIA_INFO_BUFFERING_START: i32 = 701;
pub const MEDIA_INFO_BUFFERING_END: i32 = 702;
pub const MEDIA_INFO_NETWORK_BANDWIDTH: i32 = 703;
pub const MEDIA_INFO_BAD_INTERLEAVING: i32 = 800;
pub const MEDIA_INFO_NOT_SEEKABLE: i32 = 801;
pub const MEDIA_INFO_METADATA_UPDATE: i32 = 802;
pub const MEDIA_INFO_AUDIO_NOT_PLAYING: i32 = 804;
pub const MEDIA_INFO_VIDEO_NOT_PLAYING: i32 = 805;
pub const MEDIA_INFO_UNSUPPORTED_SUBTITLE: i32 = 901;
pub const MEDIA_INFO_SUBTITLE_TIMED_OUT: i32 = 902;

static MEDIA_ERROR_NAMES: Lazy<HashMap<i32, &'static str>> = Lazy::new(|| {
    HashMap::from([
        (MEDIA_ERROR_UNKNOWN, "MEDIA_ERROR_UNKNOWN"),
        (MEDIA_ERROR_SERVER_DIED, "MEDIA_ERROR_SERVER_DIED"),
        (
            MEDIA_ERROR_NOT_VALID_FOR_PROGRESSIVE_PLAYBACK,
            "MEDIA_ERROR_NOT_VALID_FOR_PROGRESSIVE_PLAYBACK",
        ),
        (MEDIA_ERROR_IO, "MEDIA_ERROR_IO"),
        (MEDIA_ERROR_MALFORMED, "MEDIA_ERROR_MALFORMED"),
        (MEDIA_ERROR_UNSUPPORTED, "MEDIA_ERROR_UNSUPPORTED"),
        (MEDIA_ERROR_TIMED_OUT, "MEDIA_ERROR_TIMED_OUT"),
        (MEDIA_ERROR_SYSTEM, "MEDIA_ERROR_SYSTEM"),
    ])
});

static MEDIA_INFO_NAMES: Lazy<HashMap<i32, &'static str>> = Lazy::new(|| {
    HashMap::from([
        (MEDIA_INFO_UNKNOWN, "MEDIA_INFO_UNKNOWN"),
        (MEDIA_INFO_STARTED_AS_NEXT, "MEDIA_INFO_STARTED_AS_NEXT"),
        (MEDIA_INFO_VIDEO_RENDERING_START, "MEDIA_INFO_VIDEO_RENDERING_START"),
        (MEDIA_INFO_VIDEO_TRACK_LAGGING, "MEDIA_INFO_VIDEO_TRACK_LAGGING"),
        (MEDIA_INFO_BUFFERING_START, "MEDIA_INFO_BUFFERING_START"),
        (MEDIA_INFO_BUFFERING_END, "MEDIA_INFO_BUFFERING_END"),
        (MEDIA_INFO_NETWORK_BANDWIDTH, "MEDIA_INFO_NETWORK_BANDWIDTH"),
        (MEDIA_INFO_BAD_INTERLEAVING, "MEDIA_INFO_BAD_INTERLEAVING"),
        (MEDIA_INFO_NOT_SEEKABLE, "MEDIA_INFO_NOT_SEEKABLE"),
        (MEDIA_INFO_METADATA_UPDATE, "MEDIA_INFO_METADATA_UPDATE"),
        (MEDIA_INFO_AUDIO_NOT_PLAYING, "MEDIA_INFO_AUDIO_NOT_PLAYING"),
        (MEDIA_INFO_VIDEO_NOT_PLAYING, "MEDIA_INFO_VIDEO_NOT_PLAYING"),
        (MEDIA_INFO_UNSUPPORTED_SUBTITLE, "MEDIA_INFO_UNSUPPORTED_SUBTITLE"),
        (MEDIA_INFO_SUBTITLE_TIMED_OUT, "MEDIA_INFO_SUBTITLE_TIMED_OUT"),
    ])
});

pub fn media_error_name(code: i32) -> &'static str {
    MEDIA_ERROR_NAMES.get(&code).copied().unwrap_or("MEDIA_ERROR_UNRECOGNIZED")
}

pub fn media_info_name(code: i32) -> &'static str {
    MEDIA_INFO_NAMES.get(&code).copied().unwrap_or("MEDIA_INFO_UNRECOGNIZED")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codes() {
        assert_eq!(media_error_name(-1004), "MEDIA_ERROR_IO");
        assert_eq!(media_error_name(i32::MIN), "MEDIA_ERROR_SYSTEM");
        assert_eq!(media_info_name(801), "MEDIA_INFO_NOT_SEEKABLE");
    }

    #[test]
    fn test_unknown_codes() {
        assert_eq!(media_error_name(42), "MEDIA_ERROR_UNRECOGNIZED");
        assert_eq!(media_info_name(-5), "MEDIA_INFO_UNRECOGNIZED");
    }
}
