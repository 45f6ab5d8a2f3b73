use serde::{Deserialize, Serialize};

pub const NOT_CONFIGURED_MESSAGE: &str = "Last.fm not configured";
pub const UPSTREAM_ERROR_MESSAGE: &str = "Last.fm error";
pub const FETCH_FAILED_MESSAGE: &str = "Failed to fetch";
pub const NON_JSON_MESSAGE: &str = "API returned non-JSON (route may not be active)";
pub const CLIENT_FETCH_FAILED_MESSAGE: &str = "Could not load (fetch failed)";
pub const UNKNOWN_ARTIST: &str = "Unknown";

/// A single track as exposed by the `/api/now-playing` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TrackPayload {
    pub name: String,
    pub artist: String,
    #[serde(default)]
    pub album: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    /// Animated artwork; only some sources provide it, the proxy never does.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub live_artwork_url: Option<String>,
}

/// Top-level payload of the now-playing endpoint.
///
/// Every outcome, including failures, is expressed through this type so the
/// endpoint can always answer with a 200.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NowPlayingResponse {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub now_playing: bool,
    #[serde(default)]
    pub track: Option<TrackPayload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl NowPlayingResponse {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            now_playing: false,
            track: None,
            message: Some(message.into()),
        }
    }

    pub fn not_configured() -> Self {
        Self::failure(NOT_CONFIGURED_MESSAGE)
    }

    pub fn upstream_error(message: Option<&str>) -> Self {
        let message = message
            .filter(|m| !m.is_empty())
            .unwrap_or(UPSTREAM_ERROR_MESSAGE);
        Self::failure(message)
    }

    pub fn fetch_failed() -> Self {
        Self::failure(FETCH_FAILED_MESSAGE)
    }

    pub fn no_track() -> Self {
        Self {
            ok: true,
            now_playing: false,
            track: None,
            message: None,
        }
    }

    pub fn track(now_playing: bool, track: TrackPayload) -> Self {
        Self {
            ok: true,
            now_playing,
            track: Some(track),
            message: None,
        }
    }

    pub fn is_not_configured(&self) -> bool {
        self.message.as_deref() == Some(NOT_CONFIGURED_MESSAGE)
    }

    /// The track to display, if the payload carries a usable one.
    pub fn usable_track(&self) -> Option<&TrackPayload> {
        if self.ok {
            self.track.as_ref()
        } else {
            None
        }
    }

    /// Re-establishes the payload invariants on data received over the wire:
    /// a failed payload carries no track and only a present track can be
    /// playing.
    pub fn sanitized(mut self) -> Self {
        if !self.ok {
            self.track = None;
        }
        if self.track.is_none() {
            self.now_playing = false;
        }
        self
    }
}
