use async_trait::async_trait;
use now_listening_core::{NowPlayingResponse, UrlError};
use thiserror::Error;
use tracing::{debug, error, warn};

mod client;
mod normalize;
pub mod raw;

pub use client::LastFmClient;
pub use normalize::{normalize, NormalizedTrack};
pub use raw::{OneOrMany, RawTrack, RecentTracksEnvelope};

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error(transparent)]
    Url(#[from] UrlError),
    #[error("last.fm request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("last.fm response was not valid JSON: {0}")]
    Decode(#[source] serde_json::Error),
}

/// API key and username; both must be present for the proxy to call out.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub api_key: String,
    pub user: String,
}

impl Credentials {
    pub fn from_parts(api_key: Option<String>, user: Option<String>) -> Option<Self> {
        let api_key = api_key.filter(|v| !v.trim().is_empty())?;
        let user = user.filter(|v| !v.trim().is_empty())?;
        Some(Self { api_key, user })
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"<redacted>")
            .field("user", &self.user)
            .finish()
    }
}

#[async_trait]
pub trait RecentTracksSource: Send + Sync {
    async fn recent_tracks(&self, creds: &Credentials)
        -> Result<RecentTracksEnvelope, UpstreamError>;
}

/// Resolves the now-playing payload. Never fails: every outcome, including
/// missing configuration and transport errors, is carried in the payload.
pub async fn resolve_now_playing(
    creds: Option<&Credentials>,
    source: &dyn RecentTracksSource,
) -> NowPlayingResponse {
    let Some(creds) = creds else {
        debug!("last.fm credentials not set");
        return NowPlayingResponse::not_configured();
    };

    let envelope = match source.recent_tracks(creds).await {
        Ok(envelope) => envelope,
        Err(err) => {
            error!(error = %err, user = %creds.user, "now-playing upstream fetch failed");
            return NowPlayingResponse::fetch_failed();
        }
    };

    if let Some(code) = envelope.reported_error() {
        warn!(%code, message = ?envelope.message, "last.fm reported an error");
        return NowPlayingResponse::upstream_error(envelope.message.as_deref());
    }

    match envelope.into_first_track().and_then(normalize) {
        Some(NormalizedTrack { now_playing, track }) => {
            debug!(now_playing, name = %track.name, artist = %track.artist, "resolved track");
            NowPlayingResponse::track(now_playing, track)
        }
        None => {
            debug!("no recent tracks");
            NowPlayingResponse::no_track()
        }
    }
}
