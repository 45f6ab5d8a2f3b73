use crate::{Credentials, RecentTracksEnvelope, RecentTracksSource, UpstreamError};
use async_trait::async_trait;
use now_listening_core::{urls, LastFmConfig};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// `user.getRecentTracks` over HTTPS, one item per call.
pub struct LastFmClient {
    http: Client,
    api_base: String,
}

impl LastFmClient {
    pub fn new(cfg: &LastFmConfig) -> Result<Self, UpstreamError> {
        let mut builder = Client::builder().user_agent(concat!(
            "now-listening/",
            env!("CARGO_PKG_VERSION")
        ));
        if cfg.request_timeout_ms > 0 {
            builder = builder.timeout(Duration::from_millis(cfg.request_timeout_ms));
        }
        let http = builder.build().map_err(UpstreamError::Transport)?;

        Ok(Self {
            http,
            api_base: cfg.api_base.clone(),
        })
    }
}

#[async_trait]
impl RecentTracksSource for LastFmClient {
    async fn recent_tracks(
        &self,
        creds: &Credentials,
    ) -> Result<RecentTracksEnvelope, UpstreamError> {
        let url = urls::recent_tracks_url(&self.api_base, &creds.user, &creds.api_key, 1)?;

        // Errors come back in-body with a 4xx status, so the status is not checked.
        let res = self.http.get(url).send().await?;
        let status = res.status();
        let body = res.bytes().await?;
        debug!(%status, bytes = body.len(), "last.fm responded");

        serde_json::from_slice(&body).map_err(UpstreamError::Decode)
    }
}
