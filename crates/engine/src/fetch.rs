use crate::{CancelFlag, NowPlayingSource};
use async_trait::async_trait;
use now_listening_core::{
    urls, NowPlayingResponse, UrlError, CLIENT_FETCH_FAILED_MESSAGE, NON_JSON_MESSAGE,
};
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use thiserror::Error;
use tracing::warn;
use url::Url;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error(transparent)]
    Url(#[from] UrlError),
    #[error("now-playing request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("now-playing endpoint returned {content_type:?} instead of JSON")]
    NonJson { content_type: String },
    #[error("now-playing payload could not be parsed: {0}")]
    Decode(#[source] serde_json::Error),
}

impl FetchError {
    /// The payload shown in place of a real response.
    pub fn synthetic_response(&self) -> NowPlayingResponse {
        match self {
            FetchError::NonJson { .. } => NowPlayingResponse::failure(NON_JSON_MESSAGE),
            _ => NowPlayingResponse::failure(CLIENT_FETCH_FAILED_MESSAGE),
        }
    }
}

/// Polls a deployed `/api/now-playing` endpoint.
pub struct HttpNowPlayingSource {
    http: Client,
    endpoint: Url,
}

impl HttpNowPlayingSource {
    pub fn new(origin: &str) -> Result<Self, FetchError> {
        let endpoint = urls::proxy_endpoint_url(origin)?;
        let http = Client::builder()
            .user_agent(concat!("now-listening/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn try_fetch(&self, cancel: &CancelFlag) -> Result<Option<NowPlayingResponse>, FetchError> {
        let res = self.http.get(self.endpoint.clone()).send().await?;
        if cancel.is_cancelled() {
            return Ok(None);
        }

        let content_type = res
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if !content_type.contains("application/json") {
            return Err(FetchError::NonJson { content_type });
        }

        let body = res.bytes().await?;
        let parsed: NowPlayingResponse =
            serde_json::from_slice(&body).map_err(FetchError::Decode)?;
        if cancel.is_cancelled() {
            return Ok(None);
        }
        Ok(Some(parsed.sanitized()))
    }
}

#[async_trait]
impl NowPlayingSource for HttpNowPlayingSource {
    async fn fetch(&self, cancel: &CancelFlag) -> Option<NowPlayingResponse> {
        match self.try_fetch(cancel).await {
            Ok(resp) => resp,
            Err(err) => {
                if cancel.is_cancelled() {
                    return None;
                }
                warn!(error = %err, endpoint = %self.endpoint, "now-playing poll failed");
                Some(err.synthetic_response())
            }
        }
    }
}
