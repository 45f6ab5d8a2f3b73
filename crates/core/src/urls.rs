use thiserror::Error;
use url::Url;

pub const LASTFM_API_BASE: &str = "https://ws.audioscrobbler.com/2.0/";
pub const NOW_PLAYING_PATH: &str = "/api/now-playing";

#[derive(Debug, Error)]
pub enum UrlError {
    #[error("invalid url {input:?}: {source}")]
    Parse {
        input: String,
        #[source]
        source: url::ParseError,
    },
}

fn parse(input: &str) -> Result<Url, UrlError> {
    Url::parse(input).map_err(|source| UrlError::Parse {
        input: input.to_string(),
        source,
    })
}

pub fn recent_tracks_url(
    api_base: &str,
    user: &str,
    api_key: &str,
    limit: u32,
) -> Result<Url, UrlError> {
    let mut url = parse(api_base)?;
    url.query_pairs_mut()
        .append_pair("method", "user.getRecentTracks")
        .append_pair("user", user)
        .append_pair("api_key", api_key)
        .append_pair("format", "json")
        .append_pair("limit", &limit.to_string());
    Ok(url)
}

pub fn proxy_endpoint_url(origin: &str) -> Result<Url, UrlError> {
    let base = format!("{}/", origin.trim_end_matches('/'));
    let url = parse(&base)?;
    url.join(NOW_PLAYING_PATH.trim_start_matches('/'))
        .map_err(|source| UrlError::Parse {
            input: base,
            source,
        })
}
