pub mod config;
pub mod model;
pub mod urls;

pub use config::{AppConfig, CacheConfig, ClientConfig, ConfigIntervals, LastFmConfig, ServerConfig};
pub use model::{
    NowPlayingResponse, TrackPayload, CLIENT_FETCH_FAILED_MESSAGE, FETCH_FAILED_MESSAGE,
    NON_JSON_MESSAGE, NOT_CONFIGURED_MESSAGE, UNKNOWN_ARTIST, UPSTREAM_ERROR_MESSAGE,
};
pub use urls::UrlError;
