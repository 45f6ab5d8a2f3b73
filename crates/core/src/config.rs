use crate::urls::LASTFM_API_BASE;
use serde::{Deserialize, Serialize};

fn default_schema_version() -> u32 {
    1
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LastFmConfig {
    /// Fallback for `LAST_FM_API_KEY`.
    pub api_key: Option<String>,
    /// Fallback for `LAST_FM_USER`.
    pub user: Option<String>,
    pub api_base: String,
    /// 0 leaves the HTTP client's default in place.
    pub request_timeout_ms: u64,
}

impl Default for LastFmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            user: None,
            api_base: LASTFM_API_BASE.to_string(),
            request_timeout_ms: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8787".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CacheConfig {
    pub s_maxage_secs: u64,
    pub stale_while_revalidate_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            s_maxage_secs: 60,
            stale_while_revalidate_secs: 30,
        }
    }
}

impl CacheConfig {
    pub fn header_value(&self) -> String {
        format!(
            "s-maxage={}, stale-while-revalidate={}",
            self.s_maxage_secs, self.stale_while_revalidate_secs
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ClientConfig {
    /// Origin serving `/api/now-playing`.
    pub endpoint: String,
    pub refresh_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8787".to_string(),
            refresh_ms: 60_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ConfigIntervals {
    pub file_watch_poll_ms: u64,
}

impl Default for ConfigIntervals {
    fn default() -> Self {
        Self {
            file_watch_poll_ms: 10_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub lastfm: LastFmConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub intervals: ConfigIntervals,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            log_level: default_log_level(),
            lastfm: LastFmConfig::default(),
            server: ServerConfig::default(),
            cache: CacheConfig::default(),
            client: ClientConfig::default(),
            intervals: ConfigIntervals::default(),
        }
    }
}
