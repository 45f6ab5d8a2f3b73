use now_listening_core::{CacheConfig, LastFmConfig, NowPlayingResponse};
use now_listening_lastfm::{resolve_now_playing, Credentials, RecentTracksSource};
use std::sync::{Arc, RwLock};
use tracing::info;

pub mod envelope;
pub mod router;
pub mod serverless;

pub use router::router;

pub const API_KEY_ENV: &str = "LAST_FM_API_KEY";
pub const USER_ENV: &str = "LAST_FM_USER";

/// Where the upstream credentials come from on each request.
#[derive(Debug, Clone)]
pub enum CredentialSource {
    /// `LAST_FM_API_KEY` / `LAST_FM_USER`, falling back to config file values.
    Env {
        fallback_api_key: Option<String>,
        fallback_user: Option<String>,
    },
    Fixed(Option<Credentials>),
}

impl CredentialSource {
    pub fn from_config(cfg: &LastFmConfig) -> Self {
        CredentialSource::Env {
            fallback_api_key: cfg.api_key.clone(),
            fallback_user: cfg.user.clone(),
        }
    }

    pub fn resolve(&self) -> Option<Credentials> {
        match self {
            CredentialSource::Env {
                fallback_api_key,
                fallback_user,
            } => Credentials::from_parts(
                env_value(API_KEY_ENV).or_else(|| fallback_api_key.clone()),
                env_value(USER_ENV).or_else(|| fallback_user.clone()),
            ),
            CredentialSource::Fixed(creds) => creds.clone(),
        }
    }
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

struct Settings {
    credentials: CredentialSource,
    source: Arc<dyn RecentTracksSource>,
    cache: CacheConfig,
}

/// The now-playing endpoint independent of any HTTP framework.
///
/// Holds no per-request state; settings can be swapped while serving and
/// apply from the next request on.
pub struct NowPlayingService {
    settings: RwLock<Settings>,
}

impl NowPlayingService {
    pub fn new(
        credentials: CredentialSource,
        source: Arc<dyn RecentTracksSource>,
        cache: CacheConfig,
    ) -> Self {
        Self {
            settings: RwLock::new(Settings {
                credentials,
                source,
                cache,
            }),
        }
    }

    pub fn reconfigure(
        &self,
        credentials: CredentialSource,
        source: Arc<dyn RecentTracksSource>,
        cache: CacheConfig,
    ) {
        let mut settings = self
            .settings
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *settings = Settings {
            credentials,
            source,
            cache,
        };
        info!(cache = %cache.header_value(), "now-playing service reconfigured");
    }

    fn snapshot(&self) -> (Option<Credentials>, Arc<dyn RecentTracksSource>, CacheConfig) {
        let settings = self
            .settings
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        (
            settings.credentials.resolve(),
            Arc::clone(&settings.source),
            settings.cache,
        )
    }

    pub async fn respond(&self) -> NowPlayingResponse {
        let (creds, source, _) = self.snapshot();
        resolve_now_playing(creds.as_ref(), source.as_ref()).await
    }

    /// The full HTTP answer: always 200, JSON, edge-cacheable.
    pub async fn http_response(&self) -> http::Response<String> {
        let (creds, source, cache) = self.snapshot();
        let payload = resolve_now_playing(creds.as_ref(), source.as_ref()).await;
        envelope::to_http_response(&payload, &cache)
    }
}

#[cfg(test)]
mod tests {
    use super::{CredentialSource, API_KEY_ENV, USER_ENV};
    use now_listening_core::LastFmConfig;

    // The only test in this crate touching these variables.
    #[test]
    fn env_credentials_are_read_per_call_and_override_config() {
        let source = CredentialSource::from_config(&LastFmConfig {
            api_key: Some("file-key".to_string()),
            user: None,
            ..LastFmConfig::default()
        });

        std::env::remove_var(API_KEY_ENV);
        std::env::remove_var(USER_ENV);
        assert!(source.resolve().is_none());

        std::env::set_var(USER_ENV, "someone");
        let creds = source.resolve().unwrap();
        assert_eq!(creds.api_key, "file-key");
        assert_eq!(creds.user, "someone");

        std::env::set_var(API_KEY_ENV, "env-key");
        assert_eq!(source.resolve().unwrap().api_key, "env-key");

        std::env::set_var(USER_ENV, "  ");
        assert!(source.resolve().is_none());

        std::env::remove_var(API_KEY_ENV);
        std::env::remove_var(USER_ENV);
    }
}
