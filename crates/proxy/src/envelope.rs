use http::header::{CACHE_CONTROL, CONTENT_TYPE};
use http::{HeaderValue, Response, StatusCode};
use now_listening_core::{CacheConfig, NowPlayingResponse};
use tracing::error;

pub const JSON_CONTENT_TYPE: &str = "application/json";

// Used only if serialization ever fails; keeps the response well-formed.
const FALLBACK_BODY: &str = r#"{"ok":false,"nowPlaying":false,"track":null,"message":"Failed to fetch"}"#;

pub fn cache_control(cache: &CacheConfig) -> HeaderValue {
    HeaderValue::from_str(&cache.header_value())
        .unwrap_or_else(|_| HeaderValue::from_static("s-maxage=60, stale-while-revalidate=30"))
}

pub fn to_http_response(payload: &NowPlayingResponse, cache: &CacheConfig) -> Response<String> {
    let body = serde_json::to_string(payload).unwrap_or_else(|err| {
        error!(error = %err, "failed to serialize now-playing payload");
        FALLBACK_BODY.to_string()
    });

    let mut res = Response::new(body);
    *res.status_mut() = StatusCode::OK;
    let headers = res.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
    headers.insert(CACHE_CONTROL, cache_control(cache));
    res
}

#[cfg(test)]
mod tests {
    use super::{to_http_response, FALLBACK_BODY};
    use http::header::{CACHE_CONTROL, CONTENT_TYPE};
    use http::StatusCode;
    use now_listening_core::{CacheConfig, NowPlayingResponse};

    #[test]
    fn every_payload_is_a_200_json_response() {
        for payload in [
            NowPlayingResponse::not_configured(),
            NowPlayingResponse::upstream_error(None),
            NowPlayingResponse::fetch_failed(),
            NowPlayingResponse::no_track(),
        ] {
            let res = to_http_response(&payload, &CacheConfig::default());
            assert_eq!(res.status(), StatusCode::OK);
            assert_eq!(res.headers()[CONTENT_TYPE], "application/json");
            assert_eq!(
                res.headers()[CACHE_CONTROL],
                "s-maxage=60, stale-while-revalidate=30"
            );
            let back: NowPlayingResponse = serde_json::from_str(res.body()).unwrap();
            assert_eq!(back, payload);
        }
    }

    #[test]
    fn cache_header_follows_config() {
        let cache = CacheConfig {
            s_maxage_secs: 5,
            stale_while_revalidate_secs: 0,
        };
        let res = to_http_response(&NowPlayingResponse::no_track(), &cache);
        assert_eq!(res.headers()[CACHE_CONTROL], "s-maxage=5, stale-while-revalidate=0");
    }

    #[test]
    fn fallback_body_is_a_valid_failure_payload() {
        let parsed: NowPlayingResponse = serde_json::from_str(FALLBACK_BODY).unwrap();
        assert_eq!(parsed, NowPlayingResponse::fetch_failed());
    }
}
