//! Handler for hosting runtimes that hand over a plain `http::Request` and
//! expect an `http::Response` back (function-as-a-service style), as opposed
//! to the long-running axum server in [`crate::router`].

use crate::NowPlayingService;
use http::{Request, Response};
use tracing::debug;

/// Answers any request routed to it; the endpoint takes no parameters.
pub async fn handle<B>(service: &NowPlayingService, request: Request<B>) -> Response<String> {
    debug!(method = %request.method(), uri = %request.uri(), "now-playing request");
    service.http_response().await
}
