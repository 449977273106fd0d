use axum::{
    Router,
    body::{Body, Bytes},
    extract::{DefaultBodyLimit, State, rejection::BytesRejection},
    http::{HeaderMap, HeaderName, HeaderValue, Method, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::warn;

use crate::config::ServerSection;
use crate::error::RelayError;
use crate::provider::ByteStream;
use crate::relay::RelayService;

pub fn build_router(service: Arc<RelayService>, settings: &ServerSection) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route(&settings.route, post(medical_chat))
        .layer(DefaultBodyLimit::max(settings.max_body_bytes))
        .layer(build_cors_layer(settings))
        .with_state(service)
}

pub fn build_cors_layer(settings: &ServerSection) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            HeaderName::from_static("x-client-info"),
            HeaderName::from_static("apikey"),
            header::CONTENT_TYPE,
        ]);

    if settings.cors_origins.is_empty() || settings.cors_origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = settings
        .cors_origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(AllowOrigin::list(origins))
    }
}

async fn health_check() -> &'static str {
    "OK"
}

/// Authorization runs before the body is looked at, so an unauthenticated
/// caller gets 401 even when the body was rejected.
async fn medical_chat(
    State(service): State<Arc<RelayService>>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let auth = match service.authorize(headers.get(header::AUTHORIZATION)).await {
        Ok(auth) => auth,
        Err(err) => return err.into_response(),
    };

    let body = match body {
        Ok(body) => body,
        Err(rejection) => {
            warn!(
                user_id = %auth.caller.user_id,
                reason = %rejection.body_text(),
                "Unreadable request body"
            );
            return RelayError::invalid("body", rejection.body_text()).into_response();
        }
    };

    match service.relay(&auth, &body).await {
        Ok(stream) => event_stream(stream),
        Err(err) => err.into_response(),
    }
}

fn event_stream(stream: ByteStream) -> Response {
    (
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        Body::from_stream(stream),
    )
        .into_response()
}
