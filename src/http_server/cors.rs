use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

const ALLOW_METHODS: &str = "GET,POST,DELETE,OPTIONS";
const ALLOW_HEADERS: &str = "Content-Type, Authorization";

/// Origin allow-list. Listed origins are echoed back; anything else gets
/// the wildcard.
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    allowed: Arc<[String]>,
}

impl CorsPolicy {
    pub fn new(allowed: &[String]) -> Self {
        Self {
            allowed: allowed.into(),
        }
    }

    fn allow_origin<'a>(&self, origin: Option<&'a str>) -> Option<&'a str> {
        origin.filter(|o| self.allowed.iter().any(|a| a == o))
    }
}

/// Preflight requests are answered here with 200 and never reach a route.
pub async fn cors(State(policy): State<CorsPolicy>, request: Request, next: Next) -> Response {
    let echoed = request
        .headers()
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .and_then(|origin| policy.allow_origin(Some(origin)))
        .and_then(|origin| HeaderValue::from_str(origin).ok());

    let mut response = if request.method() == Method::OPTIONS {
        StatusCode::OK.into_response()
    } else {
        next.run(request).await
    };

    let headers = response.headers_mut();
    match echoed {
        Some(origin) => {
            headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
            headers.insert(header::VARY, HeaderValue::from_static("Origin"));
        }
        None => {
            headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
        }
    }
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOW_METHODS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOW_HEADERS),
    );
    response
}
