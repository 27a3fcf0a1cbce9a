//! # Middleware Chain
//!
//! Ordered request decorators applied to every REST route.
//!
//! ## Stage Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  request                                                                │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  Correlation  ── read/generate X-Correlation-ID, echo on response       │
//! │     ▼                                                                   │
//! │  Logging      ── one event: method, path, correlation_id                │
//! │     ▼                                                                   │
//! │  Timing       ── wall-clock duration + status after the call returns    │
//! │     ▼                                                                   │
//! │  Auth         ── Bearer JWT (HMAC); 401 stops the chain here            │
//! │     ▼                                                                   │
//! │  ResponseCache── GET /{id}: hit → cached body; miss → store 200s        │
//! │     ▼                                                                   │
//! │  handler                                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The first stage added to a [`MiddlewareChain`] is the outermost. A stage
//! that rejects writes its own response and never calls the next one.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::{to_bytes, Body};
use axum::extract::{Request, State};
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method, StatusCode};
use axum::middleware::{from_fn, from_fn_with_state, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::MethodRouter;
use roster_db::CacheStore;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::auth::JwtManager;

/// Header (and gRPC metadata key) carrying the correlation ID.
pub const CORRELATION_HEADER: &str = "x-correlation-id";

/// Largest response body the response cache will buffer.
const MAX_CACHED_BODY: usize = 1024 * 1024;

/// Request-scoped correlation ID, stored in request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationId(pub String);

impl CorrelationId {
    /// Uses `incoming` when it is a non-empty value, otherwise a fresh UUID.
    pub fn from_incoming(incoming: Option<&str>) -> Self {
        match incoming.map(str::trim).filter(|v| !v.is_empty()) {
            Some(id) => CorrelationId(id.to_string()),
            None => CorrelationId(Uuid::new_v4().to_string()),
        }
    }
}

fn correlation_of(req: &Request) -> String {
    req.extensions()
        .get::<CorrelationId>()
        .map(|c| c.0.clone())
        .unwrap_or_else(|| "-".to_string())
}

// =============================================================================
// Chain
// =============================================================================

/// Byte store and lifetime for cached GET responses.
#[derive(Clone)]
pub struct ResponseCache {
    store: Arc<dyn CacheStore>,
    ttl: Duration,
}

impl ResponseCache {
    pub fn new(store: Arc<dyn CacheStore>, ttl: Duration) -> Self {
        ResponseCache { store, ttl }
    }

    /// Drops the cached body for `id` after a write through any transport.
    pub async fn invalidate(&self, id: &str) {
        if let Err(e) = self.store.delete(id).await {
            warn!(key = %id, error = %e, "Response cache invalidation failed");
        }
    }
}

/// One decorator in a [`MiddlewareChain`].
#[derive(Clone)]
pub enum Stage {
    Correlation,
    Logging,
    Timing,
    Auth(Arc<JwtManager>),
    ResponseCache(ResponseCache),
}

/// Ordered list of stages, applied at route registration.
///
/// ## Usage
/// ```rust,ignore
/// let chain = MiddlewareChain::new()
///     .with(Stage::Correlation)
///     .with(Stage::Logging)
///     .with(Stage::Timing)
///     .with(Stage::Auth(jwt));
///
/// let router = Router::new().route("/positions", chain.apply(get(list).post(create)));
/// ```
#[derive(Clone, Default)]
pub struct MiddlewareChain {
    stages: Vec<Stage>,
}

impl MiddlewareChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `stage` inside every stage added so far.
    pub fn with(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    /// Appends `stage` when present.
    pub fn with_optional(self, stage: Option<Stage>) -> Self {
        match stage {
            Some(stage) => self.with(stage),
            None => self,
        }
    }

    /// The standard chain: correlation → logging → timing → auth.
    pub fn standard(jwt: Arc<JwtManager>) -> Self {
        MiddlewareChain::new()
            .with(Stage::Correlation)
            .with(Stage::Logging)
            .with(Stage::Timing)
            .with(Stage::Auth(jwt))
    }

    /// Wraps `route` so the first stage runs first.
    pub fn apply<S>(&self, route: MethodRouter<S>) -> MethodRouter<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        // `layer` wraps from the outside, so the innermost stage goes on first.
        self.stages
            .iter()
            .rev()
            .fold(route, |route, stage| stage.wrap(route))
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl Stage {
    fn wrap<S>(&self, route: MethodRouter<S>) -> MethodRouter<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        match self {
            Stage::Correlation => route.layer(from_fn(correlation)),
            Stage::Logging => route.layer(from_fn(logging)),
            Stage::Timing => route.layer(from_fn(timing)),
            Stage::Auth(jwt) => route.layer(from_fn_with_state(jwt.clone(), authenticate)),
            Stage::ResponseCache(cache) => {
                route.layer(from_fn_with_state(cache.clone(), response_cache))
            }
        }
    }
}

// =============================================================================
// Stages
// =============================================================================

/// Assigns the correlation ID and echoes it on the response.
pub async fn correlation(mut req: Request, next: Next) -> Response {
    let incoming = req
        .headers()
        .get(CORRELATION_HEADER)
        .and_then(|v| v.to_str().ok());
    let id = CorrelationId::from_incoming(incoming);
    let echoed = HeaderValue::from_str(&id.0).ok();

    req.extensions_mut().insert(id);
    let mut response = next.run(req).await;

    if let Some(value) = echoed {
        response.headers_mut().insert(CORRELATION_HEADER, value);
    }
    response
}

/// Logs each request once on the way in.
pub async fn logging(req: Request, next: Next) -> Response {
    info!(
        method = %req.method(),
        path = %req.uri().path(),
        correlation_id = %correlation_of(&req),
        "Request received"
    );
    next.run(req).await
}

/// Logs how long the rest of the chain took.
pub async fn timing(req: Request, next: Next) -> Response {
    let started = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let correlation_id = correlation_of(&req);

    let response = next.run(req).await;

    info!(
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        correlation_id = %correlation_id,
        "Request completed"
    );
    response
}

/// Rejects requests without a valid bearer token.
pub async fn authenticate(State(jwt): State<Arc<JwtManager>>, mut req: Request, next: Next) -> Response {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    match jwt.authorize(header) {
        Ok(claims) => {
            req.extensions_mut().insert(claims);
            next.run(req).await
        }
        Err(err) => {
            warn!(
                path = %req.uri().path(),
                correlation_id = %correlation_of(&req),
                reason = %err,
                "Rejected unauthenticated request"
            );
            err.into_response()
        }
    }
}

/// Cache key for a path: its trailing segment (the entity ID).
fn cache_key(path: &str) -> Option<&str> {
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty())
}

/// Serves GETs from the cache and keeps it fresh.
///
/// Writes (PUT/DELETE) on the same path drop the cached body once they
/// succeed.
pub async fn response_cache(State(cache): State<ResponseCache>, req: Request, next: Next) -> Response {
    let Some(key) = cache_key(req.uri().path()).map(str::to_string) else {
        return next.run(req).await;
    };

    if req.method() != Method::GET {
        let response = next.run(req).await;
        if response.status().is_success() {
            cache.invalidate(&key).await;
        }
        return response;
    }

    match cache.store.get(&key).await {
        Ok(Some(bytes)) => {
            debug!(key = %key, "Response cache hit");
            return (StatusCode::OK, [(CONTENT_TYPE, "application/json")], bytes).into_response();
        }
        Ok(None) => {}
        Err(e) => warn!(key = %key, error = %e, "Response cache read failed"),
    }

    let response = next.run(req).await;
    if response.status() != StatusCode::OK {
        return response;
    }

    let (parts, body) = response.into_parts();
    let bytes = match to_bytes(body, MAX_CACHED_BODY).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(key = %key, error = %e, "Response body could not be buffered");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    if let Err(e) = cache.store.set(&key, &bytes, cache.ttl).await {
        warn!(key = %key, error = %e, "Response cache write failed");
    }
    Response::from_parts(parts, Body::from(bytes))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::routing::get;
    use axum::{Extension, Router};
    use roster_db::CacheError;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tower::ServiceExt;

    const SECRET: &str = "test-secret";

    #[derive(Default)]
    struct MapCache {
        entries: Mutex<HashMap<String, Vec<u8>>>,
    }

    #[async_trait]
    impl CacheStore for MapCache {
        async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
            Ok(self.entries.lock().unwrap().get(key).cloned())
        }

        async fn set(&self, key: &str, value: &[u8], _ttl: Duration) -> Result<(), CacheError> {
            self.entries.lock().unwrap().insert(key.to_string(), value.to_vec());
            Ok(())
        }

        async fn delete(&self, key: &str) -> Result<(), CacheError> {
            self.entries.lock().unwrap().remove(key);
            Ok(())
        }
    }

    fn jwt() -> Arc<JwtManager> {
        Arc::new(JwtManager::new(SECRET))
    }

    fn bearer() -> String {
        let token = jwt().issue_token("tester", chrono::Duration::hours(1)).unwrap();
        format!("Bearer {}", token)
    }

    async fn echo_correlation(Extension(id): Extension<CorrelationId>) -> String {
        id.0
    }

    fn request(method: Method, uri: &str) -> axum::http::request::Builder {
        Request::builder().method(method).uri(uri)
    }

    async fn body_string(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), MAX_CACHED_BODY).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_correlation_generated_and_echoed() {
        let chain = MiddlewareChain::new().with(Stage::Correlation);
        let app: Router = Router::new().route("/echo", chain.apply(get(echo_correlation)));

        let response = app
            .oneshot(request(Method::GET, "/echo").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let header = response.headers()[CORRELATION_HEADER].to_str().unwrap().to_string();
        assert!(Uuid::parse_str(&header).is_ok());
        assert_eq!(body_string(response).await, header);
    }

    #[tokio::test]
    async fn test_correlation_propagated() {
        let chain = MiddlewareChain::new().with(Stage::Correlation).with(Stage::Logging);
        let app: Router = Router::new().route("/echo", chain.apply(get(echo_correlation)));

        let response = app
            .oneshot(
                request(Method::GET, "/echo")
                    .header(CORRELATION_HEADER, "abc-123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.headers()[CORRELATION_HEADER], "abc-123");
        assert_eq!(body_string(response).await, "abc-123");
    }

    #[tokio::test]
    async fn test_auth_rejects_before_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let handler = get(move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                "ok"
            }
        });
        let app: Router = Router::new().route("/secure", MiddlewareChain::standard(jwt()).apply(handler));

        let cases = [
            (None, "Authorization header required"),
            (Some("Token abc".to_string()), "Bearer token required"),
            (Some("Bearer not-a-jwt".to_string()), "Invalid token"),
        ];
        for (header, message) in cases {
            let mut builder = request(Method::GET, "/secure");
            if let Some(header) = header {
                builder = builder.header(AUTHORIZATION, header);
            }
            let response = app
                .clone()
                .oneshot(builder.body(Body::empty()).unwrap())
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
            // Correlation sits outside auth, so rejections still carry it.
            assert!(response.headers().contains_key(CORRELATION_HEADER));
            let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
            assert_eq!(body["code"], "UNAUTHORIZED");
            assert_eq!(body["message"], message);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let response = app
            .oneshot(
                request(Method::GET, "/secure")
                    .header(AUTHORIZATION, bearer())
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_response_cache_hit_skips_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let handler = get(move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                axum::Json(serde_json::json!({ "id": "p-1" }))
            }
        })
        .delete(|| async { StatusCode::NO_CONTENT });

        let store = Arc::new(MapCache::default());
        let chain = MiddlewareChain::new()
            .with(Stage::Correlation)
            .with(Stage::ResponseCache(ResponseCache::new(store.clone(), Duration::from_secs(60))));
        let app: Router = Router::new().route("/positions/{id}", chain.apply(handler));

        for _ in 0..2 {
            let response = app
                .clone()
                .oneshot(request(Method::GET, "/positions/p-1").body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
            assert_eq!(body_string(response).await, r#"{"id":"p-1"}"#);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(store.entries.lock().unwrap().contains_key("p-1"));

        let response = app
            .oneshot(request(Method::DELETE, "/positions/p-1").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(store.entries.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_response_cache_skips_non_200() {
        let store = Arc::new(MapCache::default());
        let chain = MiddlewareChain::new()
            .with(Stage::ResponseCache(ResponseCache::new(store.clone(), Duration::from_secs(60))));
        let app: Router = Router::new().route(
            "/positions/{id}",
            chain.apply(get(|| async { StatusCode::NOT_FOUND })),
        );

        let response = app
            .oneshot(request(Method::GET, "/positions/missing").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(store.entries.lock().unwrap().is_empty());
    }

    #[test]
    fn test_cache_key_is_trailing_segment() {
        assert_eq!(cache_key("/positions/abc"), Some("abc"));
        assert_eq!(cache_key("/employees/abc/"), Some("abc"));
        assert_eq!(cache_key("/"), None);
    }
}
