//! axum middleware that gates a GraphQL executor route.
//!
//! ```ignore
//! let guard = Arc::new(QueryGuard::new(GuardConfig::default(), Schema::default())?);
//! let app = protect(Router::new().route("/graphql", post(execute)), guard);
//! ```

use crate::analyzer::AnalysisMetrics;
use crate::config::{GuardConfig, SettingsConfig};
use crate::error::{graphql_error_response, GuardError, Violation};
use crate::parser::{query_from_form, query_from_url};
use crate::sanitize::sanitize_response_body;
use crate::schema::Schema;
use crate::validator::QueryValidator;
use axum::{
    body::{to_bytes, Body, Bytes, HttpBody as _},
    extract::{Request, State},
    http::{
        header::{AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE},
        request::Parts,
        HeaderMap, HeaderName, HeaderValue, Method, StatusCode,
    },
    middleware::{from_fn_with_state, Next},
    response::{IntoResponse, Response},
    Json, Router,
};
use http_body_util::LengthLimitError;
use std::borrow::Cow;
use std::error::Error as StdError;
use std::sync::Arc;
use tracing::{debug, warn};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
const BEARER_PREFIX: &str = "Bearer ";

/// Pulls the caller's credential out of the request headers.
pub type TokenExtractor = Arc<dyn Fn(&HeaderMap) -> Option<String> + Send + Sync>;

/// Shared state of the gate: the validation policy plus the executor's schema.
pub struct QueryGuard {
    validator: QueryValidator,
    schema: Schema,
    token_extractor: TokenExtractor,
}

impl QueryGuard {
    /// Create a guard that forwards `Bearer` tokens via [`extract_bearer_token`].
    pub fn new(config: GuardConfig, schema: Schema) -> Result<Self, GuardError> {
        Ok(Self {
            validator: QueryValidator::new(config)?,
            schema,
            token_extractor: Arc::new(extract_bearer_token),
        })
    }

    /// Replace the token extractor, e.g. to read an API key header instead.
    pub fn with_token_extractor<F>(mut self, extractor: F) -> Self
    where
        F: Fn(&HeaderMap) -> Option<String> + Send + Sync + 'static,
    {
        self.token_extractor = Arc::new(extractor);
        self
    }

    pub fn validator(&self) -> &QueryValidator {
        &self.validator
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    fn settings(&self) -> &SettingsConfig {
        &self.validator.config().settings
    }
}

/// Token found by the guard's [`TokenExtractor`] (the `Authorization` bearer
/// token by default), made available to the executor as a request extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BearerToken(pub String);

/// Extract a `Bearer` token. The prefix is matched case-insensitively.
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let auth = headers.get(AUTHORIZATION)?.to_str().ok()?;
    if auth.len() <= BEARER_PREFIX.len() {
        return None;
    }

    let prefix = auth.get(..BEARER_PREFIX.len())?;
    if !prefix.eq_ignore_ascii_case(BEARER_PREFIX) {
        return None;
    }

    let token = auth[BEARER_PREFIX.len()..].trim();
    (!token.is_empty()).then(|| token.to_string())
}

/// Wrap `router` so every request passes through [`guard_middleware`].
pub fn protect<S>(router: Router<S>, guard: Arc<QueryGuard>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(from_fn_with_state(guard, guard_middleware))
}

/// Validate the request's query before it reaches the executor.
pub async fn guard_middleware(
    State(guard): State<Arc<QueryGuard>>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(token) = (guard.token_extractor)(request.headers()) {
        request.extensions_mut().insert(BearerToken(token));
    }

    let settings = guard.settings();
    if settings.debug {
        return next.run(request).await;
    }

    let (parts, body) = request.into_parts();

    if declared_length(&parts.headers).is_some_and(|len| len > settings.max_body_size) {
        return reject(
            StatusCode::PAYLOAD_TOO_LARGE,
            Violation::body_too_large(settings.max_body_size),
        );
    }

    let bytes = match to_bytes(body, settings.max_body_size).await {
        Ok(bytes) => bytes,
        Err(e) if is_length_limit(&e) => {
            return reject(
                StatusCode::PAYLOAD_TOO_LARGE,
                Violation::body_too_large(settings.max_body_size),
            );
        }
        Err(e) => {
            warn!(error = %e, "Failed to read request body");
            return reject(
                StatusCode::BAD_REQUEST,
                Violation::invalid_request("Failed to read request body"),
            );
        }
    };

    let metrics = if settings.validation {
        match request_query(&parts, &bytes) {
            Some(query) if !query.is_empty() => {
                match guard.validator.analyze(&query, &guard.schema) {
                    Ok(metrics) => Some(metrics),
                    Err(violation) => {
                        debug!(
                            method = %parts.method,
                            uri = %parts.uri,
                            code = %violation.code,
                            "Blocking GraphQL request"
                        );
                        return reject(StatusCode::BAD_REQUEST, violation);
                    }
                }
            }
            _ => None,
        }
    } else {
        None
    };

    let request = Request::from_parts(parts, Body::from(bytes));
    let mut response = next.run(request).await;

    if settings.debug_headers {
        if let Some(metrics) = &metrics {
            add_debug_headers(response.headers_mut(), metrics);
        }
    }

    if settings.sanitize_errors {
        response = sanitize_response(response, settings.max_response_size).await;
    }

    response
}

/// Query text carried by the request.
///
/// GET reads the `query` URL parameter, form posts the `query` field, and any
/// other POST hands the raw body to the validator, which unwraps a JSON envelope.
fn request_query<'a>(parts: &Parts, body: &'a Bytes) -> Option<Cow<'a, str>> {
    if parts.method == Method::GET {
        parts.uri.query().and_then(query_from_url).map(Cow::Owned)
    } else if parts.method == Method::POST {
        if is_form(&parts.headers) {
            query_from_form(body).map(Cow::Owned)
        } else {
            Some(String::from_utf8_lossy(body))
        }
    } else {
        None
    }
}

fn is_form(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with(FORM_CONTENT_TYPE))
}

fn declared_length(headers: &HeaderMap) -> Option<usize> {
    headers
        .get(CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}

/// Whether a body read failed because the size limit was hit.
fn is_length_limit(error: &axum::Error) -> bool {
    std::iter::successors(Some(error as &(dyn StdError + 'static)), |&e| e.source())
        .any(|e| e.is::<LengthLimitError>())
}

fn reject(status: StatusCode, violation: Violation) -> Response {
    (status, Json(graphql_error_response(&[violation]))).into_response()
}

fn add_debug_headers(headers: &mut HeaderMap, metrics: &AnalysisMetrics) {
    if let Some(depth) = metrics.depth {
        headers.insert(
            HeaderName::from_static("x-graphql-depth"),
            HeaderValue::from(depth),
        );
    }
    if let Some(aliases) = metrics.aliases {
        headers.insert(
            HeaderName::from_static("x-graphql-aliases"),
            HeaderValue::from(aliases),
        );
    }
    if let Some(complexity) = metrics.complexity {
        headers.insert(
            HeaderName::from_static("x-graphql-complexity"),
            HeaderValue::from(complexity),
        );
    }
}

async fn sanitize_response(response: Response, max_size: usize) -> Response {
    let (mut parts, body) = response.into_parts();

    let known_size = declared_length(&parts.headers)
        .or_else(|| body.size_hint().exact().and_then(|n| usize::try_from(n).ok()));
    if let Some(size) = known_size.filter(|&size| size > max_size) {
        debug!(size, max_size, "Executor response too large to sanitize");
        return Response::from_parts(parts, body);
    }

    let bytes = match to_bytes(body, max_size).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(error = %e, "Failed to read executor response");
            return StatusCode::BAD_GATEWAY.into_response();
        }
    };

    match sanitize_response_body(&bytes) {
        Some(sanitized) => {
            parts.headers.remove(CONTENT_LENGTH);
            Response::from_parts(parts, Body::from(sanitized))
        }
        None => Response::from_parts(parts, Body::from(bytes)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::test_util::nested;
    use axum::{http::Request as HttpRequest, routing::get, Extension};
    use futures::stream;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn execute(token: Option<Extension<BearerToken>>) -> Json<Value> {
        Json(json!({
            "data": {"hello": "Hello, World!"},
            "token": token.map(|Extension(BearerToken(t))| t),
        }))
    }

    async fn execute_with_error() -> Json<Value> {
        Json(json!({
            "errors": [{"message": "Cannot query field \"helo\" on type \"Query\". Did you mean \"hello\"?"}]
        }))
    }

    async fn execute_streamed() -> Body {
        Body::from_stream(stream::iter([
            Ok::<_, std::io::Error>(r#"{"errors": [{"message": "#),
            Ok(r#""Did you mean \"hello\"?"}]}"#),
        ]))
    }

    fn app(config: GuardConfig) -> Router {
        app_with_guard(QueryGuard::new(config, Schema::default()).unwrap())
    }

    fn app_with_guard(guard: QueryGuard) -> Router {
        let router = Router::new()
            .route("/graphql", get(execute).post(execute))
            .route("/broken", get(execute_with_error).post(execute_with_error))
            .route("/streamed", get(execute_streamed));
        protect(router, Arc::new(guard))
    }

    fn get_request(uri: &str) -> Request {
        HttpRequest::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(query: &str) -> Request {
        HttpRequest::builder()
            .method(Method::POST)
            .uri("/graphql")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(json!({ "query": query }).to_string()))
            .unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_extract_bearer_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc123"));
        assert_eq!(extract_bearer_token(&headers), Some("abc123".to_string()));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("bearer  xyz "));
        assert_eq!(extract_bearer_token(&headers), Some("xyz".to_string()));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(extract_bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwYXNz"));
        assert_eq!(extract_bearer_token(&headers), None);
    }

    #[tokio::test]
    async fn test_allowed_query_reaches_executor() {
        let response = app(GuardConfig::default())
            .oneshot(post_json("{ hello }"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["data"]["hello"], "Hello, World!");
    }

    #[tokio::test]
    async fn test_rejected_query_returns_error_envelope() {
        let response = app(GuardConfig::default())
            .oneshot(post_json(&nested(11)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "application/json"
        );
        let body = body_json(response).await;
        let errors = body["errors"].as_array().unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0]["extensions"]["code"], "DEPTH_EXCEEDED");
        assert_eq!(errors[0]["extensions"]["max"], 10);
        assert_eq!(errors[0]["extensions"]["actual"], 11);
    }

    #[tokio::test]
    async fn test_get_query_parameter_validated() {
        let request = HttpRequest::builder()
            .uri("/graphql?query=%7B%20__schema%20%7B%20types%20%7B%20name%20%7D%20%7D%20%7D")
            .body(Body::empty())
            .unwrap();
        let response = app(GuardConfig::default()).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["errors"][0]["message"], "GraphQL introspection is disabled");
    }

    #[tokio::test]
    async fn test_form_body_validated() {
        let request = HttpRequest::builder()
            .method(Method::POST)
            .uri("/graphql")
            .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
            .body(Body::from(
                "query=%7B+a%3A+x+b%3A+x+c%3A+x+d%3A+x+e%3A+x+%7D",
            ))
            .unwrap();
        let response = app(GuardConfig::default()).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["errors"][0]["extensions"]["code"], "TOO_MANY_ALIASES");
    }

    #[tokio::test]
    async fn test_raw_graphql_body_validated() {
        let request = HttpRequest::builder()
            .method(Method::POST)
            .uri("/graphql")
            .header(CONTENT_TYPE, "application/graphql")
            .body(Body::from("{ __type(name: \"User\") { name } }"))
            .unwrap();
        let response = app(GuardConfig::default()).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_malformed_query_passed_through() {
        let response = app(GuardConfig::default())
            .oneshot(post_json("{ user("))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_debug_mode_skips_validation() {
        let mut config = GuardConfig::default();
        config.settings.debug = true;
        config.settings.sanitize_errors = true;

        let response = app(config.clone())
            .oneshot(post_json("{ __schema { types { name } } }"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let request = HttpRequest::builder()
            .uri("/broken")
            .body(Body::empty())
            .unwrap();
        let body = body_json(app(config).oneshot(request).await.unwrap()).await;
        assert!(body["errors"][0]["message"]
            .as_str()
            .unwrap()
            .contains("Did you mean"));
    }

    #[tokio::test]
    async fn test_validation_disabled() {
        let mut config = GuardConfig::default();
        config.settings.validation = false;

        let response = app(config).oneshot(post_json(&nested(20))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_bearer_token_forwarded() {
        let mut request = post_json("{ hello }");
        request
            .headers_mut()
            .insert(AUTHORIZATION, HeaderValue::from_static("Bearer token123"));

        let response = app(GuardConfig::default()).oneshot(request).await.unwrap();
        let body = body_json(response).await;
        assert_eq!(body["token"], "token123");
    }

    #[tokio::test]
    async fn test_debug_headers() {
        let mut config = GuardConfig::default();
        config.settings.debug_headers = true;

        let response = app(config)
            .oneshot(post_json("{ user { name posts { title } } }"))
            .await
            .unwrap();

        assert_eq!(response.headers().get("x-graphql-depth").unwrap(), "3");
        assert_eq!(response.headers().get("x-graphql-aliases").unwrap(), "0");
        assert_eq!(response.headers().get("x-graphql-complexity").unwrap(), "9");
    }

    #[tokio::test]
    async fn test_error_suggestions_sanitized() {
        let mut config = GuardConfig::default();
        config.settings.sanitize_errors = true;

        let request = HttpRequest::builder()
            .uri("/broken")
            .body(Body::empty())
            .unwrap();
        let body = body_json(app(config).oneshot(request).await.unwrap()).await;
        assert_eq!(
            body["errors"][0]["message"],
            "Cannot query field \"helo\" on type \"Query\"."
        );
    }

    #[tokio::test]
    async fn test_body_too_large() {
        let mut config = GuardConfig::default();
        config.settings.max_body_size = 16;

        let mut request = post_json("{ hello }");
        request
            .headers_mut()
            .insert(CONTENT_LENGTH, HeaderValue::from(21u32));

        let response = app(config).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let body = body_json(response).await;
        assert_eq!(body["errors"][0]["extensions"]["code"], "INVALID_REQUEST");
    }

    #[tokio::test]
    async fn test_streamed_body_too_large() {
        let mut config = GuardConfig::default();
        config.settings.max_body_size = 16;

        let chunks = [
            Ok::<_, std::io::Error>(r#"{"query": "#),
            Ok(r#""{ hello world }"}"#),
        ];
        let request = HttpRequest::builder()
            .method(Method::POST)
            .uri("/graphql")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from_stream(stream::iter(chunks)))
            .unwrap();
        assert!(request.headers().get(CONTENT_LENGTH).is_none());

        let response = app(config).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let body = body_json(response).await;
        assert_eq!(body["errors"][0]["extensions"]["code"], "INVALID_REQUEST");
    }

    #[tokio::test]
    async fn test_oversized_response_passes_through_unsanitized() {
        let mut config = GuardConfig::default();
        config.settings.sanitize_errors = true;
        config.settings.max_response_size = 16;

        let response = app(config).oneshot(get_request("/broken")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert!(body["errors"][0]["message"]
            .as_str()
            .unwrap()
            .contains("Did you mean"));
    }

    #[tokio::test]
    async fn test_streamed_response_over_limit() {
        let mut config = GuardConfig::default();
        config.settings.sanitize_errors = true;

        let response = app(config.clone())
            .oneshot(get_request("/streamed"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["errors"][0]["message"], "");

        config.settings.max_response_size = 16;
        let response = app(config).oneshot(get_request("/streamed")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_custom_token_extractor() {
        let guard = QueryGuard::new(GuardConfig::default(), Schema::default())
            .unwrap()
            .with_token_extractor(|headers| {
                headers
                    .get("x-api-token")
                    .and_then(|value| value.to_str().ok())
                    .map(str::to_string)
            });

        let mut request = post_json("{ hello }");
        request
            .headers_mut()
            .insert("x-api-token", HeaderValue::from_static("key-42"));
        request
            .headers_mut()
            .insert(AUTHORIZATION, HeaderValue::from_static("Bearer ignored"));

        let response = app_with_guard(guard).oneshot(request).await.unwrap();
        let body = body_json(response).await;
        assert_eq!(body["token"], "key-42");
    }
}
