//! The per-request context handlers and binders work against.
//!
//! [`HttpContext`] bundles everything the dispatch core reads from a request (route values,
//! query string, headers, the single-read payload, the cancellation token and the service
//! provider) together with the response state the result processors write to.
//!
//! The context is a cheap handle: clones share the same request and the same response, so it
//! can be moved into the futures returned by asynchronous handlers.

use crate::body::{PayloadSlot, RequestBody, full_body, request_body};
use crate::error::{BodyError, BoxError, DispatchError};
use crate::services::{ServiceCollection, ServiceProvider};
use bytes::{Bytes, BytesMut};
use http::header::CONTENT_TYPE;
use http::request::Parts;
use http::{HeaderMap, HeaderName, HeaderValue, Method, Request, Response, StatusCode, Uri};
use http_body::Body as HttpBody;
use mime::Mime;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use serde::Serialize;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Clone)]
pub struct HttpContext {
    inner: Arc<Inner>,
}

struct Inner {
    head: Parts,
    route_values: RouteValues,
    query: OnceCell<QueryValues>,
    payload: PayloadSlot,
    cancellation: CancellationToken,
    services: Arc<dyn ServiceProvider>,
    response: Mutex<ResponseState>,
}

#[derive(Default)]
struct ResponseState {
    status: StatusCode,
    headers: HeaderMap,
    body: BytesMut,
}

impl HttpContext {
    pub fn builder() -> HttpContextBuilder {
        HttpContextBuilder::new()
    }

    /// Wraps a request received by the host together with the route values its router matched.
    pub fn from_request<B>(request: Request<B>, route_values: RouteValues, services: Arc<dyn ServiceProvider>) -> Self
    where
        B: HttpBody<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        let (head, body) = request.into_parts();
        Self::from_parts(head, route_values, Some(request_body(body)), CancellationToken::new(), services)
    }

    fn from_parts(
        head: Parts,
        route_values: RouteValues,
        body: Option<RequestBody>,
        cancellation: CancellationToken,
        services: Arc<dyn ServiceProvider>,
    ) -> Self {
        let inner = Inner {
            head,
            route_values,
            query: OnceCell::new(),
            payload: PayloadSlot::new(body),
            cancellation,
            services,
            response: Mutex::new(ResponseState::default()),
        };
        Self { inner: Arc::new(inner) }
    }

    pub fn method(&self) -> &Method {
        &self.inner.head.method
    }

    pub fn uri(&self) -> &Uri {
        &self.inner.head.uri
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.inner.head.headers
    }

    pub fn route_values(&self) -> &RouteValues {
        &self.inner.route_values
    }

    pub fn route_value(&self, name: &str) -> Option<&str> {
        self.inner.route_values.get(name)
    }

    /// Query string values, parsed on first access.
    pub fn query(&self) -> &QueryValues {
        self.inner.query.get_or_init(|| self.uri().query().map(QueryValues::parse).unwrap_or_default())
    }

    pub fn query_value(&self, name: &str) -> Option<&str> {
        self.query().get(name)
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.inner.cancellation
    }

    pub fn services(&self) -> &Arc<dyn ServiceProvider> {
        &self.inner.services
    }

    /// Returns whether the payload has not been read yet.
    pub async fn has_body(&self) -> bool {
        self.inner.payload.can_consume().await
    }

    /// Takes the payload out of the context, later calls return `None`.
    pub async fn take_body(&self) -> Option<RequestBody> {
        self.inner.payload.take().await
    }

    /// Reads the whole payload, at most `limit` bytes.
    pub async fn read_body(&self, limit: usize) -> Result<Bytes, BodyError> {
        self.inner.payload.read_to_bytes(limit).await
    }

    pub fn status(&self) -> StatusCode {
        self.inner.response.lock().status
    }

    pub fn set_status(&self, status: StatusCode) {
        self.inner.response.lock().status = status;
    }

    pub fn response_header(&self, name: impl http::header::AsHeaderName) -> Option<HeaderValue> {
        self.inner.response.lock().headers.get(name).cloned()
    }

    pub fn insert_response_header(&self, name: HeaderName, value: HeaderValue) {
        self.inner.response.lock().headers.insert(name, value);
    }

    /// Merges `headers` into the response headers, replacing values of the names it contains.
    pub fn extend_response_headers(&self, headers: HeaderMap) {
        self.inner.response.lock().headers.extend(headers);
    }

    /// A copy of what has been written to the response body so far.
    pub fn response_body(&self) -> Bytes {
        Bytes::copy_from_slice(&self.inner.response.lock().body)
    }

    /// Appends raw bytes to the response body.
    pub fn write_bytes(&self, bytes: &[u8]) {
        self.inner.response.lock().body.extend_from_slice(bytes);
    }

    /// Appends `text` verbatim, defaulting the content type to `text/plain; charset=utf-8`.
    pub fn write_text(&self, text: &str) {
        let mut response = self.inner.response.lock();
        if !response.headers.contains_key(CONTENT_TYPE) {
            response.headers.insert(CONTENT_TYPE, content_type(&mime::TEXT_PLAIN_UTF_8));
        }
        response.body.extend_from_slice(text.as_bytes());
    }

    /// Serializes `value` as JSON into the response body and sets `application/json`.
    pub fn write_json<T: Serialize + ?Sized>(&self, value: &T) -> Result<(), DispatchError> {
        let json = serde_json::to_vec(value)?;

        let mut response = self.inner.response.lock();
        response.headers.insert(CONTENT_TYPE, content_type(&mime::APPLICATION_JSON));
        response.body.extend_from_slice(&json);
        Ok(())
    }

    /// Moves the response state out of the context, leaving a fresh `200 OK` behind.
    pub fn take_response(&self) -> Response<Bytes> {
        let state = std::mem::take(&mut *self.inner.response.lock());

        let mut response = Response::new(state.body.freeze());
        *response.status_mut() = state.status;
        *response.headers_mut() = state.headers;
        response
    }
}

fn content_type(mime: &Mime) -> HeaderValue {
    HeaderValue::from_str(mime.as_ref()).unwrap_or_else(|_invalid| HeaderValue::from_static("application/octet-stream"))
}

impl fmt::Debug for HttpContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpContext")
            .field("method", self.method())
            .field("uri", self.uri())
            .field("route_values", self.route_values())
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

/// Builds an [`HttpContext`], mostly useful for hosts without an `http::Request` at hand and for tests.
pub struct HttpContextBuilder {
    request: http::request::Builder,
    route_values: RouteValues,
    body: Option<RequestBody>,
    cancellation: Option<CancellationToken>,
    services: Option<Arc<dyn ServiceProvider>>,
}

impl HttpContextBuilder {
    fn new() -> Self {
        Self {
            request: Request::builder(),
            route_values: RouteValues::default(),
            body: None,
            cancellation: None,
            services: None,
        }
    }

    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.request = self.request.method(method);
        self
    }

    #[must_use]
    pub fn uri<T>(mut self, uri: T) -> Self
    where
        Uri: TryFrom<T>,
        <Uri as TryFrom<T>>::Error: Into<http::Error>,
    {
        self.request = self.request.uri(uri);
        self
    }

    #[must_use]
    pub fn header<K, V>(mut self, key: K, value: V) -> Self
    where
        HeaderName: TryFrom<K>,
        <HeaderName as TryFrom<K>>::Error: Into<http::Error>,
        HeaderValue: TryFrom<V>,
        <HeaderValue as TryFrom<V>>::Error: Into<http::Error>,
    {
        self.request = self.request.header(key, value);
        self
    }

    #[must_use]
    pub fn route_value(mut self, name: impl Into<Cow<'static, str>>, value: impl Into<String>) -> Self {
        self.route_values.insert(name, value);
        self
    }

    #[must_use]
    pub fn body(mut self, bytes: impl Into<Bytes>) -> Self {
        self.body = Some(full_body(bytes));
        self
    }

    #[must_use]
    pub fn body_stream<B>(mut self, body: B) -> Self
    where
        B: HttpBody<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        self.body = Some(request_body(body));
        self
    }

    #[must_use]
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    #[must_use]
    pub fn services(mut self, services: Arc<dyn ServiceProvider>) -> Self {
        self.services = Some(services);
        self
    }

    pub fn build(self) -> Result<HttpContext, http::Error> {
        let (head, ()) = self.request.body(())?.into_parts();
        let services = self.services.unwrap_or_else(|| Arc::new(ServiceCollection::new()));

        Ok(HttpContext::from_parts(
            head,
            self.route_values,
            self.body,
            self.cancellation.unwrap_or_default(),
            services,
        ))
    }
}

impl fmt::Debug for HttpContextBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpContextBuilder").field("route_values", &self.route_values).finish_non_exhaustive()
    }
}

/// Values captured from the matched route template, e.g. `id` in `/todos/{id}`.
#[derive(Debug, Clone, Default)]
pub struct RouteValues {
    values: Vec<(Cow<'static, str>, String)>,
}

impl RouteValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `name`, replacing any previous value.
    pub fn insert(&mut self, name: impl Into<Cow<'static, str>>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.values.iter_mut().find(|(key, _)| *key == name) {
            Some((_, existing)) => *existing = value,
            None => self.values.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.iter().find(|(key, _)| key == name).map(|(_, value)| value.as_str())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(key, value)| (key.as_ref(), value.as_str()))
    }
}

impl<K, V> FromIterator<(K, V)> for RouteValues
where
    K: Into<Cow<'static, str>>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut route_values = RouteValues::new();
        for (name, value) in iter {
            route_values.insert(name, value);
        }
        route_values
    }
}

/// Decoded query string pairs, keeping repeated keys in order.
#[derive(Debug, Clone, Default)]
pub struct QueryValues {
    pairs: Vec<(String, String)>,
}

impl QueryValues {
    /// Decodes an `application/x-www-form-urlencoded` query string, a malformed string yields no values.
    pub fn parse(query: &str) -> Self {
        let pairs = serde_urlencoded::from_str::<Vec<(String, String)>>(query).unwrap_or_default();
        Self { pairs }
    }

    /// The first value of `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs.iter().find(|(key, _)| key == name).map(|(_, value)| value.as_str())
    }

    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.pairs.iter().filter(move |(key, _)| key == name).map(|(_, value)| value.as_str())
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{HttpContext, QueryValues, RouteValues};
    use http::header::CONTENT_TYPE;
    use http::{Method, StatusCode};
    use serde::Serialize;

    #[test]
    fn query_keeps_repeated_keys() {
        let query = QueryValues::parse("tag=a&page=2&tag=b&name=Ada%20Lovelace");

        assert_eq!(query.get("page"), Some("2"));
        assert_eq!(query.get("tag"), Some("a"));
        assert_eq!(query.get_all("tag").collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(query.get("name"), Some("Ada Lovelace"));
        assert_eq!(query.get("missing"), None);
    }

    #[test]
    fn route_values_replace_on_insert() {
        let mut values: RouteValues = [("id", "1"), ("slug", "intro")].into_iter().collect();
        values.insert("id", "2");

        assert_eq!(values.len(), 2);
        assert_eq!(values.get("id"), Some("2"));
        assert_eq!(values.get("slug"), Some("intro"));
    }

    #[test]
    fn context_exposes_request_parts() {
        let ctx = HttpContext::builder()
            .method(Method::POST)
            .uri("/todos/7?verbose=true")
            .header("x-request-id", "abc")
            .route_value("id", "7")
            .build()
            .unwrap();

        assert_eq!(*ctx.method(), Method::POST);
        assert_eq!(ctx.uri().path(), "/todos/7");
        assert_eq!(ctx.route_value("id"), Some("7"));
        assert_eq!(ctx.query_value("verbose"), Some("true"));
        assert_eq!(ctx.headers().get("x-request-id").unwrap(), "abc");
        assert!(!ctx.cancellation().is_cancelled());
    }

    #[derive(Serialize)]
    struct Point {
        x: i32,
        y: i32,
    }

    #[test]
    fn writers_fill_the_response() {
        let ctx = HttpContext::builder().build().unwrap();
        ctx.write_text("hello ");
        ctx.write_text("world");
        ctx.set_status(StatusCode::CREATED);

        let response = ctx.take_response();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers().get(CONTENT_TYPE).unwrap(), "text/plain; charset=utf-8");
        assert_eq!(response.body().as_ref(), b"hello world");

        ctx.write_json(&Point { x: 1, y: 2 }).unwrap();
        let response = ctx.take_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get(CONTENT_TYPE).unwrap(), "application/json");
        assert_eq!(response.body().as_ref(), br#"{"x":1,"y":2}"#);
    }

    #[tokio::test]
    async fn clones_share_the_payload() {
        let ctx = HttpContext::builder().body("payload").build().unwrap();
        let other = ctx.clone();

        assert!(other.has_body().await);
        assert_eq!(ctx.read_body(64).await.unwrap().as_ref(), b"payload");
        assert!(!other.has_body().await);
    }
}
