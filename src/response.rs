//! Outgoing HTTP response type and the [`IntoResponse`] conversion trait.
//!
//! Build a [`Response`] in your handler and return it. Middleware gets the
//! same type back from [`Next::run`](crate::middleware::Next::run) and may
//! adjust headers before passing it on.

use std::fmt::Display;

use bytes::Bytes;
use cookie::Cookie;
use http::header::{self, HeaderName, HeaderValue};
use http::{HeaderMap, StatusCode};
use http_body_util::Full;
use serde::Serialize;

// ── ContentType ───────────────────────────────────────────────────────────────

/// Common content-type values for use with [`ResponseBuilder::bytes`].
#[derive(Clone, Copy, Debug)]
pub enum ContentType {
    Html,         // text/html; charset=utf-8
    Json,         // application/json
    OctetStream,  // application/octet-stream
    Text,         // text/plain; charset=utf-8
    Xml,          // application/xml
}

impl ContentType {
    fn as_str(self) -> &'static str {
        match self {
            Self::Html        => "text/html; charset=utf-8",
            Self::Json        => "application/json",
            Self::OctetStream => "application/octet-stream",
            Self::Text        => "text/plain; charset=utf-8",
            Self::Xml         => "application/xml",
        }
    }
}

// ── Response ─────────────────────────────────────────────────────────────────

/// An outgoing HTTP response.
///
/// # Shortcuts
///
/// ```rust
/// use nimbus::Response;
/// use nimbus::http::StatusCode;
///
/// Response::text("hello");
/// Response::display(42);
/// Response::json(&serde_json::json!({ "id": 1 }));
/// Response::status(StatusCode::NO_CONTENT);
/// Response::redirect("/login", StatusCode::FOUND);
/// ```
///
/// # Builder (custom status or headers)
///
/// ```rust
/// use nimbus::{ContentType, Response};
/// use nimbus::http::StatusCode;
///
/// Response::builder()
///     .status(StatusCode::CREATED)
///     .header("location", "/users/42")
///     .json(&serde_json::json!({ "id": 42 }));
///
/// Response::builder().bytes(ContentType::Xml, b"<ok/>".to_vec());
/// ```
#[derive(Debug)]
pub struct Response {
    inner: http::Response<Bytes>,
}

impl Response {
    /// `200 OK`: `text/plain; charset=utf-8`.
    pub fn text(body: impl Into<String>) -> Self {
        Self::builder().text(body)
    }

    /// Alias of [`Response::text`].
    pub fn string(body: impl Into<String>) -> Self {
        Self::text(body)
    }

    /// `200 OK`: any [`Display`] value written as plain text.
    pub fn display(value: impl Display) -> Self {
        Self::text(value.to_string())
    }

    /// `200 OK`: `application/json`, body is `value` encoded by serde_json
    /// and terminated by a newline. Serialisation failure yields a bodiless
    /// `500 Internal Server Error`.
    ///
    /// Strings are escaped only as JSON requires: `<`, `>` and `&` are
    /// written as-is, not as `\u003c` style escapes.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Self {
        Self::builder().json(value)
    }

    /// Response with no body.
    pub fn status(code: StatusCode) -> Self {
        Self::builder().status(code).no_body()
    }

    /// A bodiless response pointing the client at `location`.
    ///
    /// `location` is sent verbatim, so a relative path is resolved by the
    /// client against the request URL. No HTML link body is written.
    /// `code` is used as given; pass a 3xx status such as
    /// [`StatusCode::FOUND`] or [`StatusCode::SEE_OTHER`].
    pub fn redirect(location: &str, code: StatusCode) -> Self {
        Self::builder()
            .status(code)
            .header(header::LOCATION.as_str(), location)
            .no_body()
    }

    /// Builder for responses that need a custom status or extra headers.
    pub fn builder() -> ResponseBuilder {
        ResponseBuilder { headers: HeaderMap::new(), status: StatusCode::OK }
    }

    pub fn status_code(&self) -> StatusCode { self.inner.status() }
    pub fn set_status(&mut self, code: StatusCode) { *self.inner.status_mut() = code; }
    pub fn headers(&self) -> &HeaderMap { self.inner.headers() }
    pub fn headers_mut(&mut self) -> &mut HeaderMap { self.inner.headers_mut() }
    pub fn body(&self) -> &Bytes { self.inner.body() }

    /// First value of the named header, if it is visible ASCII.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.inner.headers().get(name)?.to_str().ok()
    }

    /// Sets (replacing) a header. Names or values that are not valid HTTP
    /// are dropped with a warning.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        insert_header(self.inner.headers_mut(), name, value);
        self
    }

    /// Appends a `Set-Cookie` header for `cookie`.
    pub fn add_cookie(&mut self, cookie: &Cookie<'_>) {
        match HeaderValue::try_from(cookie.to_string()) {
            Ok(value) => {
                self.inner.headers_mut().append(header::SET_COOKIE, value);
            }
            Err(_) => tracing::warn!(cookie = cookie.name(), "dropping unencodable cookie"),
        }
    }

    /// Appends a `Set-Cookie` header for `cookie` and returns `self`.
    #[must_use]
    pub fn with_cookie(mut self, cookie: Cookie<'_>) -> Self {
        self.add_cookie(&cookie);
        self
    }

    pub(crate) fn into_inner(self) -> http::Response<Full<Bytes>> {
        self.inner.map(Full::new)
    }
}

fn insert_header(headers: &mut HeaderMap, name: &str, value: &str) {
    match (HeaderName::try_from(name), HeaderValue::try_from(value)) {
        (Ok(name), Ok(value)) => {
            headers.insert(name, value);
        }
        _ => tracing::warn!(header = name, "dropping invalid header"),
    }
}

// ── ResponseBuilder ───────────────────────────────────────────────────────────

/// Fluent builder for [`Response`].
///
/// Obtain via [`Response::builder()`]. Defaults to `200 OK`.
/// Terminated by a typed body method, so the content type is always set.
#[derive(Debug)]
pub struct ResponseBuilder {
    headers: HeaderMap,
    status: StatusCode,
}

impl ResponseBuilder {
    pub fn status(mut self, code: StatusCode) -> Self {
        self.status = code;
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        insert_header(&mut self.headers, name, value);
        self
    }

    /// Terminate with a JSON body (`application/json`).
    pub fn json<T: Serialize + ?Sized>(self, value: &T) -> Response {
        match serde_json::to_vec(value) {
            Ok(mut body) => {
                body.push(b'\n');
                self.finish(ContentType::Json, body)
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to encode json response");
                Response::status(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }

    /// Terminate with a plain-text body (`text/plain; charset=utf-8`).
    pub fn text(self, body: impl Into<String>) -> Response {
        self.finish(ContentType::Text, body.into().into_bytes())
    }

    /// Terminate with a typed body. Use this for HTML, XML, binary, etc.
    pub fn bytes(self, content_type: ContentType, body: impl Into<Bytes>) -> Response {
        self.finish(content_type, body)
    }

    /// Terminate with no body (e.g. `204 No Content`, redirects).
    pub fn no_body(self) -> Response {
        self.build(Bytes::new())
    }

    fn finish(mut self, content_type: ContentType, body: impl Into<Bytes>) -> Response {
        self.headers
            .entry(header::CONTENT_TYPE)
            .or_insert(HeaderValue::from_static(content_type.as_str()));
        self.build(body.into())
    }

    fn build(self, body: Bytes) -> Response {
        let mut inner = http::Response::new(body);
        *inner.status_mut() = self.status;
        *inner.headers_mut() = self.headers;
        Response { inner }
    }
}

// ── IntoResponse ──────────────────────────────────────────────────────────────

/// Conversion into an HTTP [`Response`].
///
/// Implement on your own types to return them directly from handlers.
pub trait IntoResponse {
    fn into_response(self) -> Response;
}

impl IntoResponse for Response {
    fn into_response(self) -> Response { self }
}

impl IntoResponse for &'static str {
    fn into_response(self) -> Response { Response::text(self) }
}

impl IntoResponse for String {
    fn into_response(self) -> Response { Response::text(self) }
}

/// Return a status directly from a handler: `return StatusCode::NOT_FOUND`
impl IntoResponse for StatusCode {
    fn into_response(self) -> Response { Response::status(self) }
}

/// Overrides the status of any other response: `(StatusCode::CREATED, Json(user))`
impl<R: IntoResponse> IntoResponse for (StatusCode, R) {
    fn into_response(self) -> Response {
        let mut response = self.1.into_response();
        response.set_status(self.0);
        response
    }
}

impl<T: IntoResponse, E: IntoResponse> IntoResponse for Result<T, E> {
    fn into_response(self) -> Response {
        match self {
            Ok(value) => value.into_response(),
            Err(err) => err.into_response(),
        }
    }
}

/// A serde-serialisable value sent as `application/json`.
///
/// ```rust
/// use nimbus::{Json, Request};
///
/// #[derive(serde::Serialize)]
/// struct User { id: u64, name: String }
///
/// async fn get_user(_req: Request) -> Json<User> {
///     Json(User { id: 1, name: "alice".into() })
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response { Response::json(&self.0) }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_text() {
        let response = Response::text("hello world");
        assert_eq!(response.status_code(), StatusCode::OK);
        assert_eq!(response.header("content-type"), Some("text/plain; charset=utf-8"));
        assert_eq!(&response.body()[..], b"hello world");
    }

    #[test]
    fn test_display() {
        assert_eq!(&Response::display(12345).body()[..], b"12345");
    }

    #[test]
    fn test_json_has_trailing_newline() {
        let mut data = BTreeMap::new();
        data.insert("baz", serde_json::json!(123));
        data.insert("foo", serde_json::json!("bar"));
        let response = Response::json(&data);
        assert_eq!(response.header("content-type"), Some("application/json"));
        assert_eq!(&response.body()[..], b"{\"baz\":123,\"foo\":\"bar\"}\n");
    }

    #[test]
    fn test_json_encode_failure() {
        // Non-string map keys cannot be encoded as JSON object keys.
        let mut data = BTreeMap::new();
        data.insert(vec![1u8], 1);
        let response = Response::json(&data);
        assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_redirect() {
        let response = Response::redirect("https://example.com/", StatusCode::MOVED_PERMANENTLY);
        assert_eq!(response.status_code(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(response.header("location"), Some("https://example.com/"));
        assert!(response.body().is_empty());
    }

    #[test]
    fn test_builder_keeps_explicit_content_type() {
        let response = Response::builder()
            .status(StatusCode::CREATED)
            .header("content-type", "application/vnd.api+json")
            .json(&serde_json::json!({}));
        assert_eq!(response.status_code(), StatusCode::CREATED);
        assert_eq!(response.header("content-type"), Some("application/vnd.api+json"));
    }

    #[test]
    fn test_invalid_header_dropped() {
        let response = Response::text("x").with_header("bad header", "v");
        assert_eq!(response.headers().len(), 1);
    }

    #[test]
    fn test_set_cookies_append() {
        let response = Response::text("ok")
            .with_cookie(Cookie::new("a", "1"))
            .with_cookie(Cookie::build(("b", "2")).path("/").http_only(true).build());
        let cookies: Vec<_> = response
            .headers()
            .get_all("set-cookie")
            .iter()
            .map(|v| v.to_str().unwrap().to_owned())
            .collect();
        assert_eq!(cookies, vec!["a=1", "b=2; HttpOnly; Path=/"]);
    }

    #[test]
    fn test_tuple_overrides_status() {
        let response = (StatusCode::ACCEPTED, "queued").into_response();
        assert_eq!(response.status_code(), StatusCode::ACCEPTED);
        assert_eq!(&response.body()[..], b"queued");
    }
}
