//! Incoming HTTP request type.

use std::collections::HashMap;
use std::net::SocketAddr;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use cookie::Cookie;
use http::{HeaderMap, Method, Uri, header};
use serde::de::DeserializeOwned;

use crate::error::Error;

/// An incoming HTTP request with its body already collected.
///
/// This is the request half of a handler's context: the head, the body, the
/// path parameters extracted by the router, and the peer address.
pub struct Request {
    parts: http::request::Parts,
    body: Bytes,
    params: HashMap<String, String>,
    remote_addr: Option<SocketAddr>,
}

impl Request {
    pub(crate) fn new(
        parts: http::request::Parts,
        body: Bytes,
        remote_addr: Option<SocketAddr>,
    ) -> Self {
        Self { parts, body, params: HashMap::new(), remote_addr }
    }

    pub fn method(&self) -> &Method { &self.parts.method }
    pub fn uri(&self) -> &Uri { &self.parts.uri }
    pub fn path(&self) -> &str { self.parts.uri.path() }
    pub fn query_string(&self) -> Option<&str> { self.parts.uri.query() }
    pub fn headers(&self) -> &HeaderMap { &self.parts.headers }
    pub fn body(&self) -> &Bytes { &self.body }

    /// The peer address. `None` for requests that did not come off a socket.
    pub fn remote_addr(&self) -> Option<SocketAddr> { self.remote_addr }

    /// Typed per-request storage, for middleware that hands data to handlers.
    pub fn extensions(&self) -> &http::Extensions { &self.parts.extensions }
    pub fn extensions_mut(&mut self) -> &mut http::Extensions { &mut self.parts.extensions }

    /// Case-insensitive header lookup. Values that are not visible ASCII are
    /// treated as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.parts.headers.get(name)?.to_str().ok()
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/users/{id}`, `req.param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub(crate) fn set_params(&mut self, params: HashMap<String, String>) {
        self.params = params;
    }

    /// Decodes the JSON body into `T`.
    ///
    /// # Errors
    ///
    /// [`Error::EmptyBody`] if the request has no body, [`Error::Json`] if
    /// the body is not valid JSON for `T`.
    pub fn bind_json<T: DeserializeOwned>(&self) -> Result<T, Error> {
        if self.body.is_empty() {
            return Err(Error::EmptyBody);
        }
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Decodes the query string into `T`. A missing query string decodes as
    /// an empty one, so all-optional structs still succeed.
    pub fn query<T: DeserializeOwned>(&self) -> Result<T, Error> {
        Ok(serde_urlencoded::from_str(self.query_string().unwrap_or(""))?)
    }

    /// Every cookie sent with the request, across all `Cookie` headers.
    /// Malformed pairs are skipped.
    pub fn cookies(&self) -> impl Iterator<Item = Cookie<'_>> + '_ {
        self.parts
            .headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(Cookie::split_parse)
            .filter_map(Result::ok)
    }

    /// Returns the first cookie named `name`.
    ///
    /// # Errors
    ///
    /// [`Error::CookieNotFound`] if no such cookie was sent.
    pub fn cookie(&self, name: &str) -> Result<Cookie<'static>, Error> {
        self.cookies()
            .find(|c| c.name() == name)
            .map(Cookie::into_owned)
            .ok_or_else(|| Error::CookieNotFound(name.to_owned()))
    }

    /// Username and password from an `Authorization: Basic` header.
    ///
    /// `None` when the header is missing, uses another scheme, is not valid
    /// base64, or has no `:` separator.
    pub fn basic_auth(&self) -> Option<(String, String)> {
        let value = self.header(header::AUTHORIZATION.as_str())?;
        let (scheme, encoded) = value.split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("basic") {
            return None;
        }
        let decoded = STANDARD.decode(encoded.trim()).ok()?;
        let decoded = String::from_utf8(decoded).ok()?;
        let (user, pass) = decoded.split_once(':')?;
        Some((user.to_owned(), pass.to_owned()))
    }

    #[cfg(test)]
    pub(crate) fn get(uri: &str) -> Self {
        http::Request::get(uri)
            .body(Bytes::new())
            .expect("valid test request")
            .into()
    }
}

/// Builds a request without a peer address, e.g. for [`Router::handle`](crate::Router::handle) in tests.
impl From<http::Request<Bytes>> for Request {
    fn from(req: http::Request<Bytes>) -> Self {
        let (parts, body) = req.into_parts();
        Self::new(parts, body, None)
    }
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.parts.method)
            .field("uri", &self.parts.uri)
            .field("params", &self.params)
            .field("body_len", &self.body.len())
            .finish()
    }
}
