use http::HeaderValue;
use http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
    ACCESS_CONTROL_MAX_AGE, HeaderName,
};

use super::{Middleware, Next};
use crate::handler::BoxFuture;
use crate::request::Request;

/// Adds cross-origin resource sharing headers to every response.
///
/// The defaults allow any origin, the usual CRUD methods, and the
/// `Content-Type` / `Authorization` request headers. Headers a handler has
/// already set are left untouched, so individual routes can narrow them.
///
/// Preflight `OPTIONS` requests need no route of their own: the router
/// answers them with the path's `Allow` list and this middleware adds the
/// CORS headers on the way out.
///
/// ```rust
/// use nimbus::Router;
/// use nimbus::middleware::Cors;
///
/// let app = Router::new()
///     .with(Cors::new().allow_origin("https://app.example.com").max_age(600));
/// ```
#[derive(Clone, Debug)]
pub struct Cors {
    origin: HeaderValue,
    methods: HeaderValue,
    headers: HeaderValue,
    max_age: Option<HeaderValue>,
}

impl Default for Cors {
    fn default() -> Self {
        Self {
            origin: HeaderValue::from_static("*"),
            methods: HeaderValue::from_static("GET, POST, PUT, DELETE, OPTIONS"),
            headers: HeaderValue::from_static("Content-Type, Authorization"),
            max_age: None,
        }
    }
}

impl Cors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Value of `Access-Control-Allow-Origin`.
    #[must_use]
    pub fn allow_origin(mut self, origin: &str) -> Self {
        set(&mut self.origin, ACCESS_CONTROL_ALLOW_ORIGIN, origin);
        self
    }

    /// Value of `Access-Control-Allow-Methods`, e.g. `"GET, POST"`.
    #[must_use]
    pub fn allow_methods(mut self, methods: &str) -> Self {
        set(&mut self.methods, ACCESS_CONTROL_ALLOW_METHODS, methods);
        self
    }

    /// Value of `Access-Control-Allow-Headers`.
    #[must_use]
    pub fn allow_headers(mut self, headers: &str) -> Self {
        set(&mut self.headers, ACCESS_CONTROL_ALLOW_HEADERS, headers);
        self
    }

    /// How long, in seconds, browsers may cache a preflight result.
    #[must_use]
    pub fn max_age(mut self, seconds: u64) -> Self {
        self.max_age = Some(HeaderValue::from(seconds));
        self
    }
}

fn set(slot: &mut HeaderValue, name: HeaderName, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(v) => *slot = v,
        Err(_) => tracing::warn!(header = %name, value, "ignoring invalid cors header value"),
    }
}

impl Middleware for Cors {
    fn call(&self, req: Request, next: Next) -> BoxFuture {
        let cors = self.clone();
        Box::pin(async move {
            let mut response = next.run(req).await;
            let headers = response.headers_mut();
            headers.entry(ACCESS_CONTROL_ALLOW_ORIGIN).or_insert(cors.origin);
            headers.entry(ACCESS_CONTROL_ALLOW_METHODS).or_insert(cors.methods);
            headers.entry(ACCESS_CONTROL_ALLOW_HEADERS).or_insert(cors.headers);
            if let Some(max_age) = cors.max_age {
                headers.entry(ACCESS_CONTROL_MAX_AGE).or_insert(max_age);
            }
            response
        })
    }
}
