use std::time::Duration;

use chrono::Utc;
use http::HeaderValue;
use http::header::{CACHE_CONTROL, EXPIRES};
use serde::Deserialize;

use super::{Middleware, Next};
use crate::handler::BoxFuture;
use crate::request::Request;

/// Settings for the [`Cache`] middleware.
///
/// Deserialisable so it can live in an application's config file; `max_age`
/// is given in whole seconds there:
///
/// ```rust
/// use nimbus::middleware::CacheOptions;
///
/// let opts: CacheOptions = serde_json::from_str(
///     r#"{ "max_age": 600, "public": true, "must_revalidate": true }"#,
/// ).unwrap();
/// assert_eq!(opts.max_age.as_secs(), 600);
/// ```
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct CacheOptions {
    /// How long clients may cache the response. Zero disables the headers.
    #[serde(deserialize_with = "seconds")]
    pub max_age: Duration,
    /// `public` when set, `private` otherwise.
    pub public: bool,
    /// Adds `must-revalidate`.
    pub must_revalidate: bool,
}

fn seconds<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    u64::deserialize(deserializer).map(Duration::from_secs)
}

impl CacheOptions {
    /// The `Cache-Control` value these options describe.
    pub fn cache_control(&self) -> String {
        let mut value = format!("max-age={}", self.max_age.as_secs());
        value.push_str(if self.public { ", public" } else { ", private" });
        if self.must_revalidate {
            value.push_str(", must-revalidate");
        }
        value
    }
}

/// Adds `Cache-Control` and `Expires` headers to every response.
///
/// The `Cache-Control` value is formatted once, when the middleware is
/// built. `Expires` is stamped per response as now plus `max_age`. Headers a
/// handler has already set are kept. With a zero `max_age` this middleware
/// does nothing.
///
/// ```rust
/// use std::time::Duration;
/// use nimbus::Router;
/// use nimbus::middleware::{Cache, CacheOptions};
///
/// let app = Router::new().with(Cache::new(CacheOptions {
///     max_age: Duration::from_secs(600),
///     public: true,
///     must_revalidate: true,
/// }));
/// ```
#[derive(Clone, Debug)]
pub struct Cache {
    max_age: Duration,
    cache_control: Option<HeaderValue>,
}

impl Cache {
    pub fn new(opts: CacheOptions) -> Self {
        let cache_control = (!opts.max_age.is_zero())
            .then(|| HeaderValue::from_str(&opts.cache_control()).ok())
            .flatten();
        Self { max_age: opts.max_age, cache_control }
    }

    fn expires(&self) -> Option<HeaderValue> {
        let max_age = chrono::Duration::from_std(self.max_age).ok()?;
        let at = Utc::now().checked_add_signed(max_age)?;
        HeaderValue::from_str(&at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()).ok()
    }
}

impl Middleware for Cache {
    fn call(&self, req: Request, next: Next) -> BoxFuture {
        let Some(cache_control) = self.cache_control.clone() else {
            return Box::pin(next.run(req));
        };
        let expires = self.expires();
        Box::pin(async move {
            let mut response = next.run(req).await;
            let headers = response.headers_mut();
            headers.entry(CACHE_CONTROL).or_insert(cache_control);
            if let Some(expires) = expires {
                headers.entry(EXPIRES).or_insert(expires);
            }
            response
        })
    }
}
