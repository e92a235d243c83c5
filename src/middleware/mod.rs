//! Middleware layer.
//!
//! A middleware sits in front of the whole route table. It receives every
//! request (matched or not), may inspect or modify it, and decides whether to
//! continue by calling [`Next::run`]. Not calling it short-circuits the
//! chain, which is how [`BasicAuth`] rejects a request.
//!
//! Each middleware added wraps everything added before it, so the last one
//! added is the outermost layer: it sees the request first and the response
//! last. Add [`Cors`] after [`BasicAuth`] and the `401` carries CORS headers
//! too; add it before and the `401` leaves without them.
//!
//! Any async closure of the right shape is a middleware:
//!
//! ```rust
//! use nimbus::{Request, Response, Router};
//! use nimbus::middleware::Next;
//!
//! let app = Router::new()
//!     .with(|req: Request, next: Next| async move {
//!         let mut response = next.run(req).await;
//!         response.headers_mut().insert("x-powered-by", "nimbus".parse().unwrap());
//!         response
//!     })
//!     .get("/", |_req: Request| async { "hello" });
//! ```
//!
//! Built-in middleware:
//! - [`Cors`]: cross-origin response headers
//! - [`BasicAuth`]: HTTP basic authentication
//! - [`Cache`]: `Cache-Control` / `Expires` response headers
//! - [`RequestLog`]: per-request tracing events with status and latency

use std::future::Future;
use std::sync::Arc;

use crate::handler::{BoxFuture, BoxedHandler, ErasedHandler};
use crate::request::Request;
use crate::response::Response;

mod basic_auth;
mod cache;
mod cors;
mod request_log;

pub use self::basic_auth::BasicAuth;
pub use self::cache::{Cache, CacheOptions};
pub use self::cors::Cors;
pub use self::request_log::{RequestLog, log_requests};

/// A request/response interceptor.
///
/// Implemented automatically for `Fn(Request, Next) -> impl Future<Output = Response>`;
/// implement it by hand for configurable middleware structs.
pub trait Middleware: Send + Sync + 'static {
    fn call(&self, req: Request, next: Next) -> BoxFuture;
}

impl<F, Fut> Middleware for F
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    fn call(&self, req: Request, next: Next) -> BoxFuture {
        Box::pin((self)(req, next))
    }
}

/// The remainder of the chain: the middleware added earlier and, last, the router.
#[derive(Clone)]
pub struct Next {
    inner: BoxedHandler,
}

impl Next {
    /// Runs the rest of the chain and returns its response.
    pub async fn run(self, req: Request) -> Response {
        self.inner.call(req).await
    }
}

impl std::fmt::Debug for Next {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Next").finish_non_exhaustive()
    }
}

/// One middleware bound to everything inside it.
struct Layer {
    middleware: Arc<dyn Middleware>,
    next: BoxedHandler,
}

impl ErasedHandler for Layer {
    fn call(&self, req: Request) -> BoxFuture {
        let next = Next { inner: Arc::clone(&self.next) };
        self.middleware.call(req, next)
    }
}

/// Wraps `inner` in each middleware in turn, so the last element ends up
/// outermost and runs first.
pub(crate) fn wrap(middleware: &[Arc<dyn Middleware>], inner: BoxedHandler) -> BoxedHandler {
    middleware.iter().fold(inner, |next, m| {
        Arc::new(Layer { middleware: Arc::clone(m), next })
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::handler::Handler;
    use std::sync::Mutex;

    fn recorder(log: Arc<Mutex<Vec<&'static str>>>, name: &'static str) -> Arc<dyn Middleware> {
        Arc::new(move |req: Request, next: Next| {
            let log = Arc::clone(&log);
            async move {
                log.lock().unwrap().push(name);
                next.run(req).await
            }
        })
    }

    #[tokio::test]
    async fn test_last_registered_runs_first() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain = vec![recorder(Arc::clone(&log), "inner"), recorder(Arc::clone(&log), "outer")];
        let endpoint = {
            let log = Arc::clone(&log);
            move |_req: Request| {
                let log = Arc::clone(&log);
                async move {
                    log.lock().unwrap().push("handler");
                    "done"
                }
            }
        };

        let handler = wrap(&chain, endpoint.into_boxed_handler());
        handler.call(Request::get("/")).await;

        assert_eq!(*log.lock().unwrap(), vec!["outer", "inner", "handler"]);
    }

    #[tokio::test]
    async fn test_short_circuit() {
        let stop: Arc<dyn Middleware> = Arc::new(|_req: Request, _next: Next| async {
            Response::status(http::StatusCode::FORBIDDEN)
        });
        let handler = wrap(&[stop], (|_req: Request| async { "unreachable" }).into_boxed_handler());
        let response = handler.call(Request::get("/")).await;
        assert_eq!(response.status_code(), http::StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_empty_chain_is_inner() {
        let handler = wrap(&[], (|_req: Request| async { "inner" }).into_boxed_handler());
        let response = handler.call(Request::get("/")).await;
        assert_eq!(&response.body()[..], b"inner");
    }
}
