//! The application: a route table plus the middleware in front of it.
//!
//! Path matching is entirely [`matchit`]'s job: one radix tree per HTTP
//! method, O(path-length) lookup. This module only decides what happens
//! around a lookup: attaching parameters, answering `405` / `OPTIONS` for
//! paths registered under other methods, and running the middleware chain.

use std::collections::HashMap;
use std::sync::Arc;

use http::header::ALLOW;
use http::{HeaderValue, Method, StatusCode};
use matchit::Router as MatchitRouter;

use crate::handler::{BoxFuture, BoxedHandler, ErasedHandler, Handler};
use crate::middleware::{self, Middleware};
use crate::request::Request;
use crate::response::Response;

/// The application router.
///
/// Build it once at startup and pass it to [`Server::serve`](crate::Server::serve).
/// Every registration method returns `self`, so calls chain:
///
/// ```rust
/// use nimbus::{Request, Router};
/// use nimbus::middleware::{Cors, RequestLog};
///
/// # async fn get_user(_: Request) -> &'static str { "" }
/// # async fn create_user(_: Request) -> &'static str { "" }
/// # async fn delete_user(_: Request) -> &'static str { "" }
/// let app = Router::new()
///     .with(Cors::new())
///     .with(RequestLog::new())
///     .get("/users/{id}", get_user)
///     .post("/users", create_user)
///     .delete("/users/:id", delete_user);
/// ```
///
/// Paths use matchit syntax (`/users/{id}`, `/static/{*path}`); the
/// httprouter spellings `/users/:id` and `/static/*path` are translated.
///
/// Middleware added with [`Router::with`] wraps the whole table, so it sees
/// unmatched requests too. Each call wraps everything added before it, so
/// the last middleware added runs first.
pub struct Router {
    table: Arc<RouteTable>,
    middleware: Vec<Arc<dyn Middleware>>,
}

impl Router {
    pub fn new() -> Self {
        Self { table: Arc::new(RouteTable::default()), middleware: Vec::new() }
    }

    /// Register a handler for a method + path pair.
    ///
    /// # Panics
    ///
    /// Panics if `path` is not a valid matchit route or conflicts with a
    /// route already registered for `method`.
    pub fn on(mut self, method: Method, path: &str, handler: impl Handler) -> Self {
        let path = translate(path);
        Arc::make_mut(&mut self.table)
            .routes
            .entry(method)
            .or_default()
            .insert(path.as_str(), handler.into_boxed_handler())
            .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
        self
    }

    pub fn get(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::GET, path, handler)
    }

    pub fn post(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::POST, path, handler)
    }

    pub fn put(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::PUT, path, handler)
    }

    pub fn delete(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::DELETE, path, handler)
    }

    pub fn head(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::HEAD, path, handler)
    }

    pub fn patch(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::PATCH, path, handler)
    }

    pub fn options(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::OPTIONS, path, handler)
    }

    /// Handler for requests no route matches. Defaults to a bare `404`.
    pub fn not_found(mut self, handler: impl Handler) -> Self {
        Arc::make_mut(&mut self.table).not_found = Some(handler.into_boxed_handler());
        self
    }

    /// Wraps the router, and any middleware already added, in `middleware`.
    /// It becomes the outermost layer.
    pub fn with(mut self, middleware: impl Middleware) -> Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    /// Runs one request through the middleware chain and the route table.
    ///
    /// The server does this for every request; it is public so applications
    /// can be exercised without a socket.
    pub async fn handle(&self, req: Request) -> Response {
        self.build().call(req).await
    }

    /// The route table wrapped in every middleware, last added outermost.
    pub(crate) fn build(&self) -> BoxedHandler {
        let table: BoxedHandler = Arc::clone(&self.table) as BoxedHandler;
        middleware::wrap(&self.middleware, table)
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("methods", &self.table.routes.keys().collect::<Vec<_>>())
            .field("middleware", &self.middleware.len())
            .finish()
    }
}

// ── Route table ───────────────────────────────────────────────────────────────

#[derive(Clone, Default)]
struct RouteTable {
    routes: HashMap<Method, MatchitRouter<BoxedHandler>>,
    not_found: Option<BoxedHandler>,
}

impl RouteTable {
    fn lookup(&self, method: &Method, path: &str) -> Option<(BoxedHandler, HashMap<String, String>)> {
        let tree = self.routes.get(method)?;
        let matched = tree.at(path).ok()?;
        let handler = Arc::clone(matched.value);
        let params = matched.params.iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some((handler, params))
    }

    /// Methods with a route matching `path`, sorted, plus `OPTIONS`.
    /// Empty when no method matches.
    fn allowed(&self, path: &str) -> Vec<&str> {
        let mut allowed: Vec<&str> = self.routes.iter()
            .filter(|(_, tree)| tree.at(path).is_ok())
            .map(|(method, _)| method.as_str())
            .collect();
        if allowed.is_empty() {
            return allowed;
        }
        if !allowed.contains(&"OPTIONS") {
            allowed.push("OPTIONS");
        }
        allowed.sort_unstable();
        allowed
    }
}

impl ErasedHandler for RouteTable {
    fn call(&self, mut req: Request) -> BoxFuture {
        if let Some((handler, params)) = self.lookup(req.method(), req.path()) {
            req.set_params(params);
            return handler.call(req);
        }

        let allowed = self.allowed(req.path());
        if !allowed.is_empty() {
            let status = if *req.method() == Method::OPTIONS {
                StatusCode::OK
            } else {
                StatusCode::METHOD_NOT_ALLOWED
            };
            let mut response = Response::status(status);
            if let Ok(value) = HeaderValue::from_str(&allowed.join(", ")) {
                response.headers_mut().insert(ALLOW, value);
            }
            return Box::pin(async move { response });
        }

        match &self.not_found {
            Some(handler) => handler.call(req),
            None => Box::pin(async { Response::status(StatusCode::NOT_FOUND) }),
        }
    }
}

/// Rewrites httprouter-style `:name` and `*name` segments into matchit's
/// `{name}` and `{*name}`.
fn translate(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if let Some(name) = segment.strip_prefix(':') {
                format!("{{{name}}}")
            } else if let Some(name) = segment.strip_prefix('*') {
                format!("{{*{name}}}")
            } else {
                segment.to_owned()
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}
