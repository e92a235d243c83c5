use http::header::WWW_AUTHENTICATE;
use http::{HeaderValue, StatusCode};
use subtle::ConstantTimeEq;

use super::{Middleware, Next};
use crate::handler::BoxFuture;
use crate::request::Request;
use crate::response::Response;

/// HTTP basic authentication against a single username/password pair.
///
/// Requests without valid credentials are answered with `401 Unauthorized`
/// and a `WWW-Authenticate` challenge; the rest of the chain does not run.
///
/// ```rust
/// use nimbus::Router;
/// use nimbus::middleware::BasicAuth;
///
/// let app = Router::new().with(BasicAuth::new("admin", "hunter2").realm("Admin area"));
/// ```
#[derive(Clone)]
pub struct BasicAuth {
    username: String,
    password: String,
    challenge: HeaderValue,
}

impl BasicAuth {
    /// Accepts exactly `username` / `password`, realm `Restricted`.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            challenge: HeaderValue::from_static(r#"Basic realm="Restricted""#),
        }
    }

    /// Sets the realm sent in the challenge. Realms containing `"` or
    /// non-visible characters are ignored.
    #[must_use]
    pub fn realm(mut self, realm: &str) -> Self {
        let challenge = HeaderValue::from_str(&format!(r#"Basic realm="{realm}""#));
        match challenge {
            Ok(challenge) if !realm.contains('"') => self.challenge = challenge,
            _ => tracing::warn!(realm, "ignoring invalid basic auth realm"),
        }
        self
    }

    fn accepts(&self, req: &Request) -> bool {
        let Some((user, pass)) = req.basic_auth() else {
            return false;
        };
        // Evaluate both so a wrong username costs the same as a wrong password.
        let user_ok = user.as_bytes().ct_eq(self.username.as_bytes());
        let pass_ok = pass.as_bytes().ct_eq(self.password.as_bytes());
        bool::from(user_ok & pass_ok)
    }
}

impl std::fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicAuth")
            .field("username", &self.username)
            .field("challenge", &self.challenge)
            .finish_non_exhaustive()
    }
}

impl Middleware for BasicAuth {
    fn call(&self, req: Request, next: Next) -> BoxFuture {
        if self.accepts(&req) {
            return Box::pin(next.run(req));
        }

        tracing::debug!(path = req.path(), "rejecting unauthenticated request");
        let mut response = Response::builder()
            .status(StatusCode::UNAUTHORIZED)
            .text("Unauthorized\n");
        response
            .headers_mut()
            .insert(WWW_AUTHENTICATE, self.challenge.clone());
        Box::pin(async move { response })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::Router;
    use crate::middleware::Cors;
    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD;
    use bytes::Bytes;

    fn app(auth: BasicAuth) -> Router {
        Router::new()
            .with(auth)
            .get("/secret", |_req: Request| async { "the treasure" })
    }

    fn with_credentials(user: &str, pass: &str) -> Request {
        let token = STANDARD.encode(format!("{user}:{pass}"));
        http::Request::get("/secret")
            .header("authorization", format!("Basic {token}"))
            .body(Bytes::new())
            .unwrap()
            .into()
    }

    #[tokio::test]
    async fn test_accepts_valid_credentials() {
        let response = app(BasicAuth::new("admin", "hunter2"))
            .handle(with_credentials("admin", "hunter2"))
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);
        assert_eq!(&response.body()[..], b"the treasure");
    }

    #[tokio::test]
    async fn test_rejects_missing_credentials() {
        let response = app(BasicAuth::new("admin", "hunter2"))
            .handle(Request::get("/secret"))
            .await;
        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.header("www-authenticate"), Some(r#"Basic realm="Restricted""#));
        assert_eq!(&response.body()[..], b"Unauthorized\n");
    }

    #[tokio::test]
    async fn test_rejects_wrong_password() {
        let response = app(BasicAuth::new("admin", "hunter2"))
            .handle(with_credentials("admin", "hunter3"))
            .await;
        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

        let response = app(BasicAuth::new("admin", "hunter2"))
            .handle(with_credentials("root", "hunter2"))
            .await;
        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_custom_realm() {
        let auth = BasicAuth::new("a", "b").realm("Admin area").realm("bad\"realm");
        let response = app(auth).handle(Request::get("/secret")).await;
        assert_eq!(response.header("www-authenticate"), Some(r#"Basic realm="Admin area""#));
    }

    #[tokio::test]
    async fn test_rejects_prefix_credentials() {
        let response = app(BasicAuth::new("admin", "hunter2"))
            .handle(with_credentials("admin", "hunter"))
            .await;
        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

        let response = app(BasicAuth::new("admin", "hunter2"))
            .handle(with_credentials("admin", "hunter22"))
            .await;
        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_cors_added_later_decorates_rejection() {
        let app = Router::new()
            .with(BasicAuth::new("admin", "hunter2"))
            .with(Cors::new())
            .get("/secret", |_req: Request| async { "the treasure" });

        let response = app.handle(Request::get("/secret")).await;
        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.header("access-control-allow-origin"), Some("*"));
    }

    #[tokio::test]
    async fn test_cors_added_first_misses_rejection() {
        let app = Router::new()
            .with(Cors::new())
            .with(BasicAuth::new("admin", "hunter2"))
            .get("/secret", |_req: Request| async { "the treasure" });

        let response = app.handle(Request::get("/secret")).await;
        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.header("access-control-allow-origin"), None);

        let response = app.handle(with_credentials("admin", "hunter2")).await;
        assert_eq!(response.status_code(), StatusCode::OK);
        assert_eq!(response.header("access-control-allow-origin"), Some("*"));
    }
}
