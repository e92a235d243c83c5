//! Unified error type.

use http::StatusCode;

use crate::response::{IntoResponse, Response};

/// The error type returned by nimbus's fallible operations.
///
/// Two kinds of failure end up here. Infrastructure failures (binding to a
/// port, accepting a connection) are returned from
/// [`Server::serve`](crate::Server::serve). Request-decoding failures (a
/// missing body, malformed JSON, an absent cookie) are returned from the
/// [`Request`](crate::Request) helpers; since `Error` implements
/// [`IntoResponse`], a handler can simply `?` them:
///
/// ```rust
/// use nimbus::{Error, Request, Response};
///
/// #[derive(serde::Deserialize)]
/// struct Person { name: String }
///
/// async fn greet(req: Request) -> Result<Response, Error> {
///     let person: Person = req.bind_json()?;
///     Ok(Response::text(format!("hello, {}", person.name)))
/// }
/// ```
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Binding the listener or accepting a connection failed.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    /// The address given to [`Server::bind`](crate::Server::bind) is not a
    /// `host:port` pair or a bare port.
    #[error("could not parse {0:?} as a socket address")]
    InvalidAddress(String),

    /// JSON binding was attempted on a request without a body.
    #[error("no request body")]
    EmptyBody,

    /// The body could not be decoded from, or a value encoded to, JSON.
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    /// The query string could not be decoded into the requested type.
    #[error("query: {0}")]
    Query(#[from] serde_urlencoded::de::Error),

    /// The request carries no cookie with the given name.
    #[error("named cookie {0:?} not present")]
    CookieNotFound(String),
}

impl Error {
    /// The status code this error maps to when returned from a handler.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::EmptyBody | Self::Json(_) | Self::Query(_) | Self::CookieNotFound(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Io(_) | Self::InvalidAddress(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Client-caused errors echo their message; server-side ones do not leak it.
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "handler failed");
            return Response::status(status);
        }
        Response::builder().status(status).text(format!("{self}\n"))
    }
}
