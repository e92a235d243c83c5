use std::time::Instant;

use tracing::{Instrument, info, info_span};

use super::{Middleware, Next};
use crate::handler::{BoxFuture, Handler};
use crate::request::Request;

/// Logs every request through `tracing`.
///
/// Each request runs inside an `http.request` span carrying the method,
/// path and peer address; one `info` event marks its arrival and another
/// its completion with the status and latency in milliseconds.
#[derive(Clone, Copy, Debug, Default)]
pub struct RequestLog;

impl RequestLog {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Middleware for RequestLog {
    fn call(&self, req: Request, next: Next) -> BoxFuture {
        let span = info_span!(
            "http.request",
            method = %req.method(),
            path = req.path(),
            peer = req.remote_addr().map(tracing::field::display),
        );
        Box::pin(
            async move {
                info!("incoming request");
                let start = Instant::now();
                let response = next.run(req).await;
                info!(
                    status = response.status_code().as_u16(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "request finished"
                );
                response
            }
            .instrument(span),
        )
    }
}

/// Wraps a single handler so each call is logged, for routes that should be
/// logged without putting [`RequestLog`] in front of the whole router.
///
/// ```rust
/// use nimbus::{Request, Router};
/// use nimbus::middleware::log_requests;
///
/// async fn hello(_req: Request) -> &'static str { "hello" }
///
/// let app = Router::new().get("/", log_requests(hello));
/// ```
pub fn log_requests(handler: impl Handler) -> impl Handler {
    let handler = handler.into_boxed_handler();
    move |req: Request| {
        info!(method = %req.method(), path = req.path(), "incoming request");
        handler.call(req)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::Router;
    use http::StatusCode;
    use std::io;
    use std::sync::{Arc, Mutex};

    /// Formatted log lines written by the test subscriber.
    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Captured {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Installs a subscriber that records every event (with its span fields)
    /// for the current thread until the guard drops.
    fn capture() -> (Captured, tracing::subscriber::DefaultGuard) {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::INFO)
            .finish();
        (captured, tracing::subscriber::set_default(subscriber))
    }

    #[tokio::test]
    async fn test_logs_arrival_and_completion() {
        let (captured, _guard) = capture();
        let app = Router::new()
            .with(RequestLog::new())
            .get("/items/{id}", |_req: Request| async { (StatusCode::CREATED, "made") });
        app.handle(Request::get("/items/7")).await;

        let logs = captured.contents();
        let lines: Vec<&str> = logs.lines().collect();
        assert_eq!(lines.len(), 2, "{logs}");

        assert!(lines[0].contains("incoming request"), "{logs}");
        assert!(lines[0].contains("method=GET"), "{logs}");
        assert!(lines[0].contains("/items/7"), "{logs}");

        assert!(lines[1].contains("request finished"), "{logs}");
        assert!(lines[1].contains("status=201"), "{logs}");
        assert!(lines[1].contains("elapsed_ms="), "{logs}");
        assert!(lines[1].contains("/items/7"), "{logs}");
    }

    #[tokio::test]
    async fn test_logs_unmatched_requests() {
        let (captured, _guard) = capture();
        let app = Router::new().with(RequestLog::new());
        app.handle(Request::get("/nowhere")).await;

        let logs = captured.contents();
        assert!(logs.contains("status=404"), "{logs}");
    }

    #[tokio::test]
    async fn test_wrapped_handler_logs_method_and_path() {
        let (captured, _guard) = capture();
        let app = Router::new().get("/hello", log_requests(|_req: Request| async { "hi" }));
        app.handle(Request::get("/hello?x=1")).await;

        let logs = captured.contents();
        assert!(logs.contains("incoming request"), "{logs}");
        assert!(logs.contains("method=GET"), "{logs}");
        assert!(logs.contains("path="), "{logs}");
        assert!(logs.contains("/hello"), "{logs}");
        assert!(!logs.contains("x=1"), "{logs}");
    }

    #[tokio::test]
    async fn test_passes_response_through() {
        let app = Router::new()
            .with(RequestLog::new())
            .get("/", |_req: Request| async { (StatusCode::CREATED, "made") });
        let response = app.handle(Request::get("/")).await;
        assert_eq!(response.status_code(), StatusCode::CREATED);
        assert_eq!(&response.body()[..], b"made");
    }

    #[tokio::test]
    async fn test_wrapped_handler() {
        let app = Router::new().get("/", log_requests(|req: Request| async move {
            req.path().to_owned()
        }));
        let response = app.handle(Request::get("/")).await;
        assert_eq!(&response.body()[..], b"/");
    }
}
