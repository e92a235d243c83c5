//! # nimbus
//!
//! A micro-framework around an existing router. Nothing more.
//!
//! nimbus does not match paths, parse HTTP, or manage connections itself:
//! [`matchit`] does the routing, [`hyper`] and [`tokio`] do the wire work.
//! What is left is the thin layer an application actually touches:
//!
//! - Route registration with chained `get` / `post` / `put` / … calls
//! - Middleware wrapped around the router, the last one added outermost
//! - Helpers for text, JSON, status codes, redirects and cookies
//! - Stock middleware: CORS, basic auth, cache headers, request logging
//! - Graceful shutdown on SIGTERM / Ctrl-C
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use nimbus::http::StatusCode;
//! use nimbus::middleware::{Cors, RequestLog};
//! use nimbus::{Error, Json, Request, Response, Router, Server};
//!
//! #[derive(serde::Deserialize, serde::Serialize)]
//! struct Person {
//!     name: String,
//!     age: u32,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Error> {
//!     let app = Router::new()
//!         .with(Cors::new())
//!         .with(RequestLog::new())
//!         .get("/people/{name}", get_person)
//!         .post("/people", create_person);
//!
//!     Server::bind("3000").serve(app).await
//! }
//!
//! async fn get_person(req: Request) -> Json<Person> {
//!     let name = req.param("name").unwrap_or("unknown").to_owned();
//!     Json(Person { name, age: 36 })
//! }
//!
//! async fn create_person(req: Request) -> Result<Response, Error> {
//!     let person: Person = req.bind_json()?;
//!     Ok(Response::builder()
//!         .status(StatusCode::CREATED)
//!         .header("location", &format!("/people/{}", person.name))
//!         .json(&person))
//! }
//! ```

mod error;
mod handler;
mod request;
mod response;
mod router;
mod server;

pub mod middleware;

pub use error::Error;
pub use handler::{BoxFuture, Handler};
pub use middleware::Middleware;
pub use request::Request;
pub use response::{ContentType, IntoResponse, Json, Response, ResponseBuilder};
pub use router::Router;
pub use server::Server;

pub use cookie::{self, Cookie};
pub use http;
