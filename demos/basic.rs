//! Minimal nimbus example: JSON endpoints, cookies, redirects and the stock
//! middleware.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/people/ada
//!   curl -X POST http://localhost:3000/people \
//!        -H 'content-type: application/json' \
//!        -d '{"name":"alice","surname":"smith","age":30}'
//!   curl -i http://localhost:3000/visit
//!   curl -i http://localhost:3000/old
//!   curl -u admin:secret http://localhost:3001/admin/stats

use std::time::Duration;

use nimbus::http::StatusCode;
use nimbus::middleware::{BasicAuth, Cache, CacheOptions, Cors, RequestLog, log_requests};
use nimbus::{Cookie, Error, Json, Request, Response, Router, Server};
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize)]
struct Person {
    name: String,
    surname: String,
    age: u32,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt::init();

    let app = Router::new()
        .with(Cache::new(CacheOptions {
            max_age: Duration::from_secs(600),
            public: true,
            must_revalidate: true,
        }))
        .with(Cors::new())
        .with(RequestLog::new())
        .get("/people/:name", get_person)
        .post("/people", create_person)
        .delete("/people/{name}", |_req: Request| async { StatusCode::NO_CONTENT })
        .get("/visit", visit)
        .get("/old", log_requests(|_req: Request| async {
            Response::redirect("/people/ada", StatusCode::MOVED_PERMANENTLY)
        }))
        .get("/count", |_req: Request| async { Response::display(42) });

    let admin = Router::new()
        .with(BasicAuth::new("admin", "secret"))
        .get("/admin/stats", |_req: Request| async { "all systems nominal" });

    tokio::try_join!(
        Server::bind("3000").serve(app),
        Server::bind("3001").serve(admin),
    )?;
    Ok(())
}

// GET /people/:name
async fn get_person(req: Request) -> Json<Person> {
    let name = req.param("name").unwrap_or("unknown").to_owned();
    Json(Person { name, surname: "lovelace".into(), age: 36 })
}

// POST /people → 201 with the stored person echoed back
async fn create_person(req: Request) -> Result<Response, Error> {
    let person: Person = req.bind_json()?;
    Ok(Response::builder()
        .status(StatusCode::CREATED)
        .header("location", &format!("/people/{}", person.name))
        .json(&person))
}

// GET /visit: reads the cookie if present, sets it otherwise
async fn visit(req: Request) -> Response {
    match req.cookie("visited") {
        Ok(cookie) => Response::text(format!("welcome back, first seen {}", cookie.value())),
        Err(_) => {
            let now = chrono::Utc::now().to_rfc3339();
            Response::text("Cookie set successfully")
                .with_cookie(Cookie::build(("visited", now)).path("/").http_only(true).build())
        }
    }
}
