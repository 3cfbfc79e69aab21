//! Request logging. Every request gets a [`RequestId`] that tags its log
//! lines, including any error logged while answering it.
//!
//! Paths can carry secret IDs (`/api/voters/<id>`, `/api/admin/mappings/<id>`),
//! so they are masked before being logged, and bodies are never logged.

use std::fmt::{self, Display, Formatter};
use std::sync::atomic::{AtomicUsize, Ordering};

use log::{info, log, Level};
use rocket::{
    fairing::{Fairing, Info, Kind},
    http::StatusClass,
    request::{FromRequest, Outcome},
    Data, Orbit, Request, Response, Rocket,
};

use crate::{model::chain::mask_secret_id, Config};

/// Path segments that are followed by a secret ID.
const SECRET_PARENTS: [&str; 2] = ["voters", "mappings"];

/// Identifies one request across its log lines.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd)]
pub struct RequestId(pub usize);

impl Display for RequestId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "req{}", self.0)
    }
}

impl RequestId {
    fn next() -> Self {
        static COUNTER: AtomicUsize = AtomicUsize::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// The ID of `req`, assigned on first use.
    pub fn of(req: &Request<'_>) -> Self {
        *req.local_cache(Self::next)
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for RequestId {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        Outcome::Success(RequestId::of(req))
    }
}

/// `path` with every secret ID segment masked.
pub fn redact(path: &str) -> String {
    let mut previous = "";
    path.split('/')
        .map(|segment| {
            let out = if SECRET_PARENTS.contains(&previous) && !segment.is_empty() {
                mask_secret_id(segment)
            } else {
                segment.to_string()
            };
            previous = segment;
            out
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Logs liftoff and one line per request and response.
#[derive(Debug, Copy, Clone)]
pub struct LoggerFairing;

#[rocket::async_trait]
impl Fairing for LoggerFairing {
    fn info(&self) -> Info {
        Info {
            name: "Request log",
            kind: Kind::Liftoff | Kind::Request | Kind::Response,
        }
    }

    async fn on_liftoff(&self, rocket: &Rocket<Orbit>) {
        let config = rocket.config();
        let scheme = if config.tls_enabled() { "https" } else { "http" };
        info!("Sawty backend listening on {scheme}://{}:{}", config.address, config.port);
        if let Some(app) = rocket.state::<Config>() {
            info!(
                "Login links point at {}, mailing list has {} addresses",
                app.frontend_url(),
                app.mailing_list().len()
            );
        }
    }

    async fn on_request(&self, req: &mut Request<'_>, _data: &mut Data<'_>) {
        let id = RequestId::of(req);
        info!("{id} -> {} {}", req.method(), redact(req.uri().path().as_str()));
    }

    async fn on_response<'r>(&self, req: &'r Request<'_>, res: &mut Response<'r>) {
        let id = RequestId::of(req);
        let status = res.status();
        let level = match status.class() {
            StatusClass::ServerError => Level::Error,
            StatusClass::ClientError => Level::Warn,
            _ => Level::Info,
        };
        let route = req
            .route()
            .and_then(|route| route.name.as_deref())
            .unwrap_or("no route");
        log!(level, "{id} <- {status} ({route})");
    }
}

#[cfg(test)]
mod tests {
    use rocket::local::asynchronous::Client;

    use super::*;

    #[backend_test]
    async fn request_id_is_stable_within_a_request(client: Client) {
        let request = client.get("/api/votes");
        let id = RequestId::of(request.inner());
        assert_eq!(id, RequestId::of(request.inner()));

        let other = client.get("/api/votes");
        assert_ne!(id, RequestId::of(other.inner()));
    }

    #[test]
    fn request_ids_increase() {
        let first = RequestId::next();
        let second = RequestId::next();
        assert!(second > first);
        assert_eq!(first.to_string(), format!("req{}", first.0));
    }

    #[test]
    fn secret_ids_are_masked_in_paths() {
        assert_eq!(redact("/api/voters/ab12cd34"), "/api/voters/ab***34");
        assert_eq!(
            redact("/api/admin/mappings/00ff00ff"),
            "/api/admin/mappings/00***ff"
        );
        assert_eq!(redact("/api/voters"), "/api/voters");
        assert_eq!(redact("/api/voters/"), "/api/voters/");
        assert_eq!(redact("/api/submit-vote"), "/api/submit-vote");
    }
}
