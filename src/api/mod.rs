use rocket::{http::Status, serde::json::Json, Catcher, Request, Route};

use crate::error::ErrorBody;

mod admin;
mod issue;
mod public;
mod vote;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(admin::routes());
    routes.extend(issue::routes());
    routes.extend(public::routes());
    routes.extend(vote::routes());
    routes
}

pub fn catchers() -> Vec<Catcher> {
    catchers![default_catcher]
}

/// Keep error bodies JSON even when no route produced them.
#[catch(default)]
fn default_catcher(status: Status, _req: &Request<'_>) -> (Status, Json<ErrorBody>) {
    let body = ErrorBody {
        message: status.reason().unwrap_or("Unknown error").to_string(),
        error: None,
    };
    (status, Json(body))
}
