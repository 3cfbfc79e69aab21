use log::error;
use rocket::{http::Status, serde::json::Json, Route, State};

use crate::{
    model::api::{OutcomeResponse, VotesResponse},
    service::reporting,
    storage::Stores,
};

pub fn routes() -> Vec<Route> {
    routes![votes, liveness]
}

/// All recorded ballots with a count.
#[get("/api/votes")]
async fn votes(
    stores: &State<Stores>,
) -> Result<Json<VotesResponse>, (Status, Json<OutcomeResponse>)> {
    match reporting::list_votes(&*stores.ballots).await {
        Ok(votes) => Ok(Json(VotesResponse {
            success: true,
            count: votes.len(),
            votes,
        })),
        Err(e) => {
            error!("Failed to fetch votes: {e}");
            Err((
                Status::InternalServerError,
                Json(OutcomeResponse {
                    success: false,
                    message: "Failed to fetch votes".to_string(),
                }),
            ))
        }
    }
}

#[get("/__debug")]
fn liveness() -> &'static str {
    "This is the Sawty voting backend."
}
