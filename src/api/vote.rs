use log::{error, info};
use rocket::{http::Status, serde::json::Json, Route, State};

use crate::{
    error::{Error, Result},
    logging::RequestId,
    model::api::{MessageResponse, SubmitVoteRequest, VerifyResponse, VerifySecretRequest},
    service::recorder,
    storage::Stores,
};

pub fn routes() -> Vec<Route> {
    routes![verify_secret, submit_vote]
}

/// Check a secret ID without consuming it.
///
/// Unlike other endpoints, failures here keep the `{valid, message}` shape.
#[post("/api/verify-secret", data = "<request>")]
pub async fn verify_secret(
    request: Option<Json<VerifySecretRequest>>,
    stores: &State<Stores>,
) -> (Status, Json<VerifyResponse>) {
    let secret_id = request
        .and_then(|request| request.into_inner().secret_id)
        .unwrap_or_default();
    match recorder::verify(&secret_id, &*stores.tokens).await {
        Ok(()) => (
            Status::Ok,
            Json(VerifyResponse {
                valid: true,
                message: "Valid Secret ID.".to_string(),
            }),
        ),
        Err(e) => {
            if let Error::Storage(ref cause) = e {
                error!("Failed to verify secret ID: {cause}");
            }
            (
                e.status(),
                Json(VerifyResponse {
                    valid: false,
                    message: e.public_message(),
                }),
            )
        }
    }
}

/// Record a vote, consuming the secret ID.
#[post("/api/submit-vote", data = "<request>")]
pub async fn submit_vote(
    id: RequestId,
    request: Option<Json<SubmitVoteRequest>>,
    stores: &State<Stores>,
) -> Result<Json<MessageResponse>> {
    let request = request.map(Json::into_inner).unwrap_or_default();
    recorder::submit(
        request.secret_id.as_deref().unwrap_or_default(),
        request.encrypted_vote.as_deref().unwrap_or_default(),
        stores,
    )
    .await?;
    info!("{id} ballot accepted");
    Ok(Json(MessageResponse::new("Vote submitted securely!")))
}
