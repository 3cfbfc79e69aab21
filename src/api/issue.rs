use rocket::{serde::json::Json, Route, State};

use crate::{
    error::Result,
    mail::Mailer,
    model::api::{GenerateSecretRequest, MessageResponse},
    service::issuer,
    storage::Stores,
    Config,
};

pub fn routes() -> Vec<Route> {
    routes![generate_secret]
}

/// Issue (or re-send) one voter's secret ID by email.
///
/// A missing or malformed body is treated as a missing email.
#[post("/api/generate-secret", data = "<request>")]
pub async fn generate_secret(
    request: Option<Json<GenerateSecretRequest>>,
    stores: &State<Stores>,
    mailer: &State<Mailer>,
    config: &State<Config>,
) -> Result<Json<MessageResponse>> {
    let email = request
        .and_then(|request| request.into_inner().email)
        .unwrap_or_default();
    issuer::issue(&email, &*stores.tokens, mailer.inner().as_ref(), config).await?;
    Ok(Json(MessageResponse::new("Secure link generated and emailed!")))
}
