use rocket::{http::Status, serde::json::Json, Route, State};

use crate::{
    error::{Error, Result},
    mail::Mailer,
    model::{
        api::{AddSecretRequest, AddSecretResponse, BulkIssueResponse, OutcomeResponse, Tally},
        chain::Block,
        Ballot, Token,
    },
    service::{issuer, reporting},
    storage::Stores,
    Config,
};

pub fn routes() -> Vec<Route> {
    routes![
        generate_for_all,
        votes_raw,
        tally,
        chain,
        tokens,
        voters,
        voter,
        add_secret,
        revoke_mapping,
    ]
}

fn require_debug(config: &Config) -> Result<()> {
    if config.debug_endpoints() {
        Ok(())
    } else {
        Err(Error::Forbidden("debug endpoints are disabled".to_string()))
    }
}

/// Issue and mail a secret ID to every address on the mailing list.
#[post("/api/generate-for-all")]
async fn generate_for_all(
    stores: &State<Stores>,
    mailer: &State<Mailer>,
    config: &State<Config>,
) -> Json<BulkIssueResponse> {
    let results = issuer::issue_all(&*stores.tokens, mailer.inner().as_ref(), config).await;
    Json(BulkIssueResponse {
        message: "Done sending secure links to mailing list".to_string(),
        results,
    })
}

#[get("/api/admin/votes")]
async fn votes_raw(stores: &State<Stores>) -> Result<Json<Vec<Ballot>>> {
    Ok(Json(reporting::list_votes(&*stores.ballots).await?))
}

#[get("/api/admin/tally")]
async fn tally(stores: &State<Stores>) -> Result<Json<Tally>> {
    Ok(Json(reporting::tally(&*stores.ballots).await?))
}

#[get("/api/admin/chain")]
async fn chain(stores: &State<Stores>) -> Result<Json<Vec<Block>>> {
    Ok(Json(reporting::chain(&*stores.ballots).await?))
}

/// List live tokens. Only available when `debug_endpoints` is set.
#[get("/api/admin/tokens")]
async fn tokens(stores: &State<Stores>, config: &State<Config>) -> Result<Json<Vec<Token>>> {
    require_debug(config)?;
    Ok(Json(reporting::list_tokens(&*stores.tokens).await?))
}

/// The voter roll: every address still holding a live token.
#[get("/api/voters")]
async fn voters(stores: &State<Stores>, config: &State<Config>) -> Result<Json<Vec<Token>>> {
    require_debug(config)?;
    Ok(Json(reporting::list_tokens(&*stores.tokens).await?))
}

#[get("/api/voters/<secret_id>")]
async fn voter(
    secret_id: &str,
    stores: &State<Stores>,
    config: &State<Config>,
) -> Result<Json<Token>> {
    require_debug(config)?;
    Ok(Json(reporting::find_token(secret_id, &*stores.tokens).await?))
}

/// Register a token by hand, bypassing mail.
#[post("/api/debug-add-secret", data = "<request>")]
async fn add_secret(
    request: Option<Json<AddSecretRequest>>,
    stores: &State<Stores>,
    config: &State<Config>,
) -> Result<Json<AddSecretResponse>> {
    require_debug(config)?;
    let request = request.map(Json::into_inner).unwrap_or_default();
    let token = issuer::register(
        request.secret_id.as_deref().unwrap_or_default(),
        request.email.as_deref().unwrap_or_default(),
        &*stores.tokens,
    )
    .await?;
    Ok(Json(AddSecretResponse {
        message: "Test secret added successfully".to_string(),
        secret_id: token.secret_id,
        email: token.email,
    }))
}

#[delete("/api/admin/mappings/<secret_id>")]
async fn revoke_mapping(
    secret_id: &str,
    stores: &State<Stores>,
) -> std::result::Result<Json<OutcomeResponse>, (Status, Json<OutcomeResponse>)> {
    match reporting::revoke(secret_id, &*stores.tokens).await {
        Ok(()) => Ok(Json(OutcomeResponse {
            success: true,
            message: "Mapping deleted successfully".to_string(),
        })),
        Err(e) => Err((
            e.status(),
            Json(OutcomeResponse {
                success: false,
                message: e.public_message(),
            }),
        )),
    }
}

#[cfg(test)]
mod tests {
    use rocket::{
        http::ContentType,
        local::asynchronous::Client,
        serde::json::{json, Value},
    };

    use super::*;
    use crate::{mail::Outbox, model::chain::GENESIS_HASH};

    async fn record(stores: &Stores, votes: &[(&str, &str)]) {
        for (secret_id, vote) in votes {
            stores
                .ballots
                .append(&Ballot::new(*secret_id, *vote))
                .await
                .unwrap();
        }
    }

    #[backend_test]
    async fn bulk_issue(client: Client, stores: Stores, outbox: Outbox) {
        outbox.fail_for("b@y.com");

        let response = client.post(uri!(generate_for_all)).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let body: Value = response.into_json().await.unwrap();

        assert_eq!(body["message"], "Done sending secure links to mailing list");
        let results = body["results"].as_array().unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0]["email"], "a@x.com");
        assert_eq!(results[0]["status"], "success");
        assert_eq!(
            results[0]["secretId"].as_str().map(str::to_string),
            outbox.last_secret_id_for("a@x.com")
        );
        assert_eq!(results[1]["email"], "b@y.com");
        assert_eq!(results[1]["status"], "failed");
        assert!(results[1].get("secretId").is_none());

        assert_eq!(stores.tokens.list().await.unwrap().len(), 2);
    }

    #[backend_test]
    async fn raw_votes_in_order(client: Client, stores: Stores) {
        record(&stores, &[("ab12cd34", "Zg=="), ("00ff00ff", "Yg==")]).await;

        let response = client.get(uri!(votes_raw)).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let votes: Vec<Ballot> = response.into_json().await.unwrap();
        assert_eq!(votes, stores.ballots.list().await.unwrap());
        assert_eq!(votes[0].secret_id, "ab12cd34");
    }

    #[backend_test]
    async fn tally_counts(client: Client, stores: Stores) {
        record(&stores, &[("ab12cd34", "Zg=="), ("00ff00ff", "Zg==")]).await;

        let response = client.get(uri!(tally)).dispatch().await;
        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body, json!({ "total": 2, "counts": { "Zg==": 2 } }));
    }

    #[backend_test]
    async fn chain_view(client: Client, stores: Stores) {
        record(&stores, &[("ab12cd34", "Zg==")]).await;

        let response = client.get(uri!(chain)).dispatch().await;
        let blocks: Vec<Block> = response.into_json().await.unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].previous_hash, GENESIS_HASH);
        assert_eq!(blocks[0].secret_id, "ab***34");
    }

    #[backend_test]
    async fn token_listing_disabled_by_default(client: Client) {
        let response = client.get(uri!(tokens)).dispatch().await;
        assert_eq!(Status::Forbidden, response.status());
    }

    #[backend_test(debug)]
    async fn token_listing_when_enabled(client: Client, stores: Stores) {
        stores.tokens.insert(&Token::example()).await.unwrap();

        let response = client.get(uri!(tokens)).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let tokens: Vec<Token> = response.into_json().await.unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].secret_id, "ab12cd34");
    }

    #[backend_test]
    async fn debug_routes_forbidden_by_default(client: Client) {
        let responses = [
            client.get(uri!(voters)).dispatch().await,
            client.get(uri!(voter("ab12cd34"))).dispatch().await,
            client
                .post(uri!(add_secret))
                .header(ContentType::JSON)
                .body(json!({ "secretId": "ab12cd34", "email": "a@x.com" }).to_string())
                .dispatch()
                .await,
        ];
        for response in responses {
            assert_eq!(Status::Forbidden, response.status());
            let body: Value = response.into_json().await.unwrap();
            assert_eq!(body["message"], "Not available in production");
        }
    }

    #[backend_test(debug)]
    async fn voter_lookup(client: Client, stores: Stores) {
        stores.tokens.insert(&Token::example()).await.unwrap();

        let response = client.get(uri!(voters)).dispatch().await;
        let listed: Vec<Token> = response.into_json().await.unwrap();
        assert_eq!(listed.len(), 1);

        let response = client.get(uri!(voter("ab12cd34"))).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let found: Token = response.into_json().await.unwrap();
        assert_eq!(found.email, "a@x.com");

        let response = client.get(uri!(voter("ffffffff"))).dispatch().await;
        assert_eq!(Status::NotFound, response.status());
        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body["message"], "Voter not found");
    }

    #[backend_test(debug)]
    async fn add_secret_registers_token(client: Client, stores: Stores, outbox: Outbox) {
        let response = client
            .post(uri!(add_secret))
            .header(ContentType::JSON)
            .body(json!({ "secretId": "ab12cd34", "email": "a@x.com" }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let body: Value = response.into_json().await.unwrap();
        assert_eq!(
            body,
            json!({
                "message": "Test secret added successfully",
                "secretId": "ab12cd34",
                "email": "a@x.com",
            })
        );
        assert!(stores.tokens.get("ab12cd34").await.unwrap().is_some());
        assert!(outbox.sent().is_empty());

        let response = client
            .post(uri!(add_secret))
            .header(ContentType::JSON)
            .body(json!({ "secretId": "00ff00ff" }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::BadRequest, response.status());
        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body["message"], "Secret ID and email are required.");
    }

    #[backend_test]
    async fn revoke(client: Client, stores: Stores) {
        stores.tokens.insert(&Token::example()).await.unwrap();

        let response = client
            .delete(uri!(revoke_mapping("ab12cd34")))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        assert!(stores.tokens.get("ab12cd34").await.unwrap().is_none());

        let response = client
            .delete(uri!(revoke_mapping("ab12cd34")))
            .dispatch()
            .await;
        assert_eq!(Status::NotFound, response.status());
        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body["success"], false);
    }
}
