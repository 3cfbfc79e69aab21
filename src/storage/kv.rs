use log::warn;
use reqwest::Client as HttpClient;
use rocket::serde::json::{serde_json, Value};
use serde::{de::DeserializeOwned, Deserialize};

use super::{BallotStore, StoreError, StoreResult, TokenStore};
use crate::model::{Ballot, Token};

const VOTES_KEY: &str = "votes";
const SCAN_BATCH: &str = "100";

fn secret_key(secret_id: &str) -> String {
    format!("secret:{secret_id}")
}

fn email_key(email: &str) -> String {
    format!("email:{email}")
}

/// Storage in a Redis-compatible key-value service reached over its REST API
/// (the Upstash command protocol: one JSON array per command, bearer auth).
///
/// Layout:
/// - `secret:{id}` holds the token as JSON,
/// - `email:{email}` holds the secret ID issued to that address,
/// - `votes` is a list of ballots as JSON, appended with `RPUSH`.
pub struct KvStore {
    http: HttpClient,
    url: String,
    token: String,
}

/// Reply envelope of the REST API.
#[derive(Debug, Deserialize)]
struct KvReply {
    #[serde(default)]
    result: Value,
    error: Option<String>,
}

impl KvReply {
    fn into_result<T: DeserializeOwned>(self) -> StoreResult<T> {
        if let Some(error) = self.error {
            return Err(StoreError::Kv(error));
        }
        Ok(serde_json::from_value(self.result)?)
    }
}

impl KvStore {
    pub fn new(url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http: HttpClient::new(),
            url: url.into(),
            token: token.into(),
        }
    }

    /// Run one command and decode its result.
    async fn command<T: DeserializeOwned>(&self, args: &[&str]) -> StoreResult<T> {
        let reply = self
            .http
            .post(&self.url)
            .bearer_auth(&self.token)
            .json(args)
            .send()
            .await?
            .json::<KvReply>()
            .await?;
        reply.into_result()
    }

    /// Point `email:{email}` at the token's secret ID, unless it already
    /// points at another live token.
    async fn claim_email(&self, token: &Token) -> StoreResult<()> {
        let email_key = email_key(&token.email);
        let claimed: Option<String> = self
            .command(&["SET", &email_key, &token.secret_id, "NX"])
            .await?;
        if claimed.is_some() {
            return Ok(());
        }

        let seen: Option<String> = self.command(&["GET", &email_key]).await?;
        if let Some(seen) = &seen {
            let live = self.get_token(seen).await?;
            if matches!(live, Some(live) if live.email == token.email) {
                return Err(StoreError::Conflict(format!(
                    "{} already holds a token",
                    token.email
                )));
            }
        }

        // Replace the stale entry, then check nobody else replaced it first.
        let replaced: Option<String> = self
            .command(&["SET", &email_key, &token.secret_id, "GET"])
            .await?;
        if replaced != seen {
            if let Some(winner) = replaced {
                let _: Option<String> = self.command(&["SET", &email_key, &winner]).await?;
            }
            return Err(StoreError::Conflict(format!(
                "{} was claimed concurrently",
                token.email
            )));
        }
        warn!("Replaced stale email index entry for {}", token.email);
        Ok(())
    }

    async fn get_token(&self, secret_id: &str) -> StoreResult<Option<Token>> {
        let raw: Option<String> = self.command(&["GET", &secret_key(secret_id)]).await?;
        raw.map(|raw| serde_json::from_str(&raw))
            .transpose()
            .map_err(Into::into)
    }
}

#[rocket::async_trait]
impl TokenStore for KvStore {
    async fn get(&self, secret_id: &str) -> StoreResult<Option<Token>> {
        self.get_token(secret_id).await
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<Token>> {
        let secret_id: Option<String> = self.command(&["GET", &email_key(email)]).await?;
        let Some(secret_id) = secret_id else {
            return Ok(None);
        };
        // The index may outlive its token if a consume was interrupted.
        Ok(self
            .get_token(&secret_id)
            .await?
            .filter(|token| token.email == email))
    }

    async fn insert(&self, token: &Token) -> StoreResult<()> {
        // The token is written before the email index is claimed, so an index
        // entry whose token is missing really is stale.
        let secret_key = secret_key(&token.secret_id);
        let json = serde_json::to_string(token)?;
        let stored: Option<String> = self.command(&["SET", &secret_key, &json, "NX"]).await?;
        if stored.is_none() {
            return Err(StoreError::Conflict(format!(
                "secret ID {} already issued",
                token.secret_id
            )));
        }

        match self.claim_email(token).await {
            Ok(()) => Ok(()),
            Err(e) => {
                let _: i64 = self.command(&["DEL", &secret_key]).await?;
                Err(e)
            }
        }
    }

    async fn take(&self, secret_id: &str) -> StoreResult<Option<Token>> {
        let raw: Option<String> = self.command(&["GETDEL", &secret_key(secret_id)]).await?;
        let Some(raw) = raw else {
            return Ok(None);
        };
        let token: Token = serde_json::from_str(&raw)?;
        // The token is already consumed; a leftover index entry is ignored by
        // `find_by_email`, so failing to clear it is not an error.
        if let Err(e) = self
            .command::<i64>(&["DEL", &email_key(&token.email)])
            .await
        {
            warn!("Failed to clear email index for consumed token: {e}");
        }
        Ok(Some(token))
    }

    async fn list(&self) -> StoreResult<Vec<Token>> {
        let mut keys = Vec::new();
        let mut cursor = "0".to_string();
        loop {
            let (next, batch): (String, Vec<String>) = self
                .command(&["SCAN", &cursor, "MATCH", "secret:*", "COUNT", SCAN_BATCH])
                .await?;
            keys.extend(batch);
            if next == "0" {
                break;
            }
            cursor = next;
        }
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let mut args = vec!["MGET"];
        args.extend(keys.iter().map(String::as_str));
        let values: Vec<Option<String>> = self.command(&args).await?;
        let mut tokens = values
            .into_iter()
            .flatten()
            .map(|raw| serde_json::from_str::<Token>(&raw))
            .collect::<Result<Vec<_>, _>>()?;
        tokens.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(tokens)
    }
}

#[rocket::async_trait]
impl BallotStore for KvStore {
    async fn append(&self, ballot: &Ballot) -> StoreResult<()> {
        let json = serde_json::to_string(ballot)?;
        let _: i64 = self.command(&["RPUSH", VOTES_KEY, &json]).await?;
        Ok(())
    }

    async fn list(&self) -> StoreResult<Vec<Ballot>> {
        let raw: Vec<String> = self.command(&["LRANGE", VOTES_KEY, "0", "-1"]).await?;
        raw.iter()
            .map(|raw| serde_json::from_str(raw).map_err(Into::into))
            .collect()
    }
}
