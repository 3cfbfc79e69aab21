mod collection;
mod document;
mod errors;

use mongodb::{
    bson::doc,
    options::FindOptions,
    Client, Database,
};
use rocket::futures::TryStreamExt;

pub use collection::{ensure_indexes_exist, Coll, MongoCollection};
pub use document::{BallotDoc, TokenDoc};
pub use errors::{is_duplicate_key_error, DUPLICATE_KEY};

use super::{BallotStore, StoreError, StoreResult, TokenStore};
use crate::model::{Ballot, Token};

/// Storage in a MongoDB database: a `tokens` collection with unique
/// `secretId` and `email` indexes, and a `ballots` collection.
pub struct MongoStore {
    tokens: Coll<TokenDoc>,
    ballots: Coll<BallotDoc>,
}

impl MongoStore {
    /// Connect, select the database, and ensure its indexes exist.
    pub async fn connect(uri: &str, database: &str) -> StoreResult<Self> {
        let client = Client::with_uri_str(uri).await?;
        let db = client.database(database);
        ensure_indexes_exist(&db).await?;
        Ok(Self::from_db(&db))
    }

    pub fn from_db(db: &Database) -> Self {
        Self {
            tokens: Coll::from_db(db),
            ballots: Coll::from_db(db),
        }
    }
}

#[rocket::async_trait]
impl TokenStore for MongoStore {
    async fn get(&self, secret_id: &str) -> StoreResult<Option<Token>> {
        let doc = self
            .tokens
            .find_one(doc! { "secretId": secret_id }, None)
            .await?;
        Ok(doc.map(Token::from))
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<Token>> {
        let doc = self.tokens.find_one(doc! { "email": email }, None).await?;
        Ok(doc.map(Token::from))
    }

    async fn insert(&self, token: &Token) -> StoreResult<()> {
        match self.tokens.insert_one(TokenDoc::from(token), None).await {
            Ok(_) => Ok(()),
            Err(e) if is_duplicate_key_error(&e) => Err(StoreError::Conflict(format!(
                "{} / {} collides with a live token",
                token.secret_id, token.email
            ))),
            Err(e) => Err(e.into()),
        }
    }

    async fn take(&self, secret_id: &str) -> StoreResult<Option<Token>> {
        let doc = self
            .tokens
            .find_one_and_delete(doc! { "secretId": secret_id }, None)
            .await?;
        Ok(doc.map(Token::from))
    }

    async fn list(&self) -> StoreResult<Vec<Token>> {
        let options = FindOptions::builder().sort(doc! { "createdAt": 1 }).build();
        let docs: Vec<TokenDoc> = self.tokens.find(None, options).await?.try_collect().await?;
        Ok(docs.into_iter().map(Token::from).collect())
    }
}

#[rocket::async_trait]
impl BallotStore for MongoStore {
    async fn append(&self, ballot: &Ballot) -> StoreResult<()> {
        self.ballots.insert_one(BallotDoc::from(ballot), None).await?;
        Ok(())
    }

    async fn list(&self) -> StoreResult<Vec<Ballot>> {
        // `_id` is an ObjectId, which increases with insertion time.
        let options = FindOptions::builder().sort(doc! { "_id": 1 }).build();
        let docs: Vec<BallotDoc> = self.ballots.find(None, options).await?.try_collect().await?;
        Ok(docs.into_iter().map(Ballot::from).collect())
    }
}
