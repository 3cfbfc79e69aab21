//! Persistence of tokens and ballots.
//!
//! The core only ever sees [`TokenStore`] and [`BallotStore`] trait objects,
//! bundled into [`Stores`]. Which backend sits behind them is decided once, at
//! ignite, from the `storage` configuration table.

use std::sync::Arc;

use thiserror::Error;

use crate::model::{Ballot, Token};

mod file;
mod kv;
mod memory;
pub mod mongodb;

pub use file::FileStore;
pub use kv::KvStore;
pub use memory::MemoryStore;
pub use self::mongodb::MongoStore;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A token with the same secret ID or email is already live.
    #[error("Conflicting token: {0}")]
    Conflict(String),
    #[error(transparent)]
    Db(#[from] ::mongodb::error::Error),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("Key-value store error: {0}")]
    Kv(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] rocket::serde::json::serde_json::Error),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// The live secret IDs.
#[rocket::async_trait]
pub trait TokenStore: Send + Sync {
    /// Look a token up by its secret ID.
    async fn get(&self, secret_id: &str) -> StoreResult<Option<Token>>;

    /// Look up the live token issued to an email address.
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<Token>>;

    /// Persist a new token.
    ///
    /// Fails with [`StoreError::Conflict`] if a token with the same secret ID
    /// or email is already live.
    async fn insert(&self, token: &Token) -> StoreResult<()>;

    /// Atomically remove and return the token with the given secret ID.
    ///
    /// Of any number of concurrent calls for the same ID, at most one
    /// receives `Some`.
    async fn take(&self, secret_id: &str) -> StoreResult<Option<Token>>;

    /// All live tokens, oldest first.
    async fn list(&self) -> StoreResult<Vec<Token>>;

    /// Delete a token, returning whether it existed.
    async fn delete(&self, secret_id: &str) -> StoreResult<bool> {
        Ok(self.take(secret_id).await?.is_some())
    }
}

/// The append-only ballot log.
#[rocket::async_trait]
pub trait BallotStore: Send + Sync {
    async fn append(&self, ballot: &Ballot) -> StoreResult<()>;

    /// All ballots in insertion order.
    async fn list(&self) -> StoreResult<Vec<Ballot>>;
}

/// The storage backends in use, held in managed state.
#[derive(Clone)]
pub struct Stores {
    pub tokens: Arc<dyn TokenStore>,
    pub ballots: Arc<dyn BallotStore>,
}

impl Stores {
    /// Use one backend for both tokens and ballots.
    pub fn single<S>(store: S) -> Self
    where
        S: TokenStore + BallotStore + 'static,
    {
        let store = Arc::new(store);
        Self {
            tokens: store.clone(),
            ballots: store,
        }
    }

    /// Fresh, empty in-process stores.
    pub fn memory() -> Self {
        Self::single(MemoryStore::default())
    }
}
