use std::collections::HashMap;

use rocket::tokio::sync::Mutex;

use super::{BallotStore, StoreError, StoreResult, TokenStore};
use crate::model::{Ballot, Token};

/// In-process storage. Contents are lost on restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tokens: Mutex<HashMap<String, Token>>,
    ballots: Mutex<Vec<Ballot>>,
}

#[rocket::async_trait]
impl TokenStore for MemoryStore {
    async fn get(&self, secret_id: &str) -> StoreResult<Option<Token>> {
        Ok(self.tokens.lock().await.get(secret_id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<Token>> {
        let tokens = self.tokens.lock().await;
        Ok(tokens.values().find(|token| token.email == email).cloned())
    }

    async fn insert(&self, token: &Token) -> StoreResult<()> {
        let mut tokens = self.tokens.lock().await;
        if tokens.contains_key(&token.secret_id) {
            return Err(StoreError::Conflict(format!(
                "secret ID {} already issued",
                token.secret_id
            )));
        }
        if tokens.values().any(|live| live.email == token.email) {
            return Err(StoreError::Conflict(format!(
                "{} already holds a token",
                token.email
            )));
        }
        tokens.insert(token.secret_id.clone(), token.clone());
        Ok(())
    }

    async fn take(&self, secret_id: &str) -> StoreResult<Option<Token>> {
        Ok(self.tokens.lock().await.remove(secret_id))
    }

    async fn list(&self) -> StoreResult<Vec<Token>> {
        let mut tokens = self
            .tokens
            .lock()
            .await
            .values()
            .cloned()
            .collect::<Vec<_>>();
        tokens.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(tokens)
    }
}

#[rocket::async_trait]
impl BallotStore for MemoryStore {
    async fn append(&self, ballot: &Ballot) -> StoreResult<()> {
        self.ballots.lock().await.push(ballot.clone());
        Ok(())
    }

    async fn list(&self) -> StoreResult<Vec<Ballot>> {
        Ok(self.ballots.lock().await.clone())
    }
}

#[cfg(test)]
mod tests {
    use crate::storage::{conformance, Stores};

    #[rocket::async_test]
    async fn memory_store_conformance() {
        conformance::all(Stores::memory).await;
    }

    #[rocket::async_test]
    async fn stores_are_isolated() {
        let first = Stores::memory();
        let second = Stores::memory();
        first
            .tokens
            .insert(&crate::model::Token::example())
            .await
            .unwrap();
        assert!(second.tokens.list().await.unwrap().is_empty());
    }
}
