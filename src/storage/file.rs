use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use log::debug;
use rocket::{
    serde::json::serde_json,
    tokio::{fs, sync::Mutex},
};
use serde::{de::DeserializeOwned, Serialize};

use super::{BallotStore, StoreError, StoreResult, TokenStore};
use crate::model::{Ballot, Token};

const TOKENS_FILE: &str = "tokens.json";
const VOTES_FILE: &str = "votes.json";

/// Storage in two pretty-printed JSON array files inside a data directory.
///
/// Every operation holds the same lock for its whole read-modify-write cycle,
/// so this process is the single writer of both files.
#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    /// Open the store, creating the data directory if needed.
    pub async fn open(dir: impl Into<PathBuf>) -> StoreResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await?;
        debug!("Using data directory {}", dir.display());
        Ok(Self {
            dir,
            lock: Mutex::new(()),
        })
    }

    fn path(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }

    async fn tokens(&self) -> StoreResult<Vec<Token>> {
        read_array(&self.path(TOKENS_FILE)).await
    }

    async fn ballots(&self) -> StoreResult<Vec<Ballot>> {
        read_array(&self.path(VOTES_FILE)).await
    }
}

/// Read a JSON array, treating a missing file as empty.
async fn read_array<T: DeserializeOwned>(path: &Path) -> StoreResult<Vec<T>> {
    match fs::read(path).await {
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(e.into()),
    }
}

/// Replace a JSON array file via a temporary sibling, so readers never see a
/// half-written file.
async fn write_array<T: Serialize>(path: &Path, items: &[T]) -> StoreResult<()> {
    let bytes = serde_json::to_vec_pretty(items)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, bytes).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}

#[rocket::async_trait]
impl TokenStore for FileStore {
    async fn get(&self, secret_id: &str) -> StoreResult<Option<Token>> {
        let _guard = self.lock.lock().await;
        let tokens = self.tokens().await?;
        Ok(tokens.into_iter().find(|token| token.secret_id == secret_id))
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<Token>> {
        let _guard = self.lock.lock().await;
        let tokens = self.tokens().await?;
        Ok(tokens.into_iter().find(|token| token.email == email))
    }

    async fn insert(&self, token: &Token) -> StoreResult<()> {
        let _guard = self.lock.lock().await;
        let mut tokens = self.tokens().await?;
        if let Some(live) = tokens
            .iter()
            .find(|live| live.secret_id == token.secret_id || live.email == token.email)
        {
            return Err(StoreError::Conflict(format!(
                "{} / {} collides with live token for {}",
                token.secret_id, token.email, live.email
            )));
        }
        tokens.push(token.clone());
        write_array(&self.path(TOKENS_FILE), &tokens).await
    }

    async fn take(&self, secret_id: &str) -> StoreResult<Option<Token>> {
        let _guard = self.lock.lock().await;
        let mut tokens = self.tokens().await?;
        let Some(index) = tokens.iter().position(|token| token.secret_id == secret_id) else {
            return Ok(None);
        };
        let token = tokens.remove(index);
        write_array(&self.path(TOKENS_FILE), &tokens).await?;
        Ok(Some(token))
    }

    async fn list(&self) -> StoreResult<Vec<Token>> {
        let _guard = self.lock.lock().await;
        let mut tokens = self.tokens().await?;
        tokens.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(tokens)
    }
}

#[rocket::async_trait]
impl BallotStore for FileStore {
    async fn append(&self, ballot: &Ballot) -> StoreResult<()> {
        let _guard = self.lock.lock().await;
        let mut ballots = self.ballots().await?;
        ballots.push(ballot.clone());
        write_array(&self.path(VOTES_FILE), &ballots).await
    }

    async fn list(&self) -> StoreResult<Vec<Ballot>> {
        let _guard = self.lock.lock().await;
        self.ballots().await
    }
}
