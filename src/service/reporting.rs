use log::info;

use crate::{
    error::{Error, Result},
    model::{
        api::Tally,
        chain::{self, Block},
        Ballot, Token,
    },
    storage::{BallotStore, TokenStore},
};

/// Every ballot, in the order it was recorded.
pub async fn list_votes(ballots: &dyn BallotStore) -> Result<Vec<Ballot>> {
    Ok(ballots.list().await?)
}

/// Every live token. Exposes voter emails, so only for debugging.
pub async fn list_tokens(tokens: &dyn TokenStore) -> Result<Vec<Token>> {
    Ok(tokens.list().await?)
}

/// The live token with the given secret ID.
pub async fn find_token(secret_id: &str, tokens: &dyn TokenStore) -> Result<Token> {
    tokens
        .get(secret_id.trim())
        .await?
        .ok_or_else(|| Error::not_found("Voter"))
}

/// Ballot counts grouped by their opaque payload.
pub async fn tally(ballots: &dyn BallotStore) -> Result<Tally> {
    let mut tally = Tally::default();
    for ballot in ballots.list().await? {
        tally.total += 1;
        *tally.counts.entry(ballot.encrypted_vote).or_insert(0) += 1;
    }
    Ok(tally)
}

/// The ballot list rendered as a hash-linked display chain.
pub async fn chain(ballots: &dyn BallotStore) -> Result<Vec<Block>> {
    Ok(chain::chain(&ballots.list().await?))
}

/// Withdraw a live token without recording a vote.
pub async fn revoke(secret_id: &str, tokens: &dyn TokenStore) -> Result<()> {
    if tokens.delete(secret_id.trim()).await? {
        info!("Revoked secret ID {secret_id}");
        Ok(())
    } else {
        Err(Error::not_found("Mapping"))
    }
}
