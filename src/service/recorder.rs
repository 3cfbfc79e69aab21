use log::{error, info};

use crate::{
    error::{Error, Result},
    model::Ballot,
    storage::{Stores, TokenStore},
};

/// Check that `secret_id` names a live token.
pub async fn verify(secret_id: &str, tokens: &dyn TokenStore) -> Result<()> {
    let secret_id = secret_id.trim();
    if secret_id.is_empty() {
        return Err(Error::validation("Secret ID required."));
    }
    match tokens.get(secret_id).await? {
        Some(_) => Ok(()),
        None => Err(Error::InvalidToken),
    }
}

/// Record a ballot against a secret ID, consuming the ID.
///
/// The token is taken atomically before anything is written, so at most one
/// submission per token can succeed. If the ballot then fails to persist the
/// token is put back, leaving the voter free to retry.
pub async fn submit(secret_id: &str, encrypted_vote: &str, stores: &Stores) -> Result<Ballot> {
    let secret_id = secret_id.trim();
    // The payload is opaque: checked for presence, stored byte for byte.
    if secret_id.is_empty() || encrypted_vote.trim().is_empty() {
        return Err(Error::validation("Secret ID and vote are required."));
    }

    let token = stores
        .tokens
        .take(secret_id)
        .await?
        .ok_or(Error::InvalidToken)?;

    let ballot = Ballot::new(secret_id, encrypted_vote);
    if let Err(e) = stores.ballots.append(&ballot).await {
        error!("Failed to record ballot for secret ID {secret_id}: {e}");
        if let Err(restore) = stores.tokens.insert(&token).await {
            error!("Failed to restore secret ID {secret_id} after lost ballot: {restore}");
        }
        return Err(e.into());
    }

    info!("Vote recorded for secret ID {secret_id}");
    Ok(ballot)
}
