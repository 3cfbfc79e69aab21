use chrono::{DateTime, Utc};
use data_encoding::HEXLOWER;
use rand::RngCore;
use serde::{Deserialize, Serialize};

/// Number of random bytes in a freshly minted secret ID.
pub const SECRET_ID_BYTES: usize = 4;

/// A live secret identifier, authorizing exactly one vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    pub secret_id: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl Token {
    /// Mint a token with a random secret ID for the given address.
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            secret_id: random_secret_id(),
            email: email.into(),
            created_at: Utc::now(),
        }
    }
}

/// Generate a random lowercase hex secret ID.
pub fn random_secret_id() -> String {
    let mut bytes = [0; SECRET_ID_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    HEXLOWER.encode(&bytes)
}
