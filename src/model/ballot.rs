use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A recorded vote. Ballots are append-only and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ballot {
    pub secret_id: String,
    /// Client-side obfuscated candidate choice; opaque to the server.
    pub encrypted_vote: String,
    pub timestamp: DateTime<Utc>,
}

impl Ballot {
    /// Create a ballot stamped with the current time.
    pub fn new(secret_id: impl Into<String>, encrypted_vote: impl Into<String>) -> Self {
        Self {
            secret_id: secret_id.into(),
            encrypted_vote: encrypted_vote.into(),
            timestamp: Utc::now(),
        }
    }
}
