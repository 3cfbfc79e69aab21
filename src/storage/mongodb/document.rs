use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::{Ballot, Token};

/// A [`Token`] as stored, with `createdAt` as a BSON date so that it sorts
/// chronologically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenDoc {
    pub secret_id: String,
    pub email: String,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl From<&Token> for TokenDoc {
    fn from(token: &Token) -> Self {
        Self {
            secret_id: token.secret_id.clone(),
            email: token.email.clone(),
            created_at: token.created_at,
        }
    }
}

impl From<TokenDoc> for Token {
    fn from(doc: TokenDoc) -> Self {
        Self {
            secret_id: doc.secret_id,
            email: doc.email,
            created_at: doc.created_at,
        }
    }
}

/// A [`Ballot`] as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BallotDoc {
    pub secret_id: String,
    pub encrypted_vote: String,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub timestamp: DateTime<Utc>,
}

impl From<&Ballot> for BallotDoc {
    fn from(ballot: &Ballot) -> Self {
        Self {
            secret_id: ballot.secret_id.clone(),
            encrypted_vote: ballot.encrypted_vote.clone(),
            timestamp: ballot.timestamp,
        }
    }
}

impl From<BallotDoc> for Ballot {
    fn from(doc: BallotDoc) -> Self {
        Self {
            secret_id: doc.secret_id,
            encrypted_vote: doc.encrypted_vote,
            timestamp: doc.timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use mongodb::bson::{to_document, Bson};

    use super::*;

    #[test]
    fn timestamps_are_bson_dates() {
        let doc = to_document(&TokenDoc::from(&Token::example())).unwrap();
        assert!(matches!(doc.get("createdAt"), Some(Bson::DateTime(_))));
        assert_eq!(doc.get_str("secretId").unwrap(), "ab12cd34");

        let doc = to_document(&BallotDoc::from(&Ballot::example())).unwrap();
        assert!(matches!(doc.get("timestamp"), Some(Bson::DateTime(_))));
        assert_eq!(doc.get_str("encryptedVote").unwrap(), "Zg==");
    }

    #[test]
    fn dates_sort_chronologically() {
        let earlier = Token::example();
        let mut later = Token::example2();
        later.created_at = earlier.created_at + chrono::Duration::days(1);

        let date = |token: &Token| match to_document(&TokenDoc::from(token))
            .unwrap()
            .get("createdAt")
        {
            Some(Bson::DateTime(date)) => *date,
            other => panic!("unexpected {other:?}"),
        };
        assert!(date(&earlier) < date(&later));
    }
}
