use chrono::{DateTime, SecondsFormat, Utc};
use data_encoding::HEXLOWER;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::ballot::Ballot;

/// Previous-hash value of the first block.
pub const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// One ballot rendered as a link in the display chain.
///
/// This is a presentation of the ballot list, recomputed on every request.
/// It provides no tamper evidence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub index: usize,
    pub secret_id: String,
    pub encrypted_vote: String,
    pub timestamp: DateTime<Utc>,
    pub previous_hash: String,
    pub hash: String,
}

/// Render ballots, in order, as a hash-linked chain.
pub fn chain(ballots: &[Ballot]) -> Vec<Block> {
    let mut previous_hash = GENESIS_HASH.to_string();
    ballots
        .iter()
        .enumerate()
        .map(|(index, ballot)| {
            let hash = block_hash(index, &previous_hash, ballot);
            Block {
                index,
                secret_id: mask_secret_id(&ballot.secret_id),
                encrypted_vote: ballot.encrypted_vote.clone(),
                timestamp: ballot.timestamp,
                previous_hash: std::mem::replace(&mut previous_hash, hash.clone()),
                hash,
            }
        })
        .collect()
}

fn block_hash(index: usize, previous_hash: &str, ballot: &Ballot) -> String {
    let mut hasher = Sha256::new();
    hasher.update(index.to_string().as_bytes());
    hasher.update(b"|");
    hasher.update(previous_hash.as_bytes());
    hasher.update(b"|");
    hasher.update(ballot.secret_id.as_bytes());
    hasher.update(b"|");
    hasher.update(ballot.encrypted_vote.as_bytes());
    hasher.update(b"|");
    hasher.update(
        ballot
            .timestamp
            .to_rfc3339_opts(SecondsFormat::AutoSi, true)
            .as_bytes(),
    );
    HEXLOWER.encode(&hasher.finalize())
}

/// Keep the first and last two characters of a secret ID.
///
/// Short IDs overlap rather than collapse, so `"abc"` becomes `"ab***bc"`.
pub fn mask_secret_id(secret_id: &str) -> String {
    let chars = secret_id.chars().collect::<Vec<_>>();
    let head = chars.iter().take(2).collect::<String>();
    let tail = chars[chars.len().saturating_sub(2)..].iter().collect::<String>();
    format!("{head}***{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_chain() {
        assert!(chain(&[]).is_empty());
    }

    #[test]
    fn blocks_link_to_their_predecessor() {
        let ballots = vec![
            Ballot::new("ab12cd34", "Zg=="),
            Ballot::new("00ff00ff", "Yg=="),
            Ballot::new("12345678", "Zg=="),
        ];
        let blocks = chain(&ballots);

        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[0].previous_hash, GENESIS_HASH);
        for pair in blocks.windows(2) {
            assert_eq!(pair[1].previous_hash, pair[0].hash);
        }
        for (i, block) in blocks.iter().enumerate() {
            assert_eq!(block.index, i);
            assert_eq!(block.hash.len(), 64);
            assert_eq!(block.encrypted_vote, ballots[i].encrypted_vote);
        }
    }

    #[test]
    fn chain_is_deterministic() {
        let ballots = vec![Ballot::example(), Ballot::new("00ff00ff", "Yg==")];
        assert_eq!(chain(&ballots), chain(&ballots));
    }

    #[test]
    fn changing_a_ballot_changes_later_hashes() {
        let mut ballots = vec![Ballot::example(), Ballot::new("00ff00ff", "Yg==")];
        let before = chain(&ballots);
        ballots[0].encrypted_vote = "Yg==".to_string();
        let after = chain(&ballots);
        assert_ne!(before[0].hash, after[0].hash);
        assert_ne!(before[1].hash, after[1].hash);
    }

    #[test]
    fn secret_ids_are_masked() {
        assert_eq!(mask_secret_id("ab12cd34"), "ab***34");
        assert_eq!(mask_secret_id("abcd"), "ab***cd");
        assert_eq!(mask_secret_id("abc"), "ab***bc");
        assert_eq!(mask_secret_id("a"), "a***a");
        assert_eq!(mask_secret_id(""), "***");
    }
}
