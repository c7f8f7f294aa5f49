use serde::{Deserialize, Serialize};

use crate::model::common::{truncate_to_millis, ElectionId, Position};

use super::{
    hash::{content_hash, link_hash, LinkHash, GENESIS},
    record::VoteRecord,
};

/// Outcome of verifying an election's chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ChainStatus {
    /// Every record verified. `head` is the newest link hash, or genesis if empty.
    Intact { length: Position, head: LinkHash },
    /// The first record at which verification failed.
    Compromised { position: Position },
}

impl ChainStatus {
    pub fn is_intact(&self) -> bool {
        matches!(self, Self::Intact { .. })
    }

    /// The position of the first bad record, if any.
    pub fn compromised_at(&self) -> Option<Position> {
        match self {
            Self::Intact { .. } => None,
            Self::Compromised { position } => Some(*position),
        }
    }
}

/// Recompute every content and link hash of `records`, which must be the
/// complete chain for `election_id` in position order.
pub fn verify_records(election_id: ElectionId, records: &[VoteRecord]) -> ChainStatus {
    let mut previous = GENESIS;
    let mut expected: Position = 0;
    for record in records {
        expected += 1;
        let compromised = ChainStatus::Compromised { position: expected };
        if record.position != expected
            || record.election_id != election_id
            || record.timestamp != truncate_to_millis(record.timestamp)
        {
            return compromised;
        }
        let content = content_hash(
            election_id,
            record.candidate_id,
            &record.voter,
            record.timestamp,
        );
        if content != record.content_hash || link_hash(&content, &previous) != record.link_hash {
            return compromised;
        }
        previous = record.link_hash;
    }
    ChainStatus::Intact {
        length: expected,
        head: previous,
    }
}

/// Build a valid chain from `(candidate, voter)` pairs. Used by tests across the crate.
#[cfg(test)]
pub(crate) fn build_chain(
    election_id: ElectionId,
    votes: &[(crate::model::common::CandidateId, super::hash::VoterTag)],
    start: chrono::DateTime<chrono::Utc>,
) -> Vec<VoteRecord> {
    let mut previous = GENESIS;
    let mut records = Vec::with_capacity(votes.len());
    for (i, (candidate, voter)) in votes.iter().enumerate() {
        let timestamp = truncate_to_millis(start + chrono::Duration::seconds(i as i64));
        let record = VoteRecord::new(
            election_id,
            i as Position + 1,
            *candidate,
            *voter,
            timestamp,
            &previous,
        );
        previous = record.link_hash;
        records.push(record);
    }
    records
}
