use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::common::{CandidateId, ElectionId, Position};

use super::hash::{content_hash, link_hash, ContentHash, LinkHash, VoterTag};

/// A single cast vote, as stored in the ledger.
///
/// Records are immutable once appended; they are never updated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRecord {
    /// The election this vote belongs to.
    pub election_id: ElectionId,
    /// Position within the election's chain, starting at 1.
    pub position: Position,
    /// The chosen candidate.
    pub candidate_id: CandidateId,
    /// Per-election tag of the voter's fingerprint.
    pub voter: VoterTag,
    /// When the vote was cast, truncated to milliseconds.
    pub timestamp: DateTime<Utc>,
    /// Hash over the fields above (excluding position).
    pub content_hash: ContentHash,
    /// Hash chaining this record onto its predecessor.
    pub link_hash: LinkHash,
}

impl VoteRecord {
    /// Build the record that follows `previous` in the chain.
    pub fn new(
        election_id: ElectionId,
        position: Position,
        candidate_id: CandidateId,
        voter: VoterTag,
        timestamp: DateTime<Utc>,
        previous: &LinkHash,
    ) -> Self {
        let content_hash = content_hash(election_id, candidate_id, &voter, timestamp);
        let link_hash = link_hash(&content_hash, previous);
        Self {
            election_id,
            position,
            candidate_id,
            voter,
            timestamp,
            content_hash,
            link_hash,
        }
    }

    /// The receipt handed back to the voter for this record.
    pub fn receipt(&self) -> VoteReceipt {
        VoteReceipt {
            election_id: self.election_id,
            position: self.position,
            link_hash: self.link_hash,
        }
    }
}

/// Proof of a recorded vote. Reveals neither the voter nor their choice,
/// but lets the holder check later that their vote is still in the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteReceipt {
    pub election_id: ElectionId,
    pub position: Position,
    pub link_hash: LinkHash,
}
