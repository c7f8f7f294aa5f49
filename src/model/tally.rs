//! Counting votes from a verified ledger.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    error::Result,
    model::{
        common::{CandidateId, ElectionId, Position},
        election::{Election, ElectionRegistry},
        ledger::{verify_records, ChainStatus, IntegrityLedger, LinkHash, VoteRecord},
    },
};

/// Votes received by one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateCount {
    pub candidate_id: CandidateId,
    pub votes: u64,
}

/// Per-candidate vote counts for an election with an intact chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionResults {
    pub election_id: ElectionId,
    /// Ordered by candidate ID. Every roster candidate appears, including
    /// those with no votes.
    pub counts: Vec<CandidateCount>,
    pub total_votes: u64,
    /// Link hash of the newest record counted.
    pub chain_head: LinkHash,
}

impl ElectionResults {
    pub fn votes_for(&self, candidate_id: CandidateId) -> u64 {
        self.counts
            .iter()
            .find(|count| count.candidate_id == candidate_id)
            .map_or(0, |count| count.votes)
    }
}

/// Outcome of tabulation. Counts are withheld when the chain is broken.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Tally {
    Counted(ElectionResults),
    ChainCompromised { position: Position },
}

/// Group an election's records by candidate.
pub fn count_votes(election: &Election, records: &[VoteRecord]) -> Vec<CandidateCount> {
    let mut counts = election
        .candidates
        .iter()
        .map(|candidate| (candidate.id, 0))
        .collect::<BTreeMap<_, _>>();
    for record in records {
        *counts.entry(record.candidate_id).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|(candidate_id, votes)| CandidateCount {
            candidate_id,
            votes,
        })
        .collect()
}

/// Produces results, but only from a chain that verifies.
#[derive(Clone)]
pub struct ResultTabulator {
    registry: ElectionRegistry,
    ledger: IntegrityLedger,
}

impl ResultTabulator {
    pub fn new(registry: ElectionRegistry, ledger: IntegrityLedger) -> Self {
        Self { registry, ledger }
    }

    /// Count the election's votes. The records counted are exactly the
    /// snapshot that was verified.
    pub async fn tally(&self, election_id: ElectionId) -> Result<Tally> {
        let election = self.registry.get_election(election_id).await?;
        let snapshot = self.ledger.snapshot(election_id).await?;
        let tally = tally_verified(&election, snapshot.status, &snapshot.records);
        if let Tally::ChainCompromised { .. } = tally {
            warn!("Withholding results of election {election_id}: chain compromised");
        }
        Ok(tally)
    }

    /// Export the election and its full chain, intact or not.
    pub async fn dump(&self, election_id: ElectionId) -> Result<LedgerDump> {
        let election = self.registry.get_election(election_id).await?;
        let records = self.ledger.records(election_id).await?;
        Ok(LedgerDump { election, records })
    }
}

/// Everything needed to audit an election offline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerDump {
    pub election: Election,
    pub records: Vec<VoteRecord>,
}

impl LedgerDump {
    /// Verify the chain from scratch, then count it.
    pub fn tally(&self) -> Tally {
        let status = verify_records(self.election.id, &self.records);
        tally_verified(&self.election, status, &self.records)
    }
}

fn tally_verified(election: &Election, status: ChainStatus, records: &[VoteRecord]) -> Tally {
    match status {
        ChainStatus::Intact { length, head } => Tally::Counted(ElectionResults {
            election_id: election.id,
            counts: count_votes(election, records),
            total_votes: length,
            chain_head: head,
        }),
        ChainStatus::Compromised { position } => Tally::ChainCompromised { position },
    }
}
