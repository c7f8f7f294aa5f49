//! In-process storage backend, for tests and single-node deployments.
//! Nothing survives a restart.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use rocket::tokio::sync::RwLock;

use crate::{
    error::{Error, Result},
    model::{
        common::{CandidateId, ElectionId, Position},
        election::{Candidate, CandidateSpec, Election, ElectionSpec, ElectionStore},
        ledger::{Insertion, LedgerStore, VoteRecord, VoterTag},
        voter::{ActivationToken, Voter, VoterId, VoterStore},
    },
};

#[derive(Default)]
struct ElectionTable {
    last_election: ElectionId,
    last_candidate: CandidateId,
    elections: BTreeMap<ElectionId, Election>,
}

/// One election's records plus the index of voter tags that appear in them.
#[derive(Default)]
struct Chain {
    records: Vec<VoteRecord>,
    voters: HashSet<VoterTag>,
}

#[derive(Default)]
pub struct MemoryStore {
    elections: RwLock<ElectionTable>,
    chains: RwLock<HashMap<ElectionId, Arc<RwLock<Chain>>>>,
    voters: RwLock<HashMap<VoterId, Voter>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The election's chain, if anything was ever written to it.
    async fn existing_chain(&self, election_id: ElectionId) -> Option<Arc<RwLock<Chain>>> {
        self.chains.read().await.get(&election_id).cloned()
    }

    /// The election's chain, created empty for the first write.
    async fn chain(&self, election_id: ElectionId) -> Arc<RwLock<Chain>> {
        if let Some(chain) = self.existing_chain(election_id).await {
            return chain;
        }
        self.chains
            .write()
            .await
            .entry(election_id)
            .or_default()
            .clone()
    }

    /// Overwrite a stored record in place, bypassing every check.
    #[cfg(test)]
    pub(crate) async fn tamper_record(
        &self,
        election_id: ElectionId,
        position: Position,
        tamper: impl FnOnce(&mut VoteRecord),
    ) {
        let chain = self.chain(election_id).await;
        let mut chain = chain.write().await;
        let index = usize::try_from(position - 1).unwrap();
        tamper(&mut chain.records[index]);
    }
}

#[rocket::async_trait]
impl ElectionStore for MemoryStore {
    async fn insert_election(&self, spec: &ElectionSpec) -> Result<ElectionId> {
        let mut table = self.elections.write().await;
        table.last_election += 1;
        let id = table.last_election;
        table.elections.insert(
            id,
            Election {
                id,
                description: spec.description.clone(),
                start: spec.start,
                end: spec.end,
                candidates: Vec::new(),
            },
        );
        Ok(id)
    }

    async fn election(&self, id: ElectionId) -> Result<Option<Election>> {
        Ok(self.elections.read().await.elections.get(&id).cloned())
    }

    async fn elections(&self) -> Result<Vec<Election>> {
        Ok(self
            .elections
            .read()
            .await
            .elections
            .values()
            .cloned()
            .collect())
    }

    async fn insert_candidate(
        &self,
        election_id: ElectionId,
        spec: &CandidateSpec,
    ) -> Result<Option<Candidate>> {
        let mut table = self.elections.write().await;
        if !table.elections.contains_key(&election_id) {
            return Ok(None);
        }
        table.last_candidate += 1;
        let candidate = Candidate {
            id: table.last_candidate,
            election_id,
            name: spec.name.clone(),
        };
        if let Some(election) = table.elections.get_mut(&election_id) {
            election.candidates.push(candidate.clone());
        }
        Ok(Some(candidate))
    }
}

#[rocket::async_trait]
impl LedgerStore for MemoryStore {
    async fn contains_voter(&self, election_id: ElectionId, voter: &VoterTag) -> Result<bool> {
        let Some(chain) = self.existing_chain(election_id).await else {
            return Ok(false);
        };
        let contains = chain.read().await.voters.contains(voter);
        Ok(contains)
    }

    async fn last_record(&self, election_id: ElectionId) -> Result<Option<VoteRecord>> {
        let Some(chain) = self.existing_chain(election_id).await else {
            return Ok(None);
        };
        let last = chain.read().await.records.last().cloned();
        Ok(last)
    }

    async fn records(&self, election_id: ElectionId) -> Result<Vec<VoteRecord>> {
        let Some(chain) = self.existing_chain(election_id).await else {
            return Ok(Vec::new());
        };
        let records = chain.read().await.records.clone();
        Ok(records)
    }

    async fn insert(&self, record: &VoteRecord) -> Result<Insertion> {
        let chain = self.chain(record.election_id).await;
        let mut chain = chain.write().await;
        if chain.voters.contains(&record.voter) {
            return Ok(Insertion::VoterTaken);
        }
        let next = chain.records.len() as Position + 1;
        if record.position < next {
            return Ok(Insertion::PositionTaken);
        }
        if record.position > next {
            return Err(Error::Storage(format!(
                "Record at position {} would leave a gap after {}",
                record.position,
                next - 1
            )));
        }
        chain.voters.insert(record.voter);
        chain.records.push(record.clone());
        Ok(Insertion::Inserted)
    }
}

#[rocket::async_trait]
impl VoterStore for MemoryStore {
    async fn insert_voter(&self, voter: &Voter) -> Result<bool> {
        let mut voters = self.voters.write().await;
        let taken = voters.values().any(|existing| {
            existing.id == voter.id
                || existing.email == voter.email
                || (voter.national_id.is_some() && existing.national_id == voter.national_id)
        });
        if taken {
            return Ok(false);
        }
        voters.insert(voter.id, voter.clone());
        Ok(true)
    }

    async fn voter_by_id(&self, id: VoterId) -> Result<Option<Voter>> {
        Ok(self.voters.read().await.get(&id).cloned())
    }

    async fn voter_by_email(&self, email: &str) -> Result<Option<Voter>> {
        Ok(self
            .voters
            .read()
            .await
            .values()
            .find(|voter| voter.email == email)
            .cloned())
    }

    async fn voter_by_activation_token(&self, token: &ActivationToken) -> Result<Option<Voter>> {
        Ok(self
            .voters
            .read()
            .await
            .values()
            .find(|voter| voter.activation_token.as_ref() == Some(token))
            .cloned())
    }

    async fn update_voter(&self, voter: &Voter) -> Result<bool> {
        let mut voters = self.voters.write().await;
        match voters.get_mut(&voter.id) {
            Some(existing) => {
                *existing = voter.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
