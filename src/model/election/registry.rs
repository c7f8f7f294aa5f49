use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::{
    error::{Error, Result},
    model::common::{CandidateId, ElectionId},
};

use super::{
    election_core::{Candidate, Election},
    spec::{CandidateSpec, ElectionSpec},
};

/// Durable storage for elections and their rosters.
#[rocket::async_trait]
pub trait ElectionStore: Send + Sync {
    /// Store a new election with an empty roster, assigning it a fresh ID.
    async fn insert_election(&self, spec: &ElectionSpec) -> Result<ElectionId>;

    async fn election(&self, id: ElectionId) -> Result<Option<Election>>;

    /// All elections, ordered by ID.
    async fn elections(&self) -> Result<Vec<Election>>;

    /// Append a candidate to the election's roster, assigning it a fresh ID.
    /// Returns `None` if the election does not exist.
    async fn insert_candidate(
        &self,
        election_id: ElectionId,
        spec: &CandidateSpec,
    ) -> Result<Option<Candidate>>;
}

/// Election definitions and candidate rosters.
#[derive(Clone)]
pub struct ElectionRegistry {
    store: Arc<dyn ElectionStore>,
}

impl ElectionRegistry {
    pub fn new(store: Arc<dyn ElectionStore>) -> Self {
        Self { store }
    }

    pub async fn get_election(&self, id: ElectionId) -> Result<Election> {
        self.store
            .election(id)
            .await?
            .ok_or_else(|| Error::not_found(format!("Election with ID '{id}'")))
    }

    pub async fn has_started(&self, id: ElectionId, now: DateTime<Utc>) -> Result<bool> {
        Ok(self.get_election(id).await?.has_started(now))
    }

    pub async fn has_ended(&self, id: ElectionId, now: DateTime<Utc>) -> Result<bool> {
        Ok(self.get_election(id).await?.has_ended(now))
    }

    pub async fn list_elections(&self) -> Result<Vec<Election>> {
        self.store.elections().await
    }

    /// Create an election. Its window must satisfy `start < end`.
    pub async fn create_election(&self, spec: &ElectionSpec) -> Result<ElectionId> {
        spec.validate()?;
        let id = self.store.insert_election(spec).await?;
        info!(
            "Created election {id} '{}' open from {} until {}",
            spec.description, spec.start, spec.end
        );
        Ok(id)
    }

    /// Register a candidate. Rosters are frozen once voting opens.
    pub async fn add_candidate(
        &self,
        election_id: ElectionId,
        spec: &CandidateSpec,
        now: DateTime<Utc>,
    ) -> Result<CandidateId> {
        spec.validate()?;
        let election = self.get_election(election_id).await?;
        if election.has_started(now) {
            return Err(Error::ElectionAlreadyStarted(election_id));
        }
        let candidate = self
            .store
            .insert_candidate(election_id, spec)
            .await?
            .ok_or_else(|| Error::not_found(format!("Election with ID '{election_id}'")))?;
        info!(
            "Registered candidate {} '{}' in election {election_id}",
            candidate.id, candidate.name
        );
        Ok(candidate.id)
    }
}
