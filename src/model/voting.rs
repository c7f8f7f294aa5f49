//! Admission checks and the vote-casting transition.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    model::{
        common::{CandidateId, ElectionId},
        election::{Election, ElectionRegistry, Phase},
        ledger::{Appended, IntegrityLedger, VoteReceipt},
        voter::Fingerprint,
    },
};

/// Whether a voter may vote in an election right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionDecision {
    ElectionNotStarted,
    ElectionEnded,
    AlreadyVoted,
    ChainCompromised,
    Admitted,
}

impl AdmissionDecision {
    /// The reason a vote would be refused, if it would be.
    pub fn rejection(self) -> Option<Rejection> {
        match self {
            Self::ElectionNotStarted => Some(Rejection::ElectionNotStarted),
            Self::ElectionEnded => Some(Rejection::ElectionEnded),
            Self::AlreadyVoted => Some(Rejection::AlreadyVoted),
            Self::ChainCompromised => Some(Rejection::ChainCompromised),
            Self::Admitted => None,
        }
    }
}

/// Why a vote was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    ElectionNotStarted,
    ElectionEnded,
    AlreadyVoted,
    ChainCompromised,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum VoteOutcome {
    Recorded(VoteReceipt),
    Rejected(Rejection),
}

/// A voter's state with respect to one election.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoterState {
    NotStarted,
    Open,
    /// Terminal: the voter's vote is in the ledger.
    Voted,
    Closed,
}

/// A voter's choice in an election.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ballot {
    pub candidate_id: CandidateId,
}

/// What a voter sees before casting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Admission {
    pub decision: AdmissionDecision,
    pub state: VoterState,
}

/// Decides admissions and casts votes.
#[derive(Clone)]
pub struct VotingMachine {
    registry: ElectionRegistry,
    ledger: IntegrityLedger,
}

impl VotingMachine {
    pub fn new(registry: ElectionRegistry, ledger: IntegrityLedger) -> Self {
        Self { registry, ledger }
    }

    /// Decide whether the voter may vote in the election at `now`.
    ///
    /// Checks run in a fixed order and the first match wins: chain integrity,
    /// then the election having ended, then not having started, then a prior vote.
    pub async fn admit(
        &self,
        fingerprint: &Fingerprint,
        election_id: ElectionId,
        now: DateTime<Utc>,
    ) -> Result<AdmissionDecision> {
        let election = self.registry.get_election(election_id).await?;
        self.admit_to(&election, fingerprint, now).await
    }

    async fn admit_to(
        &self,
        election: &Election,
        fingerprint: &Fingerprint,
        now: DateTime<Utc>,
    ) -> Result<AdmissionDecision> {
        let decision = if !self.ledger.verify_chain(election.id).await?.is_intact() {
            AdmissionDecision::ChainCompromised
        } else if election.has_ended(now) {
            AdmissionDecision::ElectionEnded
        } else if !election.has_started(now) {
            AdmissionDecision::ElectionNotStarted
        } else if self.ledger.has_voted(fingerprint, election.id).await? {
            AdmissionDecision::AlreadyVoted
        } else {
            AdmissionDecision::Admitted
        };
        if decision != AdmissionDecision::Admitted {
            debug!("Admission to election {} denied: {decision:?}", election.id);
        }
        Ok(decision)
    }

    /// Cast a vote for `candidate_id`.
    ///
    /// Admission is re-checked here, and the ledger rejects the append if a
    /// concurrent cast by the same voter got there first.
    pub async fn cast_vote(
        &self,
        fingerprint: &Fingerprint,
        election_id: ElectionId,
        candidate_id: CandidateId,
        now: DateTime<Utc>,
    ) -> Result<VoteOutcome> {
        let election = self.registry.get_election(election_id).await?;
        let decision = self.admit_to(&election, fingerprint, now).await?;
        if let Some(rejection) = decision.rejection() {
            return Ok(VoteOutcome::Rejected(rejection));
        }
        if election.candidate(candidate_id).is_none() {
            return Err(Error::not_found(format!(
                "Candidate with ID '{candidate_id}' in election {election_id}"
            )));
        }

        Ok(
            match self
                .ledger
                .append(election_id, candidate_id, fingerprint, now)
                .await?
            {
                Appended::Recorded(receipt) => VoteOutcome::Recorded(receipt),
                Appended::AlreadyVoted => VoteOutcome::Rejected(Rejection::AlreadyVoted),
            },
        )
    }

    /// The voter's lifecycle state in the election at `now`.
    pub async fn voter_state(
        &self,
        fingerprint: &Fingerprint,
        election_id: ElectionId,
        now: DateTime<Utc>,
    ) -> Result<VoterState> {
        let election = self.registry.get_election(election_id).await?;
        if self.ledger.has_voted(fingerprint, election_id).await? {
            return Ok(VoterState::Voted);
        }
        Ok(match election.phase(now) {
            Phase::NotStarted => VoterState::NotStarted,
            Phase::Open => VoterState::Open,
            Phase::Closed => VoterState::Closed,
        })
    }
}
