use crate::{
    error::Result,
    model::common::ElectionId,
};

use super::{hash::VoterTag, record::VoteRecord};

/// Result of a conditional insert into the ledger store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insertion {
    /// The record was durably written.
    Inserted,
    /// Another record already holds this voter tag in this election.
    VoterTaken,
    /// Another record already holds this position in this election.
    PositionTaken,
}

/// Durable storage for vote records.
///
/// Implementations must enforce uniqueness of both `(election_id, voter)`
/// and `(election_id, position)`, reporting violations through [`Insertion`]
/// rather than overwriting anything.
#[rocket::async_trait]
pub trait LedgerStore: Send + Sync {
    /// Does a record with this voter tag exist in the election?
    async fn contains_voter(&self, election_id: ElectionId, voter: &VoterTag) -> Result<bool>;

    /// The newest record of the election, if any.
    async fn last_record(&self, election_id: ElectionId) -> Result<Option<VoteRecord>>;

    /// All records of the election in storage order, read as one snapshot.
    async fn records(&self, election_id: ElectionId) -> Result<Vec<VoteRecord>>;

    /// Insert a record unless its voter tag or position is already taken.
    async fn insert(&self, record: &VoteRecord) -> Result<Insertion>;
}
