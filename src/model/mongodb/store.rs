use mongodb::{
    bson::{doc, oid::ObjectId, to_bson, Document},
    options::{FindOneOptions, FindOptions},
    Database,
};
use rocket::futures::TryStreamExt;

use crate::{
    error::{Error, Result},
    model::{
        common::ElectionId,
        election::{Candidate, CandidateSpec, Election, ElectionSpec, ElectionStore},
        ledger::{Insertion, LedgerStore, VoteRecord, VoterTag},
        voter::{ActivationToken, Voter, VoterId, VoterStore},
    },
};

use super::{
    bson::u32_id_filter,
    collection::{ensure_indexes_exist, Coll, VOTER_INDEX},
    counter::{ensure_counter_exists, Counter, CANDIDATE_ID_COUNTER_ID, ELECTION_ID_COUNTER_ID},
    documents::{CandidateDocument, ElectionDocument, VoteRecordDocument, VoterDocument},
    errors::{duplicate_key_message, is_duplicate_key_error},
};

/// MongoDB storage backend.
#[derive(Clone)]
pub struct MongoStore {
    elections: Coll<ElectionDocument>,
    votes: Coll<VoteRecordDocument>,
    voters: Coll<VoterDocument>,
    counters: Coll<Counter>,
}

impl MongoStore {
    pub fn new(db: &Database) -> Self {
        Self {
            elections: Coll::from_db(db),
            votes: Coll::from_db(db),
            voters: Coll::from_db(db),
            counters: Coll::from_db(db),
        }
    }

    /// Ensure the indexes and ID counters exist, then return the store.
    ///
    /// This operation is idempotent.
    pub async fn prepare(db: &Database) -> Result<Self> {
        ensure_indexes_exist(db).await?;
        let store = Self::new(db);
        ensure_counter_exists(&store.counters, ELECTION_ID_COUNTER_ID).await?;
        ensure_counter_exists(&store.counters, CANDIDATE_ID_COUNTER_ID).await?;
        Ok(store)
    }
}

fn election_filter(election_id: ElectionId) -> Document {
    doc! { "election_id": i64::from(election_id) }
}

fn voter_filter(election_id: ElectionId, voter: &VoterTag) -> Document {
    doc! { "election_id": i64::from(election_id), "voter": voter.to_string() }
}

#[rocket::async_trait]
impl ElectionStore for MongoStore {
    async fn insert_election(&self, spec: &ElectionSpec) -> Result<ElectionId> {
        let id = Counter::next(&self.counters, ELECTION_ID_COUNTER_ID).await?;
        let document = ElectionDocument {
            id,
            description: spec.description.clone(),
            start: spec.start,
            end: spec.end,
            candidates: Vec::new(),
        };
        self.elections.insert_one(document, None).await?;
        Ok(id)
    }

    async fn election(&self, id: ElectionId) -> Result<Option<Election>> {
        Ok(self
            .elections
            .find_one(u32_id_filter(id), None)
            .await?
            .map(Into::into))
    }

    async fn elections(&self) -> Result<Vec<Election>> {
        let options = FindOptions::builder().sort(doc! {"_id": 1}).build();
        let documents: Vec<ElectionDocument> = self
            .elections
            .find(None, options)
            .await?
            .try_collect()
            .await?;
        Ok(documents.into_iter().map(Into::into).collect())
    }

    async fn insert_candidate(
        &self,
        election_id: ElectionId,
        spec: &CandidateSpec,
    ) -> Result<Option<Candidate>> {
        let id = Counter::next(&self.counters, CANDIDATE_ID_COUNTER_ID).await?;
        let candidate = CandidateDocument {
            id,
            name: spec.name.clone(),
        };
        let candidate_bson =
            to_bson(&candidate).map_err(|err| Error::Storage(err.to_string()))?;
        let push = doc! {
            "$push": { "candidates": candidate_bson }
        };
        let result = self
            .elections
            .update_one(u32_id_filter(election_id), push, None)
            .await?;
        Ok((result.matched_count > 0).then(|| Candidate {
            id,
            election_id,
            name: candidate.name,
        }))
    }
}

#[rocket::async_trait]
impl LedgerStore for MongoStore {
    async fn contains_voter(&self, election_id: ElectionId, voter: &VoterTag) -> Result<bool> {
        Ok(self
            .votes
            .find_one(voter_filter(election_id, voter), None)
            .await?
            .is_some())
    }

    async fn last_record(&self, election_id: ElectionId) -> Result<Option<VoteRecord>> {
        let options = FindOneOptions::builder()
            .sort(doc! {"position": -1})
            .build();
        Ok(self
            .votes
            .find_one(election_filter(election_id), options)
            .await?
            .map(Into::into))
    }

    async fn records(&self, election_id: ElectionId) -> Result<Vec<VoteRecord>> {
        let options = FindOptions::builder().sort(doc! {"position": 1}).build();
        let documents: Vec<VoteRecordDocument> = self
            .votes
            .find(election_filter(election_id), options)
            .await?
            .try_collect()
            .await?;
        Ok(documents.into_iter().map(Into::into).collect())
    }

    async fn insert(&self, record: &VoteRecord) -> Result<Insertion> {
        let result = self
            .votes
            .insert_one(VoteRecordDocument::from(record), None)
            .await;
        if let Some(message) = duplicate_key_message(result.as_ref()) {
            return Ok(if message.contains(VOTER_INDEX) {
                Insertion::VoterTaken
            } else {
                Insertion::PositionTaken
            });
        }
        result?;
        Ok(Insertion::Inserted)
    }
}

#[rocket::async_trait]
impl VoterStore for MongoStore {
    async fn insert_voter(&self, voter: &Voter) -> Result<bool> {
        let result = self
            .voters
            .insert_one(VoterDocument::from(voter), None)
            .await;
        if is_duplicate_key_error(result.as_ref()) {
            return Ok(false);
        }
        result?;
        Ok(true)
    }

    async fn voter_by_id(&self, id: VoterId) -> Result<Option<Voter>> {
        let id: ObjectId = id.into();
        Ok(self
            .voters
            .find_one(doc! { "_id": id }, None)
            .await?
            .map(Into::into))
    }

    async fn voter_by_email(&self, email: &str) -> Result<Option<Voter>> {
        Ok(self
            .voters
            .find_one(doc! { "email": email }, None)
            .await?
            .map(Into::into))
    }

    async fn voter_by_activation_token(&self, token: &ActivationToken) -> Result<Option<Voter>> {
        Ok(self
            .voters
            .find_one(doc! { "activation_token": token.as_str() }, None)
            .await?
            .map(Into::into))
    }

    async fn update_voter(&self, voter: &Voter) -> Result<bool> {
        let id: ObjectId = voter.id.into();
        let result = self
            .voters
            .replace_one(doc! { "_id": id }, VoterDocument::from(voter), None)
            .await?;
        Ok(result.matched_count > 0)
    }
}
