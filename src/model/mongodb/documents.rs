//! The shapes our types take inside MongoDB.
//!
//! Timestamps are stored as BSON datetimes and IDs as native `ObjectId`s,
//! rather than the strings used in API responses.

use chrono::{DateTime, Utc};
use mongodb::bson::{oid::ObjectId, serde_helpers::chrono_datetime_as_bson_datetime};
use serde::{Deserialize, Serialize};

use crate::model::{
    auth::Rights,
    common::{CandidateId, ElectionId, Position},
    election::{Candidate, Election},
    ledger::{hash::ContentHash, LinkHash, VoteRecord, VoterTag},
    voter::{ActivationToken, CredentialHash, NationalId, Voter},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElectionDocument {
    #[serde(rename = "_id")]
    pub id: ElectionId,
    pub description: String,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub start: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub end: DateTime<Utc>,
    pub candidates: Vec<CandidateDocument>,
}

/// A candidate, embedded in its election's document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateDocument {
    pub id: CandidateId,
    pub name: String,
}

impl From<ElectionDocument> for Election {
    fn from(document: ElectionDocument) -> Self {
        let id = document.id;
        Self {
            id,
            description: document.description,
            start: document.start,
            end: document.end,
            candidates: document
                .candidates
                .into_iter()
                .map(|candidate| Candidate {
                    id: candidate.id,
                    election_id: id,
                    name: candidate.name,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteRecordDocument {
    pub election_id: ElectionId,
    pub position: Position,
    pub candidate_id: CandidateId,
    pub voter: VoterTag,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub timestamp: DateTime<Utc>,
    pub content_hash: ContentHash,
    pub link_hash: LinkHash,
}

impl From<&VoteRecord> for VoteRecordDocument {
    fn from(record: &VoteRecord) -> Self {
        Self {
            election_id: record.election_id,
            position: record.position,
            candidate_id: record.candidate_id,
            voter: record.voter,
            timestamp: record.timestamp,
            content_hash: record.content_hash,
            link_hash: record.link_hash,
        }
    }
}

impl From<VoteRecordDocument> for VoteRecord {
    fn from(document: VoteRecordDocument) -> Self {
        Self {
            election_id: document.election_id,
            position: document.position,
            candidate_id: document.candidate_id,
            voter: document.voter,
            timestamp: document.timestamp,
            content_hash: document.content_hash,
            link_hash: document.link_hash,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoterDocument {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub email: String,
    /// Left out entirely when absent, so the partial unique index skips it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub national_id: Option<NationalId>,
    pub first_name: String,
    pub last_name: String,
    pub rights: Rights,
    pub activated: bool,
    pub password_hash: CredentialHash,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activation_token: Option<ActivationToken>,
}

impl From<&Voter> for VoterDocument {
    fn from(voter: &Voter) -> Self {
        Self {
            id: voter.id.into(),
            email: voter.email.clone(),
            national_id: voter.national_id.clone(),
            first_name: voter.first_name.clone(),
            last_name: voter.last_name.clone(),
            rights: voter.rights,
            activated: voter.activated,
            password_hash: voter.password_hash.clone(),
            activation_token: voter.activation_token.clone(),
        }
    }
}

impl From<VoterDocument> for Voter {
    fn from(document: VoterDocument) -> Self {
        Self {
            id: document.id.into(),
            email: document.email,
            national_id: document.national_id,
            first_name: document.first_name,
            last_name: document.last_name,
            rights: document.rights,
            activated: document.activated,
            password_hash: document.password_hash,
            activation_token: document.activation_token,
        }
    }
}
