use std::fmt::{Debug, Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use data_encoding::HEXLOWER;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::model::{
    common::{CandidateId, ElectionId},
    voter::Fingerprint,
};

/// Domain separators, so that no two kinds of hash can collide by construction.
const CONTENT_DOMAIN: &[u8] = b"ivoting/vote-content/v1";
const LINK_DOMAIN: &[u8] = b"ivoting/vote-link/v1";
const VOTER_TAG_DOMAIN: &[u8] = b"ivoting/voter-tag/v1";

pub const HASH_LEN: usize = 32;

/// A SHA-256 digest, rendered as lowercase hex in every external format.
#[derive(Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Digest32([u8; HASH_LEN]);

impl Digest32 {
    pub const fn from_bytes(bytes: [u8; HASH_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }

    fn of(parts: &[&[u8]]) -> Self {
        let mut hasher = Sha256::new();
        for part in parts {
            hasher.update(part);
        }
        Self(hasher.finalize().into())
    }
}

impl Display for Digest32 {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", HEXLOWER.encode(&self.0))
    }
}

impl Debug for Digest32 {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Digest32({self})")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DigestParseError {
    #[error(transparent)]
    Hex(#[from] data_encoding::DecodeError),
    #[error("Expected {HASH_LEN} bytes, got {0}")]
    Length(usize),
}

impl FromStr for Digest32 {
    type Err = DigestParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = HEXLOWER.decode(s.as_bytes())?;
        let len = bytes.len();
        let array: [u8; HASH_LEN] = bytes
            .try_into()
            .map_err(|_| DigestParseError::Length(len))?;
        Ok(Self(array))
    }
}

impl TryFrom<String> for Digest32 {
    type Error = DigestParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Digest32> for String {
    fn from(digest: Digest32) -> Self {
        digest.to_string()
    }
}

/// The hash of a vote record's own fields.
pub type ContentHash = Digest32;
/// The chaining hash: content hash combined with the previous link.
pub type LinkHash = Digest32;
/// A voter's fingerprint salted with the election ID.
/// Records store only this, so votes cannot be linked across elections.
pub type VoterTag = Digest32;

/// The "previous link" of the first record in every election.
pub const GENESIS: LinkHash = Digest32::from_bytes([0; HASH_LEN]);

/// Derive the per-election voter tag for a fingerprint.
pub fn voter_tag(fingerprint: &Fingerprint, election_id: ElectionId) -> VoterTag {
    Digest32::of(&[
        VOTER_TAG_DOMAIN,
        fingerprint.as_bytes(),
        &election_id.to_le_bytes(),
    ])
}

/// Hash the fields of a vote record.
pub fn content_hash(
    election_id: ElectionId,
    candidate_id: CandidateId,
    voter: &VoterTag,
    timestamp: DateTime<Utc>,
) -> ContentHash {
    Digest32::of(&[
        CONTENT_DOMAIN,
        &election_id.to_le_bytes(),
        &candidate_id.to_le_bytes(),
        voter.as_bytes(),
        &timestamp.timestamp_millis().to_le_bytes(),
    ])
}

/// Chain a content hash onto the previous link.
pub fn link_hash(content: &ContentHash, previous: &LinkHash) -> LinkHash {
    Digest32::of(&[LINK_DOMAIN, content.as_bytes(), previous.as_bytes()])
}
