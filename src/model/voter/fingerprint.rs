use std::fmt::{Debug, Formatter};

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::model::ledger::hash::HASH_LEN;

use super::VoterId;

pub type HmacSha256 = Hmac<Sha256>;

/// A non-reversible identifier for a voter, used to key ledger lookups.
///
/// Never stored: the ledger only keeps a per-election tag derived from it.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; HASH_LEN]);

impl Fingerprint {
    pub const fn from_bytes(bytes: [u8; HASH_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }
}

impl Debug for Fingerprint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        // Keep fingerprints out of logs.
        write!(f, "Fingerprint(..)")
    }
}

/// Derives fingerprints from voter IDs under a server-side secret.
#[derive(Clone)]
pub struct Fingerprinter {
    secret: Vec<u8>,
}

impl Fingerprinter {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
        }
    }

    /// The fingerprint of the given voter: the HMAC of their ID.
    pub fn fingerprint(&self, voter_id: &VoterId) -> Fingerprint {
        let mut hmac =
            HmacSha256::new_from_slice(&self.secret).expect("HMAC can take key of any size");
        hmac.update(&voter_id.to_bytes());
        Fingerprint(hmac.finalize().into_bytes().into())
    }
}
