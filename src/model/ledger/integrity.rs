use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rocket::tokio::sync::Mutex;
use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    model::{
        common::{truncate_to_millis, CandidateId, ElectionId, Position},
        voter::Fingerprint,
    },
};

use super::{
    chain::{verify_records, ChainStatus},
    hash::{voter_tag, GENESIS},
    record::{VoteReceipt, VoteRecord},
    store::{Insertion, LedgerStore},
};

/// How many times to retry an append that lost a position race against
/// another writer sharing the same store.
const MAX_APPEND_ATTEMPTS: usize = 5;

/// Result of an append.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Appended {
    Recorded(VoteReceipt),
    AlreadyVoted,
}

/// Result of checking a receipt against the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReceiptStatus {
    /// The chain is intact and holds this exact record.
    Recorded,
    /// The chain is intact but holds no record matching the receipt.
    Unknown,
    /// The chain cannot be trusted, so the receipt cannot be checked.
    ChainCompromised { position: Position },
}

/// A verified view of an election's records, taken as one snapshot.
#[derive(Debug, Clone)]
pub struct LedgerSnapshot {
    pub status: ChainStatus,
    pub records: Vec<VoteRecord>,
}

/// Per-election exclusive sections, created on first use.
type LockMap = HashMap<ElectionId, Arc<Mutex<()>>>;

/// The tamper-evident, append-only record of every cast vote.
///
/// Appends to one election are serialized by that election's lock; elections
/// never contend with each other, and reads take no lock at all.
#[derive(Clone)]
pub struct IntegrityLedger {
    store: Arc<dyn LedgerStore>,
    locks: Arc<Mutex<LockMap>>,
}

impl IntegrityLedger {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self {
            store,
            locks: Default::default(),
        }
    }

    /// Get (or create) the lock guarding appends to this election.
    async fn election_lock(&self, election_id: ElectionId) -> Arc<Mutex<()>> {
        self.locks
            .lock()
            .await
            .entry(election_id)
            .or_default()
            .clone()
    }

    /// Has this voter already voted in the election?
    pub async fn has_voted(
        &self,
        fingerprint: &Fingerprint,
        election_id: ElectionId,
    ) -> Result<bool> {
        let voter = voter_tag(fingerprint, election_id);
        self.store.contains_voter(election_id, &voter).await
    }

    /// Append a vote, unless the voter has already voted in this election.
    ///
    /// The prior-vote check and the write happen inside the election's
    /// exclusive section, and the store's uniqueness constraints back this
    /// up against writers in other processes.
    pub async fn append(
        &self,
        election_id: ElectionId,
        candidate_id: CandidateId,
        fingerprint: &Fingerprint,
        now: DateTime<Utc>,
    ) -> Result<Appended> {
        let voter = voter_tag(fingerprint, election_id);
        let timestamp = truncate_to_millis(now);

        let lock = self.election_lock(election_id).await;
        let _guard = lock.lock().await;

        for attempt in 1..=MAX_APPEND_ATTEMPTS {
            if self.store.contains_voter(election_id, &voter).await? {
                debug!("Rejected repeat vote in election {election_id}");
                return Ok(Appended::AlreadyVoted);
            }

            let (position, previous) = match self.store.last_record(election_id).await? {
                Some(last) => (last.position + 1, last.link_hash),
                None => (1, GENESIS),
            };
            let record = VoteRecord::new(
                election_id,
                position,
                candidate_id,
                voter,
                timestamp,
                &previous,
            );

            match self.store.insert(&record).await? {
                Insertion::Inserted => {
                    info!("Appended vote {position} to election {election_id}");
                    return Ok(Appended::Recorded(record.receipt()));
                }
                Insertion::VoterTaken => {
                    debug!("Rejected repeat vote in election {election_id} at insert");
                    return Ok(Appended::AlreadyVoted);
                }
                Insertion::PositionTaken => {
                    warn!(
                        "Position {position} of election {election_id} was taken by another \
                         writer (attempt {attempt}/{MAX_APPEND_ATTEMPTS})"
                    );
                }
            }
        }

        Err(Error::Storage(format!(
            "Could not append to election {election_id} after {MAX_APPEND_ATTEMPTS} attempts"
        )))
    }

    /// Read the election's records and verify them as one snapshot.
    pub async fn snapshot(&self, election_id: ElectionId) -> Result<LedgerSnapshot> {
        let records = self.store.records(election_id).await?;
        let status = verify_records(election_id, &records);
        if let ChainStatus::Compromised { position } = status {
            error!("Vote chain of election {election_id} is compromised at position {position}");
        }
        Ok(LedgerSnapshot { status, records })
    }

    /// Recompute every hash of the election's chain.
    pub async fn verify_chain(&self, election_id: ElectionId) -> Result<ChainStatus> {
        Ok(self.snapshot(election_id).await?.status)
    }

    /// Check that a receipt refers to a record still present in an intact chain.
    pub async fn verify_receipt(&self, receipt: &VoteReceipt) -> Result<ReceiptStatus> {
        let snapshot = self.snapshot(receipt.election_id).await?;
        if let ChainStatus::Compromised { position } = snapshot.status {
            return Ok(ReceiptStatus::ChainCompromised { position });
        }
        let recorded = usize::try_from(receipt.position)
            .ok()
            .and_then(|position| position.checked_sub(1))
            .and_then(|index| snapshot.records.get(index))
            .map_or(false, |record| record.link_hash == receipt.link_hash);
        Ok(if recorded {
            ReceiptStatus::Recorded
        } else {
            ReceiptStatus::Unknown
        })
    }

    /// All records of the election, unverified.
    pub async fn records(&self, election_id: ElectionId) -> Result<Vec<VoteRecord>> {
        self.store.records(election_id).await
    }

    /// Hold the election's exclusive section. Lets tests prove elections don't contend.
    #[cfg(test)]
    pub(crate) async fn lock_election(
        &self,
        election_id: ElectionId,
    ) -> rocket::tokio::sync::OwnedMutexGuard<()> {
        self.election_lock(election_id).await.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::TimeZone;
    use rocket::tokio::{self, time::Duration};

    use crate::model::{ledger::hash::Digest32, memory::MemoryStore, voter::Fingerprint};

    const E1: ElectionId = 1;
    const E2: ElectionId = 2;

    fn ledger() -> (IntegrityLedger, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (IntegrityLedger::new(store.clone()), store)
    }

    fn voter(n: u8) -> Fingerprint {
        Fingerprint::from_bytes([n; 32])
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2022, 5, 1, 12, 0, 0).unwrap()
    }

    async fn receipt(
        ledger: &IntegrityLedger,
        election: ElectionId,
        candidate: CandidateId,
        n: u8,
    ) -> VoteReceipt {
        match ledger
            .append(election, candidate, &voter(n), now())
            .await
            .unwrap()
        {
            Appended::Recorded(receipt) => receipt,
            Appended::AlreadyVoted => panic!("voter {n} unexpectedly rejected"),
        }
    }

    #[rocket::async_test]
    async fn append_then_has_voted() {
        let (ledger, _) = ledger();
        assert!(!ledger.has_voted(&voter(1), E1).await.unwrap());

        let first = receipt(&ledger, E1, 10, 1).await;
        assert_eq!(first.position, 1);
        assert_eq!(first.election_id, E1);
        assert!(ledger.has_voted(&voter(1), E1).await.unwrap());
        // Only in that election.
        assert!(!ledger.has_voted(&voter(1), E2).await.unwrap());

        let second = receipt(&ledger, E1, 11, 2).await;
        assert_eq!(second.position, 2);
        assert_ne!(first.link_hash, second.link_hash);
    }

    #[rocket::async_test]
    async fn second_append_is_rejected() {
        let (ledger, _) = ledger();
        receipt(&ledger, E1, 10, 1).await;
        let again = ledger
            .append(E1, 11, &voter(1), now() + chrono::Duration::days(1))
            .await
            .unwrap();
        assert_eq!(again, Appended::AlreadyVoted);
        assert_eq!(ledger.records(E1).await.unwrap().len(), 1);
    }

    #[rocket::async_test]
    async fn records_never_store_the_fingerprint() {
        let (ledger, _) = ledger();
        receipt(&ledger, E1, 10, 1).await;
        let record = &ledger.records(E1).await.unwrap()[0];
        assert_ne!(record.voter.as_bytes(), voter(1).as_bytes());
        assert_eq!(record.voter, voter_tag(&voter(1), E1));
    }

    #[rocket::async_test]
    async fn elections_have_independent_chains() {
        let (ledger, _) = ledger();
        receipt(&ledger, E1, 10, 1).await;
        receipt(&ledger, E1, 10, 2).await;
        let other = receipt(&ledger, E2, 20, 1).await;
        assert_eq!(other.position, 1);
        assert!(ledger.verify_chain(E1).await.unwrap().is_intact());
        assert!(ledger.verify_chain(E2).await.unwrap().is_intact());
    }

    #[rocket::async_test]
    async fn verification_is_idempotent() {
        let (ledger, _) = ledger();
        for n in 0..4 {
            receipt(&ledger, E1, 10, n).await;
        }
        let first = ledger.verify_chain(E1).await.unwrap();
        let second = ledger.verify_chain(E1).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(
            first,
            ChainStatus::Intact {
                length: 4,
                head: ledger.records(E1).await.unwrap()[3].link_hash
            }
        );
    }

    #[rocket::async_test]
    async fn tampering_in_storage_is_detected() {
        let (ledger, store) = ledger();
        for n in 0..5 {
            receipt(&ledger, E1, 10, n).await;
        }
        store
            .tamper_record(E1, 3, |record| record.candidate_id = 11)
            .await;
        let status = ledger.verify_chain(E1).await.unwrap();
        assert_eq!(status, ChainStatus::Compromised { position: 3 });
        // Stays compromised.
        assert_eq!(ledger.verify_chain(E1).await.unwrap(), status);
    }

    #[rocket::async_test]
    async fn receipts_verify() {
        let (ledger, store) = ledger();
        let first = receipt(&ledger, E1, 10, 1).await;
        let second = receipt(&ledger, E1, 11, 2).await;
        assert_eq!(ledger.verify_receipt(&first).await.unwrap(), ReceiptStatus::Recorded);
        assert_eq!(ledger.verify_receipt(&second).await.unwrap(), ReceiptStatus::Recorded);

        let forged = VoteReceipt {
            link_hash: Digest32::from_bytes([9; 32]),
            ..first
        };
        assert_eq!(ledger.verify_receipt(&forged).await.unwrap(), ReceiptStatus::Unknown);
        let missing = VoteReceipt { position: 7, ..first };
        assert_eq!(ledger.verify_receipt(&missing).await.unwrap(), ReceiptStatus::Unknown);
        let zero = VoteReceipt { position: 0, ..first };
        assert_eq!(ledger.verify_receipt(&zero).await.unwrap(), ReceiptStatus::Unknown);

        store
            .tamper_record(E1, 1, |record| record.candidate_id = 11)
            .await;
        assert_eq!(
            ledger.verify_receipt(&second).await.unwrap(),
            ReceiptStatus::ChainCompromised { position: 1 }
        );
    }

    #[rocket::async_test]
    async fn concurrent_appends_for_one_voter() {
        const M: u32 = 16;
        let (ledger, _) = ledger();
        let handles = (0..M)
            .map(|candidate| {
                let ledger = ledger.clone();
                tokio::spawn(async move { ledger.append(E1, candidate, &voter(1), now()).await })
            })
            .collect::<Vec<_>>();

        let mut recorded = 0;
        let mut rejected = 0;
        for handle in handles {
            match handle.await.unwrap().unwrap() {
                Appended::Recorded(_) => recorded += 1,
                Appended::AlreadyVoted => rejected += 1,
            }
        }
        assert_eq!(recorded, 1);
        assert_eq!(rejected, M - 1);
        assert_eq!(ledger.records(E1).await.unwrap().len(), 1);
    }

    #[rocket::async_test]
    async fn concurrent_appends_for_many_voters_keep_the_chain_intact() {
        const M: u8 = 20;
        let (ledger, _) = ledger();
        let handles = (0..M)
            .map(|n| {
                let ledger = ledger.clone();
                tokio::spawn(async move { ledger.append(E1, 10, &voter(n), now()).await })
            })
            .collect::<Vec<_>>();
        for handle in handles {
            assert!(matches!(
                handle.await.unwrap().unwrap(),
                Appended::Recorded(_)
            ));
        }
        assert_eq!(
            ledger.verify_chain(E1).await.unwrap().compromised_at(),
            None
        );
        assert_eq!(ledger.records(E1).await.unwrap().len(), usize::from(M));
    }

    #[rocket::async_test]
    async fn held_election_does_not_block_others() {
        let (ledger, _) = ledger();
        let _held = ledger.lock_election(E1).await;

        // Another election appends and verifies freely.
        let appended = tokio::time::timeout(
            Duration::from_secs(5),
            ledger.append(E2, 20, &voter(1), now()),
        )
        .await
        .expect("append to another election blocked");
        assert!(matches!(appended.unwrap(), Appended::Recorded(_)));

        // Reads of the held election don't wait either.
        let status = tokio::time::timeout(Duration::from_secs(5), ledger.verify_chain(E1))
            .await
            .expect("verification blocked");
        assert!(status.unwrap().is_intact());

        // But appends to it do.
        let blocked = tokio::time::timeout(
            Duration::from_millis(100),
            ledger.append(E1, 10, &voter(2), now()),
        )
        .await;
        assert!(blocked.is_err());
    }
}
