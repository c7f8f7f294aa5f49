//! The per-election hash chain of cast votes.

pub use chain::{verify_records, ChainStatus};
pub use hash::{Digest32, LinkHash, VoterTag, GENESIS};
pub use integrity::{Appended, IntegrityLedger, LedgerSnapshot, ReceiptStatus};
pub use record::{VoteReceipt, VoteRecord};
pub use store::{Insertion, LedgerStore};

#[cfg(test)]
pub(crate) use chain::build_chain;

mod chain;
pub mod hash;
mod integrity;
mod record;
mod store;
