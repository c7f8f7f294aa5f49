mod bson;
mod collection;
mod counter;
mod documents;
mod errors;
mod store;

pub use bson::{u32_id_filter, Id};
pub use collection::{ensure_indexes_exist, Coll, MongoCollection};
pub use counter::{Counter, CANDIDATE_ID_COUNTER_ID, ELECTION_ID_COUNTER_ID};
pub use documents::{ElectionDocument, VoteRecordDocument, VoterDocument};
pub use store::MongoStore;
