use std::ops::Deref;

use mongodb::{
    bson::doc, error::Error as DbError, options::IndexOptions, Collection, Database, IndexModel,
};

use super::{
    counter::Counter,
    documents::{ElectionDocument, VoteRecordDocument, VoterDocument},
};

/// Name of the index enforcing one vote per voter per election.
pub const VOTER_INDEX: &str = "election_voter";
/// Name of the index enforcing one record per chain position.
pub const POSITION_INDEX: &str = "election_position";

/// A type that can be directly inserted/read to/from the database.
pub trait MongoCollection {
    /// The name of the collection.
    const NAME: &'static str;
}

/// A database collection of the given type.
pub struct Coll<T>(Collection<T>);

impl<T> Coll<T>
where
    T: MongoCollection,
{
    /// Get a handle on this collection in the given database.
    pub fn from_db(db: &Database) -> Self {
        Self(db.collection(T::NAME))
    }
}

// `Derive(Clone)` would only derive if `T: Clone`, but we don't need that bound.
impl<T> Clone for Coll<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> Deref for Coll<T> {
    type Target = Collection<T>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl MongoCollection for ElectionDocument {
    const NAME: &'static str = "elections";
}

impl MongoCollection for VoteRecordDocument {
    const NAME: &'static str = "votes";
}

impl MongoCollection for VoterDocument {
    const NAME: &'static str = "voters";
}

impl MongoCollection for Counter {
    const NAME: &'static str = "counters";
}

/// Ensure that all the required indexes exist on the given database.
///
/// This operation is idempotent.
pub async fn ensure_indexes_exist(db: &Database) -> Result<(), DbError> {
    debug!("Ensuring collection indexes exist");

    // Voter collection.
    let email_index = IndexModel::builder()
        .keys(doc! {"email": 1})
        .options(IndexOptions::builder().unique(true).build())
        .build();
    let national_id_index = IndexModel::builder()
        .keys(doc! {"national_id": 1})
        .options(
            IndexOptions::builder()
                .unique(true)
                .partial_filter_expression(doc! {"national_id": {"$exists": true}})
                .build(),
        )
        .build();
    let token_index = IndexModel::builder()
        .keys(doc! {"activation_token": 1})
        .options(IndexOptions::builder().sparse(true).build())
        .build();
    Coll::<VoterDocument>::from_db(db)
        .create_indexes([email_index, national_id_index, token_index], None)
        .await?;

    // Vote collection.
    let voter_index = IndexModel::builder()
        .keys(doc! {"election_id": 1, "voter": 1})
        .options(
            IndexOptions::builder()
                .unique(true)
                .name(VOTER_INDEX.to_string())
                .build(),
        )
        .build();
    let position_index = IndexModel::builder()
        .keys(doc! {"election_id": 1, "position": 1})
        .options(
            IndexOptions::builder()
                .unique(true)
                .name(POSITION_INDEX.to_string())
                .build(),
        )
        .build();
    Coll::<VoteRecordDocument>::from_db(db)
        .create_indexes([voter_index, position_index], None)
        .await?;

    Ok(())
}
