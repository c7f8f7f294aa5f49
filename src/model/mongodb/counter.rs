use mongodb::{
    bson::doc,
    options::{FindOneAndUpdateOptions, ReturnDocument},
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::mongodb::{errors::is_duplicate_key_error, Coll};

/// Counter for election IDs.
pub const ELECTION_ID_COUNTER_ID: &str = "election_id";
/// Counter for candidate IDs, shared by all elections.
pub const CANDIDATE_ID_COUNTER_ID: &str = "candidate_id";

/// A counter object used to implement auto-increment fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Counter {
    #[serde(rename = "_id")]
    pub id: String,
    pub next: u32,
}

impl Counter {
    /// Create a new `Counter` starting at the given value.
    pub fn new(id: impl Into<String>, start: u32) -> Self {
        Self {
            id: id.into(),
            next: start,
        }
    }

    /// Atomically retrieve the next value of the counter with the given ID.
    pub async fn next(counters: &Coll<Counter>, id: &str) -> Result<u32> {
        let update = doc! {
            "$inc": { "next": 1 }
        };
        let options: FindOneAndUpdateOptions = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::Before)
            .build();
        let counter = counters
            .find_one_and_update(doc! { "_id": id }, update, options)
            .await?
            .ok_or_else(|| Error::Storage(format!("Failed to find counter with ID {id}")))?;
        Ok(counter.next)
    }
}

/// Ensure the counter with the given ID exists, starting it at 1 if not.
///
/// This operation is idempotent.
pub async fn ensure_counter_exists(counters: &Coll<Counter>, id: &str) -> Result<()> {
    let result = counters.insert_one(Counter::new(id, 1), None).await;
    if is_duplicate_key_error(result.as_ref()) {
        return Ok(());
    }
    result?;
    info!("Created counter {id}");
    Ok(())
}
