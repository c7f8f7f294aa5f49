use chrono::{DateTime, TimeZone, Utc};

/// Our election IDs are integers.
pub type ElectionId = u32;
/// Our candidate IDs are integers, unique across all elections.
pub type CandidateId = u32;
/// Position of a vote within its election's chain, starting at 1.
pub type Position = u64;

/// Drop sub-millisecond precision so that a timestamp survives a round trip
/// through BSON unchanged; hashes are computed over the truncated value.
pub fn truncate_to_millis(time: DateTime<Utc>) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(time.timestamp_millis())
        .single()
        .unwrap_or(time)
}
