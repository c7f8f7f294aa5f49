//! For some reason, the mongodb crate doesn't provide error code constants.
//! This module fills in the gaps.

use mongodb::error::{Error as DbError, ErrorKind, WriteFailure};

pub const DUPLICATE_KEY: i32 = 11000;

/// Return true if the given result is a duplicate key write error.
pub fn is_duplicate_key_error<T>(result: Result<T, &DbError>) -> bool {
    duplicate_key_message(result).is_some()
}

/// If the given result is a duplicate key write error, return the server's
/// message, which names the violated index.
pub fn duplicate_key_message<T>(result: Result<T, &DbError>) -> Option<&str> {
    if let Err(err) = result {
        if let ErrorKind::Write(WriteFailure::WriteError(ref e)) = *err.kind {
            if e.code == DUPLICATE_KEY {
                return Some(&e.message);
            }
        }
    }
    None
}
