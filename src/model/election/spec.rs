use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// An election specification, as submitted by an administrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElectionSpec {
    pub description: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ElectionSpec {
    /// Check the voting window is well formed and the description non-empty.
    pub fn validate(&self) -> Result<()> {
        if self.start >= self.end {
            return Err(Error::InvalidRange {
                start: self.start,
                end: self.end,
            });
        }
        if self.description.trim().is_empty() {
            return Err(Error::BadRequest(
                "Election description is required".to_string(),
            ));
        }
        Ok(())
    }
}

/// A candidate specification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateSpec {
    pub name: String,
}

impl CandidateSpec {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::BadRequest("Candidate name is required".to_string()));
        }
        Ok(())
    }
}
