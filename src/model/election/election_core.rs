use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::common::{CandidateId, ElectionId};

/// An election and its candidate roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Election {
    pub id: ElectionId,
    pub description: String,
    /// Voting opens at this instant (inclusive).
    pub start: DateTime<Utc>,
    /// Voting closes at this instant (exclusive).
    pub end: DateTime<Utc>,
    /// Candidates in registration order.
    pub candidates: Vec<Candidate>,
}

impl Election {
    pub fn has_started(&self, now: DateTime<Utc>) -> bool {
        now >= self.start
    }

    pub fn has_ended(&self, now: DateTime<Utc>) -> bool {
        now >= self.end
    }

    /// Where in its lifecycle the election is at `now`.
    pub fn phase(&self, now: DateTime<Utc>) -> Phase {
        if self.has_ended(now) {
            Phase::Closed
        } else if self.has_started(now) {
            Phase::Open
        } else {
            Phase::NotStarted
        }
    }

    /// Look up a candidate on this election's roster.
    pub fn candidate(&self, id: CandidateId) -> Option<&Candidate> {
        self.candidates.iter().find(|candidate| candidate.id == id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    /// Unique across all elections.
    pub id: CandidateId,
    pub election_id: ElectionId,
    pub name: String,
}

/// Election lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    NotStarted,
    Open,
    Closed,
}


#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{Duration, TimeZone};

    #[test]
    fn phases() {
        let election = Election::example();
        let before = Utc.with_ymd_and_hms(2022, 3, 31, 23, 59, 59).unwrap();
        let during = Utc.with_ymd_and_hms(2022, 5, 1, 0, 0, 0).unwrap();
        let after = Utc.with_ymd_and_hms(2022, 8, 1, 0, 0, 0).unwrap();
        assert_eq!(election.phase(before), Phase::NotStarted);
        assert_eq!(election.phase(election.start), Phase::Open);
        assert_eq!(election.phase(during), Phase::Open);
        assert_eq!(
            election.phase(election.end - Duration::milliseconds(1)),
            Phase::Open
        );
        assert_eq!(election.phase(election.end), Phase::Closed);
        assert_eq!(election.phase(after), Phase::Closed);
    }

    #[test]
    fn candidate_lookup() {
        let election = Election::example();
        assert_eq!(election.candidate(2).unwrap().name, "Piotr Nowak");
        assert!(election.candidate(3).is_none());
    }
}
