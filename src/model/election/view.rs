use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Election, Phase};

/// An election as shown to the public, with its phase at the time of asking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionView {
    #[serde(flatten)]
    pub election: Election,
    pub phase: Phase,
}

impl ElectionView {
    pub fn new(election: Election, now: DateTime<Utc>) -> Self {
        let phase = election.phase(now);
        Self { election, phase }
    }
}
