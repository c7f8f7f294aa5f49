use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const PESEL_LEN: usize = 11;
const WEIGHTS: [u32; PESEL_LEN - 1] = [1, 3, 7, 9, 1, 3, 7, 9, 1, 3];

/// A Polish national identification number (PESEL) with a valid check digit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct NationalId(String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum NationalIdError {
    #[error("National ID must be {PESEL_LEN} characters long, got {0}")]
    Length(usize),
    #[error("National ID must contain only digits")]
    NotDigits,
    #[error("National ID check digit does not match")]
    Checksum,
}

impl NationalId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for NationalId {
    type Err = NationalIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .chars()
            .map(|c| c.to_digit(10).ok_or(NationalIdError::NotDigits))
            .collect::<Result<Vec<_>, _>>()?;
        if digits.len() != PESEL_LEN {
            return Err(NationalIdError::Length(s.chars().count()));
        }

        let sum: u32 = digits
            .iter()
            .zip(WEIGHTS)
            .map(|(digit, weight)| digit * weight)
            .sum();
        if (10 - sum % 10) % 10 != digits[PESEL_LEN - 1] {
            return Err(NationalIdError::Checksum);
        }
        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for NationalId {
    type Error = NationalIdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<NationalId> for String {
    fn from(id: NationalId) -> Self {
        id.0
    }
}

impl Display for NationalId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
