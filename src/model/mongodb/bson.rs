use std::fmt::{Display, Formatter};
use std::{ops::Deref, str::FromStr};

use mongodb::bson::{doc, oid::ObjectId, Document};
use rocket::request::FromParam;
use serde::{Deserialize, Serialize};

/// An opaque unique ID backed by a MongoDB `ObjectId`.
///
/// Serializes to its hex string so it can appear directly in API responses
/// and token claims; database documents store the raw `ObjectId` instead.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Id(ObjectId);

impl Id {
    /// Generate a fresh ID.
    pub fn new() -> Self {
        Self(ObjectId::new())
    }

    /// A filter document matching this ID as a primary key.
    pub fn as_doc(&self) -> Document {
        doc! { "_id": self.0 }
    }

    /// Raw bytes, used when deriving fingerprints.
    pub fn to_bytes(&self) -> [u8; 12] {
        self.0.bytes()
    }
}

impl Default for Id {
    fn default() -> Self {
        Self::new()
    }
}

impl Deref for Id {
    type Target = ObjectId;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for Id {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_hex())
    }
}

impl FromStr for Id {
    type Err = mongodb::bson::oid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse::<ObjectId>()?))
    }
}

impl TryFrom<String> for Id {
    type Error = mongodb::bson::oid::Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Id> for String {
    fn from(id: Id) -> Self {
        id.to_string()
    }
}

impl From<ObjectId> for Id {
    fn from(id: ObjectId) -> Self {
        Self(id)
    }
}

impl From<Id> for ObjectId {
    fn from(id: Id) -> Self {
        id.0
    }
}

impl<'a> FromParam<'a> for Id {
    type Error = mongodb::bson::oid::Error;

    fn from_param(param: &'a str) -> Result<Self, Self::Error> {
        param.parse::<Id>()
    }
}

/// Filter on an integer primary key.
/// Integers may be stored as either `Int32` or `Int64`; MongoDB compares them numerically.
pub fn u32_id_filter(id: u32) -> Document {
    doc! { "_id": i64::from(id) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_round_trip() {
        let id = Id::new();
        let string: String = id.into();
        assert_eq!(string.len(), 24);
        assert_eq!(string.parse::<Id>().unwrap(), id);
        assert!("not an object id".parse::<Id>().is_err());
    }

    #[test]
    fn serializes_as_hex_string() {
        let id = Id::new();
        let json = rocket::serde::json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id));
    }
}
