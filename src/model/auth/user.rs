use std::fmt::Display;

use serde_repr::{Deserialize_repr, Serialize_repr};

/// A kind of user that can hold an auth token.
pub trait User {
    const RIGHTS: Rights;
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum Rights {
    Voter = 0,
    Admin = 1,
}

impl Display for Rights {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            formatter,
            "{}",
            match self {
                Self::Voter => "voter",
                Self::Admin => "admin",
            }
        )
    }
}

/// A logged-in account with voter rights.
pub struct VoterAccount;

impl User for VoterAccount {
    const RIGHTS: Rights = Rights::Voter;
}

/// A logged-in account with administrator rights.
pub struct AdminAccount;

impl User for AdminAccount {
    const RIGHTS: Rights = Rights::Admin;
}
