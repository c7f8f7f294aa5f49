pub mod auth;
pub mod common;
pub mod election;
pub mod ledger;
pub mod memory;
pub mod mongodb;
pub mod tally;
pub mod voter;
pub mod voting;
