pub use token::{AuthToken, Principal, AUTH_TOKEN_COOKIE};
pub use user::{AdminAccount, Rights, User, VoterAccount};

mod token;
mod user;
