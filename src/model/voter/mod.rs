pub use credentials::{
    generate_password, ActivationToken, CredentialHash, MIN_PASSWORD_LENGTH,
    RECOVERED_PASSWORD_LENGTH,
};
pub use directory::{Authentication, Registered, VoterDirectory, VoterStore};
pub use fingerprint::{Fingerprint, Fingerprinter, HmacSha256};
pub use national_id::{NationalId, NationalIdError};
pub use voter_core::{
    normalise_email, LoginCredentials, PasswordChange, PasswordRecovery, Registration, Voter,
    VoterId,
};

mod credentials;
mod directory;
mod fingerprint;
mod national_id;
mod voter_core;
