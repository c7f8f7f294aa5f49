use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    model::{auth::Rights, mongodb::Id},
};

use super::{
    credentials::{ActivationToken, CredentialHash, MIN_PASSWORD_LENGTH},
    national_id::NationalId,
};

/// Voter IDs are opaque [`Id`]s.
pub type VoterId = Id;

/// A registered user, as held by the voter directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voter {
    pub id: VoterId,
    /// Normalised to lowercase; unique.
    pub email: String,
    /// Unique. Administrators created at bootstrap have none.
    pub national_id: Option<NationalId>,
    pub first_name: String,
    pub last_name: String,
    pub rights: Rights,
    pub activated: bool,
    pub password_hash: CredentialHash,
    /// Present until the account is activated.
    pub activation_token: Option<ActivationToken>,
}

impl Voter {
    /// Build an unactivated voter from validated registration details.
    pub fn register(registration: Registration) -> Result<Self> {
        let registration = registration.validate()?;
        Ok(Self {
            id: Id::new(),
            email: registration.email,
            national_id: Some(registration.national_id),
            first_name: registration.first_name,
            last_name: registration.last_name,
            rights: Rights::Voter,
            activated: false,
            password_hash: CredentialHash::new(&registration.password)?,
            activation_token: Some(ActivationToken::generate()),
        })
    }

    /// Build an activated administrator.
    pub fn admin(email: &str, password: &str) -> Result<Self> {
        let email = normalise_email(email)?;
        check_password(password, password)?;
        Ok(Self {
            id: Id::new(),
            email,
            national_id: None,
            first_name: "Administrator".to_string(),
            last_name: String::new(),
            rights: Rights::Admin,
            activated: true,
            password_hash: CredentialHash::new(password)?,
            activation_token: None,
        })
    }
}

/// Registration details from a prospective voter. The password is plaintext
/// and never stored directly.
#[derive(Clone, Serialize, Deserialize)]
pub struct Registration {
    pub email: String,
    pub national_id: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
    pub confirm_password: String,
}

/// Registration details that passed validation.
struct ValidRegistration {
    email: String,
    national_id: NationalId,
    first_name: String,
    last_name: String,
    password: String,
}

impl Registration {
    fn validate(self) -> Result<ValidRegistration> {
        let email = normalise_email(&self.email)?;
        let national_id = self
            .national_id
            .trim()
            .parse::<NationalId>()
            .map_err(|err| Error::BadRequest(err.to_string()))?;
        let first_name = self.first_name.trim();
        let last_name = self.last_name.trim();
        if first_name.is_empty() || last_name.is_empty() {
            return Err(Error::BadRequest("First and last name are required".to_string()));
        }
        check_password(&self.password, &self.confirm_password)?;
        Ok(ValidRegistration {
            email,
            national_id,
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            password: self.password,
        })
    }
}

/// Email and password, as presented at login.
#[derive(Clone, Serialize, Deserialize)]
pub struct LoginCredentials {
    pub email: String,
    pub password: String,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
    pub confirm_new_password: String,
}

/// A request for a new password, proven by email and national ID together.
#[derive(Clone, Serialize, Deserialize)]
pub struct PasswordRecovery {
    pub email: String,
    pub national_id: String,
}

/// Trim and lowercase an email, checking it has a plausible shape.
pub fn normalise_email(email: &str) -> Result<String> {
    let email = email.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    };
    if valid {
        Ok(email)
    } else {
        Err(Error::BadRequest(format!("Invalid email address '{email}'")))
    }
}

/// Check a new password meets the minimum length and matches its confirmation.
pub(super) fn check_password(password: &str, confirmation: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(Error::BadRequest(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    if password != confirmation {
        return Err(Error::BadRequest(
            "Password and confirmation do not match".to_string(),
        ));
    }
    Ok(())
}
