use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    model::auth::Rights,
};

use super::{
    credentials::{
        generate_password, ActivationToken, CredentialHash, RECOVERED_PASSWORD_LENGTH,
    },
    national_id::NationalId,
    voter_core::{
        check_password, normalise_email, PasswordChange, PasswordRecovery, Registration, Voter,
        VoterId,
    },
};

/// Durable storage for registered users.
///
/// Implementations must keep emails unique, and national IDs unique where present.
#[rocket::async_trait]
pub trait VoterStore: Send + Sync {
    /// Insert a new voter. Returns false if the email or national ID is taken.
    async fn insert_voter(&self, voter: &Voter) -> Result<bool>;

    async fn voter_by_id(&self, id: VoterId) -> Result<Option<Voter>>;

    /// Look up by (normalised) email.
    async fn voter_by_email(&self, email: &str) -> Result<Option<Voter>>;

    async fn voter_by_activation_token(&self, token: &ActivationToken) -> Result<Option<Voter>>;

    /// Replace the stored voter with the same ID. Returns false if there is none.
    async fn update_voter(&self, voter: &Voter) -> Result<bool>;
}

/// A successful registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registered {
    pub id: VoterId,
    /// Delivered to the voter out of band.
    pub activation_token: ActivationToken,
}

/// Outcome of checking a user's credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authentication {
    Authenticated { id: VoterId, rights: Rights },
    InvalidCredentials,
    NotActivated,
}

/// Registration, activation and authentication of users.
#[derive(Clone)]
pub struct VoterDirectory {
    store: Arc<dyn VoterStore>,
}

impl VoterDirectory {
    pub fn new(store: Arc<dyn VoterStore>) -> Self {
        Self { store }
    }

    /// Register a new, unactivated voter.
    pub async fn register(&self, registration: Registration) -> Result<Registered> {
        let voter = Voter::register(registration)?;
        if !self.store.insert_voter(&voter).await? {
            return Err(Error::Conflict(
                "Email or national ID is already registered".to_string(),
            ));
        }
        info!("Registered voter {}", voter.id);
        Ok(Registered {
            id: voter.id,
            // Always present on a fresh registration.
            activation_token: voter
                .activation_token
                .ok_or_else(|| Error::Storage("Registration lost its token".to_string()))?,
        })
    }

    /// Activate the account holding this token, consuming the token.
    /// Returns false if no account holds it.
    pub async fn activate(&self, token: &ActivationToken) -> Result<bool> {
        let Some(mut voter) = self.store.voter_by_activation_token(token).await? else {
            debug!("Unknown activation token");
            return Ok(false);
        };
        voter.activated = true;
        voter.activation_token = None;
        let updated = self.store.update_voter(&voter).await?;
        if updated {
            info!("Activated voter {}", voter.id);
        }
        Ok(updated)
    }

    /// Check an email and password.
    ///
    /// The activation state is only revealed to someone who knows the password.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<Authentication> {
        let email = email.trim().to_lowercase();
        let Some(voter) = self.store.voter_by_email(&email).await? else {
            return Ok(Authentication::InvalidCredentials);
        };
        if !voter.password_hash.verify(password) {
            debug!("Wrong password for voter {}", voter.id);
            return Ok(Authentication::InvalidCredentials);
        }
        if !voter.activated {
            return Ok(Authentication::NotActivated);
        }
        Ok(Authentication::Authenticated {
            id: voter.id,
            rights: voter.rights,
        })
    }

    /// Get a voter by ID.
    pub async fn voter(&self, id: VoterId) -> Result<Voter> {
        self.store
            .voter_by_id(id)
            .await?
            .ok_or_else(|| Error::not_found(format!("Voter with ID '{id}'")))
    }

    pub async fn is_activated(&self, id: VoterId) -> Result<bool> {
        Ok(self.voter(id).await?.activated)
    }

    /// Change a voter's password, given their current one.
    pub async fn change_password(&self, id: VoterId, change: PasswordChange) -> Result<()> {
        let mut voter = self.voter(id).await?;
        if !voter.password_hash.verify(&change.current_password) {
            return Err(Error::Unauthorized("Current password is incorrect".to_string()));
        }
        check_password(&change.new_password, &change.confirm_new_password)?;
        voter.password_hash = CredentialHash::new(&change.new_password)?;
        self.replace(&voter).await?;
        info!("Changed password of voter {id}");
        Ok(())
    }

    /// Issue a fresh random password when the email and national ID match
    /// the same account. Returns `None` if they don't.
    pub async fn recover_password(&self, recovery: PasswordRecovery) -> Result<Option<String>> {
        let Ok(email) = normalise_email(&recovery.email) else {
            return Ok(None);
        };
        let Ok(national_id) = recovery.national_id.trim().parse::<NationalId>() else {
            return Ok(None);
        };
        let mut voter = match self.store.voter_by_email(&email).await? {
            Some(voter) if voter.national_id.as_ref() == Some(&national_id) => voter,
            _ => {
                debug!("Password recovery details did not match an account");
                return Ok(None);
            }
        };

        let password = generate_password(RECOVERED_PASSWORD_LENGTH);
        voter.password_hash = CredentialHash::new(&password)?;
        self.replace(&voter).await?;
        info!("Issued recovered password for voter {}", voter.id);
        Ok(Some(password))
    }

    /// Ensure an administrator with this email exists, creating one if not.
    pub async fn ensure_admin(&self, email: &str, password: &str) -> Result<()> {
        let admin = Voter::admin(email, password)?;
        match self.store.voter_by_email(&admin.email).await? {
            Some(existing) if existing.rights == Rights::Admin => {
                debug!("Administrator {} already exists", existing.email);
            }
            Some(existing) => {
                warn!(
                    "Bootstrap administrator email {} belongs to a voter account",
                    existing.email
                );
            }
            None => {
                if self.store.insert_voter(&admin).await? {
                    info!("Created administrator {}", admin.email);
                }
            }
        }
        Ok(())
    }

    async fn replace(&self, voter: &Voter) -> Result<()> {
        if self.store.update_voter(voter).await? {
            Ok(())
        } else {
            Err(Error::not_found(format!("Voter with ID '{}'", voter.id)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::model::{
        memory::MemoryStore,
        voter::{LoginCredentials, MIN_PASSWORD_LENGTH},
    };

    fn directory() -> VoterDirectory {
        VoterDirectory::new(Arc::new(MemoryStore::new()))
    }

    async fn login(directory: &VoterDirectory, credentials: LoginCredentials) -> Authentication {
        directory
            .authenticate(&credentials.email, &credentials.password)
            .await
            .unwrap()
    }

    async fn activated(directory: &VoterDirectory, registration: Registration) -> VoterId {
        let registered = directory.register(registration).await.unwrap();
        assert!(directory.activate(&registered.activation_token).await.unwrap());
        registered.id
    }

    #[rocket::async_test]
    async fn register_activate_login() {
        let directory = directory();
        let registered = directory.register(Registration::example()).await.unwrap();
        assert!(!directory.is_activated(registered.id).await.unwrap());
        assert_eq!(
            login(&directory, LoginCredentials::example()).await,
            Authentication::NotActivated
        );

        assert!(directory.activate(&registered.activation_token).await.unwrap());
        assert!(directory.is_activated(registered.id).await.unwrap());
        assert_eq!(
            login(&directory, LoginCredentials::example()).await,
            Authentication::Authenticated {
                id: registered.id,
                rights: Rights::Voter
            }
        );

        // Tokens are single use.
        assert!(!directory.activate(&registered.activation_token).await.unwrap());
    }

    #[rocket::async_test]
    async fn stored_voter_matches_registration() {
        let directory = directory();
        let registered = directory.register(Registration::example()).await.unwrap();
        let voter = directory.voter(registered.id).await.unwrap();
        let registration = Registration::example();
        assert_eq!(voter.email, registration.email);
        assert_eq!(voter.first_name, registration.first_name);
        assert_eq!(voter.last_name, registration.last_name);
        assert_eq!(
            voter.national_id.unwrap().as_str(),
            registration.national_id
        );
        assert!(voter.password_hash.verify(&registration.password));
    }

    #[rocket::async_test]
    async fn duplicate_registrations_conflict() {
        let directory = directory();
        directory.register(Registration::example()).await.unwrap();
        let same_email = Registration {
            national_id: "58010662721".to_string(),
            ..Registration::example()
        };
        let same_national_id = Registration {
            email: "other@op.pl".to_string(),
            ..Registration::example()
        };
        for registration in [same_email, same_national_id] {
            assert!(matches!(
                directory.register(registration).await,
                Err(Error::Conflict(_))
            ));
        }
    }

    #[rocket::async_test]
    async fn wrong_credentials() {
        let directory = directory();
        activated(&directory, Registration::example()).await;
        let wrong_password = LoginCredentials {
            password: "PASSW0RD".to_string(),
            ..LoginCredentials::example()
        };
        let unknown_email = LoginCredentials {
            email: "nobody@op.pl".to_string(),
            ..LoginCredentials::example()
        };
        for credentials in [wrong_password, unknown_email] {
            assert_eq!(
                login(&directory, credentials).await,
                Authentication::InvalidCredentials
            );
        }
        // Activation state stays hidden without the password.
        directory.register(Registration::example2()).await.unwrap();
        let wrong_password = LoginCredentials {
            password: "incorrect horse".to_string(),
            ..LoginCredentials::example2()
        };
        assert_eq!(
            login(&directory, wrong_password).await,
            Authentication::InvalidCredentials
        );
    }

    #[rocket::async_test]
    async fn change_password() {
        let directory = directory();
        let id = activated(&directory, Registration::example()).await;

        let wrong_current = PasswordChange {
            current_password: "wrong password".to_string(),
            new_password: "PASSW0RD".to_string(),
            confirm_new_password: "PASSW0RD".to_string(),
        };
        assert!(matches!(
            directory.change_password(id, wrong_current).await,
            Err(Error::Unauthorized(_))
        ));
        let mismatch = PasswordChange {
            current_password: "P@ssw0rd".to_string(),
            new_password: "PASSW0RD".to_string(),
            confirm_new_password: "PASSWORD".to_string(),
        };
        assert!(matches!(
            directory.change_password(id, mismatch).await,
            Err(Error::BadRequest(_))
        ));

        directory
            .change_password(
                id,
                PasswordChange {
                    current_password: "P@ssw0rd".to_string(),
                    new_password: "PASSW0RD".to_string(),
                    confirm_new_password: "PASSW0RD".to_string(),
                },
            )
            .await
            .unwrap();
        assert_eq!(
            login(&directory, LoginCredentials::example()).await,
            Authentication::InvalidCredentials
        );
        let new_credentials = LoginCredentials {
            password: "PASSW0RD".to_string(),
            ..LoginCredentials::example()
        };
        assert!(matches!(
            login(&directory, new_credentials).await,
            Authentication::Authenticated { .. }
        ));
    }

    #[rocket::async_test]
    async fn recover_password() {
        let directory = directory();
        let id = activated(&directory, Registration::example()).await;

        let mismatched = PasswordRecovery {
            email: "test@op.pl".to_string(),
            national_id: "58010662721".to_string(),
        };
        assert_eq!(directory.recover_password(mismatched).await.unwrap(), None);

        let password = directory
            .recover_password(PasswordRecovery {
                email: "test@op.pl".to_string(),
                national_id: "51092337495".to_string(),
            })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(password.chars().count(), RECOVERED_PASSWORD_LENGTH);
        assert!(password.chars().count() >= MIN_PASSWORD_LENGTH);
        assert_eq!(
            login(
                &directory,
                LoginCredentials {
                    email: "test@op.pl".to_string(),
                    password,
                }
            )
            .await,
            Authentication::Authenticated {
                id,
                rights: Rights::Voter
            }
        );
    }

    #[rocket::async_test]
    async fn unknown_voter_is_not_found() {
        let directory = directory();
        assert!(matches!(
            directory.is_activated(VoterId::new()).await,
            Err(Error::NotFound(_))
        ));
    }

    #[rocket::async_test]
    async fn admin_bootstrap_is_idempotent() {
        let directory = directory();
        directory
            .ensure_admin("admin@example.com", "administrator")
            .await
            .unwrap();
        directory
            .ensure_admin("admin@example.com", "another password")
            .await
            .unwrap();
        match login(
            &directory,
            LoginCredentials {
                email: "admin@example.com".to_string(),
                password: "administrator".to_string(),
            },
        )
        .await
        {
            Authentication::Authenticated { rights, .. } => assert_eq!(rights, Rights::Admin),
            other => panic!("unexpected {other:?}"),
        }
    }
}
