use rocket::{http::Status, serde::json::Json, Route, State};
use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    model::{
        auth::{AuthToken, VoterAccount},
        voter::{
            ActivationToken, PasswordChange, PasswordRecovery, Registered, Registration,
            VoterDirectory,
        },
    },
};

pub fn routes() -> Vec<Route> {
    routes![register, activate, change_password, recover_password]
}

/// A freshly issued password.
#[derive(Debug, Serialize, Deserialize)]
pub struct RecoveredPassword {
    pub password: String,
}

#[post("/voters", data = "<registration>", format = "json")]
pub async fn register(
    registration: Json<Registration>,
    directory: &State<VoterDirectory>,
) -> Result<(Status, Json<Registered>)> {
    let registered = directory.register(registration.into_inner()).await?;
    Ok((Status::Created, Json(registered)))
}

#[post("/voters/activate/<token>")]
pub async fn activate(token: &str, directory: &State<VoterDirectory>) -> Result<()> {
    if directory.activate(&ActivationToken::from(token)).await? {
        Ok(())
    } else {
        Err(Error::not_found("Activation token"))
    }
}

#[put("/voters/password", data = "<change>", format = "json")]
pub async fn change_password(
    token: AuthToken<VoterAccount>,
    change: Json<PasswordChange>,
    directory: &State<VoterDirectory>,
) -> Result<()> {
    directory
        .change_password(token.id(), change.into_inner())
        .await
}

#[post("/voters/recover", data = "<recovery>", format = "json")]
pub async fn recover_password(
    recovery: Json<PasswordRecovery>,
    directory: &State<VoterDirectory>,
) -> Result<Json<RecoveredPassword>> {
    directory
        .recover_password(recovery.into_inner())
        .await?
        .map(|password| Json(RecoveredPassword { password }))
        .ok_or_else(|| Error::not_found("Account with that email and national ID"))
}
