use rocket::{
    http::{CookieJar, Status},
    serde::json::Json,
    Route, State,
};
use serde::{Deserialize, Serialize};

use crate::{
    config::Config,
    error::{Error, Result},
    model::{
        auth::{AdminAccount, AuthToken, Rights, VoterAccount, AUTH_TOKEN_COOKIE},
        mongodb::Id,
        voter::{Authentication, LoginCredentials, VoterDirectory},
    },
};

pub fn routes() -> Vec<Route> {
    routes![login, logout]
}

/// Who just logged in.
#[derive(Debug, Serialize, Deserialize)]
pub struct Session {
    pub id: Id,
    pub rights: Rights,
}

#[post("/auth/login", data = "<credentials>", format = "json")]
pub async fn login(
    cookies: &CookieJar<'_>,
    credentials: Json<LoginCredentials>,
    directory: &State<VoterDirectory>,
    config: &State<Config>,
) -> Result<Json<Session>> {
    let (id, rights) = match directory
        .authenticate(&credentials.email, &credentials.password)
        .await?
    {
        Authentication::Authenticated { id, rights } => (id, rights),
        Authentication::InvalidCredentials => {
            return Err(Error::Unauthorized(
                "No account found with the provided email and password combination".to_string(),
            ))
        }
        Authentication::NotActivated => {
            return Err(Error::Forbidden(format!(
                "Account {} has not been activated",
                credentials.email
            )))
        }
    };

    let cookie = match rights {
        Rights::Voter => AuthToken::<VoterAccount>::new(id).into_cookie(config)?,
        Rights::Admin => AuthToken::<AdminAccount>::new(id).into_cookie(config)?,
    };
    cookies.add(cookie);

    Ok(Json(Session { id, rights }))
}

#[delete("/auth")]
pub fn logout(cookies: &CookieJar) -> Status {
    cookies.remove(AUTH_TOKEN_COOKIE);
    Status::Ok
}

#[cfg(test)]
mod tests {
    use rocket::{http::ContentType, serde::json::serde_json::json};

    use crate::{
        api::{login_admin, login_voter},
        memory_client,
        model::voter::Registration,
    };

    use super::*;

    #[rocket::async_test]
    async fn admin_login() {
        let (client, _) = memory_client().await;
        let response = client
            .post(uri!(login))
            .header(ContentType::JSON)
            .body(
                json!(LoginCredentials {
                    email: crate::TEST_ADMIN_EMAIL.to_uppercase(),
                    password: crate::TEST_ADMIN_PASSWORD.to_string(),
                })
                .to_string(),
            )
            .dispatch()
            .await;

        assert_eq!(Status::Ok, response.status());
        assert!(client.cookies().get(AUTH_TOKEN_COOKIE).is_some());
        let session: Session = response.into_json().await.unwrap();
        assert_eq!(session.rights, Rights::Admin);
    }

    #[rocket::async_test]
    async fn invalid_credentials() {
        let (client, _) = memory_client().await;

        for credentials in [
            LoginCredentials::example(),
            LoginCredentials {
                email: crate::TEST_ADMIN_EMAIL.to_string(),
                password: "wrong password".to_string(),
            },
        ] {
            let response = client
                .post(uri!(login))
                .header(ContentType::JSON)
                .body(json!(credentials).to_string())
                .dispatch()
                .await;
            assert_eq!(Status::Unauthorized, response.status());
            assert_eq!(None, client.cookies().get(AUTH_TOKEN_COOKIE));
        }
    }

    #[rocket::async_test]
    async fn unactivated_voter_cannot_log_in() {
        let (client, _) = memory_client().await;
        client
            .post(uri!(crate::api::voter::register))
            .header(ContentType::JSON)
            .body(json!(Registration::example()).to_string())
            .dispatch()
            .await;

        let response = client
            .post(uri!(login))
            .header(ContentType::JSON)
            .body(json!(LoginCredentials::example()).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Forbidden, response.status());
        assert_eq!(None, client.cookies().get(AUTH_TOKEN_COOKIE));
    }

    #[rocket::async_test]
    async fn voter_login() {
        let (client, _) = memory_client().await;
        login_voter(&client, Registration::example()).await;
        assert!(client.cookies().get(AUTH_TOKEN_COOKIE).is_some());
    }

    #[rocket::async_test]
    async fn logout_admin() {
        let (client, _) = memory_client().await;
        login_admin(&client).await;

        let response = client.delete(uri!(logout)).dispatch().await;

        assert_eq!(Status::Ok, response.status());
        assert_eq!(None, client.cookies().get(AUTH_TOKEN_COOKIE));
    }

    #[rocket::async_test]
    async fn logout_not_logged_in() {
        let (client, _) = memory_client().await;
        let response = client.delete(uri!(logout)).dispatch().await;

        assert_eq!(Status::Ok, response.status());
    }
}
