use rocket::Route;

mod admin;
mod auth;
mod public;
mod results;
mod voter;
mod voting;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(admin::routes());
    routes.extend(public::routes());
    routes.extend(auth::routes());
    routes.extend(voter::routes());
    routes.extend(voting::routes());
    routes.extend(results::routes());
    routes
}

#[cfg(test)]
pub(crate) use testing::{create_election, login_admin, login_voter};
