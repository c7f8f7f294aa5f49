use rocket::{http::Status, serde::json::Json, Route, State};

use crate::{
    clock::SharedClock,
    error::{Error, Result},
    model::{
        auth::{AdminAccount, AuthToken},
        common::ElectionId,
        election::{Candidate, CandidateSpec, Election, ElectionRegistry, ElectionSpec},
    },
};

pub fn routes() -> Vec<Route> {
    routes![create_election, add_candidate]
}

#[post("/elections", data = "<spec>", format = "json")]
pub async fn create_election(
    _token: AuthToken<AdminAccount>,
    spec: Json<ElectionSpec>,
    registry: &State<ElectionRegistry>,
) -> Result<(Status, Json<Election>)> {
    let id = registry.create_election(&spec).await?;
    let election = registry.get_election(id).await?;
    Ok((Status::Created, Json(election)))
}

#[post("/elections/<election_id>/candidates", data = "<spec>", format = "json")]
pub async fn add_candidate(
    _token: AuthToken<AdminAccount>,
    election_id: ElectionId,
    spec: Json<CandidateSpec>,
    registry: &State<ElectionRegistry>,
    clock: &State<SharedClock>,
) -> Result<(Status, Json<Candidate>)> {
    let id = registry
        .add_candidate(election_id, &spec, clock.now())
        .await?;
    let candidate = registry
        .get_election(election_id)
        .await?
        .candidate(id)
        .cloned()
        .ok_or_else(|| Error::not_found(format!("Candidate with ID '{id}'")))?;
    Ok((Status::Created, Json(candidate)))
}
