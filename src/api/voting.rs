use rocket::{http::Status, serde::json::Json, Route, State};

use crate::{
    clock::SharedClock,
    error::{Error, Result},
    model::{
        auth::Principal,
        common::ElectionId,
        election::ElectionRegistry,
        ledger::{IntegrityLedger, ReceiptStatus, VoteReceipt},
        voting::{Admission, Ballot, Rejection, VoteOutcome, VotingMachine},
    },
};

pub fn routes() -> Vec<Route> {
    routes![admission, cast_vote, verify_receipt]
}

#[get("/elections/<election_id>/admission")]
pub async fn admission(
    voter: Principal,
    election_id: ElectionId,
    machine: &State<VotingMachine>,
    clock: &State<SharedClock>,
) -> Result<Json<Admission>> {
    let now = clock.now();
    let decision = machine.admit(&voter.fingerprint, election_id, now).await?;
    let state = machine
        .voter_state(&voter.fingerprint, election_id, now)
        .await?;
    Ok(Json(Admission { decision, state }))
}

#[post("/elections/<election_id>/votes", data = "<ballot>", format = "json")]
pub async fn cast_vote(
    voter: Principal,
    election_id: ElectionId,
    ballot: Json<Ballot>,
    machine: &State<VotingMachine>,
    clock: &State<SharedClock>,
) -> Result<(Status, Json<VoteOutcome>)> {
    let outcome = machine
        .cast_vote(
            &voter.fingerprint,
            election_id,
            ballot.candidate_id,
            clock.now(),
        )
        .await?;
    let status = match outcome {
        VoteOutcome::Recorded(_) => Status::Created,
        VoteOutcome::Rejected(Rejection::AlreadyVoted) => Status::Conflict,
        VoteOutcome::Rejected(Rejection::ElectionNotStarted | Rejection::ElectionEnded) => {
            Status::Forbidden
        }
        VoteOutcome::Rejected(Rejection::ChainCompromised) => Status::ServiceUnavailable,
    };
    Ok((status, Json(outcome)))
}

/// Anyone holding a receipt may check it; no login needed.
#[post(
    "/elections/<election_id>/receipts/verify",
    data = "<receipt>",
    format = "json"
)]
pub async fn verify_receipt(
    election_id: ElectionId,
    receipt: Json<VoteReceipt>,
    registry: &State<ElectionRegistry>,
    ledger: &State<IntegrityLedger>,
) -> Result<Json<ReceiptStatus>> {
    if receipt.election_id != election_id {
        return Err(Error::BadRequest(format!(
            "Receipt is for election {}, not {election_id}",
            receipt.election_id
        )));
    }
    registry.get_election(election_id).await?;
    Ok(Json(ledger.verify_receipt(&receipt).await?))
}
