use rocket::{serde::json::Json, Route, State};

use crate::{
    error::Result,
    model::{
        common::ElectionId,
        election::ElectionRegistry,
        ledger::{ChainStatus, IntegrityLedger},
        tally::{LedgerDump, ResultTabulator, Tally},
    },
};

pub fn routes() -> Vec<Route> {
    routes![verification, results, dump]
}

#[get("/elections/<election_id>/verification")]
pub async fn verification(
    election_id: ElectionId,
    registry: &State<ElectionRegistry>,
    ledger: &State<IntegrityLedger>,
) -> Result<Json<ChainStatus>> {
    // Unknown elections are a 404, not an empty chain.
    registry.get_election(election_id).await?;
    Ok(Json(ledger.verify_chain(election_id).await?))
}

#[get("/elections/<election_id>/results")]
pub async fn results(
    election_id: ElectionId,
    tabulator: &State<ResultTabulator>,
) -> Result<Json<Tally>> {
    Ok(Json(tabulator.tally(election_id).await?))
}

/// The whole chain, for auditing with `verification-cli`.
#[get("/elections/<election_id>/dump")]
pub async fn dump(
    election_id: ElectionId,
    tabulator: &State<ResultTabulator>,
) -> Result<Json<LedgerDump>> {
    Ok(Json(tabulator.dump(election_id).await?))
}
