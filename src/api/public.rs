use rocket::{serde::json::Json, Route, State};

use crate::{
    clock::SharedClock,
    error::Result,
    model::{
        common::ElectionId,
        election::{ElectionRegistry, ElectionView},
    },
};

pub fn routes() -> Vec<Route> {
    routes![elections, election]
}

#[get("/elections")]
pub async fn elections(
    registry: &State<ElectionRegistry>,
    clock: &State<SharedClock>,
) -> Result<Json<Vec<ElectionView>>> {
    let now = clock.now();
    let elections = registry
        .list_elections()
        .await?
        .into_iter()
        .map(|election| ElectionView::new(election, now))
        .collect();
    Ok(Json(elections))
}

#[get("/elections/<election_id>")]
pub async fn election(
    election_id: ElectionId,
    registry: &State<ElectionRegistry>,
    clock: &State<SharedClock>,
) -> Result<Json<ElectionView>> {
    let election = registry.get_election(election_id).await?;
    Ok(Json(ElectionView::new(election, clock.now())))
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use rocket::http::Status;

    use crate::{
        api::{create_election, login_admin},
        memory_client,
        model::election::Phase,
    };

    use super::*;

    #[rocket::async_test]
    async fn no_elections() {
        let (client, _) = memory_client().await;
        let response = client.get(uri!(elections)).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let elections: Vec<ElectionView> = response.into_json().await.unwrap();
        assert!(elections.is_empty());
    }

    #[rocket::async_test]
    async fn election_phases_follow_the_clock() {
        let (client, clock) = memory_client().await;
        login_admin(&client).await;
        let created = create_election(&client, &clock).await;
        assert_eq!(created.candidates.len(), 2);

        // Visible without logging in.
        client
            .delete(uri!(crate::api::auth::logout))
            .dispatch()
            .await;

        for (at, phase) in [
            (Utc.with_ymd_and_hms(2022, 3, 1, 0, 0, 0).unwrap(), Phase::NotStarted),
            (created.start, Phase::Open),
            (created.end, Phase::Closed),
        ] {
            clock.set(at);
            let view: ElectionView = client
                .get(uri!(election(created.id)))
                .dispatch()
                .await
                .into_json()
                .await
                .unwrap();
            assert_eq!(view.phase, phase);
            assert_eq!(view.election, created);

            let list: Vec<ElectionView> = client
                .get(uri!(elections))
                .dispatch()
                .await
                .into_json()
                .await
                .unwrap();
            assert_eq!(list, vec![view]);
        }
    }

    #[rocket::async_test]
    async fn unknown_election() {
        let (client, _) = memory_client().await;
        let response = client.get(uri!(election(7))).dispatch().await;
        assert_eq!(Status::NotFound, response.status());
    }
}
