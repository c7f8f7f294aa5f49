#[macro_use]
extern crate rocket;

#[macro_use]
extern crate log;

#[cfg(test)]
#[macro_use]
extern crate backend_test;

use rocket::{Build, Rocket};

use crate::{
    config::{ConfigFairing, StorageFairing},
    logging::LoggerFairing,
};

pub mod api;
pub mod clock;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;

/// Build the server from `Rocket.toml` and the environment.
pub fn build() -> Rocket<Build> {
    assemble(rocket::build(), StorageFairing::new())
}

fn assemble(rocket: Rocket<Build>, storage: StorageFairing) -> Rocket<Build> {
    rocket
        .mount("/", api::routes())
        .attach(LoggerFairing)
        .attach(ConfigFairing)
        .attach(storage)
}

#[cfg(test)]
pub(crate) use testing::*;

#[cfg(test)]
mod testing {
    use std::sync::Arc;

    use chrono::{DateTime, TimeZone, Utc};
    use mongodb::Client as MongoClient;
    use rocket::{figment::Figment, local::asynchronous::Client, Build, Rocket};

    use super::assemble;
    use crate::{
        clock::{FixedClock, SharedClock},
        config::{get_database_name, StorageFairing},
    };

    pub const TEST_ADMIN_EMAIL: &str = "admin@example.com";
    pub const TEST_ADMIN_PASSWORD: &str = "administrator password";

    /// The default configuration with fixed secrets and a bootstrap admin.
    fn figment(storage: &str) -> Figment {
        rocket::Config::figment()
            .merge(("storage", storage))
            .merge(("auth_ttl", 3600))
            .merge(("jwt_secret", "test jwt secret"))
            .merge(("fingerprint_secret", "test fingerprint secret"))
            .merge(("admin_email", TEST_ADMIN_EMAIL))
            .merge(("admin_password", TEST_ADMIN_PASSWORD))
    }

    /// Midway through `Election::example()`'s voting window.
    pub fn test_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2022, 5, 1, 0, 0, 0).unwrap()
    }

    /// A client for a server on fresh in-memory storage, whose clock starts
    /// at [`test_time`].
    pub async fn memory_client() -> (Client, Arc<FixedClock>) {
        let clock = Arc::new(FixedClock::new(test_time()));
        let rocket = assemble(
            rocket::custom(figment("memory")).manage(clock.clone() as SharedClock),
            StorageFairing::new(),
        );
        let client = Client::tracked(rocket).await.unwrap();
        (client, clock)
    }

    /// Connect to the MongoDB server named by `db_uri`.
    pub async fn db_client() -> MongoClient {
        let db_uri = figment("mongodb")
            .extract_inner::<String>("db_uri")
            .unwrap_or_else(|_| "mongodb://localhost:27017".to_string());
        MongoClient::with_uri_str(db_uri).await.unwrap()
    }

    /// A fresh database name for one test.
    pub fn database() -> String {
        get_database_name()
    }

    /// A server running against the given database. Its clock starts at
    /// [`test_time`] and is also managed as an `Arc<FixedClock>`.
    pub async fn rocket_for_db(db_client: MongoClient, db_name: &str) -> Rocket<Build> {
        let db = db_client.database(db_name);
        let clock = Arc::new(FixedClock::new(test_time()));
        assemble(
            rocket::custom(figment("mongodb"))
                .manage(db_client)
                .manage(clock.clone() as SharedClock)
                .manage(clock),
            StorageFairing::with_database(db),
        )
    }
}
