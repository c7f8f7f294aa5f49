use std::sync::Arc;

use chrono::Duration;
use mongodb::{Client as MongoClient, Database};
use rocket::{
    fairing::{Fairing, Info, Kind},
    Build, Rocket,
};
use serde::Deserialize;

use crate::{
    clock::{SharedClock, SystemClock},
    model::{
        election::{ElectionRegistry, ElectionStore},
        ledger::{IntegrityLedger, LedgerStore},
        memory::MemoryStore,
        mongodb::MongoStore,
        tally::ResultTabulator,
        voter::{Fingerprinter, VoterDirectory, VoterStore},
        voting::VotingMachine,
    },
};

/// Which storage backend to run on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    /// In-process; nothing survives a restart.
    #[default]
    Memory,
    Mongodb,
}

/// Application configuration, derived from `Rocket.toml` and `ROCKET_*`
/// environment variables. This struct becomes managed state and can be
/// inspected by any endpoint.
#[derive(Deserialize)]
pub struct Config {
    // non-secrets
    auth_ttl: u32,
    #[serde(default)]
    storage: StorageKind,
    admin_email: Option<String>,
    // secrets
    jwt_secret: String,
    fingerprint_secret: String,
    admin_password: Option<String>,
}

impl Config {
    /// Valid lifetime of auth token cookies in seconds.
    pub fn auth_ttl(&self) -> Duration {
        Duration::seconds(self.auth_ttl.into())
    }

    /// Secret key used to sign JWTs.
    pub fn jwt_secret(&self) -> &[u8] {
        self.jwt_secret.as_bytes()
    }

    /// Secret key voter fingerprints are derived under.
    pub fn fingerprint_secret(&self) -> &[u8] {
        self.fingerprint_secret.as_bytes()
    }

    pub fn storage(&self) -> StorageKind {
        self.storage
    }

    /// Credentials of the administrator to create at startup, if any.
    pub fn bootstrap_admin(&self) -> Option<(&str, &str)> {
        Some((self.admin_email.as_deref()?, self.admin_password.as_deref()?))
    }
}

/// A fairing that loads the application config and puts it in managed state,
/// along with the fingerprinter and (unless one is already managed) the clock.
pub struct ConfigFairing;

#[rocket::async_trait]
impl Fairing for ConfigFairing {
    fn info(&self) -> Info {
        Info {
            name: "Config",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<Config>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load application config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };

        // Manage the state.
        rocket = rocket.manage(Fingerprinter::new(config.fingerprint_secret()));
        rocket = rocket.manage(config);
        if rocket.state::<SharedClock>().is_none() {
            rocket = rocket.manage(Arc::new(SystemClock) as SharedClock);
        }
        Ok(rocket)
    }
}

/// Configuration for the database.
#[derive(Deserialize)]
struct DbConfig {
    // secrets
    db_uri: String,
}

/// A fairing that sets up the configured storage backend and places the
/// registry, ledger, directory, voting machine and tabulator into managed
/// state. With MongoDB, the `Client` and `Database` are managed too.
///
/// Must be attached after [`ConfigFairing`].
#[derive(Default)]
pub struct StorageFairing {
    database: Option<Database>,
}

impl StorageFairing {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use this database rather than connecting to the configured one.
    pub fn with_database(database: Database) -> Self {
        Self {
            database: Some(database),
        }
    }
}

#[rocket::async_trait]
impl Fairing for StorageFairing {
    fn info(&self) -> Info {
        Info {
            name: "Storage",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        let Some(config) = rocket.state::<Config>() else {
            error!("Storage requires the application config to be loaded first");
            return Err(rocket);
        };
        let admin = config
            .bootstrap_admin()
            .map(|(email, password)| (email.to_string(), password.to_string()));
        let kind = match self.database {
            Some(_) => StorageKind::Mongodb,
            None => config.storage(),
        };

        let services = match kind {
            StorageKind::Memory => {
                warn!("Using in-memory storage; nothing will survive a restart");
                Services::new(Arc::new(MemoryStore::new()))
            }
            StorageKind::Mongodb => {
                let db = match &self.database {
                    Some(db) => db.clone(),
                    None => match connect(&rocket).await {
                        Some((client, db)) => {
                            rocket = rocket.manage(client);
                            db
                        }
                        None => return Err(rocket),
                    },
                };
                let store = match MongoStore::prepare(&db).await {
                    Ok(store) => store,
                    Err(e) => {
                        error!("Failed to prepare database: {e}");
                        return Err(rocket);
                    }
                };
                rocket = rocket.manage(db);
                Services::new(Arc::new(store))
            }
        };

        // Ensure the bootstrap administrator exists.
        if let Some((email, password)) = admin {
            if let Err(e) = services.directory.ensure_admin(&email, &password).await {
                error!("Failed to create administrator {email}: {e}");
                return Err(rocket);
            }
        }

        Ok(services.manage(rocket))
    }
}

/// Connect to the configured MongoDB server.
async fn connect(rocket: &Rocket<Build>) -> Option<(MongoClient, Database)> {
    // Load the config.
    let config = match rocket.figment().extract::<DbConfig>() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load database config");
            rocket::config::pretty_print_error(e);
            return None;
        }
    };
    info!("Loaded database config, connecting...");
    // Construct the connection.
    let client = match MongoClient::with_uri_str(config.db_uri).await {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to connect to database: {e}");
            return None;
        }
    };
    info!("...database connection online!");
    let db = client.database(&get_database_name());
    Some((client, db))
}

/// Get the name of the database to use (production version).
#[cfg(not(test))]
pub fn get_database_name() -> String {
    "ivoting".to_string()
}

/// Get the name of the database to use (test version).
/// Use a random name to avoid collisions between tests.
#[cfg(test)]
pub fn get_database_name() -> String {
    let random: u32 = rand::random();
    let db = format!("test{random}");
    info!("Using database {db}");
    db
}

/// The services built over one storage backend.
struct Services {
    registry: ElectionRegistry,
    ledger: IntegrityLedger,
    directory: VoterDirectory,
}

impl Services {
    fn new<S>(store: Arc<S>) -> Self
    where
        S: ElectionStore + LedgerStore + VoterStore + 'static,
    {
        Self {
            registry: ElectionRegistry::new(store.clone()),
            ledger: IntegrityLedger::new(store.clone()),
            directory: VoterDirectory::new(store),
        }
    }

    fn manage(self, rocket: Rocket<Build>) -> Rocket<Build> {
        let machine = VotingMachine::new(self.registry.clone(), self.ledger.clone());
        let tabulator = ResultTabulator::new(self.registry.clone(), self.ledger.clone());
        rocket
            .manage(self.registry)
            .manage(self.ledger)
            .manage(self.directory)
            .manage(machine)
            .manage(tabulator)
    }
}

