use std::{path::PathBuf, sync::Arc};

use log::{error, info};
use rocket::{
    fairing::{Fairing, Info, Kind},
    Build, Rocket,
};
use serde::Deserialize;

use crate::{
    mail::{LogMailer, Mailer, SesMailer},
    model::transport,
    storage::{FileStore, KvStore, MongoStore, Stores},
};

/// Application configuration, derived from `Rocket.toml` and `ROCKET_*`
/// environment variables. This struct becomes managed state and can be
/// inspected by any endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // non-secrets
    frontend_url: String,
    mailing_list: Vec<String>,
    #[serde(default)]
    debug_endpoints: bool,
    #[serde(default)]
    expose_errors: bool,
}

impl Config {
    /// Base URL of the voting frontend. Login links point here.
    pub fn frontend_url(&self) -> &str {
        self.frontend_url.trim_end_matches('/')
    }

    /// Addresses that receive a token on bulk issuance.
    pub fn mailing_list(&self) -> &[String] {
        &self.mailing_list
    }

    /// Whether the token listing endpoint is enabled.
    pub fn debug_endpoints(&self) -> bool {
        self.debug_endpoints
    }

    /// Whether server error responses carry the underlying error text.
    pub fn expose_errors(&self) -> bool {
        self.expose_errors
    }

    /// The login link that carries a secret ID to its voter.
    pub fn login_link(&self, secret_id: &str) -> String {
        format!(
            "{}/index?token={}",
            self.frontend_url(),
            transport::obfuscate(secret_id)
        )
    }
}

/// A fairing that loads the application config and puts it in managed state.
/// This could easily be achieved using `AdHoc::config`, but is written out
/// explicitly for symmetry with the other fairings and control over error
/// messages.
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
        rocket = rocket.manage(config);
        Ok(rocket)
    }
}

/// Configuration for the storage backend, read from the `storage` table.
#[derive(Debug, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StorageConfig {
    Memory,
    File {
        data_dir: PathBuf,
    },
    Kv {
        // non-secrets
        kv_url: String,
        // secrets
        kv_token: String,
    },
    Mongo {
        db_name: String,
        // secrets
        db_uri: String,
    },
}

impl StorageConfig {
    /// Construct the configured backend.
    pub async fn connect(self) -> Result<Stores, crate::storage::StoreError> {
        Ok(match self {
            Self::Memory => Stores::memory(),
            Self::File { data_dir } => Stores::single(FileStore::open(data_dir).await?),
            Self::Kv { kv_url, kv_token } => Stores::single(KvStore::new(kv_url, kv_token)),
            Self::Mongo { db_name, db_uri } => {
                Stores::single(MongoStore::connect(&db_uri, &db_name).await?)
            }
        })
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::File { .. } => "file",
            Self::Kv { .. } => "kv",
            Self::Mongo { .. } => "mongo",
        }
    }
}

/// A fairing that loads the storage config, connects to the selected backend,
/// and places the resulting [`Stores`] into managed state.
pub struct StorageFairing;

#[rocket::async_trait]
impl Fairing for StorageFairing {
    fn info(&self) -> Info {
        Info {
            name: "Storage",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract_inner::<StorageConfig>("storage") {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load storage config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };
        let backend = config.name();
        info!("Loaded storage config, connecting to {backend} backend...");

        // Construct the backend.
        let stores = match config.connect().await {
            Ok(stores) => stores,
            Err(e) => {
                error!("Failed to connect to {backend} storage: {e}");
                return Err(rocket);
            }
        };
        info!("...storage online!");

        // Manage the state.
        rocket = rocket.manage(stores);
        Ok(rocket)
    }
}

/// Configuration for outbound mail, read from the `mail` table.
#[derive(Debug, Deserialize)]
#[serde(tag = "provider", rename_all = "lowercase")]
pub enum MailConfig {
    Ses {
        // non-secrets
        aws_region: String,
        aws_access_key_id: String,
        sender: String,
        // secrets
        aws_secret_access_key: String,
    },
    Log,
}

impl MailConfig {
    pub fn into_mailer(self) -> Mailer {
        match self {
            Self::Ses {
                aws_region,
                aws_access_key_id,
                sender,
                aws_secret_access_key,
            } => Arc::new(SesMailer::new(
                aws_region,
                aws_access_key_id,
                aws_secret_access_key,
                sender,
            )),
            Self::Log => Arc::new(LogMailer),
        }
    }
}

/// A fairing that loads the mail config and places a [`Mailer`] into
/// managed state.
pub struct MailFairing;

#[rocket::async_trait]
impl Fairing for MailFairing {
    fn info(&self) -> Info {
        Info {
            name: "Mail",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract_inner::<MailConfig>("mail") {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load mail config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };
        let mailer = config.into_mailer();
        info!("Loaded mail config");

        // Manage the state.
        rocket = rocket.manage(mailer);
        Ok(rocket)
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl Config {
        pub fn example() -> Self {
            Self {
                frontend_url: "https://vote.example/".to_string(),
                mailing_list: vec!["a@x.com".to_string(), "b@y.com".to_string()],
                debug_endpoints: false,
                expose_errors: false,
            }
        }

        pub fn example_debug() -> Self {
            Self {
                debug_endpoints: true,
                expose_errors: true,
                ..Self::example()
            }
        }
    }
}
