#[macro_use]
extern crate rocket;

#[cfg(test)]
#[macro_use]
extern crate backend_test;

use rocket::{Build, Rocket};

use crate::{
    config::{ConfigFairing, MailFairing, StorageFairing},
    logging::LoggerFairing,
    mail::Mailer,
    storage::Stores,
};

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod mail;
pub mod model;
pub mod service;
pub mod storage;

pub use config::Config;

/// The server as configured by `Rocket.toml` and the environment.
pub fn build() -> Rocket<Build> {
    rocket::build()
        .mount("/", api::routes())
        .register("/", api::catchers())
        .attach(LoggerFairing)
        .attach(ConfigFairing)
        .attach(StorageFairing)
        .attach(MailFairing)
}

/// The server with its state supplied directly rather than loaded from
/// configuration.
pub fn rocket_for_test(config: Config, stores: Stores, mailer: Mailer) -> Rocket<Build> {
    rocket::build()
        .mount("/", api::routes())
        .register("/", api::catchers())
        .attach(LoggerFairing)
        .manage(config)
        .manage(stores)
        .manage(mailer)
}
