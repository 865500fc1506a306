#[macro_use]
extern crate rocket;

#[cfg(test)]
#[macro_use]
extern crate backend_test;

use rocket::{Build, Rocket};

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod notify;

use config::{ConfigFairing, MailerFairing, StoreFairing};
use logging::LoggerFairing;

/// Build a rocket, configured from `Rocket.toml` and `ROCKET_*` environment variables.
pub fn build() -> Rocket<Build> {
    rocket_with_figment(rocket::Config::figment())
}

/// Build a rocket from an explicit figment, attaching all fairings and routes.
pub fn rocket_with_figment(figment: rocket::figment::Figment) -> Rocket<Build> {
    rocket::custom(figment)
        .attach(LoggerFairing)
        .attach(ConfigFairing)
        .attach(StoreFairing)
        .attach(MailerFairing)
        .mount("/", api::routes())
}

/// Build a rocket for tests: in-memory storage, an outbox instead of a mail relay,
/// and fixed secrets.
#[cfg(test)]
pub(crate) fn rocket_for_tests() -> Rocket<Build> {
    let figment = rocket::Config::figment()
        .merge(("log_level", "off"))
        .merge(("auth_ttl", 3600))
        .merge(("jwt_secret", "test-jwt-secret"))
        .merge(("token_secret", "test-token-secret"))
        .merge(("mail_from", "from@example.com"))
        .merge(("public_url", "http://127.0.0.1:8000"));
    rocket_with_figment(figment)
}
