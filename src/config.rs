use chrono::Duration;
use log::{error, info, warn};
use mongodb::Client as MongoClient;
use rocket::{
    fairing::{Fairing, Info, Kind},
    Build, Rocket,
};
use serde::Deserialize;

use crate::model::store::{MemoryStore, MongoStore, Store};
use crate::notify::{HttpMailer, Mailer, Outbox};

/// Application configuration, derived from `Rocket.toml` and `ROCKET_*`
/// environment variables. This struct becomes managed state and can be
/// inspected by any endpoint.
#[derive(Deserialize)]
pub struct Config {
    // non-secrets
    public_url: Option<String>,
    auth_ttl: u32,
    mail_from: String,
    // secrets
    jwt_secret: String,
    token_secret: String,
}

impl Config {
    /// Externally visible base URL, used when building links for emails.
    /// When unset, links are built from the request's `Host` header.
    pub fn public_url(&self) -> Option<&str> {
        self.public_url.as_deref()
    }

    /// Valid lifetime of auth token cookies in seconds.
    pub fn auth_ttl(&self) -> Duration {
        Duration::seconds(self.auth_ttl.into())
    }

    /// Sender address of outgoing notifications.
    pub fn mail_from(&self) -> &str {
        &self.mail_from
    }

    /// Secret key used to encrypt JWTs.
    pub fn jwt_secret(&self) -> &[u8] {
        self.jwt_secret.as_bytes()
    }

    /// Secret key used to digest answer board tokens before storage.
    pub fn token_secret(&self) -> &[u8] {
        self.token_secret.as_bytes()
    }
}


/// A fairing that loads the application config and puts it in managed state.
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
        let config = match rocket.figment().extract::<Config>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load application config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };

        rocket = rocket.manage(config);
        Ok(rocket)
    }
}

/// Configuration for the database.
#[derive(Deserialize)]
struct DbConfig {
    // secrets
    db_uri: Option<String>,
}

/// A fairing that loads the storage config and places a [`Store`] into managed state.
///
/// With a `db_uri` this connects to MongoDB and ensures the required indexes
/// exist; without one, everything is kept in memory and lost on shutdown.
pub struct StoreFairing;

#[rocket::async_trait]
impl Fairing for StoreFairing {
    fn info(&self) -> Info {
        Info {
            name: "Store",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        let config = match rocket.figment().extract::<DbConfig>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load database config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };

        let store = match config.db_uri {
            Some(db_uri) => {
                info!("Loaded database config, connecting...");
                let client = match MongoClient::with_uri_str(db_uri).await {
                    Ok(client) => client,
                    Err(e) => {
                        error!("Failed to connect to database: {e}");
                        return Err(rocket);
                    }
                };
                let mongo = MongoStore::new(client, &get_database_name());
                if let Err(e) = mongo.ensure_indexes_exist().await {
                    error!("Failed to prepare database: {e}");
                    return Err(rocket);
                }
                info!("...database connection online!");
                Store::new(mongo)
            }
            None => {
                warn!("No `db_uri` configured; using in-memory storage");
                Store::new(MemoryStore::default())
            }
        };

        rocket = rocket.manage(store);
        Ok(rocket)
    }
}

/// Get the name of the database to use (production version).
#[cfg(not(test))]
fn get_database_name() -> String {
    "qboard".to_string()
}

/// Get the name of the database to use (test version).
/// Use a random name to avoid collisions between tests.
#[cfg(test)]
fn get_database_name() -> String {
    let random: u32 = rand::random();
    let db = format!("test{random}");
    info!("Using database {db}");
    db
}

/// Configuration for outgoing mail.
#[derive(Deserialize)]
struct MailConfig {
    mail_relay_url: Option<String>,
}

/// A fairing that places a [`Mailer`] into managed state.
///
/// Mail goes to the configured HTTP relay; without one it is collected in an
/// [`Outbox`], which is also managed so it can be inspected.
pub struct MailerFairing;

#[rocket::async_trait]
impl Fairing for MailerFairing {
    fn info(&self) -> Info {
        Info {
            name: "Mailer",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        let config = match rocket.figment().extract::<MailConfig>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load mail config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };

        rocket = match config.mail_relay_url {
            Some(url) => {
                info!("Sending mail through relay at {url}");
                rocket.manage(Mailer::new(HttpMailer::new(url)))
            }
            None => {
                warn!("No `mail_relay_url` configured; mail will be kept in the outbox");
                let outbox = Outbox::default();
                rocket
                    .manage(Mailer::new(outbox.clone()))
                    .manage(outbox)
            }
        };
        Ok(rocket)
    }
}
