//! Outgoing mail.

use std::ops::Deref;
use std::sync::{Arc, Mutex};

use log::{debug, info};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A plain-text email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mail {
    pub to: String,
    pub from: String,
    pub subject: String,
    pub body: String,
}

impl Mail {
    /// Ask a respondent to fill in an answer board.
    pub fn answer_request(owner_name: &str, to: String, from: String, link: &str) -> Self {
        Self {
            to,
            from,
            subject: format!("[1 ON 1] {owner_name}さんより質問事項が届いています"),
            body: format!(
                "1 ON 1サービスより質問事項が届いています。\r\n\
                 以下のURLにアクセスして、ご回答をお願いいたします。\r\n\
                 {link}\r\n\r\n"
            ),
        }
    }
}

/// Something that can deliver mail.
#[rocket::async_trait]
pub trait Notifier: Send + Sync {
    async fn deliver(&self, mail: &Mail) -> Result<()>;
}

/// Delivers mail by POSTing it as JSON to an HTTP relay.
pub struct HttpMailer {
    url: String,
    client: Client,
}

impl HttpMailer {
    pub fn new(url: String) -> Self {
        Self {
            url,
            client: Client::new(),
        }
    }
}

#[rocket::async_trait]
impl Notifier for HttpMailer {
    async fn deliver(&self, mail: &Mail) -> Result<()> {
        self.client
            .post(&self.url)
            .json(mail)
            .send()
            .await?
            .error_for_status()?;
        info!("Relayed mail to {}", mail.to);
        Ok(())
    }
}

/// Keeps delivered mail in memory, for development and tests.
#[derive(Debug, Clone, Default)]
pub struct Outbox(Arc<Mutex<Vec<Mail>>>);

impl Outbox {
    /// Everything delivered so far, oldest first.
    pub fn deliveries(&self) -> Vec<Mail> {
        self.0.lock().map(|mails| mails.clone()).unwrap_or_default()
    }

    /// The most recent delivery.
    pub fn last(&self) -> Option<Mail> {
        self.deliveries().pop()
    }
}

#[rocket::async_trait]
impl Notifier for Outbox {
    async fn deliver(&self, mail: &Mail) -> Result<()> {
        debug!("Outbox received mail for {}:\n{}", mail.to, mail.body);
        // A poisoned lock only means another delivery panicked; keep the mail anyway.
        let mut mails = match self.0.lock() {
            Ok(mails) => mails,
            Err(poisoned) => poisoned.into_inner(),
        };
        mails.push(mail.clone());
        Ok(())
    }
}

/// Shared handle on the configured [`Notifier`].
#[derive(Clone)]
pub struct Mailer(Arc<dyn Notifier>);

impl Mailer {
    pub fn new(notifier: impl Notifier + 'static) -> Self {
        Self(Arc::new(notifier))
    }
}

impl Deref for Mailer {
    type Target = dyn Notifier;

    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}
