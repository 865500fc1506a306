use argon2::Error as Argon2Error;
use jsonwebtoken::errors::{Error as JwtError, ErrorKind as JwtErrorKind};
use log::{error, warn};
use mongodb::error::Error as DbError;
use reqwest::Error as MailError;
use rocket::{
    http::{Status, StatusClass},
    response::{self, Responder},
    serde::json::Json,
    Request,
};
use thiserror::Error;

use crate::model::api::validation::FormErrors;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error(transparent)]
    Jwt(#[from] JwtError),
    #[error(transparent)]
    Argon2(#[from] Argon2Error),
    #[error("Mail delivery failed: {0}")]
    Mail(#[from] MailError),
    #[error("Validation failed: {0:?}")]
    Validation(FormErrors),
    #[error("{1}")]
    Status(Status, String),
}

impl Error {
    /// Shorthand for a 404 naming the missing thing.
    pub fn not_found(what: String) -> Self {
        Self::Status(Status::NotFound, format!("{what} not found"))
    }

    /// The HTTP status this error is reported with.
    pub fn status(&self) -> Status {
        match self {
            Self::Db(_) | Self::Argon2(_) => Status::InternalServerError,
            Self::Mail(_) => Status::BadGateway,
            Self::Jwt(err) => match err.kind() {
                JwtErrorKind::ExpiredSignature | JwtErrorKind::ImmatureSignature => {
                    Status::Unauthorized
                }
                _ => Status::InternalServerError,
            },
            Self::Validation(_) => Status::UnprocessableEntity,
            Self::Status(status, _) => *status,
        }
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'o> {
        let status = self.status();
        match status.class() {
            StatusClass::ServerError => error!("{self}"),
            _ => warn!("{self}"),
        }
        match self {
            // The form is re-shown client side, so the field errors travel in the body.
            Self::Validation(errors) => (status, Json(errors)).respond_to(req),
            _ => Err(status),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_expired_tokens_are_unauthorized() {
        let expired = Error::Jwt(JwtErrorKind::ExpiredSignature.into());
        assert_eq!(expired.status(), Status::Unauthorized);
        let invalid = Error::Jwt(JwtErrorKind::InvalidSignature.into());
        assert_eq!(invalid.status(), Status::InternalServerError);
        assert_eq!(
            Error::not_found("Owner".to_string()).status(),
            Status::NotFound
        );
    }
}
