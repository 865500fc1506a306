use rocket::{
    http::Status,
    request::{FromRequest, Outcome, Request},
    State,
};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::{
    api::auth::AuthToken,
    db::{Owner, QuestionBoard},
    mongodb::Id,
    store::Store,
};

/// Fetch a question board, as long as it belongs to the token's owner.
///
/// Boards of other owners are reported as missing.
pub async fn owned_question_board(
    store: &Store,
    token: &AuthToken<Owner>,
    board_id: Id,
) -> Result<QuestionBoard> {
    store
        .find_question_board(board_id)
        .await?
        .filter(|board| board.is_owned_by(token.id))
        .ok_or_else(|| Error::not_found(format!("Question board {board_id}")))
}

/// Scheme and authority that links handed out by this request should start with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseUrl(String);

impl BaseUrl {
    /// Append an absolute path to this base.
    pub fn join(&self, path: impl std::fmt::Display) -> String {
        format!("{}{path}", self.0)
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for BaseUrl {
    type Error = Error;

    /// Use the configured `public_url`, falling back to the request's `Host` header.
    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        // Unwrap is safe as `Config` is always managed.
        let config = req.guard::<&State<Config>>().await.unwrap();
        if let Some(url) = config.public_url() {
            return Outcome::Success(BaseUrl(url.trim_end_matches('/').to_string()));
        }
        match req.host() {
            Some(host) => {
                let scheme = if req.rocket().config().tls_enabled() {
                    "https"
                } else {
                    "http"
                };
                Outcome::Success(BaseUrl(format!("{scheme}://{host}")))
            }
            None => Outcome::Failure((
                Status::BadRequest,
                Error::Status(Status::BadRequest, "Missing Host header".to_string()),
            )),
        }
    }
}
