use std::fmt::{Debug, Display, Formatter};
use std::str::FromStr;

use data_encoding::{BASE64URL_NOPAD, HEXLOWER};
use hmac::{Hmac, Mac};
use rand::RngCore;
use rocket::{
    http::{
        impl_from_uri_param_identity,
        uri::fmt::{Path, UriDisplay},
    },
    request::FromParam,
};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

use crate::config::Config;

pub type HmacSha256 = Hmac<Sha256>;

/// Number of random bytes in a token.
pub const TOKEN_BYTES: usize = 32;

/// The secret credential granting a respondent access to one answer board.
///
/// Tokens are random and unrelated to any database ID. They are handed out
/// once, in the notification link, and only their [`TokenDigest`] is stored.
#[derive(Clone, PartialEq, Eq)]
pub struct AnswerToken(String);

impl AnswerToken {
    /// Generate a fresh random token.
    pub fn generate() -> Self {
        let mut bytes = [0_u8; TOKEN_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(BASE64URL_NOPAD.encode(&bytes))
    }

    /// The keyed digest under which this token's answer board is stored.
    pub fn digest(&self, config: &Config) -> TokenDigest {
        let mut hmac = HmacSha256::new_from_slice(config.token_secret())
            .expect("HMAC can take key of any size");
        hmac.update(self.0.as_bytes());
        TokenDigest(HEXLOWER.encode(&hmac.finalize().into_bytes()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Never print the credential itself.
impl Debug for AnswerToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("AnswerToken(..)")
    }
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Malformed answer board token")]
    Malformed,
}

impl FromStr for AnswerToken {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match BASE64URL_NOPAD.decode(s.as_bytes()) {
            Ok(bytes) if bytes.len() == TOKEN_BYTES => Ok(Self(s.to_string())),
            _ => Err(TokenError::Malformed),
        }
    }
}

impl<'a> FromParam<'a> for AnswerToken {
    type Error = TokenError;

    fn from_param(param: &'a str) -> Result<Self, Self::Error> {
        param.parse()
    }
}

impl UriDisplay<Path> for AnswerToken {
    fn fmt(&self, formatter: &mut rocket::http::uri::fmt::Formatter<'_, Path>) -> std::fmt::Result {
        formatter.write_value(&self.0)
    }
}

impl_from_uri_param_identity!([Path] AnswerToken);

/// Stored form of an [`AnswerToken`]: a hex HMAC-SHA256 under the server's token secret.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenDigest(String);

impl Display for TokenDigest {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
