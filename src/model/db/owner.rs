use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// Core owner data: the person who authors question boards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerCore {
    pub email: String,
    pub name: String,
    pub password_hash: String,
}

impl OwnerCore {
    /// Check whether the given password is correct.
    pub fn verify_password<T: AsRef<[u8]>>(&self, password: T) -> bool {
        // A malformed hash can never match.
        argon2::verify_encoded(&self.password_hash, password.as_ref()).unwrap_or(false)
    }
}

/// An owner without an ID.
pub type NewOwner = OwnerCore;

/// An owner from the database, with its unique ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Owner {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub owner: OwnerCore,
}

impl Deref for Owner {
    type Target = OwnerCore;

    fn deref(&self) -> &Self::Target {
        &self.owner
    }
}

impl DerefMut for Owner {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.owner
    }
}
