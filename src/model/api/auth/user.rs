use crate::error::Result;
use crate::model::{db::Owner, mongodb::Id, store::Store};

/// A signed-in user of our application.
///
/// Respondents are not users: their answer board token is their only credential.
#[rocket::async_trait]
pub trait User {
    /// Get the user's ID.
    fn id(&self) -> Id;

    /// Does the user with the given ID still exist?
    async fn exists(store: &Store, id: Id) -> Result<bool>;
}

#[rocket::async_trait]
impl User for Owner {
    fn id(&self) -> Id {
        self.id
    }

    async fn exists(store: &Store, id: Id) -> Result<bool> {
        Ok(store.find_owner(id).await?.is_some())
    }
}
