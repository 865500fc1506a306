//! Persistence behind a single trait, so routes do not care where data lives.

use std::ops::Deref;
use std::sync::Arc;

use rocket::{
    request::{self, FromRequest, Request},
    State,
};

use crate::error::Result;
use crate::model::{
    common::token::TokenDigest,
    db::{
        AnswerBoard, AnswerUpdate, NewAnswerBoard, NewOwner, NewQuestionBoard, Owner, Question,
        QuestionBoard,
    },
    mongodb::Id,
};

mod memory;
mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

/// Storage operations. Each call is atomic.
#[rocket::async_trait]
pub trait Storage: Send + Sync {
    /// Insert a new owner. Fails with `409 Conflict` if the email is taken.
    async fn insert_owner(&self, owner: NewOwner) -> Result<Owner>;
    async fn find_owner(&self, id: Id) -> Result<Option<Owner>>;
    async fn find_owner_by_email(&self, email: &str) -> Result<Option<Owner>>;

    /// All boards authored by the given owner, oldest first.
    async fn question_boards_for(&self, owner_id: Id) -> Result<Vec<QuestionBoard>>;
    async fn find_question_board(&self, id: Id) -> Result<Option<QuestionBoard>>;
    async fn insert_question_board(&self, board: NewQuestionBoard) -> Result<QuestionBoard>;
    /// Replace a board's title and questions, discarding answers to any
    /// question that is no longer present. `None` if the board does not exist.
    async fn update_question_board(
        &self,
        id: Id,
        title: String,
        questions: Vec<Question>,
    ) -> Result<Option<QuestionBoard>>;
    /// Delete a board together with its answer boards. Returns whether it existed.
    async fn delete_question_board(&self, id: Id) -> Result<bool>;

    async fn insert_answer_board(&self, board: NewAnswerBoard) -> Result<AnswerBoard>;
    async fn delete_answer_board(&self, id: Id) -> Result<bool>;
    async fn find_answer_board(&self, digest: &TokenDigest) -> Result<Option<AnswerBoard>>;
    /// All answer boards for the given question board, oldest first.
    async fn answer_boards_for(&self, question_board_id: Id) -> Result<Vec<AnswerBoard>>;
    /// Merge an update into the answer board with the given token digest,
    /// touching only the fields present. `None` if there is no such board.
    async fn update_answers(
        &self,
        digest: &TokenDigest,
        update: AnswerUpdate,
    ) -> Result<Option<AnswerBoard>>;
}

/// Shared handle on the configured [`Storage`] backend.
#[derive(Clone)]
pub struct Store(Arc<dyn Storage>);

impl Store {
    pub fn new(storage: impl Storage + 'static) -> Self {
        Self(Arc::new(storage))
    }
}

impl Deref for Store {
    type Target = dyn Storage;

    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Store {
    type Error = ();

    /// Get the store from the managed state.
    ///
    /// Panics iff the [`Store`] is not managed by [`rocket::Rocket`].
    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let store = req.guard::<&State<Store>>().await.unwrap();
        request::Outcome::Success(store.inner().clone())
    }
}
