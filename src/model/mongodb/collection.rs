use std::ops::Deref;

use log::debug;
use mongodb::{
    bson::doc, error::Error as DbError, options::IndexOptions, Collection, Database, IndexModel,
};

use crate::model::db::{
    AnswerBoard, NewAnswerBoard, NewOwner, NewQuestionBoard, Owner, QuestionBoard,
};

/// A type that can be directly inserted/read to/from the database.
pub trait MongoCollection {
    /// The name of the collection.
    const NAME: &'static str;
}

/// A database collection of the given type.
pub struct Coll<T>(Collection<T>);

impl<T> Coll<T>
where
    T: MongoCollection,
{
    /// Get a handle on this collection in the given database.
    pub fn from_db(db: &Database) -> Self {
        Self(db.collection(T::NAME))
    }
}

// `Derive(Clone)` would only derive if `T: Clone`, but we don't need that bound.
impl<T> Clone for Coll<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> Deref for Coll<T> {
    type Target = Collection<T>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

// Owner collections
const OWNERS: &str = "owners";
impl MongoCollection for Owner {
    const NAME: &'static str = OWNERS;
}
impl MongoCollection for NewOwner {
    const NAME: &'static str = OWNERS;
}

// Question board collections
const QUESTION_BOARDS: &str = "question_boards";
impl MongoCollection for QuestionBoard {
    const NAME: &'static str = QUESTION_BOARDS;
}
impl MongoCollection for NewQuestionBoard {
    const NAME: &'static str = QUESTION_BOARDS;
}

// Answer board collections
const ANSWER_BOARDS: &str = "answer_boards";
impl MongoCollection for AnswerBoard {
    const NAME: &'static str = ANSWER_BOARDS;
}
impl MongoCollection for NewAnswerBoard {
    const NAME: &'static str = ANSWER_BOARDS;
}

/// Ensure that all the required indexes exist on the given database.
///
/// This operation is idempotent.
pub async fn ensure_indexes_exist(db: &Database) -> Result<(), DbError> {
    debug!("Ensuring collection indexes exist");

    let unique = IndexOptions::builder().unique(true).build();

    // Owner collection.
    let owner_index = IndexModel::builder()
        .keys(doc! {"email": 1})
        .options(unique.clone())
        .build();
    Coll::<Owner>::from_db(db)
        .create_index(owner_index, None)
        .await?;

    // Question board collection.
    let board_index = IndexModel::builder().keys(doc! {"owner_id": 1}).build();
    Coll::<QuestionBoard>::from_db(db)
        .create_index(board_index, None)
        .await?;

    // Answer board collection.
    let token_index = IndexModel::builder()
        .keys(doc! {"token_digest": 1})
        .options(unique)
        .build();
    let parent_index = IndexModel::builder()
        .keys(doc! {"question_board_id": 1})
        .build();
    Coll::<AnswerBoard>::from_db(db)
        .create_indexes([token_index, parent_index], None)
        .await?;

    Ok(())
}
