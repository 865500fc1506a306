use std::collections::HashSet;

use log::debug;
use mongodb::{
    bson::{doc, Bson, DateTime as BsonDateTime, Document},
    error::Error as DbError,
    options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument},
    Client, Database,
};
use rocket::{futures::TryStreamExt, http::Status};

use crate::error::{Error, Result};
use crate::model::{
    common::token::TokenDigest,
    db::{
        AnswerBoard, AnswerUpdate, NewAnswerBoard, NewOwner, NewQuestionBoard, Owner, Question,
        QuestionBoard,
    },
    mongodb::{ensure_indexes_exist, is_duplicate_key_error, now, Coll, Id, MongoCollection},
};

use super::Storage;

/// Storage in a MongoDB database. Multi-document writes run in transactions,
/// so the server must be a replica set.
pub struct MongoStore {
    client: Client,
    db: Database,
}

impl MongoStore {
    pub fn new(client: Client, db_name: &str) -> Self {
        let db = client.database(db_name);
        Self { client, db }
    }

    /// Create the indexes the queries below rely on.
    pub async fn ensure_indexes_exist(&self) -> std::result::Result<(), DbError> {
        ensure_indexes_exist(&self.db).await
    }

    fn coll<T: MongoCollection>(&self) -> Coll<T> {
        Coll::from_db(&self.db)
    }
}

/// Oldest first; IDs are allocated in creation order.
fn oldest_first() -> FindOptions {
    FindOptions::builder().sort(doc! { "_id": 1 }).build()
}

fn token_filter(digest: &TokenDigest) -> Document {
    doc! { "token_digest": digest.to_string() }
}

#[rocket::async_trait]
impl Storage for MongoStore {
    async fn insert_owner(&self, owner: NewOwner) -> Result<Owner> {
        let owner = Owner {
            id: Id::new(),
            owner,
        };
        match self.coll::<Owner>().insert_one(&owner, None).await {
            Ok(_) => Ok(owner),
            Err(e) if is_duplicate_key_error(&e) => Err(Error::Status(
                Status::Conflict,
                format!("Owner {} already exists", owner.email),
            )),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_owner(&self, id: Id) -> Result<Option<Owner>> {
        Ok(self.coll::<Owner>().find_one(id.as_doc(), None).await?)
    }

    async fn find_owner_by_email(&self, email: &str) -> Result<Option<Owner>> {
        let filter = doc! { "email": email };
        Ok(self.coll::<Owner>().find_one(filter, None).await?)
    }

    async fn question_boards_for(&self, owner_id: Id) -> Result<Vec<QuestionBoard>> {
        let filter = doc! { "owner_id": owner_id };
        Ok(self
            .coll::<QuestionBoard>()
            .find(filter, oldest_first())
            .await?
            .try_collect()
            .await?)
    }

    async fn find_question_board(&self, id: Id) -> Result<Option<QuestionBoard>> {
        Ok(self.coll::<QuestionBoard>().find_one(id.as_doc(), None).await?)
    }

    async fn insert_question_board(&self, board: NewQuestionBoard) -> Result<QuestionBoard> {
        let board = QuestionBoard {
            id: Id::new(),
            board,
        };
        self.coll::<QuestionBoard>().insert_one(&board, None).await?;
        debug!("Inserted question board {}", board.id);
        Ok(board)
    }

    async fn update_question_board(
        &self,
        id: Id,
        title: String,
        questions: Vec<Question>,
    ) -> Result<Option<QuestionBoard>> {
        let boards = self.coll::<QuestionBoard>();
        let answer_boards = self.coll::<AnswerBoard>();

        let mut session = self.client.start_session(None).await?;
        session.start_transaction(None).await?;

        let mut board = match boards
            .find_one_with_session(id.as_doc(), None, &mut session)
            .await?
        {
            Some(board) => board,
            None => {
                session.abort_transaction().await?;
                return Ok(None);
            }
        };

        // Questions that disappear take their answers with them.
        let kept: HashSet<Id> = questions.iter().map(|question| question.id).collect();
        let removed: Document = board
            .questions
            .iter()
            .filter(|question| !kept.contains(&question.id))
            .map(|question| (format!("answers.{}", question.id), Bson::String(String::new())))
            .collect();

        board.title = title;
        board.questions = questions;
        board.updated_at = now();
        boards
            .replace_one_with_session(id.as_doc(), &board, None, &mut session)
            .await?;

        if !removed.is_empty() {
            answer_boards
                .update_many_with_session(
                    doc! { "question_board_id": id },
                    doc! { "$unset": removed },
                    None,
                    &mut session,
                )
                .await?;
        }

        session.commit_transaction().await?;
        Ok(Some(board))
    }

    async fn delete_question_board(&self, id: Id) -> Result<bool> {
        let mut session = self.client.start_session(None).await?;
        session.start_transaction(None).await?;

        let result = self
            .coll::<QuestionBoard>()
            .delete_one_with_session(id.as_doc(), None, &mut session)
            .await?;
        if result.deleted_count == 0 {
            session.abort_transaction().await?;
            return Ok(false);
        }
        self.coll::<AnswerBoard>()
            .delete_many_with_session(doc! { "question_board_id": id }, None, &mut session)
            .await?;

        session.commit_transaction().await?;
        debug!("Deleted question board {id} and its answer boards");
        Ok(true)
    }

    async fn insert_answer_board(&self, board: NewAnswerBoard) -> Result<AnswerBoard> {
        let board = AnswerBoard {
            id: Id::new(),
            board,
        };
        match self.coll::<AnswerBoard>().insert_one(&board, None).await {
            Ok(_) => {
                debug!("Inserted answer board {}", board.id);
                Ok(board)
            }
            Err(e) if is_duplicate_key_error(&e) => Err(Error::Status(
                Status::Conflict,
                "Answer board token already in use".to_string(),
            )),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_answer_board(&self, id: Id) -> Result<bool> {
        let result = self
            .coll::<AnswerBoard>()
            .delete_one(id.as_doc(), None)
            .await?;
        Ok(result.deleted_count == 1)
    }

    async fn find_answer_board(&self, digest: &TokenDigest) -> Result<Option<AnswerBoard>> {
        Ok(self
            .coll::<AnswerBoard>()
            .find_one(token_filter(digest), None)
            .await?)
    }

    async fn answer_boards_for(&self, question_board_id: Id) -> Result<Vec<AnswerBoard>> {
        let filter = doc! { "question_board_id": question_board_id };
        Ok(self
            .coll::<AnswerBoard>()
            .find(filter, oldest_first())
            .await?
            .try_collect()
            .await?)
    }

    async fn update_answers(
        &self,
        digest: &TokenDigest,
        mut update: AnswerUpdate,
    ) -> Result<Option<AnswerBoard>> {
        let answer_boards = self.coll::<AnswerBoard>();

        let mut session = self.client.start_session(None).await?;
        session.start_transaction(None).await?;

        let current = match answer_boards
            .find_one_with_session(token_filter(digest), None, &mut session)
            .await?
        {
            Some(current) => current,
            None => {
                session.abort_transaction().await?;
                return Ok(None);
            }
        };

        // Touching the question board makes a concurrent edit of its
        // questions conflict with this transaction.
        let board = self
            .coll::<QuestionBoard>()
            .find_one_and_update_with_session(
                current.question_board_id.as_doc(),
                doc! { "$currentDate": { "answered_at": true } },
                None,
                &mut session,
            )
            .await?;
        match &board {
            Some(board) => update.retain_questions_of(board),
            None => update.answers.clear(),
        }
        if !update.changes(&current) {
            session.abort_transaction().await?;
            return Ok(Some(current));
        }

        // Each answer is its own field, so concurrent partial submissions
        // only overwrite the answers they carry.
        let mut set = doc! { "updated_at": BsonDateTime::from_chrono(now()) };
        if let Some(name) = update.name {
            set.insert("name", name);
        }
        for (question_id, body) in update.answers {
            set.insert(format!("answers.{question_id}"), body);
        }

        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        let updated = answer_boards
            .find_one_and_update_with_session(
                token_filter(digest),
                doc! { "$set": set },
                options,
                &mut session,
            )
            .await?;

        session.commit_transaction().await?;
        Ok(updated)
    }
}
