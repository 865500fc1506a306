use std::collections::HashMap;

use log::debug;
use rocket::{http::Status, tokio::sync::RwLock};

use crate::error::{Error, Result};
use crate::model::{
    common::token::TokenDigest,
    db::{
        AnswerBoard, AnswerUpdate, NewAnswerBoard, NewOwner, NewQuestionBoard, Owner, Question,
        QuestionBoard,
    },
    mongodb::{now, Id},
};

use super::Storage;

#[derive(Default)]
struct Tables {
    owners: HashMap<Id, Owner>,
    question_boards: HashMap<Id, QuestionBoard>,
    answer_boards: HashMap<Id, AnswerBoard>,
}

/// Process-local storage, used when no database is configured.
///
/// A single lock guards all tables, so every operation is atomic.
#[derive(Default)]
pub struct MemoryStore(RwLock<Tables>);

#[rocket::async_trait]
impl Storage for MemoryStore {
    async fn insert_owner(&self, owner: NewOwner) -> Result<Owner> {
        let mut tables = self.0.write().await;
        if tables.owners.values().any(|o| o.email == owner.email) {
            return Err(Error::Status(
                Status::Conflict,
                format!("Owner {} already exists", owner.email),
            ));
        }
        let owner = Owner {
            id: Id::new(),
            owner,
        };
        tables.owners.insert(owner.id, owner.clone());
        debug!("Inserted owner {}", owner.id);
        Ok(owner)
    }

    async fn find_owner(&self, id: Id) -> Result<Option<Owner>> {
        Ok(self.0.read().await.owners.get(&id).cloned())
    }

    async fn find_owner_by_email(&self, email: &str) -> Result<Option<Owner>> {
        let tables = self.0.read().await;
        Ok(tables.owners.values().find(|o| o.email == email).cloned())
    }

    async fn question_boards_for(&self, owner_id: Id) -> Result<Vec<QuestionBoard>> {
        let tables = self.0.read().await;
        let mut boards: Vec<_> = tables
            .question_boards
            .values()
            .filter(|board| board.is_owned_by(owner_id))
            .cloned()
            .collect();
        boards.sort_by_key(|board| (board.created_at, board.id));
        Ok(boards)
    }

    async fn find_question_board(&self, id: Id) -> Result<Option<QuestionBoard>> {
        Ok(self.0.read().await.question_boards.get(&id).cloned())
    }

    async fn insert_question_board(&self, board: NewQuestionBoard) -> Result<QuestionBoard> {
        let board = QuestionBoard {
            id: Id::new(),
            board,
        };
        self.0
            .write()
            .await
            .question_boards
            .insert(board.id, board.clone());
        debug!("Inserted question board {}", board.id);
        Ok(board)
    }

    async fn update_question_board(
        &self,
        id: Id,
        title: String,
        questions: Vec<Question>,
    ) -> Result<Option<QuestionBoard>> {
        let mut tables = self.0.write().await;
        let Tables {
            question_boards,
            answer_boards,
            ..
        } = &mut *tables;

        let board = match question_boards.get_mut(&id) {
            Some(board) => board,
            None => return Ok(None),
        };
        board.title = title;
        board.questions = questions;
        board.updated_at = now();

        for answers in answer_boards
            .values_mut()
            .filter(|answers| answers.question_board_id == id)
        {
            answers.retain_questions_of(board);
        }
        Ok(Some(board.clone()))
    }

    async fn delete_question_board(&self, id: Id) -> Result<bool> {
        let mut tables = self.0.write().await;
        if tables.question_boards.remove(&id).is_none() {
            return Ok(false);
        }
        tables
            .answer_boards
            .retain(|_, answers| answers.question_board_id != id);
        debug!("Deleted question board {id} and its answer boards");
        Ok(true)
    }

    async fn insert_answer_board(&self, board: NewAnswerBoard) -> Result<AnswerBoard> {
        let mut tables = self.0.write().await;
        if tables
            .answer_boards
            .values()
            .any(|answers| answers.token_digest == board.token_digest)
        {
            return Err(Error::Status(
                Status::Conflict,
                "Answer board token already in use".to_string(),
            ));
        }
        let board = AnswerBoard {
            id: Id::new(),
            board,
        };
        tables.answer_boards.insert(board.id, board.clone());
        debug!("Inserted answer board {}", board.id);
        Ok(board)
    }

    async fn delete_answer_board(&self, id: Id) -> Result<bool> {
        Ok(self.0.write().await.answer_boards.remove(&id).is_some())
    }

    async fn find_answer_board(&self, digest: &TokenDigest) -> Result<Option<AnswerBoard>> {
        let tables = self.0.read().await;
        Ok(tables
            .answer_boards
            .values()
            .find(|answers| answers.token_digest == *digest)
            .cloned())
    }

    async fn answer_boards_for(&self, question_board_id: Id) -> Result<Vec<AnswerBoard>> {
        let tables = self.0.read().await;
        let mut boards: Vec<_> = tables
            .answer_boards
            .values()
            .filter(|answers| answers.question_board_id == question_board_id)
            .cloned()
            .collect();
        boards.sort_by_key(|answers| (answers.created_at, answers.id));
        Ok(boards)
    }

    async fn update_answers(
        &self,
        digest: &TokenDigest,
        mut update: AnswerUpdate,
    ) -> Result<Option<AnswerBoard>> {
        let mut tables = self.0.write().await;
        let Tables {
            question_boards,
            answer_boards,
            ..
        } = &mut *tables;

        let answers = match answer_boards
            .values_mut()
            .find(|answers| answers.token_digest == *digest)
        {
            Some(answers) => answers,
            None => return Ok(None),
        };
        match question_boards.get(&answers.question_board_id) {
            Some(board) => update.retain_questions_of(board),
            None => update.answers.clear(),
        }
        answers.apply(&update);
        Ok(Some(answers.clone()))
    }
}
