use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::mongodb::{now, Id};

/// A single question. Its position is its index within the owning board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    /// Unique ID, stable across edits of the board.
    pub id: Id,
    /// Question text.
    pub text: String,
}

impl Question {
    /// A new question with a fresh ID.
    pub fn new(text: String) -> Self {
        Self { id: Id::new(), text }
    }
}

/// Core question board data, as stored in the database.
///
/// Questions are embedded, so they live and die with their board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionBoardCore {
    /// The owner who authored this board.
    pub owner_id: Id,
    pub title: String,
    /// Questions in display order.
    pub questions: Vec<Question>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl QuestionBoardCore {
    /// Create a new board, timestamped now.
    pub fn new(owner_id: Id, title: String, questions: Vec<Question>) -> Self {
        let now = now();
        Self {
            owner_id,
            title,
            questions,
            created_at: now,
            updated_at: now,
        }
    }

    /// Look up one of this board's questions.
    pub fn question(&self, id: Id) -> Option<&Question> {
        self.questions.iter().find(|question| question.id == id)
    }
}

/// A question board without an ID.
pub type NewQuestionBoard = QuestionBoardCore;

/// A question board from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionBoard {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub board: QuestionBoardCore,
}

impl QuestionBoard {
    /// Is this board authored by the given owner?
    pub fn is_owned_by(&self, owner_id: Id) -> bool {
        self.owner_id == owner_id
    }
}

impl Deref for QuestionBoard {
    type Target = QuestionBoardCore;

    fn deref(&self) -> &Self::Target {
        &self.board
    }
}

impl DerefMut for QuestionBoard {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.board
    }
}
