use std::collections::HashMap;
use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::{
    common::token::TokenDigest,
    mongodb::{now, serde_string_map, Id},
};

use super::QuestionBoard;

/// Core answer board data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerBoardCore {
    /// The board whose questions are being answered.
    pub question_board_id: Id,
    /// Where the answer request was sent.
    pub email: String,
    /// Digest of the respondent's access token.
    pub token_digest: TokenDigest,
    /// Respondent display name, blank until their first submission.
    pub name: String,
    /// Answer bodies keyed by question ID.
    #[serde(with = "serde_string_map")]
    pub answers: HashMap<Id, String>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl AnswerBoardCore {
    /// Create a new, unanswered board, timestamped now.
    pub fn new(question_board_id: Id, email: String, token_digest: TokenDigest) -> Self {
        let now = now();
        Self {
            question_board_id,
            email,
            token_digest,
            name: String::new(),
            answers: HashMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// The current answer to the given question, blank if unanswered.
    pub fn answer_for(&self, question_id: Id) -> &str {
        self.answers
            .get(&question_id)
            .map(String::as_str)
            .unwrap_or_default()
    }

    /// Has the respondent submitted anything yet?
    pub fn is_answered(&self) -> bool {
        !self.name.is_empty() || !self.answers.is_empty()
    }

    /// Merge an update into this board. Returns whether anything changed.
    pub fn apply(&mut self, update: &AnswerUpdate) -> bool {
        let mut changed = false;
        if let Some(name) = &update.name {
            if *name != self.name {
                self.name = name.clone();
                changed = true;
            }
        }
        for (question_id, body) in &update.answers {
            if self.answers.get(question_id) != Some(body) {
                self.answers.insert(*question_id, body.clone());
                changed = true;
            }
        }
        if changed {
            self.updated_at = now();
        }
        changed
    }

    /// Drop answers to questions that are no longer on the given board.
    pub fn retain_questions_of(&mut self, board: &QuestionBoard) {
        self.answers
            .retain(|question_id, _| board.question(*question_id).is_some());
    }
}

/// An answer board without an ID.
pub type NewAnswerBoard = AnswerBoardCore;

/// An answer board from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerBoard {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub board: AnswerBoardCore,
}

impl Deref for AnswerBoard {
    type Target = AnswerBoardCore;

    fn deref(&self) -> &Self::Target {
        &self.board
    }
}

impl DerefMut for AnswerBoard {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.board
    }
}

/// A validated change to an answer board.
///
/// Only the fields present are touched: a `None` name or a missing question
/// leaves the stored value as it was.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnswerUpdate {
    pub name: Option<String>,
    pub answers: HashMap<Id, String>,
}

impl AnswerUpdate {
    /// Would applying this update change the given board?
    pub fn changes(&self, board: &AnswerBoardCore) -> bool {
        board.clone().apply(self)
    }

    /// Drop answers to questions that are no longer on the given board.
    pub fn retain_questions_of(&mut self, board: &QuestionBoard) {
        self.answers
            .retain(|question_id, _| board.question(*question_id).is_some());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::model::db::QuestionBoardCore;

    fn example() -> (QuestionBoard, AnswerBoardCore) {
        let board = QuestionBoard {
            id: Id::new(),
            board: QuestionBoardCore::example(Id::new()),
        };
        let answers =
            AnswerBoardCore::new(board.id, "ada@example.com".to_string(), TokenDigest::example());
        (board, answers)
    }

    #[test]
    fn partial_update_keeps_other_answers() {
        let (board, mut answers) = example();
        let [q1, q2, q3] = [0, 1, 2].map(|i| board.questions[i].id);

        let first = AnswerUpdate {
            name: Some("Ada Wong".to_string()),
            answers: HashMap::from([
                (q1, "1st answer.".to_string()),
                (q2, "2nd answer.".to_string()),
                (q3, "3rd answer.".to_string()),
            ]),
        };
        assert!(answers.apply(&first));

        let second = AnswerUpdate {
            name: Some("エイダ・ウォン".to_string()),
            answers: HashMap::from([
                (q1, "最初の答え".to_string()),
                (q3, "最後の答え".to_string()),
            ]),
        };
        assert!(answers.apply(&second));

        assert_eq!(answers.name, "エイダ・ウォン");
        assert_eq!(answers.answer_for(q1), "最初の答え");
        assert_eq!(answers.answer_for(q2), "2nd answer.");
        assert_eq!(answers.answer_for(q3), "最後の答え");
    }

    #[test]
    fn resubmitting_same_values_is_a_no_op() {
        let (board, mut answers) = example();
        let update = AnswerUpdate {
            name: Some("Ada Wong".to_string()),
            answers: HashMap::from([(board.questions[0].id, "1st answer.".to_string())]),
        };
        assert!(update.changes(&answers));
        assert!(answers.apply(&update));

        let before = answers.clone();
        assert!(!update.changes(&answers));
        assert!(!answers.apply(&update));
        assert_eq!(answers, before);
    }

    #[test]
    fn missing_name_is_left_unchanged() {
        let (board, mut answers) = example();
        answers.name = "Ada Wong".to_string();
        let update = AnswerUpdate {
            name: None,
            answers: HashMap::from([(board.questions[1].id, String::new())]),
        };
        answers.apply(&update);
        assert_eq!(answers.name, "Ada Wong");
        assert_eq!(answers.answer_for(board.questions[1].id), "");
        assert!(answers.is_answered());
    }

    #[test]
    fn answers_to_removed_questions_are_dropped() {
        let (mut board, mut answers) = example();
        let removed = board.questions.remove(1);
        answers.answers.insert(removed.id, "gone".to_string());
        answers
            .answers
            .insert(board.questions[0].id, "kept".to_string());

        answers.retain_questions_of(&board);
        assert_eq!(answers.answers.len(), 1);
        assert_eq!(answers.answer_for(board.questions[0].id), "kept");
    }

    #[test]
    fn update_for_removed_question_is_dropped() {
        let (mut board, mut answers) = example();
        let removed = board.questions.remove(1);
        let mut update = AnswerUpdate {
            name: None,
            answers: HashMap::from([
                (removed.id, "late".to_string()),
                (board.questions[0].id, "on time".to_string()),
            ]),
        };

        update.retain_questions_of(&board);
        answers.apply(&update);
        assert_eq!(answers.answers.len(), 1);
        assert_eq!(answers.answer_for(board.questions[0].id), "on time");
    }
}
