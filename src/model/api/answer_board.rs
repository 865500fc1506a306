use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    api::{id::ApiId, validation::FormErrors},
    db::{AnswerBoard, AnswerUpdate, QuestionBoard},
};

/// An owner's request to have a board answered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRequest {
    #[serde(default)]
    pub email: String,
}

impl AnswerRequest {
    /// The validated, trimmed respondent email.
    pub fn into_email(self) -> Result<String, FormErrors> {
        let mut errors = FormErrors::new();
        errors.require_email("email", "Email", &self.email);
        errors.with_input(&self).into_result()?;
        Ok(self.email.trim().to_string())
    }
}

/// A respondent's submission.
///
/// Everything is optional: a missing name or a question without an entry
/// keeps its stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerSubmission {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub answers: Vec<AnswerSpec>,
}

/// One submitted answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerSpec {
    pub question_id: ApiId,
    #[serde(default)]
    pub body: String,
}

impl AnswerSubmission {
    /// Validate against the board being answered. Later entries for the same
    /// question win.
    pub fn into_update(self, board: &QuestionBoard) -> Result<AnswerUpdate, FormErrors> {
        let mut errors = FormErrors::new();
        for (i, answer) in self.answers.iter().enumerate() {
            if board.question(*answer.question_id).is_none() {
                errors.add(format!("answers[{i}]"), "Questionが見つかりません");
            }
        }
        errors.with_input(&self).into_result()?;

        let answers: HashMap<_, _> = self
            .answers
            .into_iter()
            .map(|answer| (answer.question_id.into(), answer.body))
            .collect();
        Ok(AnswerUpdate {
            name: self.name,
            answers,
        })
    }
}

/// One question with its current answer, in board order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerField {
    pub question_id: ApiId,
    pub question: String,
    pub answer: String,
}

fn fields(board: &QuestionBoard, answers: &AnswerBoard) -> Vec<AnswerField> {
    board
        .questions
        .iter()
        .map(|question| AnswerField {
            question_id: question.id.into(),
            question: question.text.clone(),
            answer: answers.answer_for(question.id).to_string(),
        })
        .collect()
}

/// The respondent's edit form, pre-populated with anything already submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerBoardForm {
    pub title: String,
    pub name: String,
    pub questions: Vec<AnswerField>,
}

impl AnswerBoardForm {
    pub fn new(board: &QuestionBoard, answers: &AnswerBoard) -> Self {
        Self {
            title: board.title.clone(),
            name: answers.name.clone(),
            questions: fields(board, answers),
        }
    }

    /// The submission this form would make as it stands.
    pub fn to_submission(&self) -> AnswerSubmission {
        AnswerSubmission {
            name: Some(self.name.clone()),
            answers: self
                .questions
                .iter()
                .map(|field| AnswerSpec {
                    question_id: field.question_id,
                    body: field.answer.clone(),
                })
                .collect(),
        }
    }
}

/// Read-only view of a submitted answer board.
///
/// Addressed by token; deliberately carries no internal ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerBoardDescription {
    pub title: String,
    pub email: String,
    pub name: String,
    pub answers: Vec<AnswerField>,
    pub updated_at: DateTime<Utc>,
}

impl AnswerBoardDescription {
    pub fn new(board: &QuestionBoard, answers: &AnswerBoard) -> Self {
        Self {
            title: board.title.clone(),
            email: answers.email.clone(),
            name: answers.name.clone(),
            answers: fields(board, answers),
            updated_at: answers.updated_at,
        }
    }
}

/// An answer board as listed for the question board's owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerBoardSummary {
    pub id: ApiId,
    pub email: String,
    pub name: String,
    pub answered: bool,
    pub answers: Vec<AnswerField>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AnswerBoardSummary {
    pub fn new(board: &QuestionBoard, answers: &AnswerBoard) -> Self {
        Self {
            id: answers.id.into(),
            email: answers.email.clone(),
            name: answers.name.clone(),
            answered: answers.is_answered(),
            answers: fields(board, answers),
            created_at: answers.created_at,
            updated_at: answers.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::model::{
        common::token::TokenDigest,
        db::{AnswerBoardCore, QuestionBoardCore},
        mongodb::Id,
    };

    fn boards() -> (QuestionBoard, AnswerBoard) {
        let board = QuestionBoard {
            id: Id::new(),
            board: QuestionBoardCore::example(Id::new()),
        };
        let answers = AnswerBoard {
            id: Id::new(),
            board: AnswerBoardCore::new(
                board.id,
                "ada@example.com".to_string(),
                TokenDigest::example(),
            ),
        };
        (board, answers)
    }

    #[test]
    fn blank_form_follows_question_order() {
        let (board, answers) = boards();
        let form = AnswerBoardForm::new(&board, &answers);
        assert_eq!(form.name, "");
        let questions: Vec<_> = form.questions.iter().map(|f| f.question.as_str()).collect();
        assert_eq!(
            questions,
            [
                "Is this 1st question?",
                "Is this 2nd question?",
                "Is this 3rd question?"
            ]
        );
        assert!(form.questions.iter().all(|f| f.answer.is_empty()));
    }

    #[test]
    fn form_submission_round_trips() {
        let (board, mut answers) = boards();
        let mut form = AnswerBoardForm::new(&board, &answers);
        form.name = "Ada Wong".to_string();
        form.questions[1].answer = "2nd answer.".to_string();

        let update = form.to_submission().into_update(&board).unwrap();
        answers.apply(&update);
        assert_eq!(AnswerBoardForm::new(&board, &answers), form);
    }

    #[test]
    fn unknown_questions_are_rejected() {
        let (board, _) = boards();
        let submission = AnswerSubmission {
            name: None,
            answers: vec![AnswerSpec {
                question_id: Id::new().into(),
                body: "?".to_string(),
            }],
        };
        let errors = submission.into_update(&board).unwrap_err();
        assert_eq!(errors.field("answers[0]"), ["Questionが見つかりません"]);
    }

    #[test]
    fn answer_request_needs_an_email() {
        let blank = AnswerRequest::default().into_email().unwrap_err();
        assert_eq!(blank.field("email"), ["Emailを入力してください"]);

        let email = AnswerRequest {
            email: " ada@example.com ".to_string(),
        }
        .into_email()
        .unwrap();
        assert_eq!(email, "ada@example.com");
    }
}
