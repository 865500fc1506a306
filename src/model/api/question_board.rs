use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    api::{id::ApiId, question_rows::QuestionRows, validation::FormErrors},
    db::{NewQuestionBoard, Question, QuestionBoard},
    mongodb::Id,
};

/// A submitted question board form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionBoardSpec {
    #[serde(default)]
    pub title: String,
    /// Question rows in the order they should appear.
    #[serde(default)]
    pub questions: Vec<QuestionSpec>,
}

/// One submitted question row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionSpec {
    /// Present when the row edits an existing question; absent for a new row.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ApiId>,
    #[serde(default)]
    pub text: String,
}

impl QuestionSpec {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: None,
            text: text.into(),
        }
    }
}

impl QuestionBoardSpec {
    /// Validate this spec and turn it into a new board for the given owner.
    pub fn into_new_board(self, owner_id: Id) -> Result<NewQuestionBoard, FormErrors> {
        let (title, questions) = self.into_parts(&[])?;
        Ok(NewQuestionBoard::new(owner_id, title, questions))
    }

    /// Validate this spec against an existing board, producing the new title and
    /// full question list.
    ///
    /// Rows carrying an ID keep that question's identity with the new text; rows
    /// without one become new questions; questions not mentioned are removed.
    pub fn into_update(self, board: &QuestionBoard) -> Result<(String, Vec<Question>), FormErrors> {
        self.into_parts(&board.questions)
    }

    fn into_parts(self, existing: &[Question]) -> Result<(String, Vec<Question>), FormErrors> {
        let mut errors = FormErrors::new();
        errors.require("title", "Title", &self.title);

        let known: HashSet<Id> = existing.iter().map(|question| question.id).collect();
        let mut seen = HashSet::new();
        for (i, row) in self.questions.iter().enumerate() {
            if let Some(id) = row.id {
                if !known.contains(&*id) {
                    errors.add(format!("questions[{i}]"), "Questionが見つかりません");
                } else if !seen.insert(*id) {
                    errors.add(format!("questions[{i}]"), "Questionが重複しています");
                }
            }
        }
        errors.with_input(&self).into_result()?;

        let questions = self
            .questions
            .into_iter()
            .map(|row| match row.id {
                Some(id) => Question {
                    id: id.into(),
                    text: row.text,
                },
                None => Question::new(row.text),
            })
            .collect();
        Ok((self.title, questions))
    }
}

/// A single question, as shown to owners and respondents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionView {
    pub id: ApiId,
    pub text: String,
}

impl From<&Question> for QuestionView {
    fn from(question: &Question) -> Self {
        Self {
            id: question.id.into(),
            text: question.text.clone(),
        }
    }
}

/// Full question board detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionBoardDescription {
    pub id: ApiId,
    pub title: String,
    pub questions: Vec<QuestionView>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<QuestionBoard> for QuestionBoardDescription {
    fn from(board: QuestionBoard) -> Self {
        Self {
            id: board.id.into(),
            questions: board.questions.iter().map(QuestionView::from).collect(),
            title: board.board.title,
            created_at: board.board.created_at,
            updated_at: board.board.updated_at,
        }
    }
}

/// A row in the owner's board list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionBoardSummary {
    pub id: ApiId,
    pub title: String,
    pub question_count: usize,
    pub created_at: DateTime<Utc>,
}

impl From<QuestionBoard> for QuestionBoardSummary {
    fn from(board: QuestionBoard) -> Self {
        Self {
            id: board.id.into(),
            question_count: board.questions.len(),
            title: board.board.title,
            created_at: board.board.created_at,
        }
    }
}

/// The state of a question board form before submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionBoardForm {
    pub title: String,
    pub rows: QuestionRows,
}

impl QuestionBoardForm {
    /// The [`QuestionBoardSpec`] this form would submit.
    pub fn to_spec(&self) -> QuestionBoardSpec {
        QuestionBoardSpec {
            title: self.title.clone(),
            questions: self.rows.to_specs(),
        }
    }
}

impl From<&QuestionBoard> for QuestionBoardForm {
    fn from(board: &QuestionBoard) -> Self {
        Self {
            title: board.title.clone(),
            rows: QuestionRows::from_questions(&board.questions),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn saved(spec: QuestionBoardSpec) -> QuestionBoard {
        QuestionBoard {
            id: Id::new(),
            board: spec.into_new_board(Id::new()).unwrap(),
        }
    }

    #[test]
    fn blank_title_is_rejected() {
        let spec = QuestionBoardSpec {
            title: "  ".to_string(),
            questions: vec![QuestionSpec::new("kept in the echo")],
        };
        let errors = spec.into_new_board(Id::new()).unwrap_err();
        assert_eq!(errors.field("title"), ["Titleを入力してください"]);
        assert!(errors.input.unwrap().to_string().contains("kept in the echo"));
    }

    #[test]
    fn rows_keep_submitted_order() {
        for n in 0..5 {
            let spec = QuestionBoardSpec {
                title: "Numbered".to_string(),
                questions: (0..n).map(|i| QuestionSpec::new(format!("Q{i}"))).collect(),
            };
            let board = saved(spec);
            let texts: Vec<_> = board.questions.iter().map(|q| q.text.as_str()).collect();
            let expected: Vec<_> = (0..n).map(|i| format!("Q{i}")).collect();
            assert_eq!(texts, expected);
        }
    }

    #[test]
    fn update_edits_removes_and_adds() {
        let board = saved(QuestionBoardSpec::crud_example());
        let first = board.questions[0].id;

        let spec = QuestionBoardSpec {
            title: "CRUD Question Board (edited)".to_string(),
            questions: vec![
                QuestionSpec {
                    id: Some(first.into()),
                    text: "Is this FIRST (edited) question?".to_string(),
                },
                QuestionSpec::new("Is this 3rd (added) question?"),
            ],
        };
        let (title, questions) = spec.into_update(&board).unwrap();

        assert_eq!(title, "CRUD Question Board (edited)");
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].id, first);
        assert_eq!(questions[0].text, "Is this FIRST (edited) question?");
        assert_ne!(questions[1].id, board.questions[1].id);
        assert_eq!(questions[1].text, "Is this 3rd (added) question?");
    }

    #[test]
    fn foreign_or_repeated_question_ids_are_rejected() {
        let board = saved(QuestionBoardSpec::crud_example());
        let first = board.questions[0].id;

        let foreign = QuestionBoardSpec {
            title: "Title".to_string(),
            questions: vec![QuestionSpec {
                id: Some(Id::new().into()),
                text: "?".to_string(),
            }],
        };
        let errors = foreign.into_update(&board).unwrap_err();
        assert_eq!(errors.field("questions[0]").len(), 1);

        let repeated = QuestionBoardSpec {
            title: "Title".to_string(),
            questions: vec![
                QuestionSpec {
                    id: Some(first.into()),
                    text: "a".to_string(),
                },
                QuestionSpec {
                    id: Some(first.into()),
                    text: "b".to_string(),
                },
            ],
        };
        let errors = repeated.into_update(&board).unwrap_err();
        assert!(errors.field("questions[0]").is_empty());
        assert_eq!(errors.field("questions[1]").len(), 1);
    }
}
