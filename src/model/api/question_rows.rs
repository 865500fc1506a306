//! Client-side state for the question rows of a board form.
//!
//! Rows are addressed by a synthetic [`RowKey`] handed out when the row is
//! created, so removing a row from the middle never changes which row any
//! other key refers to.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{
    api::{id::ApiId, question_board::QuestionSpec},
    db::Question,
};

/// Stable identity of a form row, independent of its position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowKey(u32);

/// One question row in the form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionRow {
    pub key: RowKey,
    /// The stored question this row edits, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_id: Option<ApiId>,
    pub text: String,
}

/// Something the user did to the rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RowAction {
    /// Append a blank row.
    Add,
    /// Replace a row's text.
    Edit { key: RowKey, text: String },
    /// Delete a row.
    Remove { key: RowKey },
    /// Move a row to a new position, clamped to the end.
    Move { key: RowKey, to: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowError {
    #[error("No row with key {0:?}")]
    UnknownKey(RowKey),
    #[error("Row key {0:?} is used more than once")]
    DuplicateKey(RowKey),
}

/// The ordered rows of a question board form.
///
/// Rows sent back by a client are checked on the way in: keys must be unique,
/// and the next key is raised past every key in use.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "UncheckedRows")]
pub struct QuestionRows {
    rows: Vec<QuestionRow>,
    next_key: u32,
}

#[derive(Deserialize)]
struct UncheckedRows {
    rows: Vec<QuestionRow>,
    #[serde(default)]
    next_key: u32,
}

impl TryFrom<UncheckedRows> for QuestionRows {
    type Error = RowError;

    fn try_from(unchecked: UncheckedRows) -> Result<Self, Self::Error> {
        let mut seen = HashSet::new();
        let mut next_key = unchecked.next_key;
        for row in &unchecked.rows {
            if !seen.insert(row.key) {
                return Err(RowError::DuplicateKey(row.key));
            }
            next_key = next_key.max(row.key.0.saturating_add(1));
        }
        Ok(Self {
            rows: unchecked.rows,
            next_key,
        })
    }
}

impl QuestionRows {
    /// No rows.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows pre-populated from stored questions, in stored order.
    pub fn from_questions(questions: &[Question]) -> Self {
        let mut rows = Self::new();
        for question in questions {
            let key = rows.fresh_key();
            rows.rows.push(QuestionRow {
                key,
                question_id: Some(question.id.into()),
                text: question.text.clone(),
            });
        }
        rows
    }

    pub fn rows(&self) -> &[QuestionRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Apply an action, returning the key of the row it touched.
    pub fn apply(&mut self, action: RowAction) -> Result<RowKey, RowError> {
        match action {
            RowAction::Add => {
                let key = self.fresh_key();
                self.rows.push(QuestionRow {
                    key,
                    question_id: None,
                    text: String::new(),
                });
                Ok(key)
            }
            RowAction::Edit { key, text } => {
                let index = self.position(key)?;
                self.rows[index].text = text;
                Ok(key)
            }
            RowAction::Remove { key } => {
                let index = self.position(key)?;
                self.rows.remove(index);
                Ok(key)
            }
            RowAction::Move { key, to } => {
                let index = self.position(key)?;
                let row = self.rows.remove(index);
                let to = to.min(self.rows.len());
                self.rows.insert(to, row);
                Ok(key)
            }
        }
    }

    /// The rows as they would be submitted.
    pub fn to_specs(&self) -> Vec<QuestionSpec> {
        self.rows
            .iter()
            .map(|row| QuestionSpec {
                id: row.question_id,
                text: row.text.clone(),
            })
            .collect()
    }

    fn position(&self, key: RowKey) -> Result<usize, RowError> {
        self.rows
            .iter()
            .position(|row| row.key == key)
            .ok_or(RowError::UnknownKey(key))
    }

    fn fresh_key(&mut self) -> RowKey {
        let key = RowKey(self.next_key);
        self.next_key += 1;
        key
    }
}
