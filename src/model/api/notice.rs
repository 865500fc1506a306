use serde::{Deserialize, Serialize};

pub const QUESTION_BOARD_CREATED: &str = "Question board was successfully created.";
pub const QUESTION_BOARD_UPDATED: &str = "Question board was successfully updated.";
pub const QUESTION_BOARD_DESTROYED: &str = "Question board was successfully destroyed.";
pub const ANSWER_BOARD_REQUESTED: &str = "Answer request was successfully sent.";
pub const ANSWER_BOARD_UPDATED: &str = "Answer board was successfully updated.";
pub const SIGNED_IN: &str = "Signed in successfully.";
pub const SIGNED_OUT: &str = "ログアウトしました。";

/// A response carrying a one-off message for the user alongside the data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice<T> {
    pub notice: String,
    pub data: T,
}

impl<T> Notice<T> {
    pub fn new(notice: &str, data: T) -> Self {
        Self {
            notice: notice.to_string(),
            data,
        }
    }
}
