//! DB-compatible (e.g. de/serialisable) types.
//!
//! The types in this module are serialised in an DB-friendly way, e.g.:
//!
//! - IDs and datetimes are serialised in MongoDB's own format.
//! - Maps keyed by IDs are serialised with hex string keys.

mod answer_board;
pub use answer_board::{AnswerBoard, AnswerBoardCore, AnswerUpdate, NewAnswerBoard};

mod owner;
pub use owner::{NewOwner, Owner, OwnerCore};

mod question_board;
pub use question_board::{NewQuestionBoard, Question, QuestionBoard, QuestionBoardCore};
