//! API-compatible types.
//!
//! The types in this module are serialised in an API-friendly way, e.g.:
//!
//! - IDs are serialised as hex strings.
//! - Datetimes are serialised as RFC 3339 strings.

pub mod answer_board;
pub mod auth;
pub mod id;
pub mod notice;
pub mod question_board;
pub mod question_rows;
pub mod validation;
