use std::collections::BTreeMap;

use rocket::serde::json::{to_value, Value};
use serde::{Deserialize, Serialize};

/// Summary shown above a rejected form.
pub const REVIEW_PROBLEMS: &str = "Please review the problems below:";

/// Field-level validation failures for a submitted form.
///
/// Returned with the submitted input so the form can be shown again as it was.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormErrors {
    pub message: String,
    /// Messages per field name.
    pub errors: BTreeMap<String, Vec<String>>,
    /// The rejected input, echoed back.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,
}

impl Default for FormErrors {
    fn default() -> Self {
        Self {
            message: REVIEW_PROBLEMS.to_string(),
            errors: BTreeMap::new(),
            input: None,
        }
    }
}

impl FormErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message against a field.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    /// Record a "required" message if `value` is blank.
    pub fn require(&mut self, field: &str, label: &str, value: &str) {
        if value.trim().is_empty() {
            self.add(field, format!("{label}を入力してください"));
        }
    }

    /// Record an "invalid" message if `value` is present but does not look like an email.
    pub fn require_email(&mut self, field: &str, label: &str, value: &str) {
        let value = value.trim();
        if value.is_empty() {
            self.require(field, label, value);
        } else if !looks_like_email(value) {
            self.add(field, format!("{label}は不正な値です"));
        }
    }

    /// Messages recorded against a field.
    pub fn field(&self, field: &str) -> &[String] {
        self.errors.get(field).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Attach the rejected input.
    pub fn with_input<T: Serialize>(mut self, input: &T) -> Self {
        self.input = to_value(input).ok();
        self
    }

    /// `Ok` if nothing was recorded, otherwise these errors.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

fn looks_like_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !value.chars().any(char::is_whitespace)
        }
        None => false,
    }
}
