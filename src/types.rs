//! Shared types used across modules
//!
//! Value types that flow between the coach client, the session and the
//! speech announcer.

use serde::{Deserialize, Serialize};

use crate::coach::error::AskError;

/// A question addressed to the coach for one store
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Question {
    /// Tenant the question is about
    pub store_id: i64,
    /// Question text exactly as the user typed it
    #[serde(rename = "question")]
    pub text: String,
}

impl Question {
    /// Validate and build a question.
    ///
    /// The store id must be positive and the text must contain something
    /// other than whitespace. The text itself is kept untrimmed.
    pub fn new(store_id: i64, text: impl Into<String>) -> Result<Self, AskError> {
        let text = text.into();

        if store_id <= 0 {
            return Err(AskError::InvalidInput(format!(
                "store id must be positive, got {}",
                store_id
            )));
        }

        if is_blank(&text) {
            return Err(AskError::InvalidInput("question is empty".to_string()));
        }

        Ok(Self { store_id, text })
    }
}

/// Plain-text answer returned by the coach
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub text: String,
}

impl Answer {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl std::fmt::Display for Answer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

/// True when the text has nothing but whitespace
pub fn is_blank(text: &str) -> bool {
    text.trim().is_empty()
}

/// Truncate a string to at most `max` bytes on a char boundary
pub fn truncate_safe(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
