// src/models/question.rs

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use validator::Validate;

/// Category assigned to imported records that carry none.
pub const DEFAULT_CATEGORY: &str = "Uncategorized";

/// Represents one row of the 'question_pool' table.
/// Immutable once imported; the pool is only ever replaced wholesale.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct QuestionRecord {
    pub id: i64,

    /// The term shown on the shared display.
    pub term: String,

    /// Source volume the term belongs to (e.g., "Book 2").
    pub book: String,

    /// Chapter or topic label.
    pub category: String,

    /// Free-form hint keywords, never shown during play.
    pub keywords: String,
}

impl QuestionRecord {
    /// Whether `needle` occurs in either the book or the category label.
    pub fn matches_category(&self, needle: &str) -> bool {
        self.book.contains(needle) || self.category.contains(needle)
    }
}

/// DTO for one imported record. Everything except `term` is optional.
#[derive(Debug, Deserialize, Validate)]
pub struct ImportQuestion {
    pub id: Option<i64>,
    #[validate(length(min = 1, max = 200))]
    pub term: String,
    #[validate(length(max = 200))]
    pub book: Option<String>,
    #[validate(length(max = 200))]
    pub category: Option<String>,
    #[validate(length(max = 2000))]
    pub keywords: Option<String>,
}

/// DTO for replacing the whole pool.
#[derive(Debug, Deserialize, Validate)]
pub struct ImportPoolRequest {
    #[validate(nested)]
    pub questions: Vec<ImportQuestion>,
}
