// src/models/question.rs

use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;

/// Represents the 'options' table in the database.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CatalogOption {
    pub id: i64,
    pub question_id: i64,
    pub option_text: String,
    pub is_correct: bool,
}

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow)]
pub struct QuestionRow {
    pub id: i64,
    pub exam_room_id: i64,
    pub question_text: String,
    pub marks: i64,
    pub order_index: i64,
}

/// A question together with its options, in catalog order.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogQuestion {
    pub id: i64,
    pub exam_room_id: i64,
    pub question_text: String,
    /// Weight awarded for a correct answer.
    pub marks: i64,
    pub order_index: i64,
    pub options: Vec<CatalogOption>,
}

impl CatalogQuestion {
    pub fn from_row(row: QuestionRow, options: Vec<CatalogOption>) -> Self {
        Self {
            id: row.id,
            exam_room_id: row.exam_room_id,
            question_text: row.question_text,
            marks: row.marks,
            order_index: row.order_index,
            options,
        }
    }

    /// The option flagged correct, if exactly one is.
    pub fn correct_option_id(&self) -> Option<i64> {
        let mut correct = self.options.iter().filter(|o| o.is_correct);
        match (correct.next(), correct.next()) {
            (Some(option), None) => Some(option.id),
            _ => None,
        }
    }
}

/// DTO for sending an option to a student (excludes correctness).
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PublicOption {
    pub id: i64,
    pub option_text: String,
}

/// DTO for sending a question to a student (excludes correctness).
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PublicQuestion {
    pub id: i64,
    pub question_text: String,
    pub marks: i64,
    pub order_index: i64,
    pub options: Vec<PublicOption>,
}

impl From<&CatalogQuestion> for PublicQuestion {
    fn from(question: &CatalogQuestion) -> Self {
        Self {
            id: question.id,
            question_text: question.question_text.clone(),
            marks: question.marks,
            order_index: question.order_index,
            options: question
                .options
                .iter()
                .map(|o| PublicOption {
                    id: o.id,
                    option_text: o.option_text.clone(),
                })
                .collect(),
        }
    }
}
