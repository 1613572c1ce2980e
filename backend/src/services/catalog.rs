// src/services/catalog.rs

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::{
    error::AppError,
    models::{
        exam_room::ExamRoom,
        question::{CatalogOption, CatalogQuestion, QuestionRow},
    },
};

/// Read-only view of exam rooms and their questions.
///
/// Authoring lives elsewhere; attempt operations only ever read through this.
#[async_trait]
pub trait Catalog: Send + Sync {
    async fn exam_room(&self, id: i64) -> Result<Option<ExamRoom>, AppError>;

    /// Questions ordered by `(order_index, id)`, each with options ordered by id.
    async fn questions_ordered(&self, exam_room_id: i64) -> Result<Vec<CatalogQuestion>, AppError>;

    async fn option(&self, id: i64) -> Result<Option<CatalogOption>, AppError>;
}

/// `Catalog` backed by the service's own database.
#[derive(Debug, Clone)]
pub struct SqlCatalog {
    pool: SqlitePool,
}

impl SqlCatalog {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Catalog for SqlCatalog {
    async fn exam_room(&self, id: i64) -> Result<Option<ExamRoom>, AppError> {
        let exam_room = sqlx::query_as::<_, ExamRoom>(
            r#"
            SELECT id, title, description, start_time, end_time,
                   duration_minutes, total_marks, is_published, created_by
            FROM exam_rooms
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch exam room {}: {:?}", id, e);
            AppError::from(e)
        })?;

        Ok(exam_room)
    }

    async fn questions_ordered(&self, exam_room_id: i64) -> Result<Vec<CatalogQuestion>, AppError> {
        let rows = sqlx::query_as::<_, QuestionRow>(
            r#"
            SELECT id, exam_room_id, question_text, marks, order_index
            FROM questions
            WHERE exam_room_id = ?
            ORDER BY order_index, id
            "#,
        )
        .bind(exam_room_id)
        .fetch_all(&self.pool)
        .await?;

        let options = sqlx::query_as::<_, CatalogOption>(
            r#"
            SELECT o.id, o.question_id, o.option_text, o.is_correct
            FROM options o
            JOIN questions q ON q.id = o.question_id
            WHERE q.exam_room_id = ?
            ORDER BY o.id
            "#,
        )
        .bind(exam_room_id)
        .fetch_all(&self.pool)
        .await?;

        let mut by_question: HashMap<i64, Vec<CatalogOption>> = HashMap::new();
        for option in options {
            by_question.entry(option.question_id).or_default().push(option);
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let options = by_question.remove(&row.id).unwrap_or_default();
                CatalogQuestion::from_row(row, options)
            })
            .collect())
    }

    async fn option(&self, id: i64) -> Result<Option<CatalogOption>, AppError> {
        let option = sqlx::query_as::<_, CatalogOption>(
            "SELECT id, question_id, option_text, is_correct FROM options WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(option)
    }
}
