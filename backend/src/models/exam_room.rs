// src/models/exam_room.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// Represents the 'exam_rooms' table in the database.
///
/// The window `[start_time, end_time)` bounds when attempts may start;
/// `duration_minutes` bounds each attempt on its own clock.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ExamRoom {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_minutes: i64,
    pub total_marks: i64,
    pub is_published: bool,
    /// Owner (creator) of the exam room.
    pub created_by: i64,
}
