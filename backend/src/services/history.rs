// src/services/history.rs

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};

use crate::{
    error::AppError,
    models::{
        submission::{HistoryParams, SubmissionStatus, SubmissionSummary},
        user::CurrentUser,
    },
    services::{
        attempt::{TimeWindow, evaluate_window},
        catalog::Catalog,
    },
    utils::policy::{Action, Resource, authorize},
};

/// Helper struct for the history join.
#[derive(FromRow)]
struct SummaryRow {
    id: i64,
    exam_room_id: i64,
    exam_room_title: String,
    duration_minutes: i64,
    student_id: i64,
    total_score: i64,
    status: SubmissionStatus,
    started_at: DateTime<Utc>,
    submitted_at: Option<DateTime<Utc>>,
    time_taken_seconds: Option<i64>,
}

impl SummaryRow {
    fn into_summary(self, now: DateTime<Utc>) -> Result<SubmissionSummary, AppError> {
        // Auto-submission is lazy, so a stale IN_PROGRESS row is flagged here.
        let is_overdue = self.status == SubmissionStatus::InProgress
            && matches!(
                evaluate_window(self.started_at, self.duration_minutes, now)?,
                TimeWindow::Elapsed { .. }
            );

        Ok(SubmissionSummary {
            id: self.id,
            exam_room_id: self.exam_room_id,
            exam_room_title: self.exam_room_title,
            student_id: self.student_id,
            total_score: self.total_score,
            status: self.status,
            started_at: self.started_at,
            submitted_at: self.submitted_at,
            time_taken_seconds: self.time_taken_seconds,
            is_overdue,
        })
    }
}

/// All attempts of one student, newest first.
pub async fn list_for_student(
    pool: &SqlitePool,
    student_id: i64,
    params: &HistoryParams,
    now: DateTime<Utc>,
) -> Result<Vec<SubmissionSummary>, AppError> {
    let (offset, limit) = params.page();

    let rows = sqlx::query_as::<_, SummaryRow>(
        r#"
        SELECT
            s.id, s.exam_room_id, e.title AS exam_room_title, e.duration_minutes,
            s.student_id, s.total_score, s.status, s.started_at, s.submitted_at,
            s.time_taken_seconds
        FROM submissions s
        JOIN exam_rooms e ON e.id = s.exam_room_id
        WHERE s.student_id = ?
        ORDER BY s.started_at DESC, s.id DESC
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(student_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch submission history: {:?}", e);
        AppError::from(e)
    })?;

    rows.into_iter().map(|row| row.into_summary(now)).collect()
}

/// All attempts at one exam room, newest first. Owner or admin only.
pub async fn list_for_exam_room(
    pool: &SqlitePool,
    catalog: &dyn Catalog,
    user: &CurrentUser,
    exam_room_id: i64,
    params: &HistoryParams,
    now: DateTime<Utc>,
) -> Result<Vec<SubmissionSummary>, AppError> {
    let exam_room = catalog
        .exam_room(exam_room_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Exam room not found".to_string()))?;

    authorize(
        user,
        Resource::ExamRoom {
            owner_id: exam_room.created_by,
        },
        Action::Grade,
    )?;

    let (offset, limit) = params.page();

    let rows = sqlx::query_as::<_, SummaryRow>(
        r#"
        SELECT
            s.id, s.exam_room_id, e.title AS exam_room_title, e.duration_minutes,
            s.student_id, s.total_score, s.status, s.started_at, s.submitted_at,
            s.time_taken_seconds
        FROM submissions s
        JOIN exam_rooms e ON e.id = s.exam_room_id
        WHERE s.exam_room_id = ?
        ORDER BY s.started_at DESC, s.id DESC
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(exam_room_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(|row| row.into_summary(now)).collect()
}
