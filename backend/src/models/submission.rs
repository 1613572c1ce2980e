// src/models/submission.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::models::question::PublicQuestion;

/// Lifecycle of an attempt. `Submitted` and `AutoSubmitted` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubmissionStatus {
    InProgress,
    Submitted,
    AutoSubmitted,
}

impl SubmissionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SubmissionStatus::InProgress)
    }
}

/// Represents the 'submissions' table in the database: one student's attempt at one exam room.
#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct Submission {
    pub id: i64,
    pub exam_room_id: i64,
    pub student_id: i64,
    pub started_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub status: SubmissionStatus,
    pub total_score: i64,
    pub time_taken_seconds: Option<i64>,
    /// Bumped by every unit of work that locks the row.
    #[serde(skip)]
    pub version: i64,
}

/// Represents the 'answers' table in the database.
#[derive(Debug, Clone, FromRow)]
pub struct Answer {
    pub id: i64,
    pub submission_id: i64,
    pub question_id: i64,
    pub selected_option_id: Option<i64>,
    /// Denormalized from the selected option when the answer is written.
    pub is_correct: bool,
}

/// DTO for starting an attempt.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct StartSubmissionRequest {
    #[validate(range(min = 1))]
    pub exam_room_id: i64,
}

/// Returned once, when the attempt starts. This is the only place question content is sent.
#[derive(Debug, Serialize, ToSchema)]
pub struct SubmissionStartResponse {
    pub submission_id: i64,
    pub exam_room_id: i64,
    pub exam_room_title: String,
    pub duration_minutes: i64,
    pub started_at: DateTime<Utc>,
    pub questions: Vec<PublicQuestion>,
}

/// DTO for saving (or clearing) the answer to one question.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SaveAnswerRequest {
    #[validate(range(min = 1))]
    pub question_id: i64,
    #[validate(range(min = 1))]
    pub selected_option_id: Option<i64>,
}

/// The persisted answer as shown to the student while the attempt is open.
/// Correctness stays hidden until the attempt is finalized.
#[derive(Debug, Serialize, ToSchema)]
pub struct AnswerResponse {
    pub id: i64,
    pub submission_id: i64,
    pub question_id: i64,
    pub selected_option_id: Option<i64>,
}

impl From<Answer> for AnswerResponse {
    fn from(answer: Answer) -> Self {
        Self {
            id: answer.id,
            submission_id: answer.submission_id,
            question_id: answer.question_id,
            selected_option_id: answer.selected_option_id,
        }
    }
}

/// Per-question outcome, revealed once the attempt is terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct AnswerResult {
    pub question_id: i64,
    pub selected_option_id: Option<i64>,
    pub correct_option_id: Option<i64>,
    pub is_correct: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SubmissionResult {
    pub submission_id: i64,
    pub total_score: i64,
    pub status: SubmissionStatus,
    pub submitted_at: Option<DateTime<Utc>>,
    pub time_taken_seconds: Option<i64>,
    pub answers: Vec<AnswerResult>,
}

/// History row: an attempt joined with its exam room.
#[derive(Debug, Serialize, ToSchema)]
pub struct SubmissionSummary {
    pub id: i64,
    pub exam_room_id: i64,
    pub exam_room_title: String,
    pub student_id: i64,
    pub total_score: i64,
    pub status: SubmissionStatus,
    pub started_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub time_taken_seconds: Option<i64>,
    /// Stored as in progress, but its personal time limit has already run out.
    pub is_overdue: bool,
}

/// Query parameters for history listings.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HistoryParams {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

impl HistoryParams {
    pub const MAX_LIMIT: i64 = 100;

    /// Returns `(offset, limit)` with defaults applied and bounds clamped.
    pub fn page(&self) -> (i64, i64) {
        let offset = self.skip.unwrap_or(0).max(0);
        let limit = self.limit.unwrap_or(Self::MAX_LIMIT).clamp(1, Self::MAX_LIMIT);
        (offset, limit)
    }
}
