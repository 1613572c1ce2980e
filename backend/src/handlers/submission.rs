// src/handlers/submission.rs

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    error::{AppError, ErrorBody},
    models::{
        submission::{
            AnswerResponse, HistoryParams, SaveAnswerRequest, StartSubmissionRequest, Submission,
            SubmissionResult, SubmissionStartResponse, SubmissionSummary,
        },
        user::CurrentUser,
    },
    services::{attempt, catalog::Catalog, history, ledger},
    utils::clock::Clock,
};

/// Starts an attempt at a published, currently open exam room.
///
/// Returns the questions (without correctness) and the time allowed.
#[utoipa::path(
    post,
    path = "/api/submissions/start",
    tag = "Submissions",
    request_body = StartSubmissionRequest,
    responses(
        (status = 200, description = "Attempt started", body = SubmissionStartResponse),
        (status = 400, description = "Not published, not active, expired or already active", body = ErrorBody),
        (status = 404, description = "Exam room not found", body = ErrorBody),
    ),
)]
pub async fn start_submission(
    State(pool): State<SqlitePool>,
    State(catalog): State<Arc<dyn Catalog>>,
    State(clock): State<Arc<dyn Clock>>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<StartSubmissionRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = req.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let started =
        attempt::start_attempt(&pool, catalog.as_ref(), &user, req.exam_room_id, clock.now()).await?;

    Ok(Json(started))
}

/// Returns the caller's attempt record.
#[utoipa::path(
    get,
    path = "/api/submissions/{id}",
    tag = "Submissions",
    params(("id" = i64, Path, description = "Submission id")),
    responses(
        (status = 200, description = "Attempt", body = Submission),
        (status = 403, description = "Not the caller's attempt", body = ErrorBody),
        (status = 404, description = "Submission not found", body = ErrorBody),
    ),
)]
pub async fn get_submission(
    State(pool): State<SqlitePool>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let submission = attempt::get_attempt(&pool, &user, id).await?;

    Ok(Json(submission))
}

/// Saves (or replaces) the answer to one question of an in-progress attempt.
#[utoipa::path(
    post,
    path = "/api/submissions/{id}/answers",
    tag = "Submissions",
    params(("id" = i64, Path, description = "Submission id")),
    request_body = SaveAnswerRequest,
    responses(
        (status = 200, description = "Answer saved", body = AnswerResponse),
        (status = 400, description = "Attempt not active or time expired", body = ErrorBody),
        (status = 403, description = "Not the caller's attempt", body = ErrorBody),
        (status = 404, description = "Submission, question or option not found", body = ErrorBody),
    ),
)]
pub async fn save_answer(
    State(pool): State<SqlitePool>,
    State(catalog): State<Arc<dyn Catalog>>,
    State(clock): State<Arc<dyn Clock>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(req): Json<SaveAnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = req.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let answer = ledger::upsert_answer(&pool, catalog.as_ref(), &user, id, &req, clock.now()).await?;

    Ok(Json(answer))
}

/// Finalizes an attempt and returns the score with per-question correctness.
#[utoipa::path(
    post,
    path = "/api/submissions/{id}/submit",
    tag = "Submissions",
    params(("id" = i64, Path, description = "Submission id")),
    responses(
        (status = 200, description = "Attempt submitted", body = SubmissionResult),
        (status = 400, description = "Already finalized or time expired", body = ErrorBody),
        (status = 403, description = "Not the caller's attempt", body = ErrorBody),
        (status = 404, description = "Submission not found", body = ErrorBody),
    ),
)]
pub async fn submit_submission(
    State(pool): State<SqlitePool>,
    State(catalog): State<Arc<dyn Catalog>>,
    State(clock): State<Arc<dyn Clock>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = attempt::finalize_attempt(&pool, catalog.as_ref(), &user, id, clock.now()).await?;

    Ok(Json(result))
}

/// Re-displays the result of a submitted or auto-submitted attempt.
#[utoipa::path(
    get,
    path = "/api/submissions/{id}/result",
    tag = "Submissions",
    params(("id" = i64, Path, description = "Submission id")),
    responses(
        (status = 200, description = "Scored result", body = SubmissionResult),
        (status = 400, description = "Attempt still in progress", body = ErrorBody),
        (status = 403, description = "Access denied", body = ErrorBody),
        (status = 404, description = "Submission not found", body = ErrorBody),
    ),
)]
pub async fn get_result(
    State(pool): State<SqlitePool>,
    State(catalog): State<Arc<dyn Catalog>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = attempt::get_result(&pool, catalog.as_ref(), &user, id).await?;

    Ok(Json(result))
}

/// Lists the caller's attempts, newest first.
#[utoipa::path(
    get,
    path = "/api/submissions/my-history",
    tag = "Submissions",
    params(HistoryParams),
    responses((status = 200, description = "Attempt summaries", body = [SubmissionSummary])),
)]
pub async fn my_history(
    State(pool): State<SqlitePool>,
    State(clock): State<Arc<dyn Clock>>,
    Extension(user): Extension<CurrentUser>,
    Query(params): Query<HistoryParams>,
) -> Result<impl IntoResponse, AppError> {
    let rows = history::list_for_student(&pool, user.id, &params, clock.now()).await?;

    Ok(Json(rows))
}

/// Lists every attempt at an exam room. Owner or admin only.
#[utoipa::path(
    get,
    path = "/api/submissions/exam-room/{id}/submissions",
    tag = "Submissions",
    params(("id" = i64, Path, description = "Exam room id"), HistoryParams),
    responses(
        (status = 200, description = "Attempt summaries", body = [SubmissionSummary]),
        (status = 403, description = "Neither owner nor admin", body = ErrorBody),
        (status = 404, description = "Exam room not found", body = ErrorBody),
    ),
)]
pub async fn exam_room_submissions(
    State(pool): State<SqlitePool>,
    State(catalog): State<Arc<dyn Catalog>>,
    State(clock): State<Arc<dyn Clock>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Query(params): Query<HistoryParams>,
) -> Result<impl IntoResponse, AppError> {
    let rows =
        history::list_for_exam_room(&pool, catalog.as_ref(), &user, id, &params, clock.now()).await?;

    Ok(Json(rows))
}
