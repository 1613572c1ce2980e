// src/services/attempt.rs

use chrono::{DateTime, TimeDelta, Utc};
use sqlx::{Executor, Sqlite, SqlitePool, Transaction};

use crate::{
    error::AppError,
    models::{
        exam_room::ExamRoom,
        question::{CatalogQuestion, PublicQuestion},
        submission::{
            Answer, Submission, SubmissionResult, SubmissionStartResponse, SubmissionStatus,
        },
        user::CurrentUser,
    },
    services::{
        catalog::Catalog,
        scoring::{self, ScoreSheet},
    },
    utils::policy::{Action, Decision, Resource, authorize, decide},
};

/// Where an attempt stands against its personal time limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeWindow {
    Open { remaining_seconds: i64 },
    Elapsed { elapsed_seconds: i64 },
}

/// Compares the time spent on an attempt with the exam room's `duration_minutes`.
///
/// Exactly reaching the limit is still open; only strictly exceeding it elapses.
/// The exam room's own `end_time` plays no part here. A duration too large to
/// represent is an internal error.
pub fn evaluate_window(
    started_at: DateTime<Utc>,
    duration_minutes: i64,
    now: DateTime<Utc>,
) -> Result<TimeWindow, AppError> {
    let elapsed = now - started_at;
    let limit = TimeDelta::try_minutes(duration_minutes).ok_or_else(|| {
        AppError::InternalServerError(format!("Invalid exam duration: {duration_minutes} minutes"))
    })?;

    let window = if elapsed > limit {
        TimeWindow::Elapsed {
            elapsed_seconds: elapsed.num_seconds(),
        }
    } else {
        let remaining = limit.checked_sub(&elapsed).ok_or_else(|| {
            AppError::InternalServerError("Attempt time window out of range".to_string())
        })?;
        TimeWindow::Open {
            remaining_seconds: remaining.num_seconds(),
        }
    };
    Ok(window)
}

/// Fetches an attempt without locking it.
pub async fn find_submission<'e, E>(executor: E, id: i64) -> Result<Submission, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Submission>(
        r#"
        SELECT id, exam_room_id, student_id, started_at, submitted_at,
               status, total_score, time_taken_seconds, version
        FROM submissions
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(executor)
    .await?
    .ok_or_else(|| AppError::NotFound("Submission not found".to_string()))
}

/// Takes the write lock on an attempt row and returns its current state.
///
/// The version bump is the first statement of the transaction, so concurrent
/// units of work on the same attempt queue here instead of racing later.
pub(crate) async fn lock_submission(
    tx: &mut Transaction<'static, Sqlite>,
    id: i64,
) -> Result<Submission, AppError> {
    sqlx::query_as::<_, Submission>(
        r#"
        UPDATE submissions
        SET version = version + 1
        WHERE id = ?
        RETURNING id, exam_room_id, student_id, started_at, submitted_at,
                  status, total_score, time_taken_seconds, version
        "#,
    )
    .bind(id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or_else(|| AppError::NotFound("Submission not found".to_string()))
}

pub(crate) async fn load_answers<'e, E>(executor: E, submission_id: i64) -> Result<Vec<Answer>, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let answers = sqlx::query_as::<_, Answer>(
        r#"
        SELECT id, submission_id, question_id, selected_option_id, is_correct
        FROM answers
        WHERE submission_id = ?
        ORDER BY question_id
        "#,
    )
    .bind(submission_id)
    .fetch_all(executor)
    .await?;

    Ok(answers)
}

/// Scores a locked in-progress attempt and moves it to `status`.
/// Returns the score sheet and the seconds taken.
pub(crate) async fn complete(
    tx: &mut Transaction<'static, Sqlite>,
    submission: &Submission,
    status: SubmissionStatus,
    questions: &[CatalogQuestion],
    now: DateTime<Utc>,
) -> Result<(ScoreSheet, i64), AppError> {
    let answers = load_answers(&mut **tx, submission.id).await?;
    let sheet = scoring::score(questions, &answers);
    let time_taken_seconds = (now - submission.started_at).num_seconds().max(0);

    let result = sqlx::query(
        r#"
        UPDATE submissions
        SET status = ?, submitted_at = ?, total_score = ?, time_taken_seconds = ?, updated_at = ?
        WHERE id = ? AND status = 'IN_PROGRESS'
        "#,
    )
    .bind(status)
    .bind(now)
    .bind(sheet.total_score)
    .bind(time_taken_seconds)
    .bind(now)
    .bind(submission.id)
    .execute(&mut **tx)
    .await?;

    if result.rows_affected() != 1 {
        return Err(AppError::AlreadyFinalized(
            "Submission is already submitted".to_string(),
        ));
    }

    Ok((sheet, time_taken_seconds))
}

/// An attempt opened for writing by its own student: row locked, catalog loaded.
pub(crate) struct LockedAttempt {
    pub tx: Transaction<'static, Sqlite>,
    pub submission: Submission,
    pub exam_room: ExamRoom,
    pub questions: Vec<CatalogQuestion>,
}

impl LockedAttempt {
    /// Resolves the attempt, checks the caller may write to it, loads the exam
    /// room catalog, then locks the row. Catalog reads happen before the lock.
    pub async fn acquire(
        pool: &SqlitePool,
        catalog: &dyn Catalog,
        user: &CurrentUser,
        submission_id: i64,
    ) -> Result<Self, AppError> {
        let snapshot = find_submission(pool, submission_id).await?;
        authorize(
            user,
            Resource::Attempt {
                student_id: snapshot.student_id,
            },
            Action::Write,
        )?;

        let exam_room = catalog
            .exam_room(snapshot.exam_room_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Exam room not found".to_string()))?;
        let questions = catalog.questions_ordered(exam_room.id).await?;

        let mut tx = pool.begin().await?;
        let submission = lock_submission(&mut tx, submission_id).await?;

        Ok(Self {
            tx,
            submission,
            exam_room,
            questions,
        })
    }

    /// Checks the attempt against its personal time limit.
    ///
    /// On expiry the attempt is scored, moved to `AUTO_SUBMITTED` and committed
    /// before `Expired` is returned. A terminal attempt fails `NotActive`.
    /// Otherwise the lock is handed back with the seconds remaining.
    pub async fn enforce_time_window(mut self, now: DateTime<Utc>) -> Result<(Self, i64), AppError> {
        if self.submission.status.is_terminal() {
            return Err(AppError::NotActive("Submission is not active".to_string()));
        }

        match evaluate_window(self.submission.started_at, self.exam_room.duration_minutes, now)? {
            TimeWindow::Open { remaining_seconds } => Ok((self, remaining_seconds)),
            TimeWindow::Elapsed { elapsed_seconds } => {
                let (sheet, _) = complete(
                    &mut self.tx,
                    &self.submission,
                    SubmissionStatus::AutoSubmitted,
                    &self.questions,
                    now,
                )
                .await?;
                self.tx.commit().await?;

                tracing::info!(
                    submission_id = self.submission.id,
                    elapsed_seconds,
                    total_score = sheet.total_score,
                    "Submission auto-submitted after time limit"
                );
                Err(AppError::Expired("Exam time has expired".to_string()))
            }
        }
    }
}

/// Starts a new attempt for the caller.
///
/// The exam room must exist, be published, and `now` must fall inside its
/// window. The store refuses a second in-progress attempt for the same
/// (exam room, student), which surfaces as `AlreadyActive`.
pub async fn start_attempt(
    pool: &SqlitePool,
    catalog: &dyn Catalog,
    user: &CurrentUser,
    exam_room_id: i64,
    now: DateTime<Utc>,
) -> Result<SubmissionStartResponse, AppError> {
    let exam_room = catalog
        .exam_room(exam_room_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Exam room not found".to_string()))?;

    if !exam_room.is_published {
        return Err(AppError::NotPublished("Exam room is not published".to_string()));
    }
    if now < exam_room.start_time {
        return Err(AppError::NotActive("Exam has not started yet".to_string()));
    }
    if now > exam_room.end_time {
        return Err(AppError::Expired("Exam has ended".to_string()));
    }

    let questions = catalog.questions_ordered(exam_room.id).await?;

    let submission_id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO submissions (exam_room_id, student_id, started_at, status, updated_at)
        VALUES (?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(exam_room.id)
    .bind(user.id)
    .bind(now)
    .bind(SubmissionStatus::InProgress)
    .bind(now)
    .fetch_one(pool)
    .await
    .map_err(|e| {
        let unique = e
            .as_database_error()
            .is_some_and(|db| db.is_unique_violation());
        if unique {
            AppError::AlreadyActive(
                "You already have an active submission for this exam".to_string(),
            )
        } else {
            tracing::error!("Failed to create submission: {:?}", e);
            AppError::from(e)
        }
    })?;

    tracing::info!(
        submission_id,
        exam_room_id = exam_room.id,
        student_id = user.id,
        "Submission started"
    );

    Ok(SubmissionStartResponse {
        submission_id,
        exam_room_id: exam_room.id,
        exam_room_title: exam_room.title,
        duration_minutes: exam_room.duration_minutes,
        started_at: now,
        questions: questions.iter().map(PublicQuestion::from).collect(),
    })
}

/// Finalizes the caller's attempt and reveals per-question correctness.
pub async fn finalize_attempt(
    pool: &SqlitePool,
    catalog: &dyn Catalog,
    user: &CurrentUser,
    submission_id: i64,
    now: DateTime<Utc>,
) -> Result<SubmissionResult, AppError> {
    let attempt = LockedAttempt::acquire(pool, catalog, user, submission_id).await?;

    if attempt.submission.status.is_terminal() {
        return Err(AppError::AlreadyFinalized(
            "Submission is already submitted".to_string(),
        ));
    }

    let (mut attempt, _) = attempt.enforce_time_window(now).await?;

    let (sheet, time_taken_seconds) = complete(
        &mut attempt.tx,
        &attempt.submission,
        SubmissionStatus::Submitted,
        &attempt.questions,
        now,
    )
    .await?;
    attempt.tx.commit().await?;

    tracing::info!(
        submission_id,
        total_score = sheet.total_score,
        time_taken_seconds,
        "Submission finalized"
    );

    Ok(SubmissionResult {
        submission_id,
        total_score: sheet.total_score,
        status: SubmissionStatus::Submitted,
        submitted_at: Some(now),
        time_taken_seconds: Some(time_taken_seconds),
        answers: sheet.answers,
    })
}

/// Returns the stored attempt record to its own student.
pub async fn get_attempt(
    pool: &SqlitePool,
    user: &CurrentUser,
    submission_id: i64,
) -> Result<Submission, AppError> {
    let submission = find_submission(pool, submission_id).await?;
    authorize(
        user,
        Resource::Attempt {
            student_id: submission.student_id,
        },
        Action::Read,
    )?;

    Ok(submission)
}

/// Re-displays the result of a terminal attempt to its student or a grader.
/// Never changes state.
pub async fn get_result(
    pool: &SqlitePool,
    catalog: &dyn Catalog,
    user: &CurrentUser,
    submission_id: i64,
) -> Result<SubmissionResult, AppError> {
    let submission = find_submission(pool, submission_id).await?;
    let attempt = Resource::Attempt {
        student_id: submission.student_id,
    };
    if decide(user, attempt, Action::Read) == Decision::Denied {
        authorize(user, attempt, Action::Grade)?;
    }

    if !submission.status.is_terminal() {
        return Err(AppError::NotActive(
            "Submission is still in progress".to_string(),
        ));
    }

    let questions = catalog.questions_ordered(submission.exam_room_id).await?;
    let answers = load_answers(pool, submission.id).await?;
    let sheet = scoring::score(&questions, &answers);

    Ok(SubmissionResult {
        submission_id: submission.id,
        total_score: submission.total_score,
        status: submission.status,
        submitted_at: submission.submitted_at,
        time_taken_seconds: submission.time_taken_seconds,
        answers: sheet.answers,
    })
}
