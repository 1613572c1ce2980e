// src/services/ledger.rs

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::{
    error::AppError,
    models::{
        submission::{Answer, AnswerResponse, SaveAnswerRequest},
        user::CurrentUser,
    },
    services::{attempt::LockedAttempt, catalog::Catalog},
};

/// Records (or replaces) the caller's answer to one question.
///
/// The time window is enforced first, so an expired attempt is auto-submitted
/// even when the request itself is malformed. Last write wins; no history is kept.
pub async fn upsert_answer(
    pool: &SqlitePool,
    catalog: &dyn Catalog,
    user: &CurrentUser,
    submission_id: i64,
    req: &SaveAnswerRequest,
    now: DateTime<Utc>,
) -> Result<AnswerResponse, AppError> {
    let selected_option = match req.selected_option_id {
        Some(option_id) => Some((option_id, catalog.option(option_id).await?)),
        None => None,
    };

    let attempt = LockedAttempt::acquire(pool, catalog, user, submission_id).await?;
    let (mut attempt, remaining_seconds) = attempt.enforce_time_window(now).await?;

    if !attempt.questions.iter().any(|q| q.id == req.question_id) {
        return Err(AppError::NotFound(
            "Question not found in this exam".to_string(),
        ));
    }

    let is_correct = match selected_option {
        None => false,
        Some((_, Some(option))) if option.question_id == req.question_id => option.is_correct,
        Some((option_id, _)) => {
            tracing::debug!(
                submission_id,
                question_id = req.question_id,
                option_id,
                "Rejected option outside question"
            );
            return Err(AppError::NotFound(
                "Option not found for this question".to_string(),
            ));
        }
    };

    let answer = sqlx::query_as::<_, Answer>(
        r#"
        INSERT INTO answers (submission_id, question_id, selected_option_id, is_correct, updated_at)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT (submission_id, question_id) DO UPDATE SET
            selected_option_id = excluded.selected_option_id,
            is_correct = excluded.is_correct,
            updated_at = excluded.updated_at
        RETURNING id, submission_id, question_id, selected_option_id, is_correct
        "#,
    )
    .bind(submission_id)
    .bind(req.question_id)
    .bind(req.selected_option_id)
    .bind(is_correct)
    .bind(now)
    .fetch_one(&mut *attempt.tx)
    .await
    .map_err(|e| {
        tracing::error!("Failed to upsert answer: {:?}", e);
        AppError::from(e)
    })?;

    attempt.tx.commit().await?;

    tracing::debug!(
        submission_id,
        question_id = answer.question_id,
        remaining_seconds,
        "Answer saved"
    );

    Ok(AnswerResponse::from(answer))
}
