// src/services/sweeper.rs

use std::{collections::HashMap, time::Duration};

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tokio::task::JoinHandle;

use crate::{
    error::AppError,
    models::{question::CatalogQuestion, submission::SubmissionStatus},
    services::{
        attempt::{TimeWindow, complete, evaluate_window, lock_submission},
        catalog::Catalog,
    },
    state::AppState,
};

/// Auto-submits every in-progress attempt whose personal time limit has run out.
///
/// Each attempt is moved in its own transaction under the same row lock the
/// request path uses, so an attempt touched concurrently is finalized once.
/// Returns how many attempts were auto-submitted.
pub async fn sweep_expired(
    pool: &SqlitePool,
    catalog: &dyn Catalog,
    now: DateTime<Utc>,
) -> Result<usize, AppError> {
    let candidates = sqlx::query_as::<_, (i64, i64, DateTime<Utc>, i64)>(
        r#"
        SELECT s.id, s.exam_room_id, s.started_at, e.duration_minutes
        FROM submissions s
        JOIN exam_rooms e ON e.id = s.exam_room_id
        WHERE s.status = 'IN_PROGRESS'
        "#,
    )
    .fetch_all(pool)
    .await?;

    let mut questions_by_room: HashMap<i64, Vec<CatalogQuestion>> = HashMap::new();
    let mut swept = 0;

    for (submission_id, exam_room_id, started_at, duration_minutes) in candidates {
        if !matches!(
            evaluate_window(started_at, duration_minutes, now)?,
            TimeWindow::Elapsed { .. }
        ) {
            continue;
        }

        if !questions_by_room.contains_key(&exam_room_id) {
            let questions = catalog.questions_ordered(exam_room_id).await?;
            questions_by_room.insert(exam_room_id, questions);
        }
        let questions = questions_by_room
            .get(&exam_room_id)
            .map(Vec::as_slice)
            .unwrap_or_default();

        let mut tx = pool.begin().await?;
        let submission = lock_submission(&mut tx, submission_id).await?;
        if submission.status != SubmissionStatus::InProgress {
            continue;
        }

        let (sheet, time_taken_seconds) =
            complete(&mut tx, &submission, SubmissionStatus::AutoSubmitted, questions, now).await?;
        tx.commit().await?;
        swept += 1;

        tracing::info!(
            submission_id,
            total_score = sheet.total_score,
            time_taken_seconds,
            "Submission auto-submitted by sweep"
        );
    }

    Ok(swept)
}

/// Runs `sweep_expired` every `period` until the runtime shuts down.
pub fn spawn(state: AppState, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            let now = state.clock.now();

            match sweep_expired(&state.pool, state.catalog.as_ref(), now).await {
                Ok(0) => {}
                Ok(count) => tracing::info!("Expiry sweep auto-submitted {} submission(s)", count),
                Err(e) => tracing::error!("Expiry sweep failed: {}", e),
            }
        }
    })
}
