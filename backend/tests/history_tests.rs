// tests/history_tests.rs

mod common;

use chrono::Duration;
use common::{ADMIN_ID, OTHER_STUDENT_ID, OWNER_ID, expect_error, spawn_app, t0};
use examroom::{
    models::user::Role,
    services::{catalog::SqlCatalog, sweeper::sweep_expired},
};

#[tokio::test]
async fn my_history_lists_newest_first_with_titles() {
    let app = spawn_app().await;
    let first = app.seed_exam_room("Biology Quiz", true).await;
    let second = app.seed_exam_room("History Final", true).await;
    let (q1, options) = app.seed_question(first, 5, 1, &[true, false]).await;
    app.seed_question(second, 5, 1, &[true, false]).await;
    let token = app.student_token();

    app.at(5);
    let older = app.start_ok(&token, first).await;
    app.answer(&token, older, q1, Some(options[0])).await;
    app.at(8);
    app.submit(&token, older).await;

    app.at(12);
    let newer = app.start_ok(&token, second).await;

    let other = app.token(OTHER_STUDENT_ID, Role::Student);
    app.start_ok(&other, first).await;

    let response = app.get(&token, "/api/submissions/my-history").await;
    assert_eq!(response.status().as_u16(), 200);
    let rows: Vec<serde_json::Value> = response.json().await.unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["id"], newer);
    assert_eq!(rows[0]["exam_room_title"], "History Final");
    assert_eq!(rows[0]["status"], "IN_PROGRESS");
    assert_eq!(rows[1]["id"], older);
    assert_eq!(rows[1]["exam_room_title"], "Biology Quiz");
    assert_eq!(rows[1]["status"], "SUBMITTED");
    assert_eq!(rows[1]["total_score"], 5);

    let paged: Vec<serde_json::Value> = app
        .get(&token, "/api/submissions/my-history?skip=1&limit=1")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(paged.len(), 1);
    assert_eq!(paged[0]["id"], older);
}

#[tokio::test]
async fn history_flags_overdue_attempts_without_changing_them() {
    let app = spawn_app().await;
    let exam = app.seed_exam_room("Literature Quiz", true).await;
    app.seed_question(exam, 1, 1, &[true, false]).await;
    let token = app.student_token();

    app.at(10);
    let submission = app.start_ok(&token, exam).await;

    let rows: Vec<serde_json::Value> = app
        .get(&token, "/api/submissions/my-history")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(rows[0]["is_overdue"], false);

    app.at(50);
    let rows: Vec<serde_json::Value> = app
        .get(&token, "/api/submissions/my-history")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(rows[0]["status"], "IN_PROGRESS");
    assert_eq!(rows[0]["is_overdue"], true);

    let (status, _) = app.submission_status(submission).await;
    assert_eq!(status, "IN_PROGRESS");
}

#[tokio::test]
async fn exam_room_submissions_are_for_owner_and_admin() {
    let app = spawn_app().await;
    let exam = app.seed_exam_room("Discrete Math Final", true).await;
    app.seed_question(exam, 1, 1, &[true, false]).await;

    app.at(5);
    app.start_ok(&app.student_token(), exam).await;
    app.at(6);
    app.start_ok(&app.token(OTHER_STUDENT_ID, Role::Student), exam).await;

    let path = format!("/api/submissions/exam-room/{}/submissions", exam);

    for viewer in [app.token(OWNER_ID, Role::Admin), app.token(ADMIN_ID, Role::Admin)] {
        let response = app.get(&viewer, &path).await;
        assert_eq!(response.status().as_u16(), 200);
        let rows: Vec<serde_json::Value> = response.json().await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["student_id"], OTHER_STUDENT_ID);
        assert_eq!(rows[0]["exam_room_title"], "Discrete Math Final");
    }

    expect_error(app.get(&app.student_token(), &path).await, 403, "access_denied").await;
    expect_error(
        app.get(&app.token(ADMIN_ID, Role::Admin), "/api/submissions/exam-room/9999/submissions")
            .await,
        404,
        "not_found",
    )
    .await;
}

#[tokio::test]
async fn sweep_auto_submits_only_expired_attempts() {
    let app = spawn_app().await;
    let short = app
        .seed_exam_room_with("Short", true, t0(), t0() + Duration::minutes(60), 10)
        .await;
    let long = app
        .seed_exam_room_with("Long", true, t0(), t0() + Duration::minutes(60), 45)
        .await;
    let (q1, options) = app.seed_question(short, 2, 1, &[false, true]).await;
    app.seed_question(long, 2, 1, &[false, true]).await;
    let token = app.student_token();

    app.at(0);
    let expiring = app.start_ok(&token, short).await;
    app.answer(&token, expiring, q1, Some(options[1])).await;
    let running = app.start_ok(&token, long).await;

    let catalog = SqlCatalog::new(app.pool.clone());
    let swept = sweep_expired(&app.pool, &catalog, t0() + Duration::minutes(20))
        .await
        .unwrap();
    assert_eq!(swept, 1);

    assert_eq!(app.submission_status(expiring).await, ("AUTO_SUBMITTED".to_string(), 2));
    assert_eq!(app.submission_status(running).await.0, "IN_PROGRESS");

    // A second sweep finds nothing left to do.
    let swept = sweep_expired(&app.pool, &catalog, t0() + Duration::minutes(20))
        .await
        .unwrap();
    assert_eq!(swept, 0);
}

#[tokio::test]
async fn terminal_status_cannot_be_rewritten_in_storage() {
    let app = spawn_app().await;
    let exam = app.seed_exam_room("Probability Quiz", true).await;
    app.seed_question(exam, 1, 1, &[true, false]).await;
    let token = app.student_token();

    app.at(5);
    let submission = app.start_ok(&token, exam).await;
    app.submit(&token, submission).await;

    let result = sqlx::query("UPDATE submissions SET status = 'IN_PROGRESS' WHERE id = ?")
        .bind(submission)
        .execute(&app.pool)
        .await;
    assert!(result.is_err());
    assert_eq!(app.submission_status(submission).await.0, "SUBMITTED");
}
