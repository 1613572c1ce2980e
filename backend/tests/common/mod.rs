// tests/common/mod.rs

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use examroom::{
    config::Config,
    database,
    models::user::Role,
    routes,
    services::catalog::SqlCatalog,
    state::AppState,
    utils::{clock::ManualClock, jwt::sign_jwt},
};
use sqlx::SqlitePool;

pub const ADMIN_ID: i64 = 1;
pub const OWNER_ID: i64 = 2;
pub const STUDENT_ID: i64 = 100;
pub const OTHER_STUDENT_ID: i64 = 101;

pub struct TestApp {
    pub address: String,
    pub pool: SqlitePool,
    pub clock: ManualClock,
    pub client: reqwest::Client,
    secret: String,
}

/// T0 of every scenario: the opening of the seeded exam window.
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()
}

/// Spawns the app on a random port against a fresh SQLite file.
pub async fn spawn_app() -> TestApp {
    let path = std::env::temp_dir().join(format!("examroom-test-{}.db", uuid::Uuid::new_v4()));
    let database_url = format!("sqlite://{}?mode=rwc", path.display());

    let pool = database::connect(&database_url, 5)
        .await
        .expect("Failed to open test database");
    database::migrate(&pool)
        .await
        .expect("Failed to migrate database");

    let secret = "test_secret_for_integration_tests".to_string();
    let config = Config {
        database_url,
        jwt_secret: secret.clone(),
        rust_log: "error".to_string(),
        bind_addr: "127.0.0.1:0".to_string(),
        db_max_connections: 5,
        auto_submit_sweep_secs: None,
        cors_origins: vec![],
    };

    let clock = ManualClock::new(t0());
    let state = AppState {
        pool: pool.clone(),
        config,
        catalog: Arc::new(SqlCatalog::new(pool.clone())),
        clock: Arc::new(clock.clone()),
    };

    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        address,
        pool,
        clock,
        client: reqwest::Client::new(),
        secret,
    }
}

impl TestApp {
    pub fn token(&self, user_id: i64, role: Role) -> String {
        sign_jwt(user_id, role, &self.secret, 600).unwrap()
    }

    pub fn student_token(&self) -> String {
        self.token(STUDENT_ID, Role::Student)
    }

    pub fn at(&self, minutes_after_t0: i64) {
        self.clock.set(t0() + Duration::minutes(minutes_after_t0));
    }

    /// Inserts an exam room owned by `OWNER_ID`, open `[T0, T0 + 60min)`, 30 minutes per attempt.
    pub async fn seed_exam_room(&self, title: &str, published: bool) -> i64 {
        self.seed_exam_room_with(title, published, t0(), t0() + Duration::minutes(60), 30)
            .await
    }

    pub async fn seed_exam_room_with(
        &self,
        title: &str,
        published: bool,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        duration_minutes: i64,
    ) -> i64 {
        sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO exam_rooms (title, start_time, end_time, duration_minutes, total_marks, is_published, created_by)
            VALUES (?, ?, ?, ?, 0, ?, ?)
            RETURNING id
            "#,
        )
        .bind(title)
        .bind(start_time)
        .bind(end_time)
        .bind(duration_minutes)
        .bind(published)
        .bind(OWNER_ID)
        .fetch_one(&self.pool)
        .await
        .unwrap()
    }

    /// Inserts a question with one option per flag; returns the question id and option ids.
    pub async fn seed_question(
        &self,
        exam_room_id: i64,
        marks: i64,
        order_index: i64,
        correct_flags: &[bool],
    ) -> (i64, Vec<i64>) {
        let question_id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO questions (exam_room_id, question_text, marks, order_index)
            VALUES (?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(exam_room_id)
        .bind(format!("Question {}", order_index))
        .bind(marks)
        .bind(order_index)
        .fetch_one(&self.pool)
        .await
        .unwrap();

        let mut option_ids = Vec::new();
        for (i, is_correct) in correct_flags.iter().enumerate() {
            let id = sqlx::query_scalar::<_, i64>(
                "INSERT INTO options (question_id, option_text, is_correct) VALUES (?, ?, ?) RETURNING id",
            )
            .bind(question_id)
            .bind(format!("Option {}", i))
            .bind(*is_correct)
            .fetch_one(&self.pool)
            .await
            .unwrap();
            option_ids.push(id);
        }

        (question_id, option_ids)
    }

    pub async fn start(&self, token: &str, exam_room_id: i64) -> reqwest::Response {
        self.client
            .post(format!("{}/api/submissions/start", self.address))
            .bearer_auth(token)
            .json(&serde_json::json!({ "exam_room_id": exam_room_id }))
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Starts an attempt and returns its id, panicking on failure.
    pub async fn start_ok(&self, token: &str, exam_room_id: i64) -> i64 {
        let response = self.start(token, exam_room_id).await;
        assert_eq!(response.status().as_u16(), 200);
        let body: serde_json::Value = response.json().await.unwrap();
        body["submission_id"].as_i64().unwrap()
    }

    pub async fn answer(
        &self,
        token: &str,
        submission_id: i64,
        question_id: i64,
        selected_option_id: Option<i64>,
    ) -> reqwest::Response {
        self.client
            .post(format!("{}/api/submissions/{}/answers", self.address, submission_id))
            .bearer_auth(token)
            .json(&serde_json::json!({
                "question_id": question_id,
                "selected_option_id": selected_option_id,
            }))
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn submit(&self, token: &str, submission_id: i64) -> reqwest::Response {
        self.client
            .post(format!("{}/api/submissions/{}/submit", self.address, submission_id))
            .bearer_auth(token)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn get(&self, token: &str, path: &str) -> reqwest::Response {
        self.client
            .get(format!("{}{}", self.address, path))
            .bearer_auth(token)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn submission_status(&self, submission_id: i64) -> (String, i64) {
        sqlx::query_as::<_, (String, i64)>(
            "SELECT status, total_score FROM submissions WHERE id = ?",
        )
        .bind(submission_id)
        .fetch_one(&self.pool)
        .await
        .unwrap()
    }
}

/// Asserts an error response and returns its body.
pub async fn expect_error(response: reqwest::Response, status: u16, kind: &str) -> serde_json::Value {
    assert_eq!(response.status().as_u16(), status);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["kind"], kind, "unexpected error body: {}", body);
    body
}
