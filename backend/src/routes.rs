// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post},
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    error::ErrorBody,
    handlers::{health, submission},
    state::AppState,
    utils::jwt::auth_middleware,
};

#[derive(OpenApi)]
#[openapi(
    info(title = "Exam Room API", description = "Exam attempts, answers and scoring"),
    paths(
        submission::start_submission,
        submission::get_submission,
        submission::save_answer,
        submission::submit_submission,
        submission::get_result,
        submission::my_history,
        submission::exam_room_submissions,
    ),
    components(schemas(ErrorBody)),
    tags((name = "Submissions", description = "Attempt lifecycle and history")),
)]
pub struct ApiDoc;

/// Assembles the main application router.
///
/// * Every submission route sits behind `auth_middleware`.
/// * Applies global middleware (Trace, CORS).
/// * Serves the OpenAPI document and Swagger UI.
pub fn create_router(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let submission_routes = Router::new()
        .route("/start", post(submission::start_submission))
        .route("/my-history", get(submission::my_history))
        .route(
            "/exam-room/{id}/submissions",
            get(submission::exam_room_submissions),
        )
        .route("/{id}", get(submission::get_submission))
        .route("/{id}/answers", post(submission::save_answer))
        .route("/{id}/submit", post(submission::submit_submission))
        .route("/{id}/result", get(submission::get_result))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api/submissions", submission_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{body::Body, http::Request, http::StatusCode};
    use sqlx::SqlitePool;
    use tower::ServiceExt;

    use super::*;
    use crate::{config::Config, services::catalog::SqlCatalog, utils::clock::SystemClock};

    fn test_state() -> AppState {
        let pool = SqlitePool::connect_lazy("sqlite::memory:").unwrap();
        AppState {
            catalog: Arc::new(SqlCatalog::new(pool.clone())),
            pool,
            config: Config {
                database_url: "sqlite::memory:".to_string(),
                jwt_secret: "router_test_secret".to_string(),
                rust_log: "error".to_string(),
                bind_addr: "127.0.0.1:0".to_string(),
                db_max_connections: 1,
                auto_submit_sweep_secs: None,
                cors_origins: vec![],
            },
            clock: Arc::new(SystemClock),
        }
    }

    #[tokio::test]
    async fn health_is_public() {
        let app = create_router(test_state());

        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn submission_routes_require_a_token() {
        let app = create_router(test_state());

        let response = app
            .oneshot(
                Request::get("/api/submissions/my-history")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn openapi_lists_submission_paths() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/submissions/start"));
        assert!(doc.paths.paths.contains_key("/api/submissions/{id}/submit"));
    }
}
