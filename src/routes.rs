// src/routes.rs

use std::sync::Arc;

use axum::{
    Router, http::Method, middleware,
    routing::{get, post, put},
};
use tower_governor::{GovernorLayer, governor::GovernorConfigBuilder};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{attempts, grading, quizzes},
    state::AppState,
    utils::jwt::{auth_middleware, staff_middleware},
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (quizzes, attempts, grading).
/// * Applies global middleware (Auth, Trace, CORS, rate limiting).
/// * Injects global state (pool, config, clock).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        "http://localhost:3000".parse().unwrap(),
        "http://127.0.0.1:3000".parse().unwrap(),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let governor_conf = GovernorConfigBuilder::default()
        .per_second(25)
        .burst_size(50)
        .finish()
        .unwrap();

    let governor_conf = Arc::new(governor_conf);

    let quiz_routes = Router::new()
        .route("/", get(quizzes::list_quizzes))
        .route("/{id}", get(quizzes::get_quiz))
        .route(
            "/{id}/attempts",
            post(attempts::start_attempt).get(attempts::list_attempts),
        );

    // Staff-only routes: manual grading and the stale-attempt sweep.
    let staff_routes = Router::new()
        .route("/sweep", post(attempts::sweep_attempts))
        .route(
            "/{id}/answers/{answer_id}/grade",
            post(grading::grade_essay_answer),
        )
        .layer(middleware::from_fn(staff_middleware));

    let attempt_routes = Router::new()
        .route("/{id}", get(attempts::get_attempt))
        .route("/{id}/questions", get(attempts::get_attempt_questions))
        .route("/{id}/answers", put(attempts::save_answers))
        .route("/{id}/submit", post(attempts::submit_attempt))
        .route("/{id}/abandon", post(attempts::abandon_attempt))
        .merge(staff_routes);

    Router::new()
        .nest("/api/quizzes", quiz_routes)
        .nest("/api/attempts", attempt_routes)
        // Global Middleware (applied from outside in)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(GovernorLayer::new(governor_conf))
        .with_state(state)
}
