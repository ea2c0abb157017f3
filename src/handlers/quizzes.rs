// src/handlers/quizzes.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::{
    error::AppError,
    models::quiz::{PublicQuiz, Quiz},
};

/// Query parameters for listing quizzes.
#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub q: Option<String>,
}

/// Lists published quizzes, optionally filtered by a title keyword.
pub async fn list_quizzes(
    State(pool): State<SqlitePool>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, AppError> {
    // Prepare search pattern
    let search_pattern = params.q.map(|k| format!("%{}%", k));

    let quizzes = sqlx::query_as::<_, Quiz>(
        r#"
        SELECT id, title, description, duration_seconds, total_marks,
               pass_percentage, max_attempts, available_from, available_until,
               is_published, shuffle_questions, shuffle_answers, created_at
        FROM quizzes
        WHERE is_published = 1
          AND (? IS NULL OR title LIKE ?)
        ORDER BY id
        "#,
    )
    .bind(search_pattern.clone())
    .bind(search_pattern)
    .fetch_all(&pool)
    .await?;

    let quizzes: Vec<PublicQuiz> = quizzes.into_iter().map(PublicQuiz::from).collect();

    Ok(Json(quizzes))
}

/// Retrieves a single published quiz by ID.
///
/// Metadata only; the question set is revealed through an attempt so
/// answer keys never leave the server.
pub async fn get_quiz(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = sqlx::query_as::<_, Quiz>(
        r#"
        SELECT id, title, description, duration_seconds, total_marks,
               pass_percentage, max_attempts, available_from, available_until,
               is_published, shuffle_questions, shuffle_answers, created_at
        FROM quizzes
        WHERE id = ? AND is_published = 1
        "#,
    )
    .bind(id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    Ok(Json(PublicQuiz::from(quiz)))
}
