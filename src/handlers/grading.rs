// src/handlers/grading.rs

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    engine::{
        catalog::{QuizCatalogReader, SqlxCatalog},
        lifecycle,
    },
    error::AppError,
    models::{
        answer::{AttemptAnswer, GradeEssayRequest},
        attempt::AttemptResponse,
    },
    state::AppState,
};

/// Applies a teacher's grade to one essay answer and refreshes the
/// attempt's aggregate score.
/// POST /api/attempts/{id}/answers/{answer_id}/grade
///
/// Works on attempts in any state: teacher authority is not bound by
/// the student-facing lifecycle.
pub async fn grade_essay_answer(
    State(state): State<AppState>,
    Path((attempt_id, answer_id)): Path<(i64, i64)>,
    Json(payload): Json<GradeEssayRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let attempt = lifecycle::fetch_attempt(&state.pool, attempt_id).await?;

    let answer = sqlx::query_as::<_, AttemptAnswer>(
        r#"
        SELECT id, attempt_id, question_id, selected_option_id, answer_text,
               outcome, marks_obtained, updated_at
        FROM attempt_answers
        WHERE id = ? AND attempt_id = ?
        "#,
    )
    .bind(answer_id)
    .bind(attempt_id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or(AppError::NotFound("Answer not found".to_string()))?;

    let catalog = SqlxCatalog::new(state.pool.clone());
    let def = catalog.get(attempt.quiz_id).await?;

    let attempt = lifecycle::regrade_essay(
        &state.pool,
        &def,
        &attempt,
        &answer,
        payload.marks_obtained,
        payload.is_correct,
        state.clock.now(),
    )
    .await?;

    Ok(Json(AttemptResponse::new(attempt, None)))
}
