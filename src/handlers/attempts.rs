// src/handlers/attempts.rs

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};
use validator::Validate;

use crate::{
    engine::{
        catalog::{QuizCatalogReader, SqlxCatalog},
        lifecycle, timeout,
    },
    error::AppError,
    models::{
        answer::{AnswerView, SubmitAttemptRequest},
        attempt::{
            Attempt, AttemptDetailResponse, AttemptResponse, AttemptStatus, ListAttemptsParams,
        },
        quiz::{PublicOption, PublicQuestion},
    },
    state::AppState,
    utils::jwt::Claims,
};

fn require_owner(claims: &Claims, attempt: &Attempt) -> Result<(), AppError> {
    let caller_id = claims.sub.parse::<i64>().unwrap_or(0);
    if attempt.student_id != caller_id {
        return Err(AppError::Forbidden(
            "You do not own this attempt".to_string(),
        ));
    }
    Ok(())
}

fn require_owner_or_staff(claims: &Claims, attempt: &Attempt) -> Result<(), AppError> {
    if claims.is_staff() {
        return Ok(());
    }
    require_owner(claims, attempt)
}

/// Starts (or resumes) the caller's attempt at a quiz.
/// POST /api/quizzes/{id}/attempts
pub async fn start_attempt(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let student_id = claims.sub.parse::<i64>().unwrap_or(0);
    let now = state.clock.now();

    let catalog = SqlxCatalog::new(state.pool.clone());
    let def = catalog.get(quiz_id).await?;

    let attempt = lifecycle::start(&state.pool, &def, student_id, now).await?;

    let remaining = timeout::remaining_seconds(attempt.started_at, def.quiz.duration_seconds, now);

    Ok((
        StatusCode::CREATED,
        Json(AttemptResponse::new(attempt, Some(remaining))),
    ))
}

/// Retrieves a single attempt with its saved answers.
/// GET /api/attempts/{id}
///
/// While in progress the response carries a live `remaining_seconds`
/// and withholds grading fields. An attempt observed past its deadline
/// is finalized to TimedOut before being returned.
pub async fn get_attempt(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(attempt_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let mut attempt = lifecycle::fetch_attempt(&state.pool, attempt_id).await?;
    require_owner_or_staff(&claims, &attempt)?;

    let catalog = SqlxCatalog::new(state.pool.clone());
    let def = catalog.get(attempt.quiz_id).await?;
    let now = state.clock.now();

    if timeout::is_timed_out(&attempt, def.quiz.duration_seconds, now) {
        attempt = lifecycle::finalize_timed_out(&state.pool, &def, &attempt).await?;
    }

    let reveal_grading = attempt.status.is_terminal();
    let answers = lifecycle::fetch_answers(&state.pool, attempt.id)
        .await?
        .into_iter()
        .map(|a| AnswerView::from_answer(a, reveal_grading))
        .collect();

    let remaining_seconds = (attempt.status == AttemptStatus::InProgress).then(|| {
        timeout::remaining_seconds(attempt.started_at, def.quiz.duration_seconds, now)
    });

    Ok(Json(AttemptDetailResponse {
        attempt,
        remaining_seconds,
        answers,
    }))
}

/// Returns the attempt's questions in presentation order, without
/// answer keys.
/// GET /api/attempts/{id}/questions
///
/// Shuffle order is seeded from the attempt id, so the same student
/// sees the same order across reloads. Grading keys by id and never
/// depends on presentation order.
pub async fn get_attempt_questions(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(attempt_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let attempt = lifecycle::fetch_attempt(&state.pool, attempt_id).await?;
    require_owner_or_staff(&claims, &attempt)?;

    let catalog = SqlxCatalog::new(state.pool.clone());
    let def = catalog.get(attempt.quiz_id).await?;

    let mut questions: Vec<PublicQuestion> = def
        .questions
        .iter()
        .map(|q| PublicQuestion {
            id: q.question.id,
            question_type: q.question.question_type,
            content: q.question.content.clone(),
            marks: q.question.marks,
            options: q
                .options
                .iter()
                .map(|o| PublicOption {
                    id: o.id,
                    content: o.content.clone(),
                })
                .collect(),
        })
        .collect();

    let mut rng = StdRng::seed_from_u64(attempt.id as u64);

    if def.quiz.shuffle_questions {
        questions.shuffle(&mut rng);
    }
    if def.quiz.shuffle_answers {
        for question in &mut questions {
            question.options.shuffle(&mut rng);
        }
    }

    Ok(Json(questions))
}

/// Saves partial progress while the attempt is in progress.
/// PUT /api/attempts/{id}/answers
pub async fn save_answers(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(attempt_id): Path<i64>,
    Json(payload): Json<SubmitAttemptRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let attempt = lifecycle::fetch_attempt(&state.pool, attempt_id).await?;
    require_owner(&claims, &attempt)?;

    let catalog = SqlxCatalog::new(state.pool.clone());
    let def = catalog.get(attempt.quiz_id).await?;

    let saved = lifecycle::save_answers(
        &state.pool,
        &def,
        &attempt,
        &payload.answers,
        state.clock.now(),
    )
    .await?;

    Ok(Json(serde_json::json!({ "saved": saved })))
}

/// Submits the attempt for grading and finalization.
/// POST /api/attempts/{id}/submit
pub async fn submit_attempt(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(attempt_id): Path<i64>,
    Json(payload): Json<SubmitAttemptRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let attempt = lifecycle::fetch_attempt(&state.pool, attempt_id).await?;
    require_owner(&claims, &attempt)?;

    let catalog = SqlxCatalog::new(state.pool.clone());
    let def = catalog.get(attempt.quiz_id).await?;

    let attempt = lifecycle::submit(
        &state.pool,
        &def,
        &attempt,
        &payload.answers,
        state.clock.now(),
    )
    .await?;

    Ok(Json(AttemptResponse::new(attempt, None)))
}

/// Abandons an in-progress attempt. Idempotent; no scoring happens and
/// the attempt does not consume one of the student's allowed attempts.
/// POST /api/attempts/{id}/abandon
pub async fn abandon_attempt(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(attempt_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let attempt = lifecycle::fetch_attempt(&state.pool, attempt_id).await?;
    require_owner_or_staff(&claims, &attempt)?;

    let attempt = lifecycle::abandon(&state.pool, &attempt).await?;

    Ok(Json(AttemptResponse::new(attempt, None)))
}

/// Lists attempts on a quiz. Students see their own; staff see all and
/// may filter by student.
/// GET /api/quizzes/{id}/attempts
pub async fn list_attempts(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
    Query(params): Query<ListAttemptsParams>,
) -> Result<impl IntoResponse, AppError> {
    let student_filter = if claims.is_staff() {
        params.student_id
    } else {
        Some(claims.sub.parse::<i64>().unwrap_or(0))
    };

    let catalog = SqlxCatalog::new(state.pool.clone());
    let def = catalog.get(quiz_id).await?;

    let attempts = sqlx::query_as::<_, Attempt>(
        r#"
        SELECT id, quiz_id, student_id, started_at, completed_at, status,
               score, percentage, is_passed, time_taken_seconds
        FROM attempts
        WHERE quiz_id = ?
          AND (? IS NULL OR student_id = ?)
        ORDER BY started_at DESC, id DESC
        "#,
    )
    .bind(quiz_id)
    .bind(student_filter)
    .bind(student_filter)
    .fetch_all(&state.pool)
    .await?;

    let now = state.clock.now();
    let attempts: Vec<AttemptResponse> = attempts
        .into_iter()
        .map(|a| {
            let remaining = (a.status == AttemptStatus::InProgress).then(|| {
                timeout::remaining_seconds(a.started_at, def.quiz.duration_seconds, now)
            });
            AttemptResponse::new(a, remaining)
        })
        .collect();

    Ok(Json(attempts))
}

/// Force-finalizes in-progress attempts whose time has run out.
/// POST /api/attempts/sweep (staff only)
pub async fn sweep_attempts(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let catalog = SqlxCatalog::new(state.pool.clone());
    let swept = lifecycle::sweep_stale(&state.pool, &catalog, state.clock.now()).await?;

    Ok(Json(serde_json::json!({ "swept": swept })))
}
