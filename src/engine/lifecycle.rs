// src/engine/lifecycle.rs

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqlitePool, Transaction};

use crate::{
    config::SWEEP_BATCH_LIMIT,
    engine::{catalog::QuizCatalogReader, evaluator, score, timeout},
    error::AppError,
    models::{
        answer::{AttemptAnswer, GradingOutcome, SubmittedAnswer},
        attempt::{Attempt, AttemptEvent, AttemptStatus},
        quiz::{QuestionType, QuizDefinition},
    },
    utils::html::clean_html,
};

/// Fetches an attempt by id.
pub async fn fetch_attempt(pool: &SqlitePool, attempt_id: i64) -> Result<Attempt, AppError> {
    sqlx::query_as::<_, Attempt>(
        r#"
        SELECT id, quiz_id, student_id, started_at, completed_at, status,
               score, percentage, is_passed, time_taken_seconds
        FROM attempts
        WHERE id = ?
        "#,
    )
    .bind(attempt_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Attempt not found".to_string()))
}

/// Fetches every answer saved for an attempt.
pub async fn fetch_answers<'e, E>(executor: E, attempt_id: i64) -> Result<Vec<AttemptAnswer>, AppError>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    Ok(sqlx::query_as::<_, AttemptAnswer>(
        r#"
        SELECT id, attempt_id, question_id, selected_option_id, answer_text,
               outcome, marks_obtained, updated_at
        FROM attempt_answers
        WHERE attempt_id = ?
        ORDER BY question_id
        "#,
    )
    .bind(attempt_id)
    .fetch_all(executor)
    .await?)
}

async fn fetch_in_progress(
    pool: &SqlitePool,
    quiz_id: i64,
    student_id: i64,
) -> Result<Option<Attempt>, AppError> {
    Ok(sqlx::query_as::<_, Attempt>(
        r#"
        SELECT id, quiz_id, student_id, started_at, completed_at, status,
               score, percentage, is_passed, time_taken_seconds
        FROM attempts
        WHERE quiz_id = ? AND student_id = ? AND status = 'in_progress'
        "#,
    )
    .bind(quiz_id)
    .bind(student_id)
    .fetch_optional(pool)
    .await?)
}

/// Starts an attempt, or resumes the student's open one.
///
/// * The quiz must be published and inside its availability window.
/// * Completed and timed-out attempts count toward `max_attempts`;
///   abandoned and in-progress ones do not.
/// * If an in-progress attempt already exists it is returned as-is,
///   without touching its clock.
pub async fn start(
    pool: &SqlitePool,
    def: &QuizDefinition,
    student_id: i64,
    now: DateTime<Utc>,
) -> Result<Attempt, AppError> {
    let quiz = &def.quiz;

    if !quiz.is_available_at(now) {
        return Err(AppError::QuizUnavailable(
            "Quiz is not currently available".to_string(),
        ));
    }

    if let Some(existing) = fetch_in_progress(pool, quiz.id, student_id).await? {
        return Ok(existing);
    }

    let used: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM attempts
        WHERE quiz_id = ? AND student_id = ? AND status IN ('completed', 'timed_out')
        "#,
    )
    .bind(quiz.id)
    .bind(student_id)
    .fetch_one(pool)
    .await?;

    if used >= quiz.max_attempts {
        return Err(AppError::AttemptLimitExceeded(format!(
            "All {} attempts for this quiz have been used",
            quiz.max_attempts
        )));
    }

    let inserted = sqlx::query_as::<_, Attempt>(
        r#"
        INSERT INTO attempts (quiz_id, student_id, started_at, status)
        VALUES (?, ?, ?, 'in_progress')
        RETURNING id, quiz_id, student_id, started_at, completed_at, status,
                  score, percentage, is_passed, time_taken_seconds
        "#,
    )
    .bind(quiz.id)
    .bind(student_id)
    .bind(now)
    .fetch_one(pool)
    .await;

    match inserted {
        Ok(attempt) => Ok(attempt),
        Err(e) if e.to_string().contains("UNIQUE constraint") => {
            // Lost a concurrent start() race: the partial unique index
            // kept the other caller's row, so both observe that one.
            fetch_in_progress(pool, quiz.id, student_id)
                .await?
                .ok_or(AppError::InternalServerError(e.to_string()))
        }
        Err(e) => {
            tracing::error!("Failed to create attempt: {:?}", e);
            Err(e.into())
        }
    }
}

/// Saves (upserts) answers while the attempt is in progress, grading
/// each immediately. Does not finalize.
pub async fn save_answers(
    pool: &SqlitePool,
    def: &QuizDefinition,
    attempt: &Attempt,
    answers: &[SubmittedAnswer],
    now: DateTime<Utc>,
) -> Result<usize, AppError> {
    if attempt.status != AttemptStatus::InProgress {
        return Err(AppError::AlreadyFinalized(format!(
            "Attempt is already {}",
            attempt.status.as_str()
        )));
    }

    if timeout::is_timed_out(attempt, def.quiz.duration_seconds, now) {
        // Observing the expired attempt finalizes it; the late payload
        // is discarded.
        finalize_timed_out(pool, def, attempt).await?;
        return Err(AppError::AlreadyFinalized(
            "Attempt time has expired".to_string(),
        ));
    }

    let mut tx = pool.begin().await?;
    let saved = upsert_answers(&mut tx, def, attempt.id, answers, now).await?;
    tx.commit().await?;

    Ok(saved)
}

/// Submits the attempt: upserts and grades the payload, aggregates the
/// score and finalizes to Completed, all in one transaction.
///
/// A submission arriving after the deadline is not on time: the payload
/// is discarded and the attempt finalizes to TimedOut over whatever
/// answers were previously saved.
pub async fn submit(
    pool: &SqlitePool,
    def: &QuizDefinition,
    attempt: &Attempt,
    answers: &[SubmittedAnswer],
    now: DateTime<Utc>,
) -> Result<Attempt, AppError> {
    if attempt.status != AttemptStatus::InProgress {
        return Err(AppError::AlreadyFinalized(format!(
            "Attempt is already {}",
            attempt.status.as_str()
        )));
    }

    if timeout::is_timed_out(attempt, def.quiz.duration_seconds, now) {
        return finalize_timed_out(pool, def, attempt).await;
    }

    let next_status = attempt.status.transition(AttemptEvent::Submit)?;

    let mut tx = pool.begin().await?;

    upsert_answers(&mut tx, def, attempt.id, answers, now).await?;

    let all_answers = fetch_answers(&mut *tx, attempt.id).await?;
    let aggregate = score::aggregate(&all_answers, def.quiz.total_marks, def.quiz.pass_percentage);
    let time_taken = timeout::elapsed_seconds(attempt.started_at, now);

    let updated = sqlx::query_as::<_, Attempt>(
        r#"
        UPDATE attempts
        SET status = ?, completed_at = ?, time_taken_seconds = ?,
            score = ?, percentage = ?, is_passed = ?
        WHERE id = ? AND status = 'in_progress'
        RETURNING id, quiz_id, student_id, started_at, completed_at, status,
                  score, percentage, is_passed, time_taken_seconds
        "#,
    )
    .bind(next_status)
    .bind(now)
    .bind(time_taken)
    .bind(aggregate.score)
    .bind(aggregate.percentage)
    .bind(aggregate.is_passed)
    .bind(attempt.id)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(updated) = updated else {
        // Finalized concurrently between our read and this update.
        tx.rollback().await?;
        return Err(AppError::AlreadyFinalized(
            "Attempt was finalized concurrently".to_string(),
        ));
    };

    tx.commit().await?;
    Ok(updated)
}

/// Finalizes an expired attempt to TimedOut. Only previously saved
/// answers are scored; completed_at lands exactly on the deadline.
pub async fn finalize_timed_out(
    pool: &SqlitePool,
    def: &QuizDefinition,
    attempt: &Attempt,
) -> Result<Attempt, AppError> {
    let next_status = attempt.status.transition(AttemptEvent::Timeout)?;

    let mut tx = pool.begin().await?;

    let answers = fetch_answers(&mut *tx, attempt.id).await?;
    let aggregate = score::aggregate(&answers, def.quiz.total_marks, def.quiz.pass_percentage);
    let completed_at = timeout::deadline(attempt.started_at, def.quiz.duration_seconds);

    let updated = sqlx::query_as::<_, Attempt>(
        r#"
        UPDATE attempts
        SET status = ?, completed_at = ?, time_taken_seconds = ?,
            score = ?, percentage = ?, is_passed = ?
        WHERE id = ? AND status = 'in_progress'
        RETURNING id, quiz_id, student_id, started_at, completed_at, status,
                  score, percentage, is_passed, time_taken_seconds
        "#,
    )
    .bind(next_status)
    .bind(completed_at)
    .bind(def.quiz.duration_seconds)
    .bind(aggregate.score)
    .bind(aggregate.percentage)
    .bind(aggregate.is_passed)
    .bind(attempt.id)
    .fetch_optional(&mut *tx)
    .await?;

    match updated {
        Some(attempt) => {
            tx.commit().await?;
            Ok(attempt)
        }
        None => {
            // A concurrent observer finalized first; return the
            // terminal row as it stands.
            tx.rollback().await?;
            fetch_attempt(pool, attempt.id).await
        }
    }
}

/// Administrative transition to Abandoned. Idempotent, no scoring, and
/// the attempt does not count toward the max-attempts limit.
pub async fn abandon(pool: &SqlitePool, attempt: &Attempt) -> Result<Attempt, AppError> {
    if attempt.status == AttemptStatus::Abandoned {
        return Ok(attempt.clone());
    }

    let next_status = attempt.status.transition(AttemptEvent::Abandon)?;

    let updated = sqlx::query_as::<_, Attempt>(
        r#"
        UPDATE attempts
        SET status = ?
        WHERE id = ? AND status = 'in_progress'
        RETURNING id, quiz_id, student_id, started_at, completed_at, status,
                  score, percentage, is_passed, time_taken_seconds
        "#,
    )
    .bind(next_status)
    .bind(attempt.id)
    .fetch_optional(pool)
    .await?;

    match updated {
        Some(attempt) => Ok(attempt),
        None => fetch_attempt(pool, attempt.id).await,
    }
}

/// Applies a teacher's manual grade to an essay answer and refreshes
/// the attempt's aggregate score in the same transaction.
///
/// Permitted regardless of the attempt's status: manual grading reaches
/// into terminal attempts without reopening them.
pub async fn regrade_essay(
    pool: &SqlitePool,
    def: &QuizDefinition,
    attempt: &Attempt,
    answer: &AttemptAnswer,
    marks_obtained: f64,
    is_correct: bool,
    now: DateTime<Utc>,
) -> Result<Attempt, AppError> {
    let question = def.question(answer.question_id).ok_or(AppError::NotFound(
        "Question no longer exists on this quiz".to_string(),
    ))?;

    if question.question.question_type != QuestionType::Essay {
        return Err(AppError::InvalidQuestionType(
            "Only essay answers are graded manually".to_string(),
        ));
    }

    if marks_obtained < 0.0 || marks_obtained > question.question.marks {
        return Err(AppError::BadRequest(format!(
            "marks_obtained must be between 0 and {}",
            question.question.marks
        )));
    }

    let outcome = if is_correct {
        GradingOutcome::Correct
    } else {
        GradingOutcome::Incorrect
    };

    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        UPDATE attempt_answers
        SET outcome = ?, marks_obtained = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(outcome)
    .bind(marks_obtained)
    .bind(now)
    .bind(answer.id)
    .execute(&mut *tx)
    .await?;

    let answers = fetch_answers(&mut *tx, attempt.id).await?;
    let aggregate = score::aggregate(&answers, def.quiz.total_marks, def.quiz.pass_percentage);

    // Status is untouched: only the aggregate is refreshed.
    let updated = sqlx::query_as::<_, Attempt>(
        r#"
        UPDATE attempts
        SET score = ?, percentage = ?, is_passed = ?
        WHERE id = ?
        RETURNING id, quiz_id, student_id, started_at, completed_at, status,
                  score, percentage, is_passed, time_taken_seconds
        "#,
    )
    .bind(aggregate.score)
    .bind(aggregate.percentage)
    .bind(aggregate.is_passed)
    .bind(attempt.id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(updated)
}

/// Force-finalizes in-progress attempts whose time has run out.
///
/// Timeout detection is otherwise lazy, so an attempt nobody revisits
/// would stay open forever. Returns the number of attempts finalized.
pub async fn sweep_stale(
    pool: &SqlitePool,
    catalog: &dyn QuizCatalogReader,
    now: DateTime<Utc>,
) -> Result<u64, AppError> {
    let open = sqlx::query_as::<_, Attempt>(
        r#"
        SELECT id, quiz_id, student_id, started_at, completed_at, status,
               score, percentage, is_passed, time_taken_seconds
        FROM attempts
        WHERE status = 'in_progress'
        ORDER BY started_at
        LIMIT ?
        "#,
    )
    .bind(SWEEP_BATCH_LIMIT)
    .fetch_all(pool)
    .await?;

    let mut definitions: HashMap<i64, Option<QuizDefinition>> = HashMap::new();
    let mut swept = 0u64;

    for attempt in open {
        if !definitions.contains_key(&attempt.quiz_id) {
            let def = match catalog.get(attempt.quiz_id).await {
                Ok(def) => Some(def),
                // Quiz deleted underneath an open attempt: skip it,
                // keep sweeping the rest.
                Err(AppError::NotFound(_)) => None,
                Err(e) => return Err(e),
            };
            definitions.insert(attempt.quiz_id, def);
        }

        let Some(def) = definitions.get(&attempt.quiz_id).and_then(|d| d.as_ref()) else {
            continue;
        };

        if timeout::is_timed_out(&attempt, def.quiz.duration_seconds, now) {
            finalize_timed_out(pool, def, &attempt).await?;
            swept += 1;
        }
    }

    Ok(swept)
}

async fn upsert_answers(
    tx: &mut Transaction<'_, Sqlite>,
    def: &QuizDefinition,
    attempt_id: i64,
    answers: &[SubmittedAnswer],
    now: DateTime<Utc>,
) -> Result<usize, AppError> {
    let mut saved = 0;

    for submitted in answers {
        // Answers aimed at questions outside this quiz are ignored.
        let Some(question) = def.question(submitted.question_id) else {
            continue;
        };

        let answer_text = submitted.answer_text.as_deref().map(|text| {
            if question.question.question_type == QuestionType::Essay {
                clean_html(text)
            } else {
                text.to_string()
            }
        });

        let evaluation =
            evaluator::evaluate(question, submitted.selected_option_id, answer_text.as_deref());

        sqlx::query(
            r#"
            INSERT INTO attempt_answers
                (attempt_id, question_id, selected_option_id, answer_text,
                 outcome, marks_obtained, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(attempt_id, question_id) DO UPDATE SET
                selected_option_id = excluded.selected_option_id,
                answer_text = excluded.answer_text,
                outcome = excluded.outcome,
                marks_obtained = excluded.marks_obtained,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(attempt_id)
        .bind(submitted.question_id)
        .bind(submitted.selected_option_id)
        .bind(answer_text)
        .bind(evaluation.outcome)
        .bind(evaluation.marks_obtained)
        .bind(now)
        .execute(&mut **tx)
        .await?;

        saved += 1;
    }

    Ok(saved)
}
