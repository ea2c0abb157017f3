// src/models/answer.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Grading outcome of a single answer.
///
/// Explicit tri-state: essays sit in `PendingManual` until a teacher
/// grades them, which is not the same thing as `Incorrect`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum GradingOutcome {
    Correct,
    Incorrect,
    PendingManual,
}

impl GradingOutcome {
    pub fn is_pending(self) -> bool {
        self == GradingOutcome::PendingManual
    }
}

/// Represents the 'attempt_answers' table in the database.
/// At most one row per (attempt_id, question_id); re-submissions
/// replace the prior row while the attempt is in progress.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AttemptAnswer {
    pub id: i64,
    pub attempt_id: i64,
    pub question_id: i64,
    pub selected_option_id: Option<i64>,
    pub answer_text: Option<String>,
    pub outcome: GradingOutcome,
    pub marks_obtained: f64,
    pub updated_at: DateTime<Utc>,
}

/// Per-answer view returned with an attempt. Grading fields are
/// withheld while the attempt is still in progress so students cannot
/// probe the answer key mid-attempt.
#[derive(Debug, Serialize)]
pub struct AnswerView {
    pub id: i64,
    pub question_id: i64,
    pub selected_option_id: Option<i64>,
    pub answer_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<GradingOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marks_obtained: Option<f64>,
}

impl AnswerView {
    pub fn from_answer(answer: AttemptAnswer, reveal_grading: bool) -> Self {
        AnswerView {
            id: answer.id,
            question_id: answer.question_id,
            selected_option_id: answer.selected_option_id,
            answer_text: answer.answer_text,
            outcome: reveal_grading.then_some(answer.outcome),
            marks_obtained: reveal_grading.then_some(answer.marks_obtained),
        }
    }
}

/// One answer as submitted by the student.
#[derive(Debug, Deserialize, Validate)]
pub struct SubmittedAnswer {
    pub question_id: i64,
    pub selected_option_id: Option<i64>,
    #[validate(length(max = 10000, message = "Answer text too long."))]
    pub answer_text: Option<String>,
}

/// DTO for saving progress or submitting an attempt.
#[derive(Debug, Deserialize, Validate)]
pub struct SubmitAttemptRequest {
    #[validate(nested)]
    pub answers: Vec<SubmittedAnswer>,
}

/// DTO for manually grading an essay answer.
/// The upper bound on `marks_obtained` is the question's marks and is
/// checked against the catalog at grading time.
#[derive(Debug, Deserialize, Validate)]
pub struct GradeEssayRequest {
    #[validate(range(min = 0.0, message = "marks_obtained cannot be negative."))]
    pub marks_obtained: f64,
    pub is_correct: bool,
}
