// src/models/attempt.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::AppError;
use crate::models::answer::AnswerView;

/// Attempt lifecycle state. `InProgress` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum AttemptStatus {
    InProgress,
    Completed,
    TimedOut,
    Abandoned,
}

/// Lifecycle events that may move an attempt between states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptEvent {
    Submit,
    Timeout,
    Abandon,
}

impl AttemptStatus {
    pub fn is_terminal(self) -> bool {
        self != AttemptStatus::InProgress
    }

    /// Terminal states that consume one of the student's allowed
    /// attempts. Abandoned attempts deliberately do not count.
    pub fn counts_toward_limit(self) -> bool {
        matches!(self, AttemptStatus::Completed | AttemptStatus::TimedOut)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AttemptStatus::InProgress => "in_progress",
            AttemptStatus::Completed => "completed",
            AttemptStatus::TimedOut => "timed_out",
            AttemptStatus::Abandoned => "abandoned",
        }
    }

    /// Guarded transition table. Only `InProgress` may move; every
    /// other (state, event) pair is rejected, which makes a terminal
    /// state structurally final.
    pub fn transition(self, event: AttemptEvent) -> Result<AttemptStatus, AppError> {
        match (self, event) {
            (AttemptStatus::InProgress, AttemptEvent::Submit) => Ok(AttemptStatus::Completed),
            (AttemptStatus::InProgress, AttemptEvent::Timeout) => Ok(AttemptStatus::TimedOut),
            (AttemptStatus::InProgress, AttemptEvent::Abandon) => Ok(AttemptStatus::Abandoned),
            (current, _) => Err(AppError::AlreadyFinalized(format!(
                "Attempt is already {}",
                current.as_str()
            ))),
        }
    }
}

/// Represents the 'attempts' table in the database.
/// One student's single timed run at a quiz.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Attempt {
    pub id: i64,
    pub quiz_id: i64,
    pub student_id: i64,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub status: AttemptStatus,
    pub score: Option<f64>,
    pub percentage: Option<f64>,
    pub is_passed: Option<bool>,
    pub time_taken_seconds: Option<i64>,
}

/// DTO for returning an attempt, with a live countdown while the
/// attempt is still in progress.
#[derive(Debug, Serialize)]
pub struct AttemptResponse {
    #[serde(flatten)]
    pub attempt: Attempt,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_seconds: Option<i64>,
}

impl AttemptResponse {
    pub fn new(attempt: Attempt, remaining_seconds: Option<i64>) -> Self {
        AttemptResponse {
            attempt,
            remaining_seconds,
        }
    }
}

/// DTO for the single-attempt view, including saved answers.
#[derive(Debug, Serialize)]
pub struct AttemptDetailResponse {
    #[serde(flatten)]
    pub attempt: Attempt,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_seconds: Option<i64>,
    pub answers: Vec<AnswerView>,
}

/// Query parameters for listing attempts on a quiz.
#[derive(Debug, Deserialize)]
pub struct ListAttemptsParams {
    pub student_id: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_progress_transitions() {
        assert_eq!(
            AttemptStatus::InProgress
                .transition(AttemptEvent::Submit)
                .unwrap(),
            AttemptStatus::Completed
        );
        assert_eq!(
            AttemptStatus::InProgress
                .transition(AttemptEvent::Timeout)
                .unwrap(),
            AttemptStatus::TimedOut
        );
        assert_eq!(
            AttemptStatus::InProgress
                .transition(AttemptEvent::Abandon)
                .unwrap(),
            AttemptStatus::Abandoned
        );
    }

    #[test]
    fn test_terminal_states_reject_all_events() {
        for state in [
            AttemptStatus::Completed,
            AttemptStatus::TimedOut,
            AttemptStatus::Abandoned,
        ] {
            for event in [
                AttemptEvent::Submit,
                AttemptEvent::Timeout,
                AttemptEvent::Abandon,
            ] {
                assert!(state.transition(event).is_err());
            }
        }
    }

    #[test]
    fn test_limit_counting() {
        assert!(AttemptStatus::Completed.counts_toward_limit());
        assert!(AttemptStatus::TimedOut.counts_toward_limit());
        assert!(!AttemptStatus::Abandoned.counts_toward_limit());
        assert!(!AttemptStatus::InProgress.counts_toward_limit());
    }
}
