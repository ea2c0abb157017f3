// src/models/quiz.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Question type. Objective types are auto-graded; essays wait for a
/// teacher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum QuestionType {
    MultipleChoice,
    TrueFalse,
    ShortAnswer,
    Essay,
}

impl QuestionType {
    pub fn is_objective(&self) -> bool {
        !matches!(self, QuestionType::Essay)
    }
}

/// Represents the 'quizzes' table in the database.
///
/// Definitions are authored in the main application; this service
/// treats them as a read-only catalog.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Quiz {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub duration_seconds: i64,
    pub total_marks: f64,
    pub pass_percentage: f64,
    pub max_attempts: i64,
    pub available_from: Option<DateTime<Utc>>,
    pub available_until: Option<DateTime<Utc>>,
    pub is_published: bool,
    pub shuffle_questions: bool,
    pub shuffle_answers: bool,
    pub created_at: Option<DateTime<Utc>>,
}

impl Quiz {
    /// A quiz can be started when it is published and `now` falls
    /// inside its (optional) availability window.
    pub fn is_available_at(&self, now: DateTime<Utc>) -> bool {
        if !self.is_published {
            return false;
        }
        if self.available_from.is_some_and(|from| now < from) {
            return false;
        }
        if self.available_until.is_some_and(|until| now > until) {
            return false;
        }
        true
    }
}

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub quiz_id: i64,
    pub question_type: QuestionType,
    pub content: String,
    pub marks: f64,
    pub position: i64,
}

/// Represents the 'question_options' table in the database.
/// For short_answer questions the `is_correct` rows are the accepted
/// answer texts; essay questions have no options at all.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct QuestionOption {
    pub id: i64,
    pub question_id: i64,
    pub content: String,
    pub is_correct: bool,
    pub position: i64,
}

/// One question together with its options, in authored order.
#[derive(Debug, Clone)]
pub struct QuestionWithOptions {
    pub question: Question,
    pub options: Vec<QuestionOption>,
}

/// Immutable-during-attempt snapshot of a quiz and its question set.
#[derive(Debug, Clone)]
pub struct QuizDefinition {
    pub quiz: Quiz,
    pub questions: Vec<QuestionWithOptions>,
}

impl QuizDefinition {
    pub fn question(&self, question_id: i64) -> Option<&QuestionWithOptions> {
        self.questions.iter().find(|q| q.question.id == question_id)
    }
}

/// DTO for sending quiz metadata to students (no question set, no keys).
#[derive(Debug, Serialize)]
pub struct PublicQuiz {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub duration_seconds: i64,
    pub total_marks: f64,
    pub pass_percentage: f64,
    pub max_attempts: i64,
    pub available_from: Option<DateTime<Utc>>,
    pub available_until: Option<DateTime<Utc>>,
}

impl From<Quiz> for PublicQuiz {
    fn from(quiz: Quiz) -> Self {
        PublicQuiz {
            id: quiz.id,
            title: quiz.title,
            description: quiz.description,
            duration_seconds: quiz.duration_seconds,
            total_marks: quiz.total_marks,
            pass_percentage: quiz.pass_percentage,
            max_attempts: quiz.max_attempts,
            available_from: quiz.available_from,
            available_until: quiz.available_until,
        }
    }
}

/// DTO for presenting a question to a student mid-attempt
/// (excludes the answer key).
#[derive(Debug, Serialize)]
pub struct PublicQuestion {
    pub id: i64,
    pub question_type: QuestionType,
    pub content: String,
    pub marks: f64,
    pub options: Vec<PublicOption>,
}

#[derive(Debug, Serialize)]
pub struct PublicOption {
    pub id: i64,
    pub content: String,
}
