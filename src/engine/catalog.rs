// src/engine/catalog.rs

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::{
    error::AppError,
    models::quiz::{Question, QuestionOption, QuestionWithOptions, Quiz, QuizDefinition},
};

/// Read-only access to quiz definitions.
///
/// The catalog is authored and owned by the main tutoring-center
/// application; the attempt engine only ever reads from it.
#[async_trait]
pub trait QuizCatalogReader: Send + Sync {
    async fn get(&self, quiz_id: i64) -> Result<QuizDefinition, AppError>;
}

/// Catalog reader backed by the shared application database.
pub struct SqlxCatalog {
    pool: SqlitePool,
}

impl SqlxCatalog {
    pub fn new(pool: SqlitePool) -> Self {
        SqlxCatalog { pool }
    }
}

#[async_trait]
impl QuizCatalogReader for SqlxCatalog {
    async fn get(&self, quiz_id: i64) -> Result<QuizDefinition, AppError> {
        let quiz = sqlx::query_as::<_, Quiz>(
            r#"
            SELECT id, title, description, duration_seconds, total_marks,
                   pass_percentage, max_attempts, available_from, available_until,
                   is_published, shuffle_questions, shuffle_answers, created_at
            FROM quizzes
            WHERE id = ?
            "#,
        )
        .bind(quiz_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch quiz {}: {:?}", quiz_id, e);
            AppError::InternalServerError(e.to_string())
        })?
        .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

        let questions = sqlx::query_as::<_, Question>(
            r#"
            SELECT id, quiz_id, question_type, content, marks, position
            FROM questions
            WHERE quiz_id = ?
            ORDER BY position, id
            "#,
        )
        .bind(quiz_id)
        .fetch_all(&self.pool)
        .await?;

        let options = sqlx::query_as::<_, QuestionOption>(
            r#"
            SELECT o.id, o.question_id, o.content, o.is_correct, o.position
            FROM question_options o
            JOIN questions q ON o.question_id = q.id
            WHERE q.quiz_id = ?
            ORDER BY o.position, o.id
            "#,
        )
        .bind(quiz_id)
        .fetch_all(&self.pool)
        .await?;

        let questions = questions
            .into_iter()
            .map(|question| {
                let options = options
                    .iter()
                    .filter(|o| o.question_id == question.id)
                    .cloned()
                    .collect();
                QuestionWithOptions { question, options }
            })
            .collect();

        Ok(QuizDefinition { quiz, questions })
    }
}
