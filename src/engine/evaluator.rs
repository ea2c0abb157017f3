// src/engine/evaluator.rs

use crate::models::{
    answer::GradingOutcome,
    quiz::{QuestionType, QuestionWithOptions},
};

/// Result of grading one answer against one question.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub outcome: GradingOutcome,
    pub marks_obtained: f64,
}

/// Grades one submitted answer. Deterministic and side-effect-free:
/// the same (question, answer) pair always evaluates the same way.
///
/// * multiple_choice / true_false: correct iff the selected option id
///   is one of the question's options flagged correct.
/// * short_answer: correct iff the trimmed, case-folded text equals
///   any accepted answer text.
/// * essay: pending manual grade, zero marks until a teacher grades it.
pub fn evaluate(
    question: &QuestionWithOptions,
    selected_option_id: Option<i64>,
    answer_text: Option<&str>,
) -> Evaluation {
    let marks = question.question.marks;

    match question.question.question_type {
        QuestionType::MultipleChoice | QuestionType::TrueFalse => {
            let correct = selected_option_id.is_some_and(|selected| {
                question
                    .options
                    .iter()
                    .any(|o| o.is_correct && o.id == selected)
            });
            graded(correct, marks)
        }
        QuestionType::ShortAnswer => {
            let correct = answer_text.is_some_and(|text| {
                let submitted = normalize(text);
                question
                    .options
                    .iter()
                    .any(|o| o.is_correct && normalize(&o.content) == submitted)
            });
            graded(correct, marks)
        }
        QuestionType::Essay => Evaluation {
            outcome: GradingOutcome::PendingManual,
            marks_obtained: 0.0,
        },
    }
}

fn graded(correct: bool, marks: f64) -> Evaluation {
    if correct {
        Evaluation {
            outcome: GradingOutcome::Correct,
            marks_obtained: marks,
        }
    } else {
        Evaluation {
            outcome: GradingOutcome::Incorrect,
            marks_obtained: 0.0,
        }
    }
}

fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::quiz::{Question, QuestionOption};

    fn question(question_type: QuestionType, marks: f64, options: Vec<(i64, &str, bool)>) -> QuestionWithOptions {
        QuestionWithOptions {
            question: Question {
                id: 1,
                quiz_id: 1,
                question_type,
                content: "q".to_string(),
                marks,
                position: 0,
            },
            options: options
                .into_iter()
                .map(|(id, content, is_correct)| QuestionOption {
                    id,
                    question_id: 1,
                    content: content.to_string(),
                    is_correct,
                    position: 0,
                })
                .collect(),
        }
    }

    #[test]
    fn test_multiple_choice_correct_option() {
        let q = question(
            QuestionType::MultipleChoice,
            5.0,
            vec![(10, "A", false), (11, "B", true)],
        );

        let eval = evaluate(&q, Some(11), None);
        assert_eq!(eval.outcome, GradingOutcome::Correct);
        assert_eq!(eval.marks_obtained, 5.0);

        let eval = evaluate(&q, Some(10), None);
        assert_eq!(eval.outcome, GradingOutcome::Incorrect);
        assert_eq!(eval.marks_obtained, 0.0);
    }

    #[test]
    fn test_multiple_choice_unknown_or_missing_option() {
        let q = question(QuestionType::MultipleChoice, 5.0, vec![(10, "A", true)]);

        // An option id from some other question never matches.
        assert_eq!(evaluate(&q, Some(999), None).outcome, GradingOutcome::Incorrect);
        assert_eq!(evaluate(&q, None, None).outcome, GradingOutcome::Incorrect);
    }

    #[test]
    fn test_true_false() {
        let q = question(
            QuestionType::TrueFalse,
            2.0,
            vec![(20, "True", true), (21, "False", false)],
        );

        assert_eq!(evaluate(&q, Some(20), None).outcome, GradingOutcome::Correct);
        assert_eq!(evaluate(&q, Some(21), None).outcome, GradingOutcome::Incorrect);
    }

    #[test]
    fn test_short_answer_case_folded_and_trimmed() {
        let q = question(QuestionType::ShortAnswer, 3.0, vec![(30, "Photosynthesis", true)]);

        assert_eq!(
            evaluate(&q, None, Some("  photosynthesis ")).outcome,
            GradingOutcome::Correct
        );
        assert_eq!(
            evaluate(&q, None, Some("PHOTOSYNTHESIS")).outcome,
            GradingOutcome::Correct
        );
        assert_eq!(
            evaluate(&q, None, Some("photo synthesis")).outcome,
            GradingOutcome::Incorrect
        );
        assert_eq!(evaluate(&q, None, None).outcome, GradingOutcome::Incorrect);
    }

    #[test]
    fn test_essay_is_pending_with_zero_marks() {
        let q = question(QuestionType::Essay, 10.0, vec![]);

        let eval = evaluate(&q, None, Some("my essay"));
        assert_eq!(eval.outcome, GradingOutcome::PendingManual);
        assert_eq!(eval.marks_obtained, 0.0);
    }

    #[test]
    fn test_grading_is_idempotent() {
        let q = question(
            QuestionType::MultipleChoice,
            5.0,
            vec![(10, "A", true), (11, "B", false)],
        );

        let first = evaluate(&q, Some(10), None);
        let second = evaluate(&q, Some(10), None);
        assert_eq!(first, second);
    }
}
