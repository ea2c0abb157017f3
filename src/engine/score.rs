// src/engine/score.rs

use crate::models::answer::AttemptAnswer;

/// Aggregate result over all answers of an attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aggregate {
    pub score: f64,
    pub percentage: f64,
    pub is_passed: bool,
}

/// Sums marks over the attempt's answers and derives percentage and
/// pass verdict from the quiz totals.
///
/// Pending essay answers contribute their current `marks_obtained`
/// (zero until manually graded), so the same function serves the
/// initial finalization and every later regrade.
pub fn aggregate(answers: &[AttemptAnswer], total_marks: f64, pass_percentage: f64) -> Aggregate {
    let score: f64 = answers.iter().map(|a| a.marks_obtained).sum();

    let percentage = if total_marks > 0.0 {
        // Clamp after rounding: floating-point summation may overshoot
        // 100 by a ulp or two.
        round2(score / total_marks * 100.0).clamp(0.0, 100.0)
    } else {
        0.0
    };

    Aggregate {
        score,
        percentage,
        is_passed: percentage >= pass_percentage,
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
