// src/engine/timeout.rs

use chrono::{DateTime, Duration, Utc};

use crate::models::attempt::{Attempt, AttemptStatus};

/// Pure time arithmetic for attempts. No background timer exists;
/// timeout is observed lazily whenever an attempt is read or submitted.

pub fn elapsed_seconds(started_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - started_at).num_seconds().max(0)
}

pub fn remaining_seconds(
    started_at: DateTime<Utc>,
    duration_seconds: i64,
    now: DateTime<Utc>,
) -> i64 {
    (duration_seconds - elapsed_seconds(started_at, now)).max(0)
}

/// The instant the attempt's allotted time runs out.
pub fn deadline(started_at: DateTime<Utc>, duration_seconds: i64) -> DateTime<Utc> {
    started_at + Duration::seconds(duration_seconds)
}

/// Only an in-progress attempt can be timed out; terminal attempts
/// keep whatever state they finalized with.
pub fn is_timed_out(attempt: &Attempt, duration_seconds: i64, now: DateTime<Utc>) -> bool {
    attempt.status == AttemptStatus::InProgress
        && remaining_seconds(attempt.started_at, duration_seconds, now) == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn attempt_started_at(started_at: DateTime<Utc>, status: AttemptStatus) -> Attempt {
        Attempt {
            id: 1,
            quiz_id: 1,
            student_id: 1,
            started_at,
            completed_at: None,
            status,
            score: None,
            percentage: None,
            is_passed: None,
            time_taken_seconds: None,
        }
    }

    #[test]
    fn test_remaining_counts_down() {
        let start = Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 10, 10, 0).unwrap();

        assert_eq!(elapsed_seconds(start, now), 600);
        assert_eq!(remaining_seconds(start, 1800, now), 1200);
    }

    #[test]
    fn test_remaining_floors_at_zero() {
        let start = Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 11, 0, 0).unwrap();

        assert_eq!(remaining_seconds(start, 1800, now), 0);
    }

    #[test]
    fn test_timed_out_only_while_in_progress() {
        let start = Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2025, 6, 1, 11, 0, 0).unwrap();

        let in_progress = attempt_started_at(start, AttemptStatus::InProgress);
        assert!(is_timed_out(&in_progress, 1800, late));

        let completed = attempt_started_at(start, AttemptStatus::Completed);
        assert!(!is_timed_out(&completed, 1800, late));
    }

    #[test]
    fn test_not_timed_out_before_deadline() {
        let start = Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 10, 29, 59).unwrap();

        let attempt = attempt_started_at(start, AttemptStatus::InProgress);
        assert!(!is_timed_out(&attempt, 1800, now));
    }

    #[test]
    fn test_deadline() {
        let start = Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap();
        let expected = Utc.with_ymd_and_hms(2025, 6, 1, 10, 30, 0).unwrap();

        assert_eq!(deadline(start, 1800), expected);
    }
}
