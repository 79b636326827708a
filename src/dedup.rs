//! Time-windowed duplicate-submission check.
//!
//! A candidate is a duplicate when the most recent stored submission for the
//! same email (case-sensitive match) falls within the trailing window of
//! "now". The check is read-then-decide with no transactional guarantee:
//! two concurrent submissions for the same email can both pass. That race is
//! an accepted best-effort tradeoff, not a uniqueness constraint.

use chrono::{DateTime, Duration, Utc};

/// Trailing window in which a repeat submission from the same email is rejected.
pub const DUPLICATE_WINDOW_SECS: i64 = 3600;

/// Whether `latest` (the newest prior submission time, if any) makes a
/// submission at `now` a duplicate under the given window.
pub fn is_recent_duplicate(
    latest: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    window: Duration,
) -> bool {
    match latest {
        Some(submitted_at) => now - submitted_at < window,
        None => false,
    }
}

/// Convenience wrapper using the default 1-hour window.
pub fn is_duplicate(latest: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    is_recent_duplicate(latest, now, Duration::seconds(DUPLICATE_WINDOW_SECS))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        "2025-06-01T12:00:00Z".parse().expect("valid timestamp")
    }

    #[test]
    fn no_prior_submission_is_not_duplicate() {
        assert!(!is_duplicate(None, now()));
    }

    #[test]
    fn submission_within_window_is_duplicate() {
        let prior = now() - Duration::minutes(59);
        assert!(is_duplicate(Some(prior), now()));
    }

    #[test]
    fn submission_moments_ago_is_duplicate() {
        let prior = now() - Duration::seconds(1);
        assert!(is_duplicate(Some(prior), now()));
    }

    #[test]
    fn submission_past_window_is_allowed() {
        let prior = now() - Duration::minutes(61);
        assert!(!is_duplicate(Some(prior), now()));
    }

    #[test]
    fn exact_window_boundary_is_allowed() {
        let prior = now() - Duration::seconds(DUPLICATE_WINDOW_SECS);
        assert!(!is_duplicate(Some(prior), now()));
    }

    #[test]
    fn custom_window_respected() {
        let prior = now() - Duration::minutes(10);
        assert!(!is_recent_duplicate(
            Some(prior),
            now(),
            Duration::minutes(5)
        ));
        assert!(is_recent_duplicate(
            Some(prior),
            now(),
            Duration::minutes(15)
        ));
    }
}
