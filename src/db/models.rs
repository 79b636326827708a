use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Lead status enum matching the PostgreSQL enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "lead_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum LeadStatus {
    New,
    Contacted,
    Converted,
    Rejected,
}

impl Default for LeadStatus {
    fn default() -> Self {
        LeadStatus::New
    }
}

impl std::fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LeadStatus::New => write!(f, "new"),
            LeadStatus::Contacted => write!(f, "contacted"),
            LeadStatus::Converted => write!(f, "converted"),
            LeadStatus::Rejected => write!(f, "rejected"),
        }
    }
}

impl FromStr for LeadStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(LeadStatus::New),
            "contacted" => Ok(LeadStatus::Contacted),
            "converted" => Ok(LeadStatus::Converted),
            "rejected" => Ok(LeadStatus::Rejected),
            _ => Err(format!("Unknown status: {s}")),
        }
    }
}

/// Demo call outcome matching the PostgreSQL enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "call_outcome", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CallOutcome {
    Interested,
    NotInterested,
    CallbackRequested,
}

impl FromStr for CallOutcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "interested" => Ok(CallOutcome::Interested),
            "not_interested" => Ok(CallOutcome::NotInterested),
            "callback_requested" => Ok(CallOutcome::CallbackRequested),
            _ => Err(format!("Unknown outcome: {s}")),
        }
    }
}

/// A persisted contact-form submission.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ContactSubmission {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub restaurant_name: String,
    pub phone: String,
    pub wants_trial: bool,
    pub status: LeadStatus,
    pub notes: Option<String>,
    pub lead_source: String,
    pub consent_given: bool,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deletion_requested: bool,
    pub data_retention_date: DateTime<Utc>,
}

/// Parameters for creating a new submission. The store assigns the id.
#[derive(Debug, Clone)]
pub struct NewSubmission {
    pub name: String,
    pub email: String,
    pub restaurant_name: String,
    /// Always the normalized international form.
    pub phone: String,
    pub wants_trial: bool,
    pub consent_given: bool,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// A recorded demo call, optionally linked to a submission.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DemoCall {
    pub id: i64,
    pub contact_submission_id: Option<i64>,
    pub phone: String,
    pub call_timestamp: DateTime<Utc>,
    pub duration_seconds: Option<i32>,
    pub outcome: Option<CallOutcome>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Parameters for recording a demo call.
#[derive(Debug, Clone)]
pub struct NewDemoCall {
    pub contact_submission_id: Option<i64>,
    pub phone: String,
    pub call_timestamp: DateTime<Utc>,
    pub duration_seconds: Option<i32>,
    pub outcome: Option<CallOutcome>,
    pub notes: Option<String>,
}

/// One row of the grouped analytics query.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AnalyticsRow {
    pub date: NaiveDate,
    pub total_submissions: i64,
    pub trial_requests: i64,
    pub conversions: i64,
}

/// Pagination metadata for listings.
///
/// Computed from a separate count query, so it is not guaranteed
/// snapshot-consistent with the returned rows.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total_count: i64,
    pub total_pages: i64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

impl Pagination {
    /// Saturating arithmetic throughout: `page` comes straight from the query
    /// string, so extreme values must not overflow.
    pub fn compute(page: i64, limit: i64, total_count: i64) -> Self {
        let total_pages = if limit > 0 {
            total_count.saturating_add(limit - 1) / limit
        } else {
            0
        };
        Self {
            page,
            limit,
            total_count,
            total_pages,
            has_next_page: page.saturating_mul(limit) < total_count,
            has_prev_page: page > 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_known_values() {
        for s in ["new", "contacted", "converted", "rejected"] {
            let status: LeadStatus = s.parse().expect("known status");
            assert_eq!(status.to_string(), s);
        }
    }

    #[test]
    fn status_rejects_unknown_values() {
        assert!("archived".parse::<LeadStatus>().is_err());
        assert!("New".parse::<LeadStatus>().is_err());
        assert!("".parse::<LeadStatus>().is_err());
    }

    #[test]
    fn outcome_parses_snake_case() {
        assert_eq!(
            "not_interested".parse::<CallOutcome>(),
            Ok(CallOutcome::NotInterested)
        );
        assert!("undecided".parse::<CallOutcome>().is_err());
    }

    #[test]
    fn pagination_math() {
        let p = Pagination::compute(1, 50, 120);
        assert_eq!(p.total_pages, 3);
        assert!(p.has_next_page);
        assert!(!p.has_prev_page);

        let p = Pagination::compute(3, 50, 120);
        assert!(!p.has_next_page);
        assert!(p.has_prev_page);

        let p = Pagination::compute(1, 50, 0);
        assert_eq!(p.total_pages, 0);
        assert!(!p.has_next_page);
    }

    #[test]
    fn pagination_survives_extreme_page_values() {
        let p = Pagination::compute(i64::MAX, 50, 10);
        assert!(!p.has_next_page);
        assert!(p.has_prev_page);

        let p = Pagination::compute(i64::MAX, i64::MAX, i64::MAX);
        assert!(!p.has_next_page);
        assert_eq!(p.total_pages, 1);
    }
}
