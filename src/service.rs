//! Lead intake orchestration.
//!
//! `IntakeService` owns the request-level flow: validate, duplicate-check,
//! normalize, persist, then fire notifications. Dependencies (store,
//! notifier) are injected at construction; there is no global state.

use chrono::{Duration, Utc};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::db::Database;
use crate::db::models::{
    AnalyticsRow, ContactSubmission, DemoCall, LeadStatus, NewDemoCall, NewSubmission, Pagination,
};
use crate::dedup;
use crate::email::EmailService;
use crate::error::{AppError, AppResult};
use crate::validation::{normalize_phone, validate_contact, validate_demo_call};

/// Listing page size cap.
const MAX_PAGE_LIMIT: i64 = 100;

/// Lead intake service with injected store and notifier.
#[derive(Debug, Clone)]
pub struct IntakeService {
    db: Database,
    notifier: Option<EmailService>,
    duplicate_window: Duration,
}

impl IntakeService {
    pub fn new(db: Database, notifier: Option<EmailService>, duplicate_window_secs: i64) -> Self {
        Self {
            db,
            notifier,
            duplicate_window: Duration::seconds(duplicate_window_secs),
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn notifier(&self) -> Option<&EmailService> {
        self.notifier.as_ref()
    }

    /// Process a contact-form submission.
    ///
    /// Terminal on the first of: validation failure, duplicate rejection,
    /// store failure, or success. On success exactly one row is persisted
    /// and both notification emails are dispatched from a detached task —
    /// this method returns as soon as persistence succeeds and never waits
    /// on (or reports) delivery.
    pub async fn submit_contact(
        &self,
        body: &Value,
        ip_address: Option<String>,
        user_agent: Option<String>,
    ) -> AppResult<ContactSubmission> {
        let data = validate_contact(body).map_err(AppError::Validation)?;

        // Read-then-decide: no transaction guards the gap between this check
        // and the insert below.
        let prior = self.db.submissions.find_by_email(&data.email).await?;
        let latest = prior.first().map(|s| s.submitted_at);
        if dedup::is_recent_duplicate(latest, Utc::now(), self.duplicate_window) {
            debug!(email = %data.email, "Duplicate submission rejected");
            return Err(AppError::Duplicate);
        }

        let saved = self
            .db
            .submissions
            .save(NewSubmission {
                name: data.name,
                email: data.email,
                restaurant_name: data.restaurant,
                phone: normalize_phone(&data.phone),
                wants_trial: data.trial,
                consent_given: data.consent_given,
                ip_address,
                user_agent,
            })
            .await?;

        info!(id = saved.id, "Contact submission saved");
        self.dispatch_notifications(&saved);

        Ok(saved)
    }

    /// Fire both notification emails without awaiting them. Outcomes are
    /// observed only via logging inside the send path.
    fn dispatch_notifications(&self, submission: &ContactSubmission) {
        let Some(notifier) = self.notifier.clone() else {
            debug!(id = submission.id, "Email not configured, skipping notifications");
            return;
        };
        let submission = submission.clone();
        tokio::spawn(async move {
            notifier.send_lead_emails(&submission).await;
        });
    }

    /// Record a demo call, linking the latest submission with the same
    /// normalized phone when one exists.
    pub async fn record_demo_call(&self, body: &Value) -> AppResult<DemoCall> {
        let data = validate_demo_call(body).map_err(AppError::Validation)?;
        let phone = normalize_phone(&data.phone);

        let linked = self
            .db
            .submissions
            .find_latest_by_phone(&phone)
            .await?
            .map(|s| s.id);

        let call = self
            .db
            .demo_calls
            .save(NewDemoCall {
                contact_submission_id: linked,
                phone,
                call_timestamp: data.timestamp,
                duration_seconds: data.duration,
                outcome: data.outcome,
                notes: None,
            })
            .await?;

        info!(id = call.id, linked = ?call.contact_submission_id, "Demo call recorded");
        Ok(call)
    }

    pub async fn get(&self, id: i64) -> AppResult<ContactSubmission> {
        self.db
            .submissions
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Submission not found: {id}")))
    }

    /// Paginated listing, newest first.
    pub async fn list(&self, page: i64, limit: i64) -> AppResult<(Vec<ContactSubmission>, Pagination)> {
        let page = page.max(1);
        let limit = limit.clamp(1, MAX_PAGE_LIMIT);

        let (rows, total) = self.db.submissions.find_all(page, limit).await?;
        Ok((rows, Pagination::compute(page, limit, total)))
    }

    /// Update a submission's status. The status string must be one of the
    /// four enum values.
    pub async fn update_status(
        &self,
        id: i64,
        status: &str,
        notes: Option<&str>,
    ) -> AppResult<ContactSubmission> {
        let status: LeadStatus = status.parse().map_err(|_| AppError::InvalidStatus)?;

        self.db
            .submissions
            .update_status(id, status, notes)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Submission not found: {id}")))
    }

    /// Flag a submission for deletion; the retention sweep removes it later.
    pub async fn request_deletion(&self, id: i64) -> AppResult<ContactSubmission> {
        self.db
            .submissions
            .request_deletion(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Submission not found: {id}")))
    }

    /// Permanently erase a submission (GDPR right to erasure).
    pub async fn erase(&self, id: i64) -> AppResult<()> {
        if self.db.submissions.delete_by_id(id).await? {
            info!(id, "Submission erased");
            Ok(())
        } else {
            Err(AppError::NotFound(format!("Submission not found: {id}")))
        }
    }

    pub async fn analytics(&self, days: i32) -> AppResult<Vec<AnalyticsRow>> {
        self.db.submissions.analytics(days).await
    }

    /// Delete all rows past their retention date or flagged for deletion.
    /// Returns the number of rows removed.
    pub async fn sweep_expired(&self) -> AppResult<u64> {
        let expired = self.db.submissions.expired_submissions().await?;
        let mut removed = 0u64;

        for submission in expired {
            if self.db.submissions.delete_by_id(submission.id).await? {
                removed += 1;
            } else {
                warn!(id = submission.id, "Expired submission vanished before delete");
            }
        }

        info!(removed, "Retention sweep complete");
        Ok(removed)
    }
}
