use sqlx::postgres::{PgPool, PgPoolOptions};

use super::models::*;
use crate::config::Config;
use crate::error::AppError;

/// Database repository for contact submissions.
#[derive(Debug, Clone)]
pub struct SubmissionRepository {
    pool: PgPool,
}

impl SubmissionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Persist a new submission. The store assigns the id and timestamps.
    pub async fn save(&self, params: NewSubmission) -> Result<ContactSubmission, AppError> {
        sqlx::query_as::<_, ContactSubmission>(
            r#"
            INSERT INTO contact_submissions
                (name, email, restaurant_name, phone, wants_trial, consent_given,
                 ip_address, user_agent)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(&params.name)
        .bind(&params.email)
        .bind(&params.restaurant_name)
        .bind(&params.phone)
        .bind(params.wants_trial)
        .bind(params.consent_given)
        .bind(&params.ip_address)
        .bind(&params.user_agent)
        .fetch_one(&self.pool)
        .await
        .map_err(Into::into)
    }

    /// All submissions for an email, newest first. Emails compare case-sensitively.
    pub async fn find_by_email(&self, email: &str) -> Result<Vec<ContactSubmission>, AppError> {
        sqlx::query_as::<_, ContactSubmission>(
            r#"
            SELECT * FROM contact_submissions
             WHERE email = $1
             ORDER BY submitted_at DESC
            "#,
        )
        .bind(email)
        .fetch_all(&self.pool)
        .await
        .map_err(Into::into)
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<ContactSubmission>, AppError> {
        sqlx::query_as::<_, ContactSubmission>(
            r#"
            SELECT * FROM contact_submissions
             WHERE id = $1
             LIMIT 1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Into::into)
    }

    /// Most recent submission with the given normalized phone, if any.
    pub async fn find_latest_by_phone(
        &self,
        phone: &str,
    ) -> Result<Option<ContactSubmission>, AppError> {
        sqlx::query_as::<_, ContactSubmission>(
            r#"
            SELECT * FROM contact_submissions
             WHERE phone = $1
             ORDER BY submitted_at DESC
             LIMIT 1
            "#,
        )
        .bind(phone)
        .fetch_optional(&self.pool)
        .await
        .map_err(Into::into)
    }

    /// One page of submissions, newest first, plus the total row count.
    ///
    /// The count runs as a separate statement and is not snapshot-consistent
    /// with the page.
    pub async fn find_all(
        &self,
        page: i64,
        limit: i64,
    ) -> Result<(Vec<ContactSubmission>, i64), AppError> {
        let offset = (page - 1).saturating_mul(limit);

        let rows = sqlx::query_as::<_, ContactSubmission>(
            r#"
            SELECT * FROM contact_submissions
             ORDER BY submitted_at DESC
             LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM contact_submissions")
            .fetch_one(&self.pool)
            .await?;

        Ok((rows, total))
    }

    /// Update status (and notes) for a submission, returning the updated row.
    pub async fn update_status(
        &self,
        id: i64,
        status: LeadStatus,
        notes: Option<&str>,
    ) -> Result<Option<ContactSubmission>, AppError> {
        sqlx::query_as::<_, ContactSubmission>(
            r#"
            UPDATE contact_submissions
               SET status = $2,
                   notes = $3,
                   updated_at = NOW()
             WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(notes)
        .fetch_optional(&self.pool)
        .await
        .map_err(Into::into)
    }

    /// Flag a submission for GDPR deletion; the retention sweep removes it.
    pub async fn request_deletion(
        &self,
        id: i64,
    ) -> Result<Option<ContactSubmission>, AppError> {
        sqlx::query_as::<_, ContactSubmission>(
            r#"
            UPDATE contact_submissions
               SET deletion_requested = TRUE,
                   updated_at = NOW()
             WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Into::into)
    }

    /// Rows past their retention date or flagged for deletion.
    pub async fn expired_submissions(&self) -> Result<Vec<ContactSubmission>, AppError> {
        sqlx::query_as::<_, ContactSubmission>(
            r#"
            SELECT * FROM contact_submissions
             WHERE data_retention_date < NOW()
                OR deletion_requested
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(Into::into)
    }

    /// Permanently delete a submission (GDPR erasure).
    pub async fn delete_by_id(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM contact_submissions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Per-day submission totals, trial requests, and conversions over the
    /// trailing window.
    pub async fn analytics(&self, days: i32) -> Result<Vec<AnalyticsRow>, AppError> {
        sqlx::query_as::<_, AnalyticsRow>(
            r#"
            SELECT DATE(submitted_at) AS date,
                   COUNT(*) AS total_submissions,
                   COUNT(*) FILTER (WHERE wants_trial) AS trial_requests,
                   COUNT(*) FILTER (WHERE status = 'converted') AS conversions
              FROM contact_submissions
             WHERE submitted_at >= CURRENT_DATE - make_interval(days => $1)
             GROUP BY DATE(submitted_at)
             ORDER BY date DESC
            "#,
        )
        .bind(days)
        .fetch_all(&self.pool)
        .await
        .map_err(Into::into)
    }
}

/// Database repository for demo call tracking.
#[derive(Debug, Clone)]
pub struct DemoCallRepository {
    pool: PgPool,
}

impl DemoCallRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn save(&self, params: NewDemoCall) -> Result<DemoCall, AppError> {
        sqlx::query_as::<_, DemoCall>(
            r#"
            INSERT INTO demo_calls
                (contact_submission_id, phone, call_timestamp, duration_seconds,
                 outcome, notes)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(params.contact_submission_id)
        .bind(&params.phone)
        .bind(params.call_timestamp)
        .bind(params.duration_seconds)
        .bind(params.outcome)
        .bind(&params.notes)
        .fetch_one(&self.pool)
        .await
        .map_err(Into::into)
    }
}

/// Combined database context with all repositories.
#[derive(Debug, Clone)]
pub struct Database {
    pub submissions: SubmissionRepository,
    pub demo_calls: DemoCallRepository,
    pool: PgPool,
}

impl Database {
    pub fn new(pool: PgPool) -> Self {
        Self {
            submissions: SubmissionRepository::new(pool.clone()),
            demo_calls: DemoCallRepository::new(pool.clone()),
            pool,
        }
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check database health by executing a simple query.
    pub async fn health_check(&self) -> bool {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .is_ok()
    }
}

/// Create database connection pool with configuration.
///
/// The pool caps concurrent connections and rejects on acquire timeout
/// rather than queuing indefinitely.
pub async fn create_pool(config: &Config) -> Result<PgPool, AppError> {
    PgPoolOptions::new()
        .min_connections(config.db_pool_min)
        .max_connections(config.db_pool_max)
        .acquire_timeout(config.db_connect_timeout())
        .connect(&config.database_url())
        .await
        .map_err(Into::into)
}
