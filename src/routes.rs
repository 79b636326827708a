//! HTTP surface: contact intake, demo calls, CRUD/analytics, health checks.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use http::{HeaderMap, StatusCode, header::USER_AGENT};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::{AppError, AppResult};
use crate::middleware::{ClientIp, RateLimiter};
use crate::service::IntakeService;

/// Build version (injected at compile time).
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Success copy shown by the contact-form widget.
const CONTACT_RECEIVED_MSG: &str =
    "Thank you for your interest! We'll be in touch within 24 hours.";
const DEMO_CALL_RECORDED_MSG: &str = "Demo call data recorded successfully";

/// Shared application state, cloned per request.
#[derive(Clone)]
pub struct AppState {
    pub intake: IntakeService,
    pub contact_limiter: Arc<RateLimiter>,
    pub demo_call_limiter: Arc<RateLimiter>,
}

/// API routes (health checks included; `/metrics` is wired in `main`).
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(liveness))
        .route("/api/health", get(readiness))
        .route("/api/contact", post(submit_contact).get(list_contacts))
        .route("/api/contact/demo-call", post(record_demo_call))
        .route("/api/contact/analytics", get(analytics))
        .route(
            "/api/contact/{id}",
            get(get_contact).delete(erase_contact),
        )
        .route("/api/contact/{id}/status", put(update_status))
        .route(
            "/api/contact/{id}/deletion-request",
            post(request_deletion),
        )
        .with_state(state)
}

async fn root() -> Json<Value> {
    Json(json!({
        "message": "Lead intake API",
        "version": VERSION,
        "status": "running",
        "endpoints": {
            "contact": "/api/contact",
            "health": "/health",
            "apiHealth": "/api/health"
        }
    }))
}

async fn liveness() -> Json<Value> {
    Json(json!({ "status": "healthy", "version": VERSION }))
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    services: HealthChecks,
}

#[derive(Serialize)]
struct HealthChecks {
    database: &'static str,
    email: &'static str,
}

/// Readiness: verifies the store and (when configured) the mail transport.
async fn readiness(State(state): State<AppState>) -> Response {
    let db_ok = state.intake.database().health_check().await;

    let email = match state.intake.notifier() {
        Some(notifier) => {
            if notifier.test_connection().await.is_ok() {
                "connected"
            } else {
                "disconnected"
            }
        }
        None => "not_configured",
    };

    let body = HealthResponse {
        status: if db_ok { "healthy" } else { "unhealthy" },
        version: VERSION,
        services: HealthChecks {
            database: if db_ok { "connected" } else { "disconnected" },
            email,
        },
    };

    let status = if db_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body)).into_response()
}

/// POST /api/contact — submit a lead.
async fn submit_contact(
    State(state): State<AppState>,
    client_ip: ClientIp,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> AppResult<Response> {
    if !state.contact_limiter.try_acquire(client_ip.ip()) {
        return Err(AppError::RateLimited);
    }

    let user_agent = headers
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let saved = state
        .intake
        .submit_contact(&body, client_ip.ip().map(|ip| ip.to_string()), user_agent)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": CONTACT_RECEIVED_MSG,
            "id": saved.id
        })),
    )
        .into_response())
}

/// POST /api/contact/demo-call — record a demo call.
async fn record_demo_call(
    State(state): State<AppState>,
    client_ip: ClientIp,
    Json(body): Json<Value>,
) -> AppResult<Response> {
    if !state.demo_call_limiter.try_acquire(client_ip.ip()) {
        return Err(AppError::RateLimited);
    }

    let call = state.intake.record_demo_call(&body).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": DEMO_CALL_RECORDED_MSG,
            "data": call
        })),
    )
        .into_response())
}

#[derive(Deserialize)]
struct ListParams {
    page: Option<i64>,
    limit: Option<i64>,
}

/// GET /api/contact — paginated listing, newest first.
async fn list_contacts(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> AppResult<Json<Value>> {
    let (rows, pagination) = state
        .intake
        .list(params.page.unwrap_or(1), params.limit.unwrap_or(50))
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": rows,
        "pagination": pagination
    })))
}

/// GET /api/contact/analytics?days=N — per-day aggregates.
async fn analytics(
    State(state): State<AppState>,
    Query(params): Query<AnalyticsParams>,
) -> AppResult<Json<Value>> {
    let days = params.days.unwrap_or(30).clamp(1, 365);
    let rows = state.intake.analytics(days).await?;

    Ok(Json(json!({
        "success": true,
        "data": rows,
        "period": format!("{days} days")
    })))
}

#[derive(Deserialize)]
struct AnalyticsParams {
    days: Option<i32>,
}

/// GET /api/contact/{id}.
async fn get_contact(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Value>> {
    let submission = state.intake.get(parse_id(&id)?).await?;
    Ok(Json(json!({ "success": true, "data": submission })))
}

/// PUT /api/contact/{id}/status.
async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> AppResult<Json<Value>> {
    let id = parse_id(&id)?;
    let status = body
        .get("status")
        .and_then(Value::as_str)
        .ok_or(AppError::InvalidStatus)?;
    let notes = body.get("notes").and_then(Value::as_str);

    let updated = state.intake.update_status(id, status, notes).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Contact status updated successfully",
        "data": updated
    })))
}

/// POST /api/contact/{id}/deletion-request — flag for GDPR deletion.
async fn request_deletion(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Value>> {
    let flagged = state.intake.request_deletion(parse_id(&id)?).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Deletion requested; the record will be removed by the retention sweep",
        "data": flagged
    })))
}

/// DELETE /api/contact/{id} — immediate GDPR erasure.
async fn erase_contact(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Value>> {
    state.intake.erase(parse_id(&id)?).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Contact submission deleted"
    })))
}

/// Ids are numeric; anything else is a client error, not a missing row.
fn parse_id(raw: &str) -> AppResult<i64> {
    raw.parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or(AppError::InvalidId)
}
