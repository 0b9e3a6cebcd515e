//! Tenant provisioning endpoints: start, poll, fetch result, slug check.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::JobId;
use orchestrator::{
    AuditService, BillingService, ProvisionRequest, ProvisioningCoordinator, ProvisioningResult,
    StorageProvisioner,
};
use serde::{Deserialize, Serialize};
use tenancy::TenantDirectory;

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<D, S, B, A> {
    pub coordinator: ProvisioningCoordinator<D, S, B, A>,
}

// -- Response types --

#[derive(Serialize)]
pub struct StartResponse {
    pub job_id: String,
    pub deduplicated: bool,
    pub status_url: String,
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub job_id: String,
    pub slug: String,
    pub status: String,
    pub progress: u8,
    pub current_step: String,
    pub message: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Deserialize)]
pub struct SlugCheckParams {
    pub slug: String,
}

#[derive(Serialize)]
pub struct SlugCheckResponse {
    pub available: bool,
    pub message: String,
}

// -- Handlers --

/// POST /tenants — accept a provisioning request, return the job to poll.
///
/// Duplicate requests for an in-flight slug return the existing job id.
#[tracing::instrument(skip(state, req), fields(slug = %req.tenant_slug))]
pub async fn start<D, S, B, A>(
    State(state): State<Arc<AppState<D, S, B, A>>>,
    Json(req): Json<ProvisionRequest>,
) -> Result<(StatusCode, Json<StartResponse>), ApiError>
where
    D: TenantDirectory + 'static,
    S: StorageProvisioner + 'static,
    B: BillingService + 'static,
    A: AuditService + 'static,
{
    let started = state.coordinator.start(req).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(StartResponse {
            job_id: started.job_id.to_string(),
            deduplicated: started.deduplicated,
            status_url: format!("/tenants/jobs/{}", started.job_id),
        }),
    ))
}

/// GET /tenants/jobs/{id} — poll provisioning status.
#[tracing::instrument(skip(state))]
pub async fn status<D, S, B, A>(
    State(state): State<Arc<AppState<D, S, B, A>>>,
    Path(id): Path<String>,
) -> Result<Json<StatusResponse>, ApiError>
where
    D: TenantDirectory + 'static,
    S: StorageProvisioner + 'static,
    B: BillingService + 'static,
    A: AuditService + 'static,
{
    let job_id = parse_job_id(&id)?;
    let record = state
        .coordinator
        .status(job_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Job {id} not found or expired")))?;

    Ok(Json(StatusResponse {
        job_id: record.job_id.to_string(),
        slug: record.slug,
        status: record.status.to_string(),
        progress: record.progress,
        current_step: record.current_step,
        message: record.message,
        created_at: record.created_at.to_rfc3339(),
        updated_at: record.updated_at.to_rfc3339(),
    }))
}

/// GET /tenants/jobs/{id}/result — fetch the terminal result payload.
///
/// Returns 409 while the job is still running and 404 once the result has
/// been cleaned up. The first successful read arms the delayed cleanup.
#[tracing::instrument(skip(state))]
pub async fn result<D, S, B, A>(
    State(state): State<Arc<AppState<D, S, B, A>>>,
    Path(id): Path<String>,
) -> Result<Json<ProvisioningResult>, ApiError>
where
    D: TenantDirectory + 'static,
    S: StorageProvisioner + 'static,
    B: BillingService + 'static,
    A: AuditService + 'static,
{
    let job_id = parse_job_id(&id)?;

    if let Some(record) = state.coordinator.status(job_id).await? {
        if !record.status.is_terminal() {
            return Err(ApiError::Conflict(format!(
                "Job {id} is still {}",
                record.status
            )));
        }
    }

    let result = state
        .coordinator
        .result(job_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Result for job {id} not found or expired")))?;

    Ok(Json(result))
}

/// GET /tenants/check-slug?slug=… — pre-flight slug availability check.
#[tracing::instrument(skip(state))]
pub async fn check_slug<D, S, B, A>(
    State(state): State<Arc<AppState<D, S, B, A>>>,
    Query(params): Query<SlugCheckParams>,
) -> Result<Json<SlugCheckResponse>, ApiError>
where
    D: TenantDirectory + 'static,
    S: StorageProvisioner + 'static,
    B: BillingService + 'static,
    A: AuditService + 'static,
{
    if !tenancy::slug::is_valid(&params.slug) {
        return Ok(Json(SlugCheckResponse {
            available: false,
            message: "Slug must contain only lowercase letters, digits and hyphens".to_string(),
        }));
    }

    let available = state.coordinator.slug_available(&params.slug).await?;
    Ok(Json(SlugCheckResponse {
        available,
        message: if available {
            "Slug is available".to_string()
        } else {
            "Slug is already in use".to_string()
        },
    }))
}

fn parse_job_id(id: &str) -> Result<JobId, ApiError> {
    let uuid = uuid::Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid job id: {e}")))?;
    Ok(JobId::from_uuid(uuid))
}
