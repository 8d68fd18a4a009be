//! Lease and due handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use uuid::Uuid;

use core_kernel::{LeaseId, Money, RequestContext};

use crate::auth::{permissions, require};
use crate::dto::lease::*;
use crate::{error::ApiError, AppState};

/// Opens a lease and schedules its first due
pub async fn open_lease(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Json(request): Json<OpenLeaseRequest>,
) -> Result<(StatusCode, Json<OpenLeaseResponse>), ApiError> {
    require(&ctx, permissions::LEASE_WRITE)?;

    let (lease, first_due) = state.engine.leases.open_lease(&ctx, request.into()).await?;
    Ok((
        StatusCode::CREATED,
        Json(OpenLeaseResponse {
            lease: lease.into(),
            first_due: first_due.into(),
        }),
    ))
}

/// Gets a lease by ID
pub async fn get_lease(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<LeaseResponse>, ApiError> {
    require(&ctx, permissions::ARREARS_READ)?;

    let lease = state.engine.leases.find_lease(LeaseId::from_uuid(id)).await?;
    Ok(Json(lease.into()))
}

/// Ends a lease; no due may be scheduled past the end date
pub async fn close_lease(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<Uuid>,
    Json(request): Json<CloseLeaseRequest>,
) -> Result<Json<LeaseResponse>, ApiError> {
    require(&ctx, permissions::LEASE_WRITE)?;

    let lease = state
        .engine
        .leases
        .close_lease(&ctx, LeaseId::from_uuid(id), request.end_date)
        .await?;
    Ok(Json(lease.into()))
}

/// Schedules the next due of a lease
pub async fn schedule_due(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<Uuid>,
    Json(request): Json<ScheduleDueRequest>,
) -> Result<(StatusCode, Json<DueResponse>), ApiError> {
    require(&ctx, permissions::BILLING_WRITE)?;

    let due = state
        .engine
        .scheduler
        .schedule_next_due(
            &ctx,
            LeaseId::from_uuid(id),
            request.after_date,
            request.amount.map(Money::new),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(due.into())))
}
