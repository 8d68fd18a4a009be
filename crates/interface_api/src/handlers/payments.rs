//! Payment handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use uuid::Uuid;
use validator::Validate;

use core_kernel::{LeaseId, RequestContext};

use crate::auth::{permissions, require};
use crate::dto::payment::*;
use crate::{error::ApiError, AppState};

/// Records a payment against the lease's oldest unpaid due
///
/// With `schedule_next`, a payment that settles a due also schedules that
/// due's successor. Both commit together, so an error response means no
/// payment was recorded.
pub async fn record_payment(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<Uuid>,
    Json(request): Json<RecordPaymentRequest>,
) -> Result<(StatusCode, Json<PaymentResponse>), ApiError> {
    require(&ctx, permissions::PAYMENT_WRITE)?;
    request.validate()?;

    let receipt = state
        .engine
        .reconciler
        .record_payment(&ctx, request.into_command(LeaseId::from_uuid(id)))
        .await?;

    Ok((StatusCode::CREATED, Json(PaymentResponse::new(receipt))))
}

/// Records that the tenant did not pay
pub async fn mark_not_paid(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<Uuid>,
    Json(request): Json<NotPaidRequest>,
) -> Result<(StatusCode, Json<PaymentResponse>), ApiError> {
    require(&ctx, permissions::PAYMENT_WRITE)?;

    let receipt = state
        .engine
        .reconciler
        .mark_not_paid(&ctx, LeaseId::from_uuid(id), request.on)
        .await?;
    Ok((StatusCode::CREATED, Json(PaymentResponse::new(receipt))))
}
