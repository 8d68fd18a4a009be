//! Arrears handlers

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use uuid::Uuid;

use core_kernel::{LeaseId, Money, RequestContext};

use crate::auth::{permissions, require};
use crate::dto::arrears::*;
use crate::{error::ApiError, AppState};

/// Pays down the oldest open arrear entry for a due date
pub async fn settle_arrear(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<Uuid>,
    Json(request): Json<SettleArrearRequest>,
) -> Result<Json<ArrearSettlementResponse>, ApiError> {
    require(&ctx, permissions::PAYMENT_WRITE)?;

    let paid_on = request
        .paid_on
        .unwrap_or_else(|| state.arrears.timezone.today());
    let settlement = state
        .engine
        .reconciler
        .pay_arrear_entry(
            &ctx,
            LeaseId::from_uuid(id),
            request.due_date,
            Money::new(request.amount_paid),
            paid_on,
        )
        .await?;
    Ok(Json(settlement.into()))
}

/// Current arrears balance of a lease
pub async fn get_balance(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<ArrearsBalanceResponse>, ApiError> {
    require(&ctx, permissions::ARREARS_READ)?;

    let arrears = state
        .engine
        .reconciler
        .arrears_balance(&ctx, LeaseId::from_uuid(id))
        .await?;
    Ok(Json(arrears.into()))
}

/// Penalties and unpaid dues of a lease, newest first
pub async fn get_history(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<HistoryResponse>, ApiError> {
    require(&ctx, permissions::ARREARS_READ)?;

    let history = state
        .engine
        .ledger
        .get_history(&ctx, LeaseId::from_uuid(id))
        .await?;
    Ok(Json(history.into()))
}
