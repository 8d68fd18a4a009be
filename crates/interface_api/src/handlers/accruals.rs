//! Accrual handlers

use axum::{extract::State, Extension, Json};
use tracing::info;

use core_kernel::RequestContext;

use crate::auth::{permissions, require};
use crate::dto::arrears::*;
use crate::{error::ApiError, AppState};

/// Runs one accrual pass
///
/// An empty body accrues as of today in the market timezone. Failures on
/// individual dues are reported in the response, not as an error status.
pub async fn run_accrual(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    request: Option<Json<RunAccrualRequest>>,
) -> Result<Json<AccrualResponse>, ApiError> {
    require(&ctx, permissions::ACCRUAL_RUN)?;

    let Json(request) = request.unwrap_or_default();
    let as_of = request.as_of.unwrap_or_else(|| state.arrears.timezone.today());

    let report = state.engine.accrual.accrue_penalties(&ctx, as_of).await?;
    info!(
        as_of = %as_of,
        applied = report.applied_count(),
        failed = report.failed_count(),
        "Accrual run requested over HTTP"
    );
    Ok(Json(report.into()))
}
