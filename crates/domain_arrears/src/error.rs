//! Arrears domain errors

use chrono::NaiveDate;
use thiserror::Error;

use core_kernel::{LeaseId, MoneyError, PortError, TemporalError};

/// Errors that can occur in the arrears domain
#[derive(Debug, Error)]
pub enum ArrearsError {
    /// Lease, due or arrear-entry reference does not exist
    #[error("{entity} not found: {id}")]
    NotFound {
        entity: String,
        id: String,
    },

    /// Non-positive or otherwise unusable amount
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// The idempotence guard tripped; nothing was changed
    #[error("Already processed: {0}")]
    AlreadyProcessed(String),

    /// A due was requested past the lease's end date
    #[error("Lease {lease_id} ended on {end_date}")]
    LeaseClosed {
        lease_id: LeaseId,
        end_date: NaiveDate,
    },

    /// Invalid operation
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Calculation error
    #[error("Calculation error: {0}")]
    Calculation(String),

    /// The ledger store failed
    #[error("Ledger store error: {0}")]
    Store(PortError),
}

impl ArrearsError {
    pub fn not_found(entity: impl Into<String>, id: impl std::fmt::Display) -> Self {
        ArrearsError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub fn lease_not_found(lease_id: LeaseId) -> Self {
        Self::not_found("Lease", lease_id)
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ArrearsError::NotFound { .. })
    }

    pub fn is_already_processed(&self) -> bool {
        matches!(self, ArrearsError::AlreadyProcessed(_))
    }
}

impl From<PortError> for ArrearsError {
    fn from(error: PortError) -> Self {
        match error {
            PortError::NotFound { entity_type, id } => ArrearsError::NotFound {
                entity: entity_type,
                id,
            },
            other => ArrearsError::Store(other),
        }
    }
}

impl From<MoneyError> for ArrearsError {
    fn from(error: MoneyError) -> Self {
        match error {
            MoneyError::InvalidAmount(message) => ArrearsError::InvalidAmount(message),
            MoneyError::Overflow => ArrearsError::Calculation(error.to_string()),
        }
    }
}

impl From<TemporalError> for ArrearsError {
    fn from(error: TemporalError) -> Self {
        ArrearsError::InvalidOperation(error.to_string())
    }
}
