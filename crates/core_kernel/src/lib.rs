//! Core Kernel - Foundational types and utilities for the stall rental system
//!
//! This crate provides the fundamental building blocks used across all crates:
//! - Money types with precise fixed-point arithmetic
//! - Temporal helpers for billing dates and market-local "today"
//! - Strongly-typed identifiers
//! - The request context and port error types shared by every adapter

pub mod money;
pub mod temporal;
pub mod identifiers;
pub mod context;
pub mod ports;
pub mod error;

pub use money::{Money, Rate, MoneyError};
pub use temporal::{DateRange, Timezone, TemporalError, days_between};
pub use identifiers::{
    LeaseId, TenantId, StallId, DueId, PaymentId, PenaltyId, ArrearEntryId,
};
pub use context::{RequestContext, Principal, PrincipalKind};
pub use ports::{
    PortError, DomainPort, HealthCheckable, HealthCheckResult, AdapterHealth,
};
pub use error::CoreError;
