//! Request handlers

pub mod health;
pub mod leases;
pub mod payments;
pub mod arrears;
pub mod accruals;
