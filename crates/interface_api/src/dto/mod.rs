//! Request and response bodies

pub mod lease;
pub mod payment;
pub mod arrears;
