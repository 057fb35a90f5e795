//! Request middleware

pub mod admin;
pub mod metrics;
pub mod rate_limit;
