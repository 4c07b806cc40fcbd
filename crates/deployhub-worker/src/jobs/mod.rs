//! Maintenance job implementations.

pub mod expiry;
