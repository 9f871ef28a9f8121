//! Command implementations.

pub mod login;
pub mod mirror;
pub mod version;
