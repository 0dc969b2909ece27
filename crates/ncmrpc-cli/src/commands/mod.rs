//! CLI command implementations.

pub mod config;
pub mod run;
pub mod signatures;
pub mod status;
pub mod versions;
