pub mod access;
pub mod config;
pub mod error;
pub mod format;
pub mod paths;
pub mod session;
pub mod telemetry;
pub mod workflows;
