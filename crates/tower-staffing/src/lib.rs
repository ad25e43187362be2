pub mod config;
pub mod error;
pub mod relay;
pub mod telemetry;
pub mod workflows;
