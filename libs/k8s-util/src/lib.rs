pub mod client;
pub mod error;
pub mod namespace;
pub mod telemetry;
