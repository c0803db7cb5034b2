pub mod client;
pub mod config;
pub mod domain;
pub mod driver;
pub mod telemetry;
