pub mod cache;
pub mod config;
pub mod handler;
pub mod http;
pub mod identity;
pub mod session;
pub mod telemetry;
