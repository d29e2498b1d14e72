//! Infrastructure adapters and runtime bootstrap.

pub mod db;
pub mod error;
pub mod http;
pub mod mail;
pub mod platform_auth;
pub mod telemetry;
