//! Restaurant lead intake service: validates and persists contact-form
//! submissions, suppresses duplicates, and fires notification emails.

pub mod config;
pub mod db;
pub mod dedup;
pub mod email;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod service;
pub mod telemetry;
pub mod validation;

pub use config::Config;
pub use error::{AppError, AppResult};
