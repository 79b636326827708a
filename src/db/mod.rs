//! Persistence layer: submission and demo-call repositories over PostgreSQL.

pub mod models;
pub mod repository;

pub use repository::{Database, DemoCallRepository, SubmissionRepository, create_pool};
