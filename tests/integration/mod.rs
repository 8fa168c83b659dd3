//! Integration tests for the SQL connector.

pub mod common;
pub mod connector_test;
pub mod model_test;
pub mod postgres_test;
