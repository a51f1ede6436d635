//! Integration tests for rust-sqlcompass
//!
//! This file serves as the entry point for all integration tests.

#[path = "common/mod.rs"]
mod common;

#[path = "integration/run_tests.rs"]
mod run_tests;

#[path = "integration/project_tests.rs"]
mod project_tests;
