//! Unit tests for rust-sqlcompass
//!
//! This file serves as the entry point for all unit tests.

#[path = "unit/matrix_tests.rs"]
mod matrix_tests;

#[path = "unit/classification_tests.rs"]
mod classification_tests;

#[path = "unit/record_tests.rs"]
mod record_tests;

#[path = "unit/sqlproj_tests.rs"]
mod sqlproj_tests;
