//! Unit tests entrypoint

#[path = "unit/proptest_tests.rs"]
mod proptest_tests;
