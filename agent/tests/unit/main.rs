//! Unit tests for the rasp agent
//!
//! These tests use mocked ports and run fast without touching real packages.

mod global_state;
mod mocks;
mod property_tests;
