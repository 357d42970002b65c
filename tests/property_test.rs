// tests/property_test.rs

//! Property-based tests for redis-trib.
//!
//! These tests verify invariants of the pure planning and parsing logic that
//! must hold regardless of input values.

mod property {
    pub mod parsing_test;
    pub mod planner_test;
}
