//! Unit tests - Tests with no database dependency
//!
//! These tests exercise naming, typing, and value conversion in isolation.

mod property_value_tests;
