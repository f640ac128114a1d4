// src/cache/tests/mod.rs
//! Tests for the response cache

mod key_tests;
mod memory_tests;
