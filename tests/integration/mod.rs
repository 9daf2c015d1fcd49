//! Integration test suite for conftree
//!
//! End-to-end tests that drive the `conftree` binary.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **evaluation**: references, splices, promotion and narrowing
//! - **views**: output formats, queries and render targets
//! - **cache**: reuse and invalidation of cached evaluations
//! - **errors**: exit status and error reporting

mod common;

mod cache;
mod errors;
mod evaluation;
mod views;
