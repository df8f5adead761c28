//! Shared test utilities for jobscout integration tests.
//!
//! This module provides:
//! - `TestHarness` with an in-memory record store and a temp config directory
//! - `ScriptedTransport` for replaying run output without a backend
//! - Builder patterns for job and schedule documents

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::{ScriptedTransport, TestHarness};
