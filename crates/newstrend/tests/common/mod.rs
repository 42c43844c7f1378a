//! Shared test utilities for newstrend integration tests.
//!
//! This module provides:
//! - `TestHarness` with a file-backed database in a temp directory
//! - `ScriptedAnalyzer`, an in-process stand-in for the analysis service
//! - Builders for articles and configs

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::{ScriptedAnalyzer, TestHarness};
