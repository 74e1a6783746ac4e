//! Common test utilities for contract and CLI tests.
//!
//! This module provides:
//! - `Project`: in-memory project builder compiled through the library
//! - `TestEnv`: on-disk project in a temp directory, plus CLI helpers
//! - Fixtures: reusable settings and file contents

#![allow(dead_code)]

pub mod env;
pub mod fixtures;

pub use env::*;
pub use fixtures::*;
