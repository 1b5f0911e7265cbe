//! Common test utilities for tollgate-core

pub mod fixtures;

pub use fixtures::*;
