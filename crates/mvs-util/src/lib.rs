//! Shared utilities for the mvs workspace.
//!
//! This crate provides the cross-cutting concerns used by the other mvs
//! crates: the unified error type and Cargo-style terminal status lines.

pub mod errors;
pub mod progress;
