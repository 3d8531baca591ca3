//! Core data types shared by the mvs crates.
//!
//! The resolver never interprets version strings itself: ordering is an
//! injected [`order::VersionOrder`] strategy and requirement metadata comes
//! from a [`provider::RequirementProvider`].

pub mod config;
pub mod module;
pub mod order;
pub mod provider;
pub mod table;

pub use module::{ModuleVersion, NONE};
pub use order::VersionOrder;
pub use provider::{ProviderError, Pruning, RequirementProvider};
