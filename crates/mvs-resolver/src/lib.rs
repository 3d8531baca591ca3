//! Minimal version selection: for every module path, select the highest
//! version required anywhere in the requirement closure of the roots, with
//! the main module(s) always winning their own path.
//!
//! The [`graph::RequirementGraph`] is filled incrementally by the traversal
//! engine in [`engine`], which fetches requirements concurrently through the
//! memoizing [`cache::ProviderCache`]. [`resolver::Resolver`] exposes the
//! algorithms on top of it and [`requirements::Requirements`] is the
//! immutable snapshot handed to the rest of a build.

pub mod cache;
pub mod conflict;
pub mod edit;
pub mod engine;
pub mod error;
pub mod graph;
pub mod requirements;
pub mod resolver;

pub use conflict::{Conflict, ConflictCause, ConstraintError};
pub use edit::{edit_build_list, EditOutcome};
pub use engine::{LoadRequest, Resolution, UpgradePlan};
pub use error::{BuildListError, ResolveError};
pub use graph::RequirementGraph;
pub use requirements::{LockSummary, ModuleGraph, Requirements};
pub use resolver::Resolver;
