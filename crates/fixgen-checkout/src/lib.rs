//! Version-addressed checkout and restore of a shared working tree.
//!
//! [`CheckoutController::run_at_version`] moves a working tree to the
//! snapshot a [`VersionRegistry`] publishes for a schema version, runs the
//! supplied generators there, and restores the tree afterwards whatever the
//! generators did.
//!
//! # Modules
//!
//! - [`registry`]: version ids, entries and the append-only registry
//! - [`tree`]: the [`WorkingTree`] capability
//! - [`git`]: [`GitTree`], a git2-backed working tree
//! - [`directory`]: [`DirectoryTree`], snapshot directories without a VCS
//! - [`controller`]: [`CheckoutController`] and [`Generator`]
//! - [`error`]: registry, tree and checkout errors

pub mod controller;
pub mod directory;
pub mod error;
pub mod git;
pub mod registry;
pub mod tree;

pub use controller::{CheckoutController, Generator};
pub use directory::{DirectoryCapture, DirectoryTree};
pub use error::{CheckoutError, GeneratorError, RegistryError, TreeError};
pub use git::{GitTree, WorkingTreeState};
pub use registry::{VersionEntry, VersionId, VersionRegistry};
pub use tree::{TreeCapture, WorkingTree};
