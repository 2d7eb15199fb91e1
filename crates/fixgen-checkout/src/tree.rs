//! The [`WorkingTree`] capability the controller drives.
//!
//! A working tree is one global, mutable directory. The controller only
//! needs to capture where it is, move it to a snapshot, and put it back;
//! whether that is done with git or by copying directories is up to the
//! implementation.

use std::path::Path;

use crate::error::TreeError;

/// State captured before a tree is mutated.
pub trait TreeCapture {
    /// Whether the tree had changes that restoring would discard.
    fn had_uncommitted_changes(&self) -> bool;

    /// Short human-readable position, for logs.
    fn describe(&self) -> String;
}

/// A shared working tree that can be moved between snapshots.
pub trait WorkingTree {
    type Captured: TreeCapture;

    /// Directory the tree is checked out in.
    fn root(&self) -> &Path;

    /// Records the current position without mutating anything.
    fn capture(&self) -> Result<Self::Captured, TreeError>;

    /// Makes the tree content exactly that of `snapshot_ref`.
    fn transition(&mut self, snapshot_ref: &str) -> Result<(), TreeError>;

    /// Returns the tree to a previously captured position.
    fn restore(&mut self, captured: &Self::Captured) -> Result<(), TreeError>;
}
