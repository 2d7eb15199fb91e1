//! Error types for fixgen-checkout.

use std::path::PathBuf;

use thiserror::Error;

use crate::registry::VersionId;

/// Error type generator callbacks return.
///
/// Boxed so the controller stays independent of what generators do; callers
/// can downcast to their own error type.
pub type GeneratorError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors produced by the version registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// No entry is published for this version.
    #[error("unknown version: {0}")]
    UnknownVersion(VersionId),

    /// A published version may never point at another snapshot.
    #[error("version {id} is published as {published}, refusing to remap it to {requested}")]
    VersionRemapped {
        id: VersionId,
        published: String,
        requested: String,
    },

    /// A published version's notes may not be rewritten.
    #[error("version {id} is published with notes {published:?}, not {requested:?}")]
    NotesChanged {
        id: VersionId,
        published: String,
        requested: String,
    },

    /// The registry file could not be parsed.
    #[error("invalid registry: {0}")]
    Parse(#[from] serde_json::Error),

    /// The registry file could not be read.
    #[error("failed to read registry {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors produced by working tree implementations.
#[derive(Debug, Error)]
pub enum TreeError {
    /// A git operation failed.
    #[error("git error: {0}")]
    Git(#[from] git2::Error),

    /// A filesystem operation failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The snapshot reference does not name a point in the tree's history.
    #[error("cannot resolve snapshot '{snapshot_ref}': {reason}")]
    UnresolvedSnapshot {
        snapshot_ref: String,
        reason: String,
    },

    /// The tree cannot be managed in its current layout.
    #[error("invalid working tree layout: {reason}")]
    InvalidLayout { reason: String },
}

/// Errors produced by [`crate::CheckoutController::run_at_version`].
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The tree has uncommitted changes; nothing was touched.
    #[error("working tree {} has uncommitted changes, cannot proceed", root.display())]
    DirtyTree { root: PathBuf },

    /// The host library is not loaded from the managed tree; nothing was
    /// touched.
    #[error(
        "library is loaded from {} which is outside the working tree {}; \
         install it from the working tree (editable) before generating fixtures",
        origin.display(),
        root.display()
    )]
    EnvironmentMismatch { origin: PathBuf, root: PathBuf },

    /// The version is not in the registry; nothing was touched.
    #[error("unknown version: {0}")]
    UnknownVersion(VersionId),

    /// Any other registry failure.
    #[error(transparent)]
    Registry(RegistryError),

    /// Capturing or transitioning the tree failed.
    #[error("working tree error: {0}")]
    Tree(#[from] TreeError),

    /// A generator failed; the tree was restored before this was returned.
    #[error("generator #{index} '{name}' failed: {source}")]
    Generator {
        index: usize,
        name: String,
        #[source]
        source: GeneratorError,
    },

    /// Restoring the tree failed. The tree may not be in its original state.
    #[error("failed to restore working tree: {source}")]
    RestoreFailed {
        #[source]
        source: TreeError,
        generator_failed: bool,
    },
}

impl From<RegistryError> for CheckoutError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::UnknownVersion(id) => CheckoutError::UnknownVersion(id),
            other => CheckoutError::Registry(other),
        }
    }
}

impl CheckoutError {
    /// Whether the error was raised before the tree was mutated.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            CheckoutError::DirtyTree { .. }
                | CheckoutError::EnvironmentMismatch { .. }
                | CheckoutError::UnknownVersion(_)
        )
    }
}
