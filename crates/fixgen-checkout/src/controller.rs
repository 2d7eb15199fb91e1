//! The checkout-run-restore cycle.
//!
//! [`CheckoutController::run_at_version`] is the only way this crate mutates
//! a tree. Preconditions (clean tree, library loaded from the tree, known
//! version) are all checked before the first mutation. Once the tree has
//! been moved, restoration always runs: after success, after a generator
//! error, and after a generator panic.

use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use crate::error::{CheckoutError, GeneratorError};
use crate::registry::{VersionId, VersionRegistry};
use crate::tree::{TreeCapture, WorkingTree};

/// A named zero-argument callback run against a checked-out snapshot.
pub struct Generator<'a> {
    name: String,
    callback: Box<dyn FnOnce() -> Result<(), GeneratorError> + 'a>,
}

impl<'a> Generator<'a> {
    pub fn new<F>(name: impl Into<String>, callback: F) -> Self
    where
        F: FnOnce() -> Result<(), GeneratorError> + 'a,
    {
        Generator {
            name: name.into(),
            callback: Box::new(callback),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runs the callback outside any checkout.
    pub fn invoke(self) -> Result<(), GeneratorError> {
        (self.callback)()
    }
}

impl std::fmt::Debug for Generator<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Generator").field("name", &self.name).finish()
    }
}

/// Runs generators at historical snapshots of one working tree.
///
/// `run_at_version` takes `&mut self`, so one controller never has two
/// checkouts in flight.
pub struct CheckoutController<T: WorkingTree> {
    tree: T,
    registry: VersionRegistry,
    library_origin: PathBuf,
}

impl<T: WorkingTree> CheckoutController<T> {
    /// `library_origin` is where the host library is actually loaded from;
    /// it must lie inside `tree`.
    pub fn new(tree: T, registry: VersionRegistry, library_origin: impl Into<PathBuf>) -> Self {
        CheckoutController {
            tree,
            registry,
            library_origin: library_origin.into(),
        }
    }

    pub fn tree(&self) -> &T {
        &self.tree
    }

    pub fn registry(&self) -> &VersionRegistry {
        &self.registry
    }

    pub fn into_tree(self) -> T {
        self.tree
    }

    /// Fails unless the library origin is inside the tree root.
    pub fn check_environment(&self) -> Result<(), CheckoutError> {
        let mismatch = || CheckoutError::EnvironmentMismatch {
            origin: self.library_origin.clone(),
            root: self.tree.root().to_path_buf(),
        };
        let (Ok(root), Ok(origin)) = (
            self.tree.root().canonicalize(),
            self.library_origin.canonicalize(),
        ) else {
            return Err(mismatch());
        };
        if path_within(&origin, &root) {
            Ok(())
        } else {
            Err(mismatch())
        }
    }

    /// Checks out `version`, runs `generators` in order, and restores the
    /// tree.
    ///
    /// Generators stop at the first failure, which is returned after the
    /// tree has been restored. A failed restore is reported as
    /// [`CheckoutError::RestoreFailed`] and takes precedence.
    pub fn run_at_version(
        &mut self,
        version: &VersionId,
        generators: Vec<Generator<'_>>,
    ) -> Result<(), CheckoutError> {
        let captured = self.tree.capture()?;
        if captured.had_uncommitted_changes() {
            return Err(CheckoutError::DirtyTree {
                root: self.tree.root().to_path_buf(),
            });
        }
        self.check_environment()?;
        let snapshot_ref = self.registry.resolve(version)?.to_string();

        tracing::info!(
            %version,
            snapshot = %snapshot_ref,
            from = %captured.describe(),
            generators = generators.len(),
            "checking out snapshot"
        );

        let tree = &mut self.tree;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            run_generators(tree, &snapshot_ref, generators)
        }));

        let restored = self.tree.restore(&captured);

        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(payload) => {
                if let Err(e) = &restored {
                    tracing::error!(error = %e, "restoring working tree after panic failed");
                }
                panic::resume_unwind(payload);
            }
        };

        if let Err(source) = restored {
            if let Err(superseded) = &outcome {
                tracing::error!(
                    error = %superseded,
                    "generator failure superseded by restore failure"
                );
            }
            return Err(CheckoutError::RestoreFailed {
                generator_failed: outcome.is_err(),
                source,
            });
        }

        tracing::info!(%version, to = %captured.describe(), "restored working tree");
        outcome
    }
}

fn run_generators<T: WorkingTree>(
    tree: &mut T,
    snapshot_ref: &str,
    generators: Vec<Generator<'_>>,
) -> Result<(), CheckoutError> {
    tree.transition(snapshot_ref)?;
    for (index, generator) in generators.into_iter().enumerate() {
        let name = generator.name.clone();
        tracing::debug!(index, generator = %name, "running generator");
        generator
            .invoke()
            .map_err(|source| CheckoutError::Generator {
                index,
                name,
                source,
            })?;
    }
    Ok(())
}

/// Component-wise prefix test; case-insensitive where the filesystem is.
fn path_within(path: &Path, root: &Path) -> bool {
    if cfg!(windows) {
        let lower = |p: &Path| PathBuf::from(p.to_string_lossy().to_lowercase());
        lower(path).starts_with(lower(root))
    } else {
        path.starts_with(root)
    }
}
