//! [`WorkingTree`] over plain snapshot directories.
//!
//! For environments without version control: each snapshot is a named
//! subdirectory of a snapshot store kept outside the tree. Capturing copies
//! the tree into a temporary backup, transitioning replaces the tree's
//! contents with a snapshot's, and restoring removes what the snapshot
//! brought in before copying the backup back. Paths that neither the
//! snapshot nor the backup knows about, such as generated artifacts, stay
//! where they are. Symlinks are copied as links and never followed.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use tempfile::TempDir;

use crate::error::TreeError;
use crate::tree::{TreeCapture, WorkingTree};

/// Backup of a directory tree taken at capture time.
#[derive(Debug)]
pub struct DirectoryCapture {
    backup: TempDir,
    files: usize,
}

impl TreeCapture for DirectoryCapture {
    // Without a VCS there is no baseline to compare against; the backup
    // preserves whatever the tree holds.
    fn had_uncommitted_changes(&self) -> bool {
        false
    }

    fn describe(&self) -> String {
        format!("backup of {} file(s)", self.files)
    }
}

/// A directory whose snapshots live in a separate store.
#[derive(Debug, Clone)]
pub struct DirectoryTree {
    root: PathBuf,
    snapshots: PathBuf,
    /// Snapshot directory the tree was last transitioned to.
    checked_out: Option<PathBuf>,
}

impl DirectoryTree {
    /// `root` and `snapshots` must both exist and must not contain each
    /// other, or transitions would delete the snapshots.
    pub fn new(root: &Path, snapshots: &Path) -> Result<Self, TreeError> {
        let root = root.canonicalize()?;
        let snapshots = snapshots.canonicalize()?;
        if root.starts_with(&snapshots) || snapshots.starts_with(&root) {
            return Err(TreeError::InvalidLayout {
                reason: format!(
                    "snapshot store {} and tree {} overlap",
                    snapshots.display(),
                    root.display()
                ),
            });
        }
        Ok(DirectoryTree {
            root,
            snapshots,
            checked_out: None,
        })
    }

    fn snapshot_dir(&self, snapshot_ref: &str) -> Result<PathBuf, TreeError> {
        let unresolved = |reason: &str| TreeError::UnresolvedSnapshot {
            snapshot_ref: snapshot_ref.to_string(),
            reason: reason.to_string(),
        };
        let mut components = Path::new(snapshot_ref).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => {}
            _ => return Err(unresolved("snapshot names are single path components")),
        }
        let dir = self.snapshots.join(snapshot_ref);
        if !dir.is_dir() {
            return Err(unresolved("no such snapshot directory"));
        }
        Ok(dir)
    }
}

impl WorkingTree for DirectoryTree {
    type Captured = DirectoryCapture;

    fn root(&self) -> &Path {
        &self.root
    }

    fn capture(&self) -> Result<DirectoryCapture, TreeError> {
        let backup = tempfile::Builder::new()
            .prefix("fixgen-capture-")
            .tempdir()?;
        let files = overlay(&self.root, backup.path())?;
        Ok(DirectoryCapture { backup, files })
    }

    fn transition(&mut self, snapshot_ref: &str) -> Result<(), TreeError> {
        let source = self.snapshot_dir(snapshot_ref)?;
        clear_dir(&self.root)?;
        self.checked_out = Some(source.clone());
        let files = overlay(&source, &self.root)?;
        tracing::debug!(snapshot = snapshot_ref, files, "copied snapshot into tree");
        Ok(())
    }

    fn restore(&mut self, captured: &DirectoryCapture) -> Result<(), TreeError> {
        if let Some(snapshot) = self.checked_out.take() {
            remove_snapshot_only(&snapshot, captured.backup.path(), &self.root)?;
        }
        overlay(captured.backup.path(), &self.root)?;
        tracing::debug!(position = %captured.describe(), "restored directory tree");
        Ok(())
    }
}

/// Removes everything inside `dir`, keeping `dir` itself.
fn clear_dir(dir: &Path) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        remove_path(&entry?.path())?;
    }
    Ok(())
}

/// Removes a file, symlink or directory; a missing path is not an error.
fn remove_path(path: &Path) -> io::Result<()> {
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };
    if meta.is_dir() {
        return fs::remove_dir_all(path);
    }
    match fs::remove_file(path) {
        // Windows removes directory symlinks as directories.
        Err(_) if meta.file_type().is_symlink() => fs::remove_dir(path),
        other => other,
    }
}

fn is_real_dir(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok_and(|meta| meta.is_dir())
}

/// Copies the contents of `src` over `dst`, replacing entries of the same
/// name and leaving others alone. Returns the number of non-directory
/// entries copied.
fn overlay(src: &Path, dst: &Path) -> io::Result<usize> {
    let mut files = 0;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let target = dst.join(entry.file_name());
        if file_type.is_dir() {
            if !is_real_dir(&target) {
                remove_path(&target)?;
                fs::create_dir(&target)?;
            }
            files += overlay(&entry.path(), &target)?;
        } else {
            remove_path(&target)?;
            if file_type.is_symlink() {
                copy_link(&entry.path(), &target)?;
            } else {
                fs::copy(entry.path(), &target)?;
            }
            files += 1;
        }
    }
    Ok(files)
}

/// Removes from `root` every path of `snapshot` that `backup` does not
/// have. Directories are removed only once nothing else is left in them.
fn remove_snapshot_only(snapshot: &Path, backup: &Path, root: &Path) -> io::Result<()> {
    for entry in fs::read_dir(snapshot)? {
        let entry = entry?;
        let name = entry.file_name();
        let in_backup = backup.join(&name);
        let in_root = root.join(&name);
        let kept = fs::symlink_metadata(&in_backup).is_ok();
        if entry.file_type()?.is_dir() {
            if is_real_dir(&in_root) {
                remove_snapshot_only(&entry.path(), &in_backup, &in_root)?;
                if !kept && fs::read_dir(&in_root)?.next().is_none() {
                    fs::remove_dir(&in_root)?;
                }
            }
        } else if !kept {
            remove_path(&in_root)?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn copy_link(src: &Path, dst: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(fs::read_link(src)?, dst)
}

#[cfg(windows)]
fn copy_link(src: &Path, dst: &Path) -> io::Result<()> {
    let target = fs::read_link(src)?;
    if fs::metadata(src).is_ok_and(|meta| meta.is_dir()) {
        std::os::windows::fs::symlink_dir(target, dst)
    } else {
        std::os::windows::fs::symlink_file(target, dst)
    }
}

#[cfg(not(any(unix, windows)))]
fn copy_link(src: &Path, _dst: &Path) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        format!("cannot copy symlink {}", src.display()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(path: &Path, content: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    #[test]
    fn overlapping_layouts_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let snapshots = dir.path().join("snapshots");
        fs::create_dir_all(&snapshots).unwrap();
        let err = DirectoryTree::new(dir.path(), &snapshots).unwrap_err();
        assert!(matches!(err, TreeError::InvalidLayout { .. }));
    }

    #[test]
    fn snapshot_names_cannot_escape_the_store() {
        let tree_dir = tempfile::tempdir().unwrap();
        let store = tempfile::tempdir().unwrap();
        let mut tree = DirectoryTree::new(tree_dir.path(), store.path()).unwrap();
        for name in ["../x", "a/b", ""] {
            let err = tree.transition(name).unwrap_err();
            assert!(matches!(err, TreeError::UnresolvedSnapshot { .. }), "{name}");
        }
    }

    #[test]
    fn transition_then_restore_round_trips_contents() {
        let tree_dir = tempfile::tempdir().unwrap();
        let store = tempfile::tempdir().unwrap();
        write(&tree_dir.path().join("src/lib.txt"), "current");
        write(&tree_dir.path().join("README"), "readme");
        write(&store.path().join("v1/src/lib.txt"), "old");

        let mut tree = DirectoryTree::new(tree_dir.path(), store.path()).unwrap();
        let captured = tree.capture().unwrap();
        assert!(!captured.had_uncommitted_changes());

        tree.transition("v1").unwrap();
        assert_eq!(fs::read_to_string(tree_dir.path().join("src/lib.txt")).unwrap(), "old");
        assert!(!tree_dir.path().join("README").exists());

        tree.restore(&captured).unwrap();
        assert_eq!(
            fs::read_to_string(tree_dir.path().join("src/lib.txt")).unwrap(),
            "current"
        );
        assert_eq!(fs::read_to_string(tree_dir.path().join("README")).unwrap(), "readme");
        assert_eq!(captured.describe(), "backup of 2 file(s)");
    }

    #[test]
    fn restore_keeps_paths_the_snapshot_did_not_bring() {
        let tree_dir = tempfile::tempdir().unwrap();
        let store = tempfile::tempdir().unwrap();
        write(&tree_dir.path().join("src/lib.txt"), "current");
        write(&store.path().join("v1/src/lib.txt"), "old");
        write(&store.path().join("v1/src/legacy.txt"), "legacy");
        write(&store.path().join("v1/legacy/notes.txt"), "notes");

        let mut tree = DirectoryTree::new(tree_dir.path(), store.path()).unwrap();
        let captured = tree.capture().unwrap();
        tree.transition("v1").unwrap();
        write(&tree_dir.path().join("fixtures/empty.db"), "db");
        write(&tree_dir.path().join("src/generated.db"), "db");
        write(&tree_dir.path().join("src/lib.txt"), "overwritten");
        tree.restore(&captured).unwrap();

        let root = tree_dir.path();
        assert_eq!(fs::read_to_string(root.join("fixtures/empty.db")).unwrap(), "db");
        assert_eq!(fs::read_to_string(root.join("src/generated.db")).unwrap(), "db");
        assert_eq!(fs::read_to_string(root.join("src/lib.txt")).unwrap(), "current");
        assert!(!root.join("src/legacy.txt").exists());
        assert!(!root.join("legacy").exists());
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_are_restored_as_links() {
        let tree_dir = tempfile::tempdir().unwrap();
        let store = tempfile::tempdir().unwrap();
        let root = tree_dir.path();
        write(&root.join("src/real.txt"), "real");
        std::os::unix::fs::symlink("src/real.txt", root.join("link.txt")).unwrap();
        std::os::unix::fs::symlink("src", root.join("src_link")).unwrap();
        fs::create_dir_all(store.path().join("v1")).unwrap();

        let mut tree = DirectoryTree::new(root, store.path()).unwrap();
        let captured = tree.capture().unwrap();
        assert_eq!(captured.describe(), "backup of 3 file(s)");
        tree.transition("v1").unwrap();
        assert!(fs::symlink_metadata(root.join("link.txt")).is_err());
        tree.restore(&captured).unwrap();

        for (link, target) in [("link.txt", "src/real.txt"), ("src_link", "src")] {
            let meta = fs::symlink_metadata(root.join(link)).unwrap();
            assert!(meta.file_type().is_symlink(), "{link}");
            assert_eq!(fs::read_link(root.join(link)).unwrap(), Path::new(target));
        }
        assert_eq!(fs::read_to_string(root.join("link.txt")).unwrap(), "real");
    }
}
