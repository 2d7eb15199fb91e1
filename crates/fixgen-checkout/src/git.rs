//! git2-backed [`WorkingTree`].
//!
//! Transitions detach HEAD at the snapshot commit before hard-resetting, so
//! the branch the caller was on never moves. Restoring hard-resets to the
//! captured commit and, when HEAD was attached, re-attaches it to the
//! captured branch.

use std::path::{Path, PathBuf};

use git2::build::CheckoutBuilder;
use git2::{Oid, Repository, ResetType, Status, StatusOptions};

use crate::error::TreeError;
use crate::tree::{TreeCapture, WorkingTree};

/// Position of a git working tree at capture time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingTreeState {
    pub was_detached: bool,
    /// Full reference name (`refs/heads/...`) when HEAD was attached.
    pub branch: Option<String>,
    /// Commit HEAD pointed at.
    pub commit: String,
    pub had_uncommitted_changes: bool,
}

impl WorkingTreeState {
    /// The branch name when attached, otherwise the commit.
    pub fn branch_or_commit_ref(&self) -> &str {
        match &self.branch {
            Some(branch) => branch.strip_prefix("refs/heads/").unwrap_or(branch),
            None => &self.commit,
        }
    }
}

impl TreeCapture for WorkingTreeState {
    fn had_uncommitted_changes(&self) -> bool {
        self.had_uncommitted_changes
    }

    fn describe(&self) -> String {
        if self.was_detached {
            format!("detached at {}", self.commit)
        } else {
            format!("{} at {}", self.branch_or_commit_ref(), self.commit)
        }
    }
}

/// A non-bare git repository's working tree.
pub struct GitTree {
    repo: Repository,
    root: PathBuf,
}

impl GitTree {
    /// Opens the repository whose working tree is at `path`.
    pub fn open(path: &Path) -> Result<Self, TreeError> {
        Self::from_repository(Repository::open(path)?)
    }

    /// Finds the repository containing `path`, searching upwards.
    pub fn discover(path: &Path) -> Result<Self, TreeError> {
        Self::from_repository(Repository::discover(path)?)
    }

    fn from_repository(repo: Repository) -> Result<Self, TreeError> {
        let root = repo
            .workdir()
            .ok_or_else(|| TreeError::InvalidLayout {
                reason: "bare repositories have no working tree".to_string(),
            })?
            .to_path_buf();
        Ok(GitTree { repo, root })
    }

    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    /// Tracked files modified, staged or deleted. Untracked files do not
    /// count: a hard reset leaves them alone.
    pub fn is_dirty(&self) -> Result<bool, TreeError> {
        let mut opts = StatusOptions::new();
        opts.include_untracked(false)
            .include_ignored(false)
            .exclude_submodules(true);
        let statuses = self.repo.statuses(Some(&mut opts))?;
        let changed = Status::INDEX_NEW
            | Status::INDEX_MODIFIED
            | Status::INDEX_DELETED
            | Status::INDEX_RENAMED
            | Status::INDEX_TYPECHANGE
            | Status::WT_MODIFIED
            | Status::WT_DELETED
            | Status::WT_RENAMED
            | Status::WT_TYPECHANGE
            | Status::CONFLICTED;
        Ok(statuses
            .iter()
            .any(|entry| entry.status().intersects(changed)))
    }

    fn hard_reset_detached(&self, oid: Oid) -> Result<(), TreeError> {
        let commit = self.repo.find_commit(oid)?;
        self.repo.set_head_detached(oid)?;
        self.repo.reset(commit.as_object(), ResetType::Hard, None)?;
        Ok(())
    }
}

impl WorkingTree for GitTree {
    type Captured = WorkingTreeState;

    fn root(&self) -> &Path {
        &self.root
    }

    fn capture(&self) -> Result<WorkingTreeState, TreeError> {
        let head = self.repo.head()?;
        let was_detached = self.repo.head_detached()?;
        let branch = if was_detached {
            None
        } else {
            head.name().map(str::to_string)
        };
        let commit = head.peel_to_commit()?.id().to_string();
        Ok(WorkingTreeState {
            was_detached,
            branch,
            commit,
            had_uncommitted_changes: self.is_dirty()?,
        })
    }

    fn transition(&mut self, snapshot_ref: &str) -> Result<(), TreeError> {
        let commit = self
            .repo
            .revparse_single(snapshot_ref)
            .and_then(|object| object.peel_to_commit())
            .map_err(|e| TreeError::UnresolvedSnapshot {
                snapshot_ref: snapshot_ref.to_string(),
                reason: e.message().to_string(),
            })?;
        self.hard_reset_detached(commit.id())?;
        tracing::debug!(snapshot = snapshot_ref, commit = %commit.id(), "checked out snapshot");
        Ok(())
    }

    fn restore(&mut self, captured: &WorkingTreeState) -> Result<(), TreeError> {
        let oid = Oid::from_str(&captured.commit)?;
        self.hard_reset_detached(oid)?;
        if let Some(branch) = &captured.branch {
            self.repo.set_head(branch)?;
            self.repo
                .checkout_head(Some(CheckoutBuilder::new().force()))?;
        }
        tracing::debug!(position = %captured.describe(), "restored git working tree");
        Ok(())
    }
}
