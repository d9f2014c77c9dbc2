//! Remote repository access through libgit2.
//!
//! - `list_branches`: shallow clone into a scratch directory, read the
//!   remote-tracking branches, always delete the scratch directory
//! - `clone_branch`: full clone of one branch, swapped into place only
//!   once the clone has succeeded
//!
//! All operations block on network and disk; callers run them on
//! `spawn_blocking`.

use git2::build::RepoBuilder;
use git2::{BranchType, FetchOptions, Repository};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::error::{AppError, Result};
use crate::workspace::remove_dir_if_exists;

/// libgit2's `GIT_ENOTSUPPORTED`; git2 reports it as a generic error code.
const GIT_ENOTSUPPORTED: i32 = -39;

#[derive(Debug, Clone)]
pub struct RepositoryFetcher {
    /// History depth for branch listing. `0` fetches everything.
    shallow_depth: i32,
}

impl RepositoryFetcher {
    pub fn new(shallow_depth: i32) -> Self {
        Self { shallow_depth }
    }

    /// Sorted, duplicate-free short names of every branch on the remote.
    pub fn list_branches(&self, url: &str, scratch: &Path) -> Result<Vec<String>> {
        tracing::info!("Listing branches of {} (depth {})", url, self.shallow_depth);
        let start = Instant::now();

        remove_dir_if_exists(scratch)?;
        let listed = self
            .shallow_clone(url, scratch)
            .and_then(|repo| remote_branch_names(&repo));
        let cleanup = remove_dir_if_exists(scratch);

        let branches = listed.inspect_err(|e| tracing::warn!("Branch listing failed for {}: {}", url, e))?;
        cleanup?;

        tracing::info!("Found {} branches in {:?}", branches.len(), start.elapsed());
        Ok(branches)
    }

    /// Clone exactly `branch` into `dest`, replacing whatever was there.
    ///
    /// The clone lands in a hidden staging sibling first. A failed clone
    /// leaves a previous `dest` untouched.
    pub fn clone_branch(&self, url: &str, dest: &Path, branch: &str) -> Result<()> {
        tracing::info!("Cloning {} ({}) into {}", url, branch, dest.display());
        let start = Instant::now();

        let staging = sibling_path(dest, "partial");
        remove_dir_if_exists(&staging)?;

        match RepoBuilder::new().branch(branch).clone(url, &staging) {
            Ok(repo) => drop(repo),
            Err(e) => {
                tracing::warn!("Clone of {} ({}) failed: {}", url, branch, e.message());
                if let Err(cleanup) = remove_dir_if_exists(&staging) {
                    tracing::warn!("Could not remove {}: {}", staging.display(), cleanup);
                }
                return Err(e.into());
            }
        }

        swap_into_place(&staging, dest)?;
        tracing::info!("Cloned {} in {:?}", branch, start.elapsed());
        Ok(())
    }

    /// Depth-limited clone. Transports without shallow support (libgit2's
    /// local transport for plain paths and `file://`) get a full clone.
    fn shallow_clone(&self, url: &str, path: &Path) -> Result<Repository> {
        if self.shallow_depth > 0 {
            let mut fetch = FetchOptions::new();
            fetch.depth(self.shallow_depth);
            match RepoBuilder::new().fetch_options(fetch).clone(url, path) {
                Ok(repo) => return Ok(repo),
                Err(e) if e.raw_code() == GIT_ENOTSUPPORTED => {
                    tracing::info!("Shallow fetch not supported for {}, fetching full history", url);
                    remove_dir_if_exists(path)?;
                }
                Err(e) => return Err(e.into()),
            }
        }

        let repo = RepoBuilder::new().clone(url, path)?;
        Ok(repo)
    }
}

fn remote_branch_names(repo: &Repository) -> Result<Vec<String>> {
    let mut names = BTreeSet::new();

    for branch in repo.branches(Some(BranchType::Remote))? {
        let (branch, _) = branch?;
        if let Some(short) = branch.name()?.and_then(short_branch_name) {
            names.insert(short.to_string());
        }
    }

    Ok(names.into_iter().collect())
}

/// `origin/feature/x` → `feature/x`. The symbolic `origin/HEAD` is skipped.
fn short_branch_name(remote_ref: &str) -> Option<&str> {
    let (_, short) = remote_ref.split_once('/')?;
    if short.is_empty() || short == "HEAD" {
        None
    } else {
        Some(short)
    }
}

/// `<parent>/.<name>.<suffix>`
fn sibling_path(dest: &Path, suffix: &str) -> PathBuf {
    let name = dest
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    dest.with_file_name(format!(".{}.{}", name, suffix))
}

/// Move `staging` to `dest`, retiring the previous `dest` only once the
/// new directory is ready.
fn swap_into_place(staging: &Path, dest: &Path) -> Result<()> {
    let retired = sibling_path(dest, "retired");
    remove_dir_if_exists(&retired)?;

    let had_previous = dest.exists();
    if had_previous {
        fs::rename(dest, &retired)?;
    }

    if let Err(e) = fs::rename(staging, dest) {
        if had_previous {
            if let Err(restore) = fs::rename(&retired, dest) {
                tracing::warn!("Could not restore {}: {}", dest.display(), restore);
            }
        }
        return Err(AppError::Io(e));
    }

    remove_dir_if_exists(&retired)
}
