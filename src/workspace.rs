//! Workspace root and the paths derived from it.
//!
//! Layout under the root:
//! - `<repo>-<branch>/`: clone directory, replaced on every build
//! - `<repo>-<branch>-<type>.zip`: packaged build folder
//! - `temp_repo/`: scratch clone used while listing branches

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};

const BRANCH_LISTING_DIR: &str = "temp_repo";

#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Create the root directory if it is missing. Safe to call repeatedly.
    pub fn ensure<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        if !root.is_dir() {
            return Err(AppError::Io(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} exists and is not a directory", root.display()),
            )));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn branch_listing_dir(&self) -> PathBuf {
        self.root.join(BRANCH_LISTING_DIR)
    }

    pub fn clone_dir(&self, repo_name: &str, branch: &str) -> Result<PathBuf> {
        Ok(self.root.join(clone_dir_name(repo_name, branch)?))
    }

    pub fn archive_path(&self, repo_name: &str, branch: &str, project_type: &str) -> Result<PathBuf> {
        Ok(self.root.join(archive_file_name(repo_name, branch, project_type)?))
    }
}

/// `<repo>-<branch>`, also used as the build lease key.
pub fn clone_dir_name(repo_name: &str, branch: &str) -> Result<String> {
    Ok(format!("{}-{}", path_component(repo_name)?, path_component(branch)?))
}

pub fn archive_file_name(repo_name: &str, branch: &str, project_type: &str) -> Result<String> {
    Ok(format!(
        "{}-{}.zip",
        clone_dir_name(repo_name, branch)?,
        path_component(project_type)?
    ))
}

/// Repository name from the last segment of a clone URL, without `.git`.
///
/// Handles `https://host/user/repo.git`, `git@host:user/repo` and plain
/// local paths.
pub fn repo_name_from_url(url: &str) -> Result<String> {
    let trimmed = url.trim().trim_end_matches(['/', '\\']);
    let last = trimmed.rsplit(['/', '\\', ':']).next().unwrap_or("");
    let name = last.strip_suffix(".git").unwrap_or(last);

    if name.is_empty() {
        return Err(AppError::Validation(format!(
            "Cannot derive a repository name from {:?}",
            url
        )));
    }
    Ok(name.to_string())
}

/// Single safe path segment: anything outside `[A-Za-z0-9._-]` becomes `-`.
fn path_component(raw: &str) -> Result<String> {
    let cleaned: String = raw
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '-'
            }
        })
        .collect();

    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        return Err(AppError::Validation(format!("Invalid name for a path: {:?}", raw)));
    }
    Ok(cleaned)
}

/// Remove a directory tree, treating "already gone" as success.
pub fn remove_dir_if_exists(path: &Path) -> Result<()> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
