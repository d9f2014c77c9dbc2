use std::path::{Path, PathBuf};

use crate::config::ProjectType;

/// First candidate folder of `project_type` that exists under `repo_path`.
///
/// Candidates are tried in declared order, so an earlier entry wins when
/// several exist. `None` when no candidate is a directory.
pub fn locate(repo_path: &Path, project_type: &ProjectType) -> Option<PathBuf> {
    project_type
        .candidates
        .iter()
        .map(|candidate| repo_path.join(candidate))
        .find(|path| path.is_dir())
}
