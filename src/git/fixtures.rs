//! Local bare origin repositories for tests.
//!
//! The origin lives at `<tempdir>/demo.git`, so its repository name is
//! `demo`. `FixtureOrigin::new()` builds two unrelated branches:
//! - `main`: `README.md`, `build/index.html`, `build/static/app.css`, `out/stale.txt`
//! - `dev`: `README.md`, `dist/app.js`

use git2::{Index, IndexEntry, IndexTime, Oid, Repository, RepositoryInitOptions, Signature};
use std::path::PathBuf;
use tempfile::TempDir;

pub struct FixtureOrigin {
    _dir: TempDir,
    path: PathBuf,
}

impl FixtureOrigin {
    pub fn new() -> Self {
        let origin = Self::empty();
        origin.commit_branch(
            "main",
            &[
                ("README.md", "# demo\n"),
                ("build/index.html", "<html>main</html>\n"),
                ("build/static/app.css", "body { margin: 0; }\n"),
                ("out/stale.txt", "older output\n"),
            ],
        );
        origin.commit_branch("dev", &[("README.md", "# demo dev\n"), ("dist/app.js", "console.log('dev');\n")]);
        origin
    }

    /// Bare repository with `HEAD` pointing at `main` and no commits.
    fn empty() -> Self {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("demo.git");
        let mut opts = RepositoryInitOptions::new();
        opts.bare(true).initial_head("main");
        Repository::init_opts(&path, &opts).unwrap();
        Self { _dir: dir, path }
    }

    pub fn url(&self) -> String {
        self.path.to_string_lossy().to_string()
    }

    /// Point `refs/heads/<branch>` at a new root commit holding exactly `files`.
    pub fn commit_branch(&self, branch: &str, files: &[(&str, &str)]) -> Oid {
        let repo = Repository::open_bare(&self.path).unwrap();
        let mut index = Index::new().unwrap();

        for (path, content) in files {
            let blob = repo.blob(content.as_bytes()).unwrap();
            index
                .add(&IndexEntry {
                    ctime: IndexTime::new(0, 0),
                    mtime: IndexTime::new(0, 0),
                    dev: 0,
                    ino: 0,
                    mode: 0o100644,
                    uid: 0,
                    gid: 0,
                    file_size: content.len() as u32,
                    id: blob,
                    flags: path.len() as u16,
                    flags_extended: 0,
                    path: path.as_bytes().to_vec(),
                })
                .unwrap();
        }

        let tree_id = index.write_tree_to(&repo).unwrap();
        let tree = repo.find_tree(tree_id).unwrap();
        let signature = Signature::now("Fixture", "fixture@example.com").unwrap();
        let refname = format!("refs/heads/{}", branch);

        repo.commit(Some(refname.as_str()), &signature, &signature, "fixture commit", &tree, &[])
            .unwrap()
    }
}
