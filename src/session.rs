//! Per-session form state and the actions that drive it.
//!
//! Phases: `Idle` → `BranchesFetched` → `Cloning` → `Located` → `Packaged`.
//! A new URL sends the session back to `Idle`; re-fetching the same URL
//! keeps the selection while it is still listed. Changing the selection of
//! a packaged session drops the archive and returns to `BranchesFetched`.
//!
//! Every action replaces the notice list with what it produced. Failures
//! are recorded as notices and also returned, so the HTTP layer can pick a
//! status code. Actions block; handlers run them on `spawn_blocking` while
//! holding the session's async mutex, which keeps one action per session
//! in flight.

use chrono::Utc;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use crate::error::{AppError, Result};
use crate::models::{ArchiveInfo, Notice, NoticeLevel, Phase, SelectionRequest, SessionView};
use crate::package::{archive, locate};
use crate::state::AppState;
use crate::workspace::{clone_dir_name, repo_name_from_url};

#[derive(Debug, Clone)]
pub struct PackagedArchive {
    pub path: PathBuf,
    pub info: ArchiveInfo,
}

#[derive(Debug)]
pub struct Session {
    id: String,
    phase: Phase,
    url: Option<String>,
    branches: Vec<String>,
    selected_branch: Option<String>,
    project_type: String,
    archive: Option<PackagedArchive>,
    notices: Vec<Notice>,
}

impl Session {
    pub fn new(id: String, project_type: &str) -> Self {
        Self {
            id,
            phase: Phase::Idle,
            url: None,
            branches: Vec::new(),
            selected_branch: None,
            project_type: project_type.to_string(),
            archive: None,
            notices: Vec::new(),
        }
    }

    pub fn archive(&self) -> Option<&PackagedArchive> {
        self.archive.as_ref()
    }

    pub fn view(&self, state: &AppState) -> SessionView {
        SessionView {
            id: self.id.clone(),
            phase: self.phase,
            url: self.url.clone(),
            branches: self.branches.clone(),
            selected_branch: self.selected_branch.clone(),
            project_type: self.project_type.clone(),
            project_types: state.project_types.all().to_vec(),
            archive: self.archive.as_ref().map(|a| a.info.clone()),
            notices: self.notices.clone(),
        }
    }

    /// List the remote's branches and pre-select the first one.
    pub fn fetch_branches(&mut self, state: &AppState, url: &str) -> Result<()> {
        self.notices.clear();
        let result = self.run_fetch_branches(state, url);
        if let Err(e) = &result {
            self.surface("Failed to fetch branches", e);
        }
        result
    }

    pub fn select(&mut self, state: &AppState, request: SelectionRequest) -> Result<()> {
        self.notices.clear();
        let result = self.run_select(state, request);
        if let Err(e) = &result {
            self.surface("Invalid selection", e);
        }
        result
    }

    /// Clone the selected branch, locate its build folder and zip it.
    pub fn build(&mut self, state: &AppState) -> Result<()> {
        self.notices.clear();
        let result = self.run_build(state);
        if let Err(e) = &result {
            let context = match self.phase {
                Phase::Cloning => "Error cloning repository",
                Phase::Located => "Error packaging build folder",
                _ => "Build failed",
            };
            self.surface(context, e);
            if matches!(self.phase, Phase::Cloning | Phase::Located) {
                self.transition(Phase::BranchesFetched);
            }
        }
        result
    }

    fn run_fetch_branches(&mut self, state: &AppState, url: &str) -> Result<()> {
        let url = url.trim();
        if url.is_empty() {
            return Err(AppError::Validation("Please provide a repository URL.".to_string()));
        }

        if self.url.as_deref() != Some(url) {
            self.url = Some(url.to_string());
            self.branches.clear();
            self.selected_branch = None;
            self.archive = None;
            self.transition(Phase::Idle);
        }

        // A failed re-fetch of the same URL keeps what was fetched before
        let branches = {
            let _listing = state.listing_lock.lock().map_err(|_| AppError::lock_poisoned())?;
            state
                .fetcher
                .list_branches(url, &state.workspace.branch_listing_dir())?
        };

        let still_listed = self
            .selected_branch
            .as_ref()
            .is_some_and(|branch| branches.contains(branch));
        if !still_listed {
            self.selected_branch = branches.first().cloned();
            self.archive = None;
        }
        self.branches = branches;
        if self.archive.is_none() {
            self.transition(Phase::BranchesFetched);
        }
        self.notify(NoticeLevel::Success, "Branches fetched.");
        Ok(())
    }

    fn run_select(&mut self, state: &AppState, request: SelectionRequest) -> Result<()> {
        if let Some(branch) = &request.branch {
            if !self.branches.contains(branch) {
                return Err(AppError::Validation(format!(
                    "Unknown branch {:?}. Fetch branches first.",
                    branch
                )));
            }
        }
        if let Some(project_type) = &request.project_type {
            if state.project_types.get(project_type).is_none() {
                return Err(AppError::Validation(format!(
                    "Unknown project type {:?}. Expected one of: {}",
                    project_type,
                    state.project_types.names().join(", ")
                )));
            }
        }

        let mut changed = false;
        if let Some(branch) = request.branch {
            changed |= self.selected_branch.as_deref() != Some(branch.as_str());
            self.selected_branch = Some(branch);
        }
        if let Some(project_type) = request.project_type {
            changed |= self.project_type != project_type;
            self.project_type = project_type;
        }

        if changed && self.phase == Phase::Packaged {
            self.archive = None;
            self.transition(Phase::BranchesFetched);
        }
        Ok(())
    }

    fn run_build(&mut self, state: &AppState) -> Result<()> {
        let (url, branch) = match (self.url.clone(), self.selected_branch.clone()) {
            (Some(url), Some(branch)) => (url, branch),
            _ => {
                return Err(AppError::Validation(
                    "Please provide a repository URL and select a branch.".to_string(),
                ))
            }
        };
        let project_type = state
            .project_types
            .get(&self.project_type)
            .cloned()
            .ok_or_else(|| AppError::Validation(format!("Unknown project type {:?}", self.project_type)))?;

        let repo_name = repo_name_from_url(&url)?;
        let clone_dir = state.workspace.clone_dir(&repo_name, &branch)?;
        let archive_path = state.workspace.archive_path(&repo_name, &branch, &project_type.name)?;
        let _lease = state.leases.acquire(&clone_dir_name(&repo_name, &branch)?)?;

        self.archive = None;
        self.transition(Phase::Cloning);
        self.notify(NoticeLevel::Info, format!("Cloning `{}`...", branch));
        state.fetcher.clone_branch(&url, &clone_dir, &branch)?;
        self.notify(NoticeLevel::Success, "Repository cloned.");

        self.notify(
            NoticeLevel::Info,
            format!("Searching for build folder for {}...", project_type.name),
        );
        let build_dir = locate(&clone_dir, &project_type).ok_or_else(|| AppError::BuildFolderNotFound {
            project_type: project_type.name.clone(),
            candidates: project_type.candidates.clone(),
        })?;
        self.transition(Phase::Located);

        let summary = archive(&build_dir, &archive_path)?;
        let source_folder = build_dir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let file_name = archive_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        self.notify(
            NoticeLevel::Success,
            format!("Packaged {} files from `{}`.", summary.entries, source_folder),
        );
        self.archive = Some(PackagedArchive {
            path: archive_path,
            info: ArchiveInfo {
                download_url: format!("/api/v1/sessions/{}/archive", self.id),
                file_name,
                entries: summary.entries,
                size_bytes: summary.size_bytes,
                source_folder,
                packaged_at: Utc::now(),
            },
        });
        self.transition(Phase::Packaged);
        Ok(())
    }

    fn transition(&mut self, phase: Phase) {
        if self.phase != phase {
            tracing::info!("Session {}: {:?} -> {:?}", self.id, self.phase, phase);
            self.phase = phase;
        }
    }

    fn notify(&mut self, level: NoticeLevel, message: impl Into<String>) {
        self.notices.push(Notice {
            level,
            message: message.into(),
        });
    }

    /// Record a failure. User-facing errors are shown as-is; the rest get
    /// the action's context.
    fn surface(&mut self, context: &str, error: &AppError) {
        let message = match error {
            AppError::Validation(_) | AppError::Conflict(_) | AppError::BuildFolderNotFound { .. } => {
                error.to_string()
            }
            _ => format!("{}: {}", context, error),
        };
        tracing::warn!("Session {}: {}", self.id, message);
        self.notify(error.level(), message);
    }
}

pub type SessionHandle = Arc<tokio::sync::Mutex<Session>>;

/// Sessions nobody has touched for this long are dropped on the next create.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(60 * 60);

struct SessionEntry {
    handle: SessionHandle,
    last_seen: Instant,
}

/// Live sessions by id. Nothing here touches disk.
pub struct SessionStore {
    sessions: RwLock<HashMap<String, SessionEntry>>,
    idle_timeout: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(DEFAULT_IDLE_TIMEOUT)
    }
}

impl SessionStore {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            idle_timeout,
        }
    }

    pub fn create(&self, project_type: &str) -> Result<SessionHandle> {
        let id = uuid::Uuid::new_v4().to_string();
        let handle = Arc::new(tokio::sync::Mutex::new(Session::new(id.clone(), project_type)));

        let mut sessions = self.sessions.write().map_err(|_| AppError::lock_poisoned())?;
        self.prune_idle(&mut sessions);
        sessions.insert(
            id.clone(),
            SessionEntry {
                handle: Arc::clone(&handle),
                last_seen: Instant::now(),
            },
        );
        tracing::info!("Session {} created ({} active)", id, sessions.len());
        Ok(handle)
    }

    pub fn get(&self, id: &str) -> Result<SessionHandle> {
        let mut sessions = self.sessions.write().map_err(|_| AppError::lock_poisoned())?;
        let entry = sessions
            .get_mut(id)
            .ok_or_else(|| AppError::SessionNotFound(id.to_string()))?;
        entry.last_seen = Instant::now();
        Ok(Arc::clone(&entry.handle))
    }

    pub fn remove(&self, id: &str) -> Result<()> {
        let mut sessions = self.sessions.write().map_err(|_| AppError::lock_poisoned())?;
        sessions
            .remove(id)
            .map(|_| tracing::info!("Session {} discarded", id))
            .ok_or_else(|| AppError::SessionNotFound(id.to_string()))
    }

    /// Drop idle sessions. A session whose handle is still held by a
    /// request is kept regardless of age.
    fn prune_idle(&self, sessions: &mut HashMap<String, SessionEntry>) {
        let before = sessions.len();
        sessions.retain(|_, entry| {
            entry.last_seen.elapsed() < self.idle_timeout || Arc::strong_count(&entry.handle) > 1
        });

        let pruned = before - sessions.len();
        if pruned > 0 {
            tracing::info!("Pruned {} idle sessions", pruned);
        }
    }
}
