use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::build::BuildLeases;
use crate::config::ProjectTypes;
use crate::git::RepositoryFetcher;
use crate::session::SessionStore;
use crate::workspace::Workspace;

/// Everything a request handler needs, passed explicitly instead of globals.
pub struct AppState {
    pub workspace: Workspace,
    pub project_types: ProjectTypes,
    pub fetcher: RepositoryFetcher,
    pub leases: BuildLeases,
    /// Branch listing reuses one scratch directory, so listings run one at a time.
    pub listing_lock: Mutex<()>,
    pub sessions: SessionStore,
}

impl AppState {
    pub fn new(
        workspace: Workspace,
        project_types: ProjectTypes,
        fetcher: RepositoryFetcher,
        session_idle_timeout: Duration,
    ) -> SharedState {
        Arc::new(Self {
            workspace,
            project_types,
            fetcher,
            leases: BuildLeases::new(),
            listing_lock: Mutex::new(()),
            sessions: SessionStore::new(session_idle_timeout),
        })
    }
}

pub type SharedState = Arc<AppState>;
