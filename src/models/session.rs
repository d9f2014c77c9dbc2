//! Session DTOs.
//!
//! - `SessionView`: everything the page needs to render the form
//! - `Phase`: where the session is in fetch → clone → locate → package
//! - `Notice`: inline success/info/warning/error message
//! - `ArchiveInfo`: the packaged zip, present only in `Packaged`

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::ProjectType;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    BranchesFetched,
    Cloning,
    Located,
    Packaged,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArchiveInfo {
    pub file_name: String,
    pub download_url: String,
    pub entries: usize,
    pub size_bytes: u64,
    /// Folder inside the clone that was packaged, e.g. `build`
    pub source_folder: String,
    pub packaged_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub id: String,
    pub phase: Phase,
    pub url: Option<String>,
    pub branches: Vec<String>,
    pub selected_branch: Option<String>,
    pub project_type: String,
    pub project_types: Vec<ProjectType>,
    pub archive: Option<ArchiveInfo>,
    pub notices: Vec<Notice>,
}
