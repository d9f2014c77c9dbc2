//! Request bodies for session actions.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct FetchBranchesRequest {
    pub url: String,
}

/// Fields left out keep their current value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SelectionRequest {
    pub branch: Option<String>,
    pub project_type: Option<String>,
}
