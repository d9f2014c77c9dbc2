//! API route handlers - maps HTTP endpoints to session actions.
//!
//! Each submodule defines routes for a feature area:
//! - `project_types`: The configured project-type table (GET /api/v1/project-types)
//! - `sessions`: Session lifecycle, branch fetch, selection, build and download

pub mod project_types;
pub mod sessions;

use axum::Router;

use crate::state::SharedState;

pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .merge(project_types::routes(state.clone()))
        .merge(sessions::routes(state))
}
