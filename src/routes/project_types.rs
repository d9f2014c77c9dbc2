use axum::{extract::State, routing::get, Json, Router};

use crate::config::ProjectType;
use crate::state::SharedState;

pub fn routes(state: SharedState) -> Router {
    Router::new()
        .route("/api/v1/project-types", get(list_project_types))
        .with_state(state)
}

async fn list_project_types(State(state): State<SharedState>) -> Json<Vec<ProjectType>> {
    Json(state.project_types.all().to_vec())
}
