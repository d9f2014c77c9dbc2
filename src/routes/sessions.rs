//! Session endpoints backing the single-page form.
//!
//! - POST /api/v1/sessions
//!   Starts a session in `Idle` with the first project type selected.
//!
//! - GET /api/v1/sessions/{id}, DELETE /api/v1/sessions/{id}
//!   Current form state / discard the session.
//!
//! - POST /api/v1/sessions/{id}/branches { url: string }
//!   Lists the remote's branches. Used by: "Fetch branches" button
//!
//! - PUT /api/v1/sessions/{id}/selection { branch?: string, project_type?: string }
//!   Updates the selectors.
//!
//! - POST /api/v1/sessions/{id}/build
//!   Clones, locates the build folder and zips it. Used by: "Build & package" button
//!
//! - GET /api/v1/sessions/{id}/archive
//!   Downloads the zip produced by the last successful build.
//!
//! Actions answer with the session view even when they fail; the status code
//! carries the error kind and the view's notices carry the message.

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use tokio::sync::OwnedMutexGuard;
use tokio_util::io::ReaderStream;

use crate::error::{AppError, Result};
use crate::models::{FetchBranchesRequest, SelectionRequest};
use crate::session::Session;
use crate::state::{AppState, SharedState};

pub fn routes(state: SharedState) -> Router {
    Router::new()
        .route("/api/v1/sessions", post(create_session))
        .route("/api/v1/sessions/{id}", get(get_session).delete(delete_session))
        .route("/api/v1/sessions/{id}/branches", post(fetch_branches))
        .route("/api/v1/sessions/{id}/selection", put(update_selection))
        .route("/api/v1/sessions/{id}/build", post(build))
        .route("/api/v1/sessions/{id}/archive", get(download_archive))
        .with_state(state)
}

async fn create_session(State(state): State<SharedState>) -> Result<Response> {
    let handle = state.sessions.create(&state.project_types.default_type().name)?;
    let view = handle.lock().await.view(&state);
    Ok((StatusCode::CREATED, Json(view)).into_response())
}

async fn get_session(State(state): State<SharedState>, Path(id): Path<String>) -> Result<Response> {
    let handle = state.sessions.get(&id)?;
    let view = handle.lock().await.view(&state);
    Ok(Json(view).into_response())
}

async fn delete_session(State(state): State<SharedState>, Path(id): Path<String>) -> Result<StatusCode> {
    state.sessions.remove(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn fetch_branches(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(request): Json<FetchBranchesRequest>,
) -> Result<Response> {
    let session = state.sessions.get(&id)?.lock_owned().await;
    run_action(state, session, move |session, state| {
        session.fetch_branches(state, &request.url)
    })
    .await
}

async fn update_selection(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(request): Json<SelectionRequest>,
) -> Result<Response> {
    let session = state.sessions.get(&id)?.lock_owned().await;
    run_action(state, session, move |session, state| session.select(state, request)).await
}

async fn build(State(state): State<SharedState>, Path(id): Path<String>) -> Result<Response> {
    let session = state.sessions.get(&id)?.lock_owned().await;
    run_action(state, session, |session, state| session.build(state)).await
}

async fn download_archive(State(state): State<SharedState>, Path(id): Path<String>) -> Result<Response> {
    let handle = state.sessions.get(&id)?;
    let packaged = handle.lock().await.archive().cloned().ok_or_else(|| {
        AppError::Validation("Nothing to download yet. Build and package first.".to_string())
    })?;

    // A rebuild renames a new archive over this path; the open handle keeps
    // streaming the old one.
    let file = tokio::fs::File::open(&packaged.path).await?;
    let size = file.metadata().await?.len();
    let headers = [
        (header::CONTENT_TYPE, "application/zip".to_string()),
        (header::CONTENT_LENGTH, size.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", packaged.info.file_name),
        ),
    ];
    Ok((headers, Body::from_stream(ReaderStream::new(file))).into_response())
}

/// Run a blocking session action off the async runtime, holding the
/// session lock throughout.
async fn run_action<F>(state: SharedState, mut session: OwnedMutexGuard<Session>, action: F) -> Result<Response>
where
    F: FnOnce(&mut Session, &AppState) -> Result<()> + Send + 'static,
{
    let (outcome, view) = tokio::task::spawn_blocking(move || {
        let outcome = action(&mut *session, &*state);
        (outcome, session.view(&state))
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))?;

    let status = match &outcome {
        Ok(()) => StatusCode::OK,
        Err(e) => e.status_code(),
    };
    Ok((status, Json(view)).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProjectTypes;
    use crate::git::fixtures::FixtureOrigin;
    use crate::git::RepositoryFetcher;
    use crate::routes::create_router;
    use crate::session::DEFAULT_IDLE_TIMEOUT;
    use crate::workspace::Workspace;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use std::io::{Cursor, Read};
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn app(root: &std::path::Path) -> Router {
        let state = AppState::new(
            Workspace::ensure(root).unwrap(),
            ProjectTypes::builtin(),
            RepositoryFetcher::new(1),
            DEFAULT_IDLE_TIMEOUT,
        );
        create_router(state)
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Vec<u8>) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes().to_vec();
        (status, bytes)
    }

    async fn send_json(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let (status, bytes) = send(app, method, uri, body).await;
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn lists_project_types() {
        let temp = TempDir::new().unwrap();
        let app = app(temp.path());

        let (status, body) = send_json(&app, "GET", "/api/v1/project-types", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["name"], "UI");
        assert_eq!(body[0]["candidates"], json!(["build", "dist", "out"]));
        assert_eq!(body[1]["name"], "Microservice");
    }

    #[tokio::test]
    async fn build_without_branch_is_a_warning() {
        let temp = TempDir::new().unwrap();
        let app = app(temp.path());

        let (status, session) = send_json(&app, "POST", "/api/v1/sessions", None).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(session["phase"], "idle");
        assert_eq!(session["project_type"], "UI");
        let id = session["id"].as_str().unwrap().to_string();

        let (status, view) = send_json(&app, "POST", &format!("/api/v1/sessions/{id}/build"), None).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(view["phase"], "idle");
        assert_eq!(view["notices"][0]["level"], "warning");
        assert_eq!(
            view["notices"][0]["message"],
            "Please provide a repository URL and select a branch."
        );
        assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn unknown_session_is_not_found() {
        let temp = TempDir::new().unwrap();
        let app = app(temp.path());

        let (status, body) = send_json(&app, "GET", "/api/v1/sessions/missing", None).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Session not found: missing");
        assert_eq!(body["level"], "error");
    }

    #[tokio::test]
    async fn fetch_failure_reports_bad_gateway() {
        let temp = TempDir::new().unwrap();
        let app = app(temp.path());
        let (_, session) = send_json(&app, "POST", "/api/v1/sessions", None).await;
        let id = session["id"].as_str().unwrap().to_string();
        let missing = temp.path().join("absent.git").to_string_lossy().to_string();

        let (status, view) = send_json(
            &app,
            "POST",
            &format!("/api/v1/sessions/{id}/branches"),
            Some(json!({ "url": missing })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(view["phase"], "idle");
        assert_eq!(view["notices"][0]["level"], "error");
    }

    #[tokio::test]
    async fn fetch_select_build_and_download() {
        let origin = FixtureOrigin::new();
        let temp = TempDir::new().unwrap();
        let app = app(temp.path());

        let (_, session) = send_json(&app, "POST", "/api/v1/sessions", None).await;
        let id = session["id"].as_str().unwrap().to_string();

        let (status, view) = send_json(
            &app,
            "POST",
            &format!("/api/v1/sessions/{id}/branches"),
            Some(json!({ "url": origin.url() })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["phase"], "branches_fetched");
        assert_eq!(view["branches"], json!(["dev", "main"]));

        let (status, view) = send_json(
            &app,
            "PUT",
            &format!("/api/v1/sessions/{id}/selection"),
            Some(json!({ "branch": "main", "project_type": "UI" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["selected_branch"], "main");

        let (status, view) = send_json(&app, "POST", &format!("/api/v1/sessions/{id}/build"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["phase"], "packaged");
        assert_eq!(view["archive"]["file_name"], "demo-main-UI.zip");
        assert_eq!(view["archive"]["source_folder"], "build");
        assert!(temp.path().join("demo-main").is_dir());
        assert!(temp.path().join("demo-main-UI.zip").is_file());

        let download_url = view["archive"]["download_url"].as_str().unwrap().to_string();
        let (status, bytes) = send(&app, "GET", &download_url, None).await;
        assert_eq!(status, StatusCode::OK);

        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut names: Vec<String> = archive.file_names().map(|n| n.to_string()).collect();
        names.sort();
        assert_eq!(names, vec!["index.html", "static/app.css"]);

        let mut index = String::new();
        archive.by_name("index.html").unwrap().read_to_string(&mut index).unwrap();
        assert_eq!(index, "<html>main</html>\n");
    }

    #[tokio::test]
    async fn download_before_build_is_rejected() {
        let temp = TempDir::new().unwrap();
        let app = app(temp.path());
        let (_, session) = send_json(&app, "POST", "/api/v1/sessions", None).await;
        let id = session["id"].as_str().unwrap().to_string();

        let (status, body) = send_json(&app, "GET", &format!("/api/v1/sessions/{id}/archive"), None).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["level"], "warning");
    }

    #[tokio::test]
    async fn deleted_session_is_gone() {
        let temp = TempDir::new().unwrap();
        let app = app(temp.path());
        let (_, session) = send_json(&app, "POST", "/api/v1/sessions", None).await;
        let id = session["id"].as_str().unwrap().to_string();

        let (status, _) = send(&app, "DELETE", &format!("/api/v1/sessions/{id}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = send(&app, "GET", &format!("/api/v1/sessions/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
