//! Build Packager - clone a branch, find its build output, download it as a zip
//!
//! # Usage
//! ```bash
//! build-packager                                 # Serve on 127.0.0.1:3001
//! build-packager --open                          # Start and open browser
//! build-packager --workspace /tmp/packager       # Keep clones and zips elsewhere
//! build-packager --project-types types.json      # Custom project-type table
//! ```

mod build;
mod config;
mod error;
mod git;
mod models;
mod package;
mod routes;
mod session;
mod state;
mod workspace;

use std::path::PathBuf;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use clap::Parser;
use rust_embed::Embed;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::ProjectTypes;
use git::RepositoryFetcher;
use state::AppState;
use workspace::Workspace;

/// Embedded single-page form
#[derive(Embed)]
#[folder = "assets"]
struct Assets;

/// Build Packager - package a repository's build folder from your browser
#[derive(Parser)]
#[command(name = "build-packager")]
#[command(about = "Clone a branch, locate its build folder and download it as a zip", long_about = None)]
struct Cli {
    /// Directory holding clones and produced archives
    #[arg(short, long, default_value = "workspace")]
    workspace: PathBuf,

    /// JSON file with the project-type table (defaults to UI and Microservice)
    #[arg(long, value_name = "FILE")]
    project_types: Option<PathBuf>,

    /// History depth used when listing branches (0 fetches everything)
    #[arg(long, default_value = "1")]
    shallow_depth: i32,

    /// Minutes before an untouched session is dropped
    #[arg(long, default_value = "60")]
    session_idle_minutes: u64,

    /// Open browser automatically after starting
    #[arg(short, long)]
    open: bool,

    /// Port to run the server on
    #[arg(short, long, default_value = "3001")]
    port: u16,
}

/// Serve embedded static files
async fn serve_static(req: Request<Body>) -> Response {
    let path = req.uri().path().trim_start_matches('/');

    // Default to index.html for root or non-file paths
    let path = if path.is_empty() || !path.contains('.') {
        "index.html"
    } else {
        path
    };

    match Assets::get(path) {
        Some(content) => {
            let mime = mime_guess::from_path(path).first_or_octet_stream();
            (
                [(header::CONTENT_TYPE, mime.as_ref().to_string())],
                content.data.into_owned(),
            )
                .into_response()
        }
        None => (StatusCode::NOT_FOUND, "Not Found").into_response(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "build_packager=info,tower_http=warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let project_types = match &cli.project_types {
        Some(path) => ProjectTypes::from_json_file(path)?,
        None => ProjectTypes::builtin(),
    };

    let workspace = match Workspace::ensure(&cli.workspace) {
        Ok(w) => w,
        Err(e) => {
            eprintln!("✗ Failed to prepare workspace: {}", e);
            eprintln!("  Path: {}", cli.workspace.display());
            std::process::exit(1);
        }
    };

    let workspace_path = std::fs::canonicalize(workspace.root())
        .unwrap_or_else(|_| workspace.root().to_path_buf())
        .to_string_lossy()
        .to_string();
    let type_names = project_types.names().join(", ");

    let state = AppState::new(
        workspace,
        project_types,
        RepositoryFetcher::new(cli.shallow_depth),
        Duration::from_secs(cli.session_idle_minutes * 60),
    );

    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build the router with API routes and static file serving
    let app = Router::new()
        .merge(routes::create_router(state))
        .fallback(get(serve_static))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // Bind to the port
    let addr = format!("127.0.0.1:{}", cli.port);
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("✗ Failed to bind to port {}: {}", cli.port, e);
            eprintln!("  Try a different port with --port <PORT>");
            std::process::exit(1);
        }
    };

    // Print startup message
    let url = format!("http://127.0.0.1:{}", cli.port);
    println!();
    println!("  ┌─────────────────────────────────────────────┐");
    println!("  │               Build Packager                │");
    println!("  └─────────────────────────────────────────────┘");
    println!();
    println!("  Workspace:     {}", workspace_path);
    println!("  Project types: {}", type_names);
    println!("  Server:        {}", url);
    println!();
    println!("  Press Ctrl+C to stop");
    println!();

    // Open browser if requested
    if cli.open {
        if let Err(e) = open::that(&url) {
            eprintln!("  Warning: Could not open browser: {}", e);
        }
    }

    // Set up graceful shutdown
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
        println!("\n  Shutting down...");
    };

    // Start the server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
