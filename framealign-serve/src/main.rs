mod routes;

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use framealign_marker::{DarkSquareDetector, MarkerDetector};

/// Immutable per-process configuration and collaborators. Requests share
/// it read-only; every estimation call is a pure function of its input.
pub struct AppState {
    pub detector: Box<dyn MarkerDetector + Send + Sync>,
    pub marker_side: f64,
    pub archive_dir: Option<PathBuf>,
}

fn env_f64(name: &str, default: f64) -> f64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let addr = std::env::var("FRAMEALIGN_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let marker_side = env_f64("FRAMEALIGN_MARKER_SIDE", 0.066);
    let archive_dir = std::env::var("FRAMEALIGN_ARCHIVE_DIR").ok().map(PathBuf::from);

    if let Some(dir) = &archive_dir {
        std::fs::create_dir_all(dir)?;
        log::info!("🗃️ Archiving uploads to {}", dir.display());
    }

    let state = Arc::new(AppState {
        detector: Box::new(DarkSquareDetector::default()),
        marker_side,
        archive_dir,
    });

    log::info!("🚀 Starting the server");
    log::info!("🔥 Listening on: http://{addr}");
    log::info!("📐 Marker side length: {marker_side} m");
    log::info!("🔧 Press Ctrl+C to stop the server");

    // build our application with the three estimation routes
    let app = Router::new()
        .route("/", get(|| async { "Welcome to framealign!" }))
        .route("/api/v0/estimate-pose", post(routes::estimate_pose))
        .route("/api/v0/match-pairs", post(routes::match_pairs))
        .route("/api/v0/path-finding", post(routes::path_finding))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
