//! HTTP API server for integration with other systems.
//!
//! Provides REST endpoints for script generation, downloads and health checks.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::error::PodscriptError;
use crate::models::{GenerationRequest, ScriptMetadata};
use crate::orchestrator::{Orchestrator, PipelineOutput};
use crate::source::load_source;
use crate::store::{OutputStore, SavedFiles};
use axum::{
    extract::{DefaultBodyLimit, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Shared application state.
struct AppState {
    /// `None` when the pipeline could not be built (usually missing API keys).
    orchestrator: Option<Arc<Orchestrator>>,
    settings: Arc<Settings>,
    store: OutputStore,
}

/// Run the HTTP API server.
pub async fn run_serve(host: Option<String>, port: Option<u16>, settings: Settings) -> anyhow::Result<()> {
    let host = host.unwrap_or_else(|| settings.server.host.clone());
    let port = port.unwrap_or(settings.server.port);

    if let Err(e) = preflight::check(Operation::Serve, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'podscript doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let store = OutputStore::new(settings.output_dir());
    store.ensure_dirs()?;

    let orchestrator = match Orchestrator::from_settings(settings.clone()) {
        Ok(o) => Some(Arc::new(o)),
        Err(e) => {
            Output::warning(&format!("Pipeline not ready: {}", e));
            None
        }
    };

    let state = Arc::new(AppState {
        orchestrator,
        settings: Arc::new(settings),
        store,
    });

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("Podscript API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /api/health");
    Output::kv("Generate", "POST /api/generate");
    Output::kv("Download", "GET  /api/download/{path}");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, router(state)).await?;

    Ok(())
}

fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health))
        .route("/api/generate", post(generate))
        .route("/api/download/{*path}", get(download))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors)
        .with_state(state)
}

// === Request/Response Types ===

#[derive(Deserialize)]
struct GenerateBody {
    /// Text or an http(s) URL
    source: String,
    #[serde(default)]
    podcast_name: Option<String>,
    #[serde(default)]
    host_name: Option<String>,
    #[serde(default, alias = "max_concepts")]
    max_chapters: Option<u32>,
    #[serde(default)]
    skip_elaborate: bool,
    #[serde(default)]
    skip_polish: bool,
    #[serde(default = "default_save_analysis")]
    save_analysis: bool,
}

fn default_save_analysis() -> bool {
    true
}

/// Successful generation, as returned by the API and `generate --json`.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct GenerateResponse {
    pub success: bool,
    pub script: String,
    pub script_file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis_file: Option<String>,
    pub metadata: ScriptMetadata,
}

impl GenerateResponse {
    pub(crate) fn from_output(output: PipelineOutput, saved: SavedFiles) -> Self {
        Self {
            success: true,
            script: output.result.script,
            script_file: saved.script,
            analysis_file: saved.analysis,
            metadata: output.result.metadata,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: String,
}

#[derive(Serialize, Deserialize)]
struct HealthResponse {
    status: String,
    pipeline_ready: bool,
    api_keys_configured: bool,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            success: false,
            error: message.into(),
        }),
    )
        .into_response()
}

/// Status code for a failed run.
fn status_for(err: &PodscriptError) -> StatusCode {
    match err.root() {
        PodscriptError::InvalidRequest(_) | PodscriptError::SourceLoad(_) => StatusCode::BAD_REQUEST,
        PodscriptError::Config(_) => StatusCode::SERVICE_UNAVAILABLE,
        PodscriptError::AnalysisFailed(_)
        | PodscriptError::GenerationFailed(_)
        | PodscriptError::Upstream { .. }
        | PodscriptError::Http(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

// === Handlers ===

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let pipeline_ready = state
        .orchestrator
        .as_ref()
        .map(|o| o.is_ready())
        .unwrap_or(false);

    Json(HealthResponse {
        status: "healthy".to_string(),
        pipeline_ready,
        api_keys_configured: state.settings.api.keys_configured(),
    })
}

async fn generate(State(state): State<Arc<AppState>>, Json(body): Json<GenerateBody>) -> Response {
    let Some(orchestrator) = state.orchestrator.clone() else {
        return error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "Pipeline not initialized. Check API keys.",
        );
    };

    if body.source.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Source content is required");
    }

    let source = match load_source(&body.source, false).await {
        Ok(s) => s.text,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
    };

    let defaults = &state.settings;
    let request = GenerationRequest::new(
        source,
        body.podcast_name.unwrap_or_else(|| defaults.podcast.name.clone()),
        body.host_name.unwrap_or_else(|| defaults.podcast.host.clone()),
        body.max_chapters.unwrap_or(defaults.pipeline.default_chapters),
    )
    .skip_elaborate(body.skip_elaborate)
    .skip_polish(body.skip_polish);

    info!(
        "Generating script for '{}' ({} characters)",
        request.podcast_name,
        request.source.len()
    );

    let output = match orchestrator.run_with_analysis(&request).await {
        Ok(output) => output,
        Err(e) => {
            let status = status_for(&e);
            if status.is_server_error() {
                error!("Generation failed: {}", e);
            } else {
                warn!("Generation rejected: {}", e);
            }
            return error_response(status, e.to_string());
        }
    };

    match state.store.save(&output, body.save_analysis) {
        Ok(saved) => Json(GenerateResponse::from_output(output, saved)).into_response(),
        Err(e) => {
            error!("Failed to save script: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

async fn download(State(state): State<Arc<AppState>>, Path(path): Path<String>) -> Response {
    let full = match state.store.resolve_download(&path) {
        Ok(p) => p,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
    };

    let bytes = match tokio::fs::read(&full).await {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return error_response(StatusCode::NOT_FOUND, "File not found")
        }
        Err(e) => return error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    };

    let file_name = full
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "download".to_string());
    let content_type = if file_name.ends_with(".json") {
        "application/json"
    } else {
        "text/plain; charset=utf-8"
    };

    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name),
            ),
        ],
        bytes,
    )
        .into_response()
}
