//! Error types for Podscript.

use std::time::Duration;
use thiserror::Error;

use crate::orchestrator::PipelineState;

/// Library-level error type for Podscript operations.
#[derive(Error, Debug)]
pub enum PodscriptError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Content analysis failed: {0}")]
    AnalysisFailed(String),

    #[error("Script generation failed: {0}")]
    GenerationFailed(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// A pipeline stage failed; carries the stage and the time spent before it failed.
    #[error("{stage} stage failed after {:.1}s: {source}", .elapsed.as_secs_f64())]
    Stage {
        stage: PipelineState,
        elapsed: Duration,
        #[source]
        source: Box<PodscriptError>,
    },

    #[error("{provider} API error{}: {message}", .status.map(|s| format!(" (HTTP {})", s)).unwrap_or_default())]
    Upstream {
        provider: String,
        status: Option<u16>,
        message: String,
    },

    #[error("Failed to load source: {0}")]
    SourceLoad(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl PodscriptError {
    /// Whether a transport-level retry could succeed.
    ///
    /// Only network failures, timeouts, rate limits and server errors qualify.
    /// Parse failures and client errors are never retried.
    pub fn is_transient(&self) -> bool {
        match self {
            PodscriptError::Http(e) => e.is_timeout() || e.is_connect(),
            PodscriptError::Upstream {
                status: Some(status),
                ..
            } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// The originating error, looking through stage wrappers.
    pub fn root(&self) -> &PodscriptError {
        match self {
            PodscriptError::Stage { source, .. } => source.root(),
            other => other,
        }
    }

    /// The pipeline stage that failed, if this error came out of a pipeline run.
    pub fn failed_stage(&self) -> Option<PipelineState> {
        match self {
            PodscriptError::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Whether the caller supplied bad input (as opposed to an upstream failure).
    pub fn is_invalid_request(&self) -> bool {
        matches!(self.root(), PodscriptError::InvalidRequest(_))
    }
}

/// Result type alias for Podscript operations.
pub type Result<T> = std::result::Result<T, PodscriptError>;
