//! Script generation stages: draft, elaborate and polish.
//!
//! Each stage is its own trait so the orchestrator can be driven by any
//! combination of implementations. [`ScriptGenerator`] implements all three on
//! top of a single generation model.

mod cleanup;
mod generator;

pub use cleanup::clean_script;
pub use generator::ScriptGenerator;

use crate::error::Result;
use crate::models::{AnalysisResult, ScriptStage};
use async_trait::async_trait;

/// Produces the first-pass script from an analysis.
#[async_trait]
pub trait Drafter: Send + Sync {
    async fn draft(
        &self,
        analysis: &AnalysisResult,
        podcast_name: &str,
        host_name: &str,
    ) -> Result<ScriptStage>;
}

/// Expands a script with examples and detail.
#[async_trait]
pub trait Elaborator: Send + Sync {
    async fn elaborate(&self, stage: &ScriptStage) -> Result<ScriptStage>;
}

/// Final refinement pass over a script.
#[async_trait]
pub trait Polisher: Send + Sync {
    async fn polish(&self, stage: &ScriptStage) -> Result<ScriptStage>;
}
