//! Content analysis: chunk the source and extract chapters with the analysis model.

mod chunker;
mod parse;

pub use chunker::{chunk_text, ChunkingConfig};
pub use parse::{extract_json_object, parse_analysis, RawAnalysis, RawChapter};

use crate::config::{PipelineSettings, Prompts};
use crate::error::{PodscriptError, Result};
use crate::llm::{CompletionRequest, TextModel};
use crate::models::AnalysisResult;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Trait for the content analysis stage.
#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Extract at most `max_chapters` chapters from `source`.
    async fn analyze(&self, source: &str, max_chapters: u32) -> Result<AnalysisResult>;
}

/// Analyzer backed by a text model.
pub struct TextAnalyzer {
    model: Arc<dyn TextModel>,
    prompts: Prompts,
    chunking: ChunkingConfig,
    excerpt_chars: usize,
    temperature: f32,
}

impl TextAnalyzer {
    pub fn new(model: Arc<dyn TextModel>) -> Self {
        Self::with_settings(model, &PipelineSettings::default())
    }

    pub fn with_settings(model: Arc<dyn TextModel>, settings: &PipelineSettings) -> Self {
        Self {
            model,
            prompts: Prompts::default(),
            chunking: ChunkingConfig {
                chunk_size: settings.chunk_size,
                min_size: settings.min_chunk_size,
            },
            excerpt_chars: settings.analysis_excerpt_chars,
            temperature: settings.analysis_temperature,
        }
    }

    /// Set custom prompts (with user-defined variables).
    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    fn build_prompt(&self, excerpt: &str, max_chapters: u32) -> String {
        let mut vars = HashMap::new();
        vars.insert("source".to_string(), excerpt.to_string());
        vars.insert("max_chapters".to_string(), max_chapters.to_string());
        self.prompts
            .render_with_custom(&self.prompts.analysis.user, &vars)
    }
}

#[async_trait]
impl Analyzer for TextAnalyzer {
    #[instrument(skip(self, source), fields(source_len = source.len()))]
    async fn analyze(&self, source: &str, max_chapters: u32) -> Result<AnalysisResult> {
        let chunks = chunk_text(source, &self.chunking);
        info!("Analyzing source ({} characters, {} chunks)", source.len(), chunks.len());

        let mut analysis = AnalysisResult {
            chunked_source: chunks,
            ..Default::default()
        };

        let prompt = self.build_prompt(&analysis.source_excerpt(self.excerpt_chars), max_chapters);
        let system = self
            .prompts
            .render_with_custom(&self.prompts.analysis.system, &HashMap::new());
        let request = CompletionRequest::new(prompt)
            .with_system(system)
            .with_temperature(self.temperature);

        let response = self.model.complete(&request).await.map_err(|e| {
            PodscriptError::AnalysisFailed(format!("{} request failed: {}", self.model.provider(), e))
        })?;

        if response.trim().is_empty() {
            return Err(PodscriptError::AnalysisFailed(format!(
                "empty response from {}",
                self.model.provider()
            )));
        }

        debug!(
            "Analysis response: {}",
            response.chars().take(500).collect::<String>()
        );
        let raw = parse_analysis(&response)?;

        let mut chapters: Vec<_> = raw.chapters.into_iter().map(RawChapter::into_chapter).collect();
        if chapters.len() > max_chapters as usize {
            warn!(
                "Model returned {} chapters, keeping the first {}",
                chapters.len(),
                max_chapters
            );
            chapters.truncate(max_chapters as usize);
        }

        analysis.chapters = chapters;
        analysis.theme = raw.theme.filter(|t| !t.trim().is_empty());
        analysis.tone = raw.tone.filter(|t| !t.trim().is_empty());
        analysis.audience = raw.audience.filter(|t| !t.trim().is_empty());

        info!("Analysis complete: {} chapters", analysis.chapters.len());
        Ok(analysis)
    }
}
