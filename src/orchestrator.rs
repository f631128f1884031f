//! Pipeline orchestrator for Podscript.
//!
//! Coordinates the run from request validation through analysis, drafting,
//! elaboration and polishing. Stages run strictly in sequence inside one task;
//! the orchestrator itself holds only immutable shared state.

use crate::analysis::{Analyzer, TextAnalyzer};
use crate::config::{Prompts, Settings};
use crate::error::{PodscriptError, Result};
use crate::llm::{analysis_model, generation_model};
use crate::models::{
    count_words, preview, AnalysisResult, GenerationRequest, GenerationResult, ScriptMetadata,
    ScriptStage,
};
use crate::script::{Drafter, Elaborator, Polisher, ScriptGenerator};
use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument, warn};
use uuid::Uuid;

const SOURCE_PREVIEW_CHARS: usize = 200;

/// Where a pipeline run is, or where it stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Validating,
    Analyzing,
    Drafting,
    Elaborating,
    Polishing,
    Done,
    Failed,
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PipelineState::Validating => "validating",
            PipelineState::Analyzing => "analyzing",
            PipelineState::Drafting => "drafting",
            PipelineState::Elaborating => "elaborating",
            PipelineState::Polishing => "polishing",
            PipelineState::Done => "done",
            PipelineState::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

/// A successful run together with the analysis it was built from.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub result: GenerationResult,
    pub analysis: AnalysisResult,
}

/// The main orchestrator for the Podscript pipeline.
pub struct Orchestrator {
    settings: Arc<Settings>,
    analyzer: Arc<dyn Analyzer>,
    drafter: Arc<dyn Drafter>,
    elaborator: Arc<dyn Elaborator>,
    polisher: Arc<dyn Polisher>,
}

impl Orchestrator {
    /// Build an orchestrator with the Gemini analyzer and DeepSeek script generator.
    ///
    /// Fails with a configuration error when either API key is missing or the
    /// pipeline bounds are inconsistent.
    pub fn from_settings(settings: Settings) -> Result<Self> {
        settings.pipeline.validate()?;
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        info!(
            "Using {} for analysis and {} for generation",
            settings.api.gemini_model, settings.api.deepseek_model
        );

        let analyzer = Arc::new(
            TextAnalyzer::with_settings(analysis_model(&settings.api)?, &settings.pipeline)
                .with_prompts(prompts.clone()),
        );

        let generator = Arc::new(
            ScriptGenerator::with_settings(
                generation_model(&settings.api)?,
                settings.pipeline.clone(),
            )
            .with_prompts(prompts)
            .with_style(&settings.podcast.style),
        );

        Ok(Self::with_components(
            Arc::new(settings),
            analyzer,
            generator.clone(),
            generator.clone(),
            generator,
        ))
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(
        settings: Arc<Settings>,
        analyzer: Arc<dyn Analyzer>,
        drafter: Arc<dyn Drafter>,
        elaborator: Arc<dyn Elaborator>,
        polisher: Arc<dyn Polisher>,
    ) -> Self {
        Self {
            settings,
            analyzer,
            drafter,
            elaborator,
            polisher,
        }
    }

    /// Get the settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Ok when both upstream credentials are present and well-formed and the
    /// pipeline settings are consistent.
    pub fn check_ready(&self) -> Result<()> {
        self.settings.api.credentials()?;
        self.settings.pipeline.validate()
    }

    pub fn is_ready(&self) -> bool {
        self.check_ready().is_ok()
    }

    /// Check a request against the configured chapter bounds. Performs no I/O.
    pub fn validate(&self, request: &GenerationRequest) -> Result<()> {
        if request.source.trim().is_empty() {
            return Err(PodscriptError::InvalidRequest(
                "source text is empty".to_string(),
            ));
        }

        let pipeline = &self.settings.pipeline;
        if !(pipeline.min_chapters..=pipeline.max_chapters).contains(&request.max_chapters) {
            return Err(PodscriptError::InvalidRequest(format!(
                "max_chapters must be between {} and {}, got {}",
                pipeline.min_chapters, pipeline.max_chapters, request.max_chapters
            )));
        }

        Ok(())
    }

    /// Run the full pipeline and return the final script with its metadata.
    pub async fn run(&self, request: &GenerationRequest) -> Result<GenerationResult> {
        self.run_with_analysis(request).await.map(|out| out.result)
    }

    /// Run the full pipeline, also returning the analysis for callers that persist it.
    #[instrument(skip(self, request), fields(run_id = tracing::field::Empty, source_len = request.source.len(), max_chapters = request.max_chapters))]
    pub async fn run_with_analysis(&self, request: &GenerationRequest) -> Result<PipelineOutput> {
        let run_id = Uuid::new_v4();
        tracing::Span::current().record("run_id", tracing::field::display(run_id));

        let timestamp = Utc::now();
        let started = Instant::now();

        info!(state = %PipelineState::Validating, "Validating request");
        if let Err(e) = self.validate(request) {
            warn!("Rejected request: {}", e);
            return Err(e);
        }

        let podcast_name = non_blank(&request.podcast_name, &self.settings.podcast.name);
        let host_name = non_blank(&request.host_name, &self.settings.podcast.host);

        let analysis = stage(
            PipelineState::Analyzing,
            started,
            self.analyze(&request.source, request.max_chapters),
        )
        .await?;

        let mut script = stage(
            PipelineState::Drafting,
            started,
            self.drafter.draft(&analysis, podcast_name, host_name),
        )
        .await?;
        let mut stages = vec![script.stage];

        if request.skip_elaborate {
            info!("Skipping elaboration");
        } else {
            script = stage(
                PipelineState::Elaborating,
                started,
                self.elaborator.elaborate(&script),
            )
            .await?;
            stages.push(script.stage);
        }

        if request.skip_polish {
            info!("Skipping polish");
        } else {
            script = stage(
                PipelineState::Polishing,
                started,
                self.polisher.polish(&script),
            )
            .await?;
            stages.push(script.stage);
        }

        let duration_seconds = started.elapsed().as_secs_f64();
        let ScriptStage { text, .. } = script;

        let metadata = ScriptMetadata {
            run_id,
            word_count: count_words(&text),
            duration_seconds,
            num_chapters: analysis.chapters.len(),
            timestamp,
            podcast_name: podcast_name.to_string(),
            host_name: host_name.to_string(),
            source_preview: preview(&request.source, SOURCE_PREVIEW_CHARS),
            script_length: text.chars().count(),
            stages,
        };

        info!(
            state = %PipelineState::Done,
            "Generated {} words from {} chapters in {:.1}s",
            metadata.word_count,
            metadata.num_chapters,
            duration_seconds
        );

        Ok(PipelineOutput {
            result: GenerationResult {
                script: text,
                metadata,
            },
            analysis,
        })
    }

    /// Analyze the source; an analysis without chapters cannot be drafted.
    async fn analyze(&self, source: &str, max_chapters: u32) -> Result<AnalysisResult> {
        let analysis = self.analyzer.analyze(source, max_chapters).await?;
        if analysis.chapters.is_empty() {
            return Err(PodscriptError::AnalysisFailed(
                "no chapters found in source".to_string(),
            ));
        }
        Ok(analysis)
    }
}

/// Await one stage, wrapping its failure with the stage and the time elapsed since `started`.
async fn stage<T>(
    state: PipelineState,
    started: Instant,
    work: impl Future<Output = Result<T>>,
) -> Result<T> {
    info!(state = %state, "Entering stage");
    work.await.map_err(|e| {
        let elapsed = started.elapsed();
        warn!(state = %PipelineState::Failed, failed = %state, "Pipeline failed: {}", e);
        PodscriptError::Stage {
            stage: state,
            elapsed,
            source: Box::new(e),
        }
    })
}

fn non_blank<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.trim().is_empty() {
        fallback
    } else {
        value
    }
}
