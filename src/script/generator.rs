//! Script generation backed by the generation model.

use super::{clean_script, Drafter, Elaborator, Polisher};
use crate::config::{DraftMode, PipelineSettings, Prompts};
use crate::error::{PodscriptError, Result};
use crate::llm::{CompletionRequest, TextModel};
use crate::models::{AnalysisResult, Chapter, ScriptStage, StageName};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};

const DEFAULT_STYLE: &str = "conversational and engaging";

/// Drafts, elaborates and polishes scripts with a single text model.
pub struct ScriptGenerator {
    model: Arc<dyn TextModel>,
    prompts: Prompts,
    settings: PipelineSettings,
    style: String,
}

impl ScriptGenerator {
    pub fn new(model: Arc<dyn TextModel>) -> Self {
        Self::with_settings(model, PipelineSettings::default())
    }

    pub fn with_settings(model: Arc<dyn TextModel>, settings: PipelineSettings) -> Self {
        Self {
            model,
            prompts: Prompts::default(),
            settings,
            style: DEFAULT_STYLE.to_string(),
        }
    }

    /// Set custom prompts (with user-defined variables).
    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    /// Set the style description injected into prompts.
    pub fn with_style(mut self, style: &str) -> Self {
        self.style = style.to_string();
        self
    }

    /// Send a prompt and return the non-empty response.
    async fn generate(&self, what: &str, prompt: String, temperature: f32) -> Result<String> {
        let system = self
            .prompts
            .render_with_custom(&self.prompts.script.system, &HashMap::new());
        let request = CompletionRequest::new(prompt)
            .with_system(system)
            .with_temperature(temperature)
            .with_max_tokens(self.settings.max_tokens);

        let text = self.model.complete(&request).await.map_err(|e| {
            PodscriptError::GenerationFailed(format!(
                "{} request to {} failed: {}",
                what,
                self.model.provider(),
                e
            ))
        })?;

        if text.trim().is_empty() {
            return Err(PodscriptError::GenerationFailed(format!(
                "{} returned an empty {}",
                self.model.provider(),
                what
            )));
        }

        Ok(text)
    }

    fn base_vars(&self, analysis: &AnalysisResult, podcast_name: &str, host_name: &str) -> HashMap<String, String> {
        let theme = analysis
            .theme
            .clone()
            .or_else(|| analysis.chapters.first().map(|c| c.title.clone()))
            .unwrap_or_default();

        let mut vars = HashMap::new();
        vars.insert("podcast_name".to_string(), podcast_name.to_string());
        vars.insert("host_name".to_string(), host_name.to_string());
        vars.insert("style".to_string(), self.style.clone());
        vars.insert("theme".to_string(), theme);
        vars.insert(
            "source_excerpt".to_string(),
            analysis.source_excerpt(self.settings.source_excerpt_chars),
        );
        vars
    }

    async fn draft_single(
        &self,
        analysis: &AnalysisResult,
        podcast_name: &str,
        host_name: &str,
    ) -> Result<String> {
        let mut vars = self.base_vars(analysis, podcast_name, host_name);
        vars.insert("chapters".to_string(), format_chapters(&analysis.chapters));

        let prompt = self.prompts.render_with_custom(&self.prompts.script.draft, &vars);
        self.generate("draft", prompt, self.settings.draft_temperature)
            .await
    }

    async fn draft_sectioned(
        &self,
        analysis: &AnalysisResult,
        podcast_name: &str,
        host_name: &str,
    ) -> Result<String> {
        let base = self.base_vars(analysis, podcast_name, host_name);
        let count = analysis.chapters.len();
        let mut sections = Vec::with_capacity(count);

        for (i, chapter) in analysis.chapters.iter().enumerate() {
            info!("Drafting section {}/{}: {}", i + 1, count, chapter.title);

            let mut vars = base.clone();
            vars.insert("section_number".to_string(), (i + 1).to_string());
            vars.insert("section_count".to_string(), count.to_string());
            vars.insert("title".to_string(), chapter.title.clone());
            vars.insert("summary".to_string(), chapter.summary.clone());
            vars.insert("key_points".to_string(), format_key_points(chapter));

            let prompt = self.prompts.render_with_custom(&self.prompts.script.section, &vars);
            let section = self
                .generate(
                    &format!("section {}", i + 1),
                    prompt,
                    self.settings.draft_temperature,
                )
                .await?;
            sections.push(section.trim().to_string());
        }

        let title = match base.get("theme") {
            Some(theme) if !theme.is_empty() => format!("{}: {}", podcast_name, theme),
            _ => podcast_name.to_string(),
        };

        Ok(format!("{}\n\n{}", title, sections.join("\n\n")))
    }

    fn refine_vars(&self, stage: &ScriptStage) -> HashMap<String, String> {
        let mut vars = HashMap::new();
        vars.insert("script".to_string(), stage.text.clone());
        vars.insert("style".to_string(), self.style.clone());
        vars
    }
}

/// Numbered chapter list with key points, in chapter order.
fn format_chapters(chapters: &[Chapter]) -> String {
    chapters
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let mut entry = format!("{}. {}: {}", i + 1, c.title, c.summary);
            for point in &c.key_points {
                entry.push_str(&format!("\n   - {}", point));
            }
            entry
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_key_points(chapter: &Chapter) -> String {
    if chapter.key_points.is_empty() {
        return format!("- {}", chapter.summary);
    }
    chapter
        .key_points
        .iter()
        .map(|p| format!("- {}", p))
        .collect::<Vec<_>>()
        .join("\n")
}

#[async_trait]
impl Drafter for ScriptGenerator {
    #[instrument(skip(self, analysis), fields(chapters = analysis.chapters.len(), mode = %self.settings.draft_mode))]
    async fn draft(
        &self,
        analysis: &AnalysisResult,
        podcast_name: &str,
        host_name: &str,
    ) -> Result<ScriptStage> {
        if analysis.chapters.is_empty() {
            return Err(PodscriptError::GenerationFailed(
                "cannot draft a script without chapters".to_string(),
            ));
        }

        let text = match self.settings.draft_mode {
            DraftMode::Single => self.draft_single(analysis, podcast_name, host_name).await?,
            DraftMode::Sectioned => {
                self.draft_sectioned(analysis, podcast_name, host_name)
                    .await?
            }
        };

        info!("Draft generated: {} characters", text.len());
        Ok(ScriptStage::new(text, StageName::Draft))
    }
}

#[async_trait]
impl Elaborator for ScriptGenerator {
    #[instrument(skip(self, stage), fields(input_words = stage.word_count()))]
    async fn elaborate(&self, stage: &ScriptStage) -> Result<ScriptStage> {
        let prompt = self
            .prompts
            .render_with_custom(&self.prompts.script.elaborate, &self.refine_vars(stage));
        let text = self
            .generate("elaboration", prompt, self.settings.elaborate_temperature)
            .await?;

        info!("Script elaborated: {} characters", text.len());
        Ok(ScriptStage::new(text, StageName::Elaborated))
    }
}

#[async_trait]
impl Polisher for ScriptGenerator {
    #[instrument(skip(self, stage), fields(input_words = stage.word_count()))]
    async fn polish(&self, stage: &ScriptStage) -> Result<ScriptStage> {
        let prompt = self
            .prompts
            .render_with_custom(&self.prompts.script.polish, &self.refine_vars(stage));
        let raw = self
            .generate("polish", prompt, self.settings.polish_temperature)
            .await?;

        let text = clean_script(&raw);
        if text.is_empty() {
            return Err(PodscriptError::GenerationFailed(
                "polished script was empty after cleanup".to_string(),
            ));
        }

        info!("Script polished: {} characters", text.len());
        Ok(ScriptStage::new(text, StageName::Polished))
    }
}
