//! Request, intermediate and result types for the script pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A request to turn source content into a podcast script.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationRequest {
    /// Source text to build the episode from.
    pub source: String,
    pub podcast_name: String,
    pub host_name: String,
    /// Upper bound on the number of chapters extracted by analysis.
    #[serde(alias = "max_concepts")]
    pub max_chapters: u32,
    #[serde(default)]
    pub skip_elaborate: bool,
    #[serde(default)]
    pub skip_polish: bool,
}

impl GenerationRequest {
    pub fn new(
        source: impl Into<String>,
        podcast_name: impl Into<String>,
        host_name: impl Into<String>,
        max_chapters: u32,
    ) -> Self {
        Self {
            source: source.into(),
            podcast_name: podcast_name.into(),
            host_name: host_name.into(),
            max_chapters,
            skip_elaborate: false,
            skip_polish: false,
        }
    }

    pub fn skip_elaborate(mut self, skip: bool) -> Self {
        self.skip_elaborate = skip;
        self
    }

    pub fn skip_polish(mut self, skip: bool) -> Self {
        self.skip_polish = skip;
        self
    }
}

/// A theme unit extracted from the source, covered by one segment of the script.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chapter {
    pub title: String,
    pub summary: String,
    #[serde(default)]
    pub key_points: Vec<String>,
}

impl Chapter {
    pub fn new(title: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            summary: summary.into(),
            key_points: Vec::new(),
        }
    }
}

/// Structured output of the content analyzer.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AnalysisResult {
    /// Chapters in the order they should be discussed.
    pub chapters: Vec<Chapter>,
    /// The source split into size-bounded segments.
    pub chunked_source: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audience: Option<String>,
}

impl AnalysisResult {
    /// Leading source chunks joined with blank lines, bounded by `max_chars`.
    ///
    /// Always includes at least part of the first chunk.
    pub fn source_excerpt(&self, max_chars: usize) -> String {
        let mut excerpt = String::new();
        for chunk in &self.chunked_source {
            let separator = if excerpt.is_empty() { 0 } else { 2 };
            let used = excerpt.chars().count();
            let len = chunk.chars().count();

            if used + separator + len <= max_chars {
                if separator > 0 {
                    excerpt.push_str("\n\n");
                }
                excerpt.push_str(chunk);
            } else {
                if excerpt.is_empty() {
                    excerpt.extend(chunk.chars().take(max_chars));
                }
                break;
            }
        }
        excerpt
    }
}

/// Script pipeline stage that produced a piece of text.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum StageName {
    Draft,
    Elaborated,
    Polished,
}

impl std::fmt::Display for StageName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StageName::Draft => write!(f, "draft"),
            StageName::Elaborated => write!(f, "elaborated"),
            StageName::Polished => write!(f, "polished"),
        }
    }
}

/// The text produced by one script stage. Each stage replaces the previous text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScriptStage {
    pub text: String,
    pub stage: StageName,
}

impl ScriptStage {
    pub fn new(text: impl Into<String>, stage: StageName) -> Self {
        Self {
            text: text.into(),
            stage,
        }
    }

    pub fn word_count(&self) -> usize {
        count_words(&self.text)
    }
}

/// Final output of a pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationResult {
    pub script: String,
    pub metadata: ScriptMetadata,
}

/// Facts about a generated script.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScriptMetadata {
    pub run_id: Uuid,
    /// Whitespace-delimited token count of `script`.
    pub word_count: usize,
    /// Wall-clock time from validation to the end of the last executed stage.
    pub duration_seconds: f64,
    #[serde(alias = "num_concepts")]
    pub num_chapters: usize,
    /// When the run started.
    pub timestamp: DateTime<Utc>,
    pub podcast_name: String,
    pub host_name: String,
    /// First 200 characters of the source.
    pub source_preview: String,
    /// Length of the script in characters.
    pub script_length: usize,
    /// Script stages that ran, in order.
    pub stages: Vec<StageName>,
}

/// Count whitespace-delimited words.
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

/// The first `max_chars` characters of `text`.
pub fn preview(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
