//! Parsing of analysis model responses.
//!
//! Models wrap JSON in markdown fences or surround it with prose, and the field
//! names drift between runs. Everything is normalized here so malformed data
//! never leaves the analyzer.

use crate::error::{PodscriptError, Result};
use crate::models::Chapter;
use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;

/// Analysis payload as returned by the model.
#[derive(Debug, Deserialize)]
pub struct RawAnalysis {
    #[serde(default, alias = "main_theme")]
    pub theme: Option<String>,
    #[serde(default)]
    pub tone: Option<String>,
    #[serde(default)]
    pub audience: Option<String>,
    #[serde(alias = "concepts", alias = "sections")]
    pub chapters: Vec<RawChapter>,
}

#[derive(Debug, Deserialize)]
pub struct RawChapter {
    #[serde(default, alias = "name")]
    pub title: Option<String>,
    #[serde(default, alias = "description", alias = "focus")]
    pub summary: Option<String>,
    #[serde(default)]
    pub key_points: Vec<String>,
}

fn fence_regex() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| {
        Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```").expect("fence regex is valid")
    })
}

/// Locate the JSON object inside a model response.
pub fn extract_json_object(response: &str) -> Option<&str> {
    if let Some(captures) = fence_regex().captures(response) {
        if let Some(m) = captures.get(1) {
            return Some(m.as_str());
        }
    }

    let start = response.find('{')?;
    let end = response.rfind('}')?;
    (end > start).then(|| &response[start..=end])
}

/// Parse and validate an analysis response.
///
/// Chapters with a missing or blank title or summary are rejected, not skipped.
pub fn parse_analysis(response: &str) -> Result<RawAnalysis> {
    let json = extract_json_object(response).ok_or_else(|| {
        PodscriptError::AnalysisFailed(format!(
            "response contained no JSON object: {}",
            snippet(response)
        ))
    })?;

    let raw: RawAnalysis = serde_json::from_str(json).map_err(|e| {
        PodscriptError::AnalysisFailed(format!(
            "could not parse analysis JSON: {}. Response was: {}",
            e,
            snippet(response)
        ))
    })?;

    for (i, chapter) in raw.chapters.iter().enumerate() {
        if is_blank(&chapter.title) {
            return Err(PodscriptError::AnalysisFailed(format!(
                "chapter {} is missing a title",
                i + 1
            )));
        }
        if is_blank(&chapter.summary) {
            return Err(PodscriptError::AnalysisFailed(format!(
                "chapter {} is missing a summary",
                i + 1
            )));
        }
    }

    Ok(raw)
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map(str::trim).unwrap_or("").is_empty()
}

fn snippet(response: &str) -> String {
    response.chars().take(300).collect()
}

impl RawChapter {
    /// Convert into a [`Chapter`]. Only call on chapters that passed [`parse_analysis`].
    pub fn into_chapter(self) -> Chapter {
        Chapter {
            title: self.title.unwrap_or_default().trim().to_string(),
            summary: self.summary.unwrap_or_default().trim().to_string(),
            key_points: self
                .key_points
                .into_iter()
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }
}
