//! Configuration settings for Podscript.

use crate::error::{PodscriptError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub api: ApiSettings,
    pub pipeline: PipelineSettings,
    pub podcast: PodcastSettings,
    pub server: ServerSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory where generated scripts and analysis files are written.
    pub output_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            output_dir: "~/.podscript/outputs".to_string(),
            log_level: "warn".to_string(),
        }
    }
}

/// Upstream API settings for the analysis (Gemini) and generation (DeepSeek) models.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    /// Google API key for Gemini. Usually supplied via `GOOGLE_API_KEY`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub google_api_key: Option<String>,
    /// DeepSeek API key. Usually supplied via `DEEPSEEK_KEY`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deepseek_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub deepseek_model: String,
    pub deepseek_base_url: String,
    /// Per-call request timeout in seconds.
    pub timeout_secs: u64,
    /// Additional attempts after a transient transport failure.
    pub max_retries: u32,
    /// Backoff before the first retry; doubles on each further retry.
    pub retry_base_delay_ms: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            google_api_key: None,
            deepseek_api_key: None,
            gemini_model: "gemini-2.5-flash".to_string(),
            gemini_base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            deepseek_model: "deepseek-reasoner".to_string(),
            deepseek_base_url: "https://api.deepseek.com".to_string(),
            timeout_secs: 120,
            max_retries: 2,
            retry_base_delay_ms: 1000,
        }
    }
}

impl ApiSettings {
    /// Per-call timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Both credentials, or a configuration error naming the first missing one.
    pub fn credentials(&self) -> Result<(&str, &str)> {
        let google = validate_key("GOOGLE_API_KEY", self.google_api_key.as_deref())?;
        let deepseek = validate_key("DEEPSEEK_KEY", self.deepseek_api_key.as_deref())?;
        Ok((google, deepseek))
    }

    /// True when both credentials are present and well-formed.
    pub fn keys_configured(&self) -> bool {
        self.credentials().is_ok()
    }
}

/// What is wrong with an API key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyIssue {
    Missing,
    Empty,
    Whitespace,
}

impl std::fmt::Display for KeyIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeyIssue::Missing => write!(f, "not set"),
            KeyIssue::Empty => write!(f, "empty"),
            KeyIssue::Whitespace => write!(f, "contains whitespace"),
        }
    }
}

/// Check an API key's shape without contacting the provider.
pub fn check_key(key: Option<&str>) -> std::result::Result<&str, KeyIssue> {
    match key {
        None => Err(KeyIssue::Missing),
        Some(k) if k.trim().is_empty() => Err(KeyIssue::Empty),
        Some(k) if k.chars().any(char::is_whitespace) => Err(KeyIssue::Whitespace),
        Some(k) => Ok(k),
    }
}

fn validate_key<'a>(name: &str, key: Option<&'a str>) -> Result<&'a str> {
    check_key(key).map_err(|issue| PodscriptError::Config(format!("{}: {}", name, issue)))
}

/// How the draft stage prompts the generation model.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DraftMode {
    /// One prompt covering every chapter.
    #[default]
    Single,
    /// One prompt per chapter, joined in chapter order.
    Sectioned,
}

impl std::str::FromStr for DraftMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "single" => Ok(DraftMode::Single),
            "sectioned" | "sections" => Ok(DraftMode::Sectioned),
            _ => Err(format!("Unknown draft mode: {}", s)),
        }
    }
}

impl std::fmt::Display for DraftMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DraftMode::Single => write!(f, "single"),
            DraftMode::Sectioned => write!(f, "sectioned"),
        }
    }
}

/// Pipeline behaviour and limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Smallest accepted chapter limit.
    pub min_chapters: u32,
    /// Largest accepted chapter limit.
    pub max_chapters: u32,
    /// Chapter limit used when a request does not specify one.
    pub default_chapters: u32,
    /// Target chunk size in characters.
    pub chunk_size: usize,
    /// A chunk is only closed once it holds at least this many characters.
    pub min_chunk_size: usize,
    /// Characters of source sent to the analysis model.
    pub analysis_excerpt_chars: usize,
    /// Characters of source embedded in draft prompts.
    pub source_excerpt_chars: usize,
    pub draft_mode: DraftMode,
    pub analysis_temperature: f32,
    pub draft_temperature: f32,
    pub elaborate_temperature: f32,
    pub polish_temperature: f32,
    /// Max tokens per generation call.
    pub max_tokens: u32,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            min_chapters: 1,
            max_chapters: 20,
            default_chapters: 12,
            chunk_size: 2000,
            min_chunk_size: 500,
            analysis_excerpt_chars: 8000,
            source_excerpt_chars: 12000,
            draft_mode: DraftMode::Single,
            analysis_temperature: 0.6,
            draft_temperature: 0.8,
            elaborate_temperature: 0.85,
            polish_temperature: 0.6,
            max_tokens: 8192,
        }
    }
}

impl PipelineSettings {
    /// Check that the configured bounds are usable.
    pub fn validate(&self) -> Result<()> {
        if self.min_chapters == 0 {
            return Err(PodscriptError::Config(
                "pipeline.min_chapters must be at least 1".to_string(),
            ));
        }
        if self.min_chapters > self.max_chapters {
            return Err(PodscriptError::Config(format!(
                "pipeline.min_chapters ({}) exceeds pipeline.max_chapters ({})",
                self.min_chapters, self.max_chapters
            )));
        }
        if !(self.min_chapters..=self.max_chapters).contains(&self.default_chapters) {
            return Err(PodscriptError::Config(format!(
                "pipeline.default_chapters ({}) is outside {}..={}",
                self.default_chapters, self.min_chapters, self.max_chapters
            )));
        }
        if self.chunk_size == 0 || self.min_chunk_size > self.chunk_size {
            return Err(PodscriptError::Config(
                "pipeline.chunk_size must be positive and not below pipeline.min_chunk_size"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

/// Default podcast identity, used when a request leaves names blank.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PodcastSettings {
    pub name: String,
    pub host: String,
    /// Style description injected into generation prompts.
    pub style: String,
}

impl Default for PodcastSettings {
    fn default() -> Self {
        Self {
            name: "My Podcast".to_string(),
            host: "Your Name".to_string(),
            style: "conversational and engaging, like Philosophize This".to_string(),
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file and the environment.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    ///
    /// Environment variables override values from the file.
    pub fn load_from(path: Option<&PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        let mut settings = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Settings::default()
        };

        settings.apply_env(|name| std::env::var(name).ok());
        Ok(settings)
    }

    /// Apply environment overrides through the given lookup.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("GOOGLE_API_KEY").filter(|k| !k.is_empty()) {
            self.api.google_api_key = Some(key);
        }
        if let Some(key) = lookup("DEEPSEEK_KEY")
            .or_else(|| lookup("DEEPSEEK_API_KEY"))
            .filter(|k| !k.is_empty())
        {
            self.api.deepseek_api_key = Some(key);
        }
        if let Some(dir) = lookup("PODSCRIPT_OUTPUT_DIR").filter(|d| !d.is_empty()) {
            self.general.output_dir = dir;
        }
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| PodscriptError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("podscript")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded output directory path.
    pub fn output_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.output_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.pipeline.max_chapters, 20);
        assert_eq!(settings.pipeline.default_chapters, 12);
        assert_eq!(settings.api.timeout_secs, 120);
        assert_eq!(settings.pipeline.draft_mode, DraftMode::Single);
        assert!(settings.pipeline.validate().is_ok());
        assert!(!settings.api.keys_configured());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [pipeline]
            max_chapters = 15
            draft_mode = "sectioned"

            [api]
            max_retries = 5
            "#,
        )
        .unwrap();

        assert_eq!(settings.pipeline.max_chapters, 15);
        assert_eq!(settings.pipeline.min_chapters, 1);
        assert_eq!(settings.pipeline.draft_mode, DraftMode::Sectioned);
        assert_eq!(settings.api.max_retries, 5);
        assert_eq!(settings.api.deepseek_model, "deepseek-reasoner");
    }

    #[test]
    fn test_env_overrides() {
        let mut settings = Settings::default();
        settings.apply_env(|name| match name {
            "GOOGLE_API_KEY" => Some("g-key".to_string()),
            "DEEPSEEK_API_KEY" => Some("d-key".to_string()),
            _ => None,
        });

        assert_eq!(settings.api.google_api_key.as_deref(), Some("g-key"));
        assert_eq!(settings.api.deepseek_api_key.as_deref(), Some("d-key"));
        assert!(settings.api.keys_configured());
    }

    #[test]
    fn test_credentials_rejects_blank_keys() {
        let mut api = ApiSettings {
            google_api_key: Some("g-key".to_string()),
            deepseek_api_key: Some("   ".to_string()),
            ..Default::default()
        };
        let err = api.credentials().unwrap_err();
        assert!(err.to_string().contains("DEEPSEEK_KEY"));

        api.deepseek_api_key = Some("d key".to_string());
        assert!(api.credentials().is_err());

        api.deepseek_api_key = Some("d-key".to_string());
        assert_eq!(api.credentials().unwrap(), ("g-key", "d-key"));
    }

    #[test]
    fn test_pipeline_validation() {
        let mut pipeline = PipelineSettings {
            default_chapters: 25,
            ..Default::default()
        };
        assert!(pipeline.validate().is_err());

        pipeline.default_chapters = 10;
        pipeline.min_chapters = 0;
        assert!(pipeline.validate().is_err());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut settings = Settings::default();
        settings.podcast.name = "Brew Talk".to_string();
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(loaded.podcast.name, "Brew Talk");
    }

    #[test]
    fn test_invalid_pipeline_still_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[pipeline]\nmin_chapters = 10\nmax_chapters = 2\n").unwrap();

        let loaded = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(loaded.pipeline.min_chapters, 10);
        assert!(loaded.pipeline.validate().is_err());
    }

    #[test]
    fn test_key_issues() {
        assert_eq!(check_key(None), Err(KeyIssue::Missing));
        assert_eq!(check_key(Some(" ")), Err(KeyIssue::Empty));
        assert_eq!(check_key(Some("a b")), Err(KeyIssue::Whitespace));
        assert_eq!(check_key(Some("abc")), Ok("abc"));
    }
}
