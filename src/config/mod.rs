//! Configuration module for Podscript.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{AnalysisPrompts, Prompts, ScriptPrompts};
pub use settings::{
    check_key, ApiSettings, DraftMode, GeneralSettings, KeyIssue, PipelineSettings,
    PodcastSettings, PromptSettings, ServerSettings, Settings,
};
