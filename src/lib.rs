//! Podscript - podcast scripts from articles, books and notes
//!
//! Turns source content into a spoken-word podcast script with a staged LLM
//! pipeline.
//!
//! # Overview
//!
//! A run goes through these stages, strictly in order:
//! - Analyze: chunk the source and extract an ordered list of chapters (Gemini)
//! - Draft: write a first script covering every chapter (DeepSeek)
//! - Elaborate (optional): expand the draft with examples and detail
//! - Polish (optional): tighten the script and strip formatting artifacts
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Settings and prompt templates
//! - `llm` - Gemini and DeepSeek clients behind the `TextModel` trait, with retries
//! - `analysis` - Source chunking and chapter extraction
//! - `script` - Draft, elaborate and polish stages
//! - `orchestrator` - Pipeline coordination
//! - `source` - Loading source text from URLs, files or literal text
//! - `store` - Saving scripts, analyses and metadata
//!
//! # Example
//!
//! ```rust,no_run
//! use podscript::config::Settings;
//! use podscript::models::GenerationRequest;
//! use podscript::orchestrator::Orchestrator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::from_settings(settings)?;
//!
//!     let request = GenerationRequest::new("The history of coffee...", "Brew Talk", "Alex", 5);
//!     let result = orchestrator.run(&request).await?;
//!     println!("{} words", result.metadata.word_count);
//!
//!     Ok(())
//! }
//! ```

pub mod analysis;
pub mod cli;
pub mod config;
pub mod error;
pub mod llm;
pub mod models;
pub mod orchestrator;
pub mod script;
pub mod source;
pub mod store;

pub use error::{PodscriptError, Result};
