//! On-disk storage for generated scripts, analyses and run metadata.

use crate::error::{PodscriptError, Result};
use crate::models::ScriptMetadata;
use crate::orchestrator::PipelineOutput;
use serde::Serialize;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};

const SCRIPTS_DIR: &str = "scripts";
const JSON_DIR: &str = "json";

/// Paths written for one run, relative to the store root.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SavedFiles {
    pub script: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<String>,
    pub metadata: String,
}

/// Output directory layout:
///
/// ```text
/// <root>/scripts/script_<YYYYmmdd_HHMMSS>.txt
/// <root>/json/analysis_<YYYYmmdd_HHMMSS>.json
/// <root>/json/metadata_<YYYYmmdd_HHMMSS>.json
/// ```
#[derive(Debug, Clone)]
pub struct OutputStore {
    root: PathBuf,
}

impl OutputStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the output directories if they do not exist.
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(self.root.join(SCRIPTS_DIR))?;
        std::fs::create_dir_all(self.root.join(JSON_DIR))?;
        Ok(())
    }

    /// Persist a run. The analysis is written only when `save_analysis` is set.
    pub fn save(&self, output: &PipelineOutput, save_analysis: bool) -> Result<SavedFiles> {
        self.ensure_dirs()?;
        let stamp = self.stamp(&output.result.metadata);

        let script = self.write_text(
            &format!("{}/script_{}.txt", SCRIPTS_DIR, stamp),
            &output.result.script,
        )?;

        let analysis = if save_analysis {
            Some(self.write_json(
                &format!("{}/analysis_{}.json", JSON_DIR, stamp),
                &output.analysis,
            )?)
        } else {
            None
        };

        let metadata = self.write_json(
            &format!("{}/metadata_{}.json", JSON_DIR, stamp),
            &output.result.metadata,
        )?;

        info!("Saved script to {}", self.root.join(&script).display());
        Ok(SavedFiles {
            script,
            analysis,
            metadata,
        })
    }

    /// Resolve a client-supplied relative path to a location inside the store.
    ///
    /// Absolute paths and any `..` component are rejected. The file may not exist.
    pub fn resolve_download(&self, path: &str) -> Result<PathBuf> {
        let relative = Path::new(path);
        if path.is_empty() || relative.is_absolute() {
            return Err(PodscriptError::InvalidRequest(format!(
                "invalid download path: {}",
                path
            )));
        }

        for component in relative.components() {
            match component {
                Component::Normal(_) | Component::CurDir => {}
                _ => {
                    return Err(PodscriptError::InvalidRequest(format!(
                        "invalid download path: {}",
                        path
                    )))
                }
            }
        }

        Ok(self.root.join(relative))
    }

    /// Timestamp for file names, with the run id appended when a script for
    /// the same second already exists.
    fn stamp(&self, metadata: &ScriptMetadata) -> String {
        let stamp = metadata.timestamp.format("%Y%m%d_%H%M%S").to_string();
        let taken = self
            .root
            .join(SCRIPTS_DIR)
            .join(format!("script_{}.txt", stamp))
            .exists();
        if taken {
            let run = metadata.run_id.simple().to_string();
            format!("{}_{}", stamp, &run[..8])
        } else {
            stamp
        }
    }

    fn write_text(&self, relative: &str, text: &str) -> Result<String> {
        std::fs::write(self.root.join(relative), text)?;
        debug!("Wrote {}", relative);
        Ok(relative.to_string())
    }

    fn write_json<T: Serialize>(&self, relative: &str, value: &T) -> Result<String> {
        let json = serde_json::to_string_pretty(value)?;
        self.write_text(relative, &json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AnalysisResult, Chapter, GenerationResult, StageName};
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn output() -> PipelineOutput {
        let script = "Welcome to Brew Talk.".to_string();
        PipelineOutput {
            result: GenerationResult {
                metadata: ScriptMetadata {
                    run_id: Uuid::new_v4(),
                    word_count: 4,
                    duration_seconds: 1.25,
                    num_chapters: 1,
                    timestamp: Utc.with_ymd_and_hms(2026, 3, 14, 9, 5, 7).unwrap(),
                    podcast_name: "Brew Talk".to_string(),
                    host_name: "Alex".to_string(),
                    source_preview: "Coffee".to_string(),
                    script_length: script.len(),
                    stages: vec![StageName::Draft],
                },
                script,
            },
            analysis: AnalysisResult {
                chapters: vec![Chapter::new("Origins", "Ethiopia.")],
                chunked_source: vec!["Coffee".to_string()],
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_save_writes_expected_layout() {
        let dir = tempfile::tempdir().unwrap();
        let store = OutputStore::new(dir.path());

        let saved = store.save(&output(), true).unwrap();

        assert_eq!(saved.script, "scripts/script_20260314_090507.txt");
        assert_eq!(saved.analysis.as_deref(), Some("json/analysis_20260314_090507.json"));
        assert_eq!(saved.metadata, "json/metadata_20260314_090507.json");

        let script = std::fs::read_to_string(dir.path().join(&saved.script)).unwrap();
        assert_eq!(script, "Welcome to Brew Talk.");

        let meta: ScriptMetadata = serde_json::from_str(
            &std::fs::read_to_string(dir.path().join(&saved.metadata)).unwrap(),
        )
        .unwrap();
        assert_eq!(meta.podcast_name, "Brew Talk");
    }

    #[test]
    fn test_skip_analysis() {
        let dir = tempfile::tempdir().unwrap();
        let store = OutputStore::new(dir.path());

        let saved = store.save(&output(), false).unwrap();
        assert!(saved.analysis.is_none());
        assert!(!dir.path().join("json/analysis_20260314_090507.json").exists());
    }

    #[test]
    fn test_same_second_does_not_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let store = OutputStore::new(dir.path());

        let first = store.save(&output(), false).unwrap();
        let second = store.save(&output(), false).unwrap();
        assert_ne!(first.script, second.script);
        assert!(second.script.starts_with("scripts/script_20260314_090507_"));
    }

    #[test]
    fn test_resolve_download_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let store = OutputStore::new(dir.path());
        let saved = store.save(&output(), false).unwrap();

        assert!(store.resolve_download(&saved.script).unwrap().is_file());
        assert!(!store.resolve_download("scripts/missing.txt").unwrap().exists());
        assert!(store.resolve_download("../etc/passwd").is_err());
        assert!(store.resolve_download("scripts/../../secret").is_err());
        assert!(store.resolve_download("/etc/passwd").is_err());
    }
}
