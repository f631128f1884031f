//! Pre-flight checks before expensive operations.
//!
//! Validates that credentials, the pipeline bounds and the output directory
//! are usable before starting a run that would otherwise fail midway.

use crate::config::Settings;
use crate::error::{PodscriptError, Result};
use std::path::Path;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Generation requires both API keys and a writable output directory.
    Generate,
    /// The server starts without keys (and reports not ready) but needs the output directory.
    Serve,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    if let Operation::Generate = operation {
        check_api_keys(settings)?;
    }
    settings.pipeline.validate()?;
    check_output_dir(&settings.output_dir())?;
    Ok(())
}

/// Check that both API keys are configured.
fn check_api_keys(settings: &Settings) -> Result<()> {
    settings.api.credentials().map(|_| ()).map_err(|e| {
        PodscriptError::Config(format!(
            "{}. Set GOOGLE_API_KEY and DEEPSEEK_KEY in the environment or the [api] section of the config file",
            e
        ))
    })
}

/// Check that the output directory exists (creating it if needed) and is writable.
pub fn check_output_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(|e| {
        PodscriptError::Config(format!("cannot create output directory {}: {}", dir.display(), e))
    })?;

    let probe = dir.join(".podscript_write_test");
    std::fs::write(&probe, b"ok").map_err(|e| {
        PodscriptError::Config(format!("output directory {} is not writable: {}", dir.display(), e))
    })?;
    let _ = std::fs::remove_file(&probe);
    Ok(())
}
