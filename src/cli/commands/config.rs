//! Config command implementation.

use crate::cli::{ConfigAction, Output};
use crate::config::Settings;
use anyhow::Result;
use std::path::PathBuf;

/// Run the config command.
pub fn run_config(action: &ConfigAction, settings: Settings, config_path: Option<&str>) -> Result<()> {
    let path = config_path
        .map(Settings::expand_path)
        .unwrap_or_else(Settings::default_config_path);

    match action {
        ConfigAction::Show => {
            let toml_str = toml::to_string_pretty(&masked(settings))
                .map_err(|e| anyhow::anyhow!("Failed to serialize config: {}", e))?;
            println!("{}", toml_str);
        }

        ConfigAction::Edit => edit(&path, &settings)?,

        ConfigAction::Path => {
            println!("{}", path.display());
        }
    }

    Ok(())
}

/// Replace API keys so `config show` never prints secrets.
fn masked(mut settings: Settings) -> Settings {
    let mask = |key: &mut Option<String>| {
        if key.is_some() {
            *key = Some("********".to_string());
        }
    };
    mask(&mut settings.api.google_api_key);
    mask(&mut settings.api.deepseek_api_key);
    settings
}

fn edit(path: &PathBuf, settings: &Settings) -> Result<()> {
    // Create default config if it doesn't exist. Keys stay in the environment.
    if !path.exists() {
        let mut defaults = settings.clone();
        defaults.api.google_api_key = None;
        defaults.api.deepseek_api_key = None;
        defaults.save_to(path)?;
        Output::info(&format!("Created default config at {}", path.display()));
    }

    let editor = std::env::var("EDITOR").unwrap_or_else(|_| "vim".to_string());
    Output::info(&format!("Opening config in {}...", editor));

    match std::process::Command::new(&editor).arg(path).status() {
        Ok(s) if s.success() => {
            Output::success("Config saved.");
        }
        Ok(_) => {
            Output::warning("Editor exited with non-zero status.");
        }
        Err(e) => {
            Output::error(&format!("Failed to open editor: {}", e));
            Output::info(&format!("Config file is at: {}", path.display()));
        }
    }

    Ok(())
}
