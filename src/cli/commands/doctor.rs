//! Doctor command - verify API keys, directories and configuration.

use crate::cli::Output;
use crate::config::{check_key, KeyIssue, Settings};
use console::style;

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

/// Run all diagnostic checks.
pub fn run_doctor(settings: &Settings, config_path: Option<&str>) -> anyhow::Result<()> {
    Output::header("Podscript Doctor");
    println!();
    println!("Checking API keys and configuration...\n");

    let mut checks = Vec::new();

    println!("{}", style("API Keys").bold());
    let key_checks = vec![
        check_api_key("GOOGLE_API_KEY", settings.api.google_api_key.as_deref()),
        check_api_key("DEEPSEEK_KEY", settings.api.deepseek_api_key.as_deref()),
    ];
    for check in &key_checks {
        check.print();
    }
    checks.extend(key_checks);

    println!();

    println!("{}", style("Models").bold());
    Output::kv("Analysis", &format!("{} ({})", settings.api.gemini_model, settings.api.gemini_base_url));
    Output::kv("Generation", &format!("{} ({})", settings.api.deepseek_model, settings.api.deepseek_base_url));

    println!();

    println!("{}", style("Directories").bold());
    let dir_checks = check_directories(settings);
    for check in &dir_checks {
        check.print();
    }
    checks.extend(dir_checks);

    println!();

    println!("{}", style("Configuration").bold());
    let config_checks = vec![check_config_file(config_path), check_pipeline(settings)];
    for check in &config_checks {
        check.print();
    }
    checks.extend(config_checks);

    println!();

    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        anyhow::bail!(
            "{} error(s) found. Please fix them before using Podscript.",
            errors
        );
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed! Podscript is ready to use.");
    }

    Ok(())
}

/// Check one API key without revealing it.
fn check_api_key(name: &str, key: Option<&str>) -> CheckResult {
    match check_key(key) {
        Ok(k) => CheckResult::ok(name, &format!("configured ({})", mask_key(k))),
        Err(KeyIssue::Whitespace) => CheckResult::error(
            name,
            &KeyIssue::Whitespace.to_string(),
            "Check for stray spaces or newlines",
        ),
        Err(issue) => CheckResult::error(
            name,
            &issue.to_string(),
            &format!("Set with: export {}='...' or in the [api] section of the config", name),
        ),
    }
}

fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

fn check_directories(settings: &Settings) -> Vec<CheckResult> {
    let mut results = Vec::new();

    let output_dir = settings.output_dir();
    if output_dir.is_dir() {
        let scripts = std::fs::read_dir(output_dir.join("scripts"))
            .map(|entries| entries.filter_map(|e| e.ok()).count())
            .unwrap_or(0);
        results.push(CheckResult::ok(
            "Output directory",
            &format!("{} ({} scripts)", output_dir.display(), scripts),
        ));
    } else {
        results.push(CheckResult::warning(
            "Output directory",
            &format!("{} (will be created)", output_dir.display()),
            "Directory will be created on first run",
        ));
    }

    if let Some(dir) = &settings.prompts.custom_dir {
        let path = Settings::expand_path(dir);
        if path.is_dir() {
            results.push(CheckResult::ok("Custom prompts", &path.display().to_string()));
        } else {
            results.push(CheckResult::warning(
                "Custom prompts",
                &format!("{} not found", path.display()),
                "Built-in prompts will be used",
            ));
        }
    }

    results
}

fn check_config_file(config_path: Option<&str>) -> CheckResult {
    let path = config_path
        .map(Settings::expand_path)
        .unwrap_or_else(Settings::default_config_path);
    if path.exists() {
        CheckResult::ok("Config file", &path.display().to_string())
    } else {
        CheckResult::warning(
            "Config file",
            "using defaults",
            "Create with: podscript config edit",
        )
    }
}

fn check_pipeline(settings: &Settings) -> CheckResult {
    match settings.pipeline.validate() {
        Ok(()) => CheckResult::ok(
            "Pipeline",
            &format!(
                "chapters {}..={} (default {}), {} draft",
                settings.pipeline.min_chapters,
                settings.pipeline.max_chapters,
                settings.pipeline.default_chapters,
                settings.pipeline.draft_mode
            ),
        ),
        Err(e) => CheckResult::error("Pipeline", &e.to_string(), "Fix the [pipeline] section"),
    }
}
