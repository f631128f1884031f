//! Generate command implementation.

use super::serve::GenerateResponse;
use crate::cli::output::{format_count, format_duration};
use crate::cli::preflight::{self, Operation};
use crate::cli::{GenerateArgs, Output};
use crate::config::Settings;
use crate::models::GenerationRequest;
use crate::orchestrator::Orchestrator;
use crate::source::{load_source, SourceKind};
use crate::store::OutputStore;
use anyhow::Result;
use std::path::Path;

/// Run the generate command.
pub async fn run_generate(args: &GenerateArgs, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Generate, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'podscript doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let source = load_source(&args.source, true).await?;
    let request = build_request(args, &settings, source.text);

    if !args.json {
        Output::header("Podscript");
        Output::kv("Source", &describe_source(&source.kind, &request.source));
        Output::kv("Podcast", &request.podcast_name);
        Output::kv("Host", &request.host_name);
        Output::kv("Max chapters", &request.max_chapters.to_string());
        Output::kv("Stages", &stage_list(&request));
        println!();
    }

    let store = OutputStore::new(settings.output_dir());
    let orchestrator = Orchestrator::from_settings(settings)?;

    let spinner = (!args.json).then(|| Output::spinner("Generating script..."));
    let result = orchestrator.run_with_analysis(&request).await;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }
    let output = result?;

    let saved = store.save(&output, !args.no_save_analysis)?;

    if let Some(path) = &args.output {
        let path = Settings::expand_path(path);
        write_script(&path, &output.result.script)?;
        if !args.json {
            Output::success(&format!("Script saved to: {}", path.display()));
        }
    } else if !args.json {
        Output::success(&format!(
            "Script saved to: {}",
            store.root().join(&saved.script).display()
        ));
    }

    if args.json {
        let response = GenerateResponse::from_output(output, saved);
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    let metadata = &output.result.metadata;
    Output::header("Statistics");
    Output::kv("Length", &format!("{} characters", format_count(metadata.script_length)));
    Output::kv("Words", &format_count(metadata.word_count));
    Output::kv("Chapters", &metadata.num_chapters.to_string());
    Output::kv("Generation time", &format_duration(metadata.duration_seconds));
    if let Some(analysis) = &saved.analysis {
        Output::kv("Analysis", &store.root().join(analysis).display().to_string());
    }

    Output::header("Chapters");
    for (i, chapter) in output.analysis.chapters.iter().enumerate() {
        Output::chapter(i + 1, &chapter.title, &chapter.summary);
    }
    println!();

    Ok(())
}

/// Request from CLI flags, falling back to configured defaults.
fn build_request(args: &GenerateArgs, settings: &Settings, source: String) -> GenerationRequest {
    GenerationRequest::new(
        source,
        args.name.clone().unwrap_or_else(|| settings.podcast.name.clone()),
        args.host.clone().unwrap_or_else(|| settings.podcast.host.clone()),
        args.chapters.unwrap_or(settings.pipeline.default_chapters),
    )
    .skip_elaborate(args.fast || args.skip_elaborate)
    .skip_polish(args.fast || args.skip_polish)
}

fn describe_source(kind: &SourceKind, text: &str) -> String {
    let size = format!("{} characters", format_count(text.chars().count()));
    match kind {
        SourceKind::Url(url) => format!("{} ({})", url, size),
        SourceKind::File(path) => format!("{} ({})", path, size),
        SourceKind::Text => format!("inline text ({})", size),
    }
}

fn stage_list(request: &GenerationRequest) -> String {
    let mut stages = vec!["analyze", "draft"];
    if !request.skip_elaborate {
        stages.push("elaborate");
    }
    if !request.skip_polish {
        stages.push("polish");
    }
    stages.join(" -> ")
}

fn write_script(path: &Path, script: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, script)?;
    Ok(())
}
