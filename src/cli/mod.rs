//! CLI module for Podscript.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Podscript - podcast scripts from articles, books and notes
///
/// Analyzes source content into chapters, drafts a script, then elaborates and
/// polishes it with LLMs.
#[derive(Parser, Debug)]
#[command(name = "podscript")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a podcast script from text, a file or a URL
    Generate(GenerateArgs),

    /// Start the HTTP API server
    Serve {
        /// Host to bind to (defaults to server.host from config)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (defaults to server.port from config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Check API keys, output directory and configuration
    Doctor,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Args, Debug)]
pub struct GenerateArgs {
    /// Content source (text, file path, or URL)
    #[arg(short, long)]
    pub source: String,

    /// Podcast name (defaults to podcast.name from config)
    #[arg(short, long)]
    pub name: Option<String>,

    /// Host name (defaults to podcast.host from config)
    #[arg(short = 't', long)]
    pub host: Option<String>,

    /// Maximum number of chapters to extract
    #[arg(short = 'c', long, alias = "concepts")]
    pub chapters: Option<u32>,

    /// Also write the script to this path
    #[arg(short, long)]
    pub output: Option<String>,

    /// Skip elaboration and polishing
    #[arg(long)]
    pub fast: bool,

    /// Skip the elaboration stage
    #[arg(long)]
    pub skip_elaborate: bool,

    /// Skip the polishing stage
    #[arg(long)]
    pub skip_polish: bool,

    /// Do not save the intermediate analysis JSON
    #[arg(long)]
    pub no_save_analysis: bool,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration (API keys masked)
    Show,

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_flags() {
        let cli = Cli::try_parse_from([
            "podscript", "generate", "-s", "Coffee.", "-n", "Brew Talk", "-t", "Alex", "-c", "5",
            "--fast", "--json",
        ])
        .unwrap();

        match cli.command {
            Commands::Generate(args) => {
                assert_eq!(args.source, "Coffee.");
                assert_eq!(args.name.as_deref(), Some("Brew Talk"));
                assert_eq!(args.host.as_deref(), Some("Alex"));
                assert_eq!(args.chapters, Some(5));
                assert!(args.fast);
                assert!(args.json);
                assert!(!args.no_save_analysis);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_concepts_alias() {
        let cli =
            Cli::try_parse_from(["podscript", "generate", "-s", "x", "--concepts", "3"]).unwrap();
        match cli.command {
            Commands::Generate(args) => assert_eq!(args.chapters, Some(3)),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_source_is_required() {
        assert!(Cli::try_parse_from(["podscript", "generate"]).is_err());
    }
}
