//! CLI command definitions and parsing
mod interactive;

pub use interactive::{prompt_responses, run_chat, write_answer};

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "medibot",
    version,
    about = "Medical question answering over your own PDFs, with mental-health screening and a mood tracker",
    long_about = "MediBot ingests PDF documents into a local vector index and answers questions by \
                  retrieving the most relevant passages and passing them to a hosted language model. \
                  It also scores the PHQ-9 and GAD-7 screening questionnaires and keeps a per-session \
                  mood log in its web chat UI."
)]
pub struct Cli {
    /// Global config file path (defaults to ~/.config/medibot/config.toml)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build the vector index from a directory of PDFs
    Ingest {
        /// Directory scanned for .pdf files (overrides paths.data_dir)
        #[arg(short, long)]
        data_dir: Option<PathBuf>,

        /// Where the index is written (overrides paths.index_dir)
        #[arg(short, long)]
        index_dir: Option<PathBuf>,
    },

    /// Answer a single question
    Ask {
        /// Question to ask
        question: String,

        /// Print the answer and sources as JSON
        #[arg(long)]
        json: bool,
    },

    /// Interactive question/answer loop (type "exit" to quit)
    Chat,

    /// Score a PHQ-9 or GAD-7 questionnaire
    Screen {
        /// Questionnaire: phq9 or gad7
        questionnaire: String,

        /// Comma-separated item scores (0-3); prompts for each item when omitted
        #[arg(short, long, value_delimiter = ',')]
        responses: Option<Vec<u8>>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run the web chat server
    Serve {
        /// Address to listen on (overrides server.bind_addr)
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Validate configuration file
    Validate {
        /// Path to config file (defaults to standard location)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Initialize default configuration
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}

impl Cli {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_screen_responses() {
        let cli = Cli::try_parse_from([
            "medibot",
            "screen",
            "phq9",
            "--responses",
            "0,1,2,3,0,1,2,3,1",
        ])
        .unwrap();

        match cli.command {
            Commands::Screen {
                questionnaire,
                responses,
                json,
            } => {
                assert_eq!(questionnaire, "phq9");
                assert_eq!(responses.unwrap(), vec![0, 1, 2, 3, 0, 1, 2, 3, 1]);
                assert!(!json);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::try_parse_from(["medibot", "ask", "What is asthma?", "-v", "--json"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Ask { json: true, .. }));
    }
}
