use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::channel::filter::DateFilter;
use crate::pipeline::FetchPolicy;

#[derive(Parser)]
#[command(
    name = "chanscribe",
    about = "Channel Transcriptor - Extract transcripts from whole YouTube channels",
    version,
    long_about = "Extracts video metadata and transcripts from a YouTube channel, streaming progress as it goes. Run it as a one-shot CLI extraction, serve the extraction API over HTTP, or analyze collected transcripts with Gemini."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Base URL of a running `chanscribe serve` instance; extract, videos and
    /// analyze go through its API instead of running locally
    #[arg(long, global = true, value_name = "URL")]
    pub server: Option<String>,

    /// Disable progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Extract transcripts from a channel, streaming progress to the terminal
    Extract {
        /// Channel URL, @handle or channel id
        #[arg(value_name = "CHANNEL")]
        channel: String,

        /// Transcript language code (config default if not specified)
        #[arg(short, long, value_name = "LANG")]
        language: Option<String>,

        /// Only include videos uploaded within this window
        #[arg(short, long, value_enum, default_value = "all")]
        date_filter: DateFilter,

        /// Transcript fetch scheduling
        #[arg(short, long, value_enum)]
        policy: Option<FetchPolicy>,

        /// Output file path (prints a summary to the console if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// List a channel's videos without fetching transcripts
    Videos {
        /// Channel URL, @handle or channel id
        #[arg(value_name = "CHANNEL")]
        channel: String,
    },

    /// Analyze previously extracted transcripts with Gemini
    Analyze {
        /// JSON file with extracted transcripts (as written by `extract -f json`)
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Analysis instruction for the model
        #[arg(short, long, value_name = "PROMPT")]
        prompt: String,
    },

    /// Serve the extraction API over HTTP
    Serve {
        /// Bind address (config default if not specified)
        #[arg(long, value_name = "HOST")]
        host: Option<String>,

        /// Bind port (config default if not specified)
        #[arg(short, long, value_name = "PORT")]
        port: Option<u16>,
    },

    /// Show or initialize the configuration
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,
    },
}

#[derive(ValueEnum, Clone, Debug)]
pub enum OutputFormat {
    /// Plain text, one titled block per video
    Text,
    /// JSON array of video results
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}
