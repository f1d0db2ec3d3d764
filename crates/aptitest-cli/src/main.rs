//! aptitest CLI: the user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "aptitest",
    version,
    about = "Aptitude assessments with AI-generated questions"
)]
struct Cli {
    /// Config file path (default: ./aptitest.toml, then ~/.config/aptitest/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate validated AI questions for one or more topics
    Generate {
        /// Topics to generate for (comma-separated)
        #[arg(long, value_delimiter = ',', required = true)]
        topics: Vec<String>,

        /// Provider name from the config (default: default_provider)
        #[arg(long)]
        provider: Option<String>,

        /// Model identifier (default: default_model)
        #[arg(long)]
        model: Option<String>,

        /// Write questions to this file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Assemble a test from the bank and, optionally, AI questions
    Quiz {
        /// Topic name; selects `<bank_dir>/<topic>_questions.json`
        #[arg(long)]
        topic: String,

        /// Number of bank questions
        #[arg(long, default_value = "20")]
        count: usize,

        /// Append AI-generated questions
        #[arg(long)]
        ai: bool,

        #[arg(long)]
        provider: Option<String>,

        #[arg(long)]
        model: Option<String>,

        /// Write the test to this file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Score answers against a test and record the result
    Submit {
        /// Test file produced by `aptitest quiz`
        #[arg(long)]
        quiz: PathBuf,

        /// JSON answers: an array of indices (null = unanswered) or an object keyed by question id
        #[arg(long)]
        answers: PathBuf,

        #[arg(long)]
        user: String,

        /// Time taken in seconds
        #[arg(long, default_value = "0")]
        time_taken: u64,

        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show a user's past results, newest first
    History {
        #[arg(long)]
        user: String,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check question bank files for problems
    Validate {
        /// Bank file or directory of `*_questions.json` files
        #[arg(long)]
        bank: PathBuf,
    },

    /// List available models
    ListModels {
        /// Filter to specific provider
        #[arg(long)]
        provider: Option<String>,
    },

    /// Create a starter config and a sample question bank
    Init,
}

#[tokio::main]
async fn main() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("aptitest=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.config;

    let result = match cli.command {
        Commands::Generate {
            topics,
            provider,
            model,
            output,
        } => commands::generate::execute(topics, provider, model, output, config).await,
        Commands::Quiz {
            topic,
            count,
            ai,
            provider,
            model,
            output,
        } => commands::quiz::execute(topic, count, ai, provider, model, output, config).await,
        Commands::Submit {
            quiz,
            answers,
            user,
            time_taken,
            json,
        } => commands::submit::execute(quiz, answers, user, time_taken, json, config).await,
        Commands::History { user, json } => commands::history::execute(user, json, config).await,
        Commands::Validate { bank } => commands::validate::execute(bank),
        Commands::ListModels { provider } => commands::list_models::execute(provider, config),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
