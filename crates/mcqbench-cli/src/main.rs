//! mcqbench CLI: the user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use mcqbench_providers::BackendKind;

mod commands;
mod interactive;

const DEFAULT_LOG_DIRECTIVES: [&str; 3] = [
    "mcqbench=info",
    "mcqbench_core=info",
    "mcqbench_providers=info",
];

#[derive(Parser)]
#[command(
    name = "mcqbench",
    version,
    about = "Multiple-choice benchmark harness for language models"
)]
struct Cli {
    /// Without a subcommand, an interactive menu asks which mode to run.
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate every question of a dataset and write a result file
    Run {
        /// CSV dataset (default: `dataset` from the config)
        #[arg(long)]
        dataset: Option<PathBuf>,

        /// Backend: local, anthropic, gemini
        #[arg(long)]
        backend: Option<BackendKind>,

        /// Model id (skips model discovery on the local server)
        #[arg(long)]
        model: Option<String>,

        /// Result file path (default: <output_dir>/<model>_results.csv)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Pause between questions in milliseconds
        #[arg(long)]
        delay_ms: Option<u64>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Ask the model free-form questions; type `quit` to leave
    Chat {
        /// Backend: local, anthropic, gemini
        #[arg(long)]
        backend: Option<BackendKind>,

        /// Model id
        #[arg(long)]
        model: Option<String>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Check a dataset file for problems
    Validate {
        /// CSV dataset to check
        #[arg(long)]
        dataset: PathBuf,
    },

    /// List models loaded on the local server
    ListModels {
        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Create a starter config and sample dataset
    Init,
}

fn init_tracing() {
    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    if std::env::var_os("RUST_LOG").is_none() {
        for directive in DEFAULT_LOG_DIRECTIVES {
            if let Ok(d) = directive.parse() {
                filter = filter.add_directive(d);
            }
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::Run {
            dataset,
            backend,
            model,
            output,
            delay_ms,
            config,
        }) => commands::run::execute(dataset, backend, model, output, delay_ms, config).await,
        Some(Commands::Chat {
            backend,
            model,
            config,
        }) => commands::chat::execute(backend, model, config).await,
        Some(Commands::Validate { dataset }) => commands::validate::execute(dataset),
        Some(Commands::ListModels { config }) => commands::list_models::execute(config).await,
        Some(Commands::Init) => commands::init::execute(),
        None => commands::menu::execute().await,
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
