//! Mode selection when no subcommand is given.

use std::path::PathBuf;

use anyhow::Result;

use mcqbench_providers::config::load_config;

use crate::interactive;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Chat,
    Batch,
}

fn parse_mode(input: &str) -> Option<Mode> {
    match input.trim() {
        "1" => Some(Mode::Chat),
        "2" => Some(Mode::Batch),
        _ => None,
    }
}

pub async fn execute() -> Result<()> {
    let config = load_config()?;

    println!("mcqbench v{}", env!("CARGO_PKG_VERSION"));
    println!("\n--- Select mode ---");
    println!("1. Interactive questions");
    println!("2. Evaluate dataset file ({})", config.dataset.display());

    let mode = loop {
        let Some(input) = interactive::read_line("Mode (1 or 2): ")? else {
            return Ok(());
        };
        match parse_mode(&input) {
            Some(mode) => break mode,
            None => println!("Invalid choice; enter 1 or 2."),
        }
    };

    match mode {
        Mode::Chat => super::chat::execute(None, None, None).await,
        Mode::Batch => {
            let prompt = format!("Dataset path [{}]: ", config.dataset.display());
            let dataset = interactive::read_line(&prompt)?
                .filter(|p| !p.is_empty())
                .map(PathBuf::from);
            super::run::execute(dataset, None, None, None, None, None).await
        }
    }
}
