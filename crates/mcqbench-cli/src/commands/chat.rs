//! The `mcqbench chat` command.

use std::path::PathBuf;

use anyhow::Result;

use mcqbench_core::retry::RetryPolicy;
use mcqbench_providers::config::load_config_from;
use mcqbench_providers::BackendKind;

use super::backend;
use crate::interactive;

pub async fn execute(
    backend_kind: Option<BackendKind>,
    model: Option<String>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let client = backend::connect(&config, backend_kind, model.as_deref()).await?;
    let retry = RetryPolicy::new(&config.retry);

    println!(
        "\nInteractive mode (type '{}' to exit)",
        interactive::QUIT_TOKEN
    );

    loop {
        let Some(input) = interactive::read_line("You: ")? else {
            break;
        };
        if input.is_empty() {
            continue;
        }
        if interactive::is_quit(&input) {
            break;
        }

        match retry.call_with_retry(client.as_ref(), &input).await {
            Ok(completion) => println!("{}: {}\n", client.model(), completion.text),
            Err(failure) => eprintln!("Error: {failure}\n"),
        }
    }

    println!("Goodbye.");
    Ok(())
}
