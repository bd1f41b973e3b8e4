//! The `mcqbench list-models` command.

use std::path::PathBuf;

use anyhow::{Context, Result};

use mcqbench_providers::config::load_config_from;
use mcqbench_providers::local::LocalServerClient;
use mcqbench_providers::{BackendConfig, BackendKind};

pub async fn execute(config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;

    let local = config.backend_config(BackendKind::Local)?;
    let BackendConfig::Local { base_url, .. } = &local else {
        anyhow::bail!("[backends.local] is not a local backend");
    };

    let client = LocalServerClient::new(base_url, local.params())?;
    let models = client
        .list_models()
        .await
        .with_context(|| format!("cannot list models at {}", client.base_url()))?;

    println!("Local server: {}", client.base_url());
    if models.is_empty() {
        println!("  (no model loaded)");
    }
    for (i, id) in models.iter().enumerate() {
        let marker = if i == 0 { " (active)" } else { "" };
        println!("  {id}{marker}");
    }

    for kind in [BackendKind::Anthropic, BackendKind::Gemini] {
        let hosted = config.backend_config(kind)?;
        if let Some(model) = hosted.model() {
            println!("{kind}: {model}");
        }
    }

    Ok(())
}
