//! Backend setup shared by `run` and `chat`.

use std::sync::Arc;

use anyhow::Result;

use mcqbench_core::{ModelClient, ProviderError};
use mcqbench_providers::{create_client, BackendConfig, BackendKind, BenchConfig};

use crate::interactive;

/// Resolve the backend configuration, ask for a missing credential, and connect.
pub async fn connect(
    config: &BenchConfig,
    kind: Option<BackendKind>,
    model: Option<&str>,
) -> Result<Arc<dyn ModelClient>> {
    let kind = kind.unwrap_or(config.backend);
    let mut backend = config.backend_config(kind)?;
    if let Some(model) = model {
        backend.set_model(model);
    }

    if backend.needs_api_key() {
        if let Some(var) = kind.key_override_var() {
            eprintln!("No {kind} API key configured (set {var} or api_key in the config file).");
        }
        let key = interactive::read_line(&format!("Enter {kind} API key: "))?.unwrap_or_default();
        anyhow::ensure!(!key.is_empty(), "an API key is required for the {kind} backend");
        backend.set_api_key(&key);
    }

    tracing::debug!(?backend, "connecting");
    let client = create_client(&backend)
        .await
        .map_err(|e| setup_error(&backend, e))?;

    eprintln!("Backend: {kind}, model: {}", client.model());
    Ok(client)
}

fn setup_error(backend: &BackendConfig, error: ProviderError) -> anyhow::Error {
    let hint = match (&error, backend) {
        (ProviderError::NoModelLoaded, _) => {
            "load a model in the local server, or pass --model".to_string()
        }
        (ProviderError::ConnectionFailure(_), BackendConfig::Local { base_url, .. }) => {
            format!("cannot reach the local server at {base_url}; is it running?")
        }
        (ProviderError::AuthFailure(_), _) => {
            format!("the {} backend rejected the credential", backend.kind())
        }
        _ => format!("failed to set up the {} backend", backend.kind()),
    };
    anyhow::Error::new(error).context(hint)
}
