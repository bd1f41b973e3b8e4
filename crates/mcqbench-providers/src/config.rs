//! Benchmark configuration and backend factory.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use mcqbench_core::retry::RetryConfig;
use mcqbench_core::{ModelClient, ProviderError};

use crate::anthropic::{self, AnthropicClient};
use crate::gemini::{self, GeminiClient};
use crate::local::{self, LocalServerClient};

pub const CONFIG_FILE_NAME: &str = "mcqbench.toml";

/// Sampling parameters sent with every completion request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub temperature: f64,
    pub max_tokens: u32,
}

/// Which backend answers the questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Local,
    Anthropic,
    Gemini,
}

impl BackendKind {
    pub const ALL: [BackendKind; 3] = [
        BackendKind::Local,
        BackendKind::Anthropic,
        BackendKind::Gemini,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Local => "local",
            BackendKind::Anthropic => "anthropic",
            BackendKind::Gemini => "gemini",
        }
    }

    /// Environment variable that overrides the credential, if any.
    pub fn key_override_var(&self) -> Option<&'static str> {
        match self {
            BackendKind::Local => None,
            BackendKind::Anthropic => Some("MCQBENCH_ANTHROPIC_KEY"),
            BackendKind::Gemini => Some("MCQBENCH_GEMINI_KEY"),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local" | "lmstudio" | "lm-studio" => Ok(BackendKind::Local),
            "anthropic" | "claude" => Ok(BackendKind::Anthropic),
            "gemini" | "google" => Ok(BackendKind::Gemini),
            other => Err(format!(
                "unknown backend '{other}' (expected local, anthropic or gemini)"
            )),
        }
    }
}

/// Configuration for a single backend.
///
/// Note: Custom Debug impl masks API keys to prevent accidental exposure in logs.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BackendConfig {
    Local {
        #[serde(default = "default_local_url")]
        base_url: String,
        /// Fixed model id; when absent the server's loaded model is used.
        #[serde(default)]
        model: Option<String>,
        #[serde(default = "default_local_temperature")]
        temperature: f64,
        #[serde(default = "default_local_max_tokens")]
        max_tokens: u32,
    },
    Anthropic {
        #[serde(default)]
        api_key: String,
        #[serde(default)]
        base_url: Option<String>,
        #[serde(default = "default_anthropic_model")]
        model: String,
        #[serde(default = "default_anthropic_max_tokens")]
        max_tokens: u32,
        #[serde(default)]
        temperature: f64,
    },
    Gemini {
        #[serde(default)]
        api_key: String,
        #[serde(default)]
        base_url: Option<String>,
        #[serde(default = "default_gemini_model")]
        model: String,
        #[serde(default = "default_gemini_max_tokens")]
        max_tokens: u32,
        #[serde(default)]
        temperature: f64,
    },
}

impl fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendConfig::Local {
                base_url,
                model,
                temperature,
                max_tokens,
            } => f
                .debug_struct("Local")
                .field("base_url", base_url)
                .field("model", model)
                .field("temperature", temperature)
                .field("max_tokens", max_tokens)
                .finish(),
            BackendConfig::Anthropic {
                api_key: _,
                base_url,
                model,
                max_tokens,
                temperature,
            } => f
                .debug_struct("Anthropic")
                .field("api_key", &"***")
                .field("base_url", base_url)
                .field("model", model)
                .field("max_tokens", max_tokens)
                .field("temperature", temperature)
                .finish(),
            BackendConfig::Gemini {
                api_key: _,
                base_url,
                model,
                max_tokens,
                temperature,
            } => f
                .debug_struct("Gemini")
                .field("api_key", &"***")
                .field("base_url", base_url)
                .field("model", model)
                .field("max_tokens", max_tokens)
                .field("temperature", temperature)
                .finish(),
        }
    }
}

fn default_local_url() -> String {
    local::DEFAULT_BASE_URL.to_string()
}
fn default_local_temperature() -> f64 {
    0.1
}
fn default_local_max_tokens() -> u32 {
    512
}
fn default_anthropic_model() -> String {
    anthropic::DEFAULT_MODEL.to_string()
}
fn default_anthropic_max_tokens() -> u32 {
    10
}
fn default_gemini_model() -> String {
    gemini::DEFAULT_MODEL.to_string()
}
fn default_gemini_max_tokens() -> u32 {
    256
}

impl BackendConfig {
    /// Built-in configuration used when the file has no section for `kind`.
    pub fn default_for(kind: BackendKind) -> Self {
        match kind {
            BackendKind::Local => BackendConfig::Local {
                base_url: default_local_url(),
                model: None,
                temperature: default_local_temperature(),
                max_tokens: default_local_max_tokens(),
            },
            BackendKind::Anthropic => BackendConfig::Anthropic {
                api_key: String::new(),
                base_url: None,
                model: default_anthropic_model(),
                max_tokens: default_anthropic_max_tokens(),
                temperature: 0.0,
            },
            BackendKind::Gemini => BackendConfig::Gemini {
                api_key: String::new(),
                base_url: None,
                model: default_gemini_model(),
                max_tokens: default_gemini_max_tokens(),
                temperature: 0.0,
            },
        }
    }

    pub fn kind(&self) -> BackendKind {
        match self {
            BackendConfig::Local { .. } => BackendKind::Local,
            BackendConfig::Anthropic { .. } => BackendKind::Anthropic,
            BackendConfig::Gemini { .. } => BackendKind::Gemini,
        }
    }

    /// True for hosted backends whose credential is still empty.
    pub fn needs_api_key(&self) -> bool {
        match self {
            BackendConfig::Local { .. } => false,
            BackendConfig::Anthropic { api_key, .. } | BackendConfig::Gemini { api_key, .. } => {
                api_key.trim().is_empty()
            }
        }
    }

    /// Replace the credential of a hosted backend; no-op for local.
    pub fn set_api_key(&mut self, key: &str) {
        match self {
            BackendConfig::Local { .. } => {}
            BackendConfig::Anthropic { api_key, .. } | BackendConfig::Gemini { api_key, .. } => {
                *api_key = key.trim().to_string();
            }
        }
    }

    /// Configured model id; `None` for a local backend that asks the server.
    pub fn model(&self) -> Option<&str> {
        match self {
            BackendConfig::Local { model, .. } => model.as_deref(),
            BackendConfig::Anthropic { model, .. } | BackendConfig::Gemini { model, .. } => {
                Some(model)
            }
        }
    }

    /// Force a specific model id.
    pub fn set_model(&mut self, id: &str) {
        match self {
            BackendConfig::Local { model, .. } => *model = Some(id.to_string()),
            BackendConfig::Anthropic { model, .. } | BackendConfig::Gemini { model, .. } => {
                *model = id.to_string();
            }
        }
    }

    pub fn params(&self) -> GenerationParams {
        match self {
            BackendConfig::Local {
                temperature,
                max_tokens,
                ..
            }
            | BackendConfig::Anthropic {
                temperature,
                max_tokens,
                ..
            }
            | BackendConfig::Gemini {
                temperature,
                max_tokens,
                ..
            } => GenerationParams {
                temperature: *temperature,
                max_tokens: *max_tokens,
            },
        }
    }

    fn resolved(&self) -> BackendConfig {
        let mut config = self.clone();
        match &mut config {
            BackendConfig::Local { base_url, model, .. } => {
                *base_url = resolve_env_vars(base_url);
                if let Some(m) = model {
                    *m = resolve_env_vars(m);
                }
            }
            BackendConfig::Anthropic {
                api_key,
                base_url,
                model,
                ..
            }
            | BackendConfig::Gemini {
                api_key,
                base_url,
                model,
                ..
            } => {
                *api_key = resolve_env_vars(api_key);
                *model = resolve_env_vars(model);
                if let Some(u) = base_url {
                    *u = resolve_env_vars(u);
                }
            }
        }
        config
    }
}

/// Top-level mcqbench configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchConfig {
    /// Backend used when none is given on the command line.
    #[serde(default = "default_backend")]
    pub backend: BackendKind,
    /// Default dataset path.
    #[serde(default = "default_dataset")]
    pub dataset: PathBuf,
    /// Directory that receives result files.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Pause between consecutive questions in milliseconds.
    #[serde(default = "default_request_delay")]
    pub request_delay_ms: u64,
    #[serde(default)]
    pub retry: RetryConfig,
    /// Backend configurations keyed by name.
    #[serde(default)]
    pub backends: HashMap<String, BackendConfig>,
}

fn default_backend() -> BackendKind {
    BackendKind::Local
}
fn default_dataset() -> PathBuf {
    PathBuf::from("test_set.csv")
}
fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}
fn default_request_delay() -> u64 {
    1000
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            dataset: default_dataset(),
            output_dir: default_output_dir(),
            request_delay_ms: default_request_delay(),
            retry: RetryConfig::default(),
            backends: HashMap::new(),
        }
    }
}

impl BenchConfig {
    /// Configuration for `kind`, falling back to built-in defaults.
    pub fn backend_config(&self, kind: BackendKind) -> Result<BackendConfig> {
        match self.backends.get(kind.as_str()) {
            Some(config) if config.kind() == kind => Ok(config.clone()),
            Some(config) => anyhow::bail!(
                "[backends.{kind}] declares type = \"{}\"",
                config.kind()
            ),
            None => Ok(BackendConfig::default_for(kind)),
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
///
/// Substituted values are taken literally; a `${...}` inside a value is not
/// expanded again.
fn resolve_env_vars(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("${") {
        let Some(len) = rest[start..].find('}') else {
            break;
        };
        let var_name = &rest[start + 2..start + len];
        result.push_str(&rest[..start]);
        result.push_str(&std::env::var(var_name).unwrap_or_default());
        rest = &rest[start + len + 1..];
    }
    result.push_str(rest);
    result
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `mcqbench.toml` in the current directory
/// 2. `~/.config/mcqbench/config.toml`
///
/// Environment variable overrides: `MCQBENCH_ANTHROPIC_KEY`, `MCQBENCH_GEMINI_KEY`.
pub fn load_config() -> Result<BenchConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<BenchConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from(CONFIG_FILE_NAME);
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|dir| dir.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            let config = parse_config(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?;
            tracing::debug!(path = %path.display(), "loaded configuration");
            config
        }
        None => BenchConfig::default(),
    };

    Ok(apply_env(config))
}

/// Parse a configuration document without touching the environment.
pub fn parse_config(content: &str) -> Result<BenchConfig> {
    Ok(toml::from_str::<BenchConfig>(content)?)
}

fn apply_env(mut config: BenchConfig) -> BenchConfig {
    for kind in BackendKind::ALL {
        let Some(var) = kind.key_override_var() else {
            continue;
        };
        if let Ok(key) = std::env::var(var) {
            config
                .backends
                .entry(kind.as_str().to_string())
                .or_insert_with(|| BackendConfig::default_for(kind))
                .set_api_key(&key);
        }
    }

    config.backends = config
        .backends
        .iter()
        .map(|(name, backend)| (name.clone(), backend.resolved()))
        .collect();
    config
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("mcqbench"))
}

/// Create a ready-to-use client from its configuration.
///
/// For the local backend this queries the server for its loaded model unless
/// the configuration pins one. Hosted backends fail with `AuthFailure` when no
/// credential is present.
pub async fn create_client(config: &BackendConfig) -> Result<Arc<dyn ModelClient>, ProviderError> {
    let params = config.params();
    match config {
        BackendConfig::Local { base_url, model, .. } => {
            let client = LocalServerClient::new(base_url, params)?;
            let client = match model {
                Some(id) if !id.trim().is_empty() => client.with_model(id.trim()),
                _ => client.resolve_model().await?,
            };
            Ok(Arc::new(client))
        }
        BackendConfig::Anthropic {
            api_key,
            base_url,
            model,
            ..
        } => {
            if config.needs_api_key() {
                return Err(ProviderError::AuthFailure("no Anthropic API key configured".into()));
            }
            Ok(Arc::new(AnthropicClient::new(
                api_key,
                base_url.clone(),
                model,
                params,
            )?))
        }
        BackendConfig::Gemini {
            api_key,
            base_url,
            model,
            ..
        } => {
            if config.needs_api_key() {
                return Err(ProviderError::AuthFailure("no Gemini API key configured".into()));
            }
            Ok(Arc::new(GeminiClient::new(
                api_key,
                base_url.clone(),
                model,
                params,
            )?))
        }
    }
}
