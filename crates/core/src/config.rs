use crate::error::{OrganizeError, Result};
use serde::{Deserialize, Serialize};

pub const AGENT_KEY_VAR: &str = "OPENROUTER_API_KEY";
pub const METADATA_KEY_VAR: &str = "TMDB_API_KEY";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub agent: AgentConfig,
    pub metadata: MetadataConfig,
    pub scan: ScanConfig,
    pub organizer: OrganizerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    /// Tool-calling rounds allowed within one decision.
    pub max_steps: usize,
    /// Upper bound on one decision; exceeding it aborts the run.
    pub timeout_secs: Option<u64>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            base_url: "https://openrouter.ai/api/v1".to_string(),
            model: "anthropic/claude-3.5-sonnet".to_string(),
            temperature: 0.1,
            max_steps: 25,
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    pub base_url: String,
    pub language: String,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.themoviedb.org/3".to_string(),
            language: "en-US".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub exclude: Vec<String>,
    pub follow_links: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrganizerConfig {
    pub max_iterations: Option<usize>,
    pub max_idle_passes: usize,
    pub copy_then_delete: bool,
}

impl Default for OrganizerConfig {
    fn default() -> Self {
        Self {
            max_iterations: None,
            max_idle_passes: 3,
            copy_then_delete: false,
        }
    }
}

/// API keys for the two external collaborators.
#[derive(Clone)]
pub struct Credentials {
    pub agent_api_key: String,
    pub metadata_api_key: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials").finish_non_exhaustive()
    }
}

impl Credentials {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |name: &str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| {
                    OrganizeError::ConfigurationMissing(format!(
                        "please set the {} environment variable",
                        name
                    ))
                })
        };
        Ok(Self {
            agent_api_key: require(AGENT_KEY_VAR)?,
            metadata_api_key: require(METADATA_KEY_VAR)?,
        })
    }
}

/// Layers an optional TOML file under `MEDIASORT_*` environment overrides.
pub fn load(path: Option<&str>) -> Result<AppConfig> {
    let mut settings = config::Config::builder();
    if let Some(p) = path {
        settings = settings.add_source(config::File::with_name(p));
    } else {
        settings = settings.add_source(config::File::with_name("config/default").required(false));
    }
    settings = settings.add_source(
        config::Environment::with_prefix("MEDIASORT")
            .prefix_separator("_")
            .separator("__"),
    );
    let cfg = settings.build()?;
    Ok(cfg.try_deserialize()?)
}
