use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, bail, Context as AnyhowContext, Result};
use ask_model::{resolve_model, supports_1m_context, AnthropicConfig, DEFAULT_MODEL};
use ask_protocol::{ExpansionPolicy, FilterPolicy};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

const CONFIG_DIR: &str = ".ask";
const CONFIG_FILE: &str = "cfg.toml";

/// Context window requested from the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
pub enum ContextMode {
    #[default]
    #[serde(rename = "standard")]
    #[value(name = "standard")]
    Standard,
    #[serde(rename = "1m")]
    #[value(name = "1m")]
    OneMillion,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThinkingConfig {
    pub enabled: bool,
    /// Fraction of `max_tokens` given to extended thinking.
    pub budget: f64,
}

impl Default for ThinkingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            budget: 0.8,
        }
    }
}

/// Contents of `~/.ask/cfg.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub version: u32,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    pub context: ContextMode,
    pub thinking: ThinkingConfig,
    pub expand: ExpansionPolicy,
    pub filter: FilterPolicy,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: 1,
            model: DEFAULT_MODEL.to_string(),
            temperature: 1.0,
            max_tokens: 32_000,
            timeout_secs: 300,
            context: ContextMode::Standard,
            thinking: ThinkingConfig::default(),
            expand: ExpansionPolicy::default(),
            filter: FilterPolicy::default(),
        }
    }
}

/// Location of the config file under the user's home directory.
pub fn config_path() -> Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| anyhow!("cannot determine home directory"))?;
    Ok(home.join(CONFIG_DIR).join(CONFIG_FILE))
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        Self::load_from(&config_path()?)
    }

    /// Read and validate the config, writing defaults first if the file is absent.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            let config = Self::default();
            config.save_to(path)?;
            log::info!("Created default config at {}", path.display());
            return Ok(config);
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Self = toml::from_str(&raw)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config {}", path.display()))?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        self.validate()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let text = toml::to_string_pretty(self).context("Failed to serialize config")?;
        ask_session::write_atomic(path, text.as_bytes())
            .with_context(|| format!("Failed to write config {}", path.display()))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            bail!("model must not be empty");
        }
        if !(0.0..=1.0).contains(&self.temperature) {
            bail!("temperature must be between 0.0 and 1.0, got {}", self.temperature);
        }
        if self.max_tokens == 0 {
            bail!("max_tokens must be > 0");
        }
        if self.timeout_secs == 0 {
            bail!("timeout_secs must be > 0");
        }
        if !(self.thinking.budget > 0.0 && self.thinking.budget < 1.0) {
            bail!(
                "thinking.budget must be between 0.0 and 1.0 (exclusive), got {}",
                self.thinking.budget
            );
        }
        self.expand.validate()?;
        self.filter.validate()?;
        Ok(())
    }

    pub fn resolved_model(&self) -> String {
        resolve_model(&self.model)
    }

    /// Thinking budget in tokens, when thinking is enabled.
    pub fn thinking_tokens(&self) -> Option<u32> {
        if !self.thinking.enabled {
            return None;
        }
        let tokens = (f64::from(self.max_tokens) * self.thinking.budget).floor();
        Some(tokens as u32)
    }

    pub fn uses_1m_context(&self) -> bool {
        self.context == ContextMode::OneMillion
    }

    /// Client settings for this config; the API key comes from the environment.
    pub fn anthropic_config(&self) -> Result<AnthropicConfig> {
        let model = self.resolved_model();
        let mut client = AnthropicConfig::from_env(&model)?;
        client.max_tokens = self.max_tokens;
        client.temperature = self.temperature;
        client.thinking_budget = self.thinking_tokens();
        client.timeout = Duration::from_secs(self.timeout_secs);
        client.context_1m = self.uses_1m_context();
        if client.context_1m && !supports_1m_context(&model) {
            log::warn!("Model {model} may not support the 1M context window");
        }
        Ok(client)
    }
}
