//! Configuration management
//!
//! Manages the coach endpoint and speech settings.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::coach::client::DEFAULT_TIMEOUT_SECS;
use crate::voice::announcer::{DEFAULT_PITCH, DEFAULT_PREFERRED_VOICES, DEFAULT_RATE};
use crate::voice::engine::DEFAULT_SPEECH_PROGRAM;

/// Overrides `coach.base_url`
pub const ENV_API_URL: &str = "SARI_COACH_API_URL";

/// Overrides `coach.store_id`
pub const ENV_STORE_ID: &str = "SARI_COACH_STORE_ID";

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    /// Coach backend settings
    #[serde(default)]
    pub coach: CoachConfig,
    /// Spoken answer settings
    #[serde(default)]
    pub speech: SpeechConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoachConfig {
    /// Base URL of the backend serving `/api/coach/ask`
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Store the questions are about
    #[serde(default = "default_store_id")]
    pub store_id: i64,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_store_id() -> i64 {
    1
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for CoachConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            store_id: default_store_id(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeechConfig {
    /// Speak answers aloud
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Synthesizer program (espeak-ng compatible)
    #[serde(default = "default_program")]
    pub program: String,
    /// Speaking rate (1.0 = normal)
    #[serde(default = "default_rate")]
    pub rate: f32,
    /// Pitch (1.0 = neutral)
    #[serde(default = "default_pitch")]
    pub pitch: f32,
    /// Voice name fragments to prefer, case-sensitive
    #[serde(default = "default_preferred_voices")]
    pub preferred_voices: Vec<String>,
}

fn default_true() -> bool {
    true
}

fn default_program() -> String {
    DEFAULT_SPEECH_PROGRAM.to_string()
}

fn default_rate() -> f32 {
    DEFAULT_RATE
}

fn default_pitch() -> f32 {
    DEFAULT_PITCH
}

fn default_preferred_voices() -> Vec<String> {
    DEFAULT_PREFERRED_VOICES.iter().map(|s| s.to_string()).collect()
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            program: default_program(),
            rate: default_rate(),
            pitch: default_pitch(),
            preferred_voices: default_preferred_voices(),
        }
    }
}

impl Config {
    /// Load configuration from the default location, then apply env overrides
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&config_path()?)?;
        config.apply_env();
        Ok(config)
    }

    /// Load configuration from a file, writing defaults if it does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .context("Failed to read config file")?;
            let config: Config = toml::from_str(&contents)
                .context("Failed to parse config file")?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&config_path()?)
    }

    /// Save configuration to a file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let parent = path.parent()
            .context("Config path has no parent")?;

        std::fs::create_dir_all(parent)
            .context("Failed to create config directory")?;

        let contents = toml::to_string_pretty(self)
            .context("Failed to serialize config")?;

        std::fs::write(path, contents)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Apply `SARI_COACH_*` environment overrides
    pub fn apply_env(&mut self) {
        self.apply_overrides(
            std::env::var(ENV_API_URL).ok(),
            std::env::var(ENV_STORE_ID).ok(),
        );
    }

    fn apply_overrides(&mut self, api_url: Option<String>, store_id: Option<String>) {
        if let Some(url) = api_url.filter(|u| !u.trim().is_empty()) {
            self.coach.base_url = url;
        }

        if let Some(raw) = store_id {
            match raw.trim().parse::<i64>() {
                Ok(id) => self.coach.store_id = id,
                Err(_) => tracing::warn!("Ignoring invalid {}={:?}", ENV_STORE_ID, raw),
            }
        }
    }
}

/// Get the configuration file path
pub fn config_path() -> Result<PathBuf> {
    let base = directories::ProjectDirs::from("com", "sari-coach", "sari-coach")
        .context("Failed to get project directories")?;
    Ok(base.config_dir().join("config.toml"))
}

/// Show current configuration
pub fn show_config() -> Result<()> {
    let config = Config::load()?;

    println!("Configuration ({})", config_path()?.display());
    print!("{}", config_table(&config));

    Ok(())
}

/// One aligned `key: value` line per setting
fn config_table(config: &Config) -> String {
    let rows = [
        ("coach.base_url", config.coach.base_url.clone()),
        ("coach.store_id", config.coach.store_id.to_string()),
        ("coach.timeout_secs", config.coach.timeout_secs.to_string()),
        ("speech.enabled", config.speech.enabled.to_string()),
        ("speech.program", config.speech.program.clone()),
        ("speech.rate", config.speech.rate.to_string()),
        ("speech.pitch", config.speech.pitch.to_string()),
        ("speech.preferred_voices", config.speech.preferred_voices.join(", ")),
    ];
    let width = rows.iter().map(|(key, _)| key.len()).max().unwrap_or(0) + 1;

    rows.iter()
        .map(|(key, value)| format!("  {:<width$} {}\n", format!("{}:", key), value, width = width))
        .collect()
}

/// Set the coach base URL
pub fn set_base_url(url: &str) -> Result<()> {
    let mut config = Config::load_from(&config_path()?)?;
    config.coach.base_url = url.trim_end_matches('/').to_string();
    config.save()?;
    println!("Coach URL set to: {}", config.coach.base_url);
    Ok(())
}

/// Set the default store id
pub fn set_store_id(store_id: i64) -> Result<()> {
    if store_id <= 0 {
        anyhow::bail!("Store id must be positive, got {}", store_id);
    }
    let mut config = Config::load_from(&config_path()?)?;
    config.coach.store_id = store_id;
    config.save()?;
    println!("Store id set to: {}", store_id);
    Ok(())
}

/// Reset configuration to defaults
pub fn reset_config() -> Result<()> {
    let config = Config::default();
    config.save()?;
    println!("Configuration reset to defaults.");
    Ok(())
}
