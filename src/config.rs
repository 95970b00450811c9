use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use crate::decision::DEFAULT_CANDIDATES;
use crate::feedback::{DEFAULT_BATCH_SIZE, DEFAULT_LOOKUP_DELAY};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    pub match_loop_secs: u64,
    pub feedback_loop_secs: u64,
    pub feedback_batch_size: u32,
    pub feedback_delay_secs: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            match_loop_secs: 30,
            feedback_loop_secs: 900,
            feedback_batch_size: DEFAULT_BATCH_SIZE,
            feedback_delay_secs: DEFAULT_LOOKUP_DELAY.as_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PacingConfig {
    pub min_delay_secs: u64,
    pub max_delay_secs: u64,
    pub post_publish_pause_secs: u64,
    pub enabled: bool,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            min_delay_secs: 5,
            max_delay_secs: 20,
            post_publish_pause_secs: 5,
            enabled: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    pub candidates: usize,
    pub style_examples_path: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            candidates: DEFAULT_CANDIDATES,
            style_examples_path: "data/posts_history.json".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub db_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: "data/learning.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BotConfig {
    #[serde(default)]
    pub watch: WatchConfig,
    #[serde(default)]
    pub pacing: PacingConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

impl BotConfig {
    pub fn load(path: Option<PathBuf>) -> Result<(Self, Option<PathBuf>), String> {
        let config_path = path.or_else(default_config_path);
        let mut config = if let Some(path) = config_path.as_ref() {
            if path.exists() {
                let contents = std::fs::read_to_string(path)
                    .map_err(|err| format!("failed to read config: {}", err))?;
                toml::from_str(&contents)
                    .map_err(|err| format!("failed to parse config: {}", err))?
            } else {
                BotConfig::default()
            }
        } else {
            BotConfig::default()
        };

        config.apply_env_overrides();
        Ok((config, config_path))
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(secs) = env::var("MATCH_LOOP_SECONDS") {
            if let Ok(value) = secs.parse::<u64>() {
                self.watch.match_loop_secs = value;
            }
        }
        if let Ok(secs) = env::var("FEEDBACK_LOOP_SECONDS") {
            if let Ok(value) = secs.parse::<u64>() {
                self.watch.feedback_loop_secs = value;
            }
        }
        if let Ok(size) = env::var("FEEDBACK_BATCH_SIZE") {
            if let Ok(value) = size.parse::<u32>() {
                self.watch.feedback_batch_size = value;
            }
        }
        if let Ok(enabled) = env::var("PACING_ENABLED") {
            if let Ok(value) = enabled.parse::<bool>() {
                self.pacing.enabled = value;
            }
        }
        if let Ok(path) = env::var("DB_PATH") {
            if !path.trim().is_empty() {
                self.storage.db_path = path;
            }
        }
        if let Ok(path) = env::var("STYLE_EXAMPLES_PATH") {
            if !path.trim().is_empty() {
                self.generation.style_examples_path = path;
            }
        }
    }
}

fn default_config_path() -> Option<PathBuf> {
    env::var("BOT_CONFIG_PATH")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from)
        .or_else(|| Some(PathBuf::from("config/bot.toml")))
}
