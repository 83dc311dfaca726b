use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_model")]
    pub model: String,
    pub api_key: Option<String>,
    /// Client-side cap on a single model call. The upstream service enforces
    /// nothing, so without this a hung call leaves the client busy forever.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default)]
    pub limits: LimitConfig,

    #[serde(default)]
    pub exam: ExamConfig,

    #[serde(default)]
    pub payment: PaymentConfig,

    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitConfig {
    /// Free-tier question budget before the upgrade prompt.
    #[serde(default = "default_free_question_limit")]
    pub free_question_limit: u32,
    /// How many trailing transcript entries accompany a tutor request.
    #[serde(default = "default_history_window")]
    pub history_window: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamConfig {
    #[serde(default = "default_question_count")]
    pub question_count: usize,
    #[serde(default = "default_exam_duration")]
    pub duration_secs: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentConfig {
    /// Simulated gateway settlement delay.
    #[serde(default = "default_settlement_delay")]
    pub settlement_delay_ms: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Overrides the platform data directory. Mainly for tests.
    pub data_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            api_key: None,
            request_timeout_secs: default_request_timeout(),
            limits: LimitConfig::default(),
            exam: ExamConfig::default(),
            payment: PaymentConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl Default for LimitConfig {
    fn default() -> Self {
        Self {
            free_question_limit: default_free_question_limit(),
            history_window: default_history_window(),
        }
    }
}

impl Default for ExamConfig {
    fn default() -> Self {
        Self {
            question_count: default_question_count(),
            duration_secs: default_exam_duration(),
        }
    }
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            settlement_delay_ms: default_settlement_delay(),
        }
    }
}

fn default_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}
fn default_model() -> String {
    "gemini-3-flash-preview".to_string()
}
fn default_request_timeout() -> u64 {
    60
}
fn default_free_question_limit() -> u32 {
    5
}
fn default_history_window() -> usize {
    4
}
fn default_question_count() -> usize {
    20
}
fn default_exam_duration() -> u32 {
    1200
}
fn default_settlement_delay() -> u64 {
    2500
}

impl Config {
    pub fn load(path: Option<&str>) -> Result<Self> {
        match path {
            Some(p) => {
                let content = std::fs::read_to_string(p)
                    .with_context(|| format!("Failed to read config from {}", p))?;
                toml::from_str(&content).context("Failed to parse config")
            }
            None => {
                let default_paths = ["tutorbrain.toml", "~/.config/tutorbrain/config.toml"];
                for p in &default_paths {
                    if let Ok(content) = std::fs::read_to_string(p) {
                        return toml::from_str(&content).context("Failed to parse config");
                    }
                }
                tracing::debug!("no config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Resolved directory for the persisted profile and history records.
    pub fn data_dir(&self) -> PathBuf {
        self.storage.data_dir.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("tutorbrain")
        })
    }
}
