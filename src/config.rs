use anyhow::Result;
use serde::Deserialize;
use std::env;
use tracing::{info, warn};

use crate::errors::ConfigError;
use crate::llm_providers::LLMProviderType;
use crate::recovery::CandidateSelection;

// Import logging macros
use crate::{log_system_event, log_validation};

/// Responses shorter than this many characters are treated as truncated.
pub const DEFAULT_MIN_RESPONSE_LENGTH: usize = 20;

/// Complete application configuration loaded from environment variables
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub llm: LLMConfig,
    pub recovery: RecoveryConfig,
    pub logging: LoggingConfig,
}

/// Large Language Model service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LLMConfig {
    pub api_key: String,
    pub base_url: Option<String>,
    pub provider: LLMProviderType,
    pub model: Option<String>,
}

/// Tunables of the recovery cascade
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RecoveryConfig {
    pub min_response_length: usize,
    pub candidate_selection: CandidateSelection,
    pub backfill_partial: bool,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            min_response_length: DEFAULT_MIN_RESPONSE_LENGTH,
            candidate_selection: CandidateSelection::Longest,
            backfill_partial: true,
        }
    }
}

/// Logging system configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file_enabled: bool,
    pub console_enabled: bool,
    pub log_directory: String,
}

impl Config {
    /// Load configuration from environment variables with sensible defaults
    pub fn from_env() -> Result<Self> {
        log_system_event!(config, "Loading application configuration from environment variables");

        let config = Config {
            llm: LLMConfig::from_env()?,
            recovery: RecoveryConfig::from_env()?,
            logging: LoggingConfig::from_env()?,
        };

        log_system_event!(config, "Configuration loaded successfully");
        config.log_configuration_summary();

        Ok(config)
    }

    /// Log a summary of loaded configuration (without sensitive data)
    fn log_configuration_summary(&self) {
        info!(
            llm_api_key_masked = %mask_sensitive_data(&self.llm.api_key),
            llm_provider = ?self.llm.provider,
            llm_model = ?self.llm.model,
            min_response_length = self.recovery.min_response_length,
            candidate_selection = ?self.recovery.candidate_selection,
            backfill_partial = self.recovery.backfill_partial,
            log_level = %self.logging.level,
            "Configuration summary"
        );
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.recovery.min_response_length == 0 {
            return Err(ConfigError::Invalid(
                "RECOVERY_MIN_RESPONSE_LENGTH must be greater than 0".to_string(),
            )
            .into());
        }

        if self.llm.api_key.is_empty() || self.llm.api_key == "your-api-key" {
            warn!("LLM API key appears to be placeholder or empty - generation will fall back to placeholder content");
        }

        if !self.logging.file_enabled && !self.logging.console_enabled {
            warn!("Both file and console logging are disabled");
        }

        log_validation!(success, "configuration", "Configuration validation completed successfully");
        Ok(())
    }
}

impl LLMConfig {
    pub fn from_env() -> Result<Self> {
        let api_key = env::var("LLM_API_KEY").unwrap_or_else(|_| "your-api-key".to_string());

        let base_url = env::var("LLM_BASE_URL").ok();

        let provider_str = env::var("LLM_PROVIDER").unwrap_or_else(|_| "openai".to_string());
        let provider = LLMProviderType::from_name(&provider_str);

        let model = env::var("LLM_MODEL").ok();

        Ok(LLMConfig {
            api_key,
            base_url,
            provider,
            model,
        })
    }
}

impl RecoveryConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = RecoveryConfig::default();

        let min_response_length = match env::var("RECOVERY_MIN_RESPONSE_LENGTH") {
            Ok(value) => value.trim().parse::<usize>().map_err(|e| ConfigError::InvalidValue {
                key: "RECOVERY_MIN_RESPONSE_LENGTH",
                value: value.clone(),
                reason: e.to_string(),
            })?,
            Err(_) => defaults.min_response_length,
        };

        let candidate_selection = match env::var("RECOVERY_CANDIDATE_SELECTION") {
            Ok(value) => value.parse::<CandidateSelection>().unwrap_or_else(|e| {
                warn!("{}, defaulting to longest", e);
                defaults.candidate_selection
            }),
            Err(_) => defaults.candidate_selection,
        };

        let backfill_partial = env::var("RECOVERY_BACKFILL_PARTIAL")
            .unwrap_or_else(|_| "true".to_string())
            .parse::<bool>()
            .unwrap_or(defaults.backfill_partial);

        Ok(RecoveryConfig {
            min_response_length,
            candidate_selection,
            backfill_partial,
        })
    }
}

impl LoggingConfig {
    pub fn from_env() -> Result<Self> {
        let level = env::var("RUST_LOG").unwrap_or_else(|_| "info,lesson_quiz=debug".to_string());

        let file_enabled = env::var("LOG_FILE_ENABLED")
            .unwrap_or_else(|_| "true".to_string())
            .parse::<bool>()
            .unwrap_or(true);

        let console_enabled = env::var("LOG_CONSOLE_ENABLED")
            .unwrap_or_else(|_| "true".to_string())
            .parse::<bool>()
            .unwrap_or(true);

        let log_directory = env::var("LOG_DIRECTORY").unwrap_or_else(|_| "logs".to_string());

        Ok(LoggingConfig {
            level,
            file_enabled,
            console_enabled,
            log_directory,
        })
    }
}

/// Mask sensitive data in configuration for safe logging
pub fn mask_sensitive_data(data: &str) -> String {
    let chars: Vec<char> = data.chars().collect();
    if chars.len() <= 8 {
        "*".repeat(chars.len())
    } else {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}***{}", head, tail)
    }
}
