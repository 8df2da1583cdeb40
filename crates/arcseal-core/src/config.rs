use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{ArcsealError, ArcsealResult};

/// Top-level configuration (loaded from arcseal.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ArcsealConfig {
    pub crypto: CryptoConfig,
    pub logging: LoggingConfig,
}

impl ArcsealConfig {
    /// Parse a configuration from TOML text. Missing keys take their defaults.
    pub fn from_toml_str(content: &str) -> ArcsealResult<Self> {
        toml::from_str(content).map_err(|e| ArcsealError::Config(format!("parsing config: {e}")))
    }

    /// Load configuration from `path`, falling back to defaults if the file
    /// does not exist.
    pub async fn load(path: &Path) -> ArcsealResult<Self> {
        if !path.exists() {
            tracing::warn!(
                "config file not found: {}  (using defaults)",
                path.display()
            );
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path).await?;
        let config = toml::from_str(&content)
            .map_err(|e| ArcsealError::Config(format!("parsing config {}: {e}", path.display())))?;

        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }
}

/// Archive encryption configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CryptoConfig {
    /// Argon2id memory cost in KiB (default: 65536 = 64 MiB)
    pub argon2_mem_cost_kib: u32,
    /// Argon2id time cost (iterations, default: 3)
    pub argon2_time_cost: u32,
    /// Argon2id parallelism (default: 4)
    pub argon2_parallelism: u32,
    /// RSA modulus size used when provisioning a new backup key pair
    pub rsa_key_bits: usize,
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            argon2_mem_cost_kib: 65536,
            argon2_time_cost: 3,
            argon2_parallelism: 4,
            rsa_key_bits: 3072,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter, overridden by RUST_LOG (default: info)
    pub log_level: String,
    /// Log format: "json" or "text"
    pub log_format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
            log_format: LogFormat::Text,
        }
    }
}
