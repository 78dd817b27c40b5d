/// Configuration management for Interaction Service
///
/// Loads configuration from environment variables.
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application settings
    pub app: AppConfig,
    /// Seed data settings
    pub seed: SeedConfig,
    /// Logging settings
    pub logging: LoggingConfig,
    /// Content limits enforced by the engine
    pub limits: Limits,
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application environment (dev, staging, prod)
    pub env: String,
    /// Server host to bind to
    pub host: String,
    /// HTTP port
    pub http_port: u16,
}

/// Seed data configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedConfig {
    /// JSON file with initial users, posts, follows, messages, notifications
    pub path: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub format: LogFormat,
}

/// Content limits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Limits {
    /// Max characters in a post, comment or message body
    #[serde(default = "default_max_post_length")]
    pub max_post_length: usize,
    /// Max characters in a profile bio
    #[serde(default = "default_max_bio_length")]
    pub max_bio_length: usize,
    /// Max media attachments per post
    #[serde(default = "default_max_media_per_post")]
    pub max_media_per_post: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_post_length: default_max_post_length(),
            max_bio_length: default_max_bio_length(),
            max_media_per_post: default_max_media_per_post(),
        }
    }
}

// Default values
fn default_max_post_length() -> usize {
    500
}

fn default_max_bio_length() -> usize {
    160
}

fn default_max_media_per_post() -> usize {
    4
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let app = AppConfig {
            env: std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            http_port: env_parse("PORT").unwrap_or(8010), // interaction-service default HTTP port
        };

        let seed = SeedConfig {
            path: std::env::var("SEED_PATH").ok().filter(|p| !p.is_empty()),
        };

        let format = match std::env::var("LOG_FORMAT")
            .unwrap_or_else(|_| "pretty".to_string())
            .to_lowercase()
            .as_str()
        {
            "json" => LogFormat::Json,
            "pretty" | "" => LogFormat::Pretty,
            other => bail!("LOG_FORMAT must be 'json' or 'pretty', got '{}'", other),
        };

        let limits = Limits {
            max_post_length: env_parse("MAX_POST_LENGTH").unwrap_or_else(default_max_post_length),
            max_bio_length: env_parse("MAX_BIO_LENGTH").unwrap_or_else(default_max_bio_length),
            max_media_per_post: env_parse("MAX_MEDIA_PER_POST")
                .unwrap_or_else(default_max_media_per_post),
        };

        if limits.max_post_length == 0 {
            bail!("MAX_POST_LENGTH must be greater than zero");
        }

        Ok(Config {
            app,
            seed,
            logging: LoggingConfig { format },
            limits,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.app.host, self.app.http_port)
    }
}
