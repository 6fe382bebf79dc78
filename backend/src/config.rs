//! Configuration management for the card stock server
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (config/development.toml, config/production.toml)
//! 3. Environment variables (PORT, DATABASE_URL, UPLOAD_DIR, SYSTEM_MODE, ...)

use config::{ConfigError, File};
use serde::Deserialize;
use shared::SystemMode;

/// Default upload size limit (10 MiB)
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Default accepted attachment types
pub const DEFAULT_ALLOWED_MIME_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/webp",
    "image/gif",
    "application/pdf",
];

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Attachment upload configuration
    pub upload: UploadConfig,

    /// Mode used when a request carries no `x-system-mode` header
    pub system_mode: SystemMode,

    /// Shared API key; the API is open when unset
    pub api_key: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct UploadConfig {
    /// Directory attachments are written to
    pub dir: String,

    /// Maximum size of a single file in bytes
    pub max_file_size: u64,

    /// Accepted MIME types
    pub allowed_mime_types: Vec<String>,
}

impl UploadConfig {
    pub fn allows(&self, mime_type: &str) -> bool {
        self.allowed_mime_types
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(mime_type))
    }
}

/// Split a comma separated list, dropping blanks
fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment = env("APP_ENVIRONMENT").unwrap_or_else(|| "development".into());

        let default_mime_types: Vec<String> =
            DEFAULT_ALLOWED_MIME_TYPES.iter().map(|s| s.to_string()).collect();

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.url", "postgres://localhost/card_stock")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 1)?
            .set_default("upload.dir", "./uploads")?
            .set_default("upload.max_file_size", DEFAULT_MAX_FILE_SIZE)?
            .set_default("upload.allowed_mime_types", default_mime_types)?
            .set_default("system_mode", SystemMode::default().as_str())?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with the flat environment variables the deployment uses
            .set_override_option("server.port", env("PORT"))?
            .set_override_option("server.host", env("HOST"))?
            .set_override_option("database.url", env("DATABASE_URL"))?
            .set_override_option("database.max_connections", env("DATABASE_MAX_CONNECTIONS"))?
            .set_override_option("upload.dir", env("UPLOAD_DIR"))?
            .set_override_option("upload.max_file_size", env("UPLOAD_MAX_FILE_SIZE"))?
            .set_override_option(
                "upload.allowed_mime_types",
                env("UPLOAD_ALLOWED_MIME_TYPES").map(|raw| parse_list(&raw)),
            )?
            .set_override_option("system_mode", env("SYSTEM_MODE").map(|m| m.to_ascii_uppercase()))?
            .set_override_option("api_key", env("API_KEY"))?
            .build()?;

        config.try_deserialize()
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list() {
        assert_eq!(
            parse_list("image/png, application/pdf,,"),
            vec!["image/png".to_string(), "application/pdf".to_string()]
        );
        assert!(parse_list(" ").is_empty());
    }

    #[test]
    fn test_upload_allows_case_insensitive() {
        let upload = UploadConfig {
            dir: "./uploads".into(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            allowed_mime_types: vec!["image/png".into()],
        };
        assert!(upload.allows("IMAGE/PNG"));
        assert!(!upload.allows("text/html"));
    }
}
