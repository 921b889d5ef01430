//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use flashcards_core::chunker::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use flashcards_core::generation::DEFAULT_MAX_ATTEMPTS;
use flashcards_core::prompt::DEFAULT_MAX_CONTEXT_CHUNKS;
use flashcards_core::Chunker;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;

/// Origins of the web and Expo clients used during development.
const DEFAULT_ALLOWED_ORIGINS: &str =
    "http://localhost:3000,http://localhost:8081,http://localhost:19000,http://localhost:19006";

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Which cross-origin callers may use the API.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AllowedOrigins {
    Any,
    List(Vec<String>),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub run_migrations: bool,
    pub log_level: Level,
    pub openai_api_key: String,
    pub openai_base_url: Option<String>,
    pub flashcard_model: String,
    pub allowed_origins: AllowedOrigins,
    pub max_generation_attempts: u32,
    pub max_flashcards: usize,
    pub chunker: Chunker,
    pub max_context_chunks: usize,
    pub max_upload_bytes: usize,
    pub max_download_bytes: usize,
    pub download_timeout: Duration,
    pub upload_ttl: Duration,
    pub temp_dir: Option<PathBuf>,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let required = |key: &str| var(key).ok_or_else(|| ConfigError::MissingVar(key.to_string()));

        // --- Server and Database Settings ---
        let bind_address = parse_or(&var, "BIND_ADDRESS", SocketAddr::from(([0, 0, 0, 0], 8000)))?;
        let database_url = required("DATABASE_URL")?;
        let run_migrations = parse_or(&var, "RUN_MIGRATIONS", true)?;

        let log_level_str = var("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Text Generation Settings ---
        let openai_api_key = required("OPENAI_API_KEY")?;
        let openai_base_url = var("OPENAI_BASE_URL");
        let flashcard_model = var("FLASHCARD_MODEL").unwrap_or_else(|| "gpt-4o-mini".to_string());

        // --- Cross-Origin Settings ---
        let allowed_origins = parse_origins(
            &var("ALLOWED_ORIGINS").unwrap_or_else(|| DEFAULT_ALLOWED_ORIGINS.to_string()),
        );

        // --- Pipeline Settings ---
        let max_generation_attempts =
            parse_or(&var, "MAX_GENERATION_ATTEMPTS", DEFAULT_MAX_ATTEMPTS)?;
        if max_generation_attempts == 0 {
            return Err(invalid("MAX_GENERATION_ATTEMPTS", "must be at least 1"));
        }
        let max_flashcards = parse_or(&var, "MAX_FLASHCARDS", 50usize)?;
        if max_flashcards == 0 {
            return Err(invalid("MAX_FLASHCARDS", "must be at least 1"));
        }

        let chunk_size = parse_or(&var, "CHUNK_SIZE", DEFAULT_CHUNK_SIZE)?;
        let chunk_overlap =
            parse_or(&var, "CHUNK_OVERLAP", DEFAULT_CHUNK_OVERLAP)?;
        let chunker = Chunker::new(chunk_size, chunk_overlap)
            .map_err(|e| invalid("CHUNK_OVERLAP", &e.to_string()))?;
        let max_context_chunks =
            parse_or(&var, "MAX_CONTEXT_CHUNKS", DEFAULT_MAX_CONTEXT_CHUNKS)?;
        if max_context_chunks == 0 {
            return Err(invalid("MAX_CONTEXT_CHUNKS", "must be at least 1"));
        }

        // --- Upload and Download Settings ---
        let max_upload_bytes =
            parse_or(&var, "MAX_UPLOAD_BYTES", 10 * 1024 * 1024usize)?;
        let max_download_bytes =
            parse_or(&var, "MAX_DOWNLOAD_BYTES", 20 * 1024 * 1024usize)?;
        let download_timeout = Duration::from_secs(parse_or(
            &var,
            "DOWNLOAD_TIMEOUT_SECS",
            30u64,
        )?);
        let upload_ttl =
            Duration::from_secs(parse_or(&var, "UPLOAD_TTL_SECS", 3600u64)?);
        let temp_dir = var("TEMP_DIR").map(PathBuf::from);

        Ok(Self {
            bind_address,
            database_url,
            run_migrations,
            log_level,
            openai_api_key,
            openai_base_url,
            flashcard_model,
            allowed_origins,
            max_generation_attempts,
            max_flashcards,
            chunker,
            max_context_chunks,
            max_upload_bytes,
            max_download_bytes,
            download_timeout,
            upload_ttl,
            temp_dir,
        })
    }
}

fn invalid(key: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue(key.to_string(), reason.to_string())
}

/// Parses `key` when set, otherwise falls back to `default`.
fn parse_or<T, V>(var: &V, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    V: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| invalid(key, &format!("'{}': {}", raw, e))),
        None => Ok(default),
    }
}

fn parse_origins(raw: &str) -> AllowedOrigins {
    let origins: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect();
    if origins.iter().any(|origin| origin == "*") {
        AllowedOrigins::Any
    } else {
        AllowedOrigins::List(origins)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_with(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    const REQUIRED: [(&str, &str); 2] = [
        ("DATABASE_URL", "postgres://localhost/flashcards"),
        ("OPENAI_API_KEY", "sk-test"),
    ];

    #[test]
    fn defaults_apply_when_only_required_vars_are_set() {
        let config = config_with(&REQUIRED).unwrap();
        assert_eq!(config.bind_address, "0.0.0.0:8000".parse().unwrap());
        assert!(config.run_migrations);
        assert_eq!(config.log_level, Level::INFO);
        assert_eq!(config.flashcard_model, "gpt-4o-mini");
        assert_eq!(config.max_generation_attempts, 10);
        assert_eq!(config.chunker.size(), 1500);
        assert_eq!(config.chunker.overlap(), 200);
        assert_eq!(config.max_context_chunks, 8);
        assert_eq!(config.upload_ttl, Duration::from_secs(3600));
        assert!(matches!(config.allowed_origins, AllowedOrigins::List(ref list) if list.len() == 4));
    }

    #[test]
    fn missing_credentials_fail_fast() {
        let err = config_with(&[("DATABASE_URL", "postgres://localhost/flashcards")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar(ref key) if key == "OPENAI_API_KEY"));

        let err = config_with(&[("OPENAI_API_KEY", "sk-test")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar(ref key) if key == "DATABASE_URL"));
    }

    #[test]
    fn blank_required_var_counts_as_missing() {
        let err = config_with(&[("DATABASE_URL", "postgres://x"), ("OPENAI_API_KEY", "  ")])
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar(_)));
    }

    #[test]
    fn invalid_numbers_are_reported_with_their_key() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("MAX_GENERATION_ATTEMPTS", "many"));
        let err = config_with(&vars).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(ref key, _) if key == "MAX_GENERATION_ATTEMPTS"));
    }

    #[test]
    fn overlap_must_be_smaller_than_chunk_size() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("CHUNK_SIZE", "100"));
        vars.push(("CHUNK_OVERLAP", "100"));
        assert!(matches!(config_with(&vars), Err(ConfigError::InvalidValue(_, _))));
    }

    #[test]
    fn wildcard_origin_allows_any() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("ALLOWED_ORIGINS", "http://localhost:3000, *"));
        assert_eq!(config_with(&vars).unwrap().allowed_origins, AllowedOrigins::Any);
    }

    #[test]
    fn origins_are_split_and_trimmed() {
        assert_eq!(
            parse_origins(" http://a.test ,http://b.test,, "),
            AllowedOrigins::List(vec!["http://a.test".to_string(), "http://b.test".to_string()])
        );
    }
}
