use std::collections::HashMap;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};

pub const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:3000,http://127.0.0.1:3000";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

/// Runtime settings, read once at startup and handed to every component
/// that needs them.
#[derive(Clone, Debug)]
pub struct Settings {
    pub api_prefix: String,
    pub debug: bool,
    pub database_url: String,
    pub allowed_origins: Vec<String>,
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub openai_model: String,
    pub generation_timeout: Duration,
    pub max_concurrent_jobs: usize,
    pub host: String,
    pub port: u16,
}

impl Settings {
    /// Loads `.env` (if present) and then the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_env_with(&[])
    }

    /// Like [`Settings::from_env`], with `overrides` taking precedence over
    /// the environment.
    pub fn from_env_with(overrides: &[(&str, String)]) -> Result<Self> {
        if let Err(err) = dotenvy::dotenv() {
            if !err.not_found() {
                return Err(anyhow!("failed to read .env file: {}", err));
            }
        }

        let mut values = HashMap::new();
        for key in Self::tracked_keys() {
            if let Ok(value) = std::env::var(key) {
                values.insert(key.to_string(), value);
            }
        }
        for (key, value) in overrides {
            values.insert(key.to_string(), value.clone());
        }
        Self::from_map(&values)
    }

    pub fn from_map(values: &HashMap<String, String>) -> Result<Self> {
        fn value(values: &HashMap<String, String>, key: &str) -> Option<String> {
            values
                .get(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        }

        fn parsed<T: std::str::FromStr>(
            values: &HashMap<String, String>,
            key: &str,
            default: T,
        ) -> Result<T>
        where
            T::Err: std::fmt::Display,
        {
            match value(values, key) {
                Some(raw) => raw
                    .parse()
                    .map_err(|e| anyhow!("invalid value for {}: {} ({})", key, raw, e)),
                None => Ok(default),
            }
        }

        let database_url = value(values, "DATABASE_URL").context("DATABASE_URL must be set")?;

        let max_concurrent_jobs: usize = parsed(values, "MAX_CONCURRENT_JOBS", 4)?;
        if max_concurrent_jobs == 0 {
            return Err(anyhow!("MAX_CONCURRENT_JOBS must be at least 1"));
        }

        Ok(Self {
            api_prefix: normalize_prefix(
                &value(values, "API_PREFIX").unwrap_or_else(|| "/api".to_string()),
            ),
            debug: parse_bool(value(values, "DEBUG").as_deref())?,
            database_url,
            allowed_origins: parse_origins(
                values
                    .get("ALLOWED_ORIGINS")
                    .map(String::as_str)
                    .unwrap_or(DEFAULT_ALLOWED_ORIGINS),
            ),
            openai_api_key: value(values, "OPENAI_API_KEY"),
            openai_base_url: value(values, "OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            openai_model: value(values, "OPENAI_MODEL")
                .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
            generation_timeout: Duration::from_secs(parsed(values, "GENERATION_TIMEOUT_SECS", 300)?),
            max_concurrent_jobs,
            host: value(values, "HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parsed(values, "PORT", 8000)?,
        })
    }

    /// Settings suitable for tests and embedded use: no LLM key, the given
    /// database, default everything else.
    pub fn for_database(database_url: impl Into<String>) -> Self {
        Self {
            api_prefix: "/api".to_string(),
            debug: false,
            database_url: database_url.into(),
            allowed_origins: parse_origins(DEFAULT_ALLOWED_ORIGINS),
            openai_api_key: None,
            openai_base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            openai_model: DEFAULT_OPENAI_MODEL.to_string(),
            generation_timeout: Duration::from_secs(300),
            max_concurrent_jobs: 4,
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }

    fn tracked_keys() -> Vec<&'static str> {
        vec![
            "API_PREFIX",
            "DEBUG",
            "DATABASE_URL",
            "ALLOWED_ORIGINS",
            "OPENAI_API_KEY",
            "OPENAI_BASE_URL",
            "OPENAI_MODEL",
            "GENERATION_TIMEOUT_SECS",
            "MAX_CONCURRENT_JOBS",
            "HOST",
            "PORT",
        ]
    }
}

pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_bool(raw: Option<&str>) -> Result<bool> {
    match raw.map(str::to_ascii_lowercase).as_deref() {
        None => Ok(false),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some("0" | "false" | "no" | "off") => Ok(false),
        Some(other) => Err(anyhow!("invalid value for DEBUG: {}", other)),
    }
}

fn normalize_prefix(raw: &str) -> String {
    let trimmed = raw.trim_end_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}
