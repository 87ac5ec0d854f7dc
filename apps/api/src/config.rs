use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::llm_client::DEFAULT_API_BASE;

const DEFAULT_MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: String,
    /// Base of the Gemini `models` endpoint.
    pub gemini_api_base: String,
    pub port: u16,
    pub rust_log: String,
    /// Root for generated artifacts. Stored presentation records live in `<work_dir>/presentations`.
    pub work_dir: PathBuf,
    /// Explicit LibreOffice binary. When unset the converter probes the usual locations.
    pub soffice_path: Option<PathBuf>,
    pub pdf_timeout_secs: u64,
    pub image_concurrency: usize,
    pub max_upload_bytes: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            gemini_api_key: require_env("GEMINI_API_KEY")?,
            gemini_api_base: std::env::var("GEMINI_API_BASE")
                .unwrap_or_else(|_| DEFAULT_API_BASE.to_string()),
            port: parse_env("PORT", 8000)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            work_dir: std::env::var("WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("temp")),
            soffice_path: std::env::var("SOFFICE_PATH").ok().map(PathBuf::from),
            pdf_timeout_secs: parse_env("PDF_TIMEOUT_SECS", 120)?,
            image_concurrency: parse_env::<usize>("IMAGE_CONCURRENCY", 4)?.max(1),
            max_upload_bytes: parse_env("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
impl Config {
    /// Configuration for tests: no real API key, artifacts under `work_dir`.
    pub fn for_tests(work_dir: PathBuf) -> Self {
        Config {
            gemini_api_key: "test-key".to_string(),
            gemini_api_base: DEFAULT_API_BASE.to_string(),
            port: 0,
            rust_log: "debug".to_string(),
            work_dir,
            soffice_path: None,
            pdf_timeout_secs: 5,
            image_concurrency: 2,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_env_uses_default_when_unset() {
        let value: u64 = parse_env("SLIDEFLOW_TEST_UNSET_VARIABLE", 42).unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn test_parse_env_rejects_garbage() {
        std::env::set_var("SLIDEFLOW_TEST_BAD_NUMBER", "eight");
        let result: Result<u16> = parse_env("SLIDEFLOW_TEST_BAD_NUMBER", 1);
        assert!(result.is_err());
        std::env::remove_var("SLIDEFLOW_TEST_BAD_NUMBER");
    }
}
