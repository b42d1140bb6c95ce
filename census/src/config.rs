//! Configuration loading
//!
//! Reads an optional JSON config file into [`ScanConfig`] and provides helpers
//! for reading environment variables with fallback to deprecated names.

use std::path::Path;

use crate::common::config::ScanConfig;
use crate::error::{CensusError, CensusResult};

/// Get an environment variable with fallback to a deprecated name
///
/// If the new variable name is set, returns its value.
/// If only the old (deprecated) variable name is set, returns its value
/// and logs a deprecation warning.
///
/// # Example
/// ```
/// use llm_census::config::get_env_with_fallback;
///
/// let level = get_env_with_fallback("LLM_CENSUS_LOG_LEVEL", "LOG_LEVEL");
/// ```
pub fn get_env_with_fallback(new_name: &str, old_name: &str) -> Option<String> {
    if let Ok(val) = std::env::var(new_name) {
        return Some(val);
    }
    if let Ok(val) = std::env::var(old_name) {
        tracing::warn!(
            "Environment variable '{}' is deprecated, use '{}' instead",
            old_name,
            new_name
        );
        return Some(val);
    }
    None
}

/// Get an environment variable with fallback and default value
pub fn get_env_with_fallback_or(new_name: &str, old_name: &str, default: &str) -> String {
    get_env_with_fallback(new_name, old_name).unwrap_or_else(|| default.to_string())
}

/// Load scan configuration
///
/// Without a path the built-in defaults are used. With a path the file must be
/// a JSON object; missing keys fall back to their defaults.
pub async fn load_scan_config(path: Option<&Path>) -> CensusResult<ScanConfig> {
    let Some(path) = path else {
        return Ok(ScanConfig::default());
    };

    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| CensusError::io(path, e))?;
    let config: ScanConfig = serde_json::from_str(&content)?;
    Ok(config)
}
