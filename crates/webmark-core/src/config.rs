//! Configuration for the fetch → convert → write pipeline.
//!
//! Every option has a default, so a missing or partial config file is fine.
//! The CLI can override individual fields after loading.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Top-level webmark configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub browser: BrowserConfig,

    #[serde(default)]
    pub convert: ConvertConfig,
}

impl Config {
    /// Load configuration from a JSON file.
    pub fn load(path: &Path) -> Result<Config> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

/// Browser session options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// Explicit Chrome/Chromium binary. Auto-detected when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chrome_path: Option<String>,

    /// Use an isolated profile with nothing persisted across runs.
    #[serde(default = "default_true")]
    pub incognito: bool,

    /// Suppress automation fingerprints (webdriver flag, UA, etc.).
    #[serde(default = "default_true")]
    pub anti_detection: bool,

    /// Fixed grace period after navigation for client-side rendering.
    #[serde(default = "default_render_wait_ms")]
    pub render_wait_ms: u64,

    #[serde(default = "default_navigation_timeout_ms")]
    pub navigation_timeout_ms: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            chrome_path: None,
            incognito: true,
            anti_detection: true,
            render_wait_ms: default_render_wait_ms(),
            navigation_timeout_ms: default_navigation_timeout_ms(),
        }
    }
}

/// Markdown conversion options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvertConfig {
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f64,

    #[serde(default = "default_top_p")]
    pub top_p: f64,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// OpenAI-compatible endpoint base URL. Defaults to api.openai.com.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            max_tokens: default_max_tokens(),
            base_url: None,
            api_key_env: default_api_key_env(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_render_wait_ms() -> u64 {
    3_000
}

fn default_navigation_timeout_ms() -> u64 {
    30_000
}

fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_temperature() -> f64 {
    0.6
}

fn default_top_p() -> f64 {
    0.9
}

fn default_max_tokens() -> u32 {
    8_192
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.browser.incognito);
        assert!(config.browser.anti_detection);
        assert_eq!(config.browser.render_wait_ms, 3_000);
        assert_eq!(config.convert.model, "gpt-3.5-turbo");
        assert_eq!(config.convert.temperature, 0.6);
        assert_eq!(config.convert.top_p, 0.9);
        assert_eq!(config.convert.max_tokens, 8_192);
        assert_eq!(config.convert.api_key_env, "OPENAI_API_KEY");
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: Config = serde_json::from_str(
            r#"{ "convert": { "model": "gpt-4o-mini", "temperature": 0.2 } }"#,
        )
        .unwrap();
        assert_eq!(config.convert.model, "gpt-4o-mini");
        assert_eq!(config.convert.temperature, 0.2);
        // Untouched fields keep their defaults
        assert_eq!(config.convert.max_tokens, 8_192);
        assert!(config.browser.incognito);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("webmark.json");
        std::fs::write(
            &path,
            r#"{ "browser": { "render_wait_ms": 500, "anti_detection": false } }"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.browser.render_wait_ms, 500);
        assert!(!config.browser.anti_detection);
        assert_eq!(config.browser.navigation_timeout_ms, 30_000);
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let err = Config::load(Path::new("/nonexistent/webmark.json")).unwrap_err();
        assert!(matches!(err, crate::error::WebmarkError::Io(_)));
    }
}
