//! Configuration structures for the recognition pipeline.

use serde::{Deserialize, Serialize};

/// Environment variable that supplies the remote API key.
pub const API_KEY_ENV: &str = "SILICONFLOW_API_KEY";
/// Environment variable that overrides the remote endpoint.
pub const API_URL_ENV: &str = "SILICONFLOW_API_URL";
/// Placeholder shipped in sample env files; treated as "no key".
pub const PLACEHOLDER_API_KEY: &str = "your_api_key_here";

/// Main configuration for the fapiao pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FapiaoConfig {
    /// Remote text/vision model configuration.
    pub remote: RemoteConfig,

    /// Recognition cascade configuration.
    pub recognition: RecognitionConfig,

    /// Batch upload configuration.
    pub batch: BatchConfig,

    /// Duplicate detection configuration.
    pub dedup: DedupConfig,
}

/// Remote chat-completions endpoint used for LLM and OCR fallbacks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Bearer token. Empty disables both remote strategies.
    pub api_key: String,

    /// Chat completions URL.
    pub api_url: String,

    /// Model used for structured extraction from page text.
    pub text_model: String,

    /// Model used for structured extraction from page images.
    pub vision_model: String,

    /// Page text is truncated to this many characters before submission.
    pub max_text_chars: usize,

    /// `max_tokens` for text extraction.
    pub text_max_tokens: u32,

    /// `max_tokens` for image extraction.
    pub vision_max_tokens: u32,

    /// Sampling temperature for both calls.
    pub temperature: f32,

    /// Per-request timeout in seconds. `None` keeps the transport default.
    pub timeout_secs: Option<u64>,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_url: "https://api.siliconflow.cn/v1/chat/completions".to_string(),
            text_model: "Qwen/Qwen2.5-7B-Instruct".to_string(),
            vision_model: "deepseek-ai/DeepSeek-OCR".to_string(),
            max_text_chars: 3000,
            text_max_tokens: 500,
            vision_max_tokens: 1000,
            temperature: 0.1,
            timeout_secs: None,
        }
    }
}

impl RemoteConfig {
    /// Whether credentials are present.
    pub fn is_configured(&self) -> bool {
        let key = self.api_key.trim();
        !key.is_empty() && key != PLACEHOLDER_API_KEY
    }
}

/// Recognition cascade configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognitionConfig {
    /// Pages whose trimmed text is shorter than this are treated as image-only.
    pub min_text_length: usize,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self { min_text_length: 10 }
    }
}

/// Batch upload configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Number of files loaded concurrently.
    pub concurrency: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self { concurrency: 4 }
    }
}

/// Duplicate detection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    /// Mark later occurrences of the same invoice as duplicates.
    pub enabled: bool,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl FapiaoConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }

    /// Fill remote credentials from the environment when set.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(
            std::env::var(API_KEY_ENV).ok(),
            std::env::var(API_URL_ENV).ok(),
        )
    }

    fn with_overrides(mut self, api_key: Option<String>, api_url: Option<String>) -> Self {
        if let Some(key) = api_key.filter(|k| !k.trim().is_empty()) {
            self.remote.api_key = key;
        }
        if let Some(url) = api_url.filter(|u| !u.trim().is_empty()) {
            self.remote.api_url = url;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: FapiaoConfig =
            serde_json::from_str(r#"{"batch": {"concurrency": 2}}"#).unwrap();
        assert_eq!(config.batch.concurrency, 2);
        assert_eq!(config.remote.max_text_chars, 3000);
        assert!(config.dedup.enabled);
        assert!(!config.remote.is_configured());
    }

    #[test]
    fn test_placeholder_key_is_not_configured() {
        let mut remote = RemoteConfig::default();
        remote.api_key = PLACEHOLDER_API_KEY.to_string();
        assert!(!remote.is_configured());
        remote.api_key = "sk-live".to_string();
        assert!(remote.is_configured());
    }

    #[test]
    fn test_overrides_ignore_blank_values() {
        let config = FapiaoConfig::default()
            .with_overrides(Some("sk-env".to_string()), Some("  ".to_string()));
        assert_eq!(config.remote.api_key, "sk-env");
        assert_eq!(config.remote.api_url, RemoteConfig::default().api_url);
    }
}
