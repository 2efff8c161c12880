// src/config.rs
use std::time::Duration;

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "llava:latest";
pub const DEFAULT_TOP_K: usize = 5;
pub const DEFAULT_TIMEOUT_SECS: u64 = 300; // 5 minutes

/// Where and how to reach the classification backend
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub ollama_url: String,
    pub model_name: String,
    /// How many ranked labels to ask the model for
    pub top_k: usize,
    pub timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ollama_url: DEFAULT_OLLAMA_URL.to_string(),
            model_name: DEFAULT_MODEL.to_string(),
            top_k: DEFAULT_TOP_K,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl Settings {
    /// Build settings from CLI arguments, falling back to `OLLAMA_HOST` and then the defaults
    pub fn resolve(
        ollama_url: Option<String>,
        model: Option<String>,
        top_k: Option<usize>,
        timeout_secs: Option<u64>,
    ) -> Self {
        Self::resolve_with_env(
            ollama_url,
            model,
            top_k,
            timeout_secs,
            std::env::var("OLLAMA_HOST").ok(),
        )
    }

    fn resolve_with_env(
        ollama_url: Option<String>,
        model: Option<String>,
        top_k: Option<usize>,
        timeout_secs: Option<u64>,
        env_url: Option<String>,
    ) -> Self {
        let ollama_url = ollama_url
            .or(env_url)
            .map(|url| url.trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string());

        Self {
            ollama_url,
            model_name: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            top_k: top_k.unwrap_or(DEFAULT_TOP_K).max(1),
            timeout: Duration::from_secs(timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_wins_over_env() {
        let settings = Settings::resolve_with_env(
            Some("http://gpu-box:11434/".to_string()),
            None,
            None,
            None,
            Some("http://other:11434".to_string()),
        );
        assert_eq!(settings.ollama_url, "http://gpu-box:11434");
        assert_eq!(settings.model_name, DEFAULT_MODEL);
    }

    #[test]
    fn env_then_default() {
        let from_env = Settings::resolve_with_env(
            None,
            None,
            None,
            None,
            Some("http://other:11434".to_string()),
        );
        assert_eq!(from_env.ollama_url, "http://other:11434");

        let defaults = Settings::resolve_with_env(None, None, None, None, None);
        assert_eq!(defaults, Settings::default());
    }

    #[test]
    fn top_k_is_at_least_one() {
        let settings = Settings::resolve_with_env(None, None, Some(0), Some(10), None);
        assert_eq!(settings.top_k, 1);
        assert_eq!(settings.timeout, Duration::from_secs(10));
    }
}
