//! `OpenAI` client configuration.

use std::time::Duration;

use toolloop::ReasoningEffort;

/// Default model for sessions.
pub const DEFAULT_MODEL: &str = "gpt-5-mini";

/// Default API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Configuration for the `OpenAI` Responses API client.
///
/// Use struct update syntax with [`Default`] for ergonomic construction:
///
/// ```rust
/// use toolloop_openai::OpenAiConfig;
///
/// let config = OpenAiConfig {
///     api_key: "sk-...".into(),
///     model: "gpt-5".into(),
///     ..Default::default()
/// };
/// ```
#[derive(Clone)]
pub struct OpenAiConfig {
    /// `OpenAI` API key. Required.
    pub api_key: String,
    /// Model identifier (e.g. `"gpt-5-mini"`, `"gpt-5"`).
    pub model: String,
    /// Base URL for the API. Override for proxies or local mock servers.
    pub base_url: String,
    /// Optional organization ID for API requests.
    pub organization: Option<String>,
    /// Request timeout. `None` uses reqwest's default.
    pub timeout: Option<Duration>,
    /// Pre-configured HTTP client for connection pooling.
    /// When `None`, a new client is created.
    pub client: Option<reqwest::Client>,
    /// Reasoning effort for requests whose generation config leaves it
    /// unset.
    pub reasoning_effort: Option<ReasoningEffort>,
    /// Whether the server keeps responses. `None` leaves the API default.
    ///
    /// With `Some(false)` every request also asks for
    /// `reasoning.encrypted_content`, since resent reasoning items cannot
    /// be resolved by id when nothing was stored.
    pub store: Option<bool>,
}

impl OpenAiConfig {
    /// Extra output the API should include with each response.
    pub(crate) fn include(&self) -> Vec<&'static str> {
        if self.store == Some(false) {
            vec!["reasoning.encrypted_content"]
        } else {
            Vec::new()
        }
    }
}

impl std::fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("organization", &self.organization)
            .field("timeout", &self.timeout)
            .field("client", &self.client.as_ref().map(|_| "..."))
            .field("reasoning_effort", &self.reasoning_effort)
            .field("store", &self.store)
            .finish()
    }
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: DEFAULT_MODEL.into(),
            base_url: DEFAULT_BASE_URL.into(),
            organization: None,
            timeout: None,
            client: None,
            reasoning_effort: None,
            store: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = OpenAiConfig::default();
        assert_eq!(config.model, "gpt-5-mini");
        assert_eq!(config.base_url, "https://api.openai.com/v1");
        assert!(config.api_key.is_empty());
        assert!(config.organization.is_none());
        assert!(config.timeout.is_none());
        assert!(config.client.is_none());
        assert!(config.reasoning_effort.is_none());
        assert!(config.store.is_none());
        assert!(config.include().is_empty());
    }

    #[test]
    fn test_stateless_requests_include_encrypted_reasoning() {
        let stored = OpenAiConfig {
            store: Some(true),
            ..Default::default()
        };
        assert!(stored.include().is_empty());

        let stateless = OpenAiConfig {
            store: Some(false),
            ..Default::default()
        };
        assert_eq!(stateless.include(), ["reasoning.encrypted_content"]);
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = OpenAiConfig {
            api_key: "sk-super-secret".into(),
            ..Default::default()
        };
        let debug_output = format!("{config:?}");
        assert!(!debug_output.contains("sk-super-secret"));
        assert!(debug_output.contains("[REDACTED]"));
    }
}
