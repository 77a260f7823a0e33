//! `OpenAI` `InferenceClient` implementation.

use std::borrow::Cow;

use reqwest::header::{HeaderMap, HeaderValue};
use toolloop::client::{ClientMetadata, InferenceClient, InferenceRequest};
use toolloop::error::LoopError;
use toolloop::response::ModelResponse;
use toolloop::stream::ResponseStream;
use tracing::{debug, instrument};

use crate::config::OpenAiConfig;
use crate::convert;

/// `OpenAI` client implementing [`InferenceClient`].
///
/// Talks to the Responses API (`POST {base_url}/responses`), buffered or
/// streamed over SSE. Every call sends the whole conversation; no
/// server-side conversation state is used.
///
/// # Example
///
/// ```rust,no_run
/// use toolloop::{InferenceClient, InferenceRequest, Message};
/// use toolloop_openai::{OpenAiClient, OpenAiConfig};
///
/// # async fn example() -> Result<(), toolloop::LoopError> {
/// let client = OpenAiClient::new(OpenAiConfig {
///     api_key: std::env::var("OPENAI_API_KEY").unwrap(),
///     ..Default::default()
/// });
///
/// let response = client
///     .submit(&InferenceRequest {
///         input: vec![Message::user("Hello!")],
///         ..Default::default()
///     })
///     .await?;
/// println!("{:?}", response.output_text());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct OpenAiClient {
    config: OpenAiConfig,
    client: reqwest::Client,
}

impl OpenAiClient {
    /// Create a new `OpenAI` client from configuration.
    ///
    /// If `config.client` is `Some`, that client is reused for connection
    /// pooling. Otherwise a new client is built with the configured timeout.
    pub fn new(config: OpenAiConfig) -> Self {
        let client = config.client.clone().unwrap_or_else(|| {
            let mut builder = reqwest::Client::builder();
            if let Some(timeout) = config.timeout {
                builder = builder.timeout(timeout);
            }
            builder.build().expect("failed to build HTTP client")
        });
        Self { config, client }
    }

    /// The client's configuration.
    pub fn config(&self) -> &OpenAiConfig {
        &self.config
    }

    /// Build the default headers for `OpenAI` API requests.
    fn default_headers(&self) -> Result<HeaderMap, LoopError> {
        let mut headers = HeaderMap::new();

        let auth_value = format!("Bearer {}", self.config.api_key);
        headers.insert(
            "authorization",
            HeaderValue::from_str(&auth_value)
                .map_err(|_| LoopError::Auth("API key contains invalid header characters".into()))?,
        );
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        if let Some(org) = &self.config.organization {
            headers.insert(
                "openai-organization",
                HeaderValue::from_str(org).map_err(|_| {
                    LoopError::InvalidRequest(
                        "Organization ID contains invalid header characters".into(),
                    )
                })?,
            );
        }

        Ok(headers)
    }

    /// Build the full URL for the responses endpoint.
    fn responses_url(&self) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        format!("{base}/responses")
    }

    /// Send a request to the `OpenAI` API and return the raw response.
    async fn send_request(
        &self,
        request: &InferenceRequest,
        stream: bool,
    ) -> Result<reqwest::Response, LoopError> {
        let body = convert::build_request(request, &self.config, stream)?;
        debug!(
            items = body.input.len(),
            tools = body.tools.len(),
            stream,
            "sending responses request"
        );

        let mut req = self
            .client
            .post(self.responses_url())
            .headers(self.default_headers()?)
            .json(&body);

        let timeout = request.generation.timeout;
        if let Some(timeout) = timeout {
            req = req.timeout(timeout);
        }

        let response = req.send().await.map_err(|e| {
            if e.is_timeout() {
                LoopError::Timeout {
                    elapsed_ms: timeout
                        .or(self.config.timeout)
                        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX)),
                }
            } else {
                LoopError::Http {
                    status: e.status().map(|s| {
                        http::StatusCode::from_u16(s.as_u16())
                            .unwrap_or(http::StatusCode::INTERNAL_SERVER_ERROR)
                    }),
                    message: e.to_string(),
                    retryable: e.is_connect() || e.is_timeout(),
                }
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let http_status = http::StatusCode::from_u16(status.as_u16())
                .unwrap_or(http::StatusCode::INTERNAL_SERVER_ERROR);
            return Err(convert::convert_error(http_status, &body));
        }

        Ok(response)
    }
}

impl InferenceClient for OpenAiClient {
    #[instrument(skip_all, fields(model = %self.config.model))]
    async fn submit(&self, request: &InferenceRequest) -> Result<ModelResponse, LoopError> {
        let response = self.send_request(request, false).await?;

        let body = response
            .text()
            .await
            .map_err(|e| LoopError::ResponseFormat {
                message: format!("Failed to read OpenAI response body: {e}"),
                raw: String::new(),
            })?;

        let api_response: crate::types::Response =
            serde_json::from_str(&body).map_err(|e| LoopError::ResponseFormat {
                message: format!("Failed to parse OpenAI response: {e}"),
                raw: body,
            })?;

        convert::convert_response(api_response)
    }

    #[instrument(skip_all, fields(model = %self.config.model))]
    async fn submit_stream(&self, request: &InferenceRequest) -> Result<ResponseStream, LoopError> {
        let response = self.send_request(request, true).await?;
        Ok(crate::stream::into_stream(response))
    }

    fn metadata(&self) -> ClientMetadata {
        ClientMetadata {
            name: Cow::Borrowed("openai"),
            model: self.config.model.clone(),
            grammar_tools: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_metadata() {
        let client = OpenAiClient::new(OpenAiConfig {
            model: "gpt-5".into(),
            ..Default::default()
        });
        let meta = client.metadata();
        assert_eq!(meta.name, "openai");
        assert_eq!(meta.model, "gpt-5");
        assert!(meta.grammar_tools);
    }

    #[test]
    fn test_responses_url() {
        let client = OpenAiClient::new(OpenAiConfig::default());
        assert_eq!(client.responses_url(), "https://api.openai.com/v1/responses");
    }

    #[test]
    fn test_responses_url_trailing_slash() {
        let client = OpenAiClient::new(OpenAiConfig {
            base_url: "http://127.0.0.1:8080/v1/".into(),
            ..Default::default()
        });
        assert_eq!(client.responses_url(), "http://127.0.0.1:8080/v1/responses");
    }

    #[test]
    fn test_default_headers() {
        let client = OpenAiClient::new(OpenAiConfig {
            api_key: "sk-test123".into(),
            organization: Some("org-abc".into()),
            ..Default::default()
        });
        let headers = client.default_headers().unwrap();
        assert_eq!(headers.get("authorization").unwrap(), "Bearer sk-test123");
        assert_eq!(headers.get("content-type").unwrap(), "application/json");
        assert_eq!(headers.get("openai-organization").unwrap(), "org-abc");
    }

    #[test]
    fn test_default_headers_invalid_key() {
        let client = OpenAiClient::new(OpenAiConfig {
            api_key: "invalid\nkey".into(),
            ..Default::default()
        });
        let err = client.default_headers().unwrap_err();
        assert!(matches!(err, LoopError::Auth(_)));
    }

    #[test]
    fn test_new_with_custom_client() {
        let custom_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap();
        let client = OpenAiClient::new(OpenAiConfig {
            client: Some(custom_client),
            ..Default::default()
        });
        assert_eq!(client.metadata().name, "openai");
    }
}
