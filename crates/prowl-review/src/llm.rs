use async_trait::async_trait;
use prowl_core::{CompletionConfig, ProwlError};
use serde::Serialize;
use tracing::debug;

/// The "complete prompt" capability.
#[async_trait]
pub trait Completer: Send + Sync {
    /// Send `prompt` and return the first choice's text, which may be empty.
    async fn complete(&self, prompt: &str) -> Result<Option<String>, ProwlError>;

    /// Model or deployment name, for reports.
    fn model(&self) -> &str;
}

/// Request body of a legacy completions call.
///
/// # Examples
///
/// ```
/// use prowl_review::llm::CompletionRequest;
///
/// let req = CompletionRequest {
///     prompt: "Review this",
///     model: "davinci",
///     max_tokens: 700,
///     temperature: 0.2,
/// };
/// let json = serde_json::to_value(&req).unwrap();
/// assert_eq!(json["max_tokens"], 700);
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest<'a> {
    /// Full prompt text.
    pub prompt: &'a str,
    /// Deployment / model name.
    pub model: &'a str,
    /// Output token cap.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
}

/// Client for an Azure OpenAI style completions deployment.
///
/// Posts to `{endpoint}/openai/deployments/{model}/completions`, authenticating
/// with the `api-key` header.
///
/// # Examples
///
/// ```
/// use prowl_core::CompletionConfig;
/// use prowl_review::llm::{Completer, CompletionClient};
///
/// let config = CompletionConfig {
///     api_key: Some("test-key".into()),
///     model: Some("gpt-35-turbo-instruct".into()),
///     endpoint: Some("https://example.openai.azure.com".into()),
///     ..CompletionConfig::default()
/// };
/// let client = CompletionClient::new(&config).unwrap();
/// assert_eq!(client.model(), "gpt-35-turbo-instruct");
/// ```
pub struct CompletionClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    url: String,
    api_version: Option<String>,
    max_tokens: u32,
    temperature: f32,
}

impl CompletionClient {
    /// Create a new client from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ProwlError::Config`] if key, model or endpoint is missing,
    /// or [`ProwlError::Transport`] if the HTTP client cannot be built.
    pub fn new(config: &CompletionConfig) -> Result<Self, ProwlError> {
        config.validate()?;
        let (Some(api_key), Some(model), Some(endpoint)) =
            (&config.api_key, &config.model, &config.endpoint)
        else {
            return Err(ProwlError::Config("completion settings incomplete".into()));
        };

        let url = format!(
            "{}/openai/deployments/{model}/completions",
            endpoint.trim_end_matches('/')
        );

        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| ProwlError::Transport(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: api_key.clone(),
            model: model.clone(),
            url,
            api_version: config.api_version.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }

    /// Request URL, without the `api-version` query.
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Completer for CompletionClient {
    async fn complete(&self, prompt: &str) -> Result<Option<String>, ProwlError> {
        let body = CompletionRequest {
            prompt,
            model: &self.model,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        debug!(url = %self.url, prompt_chars = prompt.len(), "POST completion");
        let mut request = self.client.post(&self.url);
        if let Some(version) = &self.api_version {
            request = request.query(&[("api-version", version)]);
        }
        let response = request
            .header("api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ProwlError::Transport(format!("completion request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(ProwlError::Upstream(format!(
                "completion API error {status}: {body_text}"
            )));
        }

        let response_body: serde_json::Value = response.json().await.map_err(|e| {
            ProwlError::ResponseShape(format!("failed to parse completion response: {e}"))
        })?;

        first_choice_text(&response_body)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Extract `choices[0].text` from a completions response.
///
/// A missing or empty `choices` array is an error; a first choice without
/// `text` yields `None`.
///
/// # Errors
///
/// Returns [`ProwlError::ResponseShape`] when there is no first choice.
///
/// # Examples
///
/// ```
/// use prowl_review::llm::first_choice_text;
///
/// let body = serde_json::json!({"choices": [{"text": "LGTM"}]});
/// assert_eq!(first_choice_text(&body).unwrap().as_deref(), Some("LGTM"));
///
/// let body = serde_json::json!({"error": "nope"});
/// assert!(first_choice_text(&body).is_err());
/// ```
pub fn first_choice_text(body: &serde_json::Value) -> Result<Option<String>, ProwlError> {
    let choice = body
        .get("choices")
        .and_then(|c| c.get(0))
        .ok_or_else(|| {
            ProwlError::ResponseShape(format!("completion response has no choices: {body}"))
        })?;

    Ok(choice
        .get("text")
        .and_then(|t| t.as_str())
        .map(str::to_string))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> CompletionConfig {
        CompletionConfig {
            api_key: Some("k".into()),
            model: Some("review-model".into()),
            endpoint: Some("https://example.openai.azure.com/".into()),
            ..CompletionConfig::default()
        }
    }

    #[test]
    fn url_uses_deployment_path() {
        let client = CompletionClient::new(&config()).unwrap();
        assert_eq!(
            client.url(),
            "https://example.openai.azure.com/openai/deployments/review-model/completions"
        );
    }

    #[test]
    fn api_version_stays_out_of_the_url() {
        let client = CompletionClient::new(&CompletionConfig {
            api_version: Some("2024-02-01".into()),
            ..config()
        })
        .unwrap();
        assert!(client.url().ends_with("/completions"));
        assert_eq!(client.api_version.as_deref(), Some("2024-02-01"));
    }

    #[test]
    fn missing_settings_are_config_errors() {
        let err = CompletionClient::new(&CompletionConfig::default()).err().unwrap();
        assert!(matches!(err, ProwlError::Config(_)));
    }

    #[test]
    fn request_carries_fixed_parameters() {
        let client = CompletionClient::new(&config()).unwrap();
        let req = CompletionRequest {
            prompt: "p",
            model: client.model(),
            max_tokens: client.max_tokens,
            temperature: client.temperature,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["model"], "review-model");
        assert_eq!(json["max_tokens"], 700);
        assert!((json["temperature"].as_f64().unwrap() - 0.2).abs() < 1e-6);
    }

    #[test]
    fn empty_choices_is_shape_error() {
        let body = serde_json::json!({"choices": []});
        assert!(matches!(
            first_choice_text(&body),
            Err(ProwlError::ResponseShape(_))
        ));
    }

    #[test]
    fn choice_without_text_is_none() {
        let body = serde_json::json!({"choices": [{"finish_reason": "content_filter"}]});
        assert_eq!(first_choice_text(&body).unwrap(), None);
    }
}
