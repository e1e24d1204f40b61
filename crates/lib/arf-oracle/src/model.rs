//! Text-generation backends for the oracle.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_API_BASE: &str = "https://api.cloudflare.com/client/v4";
pub const DEFAULT_MODEL: &str = "@cf/meta/llama-2-7b-chat-int8";
pub const DEFAULT_MAX_TOKENS: u32 = 150;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("model returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("model rejected the request: {0}")]
    Rejected(String),
    #[error("model output is malformed: {0}")]
    Malformed(String),
    #[error("invalid model endpoint: {0}")]
    Endpoint(String),
}

/// A bound text-generation model. One call per prompt, no retries.
#[async_trait]
pub trait TextModel: Send + Sync {
    /// Runs the model and returns its structured output untouched.
    async fn generate(&self, prompt: &str) -> Result<Value, ModelError>;
}

/// Settings for the Cloudflare Workers AI REST binding.
#[derive(Debug, Clone)]
pub struct WorkersAiConfig {
    pub api_base: String,
    pub account_id: String,
    pub api_token: String,
    pub model: String,
    pub max_tokens: u32,
    pub timeout: Option<Duration>,
}

impl WorkersAiConfig {
    #[must_use]
    pub fn new(account_id: impl Into<String>, api_token: impl Into<String>) -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            account_id: account_id.into(),
            api_token: api_token.into(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout: Some(Duration::from_secs(30)),
        }
    }

    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    #[must_use]
    pub const fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Serialize)]
struct RunRequest<'a> {
    prompt: &'a str,
    max_tokens: u32,
}

/// Response envelope of the Cloudflare REST API.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    success: bool,
    #[serde(default)]
    errors: Vec<ApiMessage>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: String,
}

/// Workers AI model reached over the Cloudflare REST API.
#[derive(Debug, Clone)]
pub struct WorkersAiModel {
    client: Client,
    endpoint: Url,
    api_token: String,
    max_tokens: u32,
}

impl WorkersAiModel {
    /// # Errors
    /// Returns [`ModelError::Endpoint`] when the account and model do not form
    /// a valid url, or [`ModelError::Transport`] if the client cannot be built.
    pub fn new(config: &WorkersAiConfig) -> Result<Self, ModelError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        let raw = format!(
            "{}/accounts/{}/ai/run/{}",
            config.api_base.trim_end_matches('/'),
            config.account_id,
            config.model
        );
        let endpoint = Url::parse(&raw).map_err(|err| ModelError::Endpoint(format!("{raw}: {err}")))?;

        Ok(Self {
            client,
            endpoint,
            api_token: config.api_token.clone(),
            max_tokens: config.max_tokens,
        })
    }

    #[must_use]
    pub const fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl TextModel for WorkersAiModel {
    async fn generate(&self, prompt: &str) -> Result<Value, ModelError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_token)
            .json(&RunRequest {
                prompt,
                max_tokens: self.max_tokens,
            })
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;
        if !status.is_success() {
            return Err(ModelError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        let envelope: Envelope = serde_json::from_slice(&body)
            .map_err(|err| ModelError::Malformed(err.to_string()))?;
        if !envelope.success {
            let messages: Vec<String> = envelope
                .errors
                .iter()
                .map(|error| match error.code {
                    Some(code) => format!("{code}: {}", error.message),
                    None => error.message.clone(),
                })
                .collect();
            return Err(ModelError::Rejected(messages.join("; ")));
        }

        debug!(bytes = body.len(), "model answered");
        envelope
            .result
            .ok_or_else(|| ModelError::Malformed("envelope has no result".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const RUN_PATH: &str = "/accounts/acct/ai/run/@cf/meta/llama-2-7b-chat-int8";

    fn model_for(server: &MockServer) -> WorkersAiModel {
        let config = WorkersAiConfig::new("acct", "token-abc").with_api_base(server.uri());
        WorkersAiModel::new(&config).expect("model should build")
    }

    #[tokio::test]
    async fn unwraps_the_result_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(RUN_PATH))
            .and(header("authorization", "Bearer token-abc"))
            .and(body_json(json!({"prompt": "describe Shodan", "max_tokens": 150})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "result": {"response": "Search engine for exposed devices."},
                "success": true,
                "errors": [],
                "messages": []
            })))
            .expect(1)
            .mount(&server)
            .await;

        let output = model_for(&server)
            .generate("describe Shodan")
            .await
            .expect("generation should succeed");

        assert_eq!(output, json!({"response": "Search engine for exposed devices."}));
    }

    #[tokio::test]
    async fn unsuccessful_envelope_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "result": null,
                "success": false,
                "errors": [{"code": 3036, "message": "daily quota exhausted"}]
            })))
            .mount(&server)
            .await;

        let err = model_for(&server)
            .generate("describe Shodan")
            .await
            .expect_err("should be rejected");
        match err {
            ModelError::Rejected(message) => assert_eq!(message, "3036: daily quota exhausted"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn http_failure_keeps_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad token"))
            .mount(&server)
            .await;

        let err = model_for(&server)
            .generate("describe Shodan")
            .await
            .expect_err("should fail");
        assert!(matches!(err, ModelError::Status { status: 401, ref body } if body == "bad token"));
    }

    #[test]
    fn endpoint_includes_account_and_model() {
        let config = WorkersAiConfig::new("acct", "token")
            .with_model("@cf/meta/llama-3-8b-instruct")
            .with_max_tokens(64);
        let model = WorkersAiModel::new(&config).expect("model should build");
        assert_eq!(
            model.endpoint().as_str(),
            "https://api.cloudflare.com/client/v4/accounts/acct/ai/run/@cf/meta/llama-3-8b-instruct"
        );
    }
}
