use arf_model::DescriptionPayload;
use arf_model::schema::{DESCRIBE_ROUTE, TOOL_PARAM};
use async_trait::async_trait;
use reqwest::{Client, Url};
use tracing::debug;

use super::{DescriptionError, DescriptionSource};

/// Fetches descriptions from a running oracle over HTTP.
///
/// No request timeout is set: a fetch waits for the transport to resolve.
#[derive(Debug, Clone)]
pub struct HttpDescriptionSource {
    client: Client,
    endpoint: Url,
}

impl HttpDescriptionSource {
    /// Targets the oracle served at `base_url`.
    ///
    /// # Errors
    /// Returns [`DescriptionError::InvalidUrl`] for an unparsable base url and
    /// [`DescriptionError::Network`] if the HTTP client cannot be built.
    pub fn new(base_url: &str) -> Result<Self, DescriptionError> {
        let client = Client::builder().build()?;
        Self::with_client(client, base_url)
    }

    /// # Errors
    /// Returns [`DescriptionError::InvalidUrl`] for an unparsable base url.
    pub fn with_client(client: Client, base_url: &str) -> Result<Self, DescriptionError> {
        let endpoint = Url::parse(base_url)
            .and_then(|base| base.join(DESCRIBE_ROUTE))
            .map_err(|err| DescriptionError::InvalidUrl(format!("{base_url}: {err}")))?;
        Ok(Self { client, endpoint })
    }

    #[must_use]
    pub const fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl DescriptionSource for HttpDescriptionSource {
    async fn describe(&self, tool: &str) -> Result<DescriptionPayload, DescriptionError> {
        let response = self
            .client
            .get(self.endpoint.clone())
            .query(&[(TOOL_PARAM, tool)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DescriptionError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        let value: serde_json::Value =
            serde_json::from_slice(&body).map_err(|_| DescriptionError::Decode)?;
        debug!(tool, bytes = body.len(), "oracle answered");
        DescriptionPayload::from_value(value).ok_or(DescriptionError::Decode)
    }
}
