//! Client side of the description endpoint.

mod http;

use std::sync::Arc;

use arf_model::DescriptionPayload;
use async_trait::async_trait;
use thiserror::Error;

pub use http::HttpDescriptionSource;

#[derive(Debug, Error)]
pub enum DescriptionError {
    #[error("oracle returned status {0}")]
    Status(u16),
    #[error("oracle request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("oracle returned an unreadable payload")]
    Decode,
    #[error("invalid oracle url: {0}")]
    InvalidUrl(String),
}

/// Anything that can turn a tool name into a generated description.
#[async_trait]
pub trait DescriptionSource: Send + Sync {
    async fn describe(&self, tool: &str) -> Result<DescriptionPayload, DescriptionError>;
}

#[async_trait]
impl<T: DescriptionSource + ?Sized> DescriptionSource for Arc<T> {
    async fn describe(&self, tool: &str) -> Result<DescriptionPayload, DescriptionError> {
        (**self).describe(tool).await
    }
}
