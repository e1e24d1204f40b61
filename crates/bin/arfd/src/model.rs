use std::sync::Arc;

use arf_oracle::model::{ModelError, TextModel, WorkersAiConfig, WorkersAiModel};
use tracing::info;

use crate::config::ServeConfig;

/// Binds the Workers AI model described by `config`.
pub fn build_model(config: &ServeConfig) -> Result<Arc<dyn TextModel>, ModelError> {
    let workers = WorkersAiConfig::new(&config.account_id, &config.api_token)
        .with_api_base(&config.api_base)
        .with_model(&config.model)
        .with_max_tokens(config.max_tokens)
        .with_timeout(config.upstream_timeout);
    let model = WorkersAiModel::new(&workers)?;
    info!(model = %config.model, endpoint = %model.endpoint(), "bound text model");
    Ok(Arc::new(model))
}
