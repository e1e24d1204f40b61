//! HTTP description oracle for arf.
//!
//! Serves `/generate-description`, which turns a tool name into a generated
//! description through a bound text model, plus the static tool tree and a
//! server-side render of its initial view.

pub mod model;
pub mod prompt;

use std::io::ErrorKind;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use arf_core::TreeView;
use arf_core::dataset::load_dataset;
use arf_core::tree::TreeError;
use arf_model::DescriptionPayload;
use arf_model::schema::{DATASET_ROUTE, DESCRIBE_ROUTE, HEALTH_ROUTE, TOOL_PARAM, TREE_SVG_ROUTE};
use axum::Router;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Json, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use serde::Deserialize;
use thiserror::Error;
use tracing::{error, info};

use crate::model::{ModelError, TextModel};
use crate::prompt::description_prompt;

pub const MISSING_TOOL_MESSAGE: &str =
    "You dare summon the oracle without a purpose? Name the tool you wish to understand.";
pub const UPSTREAM_FAILURE_MESSAGE: &str =
    "The digital ether has returned an error. A momentary inconvenience on the path to enlightenment.";

/// Configuration for the oracle HTTP server.
#[derive(Debug, Clone)]
pub struct OracleServerConfig {
    pub addr: SocketAddr,
    pub dataset_path: PathBuf,
}

impl OracleServerConfig {
    #[must_use]
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            dataset_path: PathBuf::from("public").join(arf_model::schema::DATASET_FILE),
        }
    }

    #[must_use]
    pub fn with_dataset_path(mut self, dataset_path: impl Into<PathBuf>) -> Self {
        self.dataset_path = dataset_path.into();
        self
    }
}

impl Default for OracleServerConfig {
    fn default() -> Self {
        Self::new(SocketAddr::from(([127, 0, 0, 1], 8788)))
    }
}

/// HTTP oracle server wrapper.
pub struct OracleServer {
    config: OracleServerConfig,
    state: AppState,
}

impl OracleServer {
    #[must_use]
    pub fn new(model: Arc<dyn TextModel>, config: OracleServerConfig) -> Self {
        let state = AppState {
            model,
            dataset_path: Arc::new(config.dataset_path.clone()),
        };
        Self { config, state }
    }

    /// Runs the HTTP server until shutdown.
    ///
    /// # Errors
    /// Returns any listener or server error.
    pub async fn serve(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let addr = self.config.addr;
        let listener = tokio::net::TcpListener::bind(addr).await?;
        let app = router(self.state);

        info!("arf oracle listening on {addr}");
        axum::serve(listener, app).await?;
        Ok(())
    }
}

#[derive(Clone)]
struct AppState {
    model: Arc<dyn TextModel>,
    dataset_path: Arc<PathBuf>,
}

/// Failures surfaced to HTTP callers. Internal detail stays in the logs.
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("tool name is missing")]
    BadRequest,
    #[error("upstream model failed: {0}")]
    Upstream(#[from] ModelError),
    #[error(transparent)]
    Dataset(#[from] TreeError),
}

impl IntoResponse for OracleError {
    fn into_response(self) -> Response {
        match self {
            Self::BadRequest => (StatusCode::BAD_REQUEST, MISSING_TOOL_MESSAGE).into_response(),
            Self::Upstream(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, UPSTREAM_FAILURE_MESSAGE).into_response()
            }
            Self::Dataset(TreeError::Io { source, .. }) if source.kind() == ErrorKind::NotFound => {
                (StatusCode::NOT_FOUND, "dataset not found").into_response()
            }
            Self::Dataset(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "dataset unavailable").into_response()
            }
        }
    }
}

/// Builds the oracle routes around a model and a dataset file.
#[must_use]
pub fn build_router(model: Arc<dyn TextModel>, dataset_path: impl Into<PathBuf>) -> Router {
    router(AppState {
        model,
        dataset_path: Arc::new(dataset_path.into()),
    })
}

fn router(state: AppState) -> Router {
    Router::new()
        .route(HEALTH_ROUTE, get(health))
        .route(DESCRIBE_ROUTE, get(generate_description))
        .route(DATASET_ROUTE, get(dataset))
        .route(TREE_SVG_ROUTE, get(tree_svg))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

/// First `tool` value in the query. Later duplicates are ignored.
fn first_tool(pairs: &[(String, String)]) -> Option<&str> {
    pairs
        .iter()
        .find(|(key, _)| key == TOOL_PARAM)
        .map(|(_, value)| value.trim())
        .filter(|tool| !tool.is_empty())
}

async fn generate_description(
    State(state): State<AppState>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<Json<DescriptionPayload>, OracleError> {
    let Query(pairs) = query.map_err(|_| OracleError::BadRequest)?;
    let tool = first_tool(&pairs).ok_or(OracleError::BadRequest)?;

    let prompt = description_prompt(tool);
    let payload = state.model.generate(&prompt).await.and_then(|output| {
        DescriptionPayload::from_value(output)
            .filter(|payload| payload.response.is_some())
            .ok_or_else(|| ModelError::Malformed("output carries no response text".to_string()))
    });

    match payload {
        Ok(payload) => Ok(Json(payload)),
        Err(err) => {
            error!(tool, error = %err, "the oracle has faltered");
            Err(OracleError::Upstream(err))
        }
    }
}

async fn dataset(State(state): State<AppState>) -> Result<Response, OracleError> {
    let path = state.dataset_path.as_ref();
    let bytes = tokio::fs::read(path).await.map_err(|source| {
        if source.kind() != ErrorKind::NotFound {
            error!(path = %path.display(), error = %source, "failed to read dataset");
        }
        TreeError::Io {
            path: path.clone(),
            source,
        }
    })?;
    Ok(([(header::CONTENT_TYPE, "application/json")], bytes).into_response())
}

#[derive(Debug, Deserialize)]
struct SvgQuery {
    #[serde(default)]
    dark: bool,
}

async fn tree_svg(
    State(state): State<AppState>,
    Query(query): Query<SvgQuery>,
) -> Result<Response, OracleError> {
    let root = load_dataset(state.dataset_path.as_ref())
        .await
        .inspect_err(|err| error!(error = %err, "failed to load dataset"))?;
    let mut view = TreeView::new(root);
    if query.dark {
        view.toggle_dark_mode();
    }
    let frame = view.render();
    let svg = view.to_svg(&frame);
    Ok(([(header::CONTENT_TYPE, "image/svg+xml")], svg).into_response())
}
