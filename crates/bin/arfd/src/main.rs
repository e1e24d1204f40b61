//! Daemon entry point for arf.
//!
//! `serve` runs the description oracle, `render` writes the tool tree as SVG,
//! and `describe` hovers tools against a running oracle from the terminal.

mod config;
mod model;

use std::error::Error;
use std::path::Path;

use arf_core::dataset::load_dataset;
use arf_core::oracle::HttpDescriptionSource;
use arf_core::{TooltipRegistry, TreeView};
use arf_oracle::{OracleServer, OracleServerConfig};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::config::{ArfConfig, CommandConfig, DescribeConfig, RenderConfig, ServeConfig};
use crate::model::build_model;

type BoxError = Box<dyn Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let config = ArfConfig::from_args()?;
    init_tracing(config.log_filter.as_deref());

    match config.command {
        CommandConfig::Serve(serve) => run_serve(&config.dataset, &serve).await,
        CommandConfig::Render(render) => run_render(&config.dataset, &render).await,
        CommandConfig::Describe(describe) => run_describe(&config.dataset, &describe).await,
    }
}

fn init_tracing(directives: Option<&str>) {
    let filter = directives.map_or_else(
        || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        EnvFilter::new,
    );
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run_serve(dataset: &Path, config: &ServeConfig) -> Result<(), BoxError> {
    let model = build_model(config)?;
    let server_config = OracleServerConfig::new(config.addr).with_dataset_path(dataset);
    OracleServer::new(model, server_config).serve().await
}

async fn run_render(dataset: &Path, config: &RenderConfig) -> Result<(), BoxError> {
    let root = load_dataset(dataset).await?;
    let mut view = TreeView::new(root);
    if config.dark {
        view.toggle_dark_mode();
    }

    let mut frame = view.render();
    for name in &config.expand {
        let (id, revealed) = view.reveal(name)?;
        frame = if view.node(id).is_some_and(|node| node.branch().is_collapsed()) {
            view.click(id)?
        } else {
            revealed
        };
        debug!(%id, name, "expanded node");
    }

    let svg = view.to_svg(&frame);
    match &config.output {
        Some(path) => {
            tokio::fs::write(path, svg).await?;
            info!(path = %path.display(), nodes = view.displayed().len(), "wrote tree");
        }
        None => println!("{svg}"),
    }
    Ok(())
}

async fn run_describe(dataset: &Path, config: &DescribeConfig) -> Result<(), BoxError> {
    let root = load_dataset(dataset).await?;
    let mut view = TreeView::new(root);
    view.render();

    let registry = TooltipRegistry::new(HttpDescriptionSource::new(&config.provider)?);
    for tool in &config.tools {
        let (id, _) = view.reveal(tool)?;
        let target = view.hover_target(id)?;
        let outcome = registry.hover(&target);
        registry.settle(id).await;
        debug!(%id, tool, ?outcome, "hovered tool");

        match target.url.as_deref() {
            Some(url) if !url.is_empty() => println!("{tool}: {url}"),
            _ => println!("{tool}: {}", registry.text_for(&target)),
        }
    }
    Ok(())
}
