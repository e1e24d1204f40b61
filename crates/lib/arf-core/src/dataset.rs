//! Loading of the static `arf.json` tool tree.

use std::path::Path;

use arf_model::ToolNode;
use tracing::debug;

use crate::tree::TreeError;

/// Reads and parses a tool tree from disk.
///
/// # Errors
/// Returns [`TreeError::Io`] when the file cannot be read and
/// [`TreeError::Dataset`] when it is not a valid tool tree.
pub async fn load_dataset(path: impl AsRef<Path>) -> Result<ToolNode, TreeError> {
    let path = path.as_ref();
    let json = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| TreeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    let root = ToolNode::from_json(&json)?;
    debug!(nodes = root.count(), path = %path.display(), "loaded dataset");
    Ok(root)
}
