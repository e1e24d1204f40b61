//! Route and file names shared by the provider and its clients.

pub const DATASET_FILE: &str = "arf.json";

pub const DESCRIBE_ROUTE: &str = "/generate-description";
pub const DATASET_ROUTE: &str = "/arf.json";
pub const TREE_SVG_ROUTE: &str = "/tree.svg";
pub const HEALTH_ROUTE: &str = "/health";

/// Query parameter carrying the tool name on [`DESCRIBE_ROUTE`].
pub const TOOL_PARAM: &str = "tool";
