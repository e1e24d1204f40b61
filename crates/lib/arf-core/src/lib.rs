//! Core types and services for arf.
//!
//! This crate owns the collapsible tool tree (view context, layout, and
//! transition frames), the SVG render surface, and the hover-driven
//! description cache that talks to the oracle endpoint.

pub mod dataset;
pub mod oracle;
pub mod tooltip;
pub mod tree;

pub use tooltip::{HoverOutcome, HoverTarget, Tooltip, TooltipRegistry, TooltipStatus};
pub use tree::{Branch, NodeId, Point, TreeError, TreeView, ViewNode};
