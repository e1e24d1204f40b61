//! Dataset models and shared constants for arf.
//!
//! This crate defines the wire shapes shared by the tree controller and the
//! description provider: the `arf.json` tool tree and the description payload.

pub mod models;
pub mod schema;

pub use models::*;
