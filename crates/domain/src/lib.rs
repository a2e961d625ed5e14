//! `fd-domain` — shared types for the frontdesk workspace.
//!
//! Home of the configuration tree, the workspace-wide error type, the
//! provider-agnostic message/tool types, and the streaming event union
//! that every other crate speaks.

pub mod config;
pub mod error;
pub mod stream;
pub mod tool;

pub use error::{Error, Result};
