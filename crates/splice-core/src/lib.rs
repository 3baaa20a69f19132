#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

//! Core engine for splice: a workspace dependency linker for npm monorepos.
//!
//! An external install step populates a shared dependency store; this crate
//! wires the already-resolved packages into every workspace project's
//! private `node_modules` as symlinks (junctions and hard links where the
//! platform wants them), honoring workspace-local overrides and declared
//! cycle exceptions.

pub mod error;
pub mod link;
pub mod pkg_json;
pub mod range;
pub mod version;
pub mod workspace;

pub use error::Error;
pub use version::VERSION;
pub use workspace::{find_workspace_root, Workspace, WorkspaceProject};
