//! Workspace dependency linking.
//!
//! Given the loaded workspace and the shared dependency store, builds each
//! project a private, consistent view of its transitive dependencies and
//! materializes it as a tree of links:
//! - Indexing the store ([`store`])
//! - Planning one project's tree ([`tree`], [`resolver`])
//! - Writing the plan to disk ([`materialize`])
//! - Running a whole workspace and recording the local build graph
//!   ([`orchestrate`], [`manifest`])

pub mod error;
pub mod manifest;
pub mod materialize;
pub mod orchestrate;
pub mod resolver;
pub mod store;
pub mod tree;

pub use error::LinkError;
pub use manifest::{link_manifest_path, write_link_manifest, LinkManifest, LINK_MANIFEST_FILENAME};
pub use materialize::{link_entry, materialize_project, LinkKind};
pub use orchestrate::{
    link_projects, link_workspace, unlink_workspace, LinkOutcome, LinkReport,
};
pub use resolver::{resolve_project, LinkResolution, LinkWarning, WarningKind};
pub use store::{proxy_name, EntryId, ScanIssue, StoreEntry, StoreIndex, PROXY_SCOPE};
pub use tree::{NodeId, PackageNode, PackageTree, ResolveOrCreate};
