//! The link manifest: `splice-link.json`.
//!
//! A secondary output recording, per project, which dependency names were
//! satisfied by direct workspace-sibling links. Downstream tooling reads it
//! to learn the local build graph; the linker itself never does.

use crate::link::error::LinkError;
use crate::version::LINK_MANIFEST_SCHEMA_VERSION;
use crate::workspace::Workspace;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// File name of the link manifest, written next to the store folder.
pub const LINK_MANIFEST_FILENAME: &str = "splice-link.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkManifest {
    pub schema_version: u32,
    /// Project name -> sibling dependency names, sorted for stable output.
    pub projects: BTreeMap<String, Vec<String>>,
}

impl LinkManifest {
    #[must_use]
    pub fn new() -> Self {
        Self {
            schema_version: LINK_MANIFEST_SCHEMA_VERSION,
            projects: BTreeMap::new(),
        }
    }
}

impl Default for LinkManifest {
    fn default() -> Self {
        Self::new()
    }
}

/// Where the link manifest lives for a workspace.
#[must_use]
pub fn link_manifest_path(workspace: &Workspace) -> PathBuf {
    workspace
        .store_folder
        .parent()
        .unwrap_or(&workspace.root)
        .join(LINK_MANIFEST_FILENAME)
}

/// Write the manifest atomically.
///
/// # Errors
/// Returns an error if serialization or the write fails.
pub fn write_link_manifest(
    workspace: &Workspace,
    manifest: &LinkManifest,
) -> Result<PathBuf, LinkError> {
    let path = link_manifest_path(workspace);
    let bytes = serde_json::to_vec_pretty(manifest).map_err(|e| LinkError::ManifestWrite {
        path: path.clone(),
        source: std::io::Error::other(e),
    })?;
    splice_util::fs::atomic_write(&path, &bytes).map_err(|source| LinkError::ManifestWrite {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}
