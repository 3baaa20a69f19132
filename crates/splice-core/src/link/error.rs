use semver::Version;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a single project's linking pass.
///
/// Every variant carries enough context for an actionable message; none of
/// them are retried internally. Store-staleness variants point the user at
/// the install step.
#[derive(Error, Debug)]
pub enum LinkError {
    #[error(
        "project '{project}' has no entry in the dependency store -- run the install step to refresh it"
    )]
    MissingProxyEntry { project: String },

    #[error(
        "dependency '{dependency}' needed by '{dependent}' was not found in the dependency store -- run the install step to refresh it"
    )]
    MissingDependency {
        dependency: String,
        dependent: String,
    },

    #[error("package {name}@{version} is missing from the dependency store index")]
    StoreEntryMissing { name: String, version: Version },

    #[error("dependency store folder {path} is not accessible: {source}")]
    StoreScan {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("dependency '{name}' already placed at this level of the virtual tree")]
    DuplicateChild { name: String },

    #[error("no placement point for dependency '{name}' in the virtual tree")]
    NoPlacement { name: String },

    #[error("virtual node '{name}' has no link target")]
    MissingLinkTarget { name: String },

    #[error("failed to purge {path}: {source}")]
    Purge {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to link {link} -> {target}: {source}")]
    CreateLink {
        link: PathBuf,
        target: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write link manifest {path}: {source}")]
    ManifestWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
