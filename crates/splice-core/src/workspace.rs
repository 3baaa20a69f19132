//! Workspace configuration: the monorepo root's `splice.json` plus each
//! project's own manifest.
//!
//! `splice.json` declares where the shared dependency store lives and which
//! folders are workspace projects. Project folders may be given as glob
//! patterns (`packages/*`).

use crate::error::Error;
use crate::pkg_json::{self, ManifestDependency};
use semver::Version;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Workspace configuration file name at the monorepo root.
pub const WORKSPACE_CONFIG: &str = "splice.json";

/// Default store folder, relative to the workspace root.
pub const DEFAULT_STORE_FOLDER: &str = "common/store";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    store_folder: Option<String>,
    projects: Vec<RawProject>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RawProject {
    folder: String,
    #[serde(default)]
    cyclic_dependencies: Vec<String>,
}

/// A locally developed package participating in the monorepo.
#[derive(Debug, Clone)]
pub struct WorkspaceProject {
    /// Package name from the project's manifest.
    pub name: String,
    /// Declared version from the project's manifest.
    pub version: Version,
    /// Absolute path to the project folder.
    pub folder: PathBuf,
    /// Declared dependency edges (regular + dev merged, optionals tagged),
    /// in manifest order.
    pub dependencies: Vec<ManifestDependency>,
    /// Dependency names that must never be satisfied by a direct sibling
    /// link, used to break mutual-dependency cycles.
    pub cyclic_dependencies: HashSet<String>,
}

/// The loaded workspace: store location plus the ordered project set.
#[derive(Debug)]
pub struct Workspace {
    /// Absolute path to the monorepo root (the folder holding `splice.json`).
    pub root: PathBuf,
    /// Absolute path to the shared dependency store.
    pub store_folder: PathBuf,
    projects: Vec<WorkspaceProject>,
    by_name: HashMap<String, usize>,
}

impl Workspace {
    /// Load the workspace rooted at `root`.
    ///
    /// # Errors
    /// Returns an error if `splice.json` is missing or invalid, a declared
    /// project folder cannot be loaded, or two projects share a name.
    pub fn load(root: &Path) -> Result<Self, Error> {
        let config_path = root.join(WORKSPACE_CONFIG);
        let content =
            splice_util::fs::read_to_string_lossy(&config_path).map_err(|source| {
                Error::ConfigRead {
                    path: config_path.clone(),
                    source,
                }
            })?;
        let raw: RawConfig =
            serde_json::from_str(&content).map_err(|source| Error::ConfigParse {
                path: config_path.clone(),
                source,
            })?;

        let store_folder = root.join(
            raw.store_folder
                .as_deref()
                .unwrap_or(DEFAULT_STORE_FOLDER),
        );

        let mut projects: Vec<WorkspaceProject> = Vec::new();
        let mut by_name: HashMap<String, usize> = HashMap::new();

        for entry in &raw.projects {
            for folder in expand_project_folders(root, &entry.folder, &config_path)? {
                let manifest_path = folder.join(pkg_json::MANIFEST_FILENAME);
                if is_glob(&entry.folder) && !manifest_path.exists() {
                    // Glob matches may include folders that are not packages
                    continue;
                }

                let manifest = pkg_json::read_manifest(&manifest_path, true)?;
                let project = WorkspaceProject {
                    name: manifest.name,
                    version: manifest.version,
                    folder,
                    dependencies: manifest.dependencies,
                    cyclic_dependencies: entry.cyclic_dependencies.iter().cloned().collect(),
                };

                if let Some(&existing) = by_name.get(&project.name) {
                    return Err(Error::DuplicateProject {
                        name: project.name,
                        first: projects[existing].folder.clone(),
                        second: project.folder,
                    });
                }
                by_name.insert(project.name.clone(), projects.len());
                projects.push(project);
            }
        }

        if projects.is_empty() {
            return Err(Error::invalid(config_path, "no projects declared"));
        }

        Ok(Self {
            root: root.to_path_buf(),
            store_folder,
            projects,
            by_name,
        })
    }

    /// All projects, in declaration order.
    #[must_use]
    pub fn projects(&self) -> &[WorkspaceProject] {
        &self.projects
    }

    /// Look up a project by package name.
    #[must_use]
    pub fn project_by_name(&self, name: &str) -> Option<&WorkspaceProject> {
        self.by_name.get(name).map(|&i| &self.projects[i])
    }
}

/// Expand one `projects[].folder` entry into concrete folders.
fn expand_project_folders(
    root: &Path,
    folder: &str,
    config_path: &Path,
) -> Result<Vec<PathBuf>, Error> {
    if !is_glob(folder) {
        let path = root.join(folder);
        if !path.is_dir() {
            return Err(Error::invalid(
                config_path,
                format!("project folder '{folder}' does not exist"),
            ));
        }
        return Ok(vec![path]);
    }

    let pattern = root.join(folder);
    let pattern_str = pattern.to_string_lossy();
    let entries = glob::glob(&pattern_str).map_err(|e| {
        Error::invalid(
            config_path,
            format!("invalid project pattern '{folder}': {e}"),
        )
    })?;

    let mut folders: Vec<PathBuf> = entries.flatten().filter(|p| p.is_dir()).collect();
    // Glob order is filesystem-dependent; sort for reproducible project order
    folders.sort();
    Ok(folders)
}

fn is_glob(folder: &str) -> bool {
    folder.contains(['*', '?', '['])
}

/// Find the workspace root by walking up the directory tree.
///
/// Returns the first directory containing `splice.json`.
#[must_use]
pub fn find_workspace_root(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(WORKSPACE_CONFIG).is_file() {
            return Some(current);
        }
        if !current.pop() {
            return None;
        }
    }
}
