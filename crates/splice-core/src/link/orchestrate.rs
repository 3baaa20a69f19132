//! Whole-workspace linking.
//!
//! The store index is built once, single-threaded, before anything else;
//! after that every project's pass reads only the index and the workspace
//! set and writes only under its own folder, so projects run in parallel
//! with no locking.

use crate::link::error::LinkError;
use crate::link::manifest::{self, LinkManifest};
use crate::link::materialize::materialize_project;
use crate::link::resolver::{resolve_project, LinkWarning};
use crate::link::store::{ScanIssue, StoreIndex};
use crate::workspace::{Workspace, WorkspaceProject};
use rayon::prelude::*;
use std::path::PathBuf;

/// Result of one project's completed pass.
#[derive(Debug)]
pub struct LinkReport {
    pub project: String,
    /// Sibling dependency names linked directly, sorted.
    pub local_links: Vec<String>,
    pub warnings: Vec<LinkWarning>,
    /// Virtual nodes materialized (the root is not counted).
    pub linked: usize,
}

/// Outcome of a whole-workspace run.
#[derive(Debug)]
pub struct LinkOutcome {
    /// Successful projects, in workspace declaration order.
    pub reports: Vec<LinkReport>,
    /// Failed projects with their errors, in workspace declaration order.
    pub failures: Vec<(String, LinkError)>,
    /// Store folders the scan skipped.
    pub issues: Vec<ScanIssue>,
    /// Where the link manifest was written, when any project succeeded.
    pub manifest_path: Option<PathBuf>,
}

/// Link every project in the workspace.
///
/// # Errors
/// Only store-scan and manifest-write failures abort the whole run;
/// per-project failures are collected in the outcome instead.
pub fn link_workspace(workspace: &Workspace) -> Result<LinkOutcome, LinkError> {
    let projects: Vec<&WorkspaceProject> = workspace.projects().iter().collect();
    link_projects(workspace, &projects)
}

/// Link a subset of the workspace's projects.
///
/// # Errors
/// See [`link_workspace`].
pub fn link_projects(
    workspace: &Workspace,
    projects: &[&WorkspaceProject],
) -> Result<LinkOutcome, LinkError> {
    let store = StoreIndex::build(&workspace.store_folder)?;

    let results: Vec<(String, Result<LinkReport, LinkError>)> = projects
        .par_iter()
        .map(|&project| {
            let result = link_one(project, workspace, &store);
            (project.name.clone(), result)
        })
        .collect();

    let mut reports = Vec::new();
    let mut failures = Vec::new();
    for (name, result) in results {
        match result {
            Ok(report) => reports.push(report),
            Err(e) => failures.push((name, e)),
        }
    }

    let manifest_path = if reports.is_empty() {
        None
    } else {
        let mut link_manifest = LinkManifest::new();
        for report in &reports {
            link_manifest
                .projects
                .insert(report.project.clone(), report.local_links.clone());
        }
        Some(manifest::write_link_manifest(workspace, &link_manifest)?)
    };

    Ok(LinkOutcome {
        reports,
        failures,
        issues: store.issues,
        manifest_path,
    })
}

fn link_one(
    project: &WorkspaceProject,
    workspace: &Workspace,
    store: &StoreIndex,
) -> Result<LinkReport, LinkError> {
    let resolution = resolve_project(project, workspace, store)?;
    materialize_project(&resolution.tree, store)?;

    let mut local_links = resolution.local_links;
    local_links.sort();

    Ok(LinkReport {
        project: project.name.clone(),
        local_links,
        warnings: resolution.warnings,
        linked: resolution.tree.len() - 1,
    })
}

/// Remove every project's dependency folder and the link manifest.
///
/// Returns the projects whose folders were removed.
///
/// # Errors
/// Returns an error on the first folder that cannot be removed.
pub fn unlink_workspace(workspace: &Workspace) -> Result<Vec<String>, LinkError> {
    let mut removed = Vec::new();

    for project in workspace.projects() {
        let node_modules = project.folder.join("node_modules");
        if node_modules.symlink_metadata().is_ok() {
            std::fs::remove_dir_all(&node_modules).map_err(|source| LinkError::Purge {
                path: node_modules.clone(),
                source,
            })?;
            removed.push(project.name.clone());
        }
    }

    let manifest_path = manifest::link_manifest_path(workspace);
    if manifest_path.is_file() {
        std::fs::remove_file(&manifest_path).map_err(|source| LinkError::Purge {
            path: manifest_path,
            source,
        })?;
    }

    Ok(removed)
}
