//! Per-project link resolution.
//!
//! Builds a [`PackageTree`] for one workspace project by walking the
//! already-resolved dependency graph recorded in the store, deciding for each
//! edge whether to link directly to a sibling project, reuse a placement
//! already made further up the search path, or shadow a conflicting version
//! closer to its consumer.

use crate::link::error::LinkError;
use crate::link::store::{EntryId, StoreIndex};
use crate::link::tree::{NodeId, PackageTree, ResolveOrCreate};
use crate::pkg_json::DependencyKind;
use crate::range;
use crate::workspace::{Workspace, WorkspaceProject};
use std::collections::VecDeque;

/// Classification of a non-fatal condition met during resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// A sibling project exists but its version does not satisfy the
    /// requested range; resolution fell back to the store.
    VersionIncompatible,
    /// A sibling edge was resolved through the store to break a dependency
    /// cycle.
    CyclicFallback,
    /// An optional dependency has no store entry and was skipped.
    OptionalMissing,
}

/// A warning accumulated during one project's pass. Warnings never abort the
/// pass; the CLI decides how to surface them.
#[derive(Debug, Clone)]
pub struct LinkWarning {
    pub kind: WarningKind,
    pub message: String,
}

impl LinkWarning {
    fn new(kind: WarningKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// The completed plan for one project.
#[derive(Debug)]
pub struct LinkResolution {
    pub tree: PackageTree,
    /// Dependency names satisfied by a direct link to a sibling project's
    /// folder, in first-seen order.
    pub local_links: Vec<String>,
    pub warnings: Vec<LinkWarning>,
}

/// One unit of pending traversal work.
struct QueueItem {
    /// The store entry whose dependency edges are being expanded.
    entry: EntryId,
    /// The virtual node those edges hang off.
    node: NodeId,
    /// When inside a cycle-breaking subtree, the node all descendant
    /// placements are pinned under.
    cyclic_subtree_root: Option<NodeId>,
}

/// Build the virtual package tree for `project`.
///
/// # Errors
/// Fatal when the project has no proxy entry in the store, or when a
/// non-optional dependency cannot be found there; both mean the install step
/// is stale and must be re-run.
pub fn resolve_project(
    project: &WorkspaceProject,
    workspace: &Workspace,
    store: &StoreIndex,
) -> Result<LinkResolution, LinkError> {
    let proxy = store
        .proxy_entry(&project.name)
        .ok_or_else(|| LinkError::MissingProxyEntry {
            project: project.name.clone(),
        })?;

    let mut tree = PackageTree::new(&project.name, project.version.clone(), project.folder.clone());
    let mut local_links: Vec<String> = Vec::new();
    let mut warnings: Vec<LinkWarning> = Vec::new();

    let mut queue: VecDeque<QueueItem> = VecDeque::new();
    queue.push_back(QueueItem {
        entry: proxy,
        node: tree.root(),
        cyclic_subtree_root: None,
    });

    while let Some(item) = queue.pop_front() {
        // The store entry's edge list is the union the install step built
        // (regular + dev for proxies); it is the authority on what to expand,
        // in manifest order.
        for dep in &store.entry(item.entry).dependencies {
            let dep_name = dep.name.clone();
            let dep_kind = dep.kind;
            let dep_range = dep.range().to_string();

            let mut starting_cyclic_subtree = false;
            let sibling = workspace.project_by_name(&dep_name);

            if let Some(sibling) = sibling {
                if item.cyclic_subtree_root.is_some() {
                    // Already below a cycle-breaking root: never link
                    // directly, or the cycle would re-enter the workspace.
                    warnings.push(LinkWarning::new(
                        WarningKind::CyclicFallback,
                        format!(
                            "resolving '{dep_name}' for '{}' through the store (inside a cyclic dependency subtree)",
                            project.name
                        ),
                    ));
                } else if project.cyclic_dependencies.contains(&dep_name) {
                    // This edge starts a new cycle-breaking subtree.
                    starting_cyclic_subtree = true;
                    warnings.push(LinkWarning::new(
                        WarningKind::CyclicFallback,
                        format!(
                            "resolving '{dep_name}' for '{}' through the store (declared cyclic)",
                            project.name
                        ),
                    ));
                } else if dep_kind != DependencyKind::LocalLink
                    && !range::satisfies(&sibling.version, &dep_range)
                {
                    // Note the range check is skipped for LocalLink edges:
                    // version bumps would otherwise break direct links
                    // between top-level projects mid-bump.
                    warnings.push(LinkWarning::new(
                        WarningKind::VersionIncompatible,
                        format!(
                            "not linking '{dep_name}' for '{}' locally: requested range '{dep_range}' does not match workspace version {}",
                            project.name, sibling.version
                        ),
                    ));
                } else {
                    // Link straight to the sibling's folder. Siblings keep
                    // their own fully-linked dependency folder, so the node
                    // gets no children and nothing is enqueued.
                    let resolution = tree.resolve_or_create(item.node, &dep_name, None);
                    let reusable = resolution
                        .found
                        .is_some_and(|f| tree.node(f).version == sibling.version);
                    if !reusable {
                        let parent = placement_parent(&resolution, &dep_name)?;
                        tree.add_child(
                            parent,
                            &dep_name,
                            sibling.version.clone(),
                            sibling.folder.clone(),
                        )?;
                    }
                    if !local_links.contains(&dep_name) {
                        local_links.push(dep_name);
                    }
                    continue;
                }
            }

            // Resolve through the store instead.
            let Some(resolved) = store.resolve(item.entry, &dep_name) else {
                if dep_kind == DependencyKind::Optional {
                    warnings.push(LinkWarning::new(
                        WarningKind::OptionalMissing,
                        format!("skipping optional dependency '{dep_name}': not present in the store"),
                    ));
                    continue;
                }
                return Err(LinkError::MissingDependency {
                    dependency: dep_name,
                    dependent: tree.node(item.node).name.clone(),
                });
            };
            let resolved_entry = store.entry(resolved);

            // Inside a cyclic subtree, sibling-named edges are pinned to the
            // subtree root so the whole cycle's closure stays under one
            // placement and never drifts back into direct links.
            let stop_at = if item.cyclic_subtree_root.is_some() && sibling.is_some() {
                item.cyclic_subtree_root
            } else {
                None
            };
            let resolution = tree.resolve_or_create(item.node, &dep_name, stop_at);

            let reusable = resolution
                .found
                .is_some_and(|f| tree.node(f).version == resolved_entry.version);
            if reusable {
                // Already expanded when first placed; nothing more to do.
                continue;
            }

            let parent = placement_parent(&resolution, &dep_name)?;
            let canonical = store
                .by_name_and_version(&resolved_entry.name, &resolved_entry.version)
                .ok_or_else(|| LinkError::StoreEntryMissing {
                    name: resolved_entry.name.clone(),
                    version: resolved_entry.version.clone(),
                })?;

            let child = tree.add_child(
                parent,
                &resolved_entry.name,
                resolved_entry.version.clone(),
                store.entry(canonical).folder.clone(),
            )?;

            let subtree_root = if starting_cyclic_subtree {
                // The new node roots the subtree; a subtree never starts
                // inside an existing one, so this cannot overwrite.
                Some(child)
            } else {
                item.cyclic_subtree_root
            };

            queue.push_back(QueueItem {
                entry: resolved,
                node: child,
                cyclic_subtree_root: subtree_root,
            });
        }
    }

    Ok(LinkResolution {
        tree,
        local_links,
        warnings,
    })
}

fn placement_parent(resolution: &ResolveOrCreate, name: &str) -> Result<NodeId, LinkError> {
    resolution
        .parent_for_create
        .ok_or_else(|| LinkError::NoPlacement {
            name: name.to_string(),
        })
}
