//! The virtual package tree: an in-memory plan of one project's private
//! dependency folder.
//!
//! Each node stands for one eventual directory link (or the project root
//! itself). A node's children are exactly the dependencies that could *not*
//! be satisfied further up the module search path and must be shadowed
//! closer to their consumer.
//!
//! Nodes live in an arena addressed by [`NodeId`]; parent/child pointers are
//! ids rather than references, which keeps ownership flat and makes traversal
//! order explicit.

use crate::link::error::LinkError;
use semver::Version;
use std::path::PathBuf;

/// Handle to a node inside a [`PackageTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// One planned directory entry in the output tree.
#[derive(Debug, Clone)]
pub struct PackageNode {
    pub name: String,
    pub version: Version,
    /// The eventual location on disk, inside an ancestor's dependency folder
    /// (or the project folder itself for the root).
    pub folder: PathBuf,
    /// The real directory this node links to. `None` only for the root.
    pub link_target: Option<PathBuf>,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

/// Result of probing the ancestor chain for an existing placement.
#[derive(Debug, Clone, Copy)]
pub struct ResolveOrCreate {
    /// An existing node with the requested name, if any level had one.
    pub found: Option<NodeId>,
    /// The level a new node would be created under: the last level inspected
    /// that had no child of that name. `None` when the starting level itself
    /// already had one.
    pub parent_for_create: Option<NodeId>,
}

/// Arena-backed tree, built fresh for every linking pass and discarded after
/// materialization.
#[derive(Debug, Clone)]
pub struct PackageTree {
    nodes: Vec<PackageNode>,
}

impl PackageTree {
    /// Create a tree containing only the project's root node.
    #[must_use]
    pub fn new(name: &str, version: Version, folder: PathBuf) -> Self {
        Self {
            nodes: vec![PackageNode {
                name: name.to_string(),
                version,
                folder,
                link_target: None,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    /// The root node id.
    #[must_use]
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Access a node by id.
    #[must_use]
    pub fn node(&self, id: NodeId) -> &PackageNode {
        &self.nodes[id.0]
    }

    /// Total number of nodes, root included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        // The root always exists
        false
    }

    /// Direct child of `id` with the given name.
    #[must_use]
    pub fn child_by_name(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.nodes[id.0]
            .children
            .iter()
            .copied()
            .find(|&c| self.nodes[c.0].name == name)
    }

    /// Place a new node under `parent`, at
    /// `<parent folder>/node_modules/<name>`.
    ///
    /// # Errors
    /// Rejects a second child of the same name under one parent; the
    /// resolver's placement logic never asks for one.
    pub fn add_child(
        &mut self,
        parent: NodeId,
        name: &str,
        version: Version,
        link_target: PathBuf,
    ) -> Result<NodeId, LinkError> {
        if self.child_by_name(parent, name).is_some() {
            return Err(LinkError::DuplicateChild {
                name: name.to_string(),
            });
        }

        let folder = self.nodes[parent.0].folder.join("node_modules").join(name);
        let id = NodeId(self.nodes.len());
        self.nodes.push(PackageNode {
            name: name.to_string(),
            version,
            folder,
            link_target: Some(link_target),
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        Ok(id)
    }

    /// Walk the ancestor chain from `start` outward looking for a node named
    /// `name`, following the module search path convention.
    ///
    /// `stop_at` pins the walk: when given, no level above it is inspected
    /// and a missing name is created directly under it. The resolver uses
    /// this to confine a cycle-breaking subtree's placements to the subtree
    /// root.
    #[must_use]
    pub fn resolve_or_create(
        &self,
        start: NodeId,
        name: &str,
        stop_at: Option<NodeId>,
    ) -> ResolveOrCreate {
        let mut current = start;
        let mut parent_for_create = None;

        loop {
            if let Some(found) = self.child_by_name(current, name) {
                return ResolveOrCreate {
                    found: Some(found),
                    parent_for_create,
                };
            }

            let parent = self.nodes[current.0].parent;
            if parent.is_none() || stop_at == Some(current) {
                return ResolveOrCreate {
                    found: None,
                    parent_for_create: Some(current),
                };
            }

            parent_for_create = Some(current);
            current = parent.unwrap_or(current);
        }
    }
}
