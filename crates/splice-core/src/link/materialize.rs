//! Filesystem materialization of a completed [`PackageTree`].
//!
//! Two passes per project: purge the old dependency folder, then walk the
//! tree once, synchronously, creating links depth-first. Purge-then-rebuild
//! is not atomic; an interrupted run leaves a partial folder, and the
//! remediation is simply to link again.

use crate::link::error::LinkError;
use crate::link::store::StoreIndex;
use crate::link::tree::{NodeId, PackageTree};
use std::fs;
use std::path::{Path, PathBuf};

/// What kind of filesystem entry a link points at.
///
/// This is the single platform seam: the resolver and the tree walk are
/// platform-agnostic, and only [`link_entry`] knows what a "directory link"
/// means on the current OS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    File,
    Directory,
}

/// Materialize one project's tree.
///
/// # Errors
/// Any filesystem failure is fatal for this project and is not retried.
pub fn materialize_project(tree: &PackageTree, store: &StoreIndex) -> Result<(), LinkError> {
    let root = tree.node(tree.root());
    let node_modules = root.folder.join("node_modules");

    // Start clean: the previous tree is purged wholesale, never diffed.
    remove_existing(&node_modules).map_err(|source| LinkError::Purge {
        path: node_modules.clone(),
        source,
    })?;

    if root.children.is_empty() {
        return Ok(());
    }

    create_dir(&node_modules)?;
    for &child in &root.children {
        create_links(tree, child)?;
    }

    // Give the project the store's shared executable shims.
    if let Some(bin) = store.bin_folder() {
        link_entry(LinkKind::Directory, &bin, &node_modules.join(".bin"))?;
    }

    Ok(())
}

/// Recursively emit one node and its children.
fn create_links(tree: &PackageTree, id: NodeId) -> Result<(), LinkError> {
    let node = tree.node(id);
    let target = node
        .link_target
        .as_deref()
        .ok_or_else(|| LinkError::MissingLinkTarget {
            name: node.name.clone(),
        })?;

    // Scoped names need their "@scope" folder first.
    if let Some(parent_folder) = node.folder.parent() {
        if !parent_folder.exists() {
            create_dir(parent_folder)?;
        }
    }

    if node.children.is_empty() {
        // The whole folder can be a single directory link.
        link_entry(LinkKind::Directory, target, &node.folder)?;
        return Ok(());
    }

    // Some of this node's own dependencies are shadowed, so its dependency
    // folder must differ from the target's: link every entry individually
    // and build a private dependency folder next to them.
    create_dir(&node.folder)?;

    for (name, entry_target) in read_linkable_entries(target)? {
        let link_path = node.folder.join(&name);
        let mut entry_target = entry_target;

        let meta = fs::symlink_metadata(&entry_target).map_err(|source| LinkError::ReadDir {
            path: entry_target.clone(),
            source,
        })?;

        let kind = if meta.file_type().is_symlink() {
            // A directory link cannot safely point at another link; resolve
            // to the real physical path (one level only).
            let real = dunce::canonicalize(&entry_target).map_err(|source| LinkError::ReadDir {
                path: entry_target.clone(),
                source,
            })?;
            if real.is_dir() {
                entry_target = real;
                LinkKind::Directory
            } else {
                LinkKind::File
            }
        } else if meta.is_dir() {
            LinkKind::Directory
        } else {
            LinkKind::File
        };

        link_entry(kind, &entry_target, &link_path)?;
    }

    let node_modules = node.folder.join("node_modules");
    create_dir(&node_modules)?;
    for &child in &node.children {
        create_links(tree, child)?;
    }

    Ok(())
}

/// Entries of `target` to mirror into an interior node's folder, sorted by
/// name. The dependency folder is excluded: the node gets its own.
fn read_linkable_entries(target: &Path) -> Result<Vec<(String, PathBuf)>, LinkError> {
    let read = fs::read_dir(target).map_err(|source| LinkError::ReadDir {
        path: target.to_path_buf(),
        source,
    })?;

    let mut entries: Vec<(String, PathBuf)> = read
        .flatten()
        .filter_map(|e| {
            let name = e.file_name().to_string_lossy().into_owned();
            if name.eq_ignore_ascii_case("node_modules") {
                None
            } else {
                Some((name, e.path()))
            }
        })
        .collect();
    entries.sort();
    Ok(entries)
}

/// Create one link, replacing whatever is already at `link_path`.
///
/// Unix uses symlinks for both kinds. Windows uses a junction for
/// directories and a hard link for files, since creating a file symlink
/// there requires elevated privileges. Platforms with neither degrade to a
/// copy.
///
/// # Errors
/// Returns an error if the existing entry cannot be removed or the link
/// cannot be created.
pub fn link_entry(kind: LinkKind, target: &Path, link_path: &Path) -> Result<(), LinkError> {
    remove_existing(link_path).map_err(|source| LinkError::CreateLink {
        link: link_path.to_path_buf(),
        target: target.to_path_buf(),
        source,
    })?;

    create_link(kind, target, link_path).map_err(|source| LinkError::CreateLink {
        link: link_path.to_path_buf(),
        target: target.to_path_buf(),
        source,
    })
}

#[cfg(unix)]
fn create_link(_kind: LinkKind, target: &Path, link_path: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(target, link_path)
}

#[cfg(windows)]
fn create_link(kind: LinkKind, target: &Path, link_path: &Path) -> std::io::Result<()> {
    match kind {
        LinkKind::Directory => junction::create(target, link_path),
        LinkKind::File => fs::hard_link(target, link_path),
    }
}

#[cfg(not(any(unix, windows)))]
fn create_link(kind: LinkKind, target: &Path, link_path: &Path) -> std::io::Result<()> {
    match kind {
        LinkKind::Directory => copy_dir_all(target, link_path),
        LinkKind::File => fs::copy(target, link_path).map(|_| ()),
    }
}

#[cfg(not(any(unix, windows)))]
fn copy_dir_all(src: &Path, dst: &Path) -> std::io::Result<()> {
    fs::create_dir_all(dst)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            copy_dir_all(&entry.path(), &dst.join(entry.file_name()))?;
        } else {
            fs::copy(entry.path(), dst.join(entry.file_name()))?;
        }
    }
    Ok(())
}

/// Remove a symlink, junction, directory, or file at `path`, if present.
fn remove_existing(path: &Path) -> std::io::Result<()> {
    let Ok(meta) = fs::symlink_metadata(path) else {
        // Nothing there
        return Ok(());
    };

    #[cfg(unix)]
    {
        if meta.file_type().is_symlink() {
            return fs::remove_file(path);
        }
    }

    #[cfg(windows)]
    {
        use std::os::windows::fs::MetadataExt;
        // FILE_ATTRIBUTE_REPARSE_POINT = 0x400: junction or symlink
        if meta.file_attributes() & 0x400 != 0 {
            return fs::remove_dir(path);
        }
    }

    if meta.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

fn create_dir(path: &Path) -> Result<(), LinkError> {
    fs::create_dir_all(path).map_err(|source| LinkError::CreateDir {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use semver::Version;
    use tempfile::tempdir;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    fn write_pkg(dir: &Path, manifest: &str) {
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join("package.json"), manifest).unwrap();
    }

    #[test]
    fn test_leaf_nodes_become_directory_links() {
        let ws = tempdir().unwrap();
        let project = ws.path().join("alpha");
        fs::create_dir_all(&project).unwrap();
        let store_dir = ws.path().join("store");
        write_pkg(
            &store_dir.join("lodash"),
            r#"{"name": "lodash", "version": "4.17.21"}"#,
        );
        let store = StoreIndex::build(&store_dir).unwrap();

        let mut tree = PackageTree::new("alpha", v("1.0.0"), project.clone());
        tree.add_child(
            tree.root(),
            "lodash",
            v("4.17.21"),
            store_dir.join("lodash"),
        )
        .unwrap();

        materialize_project(&tree, &store).unwrap();

        let link = project.join("node_modules/lodash");
        assert!(link.symlink_metadata().unwrap().file_type().is_symlink());
        assert_eq!(fs::read_link(&link).unwrap(), store_dir.join("lodash"));
        assert!(link.join("package.json").exists());
    }

    #[test]
    fn test_interior_node_links_entries_individually() {
        let ws = tempdir().unwrap();
        let project = ws.path().join("alpha");
        fs::create_dir_all(&project).unwrap();
        let store_dir = ws.path().join("store");
        write_pkg(&store_dir.join("d"), r#"{"name": "d", "version": "1.0.0"}"#);
        fs::write(store_dir.join("d/index.js"), "module.exports = 1;").unwrap();
        fs::create_dir_all(store_dir.join("d/lib")).unwrap();
        fs::write(store_dir.join("d/lib/util.js"), "").unwrap();
        // The store copy's own dependency folder must not leak through
        fs::create_dir_all(store_dir.join("d/node_modules/hidden")).unwrap();
        write_pkg(
            &store_dir.join("c"),
            r#"{"name": "c", "version": "2.0.0"}"#,
        );
        let store = StoreIndex::build(&store_dir).unwrap();

        let mut tree = PackageTree::new("alpha", v("1.0.0"), project.clone());
        let d = tree
            .add_child(tree.root(), "d", v("1.0.0"), store_dir.join("d"))
            .unwrap();
        tree.add_child(d, "c", v("2.0.0"), store_dir.join("c"))
            .unwrap();

        materialize_project(&tree, &store).unwrap();

        let d_folder = project.join("node_modules/d");
        // d is a real directory, not a link
        assert!(!d_folder.symlink_metadata().unwrap().file_type().is_symlink());
        // its files are links into the store copy
        assert!(d_folder
            .join("package.json")
            .symlink_metadata()
            .unwrap()
            .file_type()
            .is_symlink());
        assert!(d_folder.join("index.js").exists());
        assert!(d_folder.join("lib/util.js").exists());
        // the store copy's node_modules was not mirrored
        assert!(!d_folder.join("node_modules/hidden").exists());
        // the shadowed child lives in d's private dependency folder
        let c_link = d_folder.join("node_modules/c");
        assert!(c_link.symlink_metadata().unwrap().file_type().is_symlink());
    }

    #[test]
    fn test_purge_removes_previous_tree() {
        let ws = tempdir().unwrap();
        let project = ws.path().join("alpha");
        let stale = project.join("node_modules/stale");
        fs::create_dir_all(&stale).unwrap();
        fs::write(stale.join("old.txt"), "old").unwrap();
        let store_dir = ws.path().join("store");
        fs::create_dir_all(&store_dir).unwrap();
        let store = StoreIndex::build(&store_dir).unwrap();

        // Tree with no children: purge happens, nothing is recreated
        let tree = PackageTree::new("alpha", v("1.0.0"), project.clone());
        materialize_project(&tree, &store).unwrap();

        assert!(!project.join("node_modules").exists());
    }

    #[test]
    fn test_materialize_twice_is_idempotent() {
        let ws = tempdir().unwrap();
        let project = ws.path().join("alpha");
        fs::create_dir_all(&project).unwrap();
        let store_dir = ws.path().join("store");
        write_pkg(
            &store_dir.join("lodash"),
            r#"{"name": "lodash", "version": "4.17.21"}"#,
        );
        let store = StoreIndex::build(&store_dir).unwrap();

        let mut tree = PackageTree::new("alpha", v("1.0.0"), project.clone());
        tree.add_child(
            tree.root(),
            "lodash",
            v("4.17.21"),
            store_dir.join("lodash"),
        )
        .unwrap();

        materialize_project(&tree, &store).unwrap();
        materialize_project(&tree, &store).unwrap();

        let link = project.join("node_modules/lodash");
        assert!(link.symlink_metadata().unwrap().file_type().is_symlink());
        assert_eq!(fs::read_link(&link).unwrap(), store_dir.join("lodash"));
    }

    #[test]
    fn test_bin_folder_linked_when_tree_nonempty() {
        let ws = tempdir().unwrap();
        let project = ws.path().join("alpha");
        fs::create_dir_all(&project).unwrap();
        let store_dir = ws.path().join("store");
        write_pkg(
            &store_dir.join("lodash"),
            r#"{"name": "lodash", "version": "4.17.21"}"#,
        );
        fs::create_dir_all(store_dir.join(".bin")).unwrap();
        fs::write(store_dir.join(".bin/lodash"), "#!/bin/sh\n").unwrap();
        let store = StoreIndex::build(&store_dir).unwrap();

        let mut tree = PackageTree::new("alpha", v("1.0.0"), project.clone());
        tree.add_child(
            tree.root(),
            "lodash",
            v("4.17.21"),
            store_dir.join("lodash"),
        )
        .unwrap();

        materialize_project(&tree, &store).unwrap();

        let bin = project.join("node_modules/.bin");
        assert!(bin.symlink_metadata().unwrap().file_type().is_symlink());
        assert!(bin.join("lodash").exists());
    }

    #[test]
    fn test_scoped_package_scope_folder_created() {
        let ws = tempdir().unwrap();
        let project = ws.path().join("alpha");
        fs::create_dir_all(&project).unwrap();
        let store_dir = ws.path().join("store");
        write_pkg(
            &store_dir.join("@types/node"),
            r#"{"name": "@types/node", "version": "20.0.0"}"#,
        );
        let store = StoreIndex::build(&store_dir).unwrap();

        let mut tree = PackageTree::new("alpha", v("1.0.0"), project.clone());
        tree.add_child(
            tree.root(),
            "@types/node",
            v("20.0.0"),
            store_dir.join("@types/node"),
        )
        .unwrap();

        materialize_project(&tree, &store).unwrap();

        let link = project.join("node_modules/@types/node");
        assert!(link.symlink_metadata().unwrap().file_type().is_symlink());
    }

    #[test]
    fn test_symlinked_store_entry_resolved_to_real_path() {
        // A store folder entry that is itself a symlink to a directory must
        // be linked via its physical path, never chained.
        let ws = tempdir().unwrap();
        let project = ws.path().join("alpha");
        fs::create_dir_all(&project).unwrap();
        let store_dir = ws.path().join("store");
        write_pkg(&store_dir.join("d"), r#"{"name": "d", "version": "1.0.0"}"#);
        let real_assets = ws.path().join("real-assets");
        fs::create_dir_all(&real_assets).unwrap();
        fs::write(real_assets.join("data.txt"), "x").unwrap();
        std::os::unix::fs::symlink(&real_assets, store_dir.join("d/assets")).unwrap();
        write_pkg(&store_dir.join("c"), r#"{"name": "c", "version": "2.0.0"}"#);
        let store = StoreIndex::build(&store_dir).unwrap();

        let mut tree = PackageTree::new("alpha", v("1.0.0"), project.clone());
        let d = tree
            .add_child(tree.root(), "d", v("1.0.0"), store_dir.join("d"))
            .unwrap();
        tree.add_child(d, "c", v("2.0.0"), store_dir.join("c"))
            .unwrap();

        materialize_project(&tree, &store).unwrap();

        let assets = project.join("node_modules/d/assets");
        let linked = fs::read_link(&assets).unwrap();
        // Points at the physical directory, not at the intermediate symlink
        assert_eq!(dunce::canonicalize(&linked).unwrap(), dunce::canonicalize(&real_assets).unwrap());
        assert!(assets.join("data.txt").exists());
    }
}
