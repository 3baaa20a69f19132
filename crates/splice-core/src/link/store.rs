//! Read-only index over the shared dependency store.
//!
//! The store is an already-populated npm-style tree produced by an external
//! install step: package folders at the top level (`name/` or
//! `@scope/name/`), with conflicting transitive versions nested under
//! `<folder>/node_modules/`. The index records every package folder found
//! anywhere in that tree, keeping the physical nesting so that name
//! resolution can follow the module search path.
//!
//! Entries live in an arena addressed by [`EntryId`]; parent/child relations
//! are ids, not references.

use crate::link::error::LinkError;
use crate::pkg_json::{self, ManifestDependency};
use semver::Version;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Reserved scope for workspace project proxy entries in the store.
pub const PROXY_SCOPE: &str = "@splice-proxy";

/// Handle to a store entry inside a [`StoreIndex`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryId(usize);

/// One package folder found in the store.
#[derive(Debug, Clone)]
pub struct StoreEntry {
    /// Package name from the folder's manifest.
    pub name: String,
    /// Exact version from the folder's manifest.
    pub version: Version,
    /// Absolute path of the folder.
    pub folder: PathBuf,
    /// Declared dependency edges, in manifest order.
    pub dependencies: Vec<ManifestDependency>,
    /// Physical parent in the store tree (`None` for the synthetic root).
    pub parent: Option<EntryId>,
    /// Packages nested in this folder's own dependency directory.
    pub children: Vec<EntryId>,
}

/// A store folder the scan could not index.
#[derive(Debug, Clone)]
pub struct ScanIssue {
    pub path: PathBuf,
    pub message: String,
}

/// The built index: arena of entries plus a flat `name@version` lookup.
#[derive(Debug)]
pub struct StoreIndex {
    entries: Vec<StoreEntry>,
    /// `name@version` -> first entry seen with that identity.
    by_name_version: HashMap<String, EntryId>,
    /// Folders skipped during the scan.
    pub issues: Vec<ScanIssue>,
    /// The store folder itself.
    root_folder: PathBuf,
}

impl StoreIndex {
    /// Scan `store_folder` and build the index.
    ///
    /// The scan is a single pass and must complete before any project is
    /// resolved; the result is read-only afterwards.
    ///
    /// # Errors
    /// Returns an error if the store folder itself cannot be read. Individual
    /// unreadable package folders are recorded as [`ScanIssue`]s instead.
    pub fn build(store_folder: &Path) -> Result<Self, LinkError> {
        let mut index = Self {
            entries: Vec::new(),
            by_name_version: HashMap::new(),
            issues: Vec::new(),
            root_folder: store_folder.to_path_buf(),
        };

        // Synthetic root: resolution from a top-level entry ends here.
        index.entries.push(StoreEntry {
            name: String::new(),
            version: Version::new(0, 0, 0),
            folder: store_folder.to_path_buf(),
            dependencies: Vec::new(),
            parent: None,
            children: Vec::new(),
        });

        let root = EntryId(0);
        index.scan_folder(root, store_folder, true)?;
        Ok(index)
    }

    /// The store folder this index was built from.
    #[must_use]
    pub fn root_folder(&self) -> &Path {
        &self.root_folder
    }

    /// The synthetic root entry.
    #[must_use]
    pub fn root(&self) -> EntryId {
        EntryId(0)
    }

    /// Access an entry by id.
    #[must_use]
    pub fn entry(&self, id: EntryId) -> &StoreEntry {
        &self.entries[id.0]
    }

    /// Number of real (non-root) entries indexed.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len() - 1
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.len() == 1
    }

    /// Direct child of `id` with the given package name.
    #[must_use]
    pub fn child_by_name(&self, id: EntryId, name: &str) -> Option<EntryId> {
        self.entries[id.0]
            .children
            .iter()
            .copied()
            .find(|&c| self.entries[c.0].name == name)
    }

    /// Module-search-path resolution: probe `from`'s own nested packages,
    /// then each physical ancestor's, out to the store root.
    ///
    /// This deliberately asks "what does *this* entry's tree say for `name`",
    /// never "what is the newest `name` anywhere" -- sibling packages may
    /// depend on different versions of the same name.
    #[must_use]
    pub fn resolve(&self, from: EntryId, name: &str) -> Option<EntryId> {
        let mut current = Some(from);
        while let Some(id) = current {
            if let Some(found) = self.child_by_name(id, name) {
                return Some(found);
            }
            current = self.entries[id.0].parent;
        }
        None
    }

    /// Flat lookup of the canonical folder for an exact `(name, version)`.
    #[must_use]
    pub fn by_name_and_version(&self, name: &str, version: &Version) -> Option<EntryId> {
        self.by_name_version.get(&format!("{name}@{version}")).copied()
    }

    /// The proxy entry mirroring a workspace project's manifest, if the
    /// install step has produced one.
    #[must_use]
    pub fn proxy_entry(&self, project_name: &str) -> Option<EntryId> {
        self.child_by_name(self.root(), &proxy_name(project_name))
    }

    /// The store's shared executable-shim folder, if present.
    #[must_use]
    pub fn bin_folder(&self) -> Option<PathBuf> {
        let bin = self.root_folder.join(".bin");
        bin.is_dir().then_some(bin)
    }

    /// Scan one dependency directory level, adding each package folder as a
    /// child of `parent`.
    fn scan_folder(
        &mut self,
        parent: EntryId,
        dir: &Path,
        fatal_on_unreadable: bool,
    ) -> Result<(), LinkError> {
        let read = fs::read_dir(dir);
        let read = match (read, fatal_on_unreadable) {
            (Ok(r), _) => r,
            (Err(source), true) => {
                return Err(LinkError::StoreScan {
                    path: dir.to_path_buf(),
                    source,
                })
            }
            (Err(e), false) => {
                self.issues.push(ScanIssue {
                    path: dir.to_path_buf(),
                    message: e.to_string(),
                });
                return Ok(());
            }
        };

        let mut folders: Vec<PathBuf> = read
            .flatten()
            .map(|e| e.path())
            .filter(|p| p.is_dir())
            .collect();
        // read_dir order is filesystem-dependent
        folders.sort();

        for folder in folders {
            let file_name = folder
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();

            if file_name.starts_with('.') {
                // .bin and friends are not packages
                continue;
            }

            if file_name.starts_with('@') {
                // Scope folder: the packages are one level down
                let mut scoped: Vec<PathBuf> = match fs::read_dir(&folder) {
                    Ok(r) => r.flatten().map(|e| e.path()).filter(|p| p.is_dir()).collect(),
                    Err(e) => {
                        self.issues.push(ScanIssue {
                            path: folder.clone(),
                            message: e.to_string(),
                        });
                        continue;
                    }
                };
                scoped.sort();
                for pkg in scoped {
                    self.add_package(parent, &pkg);
                }
            } else {
                self.add_package(parent, &folder);
            }
        }

        Ok(())
    }

    /// Index one package folder and recurse into its nested dependencies.
    fn add_package(&mut self, parent: EntryId, folder: &Path) {
        let manifest_path = folder.join(pkg_json::MANIFEST_FILENAME);
        let manifest = match pkg_json::read_manifest(&manifest_path, false) {
            Ok(m) => m,
            Err(e) => {
                self.issues.push(ScanIssue {
                    path: folder.to_path_buf(),
                    message: e.to_string(),
                });
                return;
            }
        };

        let id = EntryId(self.entries.len());
        self.entries.push(StoreEntry {
            name: manifest.name.clone(),
            version: manifest.version.clone(),
            folder: folder.to_path_buf(),
            dependencies: manifest.dependencies,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.entries[parent.0].children.push(id);

        // First entry encountered wins; any copy of name@version is the same
        // physical content, the index just needs one canonical folder
        self.by_name_version
            .entry(format!("{}@{}", manifest.name, manifest.version))
            .or_insert(id);

        let nested = folder.join("node_modules");
        if nested.is_dir() {
            // Unreadable nested folders become issues, not errors
            let _ = self.scan_folder(id, &nested, false);
        }
    }
}

/// The reserved store name for a workspace project's proxy entry.
///
/// Scoped project names collapse to their unscoped part, mirroring how the
/// install step names the proxies it writes.
#[must_use]
pub fn proxy_name(project_name: &str) -> String {
    let unscoped = project_name
        .rsplit_once('/')
        .map_or(project_name, |(_, n)| n);
    format!("{PROXY_SCOPE}/{unscoped}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write_pkg(dir: &Path, manifest: &str) {
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join("package.json"), manifest).unwrap();
    }

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn test_scan_flat_store() {
        let store = tempdir().unwrap();
        write_pkg(
            &store.path().join("lodash"),
            r#"{"name": "lodash", "version": "4.17.21"}"#,
        );
        write_pkg(
            &store.path().join("@types/node"),
            r#"{"name": "@types/node", "version": "20.0.0"}"#,
        );

        let index = StoreIndex::build(store.path()).unwrap();
        assert_eq!(index.len(), 2);
        assert!(index.issues.is_empty());

        let id = index.by_name_and_version("lodash", &v("4.17.21")).unwrap();
        assert_eq!(index.entry(id).folder, store.path().join("lodash"));
        assert!(index
            .by_name_and_version("@types/node", &v("20.0.0"))
            .is_some());
    }

    #[test]
    fn test_nested_versions_resolve_by_search_path() {
        let store = tempdir().unwrap();
        // Top level: c@1.0.0. Nested under d: c@2.0.0.
        write_pkg(
            &store.path().join("c"),
            r#"{"name": "c", "version": "1.0.0"}"#,
        );
        write_pkg(
            &store.path().join("d"),
            r#"{"name": "d", "version": "1.0.0", "dependencies": {"c": "^2.0.0"}}"#,
        );
        write_pkg(
            &store.path().join("d/node_modules/c"),
            r#"{"name": "c", "version": "2.0.0"}"#,
        );

        let index = StoreIndex::build(store.path()).unwrap();
        assert_eq!(index.len(), 3);

        let d = index.by_name_and_version("d", &v("1.0.0")).unwrap();
        // From inside d, "c" resolves to the nested 2.0.0
        let c_from_d = index.resolve(d, "c").unwrap();
        assert_eq!(index.entry(c_from_d).version, v("2.0.0"));

        // From the top level, "c" resolves to 1.0.0
        let top = index.resolve(index.root(), "c").unwrap();
        assert_eq!(index.entry(top).version, v("1.0.0"));

        // Both versions are in the flat lookup
        assert!(index.by_name_and_version("c", &v("1.0.0")).is_some());
        assert!(index.by_name_and_version("c", &v("2.0.0")).is_some());
    }

    #[test]
    fn test_proxy_entry_lookup() {
        let store = tempdir().unwrap();
        write_pkg(
            &store.path().join("@splice-proxy/alpha"),
            r#"{"name": "@splice-proxy/alpha", "version": "0.0.0", "dependencies": {"lodash": "4.17.21"}}"#,
        );

        let index = StoreIndex::build(store.path()).unwrap();
        let proxy = index.proxy_entry("alpha").unwrap();
        assert_eq!(index.entry(proxy).dependencies.len(), 1);

        // Scoped project names collapse to the unscoped part
        assert!(index.proxy_entry("@myorg/alpha").is_some());
        assert!(index.proxy_entry("beta").is_none());
    }

    #[test]
    fn test_unreadable_manifest_is_issue_not_error() {
        let store = tempdir().unwrap();
        write_pkg(
            &store.path().join("good"),
            r#"{"name": "good", "version": "1.0.0"}"#,
        );
        fs::create_dir_all(store.path().join("bad")).unwrap();
        fs::write(store.path().join("bad/package.json"), "not json").unwrap();

        let index = StoreIndex::build(store.path()).unwrap();
        assert_eq!(index.len(), 1);
        assert_eq!(index.issues.len(), 1);
        assert!(index.issues[0].path.ends_with("bad"));
    }

    #[test]
    fn test_dot_folders_skipped() {
        let store = tempdir().unwrap();
        fs::create_dir_all(store.path().join(".bin")).unwrap();
        write_pkg(
            &store.path().join("a"),
            r#"{"name": "a", "version": "1.0.0"}"#,
        );

        let index = StoreIndex::build(store.path()).unwrap();
        assert_eq!(index.len(), 1);
        assert!(index.issues.is_empty());
        assert_eq!(index.bin_folder(), Some(store.path().join(".bin")));
    }

    #[test]
    fn test_missing_store_folder_is_fatal() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(
            StoreIndex::build(&missing),
            Err(LinkError::StoreScan { .. })
        ));
    }
}
