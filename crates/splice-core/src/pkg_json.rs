//! package.json reading shared by the workspace loader and the store scanner.
//!
//! Dependency edges keep their manifest declaration order: the link resolver's
//! traversal order (and therefore the shape of the output tree) must be
//! reproducible run to run.

use crate::error::Error;
use semver::Version;
use serde_json::Value;
use std::path::Path;

/// Manifest file name inside every package folder.
pub const MANIFEST_FILENAME: &str = "package.json";

/// Version spec prefix marking a dependency on a workspace sibling.
///
/// `workspace:*` (or a bare `workspace:`) accepts any sibling version; a range
/// may follow the prefix, but for these edges the linker deliberately skips
/// the range check.
pub const WORKSPACE_PROTOCOL: &str = "workspace:";

/// How a dependency was declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyKind {
    /// From `dependencies` (or `devDependencies`).
    Regular,
    /// From `optionalDependencies`; absence from the store is tolerated.
    Optional,
    /// Declared with the `workspace:` protocol; links to the sibling without
    /// a version check.
    LocalLink,
}

/// One declared dependency edge.
#[derive(Debug, Clone)]
pub struct ManifestDependency {
    pub name: String,
    /// The raw version spec as written (including any `workspace:` prefix).
    pub spec: String,
    pub kind: DependencyKind,
}

impl ManifestDependency {
    /// The semver range portion of the spec.
    ///
    /// For `workspace:` specs this is whatever follows the prefix, with the
    /// empty and `*` forms meaning "any version".
    #[must_use]
    pub fn range(&self) -> &str {
        match self.spec.strip_prefix(WORKSPACE_PROTOCOL) {
            Some("" | "*") => "*",
            Some(rest) => rest,
            None => &self.spec,
        }
    }
}

/// A parsed package manifest.
#[derive(Debug, Clone)]
pub struct PackageManifest {
    pub name: String,
    pub version: Version,
    /// Declared dependency edges, in manifest order.
    pub dependencies: Vec<ManifestDependency>,
}

/// Read and parse a `package.json`.
///
/// `include_dev` merges `devDependencies` into the edge list, overriding a
/// `dependencies` entry of the same name in place (the same precedence the
/// install step applies when it mirrors a project manifest into the store).
///
/// # Errors
/// Returns an error if the file cannot be read, is not valid JSON, or lacks a
/// usable `name`/`version`.
pub fn read_manifest(path: &Path, include_dev: bool) -> Result<PackageManifest, Error> {
    let content = splice_util::fs::read_to_string_lossy(path).map_err(|source| Error::ConfigRead {
        path: path.to_path_buf(),
        source,
    })?;

    parse_manifest(&content, include_dev).map_err(|e| match e {
        Error::ConfigParse { source, .. } => Error::ConfigParse {
            path: path.to_path_buf(),
            source,
        },
        Error::ConfigInvalid { detail, .. } => Error::invalid(path, detail),
        other => other,
    })
}

/// Parse manifest JSON. See [`read_manifest`].
///
/// # Errors
/// Returns an error on invalid JSON or a missing/unparseable `name`/`version`.
pub fn parse_manifest(content: &str, include_dev: bool) -> Result<PackageManifest, Error> {
    let json: Value = content
        .parse()
        .map_err(|source| Error::ConfigParse {
            path: MANIFEST_FILENAME.into(),
            source,
        })?;

    let root = json
        .as_object()
        .ok_or_else(|| Error::invalid(MANIFEST_FILENAME, "manifest must be a JSON object"))?;

    let name = root
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::invalid(MANIFEST_FILENAME, "manifest has no 'name' field"))?
        .to_string();

    let version_str = root
        .get("version")
        .and_then(Value::as_str)
        .unwrap_or("0.0.0");
    let version = Version::parse(version_str).map_err(|e| {
        Error::invalid(
            MANIFEST_FILENAME,
            format!("package '{name}' has invalid version '{version_str}': {e}"),
        )
    })?;

    let mut dependencies: Vec<ManifestDependency> = Vec::new();
    extend_section(root, "dependencies", None, &mut dependencies);
    if include_dev {
        extend_section(root, "devDependencies", None, &mut dependencies);
    }
    extend_section(
        root,
        "optionalDependencies",
        Some(DependencyKind::Optional),
        &mut dependencies,
    );

    Ok(PackageManifest {
        name,
        version,
        dependencies,
    })
}

/// Append one manifest section, overriding earlier edges of the same name in
/// place so declaration order is kept stable.
fn extend_section(
    root: &serde_json::Map<String, Value>,
    section: &str,
    forced_kind: Option<DependencyKind>,
    out: &mut Vec<ManifestDependency>,
) {
    let Some(entries) = root.get(section).and_then(Value::as_object) else {
        return;
    };

    for (name, spec_value) in entries {
        // Non-string specs are ignored rather than fatal; the install step
        // has already validated whatever it put in the store.
        let Some(spec) = spec_value.as_str() else {
            continue;
        };

        let kind = match forced_kind {
            Some(kind) => kind,
            None if spec.starts_with(WORKSPACE_PROTOCOL) => DependencyKind::LocalLink,
            None => DependencyKind::Regular,
        };

        let dep = ManifestDependency {
            name: name.clone(),
            spec: spec.to_string(),
            kind,
        };

        if let Some(existing) = out.iter_mut().find(|d| d.name == *name) {
            *existing = dep;
        } else {
            out.push(dep);
        }
    }
}
