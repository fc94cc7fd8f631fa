//!
//! Virtual path references
//! -----------------------
//! `@{bundleId}:{relativePathOrGlob}` identifies a path scoped to a named
//! bundle. The host application owns resolution; [`VirtualPathResolver`] is
//! the collaborator surface the engine consumes, and [`DiskBundles`] is a
//! directory-backed implementation with glob expansion for standalone use
//! and tests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{AssetError, AssetResult};

static VIRTUAL_PATH_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^@([^:@/]+):(.+)$").unwrap());

/// A parsed virtual-path reference: the bundle it is scoped to and the
/// relative paths it expands to (one for literals, possibly many for globs).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualPath {
    pub bundle_id: String,
    pub relative_paths: Vec<String>,
}

/// Host-supplied resolution of bundle-scoped references.
///
/// Resolution always normalizes to a list: a glob may match one or many
/// files while a literal reference yields exactly one entry. Collapsing back
/// to a single value is the content resolver's job, not the resolver's.
pub trait VirtualPathResolver: Send + Sync {
    /// Whether `uri` is a virtual-path reference at all.
    fn is_virtual_path(&self, uri: &str) -> bool;

    /// Expand a reference into concrete file-system paths.
    fn resolve(&self, uri: &str) -> AssetResult<Vec<PathBuf>>;

    /// Split a reference into its bundle id and relative paths.
    fn parse(&self, uri: &str) -> AssetResult<VirtualPath>;
}

/// Split a reference into `(bundle_id, relative)` without touching disk.
pub fn split_reference(uri: &str) -> Option<(&str, &str)> {
    VIRTUAL_PATH_RE.captures(uri).map(|caps| {
        (
            caps.get(1).expect("bundle id group").as_str(),
            caps.get(2).expect("relative path group").as_str(),
        )
    })
}

fn has_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}

/// Directory-backed resolver mapping bundle ids to root directories.
#[derive(Clone, Default)]
pub struct DiskBundles {
    roots: HashMap<String, PathBuf>,
}

impl DiskBundles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mount a bundle id at a root directory. Later mounts win.
    pub fn mount(mut self, bundle_id: &str, root: impl Into<PathBuf>) -> Self {
        self.roots.insert(bundle_id.to_string(), root.into());
        self
    }

    fn root_for(&self, uri: &str, bundle_id: &str) -> AssetResult<&Path> {
        self.roots
            .get(bundle_id)
            .map(PathBuf::as_path)
            .ok_or_else(|| AssetError::resolution(uri, format!("unknown bundle '{bundle_id}'")))
    }

    /// Expand a relative path (or glob) under a bundle root. Literal paths
    /// come back untouched, existence is checked later by the caller; globs
    /// expand to the matching regular files in sorted order.
    fn expand(&self, uri: &str, root: &Path, relative: &str) -> AssetResult<Vec<PathBuf>> {
        let joined = root.join(relative);
        if !has_glob(relative) {
            return Ok(vec![joined]);
        }
        let pattern = joined.to_string_lossy().into_owned();
        let matches =
            glob::glob(&pattern).map_err(|e| AssetError::resolution(uri, e.to_string()))?;
        let mut paths = Vec::new();
        for entry in matches {
            let path = entry.map_err(|e| AssetError::resolution(uri, e.to_string()))?;
            if path.is_file() {
                paths.push(path);
            }
        }
        Ok(paths)
    }
}

impl VirtualPathResolver for DiskBundles {
    fn is_virtual_path(&self, uri: &str) -> bool {
        VIRTUAL_PATH_RE.is_match(uri)
    }

    fn resolve(&self, uri: &str) -> AssetResult<Vec<PathBuf>> {
        let (bundle_id, relative) = split_reference(uri)
            .ok_or_else(|| AssetError::resolution(uri, "not a virtual path reference"))?;
        let root = self.root_for(uri, bundle_id)?;
        self.expand(uri, root, relative)
    }

    fn parse(&self, uri: &str) -> AssetResult<VirtualPath> {
        let (bundle_id, relative) = split_reference(uri)
            .ok_or_else(|| AssetError::resolution(uri, "not a virtual path reference"))?;
        let root = self.root_for(uri, bundle_id)?;
        let expanded = self.expand(uri, root, relative)?;
        let relative_paths = expanded
            .iter()
            .map(|path| {
                let relative = path.strip_prefix(root).unwrap_or(path);
                relative.to_string_lossy().replace('\\', "/")
            })
            .collect();
        Ok(VirtualPath { bundle_id: bundle_id.to_string(), relative_paths })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, name).unwrap();
        path
    }

    #[test]
    fn reference_syntax() {
        assert_eq!(split_reference("@site:css/a.css"), Some(("site", "css/a.css")));
        assert_eq!(split_reference("@site:resources/**/*"), Some(("site", "resources/**/*")));
        assert_eq!(split_reference("css/a.css"), None);
        assert_eq!(split_reference("https://cdn.example.com/a.js"), None);
        assert_eq!(split_reference("@site"), None);
        assert_eq!(split_reference("@:a.css"), None);
    }

    #[test]
    fn non_references_are_not_virtual_paths() {
        let bundles = DiskBundles::new();
        assert!(!bundles.is_virtual_path("/assets/app.js"));
        assert!(!bundles.is_virtual_path("https://cdn.example.com/a.js"));
        assert!(bundles.is_virtual_path("@site:a.js"));
    }

    #[test]
    fn literal_reference_resolves_without_existence_check() {
        let dir = tempfile::tempdir().unwrap();
        let bundles = DiskBundles::new().mount("site", dir.path());
        let resolved = bundles.resolve("@site:css/missing.css").unwrap();
        assert_eq!(resolved, vec![dir.path().join("css/missing.css")]);
    }

    #[test]
    fn glob_reference_expands_to_sorted_files() {
        let dir = tempfile::tempdir().unwrap();
        let b = touch(dir.path(), "css/b.css");
        let a = touch(dir.path(), "css/a.css");
        touch(dir.path(), "css/nested/ignored.txt");

        let bundles = DiskBundles::new().mount("site", dir.path());
        let resolved = bundles.resolve("@site:css/*.css").unwrap();
        assert_eq!(resolved, vec![a, b]);
    }

    #[test]
    fn recursive_glob_skips_directories() {
        let dir = tempfile::tempdir().unwrap();
        let deep = touch(dir.path(), "resources/js/deep/x.js");
        let top = touch(dir.path(), "resources/top.css");

        let bundles = DiskBundles::new().mount("site", dir.path());
        let resolved = bundles.resolve("@site:resources/**/*").unwrap();
        assert_eq!(resolved, vec![deep, top]);
    }

    #[test]
    fn unknown_bundle_is_a_resolution_error() {
        let bundles = DiskBundles::new();
        let err = bundles.resolve("@nowhere:a.css").unwrap_err();
        assert!(matches!(err, AssetError::Resolution { .. }));
    }

    #[test]
    fn parse_reports_bundle_scoped_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "img/logo.png");
        touch(dir.path(), "img/icon.png");

        let bundles = DiskBundles::new().mount("site", dir.path());
        let parsed = bundles.parse("@site:img/*.png").unwrap();
        assert_eq!(parsed.bundle_id, "site");
        assert_eq!(
            parsed.relative_paths,
            vec!["img/icon.png".to_string(), "img/logo.png".to_string()]
        );
    }

    #[test]
    fn parse_of_literal_keeps_the_relative_path() {
        let dir = tempfile::tempdir().unwrap();
        let bundles = DiskBundles::new().mount("site", dir.path());
        let parsed = bundles.parse("@site:img/logo.png").unwrap();
        assert_eq!(parsed.relative_paths, vec!["img/logo.png".to_string()]);
    }
}
