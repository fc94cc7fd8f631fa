//!
//! Asset manager
//! -------------
//! Owns the package configuration and turns it into public URLs and
//! filtered content.
//!
//! Responsibilities:
//! - Configuration override (deep merge) before the host signals readiness.
//! - Content resolution: expand a package's file list, read every file in
//!   order, run the filter chain, collapse the result.
//! - URL resolution: the deterministic public URL set per package, no I/O.
//! - Available-file index: a snapshot of every file reachable through the
//!   configured entries, the sole authorization for direct serving.
//! - Public URL to file path mapping for the middleware.
//!
//! Everything is read-mostly after the readiness signal; the index and the
//! resolved filter chains are swapped wholesale there, so request handlers
//! only ever observe a consistent snapshot.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, info};

use crate::config::{AssetKind, Configuration, PackageConfig};
use crate::error::{AssetError, AssetResult};
use crate::filter::{apply_chain, FilterChain, FilterRegistry};
use crate::resolver::VirtualPathResolver;

static PUBLIC_URL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^/([^/]+)/(.+)$").unwrap());

/// The collapsed result of a package resolution. Callers rely on the
/// distinction to know whether a package ultimately produced one artifact
/// or several.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    Empty,
    Single(String),
    Many(Vec<String>),
}

impl Content {
    /// Collapse rule: zero items become the empty result, exactly one item
    /// is returned directly, two or more stay a list.
    pub fn collapse(mut contents: Vec<String>) -> Self {
        match contents.len() {
            0 => Content::Empty,
            1 => Content::Single(contents.remove(0)),
            _ => Content::Many(contents),
        }
    }

    /// Body text for an HTTP response. Several items join with newlines;
    /// advertising one URL for several content items is a caller
    /// configuration error, so no framing format is invented here.
    pub fn into_body(self) -> String {
        match self {
            Content::Empty => String::new(),
            Content::Single(content) => content,
            Content::Many(contents) => contents.join("\n"),
        }
    }
}

/// Filter chains resolved against the registry on the readiness signal.
#[derive(Default)]
struct ChainCache {
    defaults: HashMap<AssetKind, FilterChain>,
    packages: HashMap<(AssetKind, String), FilterChain>,
}

/// The package registry and resolution engine.
pub struct AssetManager {
    configuration: RwLock<Configuration>,
    filters: FilterRegistry,
    resolver: Arc<dyn VirtualPathResolver>,
    /// Snapshot of files authorized for direct serving; swapped wholesale on
    /// the readiness signal.
    available: RwLock<Arc<Vec<PathBuf>>>,
    chains: RwLock<Option<Arc<ChainCache>>>,
}

impl AssetManager {
    /// Manager with the built-in filter registry (`combine`, `nop`).
    pub fn new(resolver: Arc<dyn VirtualPathResolver>) -> Self {
        Self::with_registry(resolver, FilterRegistry::with_builtins())
    }

    pub fn with_registry(resolver: Arc<dyn VirtualPathResolver>, filters: FilterRegistry) -> Self {
        Self {
            configuration: RwLock::new(Configuration::default()),
            filters,
            resolver,
            available: RwLock::new(Arc::new(Vec::new())),
            chains: RwLock::new(None),
        }
    }

    /// The filter registry, for registering custom filters before the host
    /// signals readiness.
    pub fn filters(&self) -> &FilterRegistry {
        &self.filters
    }

    /// A copy of the current configuration.
    pub fn configuration(&self) -> Configuration {
        self.configuration.read().clone()
    }

    /// Deep-merge a custom configuration override into the current one.
    pub fn override_configuration(&self, custom: Value) -> AssetResult<()> {
        self.configuration.write().merge(custom)
    }

    /// Readiness signal from the host: rebuild the available-file index in
    /// full and resolve every configured filter name against the registry.
    pub fn on_bundles_initialized(&self) -> AssetResult<()> {
        let configuration = self.configuration();

        let files = self.expand_entries(&configuration.files)?;
        info!(target: "bindery", "available file index rebuilt: {} entries", files.len());
        *self.available.write() = Arc::new(files);

        let mut cache = ChainCache::default();
        for kind in [AssetKind::Script, AssetKind::Style] {
            let section = configuration.section(kind);
            cache.defaults.insert(kind, self.filters.chain(&section.filters)?);
            for (name, package) in &section.packages {
                if let Some(names) = &package.filters {
                    cache
                        .packages
                        .insert((kind, name.clone()), self.filters.chain(names)?);
                }
            }
        }
        *self.chains.write() = Some(Arc::new(cache));
        Ok(())
    }

    /// Expand a list of raw-path-or-virtual-path entries into concrete file
    /// identifiers, preserving order and duplicates.
    fn expand_entries(&self, entries: &[String]) -> AssetResult<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in entries {
            if self.resolver.is_virtual_path(entry) {
                files.extend(self.resolver.resolve(entry)?);
            } else {
                files.push(PathBuf::from(entry));
            }
        }
        Ok(files)
    }

    /// Chain selection: the package's own chain if it declares one (even
    /// empty), else the section default. Served from the readiness cache;
    /// before readiness the names resolve on the fly.
    fn chain_for(
        &self,
        kind: AssetKind,
        name: &str,
        package: &PackageConfig,
        configuration: &Configuration,
    ) -> AssetResult<FilterChain> {
        let cache = self.chains.read().clone();
        if let Some(cache) = cache {
            if let Some(chain) = cache.packages.get(&(kind, name.to_string())) {
                return Ok(chain.clone());
            }
            if package.filters.is_none() {
                if let Some(chain) = cache.defaults.get(&kind) {
                    return Ok(chain.clone());
                }
            }
        }
        match &package.filters {
            Some(names) => self.filters.chain(names),
            None => self.filters.chain(&configuration.section(kind).filters),
        }
    }

    /// Resolve a package's filtered content. `None` means the package is
    /// not configured, which is distinct from an empty result. File lists
    /// are re-expanded and re-read on every call; reads happen sequentially
    /// in file-list order and the first failure aborts the resolution.
    pub async fn content(&self, kind: AssetKind, name: &str) -> AssetResult<Option<Content>> {
        // Snapshot what we need before the first await; nothing is locked
        // across I/O.
        let (package, configuration) = {
            let configuration = self.configuration.read();
            match configuration.package(kind, name) {
                Some(package) => (package.clone(), configuration.clone()),
                None => return Ok(None),
            }
        };

        let files = self.expand_entries(&package.files)?;

        let mut contents = Vec::with_capacity(files.len());
        for path in &files {
            let content = tokio::fs::read_to_string(path)
                .await
                .map_err(|source| AssetError::read(path.clone(), source))?;
            contents.push(content);
        }

        let chain = self.chain_for(kind, name, &package, &configuration)?;
        let contents = apply_chain(&chain, &files, contents)?;
        Ok(Some(Content::collapse(contents)))
    }

    /// Deterministic public URLs of a package, independent of what filters
    /// later do to the content. One URL for zero or one files, else one URL
    /// per file in list order. `None` means the package is not configured.
    pub fn urls(&self, kind: AssetKind, name: &str) -> Option<Vec<String>> {
        let configuration = self.configuration.read();
        let package = configuration.package(kind, name)?;
        let base_url = package.base_url.as_deref().unwrap_or("/");
        let extension = kind.extension();
        let total = package.files.len();
        if total > 1 {
            Some(
                (0..total)
                    .map(|index| format!("{base_url}{name}-{index}.{extension}"))
                    .collect(),
            )
        } else {
            Some(vec![format!("{base_url}{name}.{extension}")])
        }
    }

    /// Names of the configured packages of a kind, in configuration order.
    pub fn package_names(&self, kind: AssetKind) -> Vec<String> {
        self.configuration
            .read()
            .section(kind)
            .packages
            .keys()
            .cloned()
            .collect()
    }

    /// Map a virtual-path reference to its public URLs, one per relative
    /// path the reference expands to.
    pub fn public_urls_from_virtual_path(&self, uri: &str) -> AssetResult<Vec<String>> {
        let parsed = self.resolver.parse(uri)?;
        Ok(parsed
            .relative_paths
            .iter()
            .map(|relative| format!("/{}/{}", parsed.bundle_id, relative))
            .collect())
    }

    /// Public URL(s) of an asset reference. Non-virtual input (absolute or
    /// external URLs) passes through unchanged.
    pub fn asset_url(&self, uri: &str) -> AssetResult<Vec<String>> {
        if self.resolver.is_virtual_path(uri) {
            return self.public_urls_from_virtual_path(uri);
        }
        Ok(vec![uri.to_string()])
    }

    /// The current available-file snapshot, in configuration order with
    /// duplicates kept.
    pub fn available_files(&self) -> Arc<Vec<PathBuf>> {
        self.available.read().clone()
    }

    /// Map a public URL of the form `/{bundleId}/{rest}` back to a file
    /// path, authorized by exact membership in the available-file snapshot.
    /// Malformed URLs and resolution failures yield `None`.
    pub fn file_path_from_public_url(&self, public_url: &str) -> Option<PathBuf> {
        let caps = PUBLIC_URL_RE.captures(public_url)?;
        let bundle_id = caps.get(1).expect("bundle id group").as_str();
        let rest = caps.get(2).expect("path group").as_str();
        let uri = format!("@{bundle_id}:{rest}");

        let resolved = match self.resolver.resolve(&uri) {
            Ok(paths) => paths,
            Err(error) => {
                debug!(target: "bindery", "direct file lookup failed for '{}': {}", uri, error);
                return None;
            }
        };

        let available = self.available_files();
        resolved.into_iter().find(|path| available.contains(path))
    }
}
