//!
//! Filter pipeline
//! ---------------
//! A filter transforms the list of contents belonging to a package's files
//! and may change the element count (combining N files into one blob, for
//! example). Filters apply left-to-right; each filter's output list feeds
//! the next filter's input list, while the file list itself is never
//! mutated.
//!
//! Configuration refers to filters by registry name. Names resolve against
//! the registry exactly once when the host signals readiness, so requests
//! never pay a lookup per filter.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::error::{AssetError, AssetResult};

/// A named content transformation applied to a package's file contents.
///
/// `files` carries the concrete file identifiers for filters that care about
/// provenance. Implementations must not assume it matches `contents` in
/// length once an earlier filter has changed the count.
pub trait Filter: Send + Sync {
    fn apply(&self, files: &[PathBuf], contents: Vec<String>) -> AssetResult<Vec<String>>;
}

/// An ordered, resolved filter chain shared between requests.
pub type FilterChain = Arc<Vec<Arc<dyn Filter>>>;

/// Joins every content item into a single blob.
pub struct Combine;

impl Filter for Combine {
    fn apply(&self, _files: &[PathBuf], contents: Vec<String>) -> AssetResult<Vec<String>> {
        let mut combined = String::new();
        for content in &contents {
            combined.push_str(content);
        }
        Ok(vec![combined])
    }
}

/// A filter that does nothing.
pub struct Nop;

impl Filter for Nop {
    fn apply(&self, _files: &[PathBuf], contents: Vec<String>) -> AssetResult<Vec<String>> {
        Ok(contents)
    }
}

/// Adapter turning a plain closure into a [`Filter`].
pub struct FnFilter<F>(pub F);

impl<F> Filter for FnFilter<F>
where
    F: Fn(&[PathBuf], Vec<String>) -> AssetResult<Vec<String>> + Send + Sync,
{
    fn apply(&self, files: &[PathBuf], contents: Vec<String>) -> AssetResult<Vec<String>> {
        (self.0)(files, contents)
    }
}

/// Registry of filters addressable from configuration.
#[derive(Clone, Default)]
pub struct FilterRegistry {
    inner: Arc<Mutex<HashMap<String, Arc<dyn Filter>>>>, // name -> filter
}

impl FilterRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-loaded with the built-in `combine` and `nop` filters.
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        registry.register("combine", Combine);
        registry.register("nop", Nop);
        registry
    }

    #[inline]
    fn norm(name: &str) -> String {
        name.to_ascii_lowercase()
    }

    /// Register or replace a filter under a logical name.
    pub fn register<F: Filter + 'static>(&self, name: &str, filter: F) {
        self.register_arc(name, Arc::new(filter));
    }

    pub fn register_arc(&self, name: &str, filter: Arc<dyn Filter>) {
        let key = Self::norm(name);
        debug!("registering filter '{}'", key);
        self.inner.lock().insert(key, filter);
    }

    /// Register a closure-backed filter.
    pub fn register_fn<F>(&self, name: &str, f: F)
    where
        F: Fn(&[PathBuf], Vec<String>) -> AssetResult<Vec<String>> + Send + Sync + 'static,
    {
        self.register(name, FnFilter(f));
    }

    /// Check whether a filter name is present in the registry.
    pub fn has(&self, name: &str) -> bool {
        self.inner.lock().contains_key(&Self::norm(name))
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Filter>> {
        self.inner.lock().get(&Self::norm(name)).cloned()
    }

    /// Resolve an ordered list of configuration names into a callable chain.
    pub fn chain(&self, names: &[String]) -> AssetResult<FilterChain> {
        let mut chain = Vec::with_capacity(names.len());
        for name in names {
            let filter = self.get(name).ok_or_else(|| AssetError::unknown_filter(name))?;
            chain.push(filter);
        }
        Ok(Arc::new(chain))
    }
}

/// Apply a chain left-to-right. Each filter's output becomes the next
/// filter's input; the file list is shared read-only across the chain.
pub fn apply_chain(
    chain: &[Arc<dyn Filter>],
    files: &[PathBuf],
    mut contents: Vec<String>,
) -> AssetResult<Vec<String>> {
    for filter in chain {
        contents = filter.apply(files, contents)?;
    }
    Ok(contents)
}
