//!
//! Package configuration
//! ---------------------
//! Declarative configuration for asset packages: a root record with the
//! public base URL pattern, the "available files" entries, and one section
//! per asset kind (javascripts, stylesheets).
//!
//! On the wire the section shape follows the configuration documents this
//! engine accepts: the JSON key `filters` inside a section holds the default
//! filter chain and every other key declares a package. Internally the
//! section is structural, so the reserved key never collides with a package
//! name and no runtime string comparison is needed.

use std::collections::BTreeMap;

use serde::de::Error as DeError;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::{AssetError, AssetResult};

/// The two asset kinds served by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AssetKind {
    Script,
    Style,
}

impl AssetKind {
    /// Fixed public-URL extension per kind.
    pub fn extension(&self) -> &'static str {
        match self {
            AssetKind::Script => "js",
            AssetKind::Style => "css",
        }
    }

    /// Name of the configuration section this kind reads from.
    pub fn section_name(&self) -> &'static str {
        match self {
            AssetKind::Script => "javascripts",
            AssetKind::Style => "stylesheets",
        }
    }
}

/// Root configuration record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Configuration {
    /// Base of the public URL, documented as a `:bundleId` pattern.
    pub base_url: String,
    /// The available files (virtual-path entries, possibly globs).
    pub files: Vec<String>,
    /// The javascript packages.
    pub javascripts: SectionConfig,
    /// The stylesheet packages.
    pub stylesheets: SectionConfig,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            base_url: "/:bundleId/".to_string(),
            files: Vec::new(),
            javascripts: SectionConfig::with_filters(&["combine"]),
            stylesheets: SectionConfig::with_filters(&["combine"]),
        }
    }
}

impl Configuration {
    /// Section for an asset kind.
    pub fn section(&self, kind: AssetKind) -> &SectionConfig {
        match kind {
            AssetKind::Script => &self.javascripts,
            AssetKind::Style => &self.stylesheets,
        }
    }

    /// Look up a package by kind and name.
    pub fn package(&self, kind: AssetKind, name: &str) -> Option<&PackageConfig> {
        self.section(kind).packages.get(name)
    }

    /// Deep-merge a custom override into this configuration: nested records
    /// merge recursively, scalar and array values replace, keys absent in
    /// the override retain prior values. Callable repeatedly; later calls
    /// win, and an empty override is a no-op.
    pub fn merge(&mut self, custom: Value) -> AssetResult<()> {
        let map = match custom {
            Value::Object(map) => map,
            other => {
                return Err(AssetError::config(format!(
                    "configuration override must be an object, got {other}"
                )));
            }
        };
        if map.is_empty() {
            return Ok(());
        }

        let mut base = serde_json::to_value(&*self)
            .map_err(|e| AssetError::config(e.to_string()))?;
        merge_values(&mut base, Value::Object(map));
        *self = serde_json::from_value(base).map_err(|e| AssetError::config(e.to_string()))?;
        Ok(())
    }
}

/// One configuration section: a default filter chain plus the packages of
/// that kind, keyed by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SectionConfig {
    /// Default filter chain applied when a package declares none.
    pub filters: Vec<String>,
    /// Packages by name, in configuration (lexicographic) order.
    pub packages: BTreeMap<String, PackageConfig>,
}

impl SectionConfig {
    fn with_filters(names: &[&str]) -> Self {
        Self {
            filters: names.iter().map(|s| s.to_string()).collect(),
            packages: BTreeMap::new(),
        }
    }
}

impl Serialize for SectionConfig {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.packages.len() + 1))?;
        map.serialize_entry("filters", &self.filters)?;
        for (name, package) in &self.packages {
            map.serialize_entry(name, package)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for SectionConfig {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, Value>::deserialize(deserializer)?;
        let mut section = SectionConfig::default();
        for (key, value) in raw {
            if key == "filters" {
                // A null default chain reads as "no default filters".
                if !value.is_null() {
                    section.filters =
                        serde_json::from_value(value).map_err(D::Error::custom)?;
                }
            } else {
                let package = serde_json::from_value(value).map_err(D::Error::custom)?;
                section.packages.insert(key, package);
            }
        }
        Ok(section)
    }
}

/// One declared package: an ordered file list, an optional filter-chain
/// override and an optional public base URL.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PackageConfig {
    /// Raw-path or virtual-path entries, in serving order.
    pub files: Vec<String>,
    /// `None` inherits the section default; an explicit empty list means no
    /// filters at all.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filters: Option<Vec<String>>,
    /// Base of the public URL for this package only. Defaults to `/`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

/// Deep merge `custom` into `base`: objects merge key by key, everything
/// else (scalars, arrays, null) replaces the prior value.
pub fn merge_values(base: &mut Value, custom: Value) {
    match (base, custom) {
        (Value::Object(base_map), Value::Object(custom_map)) => {
            for (key, value) in custom_map {
                match base_map.get_mut(&key) {
                    Some(slot) => merge_values(slot, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn default_sections_use_combine() {
        let config = Configuration::default();
        assert_eq!(config.base_url, "/:bundleId/");
        assert_eq!(config.javascripts.filters, vec!["combine".to_string()]);
        assert_eq!(config.stylesheets.filters, vec!["combine".to_string()]);
        assert!(config.javascripts.packages.is_empty());
    }

    #[test]
    fn merge_with_empty_object_is_identity() {
        let mut config = Configuration::default();
        let before = config.clone();
        config.merge(json!({})).unwrap();
        assert_eq!(config, before);
    }

    #[test]
    fn merge_rejects_non_object_override() {
        let mut config = Configuration::default();
        assert!(config.merge(json!(["not", "an", "object"])).is_err());
    }

    #[test]
    fn scalars_and_arrays_replace_while_absent_keys_remain() {
        let mut config = Configuration::default();
        config
            .merge(json!({
                "files": ["@site:resources/**/*"],
                "stylesheets": {
                    "homepage": { "files": ["a.css", "b.css"] }
                }
            }))
            .unwrap();
        config.merge(json!({ "files": ["@site:other/*.css"] })).unwrap();

        // Arrays replace, they do not append.
        assert_eq!(config.files, vec!["@site:other/*.css".to_string()]);
        // Sibling keys from the earlier merge survive.
        let homepage = config.package(AssetKind::Style, "homepage").unwrap();
        assert_eq!(homepage.files, vec!["a.css".to_string(), "b.css".to_string()]);
        // Untouched defaults remain.
        assert_eq!(config.base_url, "/:bundleId/");
    }

    #[test]
    fn nested_records_merge_recursively() {
        let mut config = Configuration::default();
        config
            .merge(json!({
                "stylesheets": {
                    "homepage": { "files": ["a.css"], "baseUrl": "/assets/css/" }
                }
            }))
            .unwrap();
        config
            .merge(json!({
                "stylesheets": {
                    "homepage": { "filters": [] }
                }
            }))
            .unwrap();

        let homepage = config.package(AssetKind::Style, "homepage").unwrap();
        assert_eq!(homepage.files, vec!["a.css".to_string()]);
        assert_eq!(homepage.base_url.as_deref(), Some("/assets/css/"));
        assert_eq!(homepage.filters, Some(Vec::new()));
    }

    #[test]
    fn reserved_filters_key_is_the_default_chain_not_a_package() {
        let mut config = Configuration::default();
        config
            .merge(json!({
                "javascripts": {
                    "filters": ["nop", "combine"],
                    "app": { "files": ["app.js"] }
                }
            }))
            .unwrap();

        let section = config.section(AssetKind::Script);
        assert_eq!(section.filters, vec!["nop".to_string(), "combine".to_string()]);
        assert_eq!(section.packages.len(), 1);
        assert!(section.packages.contains_key("app"));
        assert!(!section.packages.contains_key("filters"));
    }

    #[test]
    fn null_default_chain_means_no_filters() {
        let mut config = Configuration::default();
        config.merge(json!({ "stylesheets": { "filters": null } })).unwrap();
        assert!(config.stylesheets.filters.is_empty());
    }

    #[test]
    fn null_package_filters_inherit_the_default() {
        let mut config = Configuration::default();
        config
            .merge(json!({
                "stylesheets": { "homepage": { "files": ["a.css"], "filters": null } }
            }))
            .unwrap();
        let homepage = config.package(AssetKind::Style, "homepage").unwrap();
        assert_eq!(homepage.filters, None);
    }

    #[test]
    fn section_round_trips_through_serde() {
        let mut config = Configuration::default();
        config
            .merge(json!({
                "javascripts": {
                    "filters": ["combine"],
                    "demo": {
                        "files": ["common.js", "header.js"],
                        "baseUrl": "/assets/javascripts/package/"
                    }
                }
            }))
            .unwrap();
        let value = serde_json::to_value(&config).unwrap();
        let back: Configuration = serde_json::from_value(value).unwrap();
        assert_eq!(back, config);
    }
}
