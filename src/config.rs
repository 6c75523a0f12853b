//! Converter configuration.
//!
//! Every option has a default, so `Config::default()` is a complete
//! configuration. Files may hold the options either at top level or under a
//! `jsonToDart:` section of a project manifest (pubspec-style).
use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;

pub const DEFAULT_INDENT: usize = 2;
pub const DEFAULT_NULL_TYPE: &str = "dynamic";
pub const DEFAULT_MAX_DEPTH: usize = 256;
/// Destination for package-qualified classes when no folder is configured.
pub const DEFAULT_OUTPUT_FOLDER: &str = "lib";

const MANIFEST_SECTION: &str = "jsonToDart";

// every key `Config` reads, aliases included
const KNOWN_KEYS: &[&str] = &[
    "indent", "tabSize", "nullSafety", "mergeArrayApproach", "copyWithMethod",
    "nullValueDataType", "maxDepth", "outputFolder",
];

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// spaces per indentation level
    #[serde(alias = "tabSize")]
    pub indent: usize,

    /// emit `?` markers and `required` constructor params
    pub null_safety: bool,

    /// union the fields of all objects in an array (off: first element only)
    #[serde(rename = "mergeArrayApproach")]
    pub merge_arrays: bool,

    /// emit a `copyWith` helper
    #[serde(rename = "copyWithMethod")]
    pub copy_with: bool,

    /// Dart type used for null-only and conflicting fields
    #[serde(rename = "nullValueDataType")]
    pub null_type: String,

    /// nesting guard for pathological input
    pub max_depth: usize,

    /// where the CLI writes files when no explicit destination is given
    pub output_folder: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            indent: DEFAULT_INDENT,
            null_safety: true,
            merge_arrays: true,
            copy_with: false,
            null_type: DEFAULT_NULL_TYPE.to_string(),
            max_depth: DEFAULT_MAX_DEPTH,
            output_folder: None,
        }
    }
}

impl Config {
    /// Parse a config document. Empty documents and manifests without a
    /// `jsonToDart` section yield the defaults.
    pub fn from_yaml_str(src: &str) -> Result<Self, ConfigError> {
        if src.trim().is_empty() {
            return Ok(Self::default());
        }
        let doc: serde_yaml::Value = serde_yaml::from_str(src).map_err(|error| ConfigError::Invalid {
            path: ".".to_string(),
            message: error.to_string(),
        })?;
        match doc {
            serde_yaml::Value::Null => Ok(Self::default()),
            serde_yaml::Value::Mapping(mut map) => {
                if let Some(section) = map.remove(MANIFEST_SECTION) {
                    if section.is_null() {
                        return Ok(Self::default());
                    }
                    if let serde_yaml::Value::Mapping(options) = &section {
                        warn_unknown_keys(options, Some(MANIFEST_SECTION));
                    }
                    return crate::path_de::from_yaml_value_with_path(section, Some(MANIFEST_SECTION));
                }
                if looks_like_manifest(&map) {
                    tracing::debug!("manifest has no `{}` section; using defaults", MANIFEST_SECTION);
                    return Ok(Self::default());
                }
                warn_unknown_keys(&map, None);
                crate::path_de::from_yaml_value_with_path(serde_yaml::Value::Mapping(map), None)
            }
            other => crate::path_de::from_yaml_value_with_path(other, None),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let src = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&src)
    }

    /// Rendered name of the null placeholder, never empty.
    pub fn null_type_name(&self) -> &str {
        let name = self.null_type.trim();
        if name.is_empty() { DEFAULT_NULL_TYPE } else { name }
    }
}

// top-level keys of a pubspec; none of them is an option name
fn looks_like_manifest(map: &serde_yaml::Mapping) -> bool {
    ["name", "dependencies", "environment", "flutter"]
        .iter()
        .any(|k| map.contains_key(*k))
}

/// Keys that no option reads. They are tolerated so newer manifests keep
/// working with this version.
fn unknown_keys(map: &serde_yaml::Mapping) -> Vec<String> {
    map.keys()
        .filter_map(|k| k.as_str())
        .filter(|k| !KNOWN_KEYS.contains(k))
        .map(str::to_string)
        .collect()
}

fn warn_unknown_keys(map: &serde_yaml::Mapping, section: Option<&str>) {
    for key in unknown_keys(map) {
        let path = section.map_or_else(|| key.clone(), |s| format!("{s}.{key}"));
        tracing::warn!(%path, "ignoring unknown config key");
    }
}
