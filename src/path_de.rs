use serde::de::DeserializeOwned;

use crate::error::ConfigError;

/// Deserialize a YAML node with key-path context in error messages.
///
/// `prefix` is prepended to the reported path when the node was taken out
/// of a larger document (e.g. the `jsonToDart` section of a manifest).
pub fn from_yaml_value_with_path<T: DeserializeOwned>(
    value: serde_yaml::Value,
    prefix: Option<&str>,
) -> Result<T, ConfigError> {
    serde_path_to_error::deserialize::<_, T>(value).map_err(|err| {
        let inner = err.path().to_string();
        let path = match prefix {
            Some(p) if inner == "." => p.to_string(),
            Some(p) => format!("{p}.{inner}"),
            None => inner,
        };
        ConfigError::Invalid { path, message: err.into_inner().to_string() }
    })
}
