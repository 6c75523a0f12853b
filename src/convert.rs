//! One-call conversion: JSON document → ordered Dart class units.
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::codegen::emit_class;
use crate::config::Config;
use crate::error::Result;
use crate::inference::Inference;
use crate::lower::{lower_registry, Lowered};

/// One generated class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodeUnit {
    pub class_name: String,
    pub source: String,
}

/// Infer and lower without rendering. Each call owns a fresh registry.
#[instrument(level = "debug", skip(value, config))]
pub fn infer_classes(root_name: &str, value: &Value, config: &Config) -> Result<Lowered> {
    let mut inference = Inference::new(config);
    let root = inference.infer_root(root_name, value)?;
    Ok(lower_registry(inference.into_registry(), root))
}

/// Convert `value` into one unit per class, nested classes first and the
/// root class (named `root_name`) last.
pub fn convert(root_name: &str, value: &Value, config: &Config) -> Result<Vec<CodeUnit>> {
    let lowered = infer_classes(root_name, value, config)?;
    let units: Vec<CodeUnit> = lowered
        .classes()
        .map(|class| CodeUnit {
            class_name: class.name.clone(),
            source: emit_class(config, &lowered, class),
        })
        .collect();
    debug!(units = units.len(), "converted document");
    Ok(units)
}

/// Units joined into one Dart source file.
pub fn join_units(units: &[CodeUnit]) -> String {
    units
        .iter()
        .map(|u| u.source.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}
