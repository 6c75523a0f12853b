//! JSON → Dart model classes.
//!
//! ```
//! use json2dart::{convert, Config};
//! use serde_json::json;
//!
//! let units = convert("User", &json!({"id": 1, "tags": ["a"]}), &Config::default()).unwrap();
//! assert_eq!(units.len(), 1);
//! assert!(units[0].source.contains("final List<String> tags;"));
//! ```
pub mod cli;
pub mod codegen;
pub mod config;
pub mod convert;
pub mod error;
pub mod inference;
pub mod ir;
pub mod jq_exec;
pub mod lower;
pub mod naming;
pub mod path_de;
pub mod registry;

pub use config::Config;
pub use convert::{convert, infer_classes, join_units, CodeUnit};
pub use error::{ConfigError, ConvertError};
