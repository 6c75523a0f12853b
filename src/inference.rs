//! Structural type inference over a single JSON document.
//!
//! Walk the value tree once, map every node to a [`Slot`], and register each
//! object shape in the [`ClassRegistry`] as it is completed (children before
//! parents). Arrays fold their element observations through the join in
//! [`arr`], which is where objects of one array collapse into one class.
//!
//! Design goals:
//! - Every path ends in a concrete type; conflicts widen to `dynamic`.
//! - No errors for schema-less surprises (nulls, empty arrays, conflicts).
//! - Bounded recursion: nesting beyond `max_depth` is reported, not overflowed.
pub mod arr;
pub mod num;
pub mod obj;

use serde_json::{Map, Value};
use tracing::trace;

use crate::config::Config;
use crate::error::{ConvertError, Result};
use crate::ir::{ClassId, FieldDescriptor, Primitive, Slot, TypeDescriptor};
use crate::naming;
use crate::registry::ClassRegistry;

// class name used when a key yields no identifier characters
const FALLBACK_CLASS_NAME: &str = "Item";

#[derive(Debug, Clone)]
enum Seg {
    Key(String),
    Index(usize),
}

/// Render a `$`-rooted path: `$.data.items[3]`, `$['odd key']`.
fn render_path(path: &[Seg]) -> String {
    let mut out = String::from("$");
    for seg in path {
        match seg {
            Seg::Key(k) if !k.is_empty() && k.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') => {
                out.push('.');
                out.push_str(k);
            }
            Seg::Key(k) => {
                out.push_str("['");
                out.push_str(&k.replace('\\', "\\\\").replace('\'', "\\'"));
                out.push_str("']");
            }
            Seg::Index(i) => {
                out.push_str(&format!("[{i}]"));
            }
        }
    }
    out
}

pub fn kind_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ------------------------------- Front API -------------------------------- //

pub struct Inference<'c> {
    config: &'c Config,
    registry: ClassRegistry,
    path: Vec<Seg>,
}

impl<'c> Inference<'c> {
    pub fn new(config: &'c Config) -> Self {
        Self { config, registry: ClassRegistry::new(), path: Vec::new() }
    }

    /// Infer the whole document; the root object becomes the class named
    /// `root_name`. Anything other than an object at the root is rejected.
    pub fn infer_root(&mut self, root_name: &str, value: &Value) -> Result<ClassId> {
        let Value::Object(map) = value else {
            return Err(ConvertError::InvalidInput {
                path: render_path(&self.path),
                found: kind_name(value),
            });
        };
        self.registry.reserve_name(root_name);
        let fields = self.infer_fields(map, 1)?;
        Ok(self.registry.register_pinned(root_name, fields))
    }

    pub fn into_registry(self) -> ClassRegistry { self.registry }

    /// Map one value to its slot. `key_hint` names any class discovered here.
    pub fn infer(&mut self, value: &Value, key_hint: &str, depth: usize) -> Result<Slot> {
        if depth > self.config.max_depth {
            return Err(ConvertError::DepthExceeded {
                path: render_path(&self.path),
                limit: self.config.max_depth,
            });
        }
        trace!(path = %render_path(&self.path), kind = kind_name(value), "observe");
        let slot = match value {
            Value::Null => Slot::new(TypeDescriptor::null(), true),
            Value::Bool(_) => Slot::required(TypeDescriptor::Primitive(Primitive::Bool)),
            Value::Number(n) => Slot::required(TypeDescriptor::Primitive(num::classify(n))),
            Value::String(_) => Slot::required(TypeDescriptor::Primitive(Primitive::String)),
            Value::Array(xs) => self.infer_array(xs, key_hint, depth)?,
            Value::Object(map) => {
                let fields = self.infer_fields(map, depth + 1)?;
                let name = naming::class_name(key_hint, FALLBACK_CLASS_NAME);
                Slot::required(TypeDescriptor::Class(self.registry.register_or_reuse(&name, fields)?))
            }
        };
        Ok(slot)
    }

    fn infer_array(&mut self, xs: &[Value], key_hint: &str, depth: usize) -> Result<Slot> {
        // no element observed: the placeholder stays open for later merges
        let mut item = Slot::required(TypeDescriptor::null());

        let take = if self.config.merge_arrays { xs.len() } else { xs.len().min(1) };
        let mut observed = Vec::with_capacity(take);
        for (i, el) in xs.iter().enumerate().take(take) {
            self.path.push(Seg::Index(i));
            let slot = self.infer(el, key_hint, depth + 1);
            self.path.pop();
            observed.push(slot?);
        }
        if let Some(merged) = arr::merge_all(&mut self.registry, observed) {
            item = merged;
        }
        Ok(Slot::required(TypeDescriptor::List(Box::new(item))))
    }

    fn infer_fields(&mut self, map: &Map<String, Value>, depth: usize) -> Result<Vec<FieldDescriptor>> {
        let mut fields = Vec::with_capacity(map.len());
        for (k, v) in map {
            self.path.push(Seg::Key(k.clone()));
            let slot = self.infer(v, k, depth);
            self.path.pop();
            let slot = slot?;
            fields.push(FieldDescriptor {
                name: String::new(),
                json_key: k.clone(),
                ty: slot.ty,
                nullable: slot.nullable,
            });
        }
        obj::assign_field_names(&mut fields);
        Ok(fields)
    }
}

// ------------------------------- Tests ------------------------------------ //
