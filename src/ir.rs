// Class-level IR shared by inference, the registry and codegen. No serde_json::Value here.

use std::fmt;

/// Stable handle into a [`crate::registry::ClassRegistry`].
///
/// Ids are allocated in discovery order, so sorting by id gives
/// first-discovery order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClassId(pub(crate) usize);

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Bool,
    Int,
    Double,
    String,
    Null,                    // only nulls (or nothing) observed; absorbed by any other type
    Dynamic,                 // incompatible observations; absorbs everything
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeDescriptor {
    Primitive(Primitive),
    List(Box<Slot>),
    Class(ClassId),
}

/// A type together with its nullability, the unit the merger works on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Slot {
    pub ty: TypeDescriptor,
    pub nullable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: String,        // Dart identifier
    pub json_key: String,    // original key, used verbatim for (de)serialization
    pub ty: TypeDescriptor,
    pub nullable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDescriptor {
    pub id: ClassId,
    pub name: String,
    pub fields: Vec<FieldDescriptor>, // first-sighting order
}

impl TypeDescriptor {
    pub fn null() -> Self { TypeDescriptor::Primitive(Primitive::Null) }
    pub fn dynamic() -> Self { TypeDescriptor::Primitive(Primitive::Dynamic) }

    /// Rewrite every class reference in place.
    pub fn map_class_ids(&mut self, f: &mut impl FnMut(ClassId) -> ClassId) {
        match self {
            TypeDescriptor::Primitive(_) => {}
            TypeDescriptor::List(item) => item.ty.map_class_ids(f),
            TypeDescriptor::Class(id) => *id = f(*id),
        }
    }

    pub fn for_each_class_id(&self, f: &mut impl FnMut(ClassId)) {
        match self {
            TypeDescriptor::Primitive(_) => {}
            TypeDescriptor::List(item) => item.ty.for_each_class_id(f),
            TypeDescriptor::Class(id) => f(*id),
        }
    }

    /// Canonical text used inside structural signatures.
    pub(crate) fn write_signature(&self, out: &mut String) {
        match self {
            TypeDescriptor::Primitive(p) => out.push_str(match p {
                Primitive::Bool => "bool",
                Primitive::Int => "int",
                Primitive::Double => "double",
                Primitive::String => "string",
                Primitive::Null => "null",
                Primitive::Dynamic => "dynamic",
            }),
            TypeDescriptor::List(item) => {
                out.push_str("list<");
                item.write_signature(out);
                out.push('>');
            }
            TypeDescriptor::Class(id) => {
                out.push_str(&id.to_string());
            }
        }
    }
}

impl Slot {
    pub fn new(ty: TypeDescriptor, nullable: bool) -> Self { Self { ty, nullable } }
    pub fn required(ty: TypeDescriptor) -> Self { Self { ty, nullable: false } }

    pub(crate) fn write_signature(&self, out: &mut String) {
        self.ty.write_signature(out);
        if self.nullable { out.push('?'); }
    }
}

impl FieldDescriptor {
    pub fn slot(&self) -> Slot {
        Slot { ty: self.ty.clone(), nullable: self.nullable }
    }
}

impl ClassDescriptor {
    /// Structural signature: ordered `(key, type, nullable)` list.
    ///
    /// The original JSON key is used rather than the Dart name so that two
    /// shapes differing only in key spelling stay distinct.
    pub fn signature(&self) -> String {
        let mut out = String::new();
        for f in &self.fields {
            out.push_str(&f.json_key);
            out.push(':');
            f.slot().write_signature(&mut out);
            out.push(';');
        }
        out
    }

    pub fn field(&self, json_key: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.json_key == json_key)
    }

    pub fn map_class_ids(&mut self, f: &mut impl FnMut(ClassId) -> ClassId) {
        for field in &mut self.fields {
            field.ty.map_class_ids(f);
        }
    }
}
