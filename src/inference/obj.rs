use std::collections::HashSet;

use indexmap::IndexMap;

use crate::ir::{ClassId, FieldDescriptor};
use crate::naming;
use crate::registry::ClassRegistry;

/// Union two classes into one.
///
/// Keys present in both keep their merged type; keys seen in only one side
/// become nullable. Field order: `a`'s fields first, then `b`'s new keys.
pub fn merge_classes(registry: &mut ClassRegistry, a: ClassId, b: ClassId) -> ClassId {
    let (a, b) = (registry.resolve(a), registry.resolve(b));
    if a == b {
        return a;
    }

    let fa = registry.get(a).fields.clone();
    let fb = registry.get(b).fields.clone();
    // before the field union: shapes that refer to themselves lead back to this pair
    let survivor = registry.absorb(a, b);

    let mut out: IndexMap<String, FieldDescriptor> = IndexMap::with_capacity(fa.len().max(fb.len()));

    // merge keys from a
    for f in fa {
        out.insert(f.json_key.clone(), f);
    }
    let mut in_b: HashSet<String> = HashSet::with_capacity(fb.len());
    for f in fb {
        in_b.insert(f.json_key.clone());
        match out.get_mut(&f.json_key) {
            Some(existing) => {
                let merged = super::arr::merge_slots(registry, existing.slot(), f.slot());
                existing.ty = merged.ty;
                existing.nullable = merged.nullable;
            }
            // keys only in b
            None => {
                out.insert(f.json_key.clone(), FieldDescriptor { nullable: true, ..f });
            }
        }
    }
    // keys only in a
    for (key, f) in out.iter_mut() {
        if !in_b.contains(key) {
            f.nullable = true;
        }
    }

    let mut fields: Vec<FieldDescriptor> = out.into_values().collect();
    assign_field_names(&mut fields);
    registry.replace_fields(survivor, fields)
}

/// Derive a unique Dart identifier for every field from its JSON key.
pub fn assign_field_names(fields: &mut [FieldDescriptor]) {
    let mut taken: HashSet<String> = HashSet::with_capacity(fields.len());
    for f in fields.iter_mut() {
        let base = naming::field_name(&f.json_key);
        let mut name = base.clone();
        let mut n = 2;
        while !taken.insert(name.clone()) {
            name = format!("{base}{n}");
            n += 1;
        }
        f.name = name;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Primitive, TypeDescriptor};

    fn field(key: &str, p: Primitive) -> FieldDescriptor {
        FieldDescriptor {
            name: String::new(),
            json_key: key.to_string(),
            ty: TypeDescriptor::Primitive(p),
            nullable: false,
        }
    }

    #[test]
    fn union_keeps_first_sighting_order() {
        let mut reg = ClassRegistry::new();
        let a = reg.register_or_reuse("T", vec![field("b", Primitive::Int), field("a", Primitive::Int)]).unwrap();
        let b = reg.register_or_reuse("T", vec![field("c", Primitive::Bool), field("a", Primitive::Double)]).unwrap();
        let id = merge_classes(&mut reg, a, b);
        let class = reg.get(id);
        let keys: Vec<&str> = class.fields.iter().map(|f| f.json_key.as_str()).collect();
        assert_eq!(keys, ["b", "a", "c"]);
        assert!(class.field("b").unwrap().nullable);
        assert!(!class.field("a").unwrap().nullable);
        assert!(class.field("c").unwrap().nullable);
        assert_eq!(class.field("a").unwrap().ty, TypeDescriptor::Primitive(Primitive::Double));
    }

    #[test]
    fn colliding_identifiers_get_suffixes() {
        let mut fields = vec![
            field("user_id", Primitive::Int),
            field("userId", Primitive::Int),
            field("UserID", Primitive::Int),
        ];
        assign_field_names(&mut fields);
        let names: Vec<&str> = fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["userId", "userId2", "userId3"]);
    }
}
