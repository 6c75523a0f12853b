//! Post-walk finalization: canonical references, no duplicate shapes, and a
//! fixed emission order.
use crate::ir::{ClassDescriptor, ClassId};
use crate::registry::ClassRegistry;

/// Classes ready for codegen. Every `ClassRef` points at a class in the set.
#[derive(Debug, Clone)]
pub struct Lowered {
    registry: ClassRegistry,
    order: Vec<ClassId>,
    root: ClassId,
}

impl Lowered {
    /// Emission order: first-discovery order, root last.
    pub fn classes(&self) -> impl Iterator<Item = &ClassDescriptor> {
        self.order.iter().map(|id| self.registry.get(*id))
    }

    pub fn root(&self) -> &ClassDescriptor { self.registry.get(self.root) }

    pub fn name_of(&self, id: ClassId) -> &str { &self.registry.get(id).name }

    pub fn len(&self) -> usize { self.order.len() }

    pub fn is_empty(&self) -> bool { self.order.is_empty() }
}

pub fn lower_registry(mut registry: ClassRegistry, root: ClassId) -> Lowered {
    registry.fold_duplicates();
    let root = registry.resolve(root);

    let mut order: Vec<ClassId> = registry
        .classes()
        .map(|c| c.id)
        .filter(|id| *id != root)
        .collect();
    order.push(root);

    debug_assert!(
        registry.classes().all(|c| {
            let mut ok = true;
            for f in &c.fields {
                f.ty.for_each_class_id(&mut |id| ok &= registry.resolve(id) == id);
            }
            ok
        }),
        "stale class reference survived lowering"
    );

    tracing::debug!(classes = order.len(), root = %registry.get(root).name, "lowered class table");
    Lowered { registry, order, root }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::inference::Inference;
    use serde_json::json;

    fn lower(v: serde_json::Value) -> Lowered {
        let config = Config::default();
        let mut inf = Inference::new(&config);
        let root = inf.infer_root("Root", &v).unwrap();
        lower_registry(inf.into_registry(), root)
    }

    #[test]
    fn root_is_emitted_last() {
        let lowered = lower(json!({"a": {"x": 1}, "b": [{"y": true}], "c": 1}));
        let names: Vec<&str> = lowered.classes().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["A", "B", "Root"]);
        assert_eq!(lowered.len(), 3);
        assert_eq!(lowered.root().name, "Root");
    }

    #[test]
    fn shapes_equal_after_merges_are_folded() {
        // `a.c` and `b.c` start as different classes; the array merge makes
        // them one, which leaves `A` and `B` structurally identical
        let lowered = lower(json!({
            "a": {"c": {"x": 1}},
            "b": {"c": {"y": 1}},
            "list": [{"x": 1}, {"y": 1}]
        }));
        let names: Vec<&str> = lowered.classes().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["C", "A", "Root"]);
        let root = lowered.root();
        assert_eq!(root.field("a").unwrap().ty, root.field("b").unwrap().ty);
        assert_eq!(lowered.name_of(match root.field("b").unwrap().ty {
            crate::ir::TypeDescriptor::Class(id) => id,
            _ => panic!("expected class"),
        }), "A");
    }
}
