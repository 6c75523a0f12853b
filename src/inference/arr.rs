//! Type unification (⊔) for values seen in the same slot: elements of one
//! array, or the same key across merged objects.
//!
//! The join is commutative and associative on types; class identity is
//! settled by the registry (the earlier class survives a merge).
use crate::ir::{Primitive, Slot, TypeDescriptor};
use crate::registry::ClassRegistry;

pub fn merge_slots(registry: &mut ClassRegistry, a: Slot, b: Slot) -> Slot {
    let nullable = a.nullable || b.nullable;
    let ty = merge_types(registry, a.ty, b.ty);
    Slot { ty, nullable }
}

/// Fold a sequence of observations; `None` for an empty sequence.
pub fn merge_all<I>(registry: &mut ClassRegistry, slots: I) -> Option<Slot>
where
    I: IntoIterator<Item = Slot>,
{
    slots.into_iter().reduce(|acc, next| merge_slots(registry, acc, next))
}

fn merge_types(registry: &mut ClassRegistry, a: TypeDescriptor, b: TypeDescriptor) -> TypeDescriptor {
    use Primitive::*;
    use TypeDescriptor as T;

    match (a, b) {
        (T::Primitive(Null), x) | (x, T::Primitive(Null)) => x,
        (T::Primitive(Dynamic), _) | (_, T::Primitive(Dynamic)) => T::dynamic(),
        (T::Primitive(Int), T::Primitive(Double)) | (T::Primitive(Double), T::Primitive(Int)) => {
            T::Primitive(Double)
        }
        (T::Primitive(x), T::Primitive(y)) if x == y => T::Primitive(x),
        (T::List(x), T::List(y)) => T::List(Box::new(merge_slots(registry, *x, *y))),
        (T::Class(x), T::Class(y)) => T::Class(super::obj::merge_classes(registry, x, y)),
        (x, y) => {
            tracing::trace!(?x, ?y, "incompatible observations; widening to dynamic");
            T::dynamic()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::FieldDescriptor;

    fn p(p: Primitive) -> Slot { Slot::required(TypeDescriptor::Primitive(p)) }

    fn list(item: Slot) -> Slot { Slot::required(TypeDescriptor::List(Box::new(item))) }

    fn join(a: Slot, b: Slot) -> Slot {
        let mut reg = ClassRegistry::new();
        merge_slots(&mut reg, a, b)
    }

    #[test]
    fn identical_types_are_idempotent() {
        assert_eq!(join(p(Primitive::String), p(Primitive::String)), p(Primitive::String));
    }

    #[test]
    fn int_widens_to_double_in_either_order() {
        assert_eq!(join(p(Primitive::Int), p(Primitive::Double)), p(Primitive::Double));
        assert_eq!(join(p(Primitive::Double), p(Primitive::Int)), p(Primitive::Double));
    }

    #[test]
    fn null_is_absorbed_but_marks_nullable() {
        let null = Slot::new(TypeDescriptor::null(), true);
        assert_eq!(join(null.clone(), p(Primitive::Bool)), Slot::new(TypeDescriptor::Primitive(Primitive::Bool), true));
        assert_eq!(join(p(Primitive::Bool), null), Slot::new(TypeDescriptor::Primitive(Primitive::Bool), true));
    }

    #[test]
    fn incompatible_primitives_fall_back_to_dynamic() {
        assert_eq!(join(p(Primitive::String), p(Primitive::Bool)).ty, TypeDescriptor::dynamic());
        assert_eq!(join(list(p(Primitive::Int)), p(Primitive::Int)).ty, TypeDescriptor::dynamic());
    }

    #[test]
    fn join_is_associative_through_dynamic() {
        let (a, b, c) = (p(Primitive::Int), p(Primitive::String), p(Primitive::Double));
        let left = join(join(a.clone(), b.clone()), c.clone());
        let right = join(a, join(b, c));
        assert_eq!(left, right);
        assert_eq!(left.ty, TypeDescriptor::dynamic());
    }

    #[test]
    fn lists_merge_element_wise() {
        let empty = list(Slot::required(TypeDescriptor::null()));
        assert_eq!(join(empty.clone(), list(p(Primitive::Int))), list(p(Primitive::Int)));
        assert_eq!(join(list(p(Primitive::Int)), list(p(Primitive::Double))), list(p(Primitive::Double)));
        assert_eq!(merge_all(&mut ClassRegistry::new(), Vec::<Slot>::new()), None);
    }

    #[test]
    fn class_refs_merge_through_the_registry() {
        let mut reg = ClassRegistry::new();
        let field = |key: &str, prim| FieldDescriptor {
            name: key.into(),
            json_key: key.into(),
            ty: TypeDescriptor::Primitive(prim),
            nullable: false,
        };
        let a = reg.register_or_reuse("Item", vec![field("a", Primitive::Int)]).unwrap();
        let b = reg
            .register_or_reuse("Item", vec![field("a", Primitive::Int), field("b", Primitive::String)])
            .unwrap();
        let merged = merge_slots(
            &mut reg,
            Slot::required(TypeDescriptor::Class(a)),
            Slot::required(TypeDescriptor::Class(b)),
        );
        assert_eq!(merged.ty, TypeDescriptor::Class(a));
        let class = reg.get(a);
        assert_eq!(class.name, "Item");
        assert!(!class.field("a").unwrap().nullable);
        assert!(class.field("b").unwrap().nullable);
    }
}
