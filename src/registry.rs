//! Per-conversion class table.
//!
//! Classes live in a flat slot vector indexed by [`ClassId`]. A merge never
//! moves a class: the absorbed slot becomes a forward pointer to the
//! survivor and every stored reference is rewritten, so ids held elsewhere
//! (e.g. on the inference stack) stay valid through [`ClassRegistry::resolve`].
use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::error::{ConvertError, Result};
use crate::ir::{ClassDescriptor, ClassId, FieldDescriptor};
use crate::naming::DART_CORE_TYPES;

// base, base2, ... base{MAX_NAME_ATTEMPTS}
const MAX_NAME_ATTEMPTS: usize = 10_000;

#[derive(Debug, Clone)]
enum Entry {
    Live(ClassDescriptor),
    Forward(ClassId),
}

#[derive(Debug, Clone)]
pub struct ClassRegistry {
    slots: Vec<Entry>,
    by_signature: HashMap<String, ClassId>,
    names: HashSet<String>,
    pinned: Option<ClassId>,
}

impl Default for ClassRegistry {
    fn default() -> Self { Self::new() }
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            by_signature: HashMap::new(),
            names: DART_CORE_TYPES.iter().map(|s| s.to_string()).collect(),
            pinned: None,
        }
    }

    /// Keep `name` away from generated classes until it is claimed with
    /// [`ClassRegistry::register_pinned`].
    pub fn reserve_name(&mut self, name: &str) {
        self.names.insert(name.to_string());
    }

    pub fn resolve(&self, mut id: ClassId) -> ClassId {
        while let Entry::Forward(next) = &self.slots[id.0] {
            id = *next;
        }
        id
    }

    pub fn get(&self, id: ClassId) -> &ClassDescriptor {
        match &self.slots[self.resolve(id).0] {
            Entry::Live(class) => class,
            Entry::Forward(_) => unreachable!("resolve always ends on a live slot"),
        }
    }

    fn get_mut(&mut self, id: ClassId) -> &mut ClassDescriptor {
        let id = self.resolve(id);
        match &mut self.slots[id.0] {
            Entry::Live(class) => class,
            Entry::Forward(_) => unreachable!("resolve always ends on a live slot"),
        }
    }

    /// Live classes in first-discovery order.
    pub fn classes(&self) -> impl Iterator<Item = &ClassDescriptor> {
        self.slots.iter().filter_map(|e| match e {
            Entry::Live(class) => Some(class),
            Entry::Forward(_) => None,
        })
    }

    pub fn len(&self) -> usize { self.classes().count() }

    pub fn is_empty(&self) -> bool { self.len() == 0 }

    /// Return the id of a structurally identical class, or store a new one
    /// named after `base_name` (suffixed on collision).
    pub fn register_or_reuse(&mut self, base_name: &str, mut fields: Vec<FieldDescriptor>) -> Result<ClassId> {
        self.canonicalize_fields(&mut fields);
        let probe = ClassDescriptor { id: ClassId(self.slots.len()), name: String::new(), fields };
        let signature = probe.signature();
        if let Some(existing) = self.by_signature.get(&signature) {
            let existing = self.resolve(*existing);
            if self.get(existing).signature() == signature {
                debug!(class = %self.get(existing).name, "reusing structurally identical class");
                return Ok(existing);
            }
        }
        let name = self.unique_name(base_name)?;
        Ok(self.push(ClassDescriptor { name, ..probe }, signature))
    }

    /// Store the root class under its reserved name. Never deduplicated,
    /// never folded into another class.
    pub fn register_pinned(&mut self, name: &str, mut fields: Vec<FieldDescriptor>) -> ClassId {
        self.canonicalize_fields(&mut fields);
        self.names.insert(name.to_string());
        let class = ClassDescriptor { id: ClassId(self.slots.len()), name: name.to_string(), fields };
        let signature = class.signature();
        let id = self.push(class, signature);
        self.pinned = Some(id);
        id
    }

    fn push(&mut self, class: ClassDescriptor, signature: String) -> ClassId {
        let id = class.id;
        debug!(class = %class.name, %id, fields = class.fields.len(), "registered class");
        self.slots.push(Entry::Live(class));
        self.by_signature.entry(signature).or_insert(id);
        id
    }

    fn unique_name(&mut self, base: &str) -> Result<String> {
        if self.names.insert(base.to_string()) {
            return Ok(base.to_string());
        }
        for n in 2..=MAX_NAME_ATTEMPTS {
            let candidate = format!("{base}{n}");
            if self.names.insert(candidate.clone()) {
                return Ok(candidate);
            }
        }
        Err(ConvertError::NameCollisionUnresolvable {
            base: base.to_string(),
            attempts: MAX_NAME_ATTEMPTS,
        })
    }

    /// First half of a merge: the absorbed class forwards to the survivor
    /// at once, so a nested merge reached through the field union (a class
    /// that refers to itself) already sees a single class. The lower id
    /// survives; it takes `a`'s name unless it is the pinned root. Finish
    /// with [`ClassRegistry::replace_fields`].
    pub fn absorb(&mut self, a: ClassId, b: ClassId) -> ClassId {
        let (a, b) = (self.resolve(a), self.resolve(b));
        if a == b {
            return a;
        }
        let (survivor, absorbed) = self.order_pair(a, b);
        let name = self.get(a).name.clone();
        self.forward(absorbed, survivor);
        if absorbed == a && Some(survivor) != self.pinned {
            let old = std::mem::replace(&mut self.get_mut(survivor).name, name.clone());
            self.names.remove(&old);
            self.names.insert(name);
        }
        self.rewrite_refs();
        self.reindex();
        debug!(class = %self.get(survivor).name, %survivor, %absorbed, "merged classes");
        survivor
    }

    /// Install the merged field list on `id`, then fold it into an existing
    /// class of the same shape, if any.
    pub fn replace_fields(&mut self, id: ClassId, mut fields: Vec<FieldDescriptor>) -> ClassId {
        self.canonicalize_fields(&mut fields);
        let id = self.resolve(id);
        self.get_mut(id).fields = fields;
        self.reindex();
        self.fold_into_twin(id)
    }

    // pinned class always survives, otherwise the earlier discovery
    fn order_pair(&self, a: ClassId, b: ClassId) -> (ClassId, ClassId) {
        if Some(b) == self.pinned || (Some(a) != self.pinned && b < a) { (b, a) } else { (a, b) }
    }

    fn forward(&mut self, from: ClassId, to: ClassId) {
        let old = std::mem::replace(&mut self.slots[from.0], Entry::Forward(to));
        if let Entry::Live(class) = old {
            self.names.remove(&class.name);
        }
    }

    // after a merge the survivor may now equal an existing class
    fn fold_into_twin(&mut self, id: ClassId) -> ClassId {
        let signature = self.get(id).signature();
        match self.by_signature.get(&signature).copied() {
            Some(twin) if self.resolve(twin) != id => {
                let twin = self.resolve(twin);
                let (survivor, absorbed) = self.order_pair(twin, id);
                debug!(class = %self.get(survivor).name, "merged class matches an existing shape");
                self.forward(absorbed, survivor);
                self.rewrite_refs();
                self.reindex();
                survivor
            }
            _ => id,
        }
    }

    /// Fold every group of structurally identical classes into its earliest
    /// member until no two live classes share a signature.
    pub fn fold_duplicates(&mut self) {
        loop {
            let mut seen: HashMap<String, ClassId> = HashMap::new();
            let mut folds: Vec<(ClassId, ClassId)> = Vec::new();
            for class in self.classes() {
                match seen.get(&class.signature()) {
                    Some(first) => folds.push((*first, class.id)),
                    None => { seen.insert(class.signature(), class.id); }
                }
            }
            if folds.is_empty() {
                return;
            }
            for (first, dup) in folds {
                let (survivor, absorbed) = self.order_pair(self.resolve(first), self.resolve(dup));
                if survivor != absorbed {
                    debug!(class = %self.get(survivor).name, %absorbed, "folded duplicate class");
                    self.forward(absorbed, survivor);
                }
            }
            self.rewrite_refs();
            self.reindex();
        }
    }

    fn canonicalize_fields(&self, fields: &mut [FieldDescriptor]) {
        for field in fields {
            field.ty.map_class_ids(&mut |id| self.resolve(id));
        }
    }

    // full pass: O(registry size) per call
    fn rewrite_refs(&mut self) {
        let table: Vec<ClassId> = (0..self.slots.len()).map(|i| self.resolve(ClassId(i))).collect();
        for entry in &mut self.slots {
            if let Entry::Live(class) = entry {
                class.map_class_ids(&mut |id| table[id.0]);
            }
        }
    }

    fn reindex(&mut self) {
        self.by_signature.clear();
        for entry in &self.slots {
            if let Entry::Live(class) = entry {
                self.by_signature.entry(class.signature()).or_insert(class.id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Primitive, TypeDescriptor};

    fn field(key: &str, p: Primitive, nullable: bool) -> FieldDescriptor {
        FieldDescriptor {
            name: key.to_string(),
            json_key: key.to_string(),
            ty: TypeDescriptor::Primitive(p),
            nullable,
        }
    }

    fn class_field(key: &str, id: ClassId) -> FieldDescriptor {
        FieldDescriptor {
            name: key.to_string(),
            json_key: key.to_string(),
            ty: TypeDescriptor::Class(id),
            nullable: false,
        }
    }

    #[test]
    fn identical_shapes_share_one_class() {
        let mut reg = ClassRegistry::new();
        let a = reg.register_or_reuse("A", vec![field("x", Primitive::Int, false)]).unwrap();
        let b = reg.register_or_reuse("B", vec![field("x", Primitive::Int, false)]).unwrap();
        assert_eq!(a, b);
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.get(a).name, "A");
    }

    #[test]
    fn colliding_names_get_suffixes() {
        let mut reg = ClassRegistry::new();
        let a = reg.register_or_reuse("Data", vec![field("x", Primitive::Int, false)]).unwrap();
        let b = reg.register_or_reuse("Data", vec![field("y", Primitive::Int, false)]).unwrap();
        let c = reg.register_or_reuse("Data", vec![field("z", Primitive::Int, false)]).unwrap();
        assert_eq!(reg.get(a).name, "Data");
        assert_eq!(reg.get(b).name, "Data2");
        assert_eq!(reg.get(c).name, "Data3");
    }

    #[test]
    fn core_types_and_reserved_names_are_avoided() {
        let mut reg = ClassRegistry::new();
        reg.reserve_name("Root");
        let list = reg.register_or_reuse("List", vec![field("x", Primitive::Int, false)]).unwrap();
        let root = reg.register_or_reuse("Root", vec![field("y", Primitive::Int, false)]).unwrap();
        assert_eq!(reg.get(list).name, "List2");
        assert_eq!(reg.get(root).name, "Root2");
    }

    #[test]
    fn merge_forwards_and_rewrites_references() {
        let mut reg = ClassRegistry::new();
        let a = reg.register_or_reuse("Item", vec![field("x", Primitive::Int, false)]).unwrap();
        let b = reg.register_or_reuse("Item", vec![field("y", Primitive::Int, false)]).unwrap();
        let holder = reg.register_or_reuse("Holder", vec![class_field("item", b)]).unwrap();

        let survivor = reg.absorb(a, b);
        let merged = reg.replace_fields(survivor, vec![
            field("x", Primitive::Int, true),
            field("y", Primitive::Int, true),
        ]);
        assert_eq!(merged, a);
        assert_eq!(reg.resolve(b), a);
        assert_eq!(reg.len(), 2);
        assert_eq!(reg.get(holder).fields[0].ty, TypeDescriptor::Class(a));
        assert_eq!(reg.get(b).name, "Item");

        // the absorbed name is free again
        let c = reg.register_or_reuse("Item", vec![field("z", Primitive::Bool, false)]).unwrap();
        assert_eq!(reg.get(c).name, "Item2");
    }

    #[test]
    fn fold_duplicates_collapses_shapes_made_equal_by_merges() {
        let mut reg = ClassRegistry::new();
        let a = reg.register_or_reuse("A", vec![field("x", Primitive::Int, false)]).unwrap();
        let b = reg.register_or_reuse("B", vec![field("y", Primitive::Int, false)]).unwrap();
        let pa = reg.register_or_reuse("P", vec![class_field("c", a)]).unwrap();
        let pb = reg.register_or_reuse("Q", vec![class_field("c", b)]).unwrap();
        assert_ne!(pa, pb);

        let survivor = reg.absorb(a, b);
        reg.replace_fields(survivor, vec![field("x", Primitive::Int, true), field("y", Primitive::Int, true)]);
        reg.fold_duplicates();
        assert_eq!(reg.resolve(pa), reg.resolve(pb));
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn pinned_class_is_never_absorbed() {
        let mut reg = ClassRegistry::new();
        let early = reg.register_or_reuse("Early", vec![field("x", Primitive::Int, false)]).unwrap();
        let root = reg.register_pinned("Root", vec![field("x", Primitive::Int, false)]);
        reg.fold_duplicates();
        assert_eq!(reg.resolve(early), root);
        assert_eq!(reg.get(root).name, "Root");
    }

    #[test]
    fn survivor_takes_the_name_of_the_left_operand() {
        let mut reg = ClassRegistry::new();
        let child = reg.register_or_reuse("A", vec![field("v", Primitive::Int, false)]).unwrap();
        let element = reg.register_or_reuse("Q", vec![class_field("a", child)]).unwrap();

        let survivor = reg.absorb(element, child);
        assert_eq!(survivor, child);
        assert_eq!(reg.get(survivor).name, "Q");
        assert_eq!(reg.resolve(element), child);

        // `A` was released, `Q` is held by the survivor
        let other = reg.register_or_reuse("A", vec![field("u", Primitive::Bool, false)]).unwrap();
        assert_eq!(reg.get(other).name, "A");
        let again = reg.register_or_reuse("Q", vec![field("w", Primitive::Bool, false)]).unwrap();
        assert_eq!(reg.get(again).name, "Q2");
    }

    #[test]
    fn exhausted_name_suffixes_are_an_error() {
        let mut reg = ClassRegistry::new();
        reg.reserve_name("Data");
        for n in 2..=MAX_NAME_ATTEMPTS {
            reg.reserve_name(&format!("Data{n}"));
        }
        let err = reg.register_or_reuse("Data", vec![field("x", Primitive::Int, false)]).unwrap_err();
        match err {
            ConvertError::NameCollisionUnresolvable { base, attempts } => {
                assert_eq!(base, "Data");
                assert_eq!(attempts, MAX_NAME_ATTEMPTS);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(reg.is_empty());
    }
}
