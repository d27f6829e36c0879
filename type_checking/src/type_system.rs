use derive_more::Display;
use std::collections::HashSet;

/// A `ClassId` refers to a class declaration.
///
/// Having an instance of this struct ensures that the symbol table that
/// issued it can provide the descriptor of that class. Ids are dense
/// indices in declaration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
#[display(fmt = "class#{}", _0)]
pub struct ClassId(usize);

impl ClassId {
    pub fn new(index: usize) -> Self {
        ClassId(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

/// Read access to the inheritance relation between classes.
pub trait ClassHierarchy {
    fn superclass(&self, class: ClassId) -> Option<ClassId>;
    fn class_name(&self, class: ClassId) -> &str;
}

/// The MiniJava type lattice.
///
/// `Undefined` is the type of erroneous expressions. Every predicate accepts
/// it on either side so that one semantic error does not cascade into
/// further diagnostics for the surrounding expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
    Int,
    IntArray,
    Boolean,
    Class(ClassId),
    Undefined,
}

impl Type {
    pub fn is_builtin(self) -> bool {
        match self {
            Type::Int | Type::IntArray | Type::Boolean => true,
            Type::Class(_) | Type::Undefined => false,
        }
    }

    pub fn is_int(self) -> bool {
        self == Type::Int
    }

    pub fn is_int_array(self) -> bool {
        self == Type::IntArray
    }

    pub fn is_boolean(self) -> bool {
        self == Type::Boolean
    }

    pub fn is_class(self) -> bool {
        match self {
            Type::Class(_) => true,
            _ => false,
        }
    }

    pub fn is_undefined(self) -> bool {
        self == Type::Undefined
    }

    /// Values of reference type live on the heap.
    pub fn is_reference(self) -> bool {
        self.is_int_array() || self.is_class()
    }

    /// `self` may be stored into a location of type `other`.
    ///
    /// A class is assignable to itself and to each of its ancestors.
    pub fn is_assignable_to(self, other: Type, hierarchy: &dyn ClassHierarchy) -> bool {
        match (self, other) {
            (Type::Undefined, _) | (_, Type::Undefined) => true,
            (Type::Class(class), Type::Class(target)) => {
                is_subclass_of(class, target, hierarchy)
            }
            _ => self == other,
        }
    }

    pub fn is_equal_comparable_to(self, other: Type) -> bool {
        self.is_undefined() || other.is_undefined() || self == other
    }

    pub fn is_relational_comparable_to(self, other: Type) -> bool {
        both_int(self, other)
    }

    pub fn is_addable_to(self, other: Type) -> bool {
        both_int(self, other)
    }

    pub fn is_subtractable_from(self, other: Type) -> bool {
        both_int(self, other)
    }

    pub fn is_multipliable_with(self, other: Type) -> bool {
        both_int(self, other)
    }

    pub fn is_conjunctable_with(self, other: Type) -> bool {
        both_boolean(self, other)
    }

    pub fn is_disjunctable_with(self, other: Type) -> bool {
        both_boolean(self, other)
    }

    pub fn name(self, hierarchy: &dyn ClassHierarchy) -> String {
        match self {
            Type::Int => "int".to_string(),
            Type::IntArray => "int[]".to_string(),
            Type::Boolean => "boolean".to_string(),
            Type::Class(class) => hierarchy.class_name(class).to_string(),
            Type::Undefined => "<undefined>".to_string(),
        }
    }

    /// The JVM field descriptor, `None` for `Undefined`.
    pub fn descriptor(self, hierarchy: &dyn ClassHierarchy) -> Option<String> {
        match self {
            Type::Int => Some("I".to_string()),
            Type::IntArray => Some("[I".to_string()),
            Type::Boolean => Some("Z".to_string()),
            Type::Class(class) => Some(format!("L{};", hierarchy.class_name(class))),
            Type::Undefined => None,
        }
    }
}

fn both_int(a: Type, b: Type) -> bool {
    match (a, b) {
        (Type::Undefined, _) | (_, Type::Undefined) => true,
        (Type::Int, Type::Int) => true,
        _ => false,
    }
}

fn both_boolean(a: Type, b: Type) -> bool {
    match (a, b) {
        (Type::Undefined, _) | (_, Type::Undefined) => true,
        (Type::Boolean, Type::Boolean) => true,
        _ => false,
    }
}

fn is_subclass_of(class: ClassId, ancestor: ClassId, hierarchy: &dyn ClassHierarchy) -> bool {
    // a malformed hierarchy may contain cycles
    let mut seen = HashSet::new();
    let mut current = Some(class);
    while let Some(id) = current {
        if id == ancestor {
            return true;
        }
        if !seen.insert(id) {
            return false;
        }
        current = hierarchy.superclass(id);
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    /// `(name, superclass index)` per class.
    struct Hierarchy(Vec<(&'static str, Option<usize>)>);

    impl ClassHierarchy for Hierarchy {
        fn superclass(&self, class: ClassId) -> Option<ClassId> {
            self.0[class.index()].1.map(ClassId::new)
        }

        fn class_name(&self, class: ClassId) -> &str {
            self.0[class.index()].0
        }
    }

    fn animals() -> Hierarchy {
        Hierarchy(vec![("Animal", None), ("Dog", Some(0)), ("Puppy", Some(1))])
    }

    fn all_types() -> Vec<Type> {
        vec![
            Type::Int,
            Type::IntArray,
            Type::Boolean,
            Type::Class(ClassId::new(0)),
            Type::Class(ClassId::new(2)),
            Type::Undefined,
        ]
    }

    #[test]
    fn undefined_is_assignable_both_ways() {
        let h = animals();
        for ty in all_types() {
            assert!(Type::Undefined.is_assignable_to(ty, &h), "{:?}", ty);
            assert!(ty.is_assignable_to(Type::Undefined, &h), "{:?}", ty);
        }
    }

    #[test]
    fn undefined_absorbs_every_operation() {
        for ty in all_types() {
            assert!(Type::Undefined.is_addable_to(ty));
            assert!(ty.is_multipliable_with(Type::Undefined));
            assert!(ty.is_conjunctable_with(Type::Undefined));
            assert!(Type::Undefined.is_equal_comparable_to(ty));
        }
    }

    #[test]
    fn builtins_do_not_mix() {
        let h = animals();
        assert!(!Type::Int.is_assignable_to(Type::Boolean, &h));
        assert!(!Type::IntArray.is_assignable_to(Type::Int, &h));
        assert!(Type::IntArray.is_assignable_to(Type::IntArray, &h));
        assert!(Type::IntArray.is_equal_comparable_to(Type::IntArray));
        assert!(!Type::IntArray.is_addable_to(Type::IntArray));
    }

    #[test]
    fn arithmetic_only_on_ints() {
        assert!(Type::Int.is_addable_to(Type::Int));
        assert!(Type::Int.is_subtractable_from(Type::Int));
        assert!(Type::Int.is_relational_comparable_to(Type::Int));
        assert!(!Type::Boolean.is_addable_to(Type::Boolean));
        assert!(!Type::Boolean.is_relational_comparable_to(Type::Boolean));
        assert!(!Type::Int.is_addable_to(Type::Boolean));
    }

    #[test]
    fn logic_only_on_booleans() {
        assert!(Type::Boolean.is_conjunctable_with(Type::Boolean));
        assert!(Type::Boolean.is_disjunctable_with(Type::Boolean));
        assert!(!Type::Int.is_conjunctable_with(Type::Int));
    }

    #[test]
    fn classes_are_assignable_to_ancestors() {
        let h = animals();
        let animal = Type::Class(ClassId::new(0));
        let puppy = Type::Class(ClassId::new(2));
        assert!(puppy.is_assignable_to(animal, &h));
        assert!(puppy.is_assignable_to(puppy, &h));
        assert!(!animal.is_assignable_to(puppy, &h));
        assert!(!puppy.is_equal_comparable_to(animal));
    }

    #[test]
    fn cyclic_hierarchy_terminates() {
        let h = Hierarchy(vec![("A", Some(1)), ("B", Some(0)), ("C", None)]);
        let a = Type::Class(ClassId::new(0));
        let c = Type::Class(ClassId::new(2));
        assert!(!a.is_assignable_to(c, &h));
    }

    #[test]
    fn names_and_descriptors() {
        let h = animals();
        let dog = Type::Class(ClassId::new(1));
        assert_eq!("int[]", Type::IntArray.name(&h));
        assert_eq!("Dog", dog.name(&h));
        assert_eq!(Some("LDog;".to_string()), dog.descriptor(&h));
        assert_eq!(Some("Z".to_string()), Type::Boolean.descriptor(&h));
        assert_eq!(None, Type::Undefined.descriptor(&h));
    }

    #[test]
    fn classification() {
        assert!(Type::Int.is_builtin());
        assert!(!Type::Undefined.is_builtin());
        assert!(Type::IntArray.is_reference());
        assert!(Type::Class(ClassId::new(0)).is_reference());
        assert!(!Type::Boolean.is_reference());
    }
}
