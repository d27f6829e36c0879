mod type_system;

pub use self::type_system::{ClassHierarchy, ClassId, Type};
