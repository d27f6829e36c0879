//! Classes, their members and the per-method scope tracker.
//!
//! The table is filled by [`SymbolTableBuilder`] before translation. The
//! translator re-enters the same blocks in the same order and only fills in
//! storage accesses.
mod builder;
mod method;

pub use self::{
    builder::SymbolTableBuilder,
    method::{BlockId, MethodDescriptor, ScopeError, VariableDescriptor},
};

use ast::Site;
use derive_more::Display;
use failure::Fail;
use std::collections::{hash_map::Entry, HashMap};
use type_checking::{ClassHierarchy, ClassId, Type};

#[derive(Debug, Fail, PartialEq, Eq)]
pub enum DeclarationError {
    #[fail(display = "class '{}' is already declared", name)]
    DuplicateClass { name: String },
    #[fail(display = "field '{}' is already declared", name)]
    DuplicateField { name: String },
    #[fail(display = "method '{}' is already declared", name)]
    DuplicateMethod { name: String },
}

/// Index of a method within its class, in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[display(fmt = "method#{}", _0)]
pub struct MethodId(usize);

#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    pub name: String,
    pub ty: Type,
    pub site: Site,
}

#[derive(Debug)]
pub struct ClassDescriptor {
    pub id: ClassId,
    pub name: String,
    pub site: Site,
    superclass: Option<ClassId>,
    fields: HashMap<String, FieldDescriptor>,
    methods: Vec<MethodDescriptor>,
    method_ids: HashMap<String, MethodId>,
}

impl ClassDescriptor {
    fn new(id: ClassId, name: &str, site: Site) -> Self {
        ClassDescriptor {
            id,
            name: name.to_string(),
            site,
            superclass: None,
            fields: HashMap::new(),
            methods: Vec::new(),
            method_ids: HashMap::new(),
        }
    }

    pub fn superclass(&self) -> Option<ClassId> {
        self.superclass
    }

    pub fn set_superclass(&mut self, superclass: Option<ClassId>) {
        self.superclass = superclass;
    }

    pub fn add_field(&mut self, name: &str, ty: Type, site: Site) -> Result<(), DeclarationError> {
        match self.fields.entry(name.to_string()) {
            Entry::Occupied(_) => Err(DeclarationError::DuplicateField {
                name: name.to_string(),
            }),
            Entry::Vacant(e) => {
                e.insert(FieldDescriptor {
                    name: name.to_string(),
                    ty,
                    site,
                });
                Ok(())
            }
        }
    }

    /// Only fields declared by this class, see
    /// [`SymbolTable::lookup_field`] for inherited ones.
    pub fn lookup_field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.get(name)
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.values()
    }

    pub fn add_method(&mut self, method: MethodDescriptor) -> Result<MethodId, DeclarationError> {
        let id = MethodId(self.methods.len());
        match self.method_ids.entry(method.name.clone()) {
            Entry::Occupied(_) => Err(DeclarationError::DuplicateMethod { name: method.name }),
            Entry::Vacant(e) => {
                e.insert(id);
                self.methods.push(method);
                Ok(id)
            }
        }
    }

    pub fn method_id(&self, name: &str) -> Option<MethodId> {
        self.method_ids.get(name).cloned()
    }

    pub fn lookup_method(&self, name: &str) -> Option<&MethodDescriptor> {
        self.method_id(name).map(|id| self.method(id))
    }

    pub fn method(&self, id: MethodId) -> &MethodDescriptor {
        &self.methods[id.0]
    }

    pub fn method_mut(&mut self, id: MethodId) -> &mut MethodDescriptor {
        &mut self.methods[id.0]
    }

    /// Methods in declaration order.
    pub fn methods(&self) -> impl Iterator<Item = (MethodId, &MethodDescriptor)> {
        self.methods
            .iter()
            .enumerate()
            .map(|(idx, method)| (MethodId(idx), method))
    }
}

#[derive(Debug, Default)]
pub struct SymbolTable {
    classes: Vec<ClassDescriptor>,
    by_name: HashMap<String, ClassId>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_class(&mut self, name: &str, site: Site) -> Result<ClassId, DeclarationError> {
        match self.by_name.entry(name.to_string()) {
            Entry::Occupied(_) => Err(DeclarationError::DuplicateClass {
                name: name.to_string(),
            }),
            Entry::Vacant(e) => {
                let id = ClassId::new(self.classes.len());
                e.insert(id);
                self.classes.push(ClassDescriptor::new(id, name, site));
                Ok(id)
            }
        }
    }

    pub fn lookup_class(&self, name: &str) -> Option<&ClassDescriptor> {
        self.by_name.get(name).map(|id| self.class(*id))
    }

    pub fn lookup_class_mut(&mut self, name: &str) -> Option<&mut ClassDescriptor> {
        match self.by_name.get(name) {
            Some(id) => Some(&mut self.classes[id.index()]),
            None => None,
        }
    }

    /// Ids always point to existing classes of the table that issued them.
    pub fn class(&self, id: ClassId) -> &ClassDescriptor {
        &self.classes[id.index()]
    }

    pub fn class_mut(&mut self, id: ClassId) -> &mut ClassDescriptor {
        &mut self.classes[id.index()]
    }

    /// Classes in declaration order.
    pub fn classes(&self) -> impl Iterator<Item = &ClassDescriptor> {
        self.classes.iter()
    }

    pub fn method_mut(&mut self, class: ClassId, method: MethodId) -> &mut MethodDescriptor {
        self.class_mut(class).method_mut(method)
    }

    /// The field `name` of `class` or of its nearest ancestor declaring it.
    pub fn lookup_field(&self, class: ClassId, name: &str) -> Option<&FieldDescriptor> {
        let mut current = Some(class);
        // bounded in case of cyclic inheritance
        for _ in 0..self.classes.len() {
            let class = self.class(current?);
            if let Some(field) = class.lookup_field(name) {
                return Some(field);
            }
            current = class.superclass();
        }
        None
    }
}

impl ClassHierarchy for SymbolTable {
    fn superclass(&self, class: ClassId) -> Option<ClassId> {
        self.class(class).superclass()
    }

    fn class_name(&self, class: ClassId) -> &str {
        &self.class(class).name
    }
}
