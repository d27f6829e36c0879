use ast::Site;
use derive_more::Display;
use failure::Fail;
use frame::Access;
use std::collections::HashMap;
use type_checking::{ClassHierarchy, Type};
use utils::Counter;

/// Identifies a block within one enter/leave session of a method.
///
/// The counter restarts whenever the scope stack runs empty, so ids of
/// different sessions must never be compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[display(fmt = "block#{}", _0)]
pub struct BlockId(usize);

#[derive(Debug, Fail, PartialEq, Eq)]
pub enum ScopeError {
    #[fail(display = "local '{}' declared outside of any block", name)]
    NoOpenBlock { name: String },
    #[fail(display = "parameter '{}' declared while a block is open", name)]
    NotEmpty { name: String },
    #[fail(display = "left more blocks than were entered in method '{}'", method)]
    Underflow { method: String },
}

/// A parameter or local of a method.
#[derive(Debug, Clone)]
pub struct VariableDescriptor {
    pub name: String,
    pub ty: Type,
    pub site: Site,
    /// Declaration-order slot. Slot 0 is the receiver.
    pub index: usize,
    /// `None` for parameters.
    pub block: Option<BlockId>,
    /// Bound by the translator once the owning frame exists.
    pub access: Option<Access>,
}

#[derive(Debug)]
pub struct MethodDescriptor {
    pub name: String,
    /// `None` for `void`, which only the main method returns.
    pub return_ty: Option<Type>,
    pub site: Site,
    parameters: Vec<VariableDescriptor>,
    // same-named locals of sibling blocks share one entry
    locals: HashMap<String, Vec<VariableDescriptor>>,
    blocks: Vec<BlockId>,
    next_block: Counter,
    next_index: usize,
}

impl MethodDescriptor {
    pub fn new(name: &str, return_ty: Option<Type>, site: Site) -> Self {
        MethodDescriptor {
            name: name.to_string(),
            return_ty,
            site,
            parameters: Vec::new(),
            locals: HashMap::new(),
            blocks: Vec::new(),
            next_block: Counter::new(),
            next_index: 1,
        }
    }

    pub fn enter_block(&mut self) -> BlockId {
        let block = BlockId(self.next_block.next());
        self.blocks.push(block);
        block
    }

    pub fn leave_block(&mut self) -> Result<BlockId, ScopeError> {
        let block = self.blocks.pop().ok_or_else(|| ScopeError::Underflow {
            method: self.name.clone(),
        })?;
        if self.blocks.is_empty() {
            self.next_block.reset();
        }
        Ok(block)
    }

    pub fn current_block(&self) -> Option<BlockId> {
        self.blocks.last().cloned()
    }

    /// Number of open blocks.
    pub fn depth(&self) -> usize {
        self.blocks.len()
    }

    pub fn add_parameter(
        &mut self,
        name: &str,
        ty: Type,
        site: Site,
    ) -> Result<&VariableDescriptor, ScopeError> {
        if !self.blocks.is_empty() {
            return Err(ScopeError::NotEmpty {
                name: name.to_string(),
            });
        }
        let index = self.next_index();
        self.parameters.push(VariableDescriptor {
            name: name.to_string(),
            ty,
            site,
            index,
            block: None,
            access: None,
        });
        Ok(&self.parameters[self.parameters.len() - 1])
    }

    pub fn add_local(
        &mut self,
        name: &str,
        ty: Type,
        site: Site,
    ) -> Result<&VariableDescriptor, ScopeError> {
        let block = self.current_block().ok_or_else(|| ScopeError::NoOpenBlock {
            name: name.to_string(),
        })?;
        let index = self.next_index();
        let candidates = self.locals.entry(name.to_string()).or_insert_with(Vec::new);
        candidates.push(VariableDescriptor {
            name: name.to_string(),
            ty,
            site,
            index,
            block: Some(block),
            access: None,
        });
        Ok(&candidates[candidates.len() - 1])
    }

    /// The visible local named `name`, declared in the nearest enclosing
    /// open block.
    ///
    /// `None` does not mean no such local exists: it may belong to a block
    /// that is not open right now.
    pub fn lookup_local(&self, name: &str) -> Option<&VariableDescriptor> {
        let idx = self.visible_local(name)?;
        self.locals.get(name).map(|candidates| &candidates[idx])
    }

    pub fn lookup_local_mut(&mut self, name: &str) -> Option<&mut VariableDescriptor> {
        let idx = self.visible_local(name)?;
        self.locals
            .get_mut(name)
            .map(|candidates| &mut candidates[idx])
    }

    pub fn is_declared_in_current_block(&self, name: &str) -> bool {
        let current = self.current_block();
        current.is_some()
            && self
                .locals
                .get(name)
                .map_or(false, |candidates| {
                    candidates.iter().any(|var| var.block == current)
                })
    }

    pub fn lookup_parameter(&self, name: &str) -> Option<&VariableDescriptor> {
        self.parameters.iter().find(|param| param.name == name)
    }

    pub fn lookup_parameter_mut(&mut self, name: &str) -> Option<&mut VariableDescriptor> {
        self.parameters.iter_mut().find(|param| param.name == name)
    }

    pub fn parameters(&self) -> &[VariableDescriptor] {
        &self.parameters
    }

    pub fn parameters_mut(&mut self) -> &mut [VariableDescriptor] {
        &mut self.parameters
    }

    /// Parameters plus locals of all blocks.
    pub fn num_variables(&self) -> usize {
        self.parameters.len() + self.locals.values().map(Vec::len).sum::<usize>()
    }

    /// The JVM method descriptor, e.g. `(I[I)Z`. `None` if a type in the
    /// signature is undefined.
    pub fn descriptor(&self, hierarchy: &dyn ClassHierarchy) -> Option<String> {
        let params = self
            .parameters
            .iter()
            .map(|param| param.ty.descriptor(hierarchy))
            .collect::<Option<Vec<_>>>()?;
        let ret = match self.return_ty {
            Some(ty) => ty.descriptor(hierarchy)?,
            None => "V".to_string(),
        };
        Some(format!("({}){}", params.concat(), ret))
    }

    fn next_index(&mut self) -> usize {
        let index = self.next_index;
        self.next_index += 1;
        index
    }

    // Position among `self.locals[name]` of the candidate whose block is
    // open and deepest on the stack.
    fn visible_local(&self, name: &str) -> Option<usize> {
        let candidates = self.locals.get(name)?;
        candidates
            .iter()
            .enumerate()
            .filter_map(|(idx, var)| {
                let block = var.block?;
                let depth = self.blocks.iter().rposition(|open| *open == block)?;
                Some((depth, idx))
            })
            .max_by_key(|(depth, _)| *depth)
            .map(|(_, idx)| idx)
    }
}
