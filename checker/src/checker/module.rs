/**
Checked-module output for Mica

`Module` is what one checker run produces and what the code generator and
diagnostics layer consume: the module's root environment, its imports,
and the `TypeInfo` tables keyed by AST node identity. Once `completed` is
set the module is read-only; a completed module can be merged into
another module's scope with `use`.
*/
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::ast::NodeId;
use crate::constant::Value;
use crate::types::Type;

use super::environment::Env;
use super::symbols::Symbol;

/// The resolved type of an expression plus its compile-time constant
/// value, when one is known.
#[derive(Debug, Clone)]
pub struct TypedValue {
    pub ty: Type,
    pub value: Option<Value>,
}

/// Per-module resolution results.
#[derive(Debug, Default)]
pub struct TypeInfo {
    /// Every definition in the module: declaring identifier → the symbol
    /// it introduces, in declaration order.
    pub defs: IndexMap<NodeId, Symbol>,

    /// Every identifier occurrence that is a reference, not a
    /// declaration, mapped to the symbol it resolves to.
    pub uses: HashMap<NodeId, Symbol>,

    /// Type (and constant value, when known) of every checked expression.
    pub values: HashMap<NodeId, TypedValue>,
}

impl TypeInfo {
    pub fn type_of(&self, node: NodeId) -> Option<Type> {
        self.values.get(&node).map(|tv| tv.ty.clone())
    }

    pub fn value_of(&self, node: NodeId) -> Option<&Value> {
        self.values.get(&node).and_then(|tv| tv.value.as_ref())
    }

    pub fn symbol_of(&self, ident: NodeId) -> Option<Symbol> {
        self.defs
            .get(&ident)
            .or_else(|| self.uses.get(&ident))
            .cloned()
    }
}

/// A checked module.
pub struct Module {
    name: String,
    env: Env,
    imports: Vec<Rc<Module>>,
    pub info: TypeInfo,
    completed: bool,
}

impl Module {
    pub(crate) fn new(name: impl Into<String>, env: Env, imports: Vec<Rc<Module>>) -> Module {
        Module {
            name: name.into(),
            env,
            imports,
            info: TypeInfo::default(),
            completed: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The module's root environment.
    pub fn env(&self) -> &Env {
        &self.env
    }

    pub fn imports(&self) -> &[Rc<Module>] {
        &self.imports
    }

    pub(crate) fn add_import(&mut self, import: Rc<Module>) {
        self.imports.push(import);
    }

    /// True once checking finished; gates reuse from other modules.
    pub fn completed(&self) -> bool {
        self.completed
    }

    pub(crate) fn complete(&mut self) {
        self.completed = true;
    }

    pub fn type_of(&self, node: NodeId) -> Option<Type> {
        self.info.type_of(node)
    }

    pub fn value_of(&self, node: NodeId) -> Option<&Value> {
        self.info.value_of(node)
    }

    pub fn symbol_of(&self, ident: NodeId) -> Option<Symbol> {
        self.info.symbol_of(ident)
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("name", &self.name)
            .field("completed", &self.completed)
            .field("defs", &self.info.defs.len())
            .finish()
    }
}
