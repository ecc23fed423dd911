/**
Symbol table entities for Mica

A symbol is the checker's record of one declared name: bindings
(variables, parameters, fields, variant constructors), type definitions,
modules, and built-ins. Symbols are shared by reference; identity
(`Symbol::same`) is pointer identity, which is also what cycle detection
walks over.

The type slot is write-once: resolving an already-typed symbol is a no-op
by construction.
*/
use std::cell::OnceCell;
use std::fmt;
use std::rc::Rc;

use tracing::debug;

use crate::ast::{NodeId, Span};
use crate::types::Type;

use super::environment::{Env, WeakEnv};
use super::module::Module;

#[derive(Clone)]
pub struct Symbol {
    data: Rc<SymbolData>,
}

struct SymbolData {
    name: String,
    /// The declaration node that introduced the symbol, if any.
    decl: Option<NodeId>,
    /// The declaring identifier occurrence, if any.
    ident: Option<NodeId>,
    /// Source range of the declaring identifier, for diagnostics.
    span: Span,
    owner: Option<WeakEnv>,
    kind: SymbolKind,
    ty: OnceCell<Type>,
}

#[derive(Debug)]
pub enum SymbolKind {
    Binding(BindingInfo),
    TypeDef(TypeDefInfo),
    Module(ModuleInfo),
    BuiltIn,
}

/// Flags of a value binding.
#[derive(Debug, Clone, Default)]
pub struct BindingInfo {
    pub is_mut: bool,
    pub is_param: bool,
    pub is_field: bool,
    pub is_global: bool,
    pub is_variant_constructor: bool,
    pub is_extern: bool,
    /// The externally visible name of an extern binding.
    pub extern_name: Option<String>,
    /// The label of a labelled parameter or field.
    pub label: Option<String>,
}

/// A declared type name: its type slot holds the `TypeDesc` of an
/// `Alias`, and `local` is the nested environment of the type's members.
#[derive(Debug)]
pub struct TypeDefInfo {
    pub local: Env,
}

pub struct ModuleInfo {
    pub module: Rc<Module>,
}

impl fmt::Debug for ModuleInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ModuleInfo(\"{}\")", self.module.name())
    }
}

impl Symbol {
    pub fn binding(
        name: impl Into<String>,
        owner: &Env,
        decl: Option<NodeId>,
        ident: Option<NodeId>,
        span: Span,
        info: BindingInfo,
    ) -> Symbol {
        Symbol::new(
            name,
            Some(owner),
            decl,
            ident,
            span,
            SymbolKind::Binding(info),
            None,
        )
    }

    pub fn type_def(
        name: impl Into<String>,
        owner: &Env,
        decl: Option<NodeId>,
        ident: Option<NodeId>,
        span: Span,
        local: Env,
    ) -> Symbol {
        Symbol::new(
            name,
            Some(owner),
            decl,
            ident,
            span,
            SymbolKind::TypeDef(TypeDefInfo { local }),
            None,
        )
    }

    /// A module made visible inside another module's scope.
    pub fn module(module: Rc<Module>) -> Symbol {
        Symbol::new(
            module.name().to_string(),
            None,
            None,
            None,
            Span::unknown(),
            SymbolKind::Module(ModuleInfo { module }),
            None,
        )
    }

    /// A built-in value symbol, typed at construction.
    pub fn built_in(name: impl Into<String>, ty: Type) -> Symbol {
        Symbol::new(
            name,
            None,
            None,
            None,
            Span::unknown(),
            SymbolKind::BuiltIn,
            Some(ty),
        )
    }

    /// A built-in type definition, typed at construction. `ty` is the
    /// alias the name stands for; the symbol's type is its typedesc.
    pub fn built_in_type(name: impl Into<String>, owner: &Env, ty: Type, local: Env) -> Symbol {
        Symbol::new(
            name,
            Some(owner),
            None,
            None,
            Span::unknown(),
            SymbolKind::TypeDef(TypeDefInfo { local }),
            Some(Type::typedesc(ty)),
        )
    }

    fn new(
        name: impl Into<String>,
        owner: Option<&Env>,
        decl: Option<NodeId>,
        ident: Option<NodeId>,
        span: Span,
        kind: SymbolKind,
        ty: Option<Type>,
    ) -> Symbol {
        let cell = OnceCell::new();
        if let Some(ty) = ty {
            let _ = cell.set(ty);
        }
        Symbol {
            data: Rc::new(SymbolData {
                name: name.into(),
                decl,
                ident,
                span,
                owner: owner.map(Env::downgrade),
                kind,
                ty: cell,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.data.name
    }

    pub fn decl(&self) -> Option<NodeId> {
        self.data.decl
    }

    pub fn ident(&self) -> Option<NodeId> {
        self.data.ident
    }

    pub fn span(&self) -> Span {
        self.data.span
    }

    /// The environment the symbol was defined in.
    pub fn owner(&self) -> Option<Env> {
        self.data.owner.as_ref().and_then(WeakEnv::upgrade)
    }

    pub fn kind(&self) -> &SymbolKind {
        &self.data.kind
    }

    pub fn as_binding(&self) -> Option<&BindingInfo> {
        match &self.data.kind {
            SymbolKind::Binding(info) => Some(info),
            _ => None,
        }
    }

    pub fn as_type_def(&self) -> Option<&TypeDefInfo> {
        match &self.data.kind {
            SymbolKind::TypeDef(info) => Some(info),
            _ => None,
        }
    }

    pub fn as_module(&self) -> Option<&ModuleInfo> {
        match &self.data.kind {
            SymbolKind::Module(info) => Some(info),
            _ => None,
        }
    }

    pub fn ty(&self) -> Option<Type> {
        self.data.ty.get().cloned()
    }

    /// Sets the symbol's type. The slot is write-once; the resolver only
    /// calls this for a symbol it has just resolved.
    pub fn set_ty(&self, ty: Type) {
        debug!("set `{}` type `{}`", self.data.name, ty);
        let _ = self.data.ty.set(ty);
    }

    /// Identity comparison; this is what "the same symbol" means
    /// throughout the checker.
    pub fn same(a: &Symbol, b: &Symbol) -> bool {
        Rc::ptr_eq(&a.data, &b.data)
    }

    /// A hashable stand-in for the symbol's identity.
    pub fn key(&self) -> usize {
        Rc::as_ptr(&self.data) as usize
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.data.kind {
            SymbolKind::Binding(_) => "binding",
            SymbolKind::TypeDef(_) => "type",
            SymbolKind::Module(_) => "module",
            SymbolKind::BuiltIn => "built-in",
        };
        write!(f, "Symbol({} `{}`)", kind, self.data.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Primitive;

    #[test]
    fn test_type_slot_is_write_once() {
        let sym = Symbol::built_in("answer", Type::Primitive(Primitive::I32));
        assert!(sym.ty().unwrap().equals(&Type::Primitive(Primitive::I32)));

        // A second set is ignored; the first type stays.
        sym.set_ty(Type::Primitive(Primitive::Bool));
        assert!(sym.ty().unwrap().equals(&Type::Primitive(Primitive::I32)));
    }

    #[test]
    fn test_identity() {
        let env = Env::root("test");
        let a = Symbol::binding("x", &env, None, None, Span::unknown(), BindingInfo::default());
        let b = Symbol::binding("x", &env, None, None, Span::unknown(), BindingInfo::default());

        assert!(Symbol::same(&a, &a));
        assert!(Symbol::same(&a, &a.clone()));
        assert!(!Symbol::same(&a, &b));
        assert_ne!(a.key(), b.key());
    }
}
