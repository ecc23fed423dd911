/**
Symbol environments for Mica

An environment is a node in the tree of lexical scopes. It owns two
independent, insertion-ordered namespaces (values and types), a list of
child environments, and a link to its parent (absent only at the root).

A name that is already defined locally is never silently overwritten:
`define` hands the previous symbol back and the caller reports the
conflict. Parent links are weak so the child lists do not keep the tree
alive in a cycle; the root is owned by the core environment or the module.
*/
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use tracing::debug;

use crate::types::{Primitive, Type};

use super::symbols::Symbol;

#[derive(Clone)]
pub struct Env {
    data: Rc<RefCell<EnvData>>,
}

struct EnvData {
    name: String,
    parent: Option<Weak<RefCell<EnvData>>>,
    children: Vec<Env>,
    symbols: IndexMap<String, Symbol>,
    types: IndexMap<String, Symbol>,
}

/// A non-owning handle to an environment, held by symbols to name their
/// defining scope without creating a reference cycle.
#[derive(Clone)]
pub struct WeakEnv {
    data: Weak<RefCell<EnvData>>,
}

impl WeakEnv {
    pub fn upgrade(&self) -> Option<Env> {
        self.data.upgrade().map(|data| Env { data })
    }
}

impl fmt::Debug for WeakEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WeakEnv(..)")
    }
}

/// A failure while merging another environment with `use_symbols`.
#[derive(Debug, Clone)]
pub enum UseConflict {
    /// The name is already defined here; the merge did not overwrite it.
    Defined { name: String, prev: Symbol },
    /// The requested name does not exist in the source environment.
    Missing { name: String },
}

impl Env {
    /// Creates a root environment (no parent).
    pub fn root(name: impl Into<String>) -> Env {
        Env {
            data: Rc::new(RefCell::new(EnvData {
                name: name.into(),
                parent: None,
                children: Vec::new(),
                symbols: IndexMap::new(),
                types: IndexMap::new(),
            })),
        }
    }

    /// Creates an environment nested under `parent` and registers it as a
    /// child. The name is used by the code generator and in debug logs:
    /// `module <name>`, `func <name>`, `type <name>`, `block`.
    pub fn nested(parent: &Env, name: impl Into<String>) -> Env {
        let env = Env {
            data: Rc::new(RefCell::new(EnvData {
                name: name.into(),
                parent: Some(Rc::downgrade(&parent.data)),
                children: Vec::new(),
                symbols: IndexMap::new(),
                types: IndexMap::new(),
            })),
        };
        parent.data.borrow_mut().children.push(env.clone());
        env
    }

    pub fn name(&self) -> String {
        self.data.borrow().name.clone()
    }

    pub fn parent(&self) -> Option<Env> {
        self.data
            .borrow()
            .parent
            .as_ref()
            .and_then(|weak| weak.upgrade())
            .map(|data| Env { data })
    }

    pub fn children(&self) -> Vec<Env> {
        self.data.borrow().children.clone()
    }

    pub(crate) fn downgrade(&self) -> WeakEnv {
        WeakEnv {
            data: Rc::downgrade(&self.data),
        }
    }

    pub fn same(a: &Env, b: &Env) -> bool {
        Rc::ptr_eq(&a.data, &b.data)
    }

    /// Defines a value symbol. If the name is already bound locally the
    /// existing symbol is returned unchanged and nothing is inserted.
    /// The discard name `_` is never defined.
    pub fn define(&self, symbol: Symbol) -> Option<Symbol> {
        if symbol.name() == "_" {
            return None;
        }
        let mut data = self.data.borrow_mut();
        if let Some(prev) = data.symbols.get(symbol.name()) {
            return Some(prev.clone());
        }
        debug!("defined `{}` in \"{}\"", symbol.name(), data.name);
        data.symbols.insert(symbol.name().to_string(), symbol);
        None
    }

    /// Defines a type symbol, with the same conflict rule as [`define`].
    ///
    /// [`define`]: Env::define
    pub fn define_type(&self, symbol: Symbol) -> Option<Symbol> {
        if symbol.name() == "_" {
            return None;
        }
        let mut data = self.data.borrow_mut();
        if let Some(prev) = data.types.get(symbol.name()) {
            return Some(prev.clone());
        }
        debug!("defined type `{}` in \"{}\"", symbol.name(), data.name);
        data.types.insert(symbol.name().to_string(), symbol);
        None
    }

    /// Looks a value name up through the scope chain; returns the symbol
    /// together with the environment that defines it.
    pub fn lookup(&self, name: &str) -> Option<(Symbol, Env)> {
        if let Some(symbol) = self.lookup_local(name) {
            return Some((symbol, self.clone()));
        }
        self.parent()?.lookup(name)
    }

    /// Looks a type name up through the scope chain.
    pub fn lookup_type(&self, name: &str) -> Option<(Symbol, Env)> {
        if let Some(symbol) = self.lookup_local_type(name) {
            return Some((symbol, self.clone()));
        }
        self.parent()?.lookup_type(name)
    }

    pub fn lookup_local(&self, name: &str) -> Option<Symbol> {
        self.data.borrow().symbols.get(name).cloned()
    }

    pub fn lookup_local_type(&self, name: &str) -> Option<Symbol> {
        self.data.borrow().types.get(name).cloned()
    }

    /// Merges value symbols of another (completed) environment into this
    /// one: all of them, or only the named ones. Collisions and missing
    /// names are reported, never silently hidden, and colliding names
    /// keep their existing binding.
    pub fn use_symbols(&self, other: &Env, names: Option<&[String]>) -> Vec<UseConflict> {
        if Rc::ptr_eq(&self.data, &other.data) {
            return Vec::new();
        }

        let mut conflicts = Vec::new();
        let picked: Vec<Symbol> = match names {
            None => other.data.borrow().symbols.values().cloned().collect(),
            Some(names) => {
                let mut picked = Vec::new();
                for name in names {
                    match other.lookup_local(name) {
                        Some(symbol) => picked.push(symbol),
                        None => conflicts.push(UseConflict::Missing { name: name.clone() }),
                    }
                }
                picked
            }
        };

        for symbol in picked {
            let mut data = self.data.borrow_mut();
            if let Some(prev) = data.symbols.get(symbol.name()) {
                conflicts.push(UseConflict::Defined {
                    name: symbol.name().to_string(),
                    prev: prev.clone(),
                });
                continue;
            }
            debug!("merged `{}` into \"{}\"", symbol.name(), data.name);
            data.symbols.insert(symbol.name().to_string(), symbol);
        }
        conflicts
    }
}

impl fmt::Debug for Env {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Env(\"{}\")", self.data.borrow().name)
    }
}

/// The shared root scope: built-in scalar types, the "no value" symbol,
/// and a few built-in functions. Constructed once by the host and chained
/// above every module's root environment; read-only afterwards.
pub struct CoreEnv {
    env: Env,
}

impl CoreEnv {
    pub fn new() -> CoreEnv {
        let env = Env::root("core");

        let scalars = [
            ("bool", Primitive::Bool),
            ("i32", Primitive::I32),
            ("u8", Primitive::U8),
            ("f32", Primitive::F32),
            ("string", Primitive::Str),
            ("pointer", Primitive::Pointer),
            ("any", Primitive::Any),
        ];
        for (name, prim) in scalars {
            let local = Env::nested(&env, format!("type {}", name));
            let alias = Type::alias(name, Type::Primitive(prim));
            env.define_type(Symbol::built_in_type(name, &env, alias, local));
        }

        let local = Env::nested(&env, "type unit");
        env.define_type(Symbol::built_in_type(
            "unit",
            &env,
            Type::alias("unit", Type::unit()),
            local,
        ));

        // The zero-argument "no value" symbol.
        env.define(Symbol::built_in("none", Type::unit()));

        env.define(Symbol::built_in(
            "print",
            Type::func(
                Vec::new(),
                Type::unit(),
                Some(Type::Primitive(Primitive::Any)),
            ),
        ));
        env.define(Symbol::built_in(
            "exit",
            Type::func(vec![Type::Primitive(Primitive::I32)], Type::unit(), None),
        ));

        CoreEnv { env }
    }

    pub fn env(&self) -> &Env {
        &self.env
    }
}

impl Default for CoreEnv {
    fn default() -> Self {
        Self::new()
    }
}
