/**
The checker driver for Mica

One module is checked by one `Checker` in four stages:

1. declare: a single top-down walk of the module's declarations that
   creates and defines every module-level symbol, untyped, and executes
   `use` merges against the completed imports;
2. resolve: each symbol's type is computed in declaration order. An
   expression that names a symbol with no type yet raises the internal
   unresolved signal instead of an error, and the blocked declaration is
   pushed onto the deferred worklist;
3. deferred: the worklist is drained, following each entry's blocking
   chain by symbol identity. A chain that returns to its origin is a
   cycle, reported once with the full "`a` requires `b`" chain; a chain
   that ends in a resolvable symbol resolves the dependency first and
   retries;
4. the module is marked completed and returned with all diagnostics.
*/
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use tracing::debug;

use crate::ast::{Decl, Ident, ModuleAst, NodeId, Span, UseDecl};

use super::environment::{CoreEnv, Env, UseConflict};
use super::errors::{self, CheckError, DiagKind, Diagnostic, Fail, Note};
use super::module::Module;
use super::symbols::{BindingInfo, Symbol};

/// A symbol whose type computation is postponed because it depends on
/// another symbol that is not yet typed.
#[derive(Debug, Clone)]
struct Deferred {
    symbol: Symbol,
    /// The symbol it is blocked on.
    requires: Symbol,
    /// The identifier occurrence that caused the block.
    use_site: NodeId,
    span: Span,
}

pub struct Checker<'a> {
    ast: &'a ModuleAst,
    pub(super) env: Env,
    pub(super) module: Module,
    diagnostics: Vec<Diagnostic>,
    decl_nodes: HashMap<NodeId, &'a Decl>,
    /// Module-level symbols in declaration order.
    order: Vec<Symbol>,
    deferred: Vec<Deferred>,
    /// Symbols whose resolution already produced a diagnostic.
    erred: HashSet<usize>,
    /// Symbols that are part of an already-reported cycle.
    in_cycle: HashSet<usize>,
    /// Deduplication for diagnostics, since a retried declaration may
    /// re-report the same problem.
    seen: HashSet<(DiagKind, Span, String)>,
}

impl<'a> Checker<'a> {
    pub fn new(core: &CoreEnv, ast: &'a ModuleAst) -> Checker<'a> {
        let env = Env::nested(core.env(), format!("module {}", ast.name));
        let module = Module::new(ast.name.clone(), env.clone(), Vec::new());
        Checker {
            ast,
            env,
            module,
            diagnostics: Vec::new(),
            decl_nodes: HashMap::new(),
            order: Vec::new(),
            deferred: Vec::new(),
            erred: HashSet::new(),
            in_cycle: HashSet::new(),
            seen: HashSet::new(),
        }
    }

    /// Records a diagnostic, once per (kind, location, message).
    pub(super) fn report(&mut self, diag: Diagnostic) {
        let key = (diag.kind, diag.span, diag.message.clone());
        if self.seen.insert(key) {
            self.diagnostics.push(diag);
        }
    }

    /// Makes a completed module visible to the one being checked: its
    /// name becomes a module symbol, and `use` declarations may merge
    /// its value symbols.
    pub fn add_import(&mut self, import: Rc<Module>) {
        if let Some(prev) = self.env.define(Symbol::module(import.clone())) {
            self.report(errors::already_defined(
                import.name(),
                Span::unknown(),
                prev_span(&prev),
            ));
            return;
        }
        self.module.add_import(import);
    }

    pub fn check(mut self) -> Result<(Module, Vec<Diagnostic>), CheckError> {
        debug!("checking module `{}`", self.ast.name);

        let ast = self.ast;
        for decl in &ast.decls {
            self.declare(decl)?;
        }

        debug!("resolve symbol types");
        for symbol in self.order.clone() {
            self.resolve_symbol(&symbol)?;
        }

        debug!("resolve deferred symbol types");
        let mut i = 0;
        while i < self.deferred.len() {
            let entry = self.deferred[i].clone();
            i += 1;
            self.resolve_deferred(&entry)?;
        }

        self.module.complete();
        Ok((self.module, self.diagnostics))
    }

    fn declare(&mut self, decl: &'a Decl) -> Result<(), CheckError> {
        match decl {
            Decl::Let(d) => {
                let info = BindingInfo {
                    is_mut: d.is_mut,
                    is_global: true,
                    is_extern: d.extern_name.is_some(),
                    extern_name: d.extern_name.clone(),
                    ..BindingInfo::default()
                };
                let symbol = Symbol::binding(
                    &d.name.name,
                    &self.env,
                    Some(d.id),
                    Some(d.name.id),
                    d.name.span,
                    info,
                );
                self.declare_value(decl, &d.name, symbol);
            }
            Decl::Func(d) => {
                let info = BindingInfo {
                    is_global: true,
                    is_extern: d.extern_name.is_some(),
                    extern_name: d.extern_name.clone(),
                    ..BindingInfo::default()
                };
                let symbol = Symbol::binding(
                    &d.name.name,
                    &self.env,
                    Some(d.id),
                    Some(d.name.id),
                    d.name.span,
                    info,
                );
                self.declare_value(decl, &d.name, symbol);
            }
            Decl::Type(d) => {
                let local = Env::nested(&self.env, format!("type {}", d.name.name));
                let symbol = Symbol::type_def(
                    &d.name.name,
                    &self.env,
                    Some(d.id),
                    Some(d.name.id),
                    d.name.span,
                    local,
                );
                if let Some(prev) = self.env.define_type(symbol.clone()) {
                    self.report(errors::already_defined(
                        &d.name.name,
                        d.name.span,
                        prev_span(&prev),
                    ));
                    return Ok(());
                }
                self.new_def(&d.name, &symbol);
                self.decl_nodes.insert(d.id, decl);
                self.order.push(symbol);
            }
            Decl::Use(d) => self.resolve_use(d)?,
        }
        Ok(())
    }

    fn declare_value(&mut self, decl: &'a Decl, ident: &Ident, symbol: Symbol) {
        if let Some(prev) = self.env.define(symbol.clone()) {
            self.report(errors::already_defined(
                &ident.name,
                ident.span,
                prev_span(&prev),
            ));
            return;
        }
        self.new_def(ident, &symbol);
        self.decl_nodes.insert(decl.id(), decl);
        self.order.push(symbol);
    }

    fn resolve_use(&mut self, d: &UseDecl) -> Result<(), CheckError> {
        let Some(import) = self
            .module
            .imports()
            .iter()
            .find(|m| m.name() == d.module.name)
            .cloned()
        else {
            self.report(Diagnostic::error(
                DiagKind::Undefined,
                format!("module `{}` is not imported", d.module.name),
                d.module.span,
            ));
            return Ok(());
        };
        if !import.completed() {
            return Err(CheckError::IncompleteImport(import.name().to_string()));
        }

        let names: Option<Vec<String>> = d
            .names
            .as_ref()
            .map(|names| names.iter().map(|ident| ident.name.clone()).collect());
        for conflict in self.env.use_symbols(import.env(), names.as_deref()) {
            match conflict {
                UseConflict::Defined { name, prev } => {
                    let span = name_span(d, &name);
                    self.report(errors::already_defined(&name, span, prev_span(&prev)));
                }
                UseConflict::Missing { name } => {
                    let span = name_span(d, &name);
                    self.report(Diagnostic::error(
                        DiagKind::Undefined,
                        format!("module `{}` has no symbol `{}`", import.name(), name),
                        span,
                    ));
                }
            }
        }
        Ok(())
    }

    /// Computes the type of a module-level symbol. Idempotent: a typed
    /// symbol (or one whose resolution already failed) is a no-op.
    fn resolve_symbol(&mut self, symbol: &Symbol) -> Result<(), CheckError> {
        if symbol.ty().is_some() || self.blocked(symbol) {
            return Ok(());
        }
        self.run_declaration(symbol)
    }

    /// Runs a symbol's declaration resolver. Used both for the first
    /// resolution and for deferred retries, where the symbol may already
    /// be typed (a function with a declared result type is typed before
    /// its body has been fully checked) and the point of the re-run is
    /// to finish checking the declaration.
    fn run_declaration(&mut self, symbol: &Symbol) -> Result<(), CheckError> {
        let Some(decl_id) = symbol.decl() else {
            return Ok(());
        };
        let Some(decl) = self.decl_nodes.get(&decl_id).copied() else {
            return Ok(());
        };

        let result = match decl {
            Decl::Let(d) => self.resolve_binding(symbol, d),
            Decl::Func(d) => self.resolve_func(symbol, d),
            Decl::Type(d) => self.resolve_type_decl(symbol, d),
            Decl::Use(_) => Ok(()),
        };

        match result {
            Ok(()) => Ok(()),
            Err(Fail::Diag(diag)) => {
                self.report(*diag);
                self.erred.insert(symbol.key());
                Ok(())
            }
            Err(Fail::Unresolved {
                symbol: requires,
                use_site,
                span,
            }) => {
                debug!(
                    "defer `{}` for `{}` at {}",
                    symbol.name(),
                    requires.name(),
                    use_site
                );
                self.deferred.push(Deferred {
                    symbol: symbol.clone(),
                    requires,
                    use_site,
                    span,
                });
                Ok(())
            }
            Err(Fail::Fatal(err)) => Err(err),
        }
    }

    fn resolve_deferred(&mut self, entry: &Deferred) -> Result<(), CheckError> {
        if self.blocked(&entry.symbol) {
            return Ok(());
        }

        if entry.symbol.ty().is_none() {
            if let Some((notes, members)) = self.cycle_notes(entry) {
                for member in &members {
                    self.in_cycle.insert(member.key());
                }
                self.report(errors::recursive_definition(entry.symbol.span(), notes));
                return Ok(());
            }
        }

        // Not a cycle: resolve the blocking dependency first, following
        // its own deferral when it has one.
        if entry.requires.ty().is_none() && !self.blocked(&entry.requires) {
            match self.find_deferred(&entry.requires) {
                Some(next) => self.resolve_deferred(&next)?,
                None => self.resolve_symbol(&entry.requires)?,
            }
        }

        if entry.requires.ty().is_none() {
            // The dependency stayed unresolved; whatever stopped it has
            // already been reported.
            self.erred.insert(entry.symbol.key());
            return Ok(());
        }

        self.run_declaration(&entry.symbol)
    }

    /// Walks the blocking chain starting at `first`. Returns the chain
    /// notes and its members when the chain comes back to the origin (a
    /// cycle). An inner cycle that does not pass through the origin is
    /// left for its own worklist entry.
    fn cycle_notes(&self, first: &Deferred) -> Option<(Vec<Note>, Vec<Symbol>)> {
        let mut notes = Vec::new();
        let mut members = vec![first.symbol.clone()];
        let mut visited = HashSet::new();
        visited.insert(first.symbol.key());

        let mut current = first.clone();
        loop {
            if Symbol::same(&current.symbol, &current.requires) {
                notes.push(Note {
                    message: format!("`{}` requires itself", current.symbol.name()),
                    span: Some(current.span),
                });
                return Some((notes, members));
            }

            notes.push(Note {
                message: format!(
                    "`{}` requires `{}`",
                    current.symbol.name(),
                    current.requires.name()
                ),
                span: Some(current.span),
            });

            if Symbol::same(&current.requires, &first.symbol) {
                return Some((notes, members));
            }
            if !visited.insert(current.requires.key()) {
                return None;
            }
            members.push(current.requires.clone());

            match self.find_deferred(&current.requires) {
                Some(next) => current = next,
                None => return None,
            }
        }
    }

    fn find_deferred(&self, symbol: &Symbol) -> Option<Deferred> {
        self.deferred
            .iter()
            .find(|entry| Symbol::same(&entry.symbol, symbol))
            .cloned()
    }

    fn blocked(&self, symbol: &Symbol) -> bool {
        self.erred.contains(&symbol.key()) || self.in_cycle.contains(&symbol.key())
    }

    pub(super) fn new_def(&mut self, ident: &Ident, symbol: &Symbol) {
        debug!("def `{}`", ident.name);
        self.module.info.defs.insert(ident.id, symbol.clone());
    }

    pub(super) fn new_use(&mut self, ident: &Ident, symbol: &Symbol) {
        debug!("use of `{}` at {}", ident.name, ident.span);
        self.module.info.uses.insert(ident.id, symbol.clone());
    }

    /// The symbol an already-checked identifier occurrence refers to.
    pub(super) fn bound_symbol(&self, ident: NodeId) -> Option<Symbol> {
        self.module.info.symbol_of(ident)
    }
}

/// The location of a previous definition, when it has one (built-ins do
/// not).
pub(super) fn prev_span(symbol: &Symbol) -> Option<Span> {
    symbol.ident().map(|_| symbol.span())
}

fn name_span(d: &UseDecl, name: &str) -> Span {
    d.names
        .as_ref()
        .and_then(|names| names.iter().find(|ident| ident.name == name))
        .map(|ident| ident.span)
        .unwrap_or(d.span)
}
