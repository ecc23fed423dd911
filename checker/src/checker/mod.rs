/**
Name and type resolution for Mica

This module implements the semantic core of the front end:
- the two-namespace symbol environment with "use" scope merging
- symbol entities and the per-module type-info output tables
- the resolver driver with deferred resolution of symbols whose type
  depends on a symbol not yet typed, including cycle detection
- table-driven operator checking with compile-time constant folding
- the declaration resolvers for bindings, function signatures, and
  record/variant type bodies
*/
mod decls;
mod exprs;
mod operators;
mod resolver;

pub mod environment;
pub mod errors;
pub mod module;
pub mod symbols;

pub use environment::{CoreEnv, Env, UseConflict};
pub use errors::{CheckError, DiagKind, Diagnostic, Note, Severity};
pub use module::{Module, TypeInfo, TypedValue};
pub use resolver::Checker;
pub use symbols::{BindingInfo, Symbol, SymbolKind};
