/// Mica - a small statically-typed, expression-oriented language
///
/// This crate implements the semantic core of the Mica compiler front
/// end, including:
/// - Abstract syntax tree (AST) input contract
/// - Type representation and equivalence rules
/// - Hierarchical two-namespace symbol environments
/// - The resolver, with deferred resolution of mutually dependent
///   symbols and cycle detection
/// - Operator type checking and compile-time constant folding
///
/// The lexer, parser, and C code generator are separate components that
/// produce the AST this crate consumes and consume the `Module` it
/// produces.
pub mod ast;
pub mod checker;
pub mod constant;
pub mod types;

pub use checker::{CheckError, Checker, CoreEnv, DiagKind, Diagnostic, Module};
pub use types::{Primitive, Type};
