/**
Diagnostics for the Mica checker

User-facing problems are `Diagnostic` values: a message, the offending
source range, an optional hint, a machine-readable kind, and secondary
notes ("previous definition is here", "`a` requires `b`" chains). The
checker accumulates them and keeps going; it never stops at the first
one.

The only fatal failures are violations of the host contract — an AST the
parser should never have produced, or an import that was not checked to
completion — represented by `CheckError`.
*/
use std::fmt;

use thiserror::Error;

use crate::ast::{NodeId, Span};
use crate::types::Type;

use super::symbols::Symbol;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// The diagnostic taxonomy, for consumers that dispatch on failure class
/// rather than message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagKind {
    Undefined,
    TypeMismatch,
    Arity,
    ArgMismatch,
    Redefinition,
    Recursive,
    NotAssignable,
    Unimplemented,
    Other,
}

/// A secondary remark attached to a diagnostic.
#[derive(Debug, Clone)]
pub struct Note {
    pub message: String,
    pub span: Option<Span>,
}

#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagKind,
    pub message: String,
    pub span: Span,
    pub hint: Option<String>,
    pub notes: Vec<Note>,
}

impl Diagnostic {
    pub fn error(kind: DiagKind, message: impl Into<String>, span: Span) -> Diagnostic {
        Diagnostic {
            severity: Severity::Error,
            kind,
            message: message.into(),
            span,
            hint: None,
            notes: Vec::new(),
        }
    }

    pub fn warning(kind: DiagKind, message: impl Into<String>, span: Span) -> Diagnostic {
        Diagnostic {
            severity: Severity::Warning,
            ..Diagnostic::error(kind, message, span)
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Diagnostic {
        self.hint = Some(hint.into());
        self
    }

    pub fn with_note(mut self, message: impl Into<String>, span: Option<Span>) -> Diagnostic {
        self.notes.push(Note {
            message: message.into(),
            span,
        });
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}: {}: {}", self.span, severity, self.message)?;
        if let Some(hint) = &self.hint {
            write!(f, " ({})", hint)?;
        }
        Ok(())
    }
}

pub(crate) fn undefined(name: &str, span: Span) -> Diagnostic {
    Diagnostic::error(
        DiagKind::Undefined,
        format!("identifier `{}` is undefined", name),
        span,
    )
}

pub(crate) fn undefined_type(name: &str, span: Span) -> Diagnostic {
    Diagnostic::error(
        DiagKind::Undefined,
        format!("type `{}` is undefined", name),
        span,
    )
}

pub(crate) fn already_defined(name: &str, span: Span, prev: Option<Span>) -> Diagnostic {
    Diagnostic::error(
        DiagKind::Redefinition,
        format!("name `{}` is already defined in this scope", name),
        span,
    )
    .with_note("previous definition is here", prev)
}

pub(crate) fn param_already_defined(name: &str, span: Span, prev: Option<Span>) -> Diagnostic {
    Diagnostic::error(
        DiagKind::Redefinition,
        format!("parameter `{}` is already defined", name),
        span,
    )
    .with_note("previous parameter was defined here", prev)
}

pub(crate) fn type_mismatch(expected: &Type, got: &Type, span: Span) -> Diagnostic {
    Diagnostic::error(DiagKind::TypeMismatch, "type mismatch", span)
        .with_hint(format!("expected `{}` here, not `{}`", expected, got))
}

pub(crate) fn arity_mismatch(expected: usize, got: usize, span: Span) -> Diagnostic {
    let title = if got < expected {
        "not enough arguments"
    } else {
        "too many arguments"
    };
    Diagnostic::error(DiagKind::Arity, title, span)
        .with_hint(format!("expected {} arguments, got {}", expected, got))
}

pub(crate) fn arg_mismatch(
    index: usize,
    expected: &Type,
    got: &Type,
    span: Span,
    variadic: bool,
) -> Diagnostic {
    let hint = if variadic {
        format!("expected `{}` for variadic argument, got `{}`", expected, got)
    } else {
        format!(
            "expected `{}` for {} argument, got `{}`",
            expected,
            ordinal(index + 1),
            got
        )
    };
    Diagnostic::error(DiagKind::ArgMismatch, "argument type mismatch", span).with_hint(hint)
}

pub(crate) fn not_assignable(span: Span) -> Diagnostic {
    Diagnostic::error(
        DiagKind::NotAssignable,
        "expression cannot be assigned to",
        span,
    )
}

pub(crate) fn unimplemented_feature(feature: &str, span: Span) -> Diagnostic {
    Diagnostic::error(
        DiagKind::Unimplemented,
        format!("{} are not implemented", feature),
        span,
    )
}

pub(crate) fn recursive_definition(span: Span, notes: Vec<Note>) -> Diagnostic {
    let mut diag = Diagnostic::error(DiagKind::Recursive, "recursive symbol definition", span);
    diag.notes = notes;
    diag
}

/// `1st`, `2nd`, `3rd`, `4th`, ... `11th`, `12th`, `13th`, `21st`, ...
pub fn ordinal(n: usize) -> String {
    let suffix = match n % 100 {
        11 | 12 | 13 => "th",
        _ => match n % 10 {
            1 => "st",
            2 => "nd",
            3 => "rd",
            _ => "th",
        },
    };
    format!("{}{}", n, suffix)
}

/// Fatal failures: the run cannot produce a meaningful module.
#[derive(Debug, Error)]
pub enum CheckError {
    /// The parser handed over a tree that violates its shape contract.
    #[error("ill-formed syntax tree: {0}")]
    IllFormedAst(String),

    /// An import was used before its own check completed.
    #[error("module `{0}` was used before it was completed")]
    IncompleteImport(String),
}

/// Checker-internal failure channel.
///
/// `Unresolved` is the deferral signal: the expression named a symbol
/// that exists but has no type yet. It is not a user diagnostic — the
/// declaration resolvers turn it into an entry on the deferred worklist.
#[derive(Debug)]
pub(crate) enum Fail {
    Diag(Box<Diagnostic>),
    Unresolved {
        symbol: Symbol,
        use_site: NodeId,
        span: Span,
    },
    Fatal(CheckError),
}

impl From<Diagnostic> for Fail {
    fn from(diag: Diagnostic) -> Fail {
        Fail::Diag(Box::new(diag))
    }
}

pub(crate) type CheckResult<T> = Result<T, Fail>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordinal_suffixes() {
        assert_eq!(ordinal(1), "1st");
        assert_eq!(ordinal(2), "2nd");
        assert_eq!(ordinal(3), "3rd");
        assert_eq!(ordinal(4), "4th");
        assert_eq!(ordinal(11), "11th");
        assert_eq!(ordinal(12), "12th");
        assert_eq!(ordinal(13), "13th");
        assert_eq!(ordinal(21), "21st");
        assert_eq!(ordinal(112), "112th");
    }

    #[test]
    fn test_diagnostic_rendering() {
        let diag = already_defined("x", Span::new(4, 5), Some(Span::new(0, 1)));
        assert_eq!(diag.kind, DiagKind::Redefinition);
        assert_eq!(diag.notes.len(), 1);
        assert!(diag.to_string().contains("already defined"));
    }
}
