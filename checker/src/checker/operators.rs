/**
Operator type checking for Mica

Binary and unary operators are checked against explicit tables of
`(operand types -> result)` rows over primitive kinds; an operand pair
with no row is a type error naming both operand types. Assignment (and
the compound assignment forms) produce no value: their result is unit and
the left side must be assignable.

When both operands are untyped the result stays untyped, which is what
keeps constant expressions like `2 + 3 * 4` foldable in further constant
contexts.
*/
use crate::ast::{BinaryExpr, BinaryOp, Expr, Span, UnaryOp};
use crate::constant::{self, Value};
use crate::types::{Primitive, Type};

use super::errors::{self, CheckResult, DiagKind, Diagnostic};
use super::resolver::Checker;

/// Rows of `(lhs, rhs) -> result` admitted for an infix operator.
fn infix_rows(op: BinaryOp) -> &'static [(Primitive, Primitive, Primitive)] {
    use Primitive::*;
    match op {
        BinaryOp::Add => &[
            (I32, I32, I32),
            (U8, U8, U8),
            (F32, F32, F32),
            (Str, Str, Str),
        ],
        BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => {
            &[(I32, I32, I32), (U8, U8, U8), (F32, F32, F32)]
        }
        BinaryOp::Rem
        | BinaryOp::BitAnd
        | BinaryOp::BitOr
        | BinaryOp::BitXor
        | BinaryOp::Shl
        | BinaryOp::Shr => &[(I32, I32, I32), (U8, U8, U8)],
        BinaryOp::Eq | BinaryOp::Ne => &[
            (I32, I32, Bool),
            (U8, U8, Bool),
            (F32, F32, Bool),
            (Bool, Bool, Bool),
            (Str, Str, Bool),
        ],
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => &[
            (I32, I32, Bool),
            (U8, U8, Bool),
            (F32, F32, Bool),
            (Str, Str, Bool),
        ],
        BinaryOp::And | BinaryOp::Or => &[(Bool, Bool, Bool)],
        // Assignment forms are handled before the table is consulted.
        BinaryOp::Assign
        | BinaryOp::AddAssign
        | BinaryOp::SubAssign
        | BinaryOp::MulAssign
        | BinaryOp::DivAssign
        | BinaryOp::RemAssign => &[],
    }
}

fn prefix_rows(op: UnaryOp) -> &'static [(Primitive, Primitive)] {
    use Primitive::*;
    match op {
        UnaryOp::Not => &[(Bool, Bool)],
        UnaryOp::Neg => &[(I32, I32), (F32, F32)],
    }
}

/// The untyped form of a table result, for operations over untyped
/// operands only.
fn untyped_result(p: Primitive) -> Type {
    let untyped = match p {
        Primitive::Bool => Primitive::UntypedBool,
        Primitive::I32 | Primitive::U8 => Primitive::UntypedInt,
        Primitive::F32 => Primitive::UntypedFloat,
        Primitive::Str => Primitive::UntypedString,
        other => other,
    };
    Type::Primitive(untyped)
}

impl<'a> Checker<'a> {
    pub(super) fn eval_binary(&mut self, e: &BinaryExpr) -> CheckResult<(Type, Option<Value>)> {
        let (lhs_ty, lhs_val) = self.check_operand(&e.lhs)?;
        let (rhs_ty, rhs_val) = self.check_operand(&e.rhs)?;

        if e.op == BinaryOp::Assign {
            self.check_assignable(&e.lhs);
            if !self.convertible(&rhs_ty, &lhs_ty) {
                self.report(errors::type_mismatch(&lhs_ty, &rhs_ty, e.rhs.span()));
            }
            return Ok((Type::unit(), None));
        }

        if let Some(base) = e.op.base() {
            // Compound assignment: the base operation's row must exist,
            // the target must be assignable, and there is no value.
            self.check_assignable(&e.lhs);
            self.infix_result(e.op, base, &lhs_ty, &rhs_ty, e.span)?;
            return Ok((Type::unit(), None));
        }

        let result = self.infix_result(e.op, e.op, &lhs_ty, &rhs_ty, e.span)?;
        let value = match (lhs_val, rhs_val) {
            (Some(x), Some(y)) if x.kind() == y.kind() => constant::fold_binary(e.op, &x, &y),
            _ => None,
        };
        Ok((result, value))
    }

    /// Looks the operand pair up in `table_op`'s rows; `shown_op` is the
    /// operator named in the diagnostic (they differ for compound
    /// assignments).
    fn infix_result(
        &mut self,
        shown_op: BinaryOp,
        table_op: BinaryOp,
        lhs: &Type,
        rhs: &Type,
        span: Span,
    ) -> CheckResult<Type> {
        for (x, y, result) in infix_rows(table_op) {
            if self.convertible(lhs, &Type::Primitive(*x))
                && self.convertible(rhs, &Type::Primitive(*y))
            {
                let ty = if lhs.is_untyped() && rhs.is_untyped() {
                    untyped_result(*result)
                } else {
                    Type::Primitive(*result)
                };
                return Ok(ty);
            }
        }

        Err(Diagnostic::error(
            DiagKind::TypeMismatch,
            format!(
                "type mismatch for operator `{}`, got `{}` and `{}`",
                shown_op, lhs, rhs
            ),
            span,
        )
        .into())
    }

    pub(super) fn prefix(&mut self, op: UnaryOp, operand: &Type, span: Span) -> CheckResult<Type> {
        for (x, result) in prefix_rows(op) {
            if self.convertible(operand, &Type::Primitive(*x)) {
                let ty = if operand.is_untyped() {
                    untyped_result(*result)
                } else {
                    Type::Primitive(*result)
                };
                return Ok(ty);
            }
        }

        Err(Diagnostic::error(
            DiagKind::TypeMismatch,
            format!("operator `{}` is not defined for `{}`", op, operand),
            span,
        )
        .into())
    }

    fn check_assignable(&mut self, target: &Expr) {
        if !self.assignable(target) {
            self.report(errors::not_assignable(target.span()));
        }
    }

    /// The assignability predicate: an identifier bound to a mutable
    /// binding, or a field/array-element projection of one. The target
    /// has already been checked, so its identifier resolution is in the
    /// use table.
    fn assignable(&self, target: &Expr) -> bool {
        match target {
            Expr::Name(ident) => match self.bound_symbol(ident.id) {
                Some(symbol) => symbol.as_binding().is_some_and(|info| info.is_mut),
                None => false,
            },
            Expr::Field(e) => self.assignable(&e.operand),
            Expr::Index(e) => self.assignable(&e.operand),
            _ => false,
        }
    }
}
