/**
Expression typing for Mica

`type_of` computes (and memoizes, per node identity) the type of every
expression, optionally checking it against an expected type; constant
values ride along in the same table. Type expressions resolve through the
type namespace and produce the denoted type directly.
*/
use tracing::debug;

use crate::ast::{
    ArrayExpr, BlockExpr, CallExpr, Expr, FieldExpr, Ident, IndexExpr, LitKind, Stmt, TupleExpr,
    TypeExpr, WhileExpr,
};
use crate::constant::Value;
use crate::types::{self, Primitive, Type};

use super::environment::Env;
use super::errors::{self, CheckResult, DiagKind, Diagnostic, Fail};
use super::module::{Module, TypedValue};
use super::resolver::Checker;
use super::symbols::SymbolKind;
use std::rc::Rc;

impl<'a> Checker<'a> {
    /// Type of an expression. The result is memoized per node, so
    /// repeated queries for the same node are O(1). When an expected
    /// type is given the expression must be convertible into it.
    pub(super) fn type_of(&mut self, expr: &Expr, expected: Option<&Type>) -> CheckResult<Type> {
        let ty = match self.module.info.values.get(&expr.id()) {
            Some(found) => found.ty.clone(),
            None => {
                let (ty, value) = self.eval_expr(expr)?;
                self.module.info.values.insert(
                    expr.id(),
                    TypedValue {
                        ty: ty.clone(),
                        value,
                    },
                );
                ty
            }
        };

        if let Some(expected) = expected {
            if !self.convertible(&ty, expected) {
                return Err(errors::type_mismatch(expected, &ty, expr.span()).into());
            }
        }
        Ok(ty)
    }

    /// The constant value of an expression, when it has one.
    pub(super) fn value_of(&mut self, expr: &Expr) -> CheckResult<Option<Value>> {
        self.type_of(expr, None)?;
        Ok(self
            .module
            .info
            .values
            .get(&expr.id())
            .and_then(|found| found.value.clone()))
    }

    /// Whether a value of type `ty` may be used where `expected` is
    /// required: equal types, or an untyped constant that converts.
    pub(super) fn convertible(&self, ty: &Type, expected: &Type) -> bool {
        ty.equals(expected) || types::into_typed(ty, Some(expected)).is_some()
    }

    /// Type plus constant of an operand, for the operator evaluators.
    pub(super) fn check_operand(&mut self, expr: &Expr) -> CheckResult<(Type, Option<Value>)> {
        let ty = self.type_of(expr, None)?;
        let value = self
            .module
            .info
            .values
            .get(&expr.id())
            .and_then(|found| found.value.clone());
        Ok((ty, value))
    }

    fn eval_expr(&mut self, expr: &Expr) -> CheckResult<(Type, Option<Value>)> {
        match expr {
            Expr::Lit(lit) => Ok(match &lit.kind {
                LitKind::Bool(v) => (
                    Type::Primitive(Primitive::UntypedBool),
                    Some(Value::Bool(*v)),
                ),
                LitKind::Int(v) => (Type::Primitive(Primitive::UntypedInt), Some(Value::Int(*v))),
                LitKind::Float(v) => (
                    Type::Primitive(Primitive::UntypedFloat),
                    Some(Value::Float(*v)),
                ),
                LitKind::Str(v) => (
                    Type::Primitive(Primitive::UntypedString),
                    Some(Value::Str(v.as_str().into())),
                ),
            }),
            Expr::Name(ident) => self.eval_name(ident),
            Expr::Unary(e) => {
                let (ty, value) = self.check_operand(&e.operand)?;
                let result = self.prefix(e.op, &ty, e.span)?;
                let folded = value.and_then(|v| crate::constant::fold_unary(e.op, &v));
                Ok((result, folded))
            }
            Expr::Binary(e) => self.eval_binary(e),
            Expr::Call(e) => self.eval_call(e),
            Expr::Field(e) => self.eval_field(e),
            Expr::Index(e) => self.eval_index(e),
            Expr::Tuple(e) => self.eval_tuple(e),
            Expr::Array(e) => self.eval_array(e),
            Expr::Block(e) => self.eval_block(e),
            Expr::If(e) => {
                self.check_bool_cond(&e.cond)?;
                let then_ty = self.block_type(&e.then_body)?;
                match &e.else_body {
                    None => Ok((Type::unit(), None)),
                    Some(else_body) => {
                        let else_ty = self.type_of(else_body, None)?;
                        if !then_ty.equals(&else_ty)
                            && !types::skip_untyped(&then_ty).equals(&else_ty)
                        {
                            self.report(Diagnostic::error(
                                DiagKind::TypeMismatch,
                                format!(
                                    "all branches must have the type of the first branch (`{}`), got `{}`",
                                    then_ty, else_ty
                                ),
                                else_body.span(),
                            ));
                        }
                        Ok((then_ty, None))
                    }
                }
            }
            Expr::While(e) => self.eval_while(e),
        }
    }

    fn eval_name(&mut self, ident: &Ident) -> CheckResult<(Type, Option<Value>)> {
        if let Some((symbol, _)) = self.env.lookup(&ident.name) {
            if let SymbolKind::Module(_) = symbol.kind() {
                return Err(Diagnostic::error(
                    DiagKind::Other,
                    format!("module `{}` cannot be used as a value", ident.name),
                    ident.span,
                )
                .into());
            }
            return match symbol.ty() {
                Some(ty) => {
                    self.new_use(ident, &symbol);
                    Ok((ty, None))
                }
                None => Err(Fail::Unresolved {
                    symbol,
                    use_site: ident.id,
                    span: ident.span,
                }),
            };
        }

        // Types are first-class: a type name in expression position is a
        // typedesc value.
        if let Some((symbol, _)) = self.env.lookup_type(&ident.name) {
            return match symbol.ty() {
                Some(ty) => {
                    self.new_use(ident, &symbol);
                    Ok((ty, None))
                }
                None => Err(Fail::Unresolved {
                    symbol,
                    use_site: ident.id,
                    span: ident.span,
                }),
            };
        }

        Err(errors::undefined(&ident.name, ident.span).into())
    }

    fn eval_call(&mut self, e: &CallExpr) -> CheckResult<(Type, Option<Value>)> {
        let callee_ty = self.type_of(&e.callee, None)?;

        // A record-shaped custom type used as its own constructor.
        if let Some(desc) = callee_ty.as_typedesc() {
            if let Some(custom) = desc.base.as_custom() {
                if custom.variants.is_empty() && !custom.fields.is_empty() {
                    let params: Vec<Type> =
                        custom.fields.iter().map(|field| field.ty.clone()).collect();
                    self.check_args(&e.args, &params, None, e.span)?;
                    return Ok((desc.base.clone(), None));
                }
            }
            return Err(Diagnostic::error(
                DiagKind::Other,
                format!("type `{}` is not constructible", desc.base),
                e.callee.span(),
            )
            .into());
        }

        let Some(func) = callee_ty.as_func() else {
            return Err(Diagnostic::error(
                DiagKind::Other,
                format!(
                    "expression is not a function or a constructor: `{}`",
                    callee_ty
                ),
                e.callee.span(),
            )
            .into());
        };
        self.check_args(&e.args, &func.params, func.variadic.as_ref(), e.span)?;
        Ok((func.result.clone(), None))
    }

    /// Arity and per-position type agreement for a call. The diagnostic
    /// points at the first offending argument.
    fn check_args(
        &mut self,
        args: &[Expr],
        params: &[Type],
        variadic: Option<&Type>,
        call_span: crate::ast::Span,
    ) -> CheckResult<()> {
        if args.len() > params.len() && variadic.is_none() {
            let span = args.get(params.len()).map_or(call_span, Expr::span);
            return Err(errors::arity_mismatch(params.len(), args.len(), span).into());
        }
        if args.len() < params.len() {
            let span = args.last().map_or(call_span, Expr::span);
            return Err(errors::arity_mismatch(params.len(), args.len(), span).into());
        }

        for (i, arg) in args.iter().enumerate() {
            let ty = self.type_of(arg, None)?;
            let (expected, is_variadic) = match params.get(i) {
                Some(param) => (param, false),
                None => match variadic {
                    Some(tail) => (tail, true),
                    None => break,
                },
            };
            if !self.convertible(&ty, expected) {
                return Err(errors::arg_mismatch(i, expected, &ty, arg.span(), is_variadic).into());
            }
        }
        Ok(())
    }

    fn eval_field(&mut self, e: &FieldExpr) -> CheckResult<(Type, Option<Value>)> {
        // Module member access.
        if let Expr::Name(base) = e.operand.as_ref() {
            if let Some((symbol, _)) = self.env.lookup(&base.name) {
                if let Some(info) = symbol.as_module() {
                    let module = info.module.clone();
                    self.new_use(base, &symbol);
                    return self.module_member(&module, &e.name);
                }
            }
        }

        let operand_ty = self.type_of(&e.operand, None)?;

        if let Some(custom) = operand_ty.as_custom() {
            let Some(field_ty) = custom.field(&e.name.name).map(|field| field.ty.clone()) else {
                return Err(Diagnostic::error(
                    DiagKind::Undefined,
                    format!("type `{}` has no field `{}`", operand_ty, e.name.name),
                    e.name.span,
                )
                .into());
            };
            // Resolve the projection to the field's own symbol so the
            // use table covers it.
            if let Some((type_sym, _)) = self.env.lookup_type(&custom.name) {
                if let Some(info) = type_sym.as_type_def() {
                    if let Some(member) = info.local.lookup_local(&e.name.name) {
                        self.new_use(&e.name, &member);
                    }
                }
            }
            return Ok((field_ty, None));
        }

        if let Some(record) = operand_ty.as_record() {
            if let Some(field) = record.fields.iter().find(|f| f.name == e.name.name) {
                return Ok((field.ty.clone(), None));
            }
            return Err(Diagnostic::error(
                DiagKind::Undefined,
                format!("type `{}` has no field `{}`", operand_ty, e.name.name),
                e.name.span,
            )
            .into());
        }

        // Member access through the type name itself, e.g. a variant
        // constructor.
        if operand_ty.as_typedesc().is_some() {
            if let Expr::Name(base) = e.operand.as_ref() {
                if let Some(type_sym) = self.bound_symbol(base.id) {
                    if let Some(info) = type_sym.as_type_def() {
                        if let Some(member) = info.local.lookup_local(&e.name.name) {
                            return match member.ty() {
                                Some(ty) => {
                                    self.new_use(&e.name, &member);
                                    Ok((ty, None))
                                }
                                None => Err(Fail::Unresolved {
                                    symbol: member,
                                    use_site: e.name.id,
                                    span: e.name.span,
                                }),
                            };
                        }
                    }
                }
            }
            return Err(Diagnostic::error(
                DiagKind::Undefined,
                format!("type `{}` has no member `{}`", operand_ty, e.name.name),
                e.name.span,
            )
            .into());
        }

        Err(Diagnostic::error(
            DiagKind::Other,
            format!(
                "expected a module, record, or custom value, got `{}` instead",
                operand_ty
            ),
            e.operand.span(),
        )
        .into())
    }

    fn module_member(
        &mut self,
        module: &Rc<Module>,
        name: &Ident,
    ) -> CheckResult<(Type, Option<Value>)> {
        let member = module
            .env()
            .lookup_local(&name.name)
            .or_else(|| module.env().lookup_local_type(&name.name));
        let Some(member) = member else {
            return Err(Diagnostic::error(
                DiagKind::Undefined,
                format!(
                    "identifier `{}` is not defined in module `{}`",
                    name.name,
                    module.name()
                ),
                name.span,
            )
            .into());
        };
        match member.ty() {
            Some(ty) => {
                self.new_use(name, &member);
                Ok((ty, None))
            }
            None => Err(Diagnostic::error(
                DiagKind::Other,
                format!("identifier `{}` has no type", name.name),
                name.span,
            )
            .into()),
        }
    }

    fn eval_index(&mut self, e: &IndexExpr) -> CheckResult<(Type, Option<Value>)> {
        let operand_ty = self.type_of(&e.operand, None)?;
        if operand_ty.is_unit() {
            return Err(Diagnostic::error(
                DiagKind::Other,
                "expression has no value and cannot be indexed",
                e.operand.span(),
            )
            .into());
        }

        if let Some(array) = operand_ty.as_array() {
            let index_ty = self.type_of(&e.index, None)?;
            if !Type::Primitive(Primitive::I32).equals(&index_ty) {
                return Err(Diagnostic::error(
                    DiagKind::TypeMismatch,
                    format!("expected type `i32` for an index, got `{}`", index_ty),
                    e.index.span(),
                )
                .into());
            }
            return Ok((array.elem.clone(), None));
        }

        if let Some(tuple) = operand_ty.as_tuple() {
            let value = self.value_of(&e.index)?;
            let Some(index) = value.as_ref().and_then(Value::as_int) else {
                return Err(Diagnostic::error(
                    DiagKind::Other,
                    "expected a compile-time integer for a tuple index",
                    e.index.span(),
                )
                .into());
            };
            if index < 0 || index >= tuple.elems.len() as i128 {
                return Err(Diagnostic::error(
                    DiagKind::Other,
                    format!("index must be in range 0..{}", tuple.elems.len() - 1),
                    e.index.span(),
                )
                .into());
            }
            return Ok((tuple.elems[index as usize].clone(), None));
        }

        Err(Diagnostic::error(
            DiagKind::Other,
            format!("type `{}` cannot be indexed", operand_ty),
            e.operand.span(),
        )
        .into())
    }

    fn eval_tuple(&mut self, e: &TupleExpr) -> CheckResult<(Type, Option<Value>)> {
        if e.elems.is_empty() {
            return Ok((Type::unit(), None));
        }

        // A tuple is either all values or all types; the first element
        // decides which.
        let first = self.type_of(&e.elems[0], None)?;
        let is_desc = first.as_typedesc().is_some();
        let mut elems = vec![if is_desc {
            types::skip_typedesc(&first)
        } else {
            first
        }];

        for elem in &e.elems[1..] {
            let ty = self.type_of(elem, None)?;
            let elem_is_desc = ty.as_typedesc().is_some();
            match (is_desc, elem_is_desc) {
                (true, true) => elems.push(types::skip_typedesc(&ty)),
                (true, false) => {
                    return Err(Diagnostic::error(
                        DiagKind::TypeMismatch,
                        format!("expected type, got value of type `{}` instead", ty),
                        elem.span(),
                    )
                    .into());
                }
                (false, true) => {
                    return Err(Diagnostic::error(
                        DiagKind::TypeMismatch,
                        format!("expected expression, got type `{}` instead", ty),
                        elem.span(),
                    )
                    .into());
                }
                (false, false) => elems.push(ty),
            }
        }

        let tuple = Type::tuple(elems);
        if is_desc {
            Ok((Type::typedesc(tuple), None))
        } else {
            Ok((tuple, None))
        }
    }

    fn eval_array(&mut self, e: &ArrayExpr) -> CheckResult<(Type, Option<Value>)> {
        if e.elems.is_empty() {
            return Err(Diagnostic::error(
                DiagKind::Other,
                "cannot infer the element type of an empty array",
                e.span,
            )
            .into());
        }

        let first_ty = self.type_of(&e.elems[0], None)?;
        let elem_ty = types::skip_untyped(&first_ty);

        for elem in &e.elems[1..] {
            let ty = self.type_of(elem, None)?;
            if !elem_ty.equals(&ty) {
                return Err(Diagnostic::error(
                    DiagKind::TypeMismatch,
                    format!(
                        "expected type `{}` for this element, got `{}` instead",
                        elem_ty, ty
                    ),
                    elem.span(),
                )
                .with_note("because of this", Some(e.elems[0].span()))
                .into());
            }
        }

        Ok((Type::array(e.elems.len() as u64, elem_ty), None))
    }

    pub(super) fn eval_block(&mut self, block: &BlockExpr) -> CheckResult<(Type, Option<Value>)> {
        let saved = self.env.clone();
        self.env = Env::nested(&saved, "block");
        debug!("push {:?}", self.env);

        let mut last = Type::unit();
        for stmt in &block.stmts {
            let result = match stmt {
                Stmt::Let(decl) => self.local_binding(decl).map(|()| Type::unit()),
                Stmt::Expr(expr) => self.type_of(expr, None),
            };
            match result {
                Ok(ty) => last = ty,
                Err(Fail::Diag(diag)) => {
                    self.report(*diag);
                    last = Type::Unknown;
                }
                Err(other) => {
                    self.env = saved.clone();
                    return Err(other);
                }
            }
        }

        debug!("pop {:?}", self.env);
        self.env = saved;
        Ok((last, None))
    }

    /// Type of a block that is not in expression position (function
    /// bodies, if/while bodies); memoized like any expression.
    pub(super) fn block_type(&mut self, block: &BlockExpr) -> CheckResult<Type> {
        if let Some(found) = self.module.info.values.get(&block.id) {
            return Ok(found.ty.clone());
        }
        let (ty, value) = self.eval_block(block)?;
        self.module.info.values.insert(
            block.id,
            TypedValue {
                ty: ty.clone(),
                value,
            },
        );
        Ok(ty)
    }

    fn eval_while(&mut self, e: &WhileExpr) -> CheckResult<(Type, Option<Value>)> {
        self.check_bool_cond(&e.cond)?;
        let body_ty = self.block_type(&e.body)?;
        if !body_ty.is_unit() && !body_ty.is_unknown() {
            self.report(Diagnostic::error(
                DiagKind::TypeMismatch,
                format!("a while loop body must have no value, got `{}`", body_ty),
                e.body.span,
            ));
        }
        Ok((Type::unit(), None))
    }

    /// Checks a condition for `bool`; a mismatch is reported but does not
    /// stop the enclosing expression from being checked.
    fn check_bool_cond(&mut self, cond: &Expr) -> CheckResult<()> {
        match self.type_of(cond, None) {
            Ok(ty) => {
                if !Type::Primitive(Primitive::Bool).equals(&ty) {
                    self.report(Diagnostic::error(
                        DiagKind::TypeMismatch,
                        format!("expected type `bool` for a condition, got `{}`", ty),
                        cond.span(),
                    ));
                }
                Ok(())
            }
            Err(Fail::Diag(diag)) => {
                self.report(*diag);
                Ok(())
            }
            Err(other) => Err(other),
        }
    }

    /// Resolves a type expression to the type it denotes.
    pub(super) fn type_from_expr(&mut self, te: &TypeExpr) -> CheckResult<Type> {
        match te {
            TypeExpr::Name(ident) => {
                let Some((symbol, _)) = self.env.lookup_type(&ident.name) else {
                    return Err(errors::undefined_type(&ident.name, ident.span).into());
                };
                match symbol.ty() {
                    Some(ty) => {
                        self.new_use(ident, &symbol);
                        Ok(types::skip_typedesc(&ty))
                    }
                    None => Err(Fail::Unresolved {
                        symbol,
                        use_site: ident.id,
                        span: ident.span,
                    }),
                }
            }
            TypeExpr::Tuple(t) => {
                let mut elems = Vec::with_capacity(t.elems.len());
                for elem in &t.elems {
                    elems.push(self.type_from_expr(elem)?);
                }
                Ok(Type::tuple(elems))
            }
            TypeExpr::Array(t) => {
                let value = self.value_of(&t.size)?;
                let Some(size) = value.as_ref().and_then(Value::as_int) else {
                    return Err(Diagnostic::error(
                        DiagKind::Other,
                        "array size must be a compile-time integer",
                        t.size.span(),
                    )
                    .into());
                };
                if size < 0 {
                    return Err(Diagnostic::error(
                        DiagKind::Other,
                        "array size must not be negative",
                        t.size.span(),
                    )
                    .into());
                }
                let elem = self.type_from_expr(&t.elem)?;
                Ok(Type::array(size as u64, elem))
            }
            TypeExpr::Func(t) => {
                let mut params = Vec::with_capacity(t.params.len());
                for param in &t.params {
                    params.push(self.type_from_expr(param)?);
                }
                let variadic = match &t.variadic {
                    Some(tail) => Some(self.type_from_expr(tail)?),
                    None => None,
                };
                let result = match &t.result {
                    Some(result) => self.type_from_expr(result)?,
                    None => Type::unit(),
                };
                Ok(Type::func(params, result, variadic))
            }
            TypeExpr::Ref(t) => {
                let base = self.type_from_expr(&t.base)?;
                if base.is_untyped() || base.as_typedesc().is_some() {
                    return Err(Diagnostic::error(
                        DiagKind::Other,
                        format!("a reference cannot wrap `{}`", base),
                        t.base.span(),
                    )
                    .into());
                }
                Ok(Type::reference(base))
            }
            TypeExpr::Record(t) => {
                let mut fields: Vec<types::Field> = Vec::with_capacity(t.fields.len());
                for field in &t.fields {
                    if fields.iter().any(|f| f.name == field.name.name) {
                        return Err(Diagnostic::error(
                            DiagKind::Redefinition,
                            format!("duplicate field `{}`", field.name.name),
                            field.name.span,
                        )
                        .into());
                    }
                    let ty = self.type_from_expr(&field.ty)?;
                    fields.push(types::Field {
                        name: field.name.name.clone(),
                        ty,
                    });
                }
                Ok(Type::record(fields))
            }
        }
    }
}
