/**
Declaration resolvers for Mica

Bindings, function signatures, and record/variant type bodies. Each
resolver computes its symbol's type and reports what it can locally; the
unresolved signal is the one thing it lets escape, so the driver can park
the declaration on the deferred worklist.
*/
use crate::ast::{FuncDecl, LetDecl, Member, TypeDecl, TypeDeclBody};
use crate::types::{self, Type};

use super::environment::Env;
use super::errors::{self, CheckError, CheckResult, DiagKind, Diagnostic, Fail, Note};
use super::resolver::{prev_span, Checker};
use super::symbols::{BindingInfo, Symbol};

impl<'a> Checker<'a> {
    /// Resolves a module-level `let`. The symbol was created and defined
    /// by the declare pass.
    pub(super) fn resolve_binding(&mut self, symbol: &Symbol, decl: &'a LetDecl) -> CheckResult<()> {
        let ty = self.binding_type(decl)?;
        symbol.set_ty(ty);
        Ok(())
    }

    /// A block-level `let`: same typing matrix, but the symbol is created
    /// here and defined into the block scope only after its type
    /// resolved, so the initializer cannot see the name it defines.
    pub(super) fn local_binding(&mut self, decl: &LetDecl) -> CheckResult<()> {
        let ty = self.binding_type(decl)?;

        let info = BindingInfo {
            is_mut: decl.is_mut,
            is_extern: decl.extern_name.is_some(),
            extern_name: decl.extern_name.clone(),
            ..BindingInfo::default()
        };
        let symbol = Symbol::binding(
            &decl.name.name,
            &self.env,
            Some(decl.id),
            Some(decl.name.id),
            decl.name.span,
            info,
        );
        symbol.set_ty(ty);

        if let Some(prev) = self.env.define(symbol.clone()) {
            return Err(errors::already_defined(
                &decl.name.name,
                decl.name.span,
                prev_span(&prev),
            )
            .into());
        }
        self.new_def(&decl.name, &symbol);
        Ok(())
    }

    /// The binding typing matrix: explicit type and/or initializer.
    fn binding_type(&mut self, decl: &LetDecl) -> CheckResult<Type> {
        let explicit = match &decl.ty {
            Some(te) => Some(self.type_from_expr(te)?),
            None => None,
        };

        let value_ty = match &decl.value {
            Some(expr) => match &explicit {
                Some(expected) => match self.type_of(expr, Some(expected)) {
                    Ok(ty) => Some(ty),
                    Err(Fail::Diag(mut diag)) => {
                        if diag.kind == DiagKind::TypeMismatch {
                            diag.notes.push(Note {
                                message: "expected because of this type constraint".into(),
                                span: decl.ty.as_ref().map(|te| te.span()),
                            });
                        }
                        // The declared type still stands; the binding
                        // stays usable for the rest of the module.
                        self.report(*diag);
                        None
                    }
                    Err(other) => return Err(other),
                },
                None => Some(self.type_of(expr, None)?),
            },
            None => None,
        };

        if let (None, Some(ty)) = (&explicit, &value_ty) {
            if ty.as_typedesc().is_some() {
                let span = decl.value.as_ref().map_or(decl.span, |e| e.span());
                return Err(Diagnostic::error(
                    DiagKind::Other,
                    format!("expected a value, got type `{}` instead", ty),
                    span,
                )
                .into());
            }
        }

        let ty = match (explicit, value_ty) {
            (Some(explicit), _) => explicit,
            (None, Some(value_ty)) => {
                if value_ty.is_unknown() {
                    return Err(Diagnostic::error(
                        DiagKind::Other,
                        format!("cannot infer the type of `{}`", decl.name.name),
                        decl.name.span,
                    )
                    .into());
                }
                // An untyped constant becomes the default concrete type.
                types::skip_untyped(&value_ty)
            }
            (None, None) => {
                return Err(Diagnostic::error(
                    DiagKind::Other,
                    format!("binding `{}` has no type and no value", decl.name.name),
                    decl.name.span,
                )
                .into());
            }
        };

        if decl.name.name == "_" && ty.as_func().is_some() {
            self.report(Diagnostic::warning(
                DiagKind::Other,
                "a function value bound to `_` is discarded",
                decl.name.span,
            ));
        }
        Ok(ty)
    }

    pub(super) fn resolve_func(&mut self, symbol: &Symbol, decl: &'a FuncDecl) -> CheckResult<()> {
        // A retried resolution builds a fresh parameter scope.
        let saved = self.env.clone();
        self.env = Env::nested(&saved, format!("func {}", decl.name.name));
        let result = self.func_type(symbol, decl);
        self.env = saved;

        let ty = result?;
        symbol.set_ty(ty);
        Ok(())
    }

    fn func_type(&mut self, symbol: &Symbol, decl: &'a FuncDecl) -> CheckResult<Type> {
        // Resolve every signature type before defining any parameter, so
        // a deferral cannot leave half a signature behind.
        let mut param_types = Vec::new();
        let mut variadic = None;
        for (i, param) in decl.params.iter().enumerate() {
            let ty = self.type_from_expr(&param.ty)?;
            if param.is_variadic {
                if i + 1 != decl.params.len() {
                    return Err(Diagnostic::error(
                        DiagKind::Other,
                        "a variadic parameter must be the last in the list",
                        param.span,
                    )
                    .into());
                }
                variadic = Some(ty);
            } else {
                param_types.push(ty);
            }
        }
        let declared_result = match &decl.result {
            Some(te) => Some(self.type_from_expr(te)?),
            None => None,
        };

        for (param, ty) in decl
            .params
            .iter()
            .filter(|p| !p.is_variadic)
            .zip(&param_types)
        {
            let info = BindingInfo {
                is_param: true,
                label: param.label.as_ref().map(|label| label.name.clone()),
                ..BindingInfo::default()
            };
            let param_symbol = Symbol::binding(
                &param.name.name,
                &self.env,
                None,
                Some(param.name.id),
                param.name.span,
                info,
            );
            param_symbol.set_ty(ty.clone());
            if let Some(prev) = self.env.define(param_symbol.clone()) {
                self.report(errors::param_already_defined(
                    &param.name.name,
                    param.name.span,
                    prev_span(&prev),
                ));
                continue;
            }
            self.new_def(&param.name, &param_symbol);
        }

        if let Some(result) = &declared_result {
            // With a declared result the symbol is typed before the body
            // is checked; this is what makes recursion legal.
            symbol.set_ty(Type::func(
                param_types.clone(),
                result.clone(),
                variadic.clone(),
            ));
        }

        let Some(body) = &decl.body else {
            if decl.extern_name.is_none() {
                return Err(Diagnostic::error(
                    DiagKind::Other,
                    format!("function `{}` has no body", decl.name.name),
                    decl.name.span,
                )
                .into());
            }
            let Some(result) = declared_result else {
                return Err(Diagnostic::error(
                    DiagKind::Other,
                    "an extern function must declare its result type",
                    decl.name.span,
                )
                .into());
            };
            return Ok(Type::func(param_types, result, variadic));
        };

        let body_ty = match self.block_type(body) {
            Ok(ty) => ty,
            Err(Fail::Unresolved {
                symbol: blocker, ..
            }) if Symbol::same(&blocker, symbol) => {
                return Err(Diagnostic::error(
                    DiagKind::Recursive,
                    "cannot infer the type of a recursive definition without an explicit result type",
                    decl.name.span,
                )
                .into());
            }
            Err(other) => return Err(other),
        };

        match declared_result {
            Some(result) => {
                if !body_ty.is_unknown() && !self.convertible(&body_ty, &result) {
                    let span = body.stmts.last().map_or(body.span, |stmt| match stmt {
                        crate::ast::Stmt::Expr(expr) => expr.span(),
                        crate::ast::Stmt::Let(decl) => decl.span,
                    });
                    self.report(Diagnostic::error(
                        DiagKind::TypeMismatch,
                        format!(
                            "expected an expression of type `{}` for the function result, got `{}` instead",
                            result, body_ty
                        ),
                        span,
                    ));
                }
                Ok(Type::func(param_types, result, variadic))
            }
            None => Ok(Type::func(
                param_types,
                types::skip_untyped(&body_ty),
                variadic,
            )),
        }
    }

    pub(super) fn resolve_type_decl(
        &mut self,
        symbol: &Symbol,
        decl: &'a TypeDecl,
    ) -> CheckResult<()> {
        if let Some(first) = decl.type_params.first() {
            return Err(errors::unimplemented_feature("type parameters", first.span).into());
        }

        match &decl.body {
            TypeDeclBody::Alias(te) => {
                let base = self.type_from_expr(te)?;
                symbol.set_ty(Type::typedesc(Type::alias(decl.name.name.clone(), base)));
                Ok(())
            }
            TypeDeclBody::Members(members) => self.resolve_type_body(symbol, decl, members),
        }
    }

    fn resolve_type_body(
        &mut self,
        symbol: &Symbol,
        decl: &'a TypeDecl,
        members: &'a [Member],
    ) -> CheckResult<()> {
        let Some(info) = symbol.as_type_def() else {
            return Err(Fail::Fatal(CheckError::IllFormedAst(
                "type declaration resolved against a non-type symbol".into(),
            )));
        };
        let local = info.local.clone();

        // Phase 1: resolve every member type. Nothing is defined until
        // all of them resolved, so a deferral leaves no half-built body.
        let mut fields: Vec<(&crate::ast::FieldMember, Type)> = Vec::new();
        let mut variants: Vec<(&crate::ast::VariantMember, Vec<Type>)> = Vec::new();

        for member in members {
            match member {
                Member::Field(field) => {
                    let ty = self.type_from_expr(&field.ty)?;
                    fields.push((field, ty));
                }
                Member::Variant(variant) => {
                    if variant.name.name == decl.name.name {
                        self.report(Diagnostic::error(
                            DiagKind::Redefinition,
                            format!(
                                "variant `{}` must not share the name of its type",
                                variant.name.name
                            ),
                            variant.name.span,
                        ));
                        continue;
                    }

                    let mut labelled = None;
                    let mut params = Vec::with_capacity(variant.params.len());
                    for param in &variant.params {
                        match (&param.label, labelled) {
                            (Some(label), _) => labelled = Some(label.span),
                            (None, Some(label_span)) => {
                                self.report(
                                    Diagnostic::error(
                                        DiagKind::Other,
                                        "a positional parameter must come before any labelled parameter",
                                        param.span,
                                    )
                                    .with_note("labelled parameter is here", Some(label_span)),
                                );
                            }
                            (None, None) => {}
                        }
                        params.push(self.type_from_expr(&param.ty)?);
                    }
                    variants.push((variant, params));
                }
            }
        }

        // Phase 2: build the nominal type and define the member symbols.
        let custom = Type::custom(
            decl.name.name.clone(),
            fields
                .iter()
                .map(|(field, ty)| types::Field {
                    name: field.name.name.clone(),
                    ty: ty.clone(),
                })
                .collect(),
            variants
                .iter()
                .map(|(variant, params)| types::Variant {
                    name: variant.name.name.clone(),
                    params: params.clone(),
                })
                .collect(),
        );

        for (field, ty) in fields {
            let field_symbol = Symbol::binding(
                &field.name.name,
                &local,
                None,
                Some(field.name.id),
                field.name.span,
                BindingInfo {
                    is_field: true,
                    ..BindingInfo::default()
                },
            );
            field_symbol.set_ty(ty);
            if let Some(prev) = local.define(field_symbol.clone()) {
                self.report(
                    Diagnostic::error(
                        DiagKind::Redefinition,
                        format!("duplicate field `{}`", field.name.name),
                        field.name.span,
                    )
                    .with_note("field was defined here", prev_span(&prev)),
                );
                continue;
            }
            self.new_def(&field.name, &field_symbol);
        }

        for (variant, params) in variants {
            // A variant constructor is an ordinary callable binding whose
            // result is the enclosing type.
            let ctor = Symbol::binding(
                &variant.name.name,
                &local,
                None,
                Some(variant.name.id),
                variant.name.span,
                BindingInfo {
                    is_variant_constructor: true,
                    ..BindingInfo::default()
                },
            );
            ctor.set_ty(Type::func(params, custom.clone(), None));

            if let Some(prev) = local.define(ctor.clone()) {
                self.report(errors::already_defined(
                    &variant.name.name,
                    variant.name.span,
                    prev_span(&prev),
                ));
                continue;
            }
            if let Some(prev) = self.env.define(ctor.clone()) {
                self.report(errors::already_defined(
                    &variant.name.name,
                    variant.name.span,
                    prev_span(&prev),
                ));
            }
            self.new_def(&variant.name, &ctor);
        }

        symbol.set_ty(Type::typedesc(Type::alias(decl.name.name.clone(), custom)));
        Ok(())
    }
}
