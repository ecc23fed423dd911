/**
Type representation for Mica

The type model is one closed enum: every place that needs per-variant
behavior (equality, underlying representation, display) matches on it
exhaustively, so adding a variant is a compile-checked obligation across
the whole checker.

Equality is structural for primitives, tuples, arrays, records, function
and reference types, and is *identity* for custom (record/variant) types:
two independently declared custom types with identical bodies are distinct.
Payloads are `Rc`-shared so types clone cheaply, and `Rc` pointer identity
is what nominal equality compares.
*/
use std::fmt;
use std::rc::Rc;

/// Primitive type kinds, including the untyped kinds literals produce
/// before context promotes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    UntypedBool,
    UntypedInt,
    UntypedFloat,
    UntypedString,
    Bool,
    I32,
    U8,
    F32,
    Str,
    Pointer,
    Any,
    /// The type of any type-valued expression.
    Typedesc,
}

impl Primitive {
    pub fn name(self) -> &'static str {
        match self {
            Primitive::UntypedBool => "untyped bool",
            Primitive::UntypedInt => "untyped int",
            Primitive::UntypedFloat => "untyped float",
            Primitive::UntypedString => "untyped string",
            Primitive::Bool => "bool",
            Primitive::I32 => "i32",
            Primitive::U8 => "u8",
            Primitive::F32 => "f32",
            Primitive::Str => "string",
            Primitive::Pointer => "pointer",
            Primitive::Any => "any",
            Primitive::Typedesc => "typedesc",
        }
    }

    pub fn is_untyped(self) -> bool {
        matches!(
            self,
            Primitive::UntypedBool
                | Primitive::UntypedInt
                | Primitive::UntypedFloat
                | Primitive::UntypedString
        )
    }

    /// The default concrete type an untyped kind promotes to.
    pub fn typed_counterpart(self) -> Option<Primitive> {
        match self {
            Primitive::UntypedBool => Some(Primitive::Bool),
            Primitive::UntypedInt => Some(Primitive::I32),
            Primitive::UntypedFloat => Some(Primitive::F32),
            Primitive::UntypedString => Some(Primitive::Str),
            _ => None,
        }
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A type in the Mica type system.
#[derive(Debug, Clone)]
pub enum Type {
    Primitive(Primitive),
    Alias(Rc<Alias>),
    Tuple(Rc<Tuple>),
    Array(Rc<Array>),
    Record(Rc<Record>),
    Custom(Rc<Custom>),
    Func(Rc<Func>),
    Ref(Rc<RefType>),
    TypeDesc(Rc<TypeDesc>),
    /// Sentinel for an expression whose type could not be computed yet.
    /// Equal to nothing, including itself.
    Unknown,
}

/// A declared type name. `base` is the type expression it was declared
/// from (possibly itself an alias), `actual` its fully dealiased form.
#[derive(Debug)]
pub struct Alias {
    pub name: String,
    pub base: Type,
    actual: Type,
}

impl Alias {
    pub fn actual(&self) -> &Type {
        &self.actual
    }
}

/// An ordered sequence of element types. The zero-element tuple is the
/// unit/"no value" type.
#[derive(Debug)]
pub struct Tuple {
    pub elems: Vec<Type>,
}

/// A fixed-size array.
#[derive(Debug)]
pub struct Array {
    pub size: u64,
    pub elem: Type,
}

/// An anonymous structural record: a bag of named fields. Field order is
/// not significant for equality.
#[derive(Debug)]
pub struct Record {
    pub fields: Vec<Field>,
}

/// A user-declared nominal type carrying fields and/or named variants.
#[derive(Debug)]
pub struct Custom {
    pub name: String,
    pub fields: Vec<Field>,
    pub variants: Vec<Variant>,
}

#[derive(Debug)]
pub struct Field {
    pub name: String,
    pub ty: Type,
}

#[derive(Debug)]
pub struct Variant {
    pub name: String,
    pub params: Vec<Type>,
}

impl Custom {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// A function type: ordered parameters, a result, and an optional
/// variadic tail type.
#[derive(Debug)]
pub struct Func {
    pub params: Vec<Type>,
    pub result: Type,
    pub variadic: Option<Type>,
}

/// A non-owning reference.
#[derive(Debug)]
pub struct RefType {
    pub base: Type,
}

/// The type of a type: wraps the named type so that type-valued
/// expressions stay distinguishable from values of that type.
#[derive(Debug)]
pub struct TypeDesc {
    pub base: Type,
}

impl Type {
    pub fn unit() -> Type {
        Type::Tuple(Rc::new(Tuple { elems: Vec::new() }))
    }

    pub fn tuple(elems: Vec<Type>) -> Type {
        Type::Tuple(Rc::new(Tuple { elems }))
    }

    pub fn array(size: u64, elem: Type) -> Type {
        Type::Array(Rc::new(Array { size, elem }))
    }

    pub fn record(fields: Vec<Field>) -> Type {
        Type::Record(Rc::new(Record { fields }))
    }

    pub fn func(params: Vec<Type>, result: Type, variadic: Option<Type>) -> Type {
        Type::Func(Rc::new(Func {
            params,
            result,
            variadic,
        }))
    }

    pub fn reference(base: Type) -> Type {
        Type::Ref(Rc::new(RefType { base }))
    }

    pub fn alias(name: impl Into<String>, base: Type) -> Type {
        let actual = remove_alias(&base);
        Type::Alias(Rc::new(Alias {
            name: name.into(),
            base,
            actual,
        }))
    }

    /// Wraps a type in a typedesc. Wrapping a typedesc is a no-op.
    pub fn typedesc(base: Type) -> Type {
        if let Type::TypeDesc(_) = base {
            return base;
        }
        Type::TypeDesc(Rc::new(TypeDesc { base }))
    }

    pub fn custom(name: impl Into<String>, fields: Vec<Field>, variants: Vec<Variant>) -> Type {
        Type::Custom(Rc::new(Custom {
            name: name.into(),
            fields,
            variants,
        }))
    }

    /// Structural equality, except for `Custom` which compares identity.
    /// Untyped primitives are equal to their typed counterpart (in both
    /// directions), and `any` is equal to everything.
    pub fn equals(&self, other: &Type) -> bool {
        if let Type::Alias(a) = self {
            return a.actual.equals(other);
        }
        let other = skip_alias(other);

        if self.is_unknown() || other.is_unknown() {
            return false;
        }
        if matches!(self, Type::Primitive(Primitive::Any))
            || matches!(other, Type::Primitive(Primitive::Any))
        {
            return true;
        }

        match (self, &other) {
            (Type::Primitive(a), Type::Primitive(b)) => {
                a == b
                    || a.typed_counterpart() == Some(*b)
                    || b.typed_counterpart() == Some(*a)
            }
            (Type::Tuple(a), Type::Tuple(b)) => {
                a.elems.len() == b.elems.len()
                    && a.elems
                        .iter()
                        .zip(b.elems.iter())
                        .all(|(x, y)| x.equals(y))
            }
            (Type::Array(a), Type::Array(b)) => a.size == b.size && a.elem.equals(&b.elem),
            (Type::Record(a), Type::Record(b)) => {
                a.fields.len() == b.fields.len()
                    && a.fields.iter().all(|fa| {
                        b.fields
                            .iter()
                            .any(|fb| fa.name == fb.name && fa.ty.equals(&fb.ty))
                    })
            }
            (Type::Custom(a), Type::Custom(b)) => Rc::ptr_eq(a, b),
            (Type::Func(a), Type::Func(b)) => {
                let variadic_matches = match (&a.variadic, &b.variadic) {
                    (Some(x), Some(y)) => x.equals(y),
                    (None, None) => true,
                    _ => false,
                };
                variadic_matches
                    && a.result.equals(&b.result)
                    && a.params.len() == b.params.len()
                    && a.params
                        .iter()
                        .zip(b.params.iter())
                        .all(|(x, y)| x.equals(y))
            }
            (Type::Ref(a), Type::Ref(b)) => a.base.equals(&b.base),
            (Type::TypeDesc(a), Type::TypeDesc(b)) => a.base.equals(&b.base),
            (Type::TypeDesc(_), Type::Primitive(Primitive::Typedesc))
            | (Type::Primitive(Primitive::Typedesc), Type::TypeDesc(_)) => true,
            _ => false,
        }
    }

    /// The representation used by the operator and conversion tables:
    /// aliases report their dealiased form, a typedesc reports its base,
    /// everything else is its own underlying type.
    pub fn underlying(&self) -> Type {
        match self {
            Type::Alias(a) => a.actual.clone(),
            Type::TypeDesc(d) => d.base.clone(),
            _ => self.clone(),
        }
    }

    pub fn is_untyped(&self) -> bool {
        match skip_alias(self) {
            Type::Primitive(p) => p.is_untyped(),
            _ => false,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Type::Unknown)
    }

    pub fn is_unit(&self) -> bool {
        matches!(skip_alias(self), Type::Tuple(t) if t.elems.is_empty())
    }

    pub fn as_func(&self) -> Option<Rc<Func>> {
        match skip_alias(self) {
            Type::Func(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<Rc<Array>> {
        match skip_alias(self) {
            Type::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_tuple(&self) -> Option<Rc<Tuple>> {
        match skip_alias(self) {
            Type::Tuple(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_custom(&self) -> Option<Rc<Custom>> {
        match skip_alias(self) {
            Type::Custom(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<Rc<Record>> {
        match skip_alias(self) {
            Type::Record(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_typedesc(&self) -> Option<Rc<TypeDesc>> {
        match skip_alias(self) {
            Type::TypeDesc(d) => Some(d),
            _ => None,
        }
    }
}

/// Removes a single alias wrapping, yielding the fully dealiased form
/// (the `actual` of an alias is itself alias-free by construction).
pub fn skip_alias(t: &Type) -> Type {
    match t {
        Type::Alias(a) => a.actual.clone(),
        _ => t.clone(),
    }
}

fn remove_alias(t: &Type) -> Type {
    let mut t = t.clone();
    loop {
        match t {
            Type::Alias(a) => t = a.actual.clone(),
            other => return other,
        }
    }
}

/// Removes every typedesc wrapping.
pub fn skip_typedesc(t: &Type) -> Type {
    match t {
        Type::TypeDesc(d) => skip_typedesc(&d.base),
        _ => t.clone(),
    }
}

/// Promotes untyped kinds to their default concrete type, recursing into
/// tuples and arrays so untyped literal aggregates promote as a whole.
pub fn skip_untyped(t: &Type) -> Type {
    match t {
        Type::Primitive(p) => match p.typed_counterpart() {
            Some(typed) => Type::Primitive(typed),
            None => t.clone(),
        },
        Type::Tuple(tu) => Type::tuple(tu.elems.iter().map(skip_untyped).collect()),
        Type::Array(a) => Type::array(a.size, skip_untyped(&a.elem)),
        _ => t.clone(),
    }
}

/// Converts a type to its typed analog, checked against an expected type
/// when one is given.
///
/// Without an expected type, untyped kinds promote to their default
/// concrete counterpart and everything else passes through. With one, the
/// conversion fails (`None`) unless the converted type equals it; this is
/// also where the `untyped int` → `u8` widening lives.
pub fn into_typed(t: &Type, expected: Option<&Type>) -> Option<Type> {
    let t = skip_alias(t);
    let expected = expected.map(skip_alias);

    match (&t, &expected) {
        (Type::Primitive(p), _) if p.is_untyped() => {
            let counterpart = Type::Primitive(p.typed_counterpart()?);
            match &expected {
                None => Some(counterpart),
                Some(e) if counterpart.equals(e) => Some(counterpart),
                Some(e)
                    if *p == Primitive::UntypedInt
                        && Type::Primitive(Primitive::U8).equals(e) =>
                {
                    Some(Type::Primitive(Primitive::U8))
                }
                Some(_) => None,
            }
        }
        (Type::Array(a), Some(Type::Array(e))) => {
            if a.size != e.size {
                return None;
            }
            let elem = into_typed(&a.elem, Some(&e.elem))?;
            Some(Type::array(a.size, elem))
        }
        (Type::Tuple(a), Some(Type::Tuple(e))) => {
            if a.elems.len() != e.elems.len() {
                return None;
            }
            let elems = a
                .elems
                .iter()
                .zip(e.elems.iter())
                .map(|(x, y)| into_typed(x, Some(y)))
                .collect::<Option<Vec<_>>>()?;
            Some(Type::tuple(elems))
        }
        (_, Some(e)) => t.equals(e).then(|| t.clone()),
        (_, None) => Some(t.clone()),
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Primitive(p) => write!(f, "{}", p),
            Type::Alias(a) => {
                // A fresh name for a primitive reads better bare; any
                // other base is worth spelling out, unless it already
                // displays as this very name (a custom type's alias).
                let base = a.base.to_string();
                if matches!(a.base, Type::Primitive(p) if !p.is_untyped()) || base == a.name {
                    f.write_str(&a.name)
                } else {
                    write!(f, "{} aka {}", a.name, base)
                }
            }
            Type::Tuple(t) => {
                f.write_str("(")?;
                for (i, elem) in t.elems.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", elem)?;
                }
                f.write_str(")")
            }
            Type::Array(a) => write!(f, "[{}]{}", a.size, a.elem),
            Type::Record(r) => {
                f.write_str("record{")?;
                for (i, field) in r.fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str("; ")?;
                    }
                    write!(f, "{}: {}", field.name, field.ty)?;
                }
                f.write_str("}")
            }
            Type::Custom(c) => f.write_str(&c.name),
            Type::Func(func) => {
                f.write_str("fn(")?;
                for (i, param) in func.params.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", param)?;
                }
                if let Some(variadic) = &func.variadic {
                    if !func.params.is_empty() {
                        f.write_str(", ")?;
                    }
                    write!(f, "..{}", variadic)?;
                }
                f.write_str(")")?;
                if !func.result.is_unit() {
                    write!(f, " {}", func.result)?;
                }
                Ok(())
            }
            Type::Ref(r) => write!(f, "*{}", r.base),
            Type::TypeDesc(d) => write!(f, "typedesc({})", d.base),
            Type::Unknown => f.write_str("?"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_laws() {
        let types = [
            Type::Primitive(Primitive::I32),
            Type::Primitive(Primitive::Bool),
            Type::unit(),
            Type::tuple(vec![Type::Primitive(Primitive::I32)]),
            Type::array(3, Type::Primitive(Primitive::U8)),
            Type::func(
                vec![Type::Primitive(Primitive::I32)],
                Type::Primitive(Primitive::Bool),
                None,
            ),
        ];

        for a in &types {
            assert!(a.equals(a), "{} should equal itself", a);
            for b in &types {
                assert_eq!(a.equals(b), b.equals(a), "symmetry for {} and {}", a, b);
            }
        }
    }

    #[test]
    fn test_untyped_counterparts() {
        let untyped = Type::Primitive(Primitive::UntypedInt);
        let typed = Type::Primitive(Primitive::I32);

        assert!(untyped.equals(&typed));
        assert!(typed.equals(&untyped));
        assert!(!untyped.equals(&Type::Primitive(Primitive::U8)));
    }

    #[test]
    fn test_unit_tuple() {
        let unit = Type::unit();
        assert!(unit.equals(&Type::unit()));
        assert!(unit.underlying().equals(&unit));
        assert!(unit.is_unit());

        // A one-element tuple is not unwrapped.
        let one = Type::tuple(vec![Type::Primitive(Primitive::I32)]);
        assert!(!one.equals(&Type::Primitive(Primitive::I32)));
    }

    #[test]
    fn test_alias_transparency() {
        let meters = Type::alias("Meters", Type::Primitive(Primitive::I32));
        let i32_ty = Type::Primitive(Primitive::I32);

        assert!(meters.equals(&i32_ty));
        assert!(i32_ty.equals(&meters));
        assert!(meters.underlying().equals(&i32_ty.underlying()));
        assert_eq!(meters.to_string(), "Meters");

        // An alias of a non-primitive spells its base out.
        let pair = Type::alias(
            "Pair",
            Type::tuple(vec![i32_ty.clone(), i32_ty.clone()]),
        );
        assert_eq!(pair.to_string(), "Pair aka (i32, i32)");
        assert_ne!(pair.to_string(), pair.underlying().to_string());
    }

    #[test]
    fn test_alias_chain_dealiases() {
        let a = Type::alias("A", Type::Primitive(Primitive::Bool));
        let b = Type::alias("B", a.clone());

        assert!(b.equals(&Type::Primitive(Primitive::Bool)));
        assert!(b.equals(&a));
        assert!(matches!(b.underlying(), Type::Primitive(Primitive::Bool)));
    }

    #[test]
    fn test_custom_identity() {
        let a = Type::custom(
            "Point",
            vec![Field {
                name: "x".into(),
                ty: Type::Primitive(Primitive::I32),
            }],
            vec![],
        );
        let b = Type::custom(
            "Point",
            vec![Field {
                name: "x".into(),
                ty: Type::Primitive(Primitive::I32),
            }],
            vec![],
        );

        // Same shape, different declarations: not equal.
        assert!(a.equals(&a));
        assert!(!a.equals(&b));
    }

    #[test]
    fn test_record_is_structural_and_unordered() {
        let a = Type::record(vec![
            Field {
                name: "x".into(),
                ty: Type::Primitive(Primitive::I32),
            },
            Field {
                name: "y".into(),
                ty: Type::Primitive(Primitive::Bool),
            },
        ]);
        let b = Type::record(vec![
            Field {
                name: "y".into(),
                ty: Type::Primitive(Primitive::Bool),
            },
            Field {
                name: "x".into(),
                ty: Type::Primitive(Primitive::I32),
            },
        ]);

        assert!(a.equals(&b));
    }

    #[test]
    fn test_func_variadic_must_match() {
        let plain = Type::func(vec![], Type::unit(), None);
        let variadic = Type::func(vec![], Type::unit(), Some(Type::Primitive(Primitive::Any)));

        assert!(!plain.equals(&variadic));
        assert!(!variadic.equals(&plain));
    }

    #[test]
    fn test_typedesc_is_strict() {
        let i32_ty = Type::Primitive(Primitive::I32);
        let desc = Type::typedesc(i32_ty.clone());

        assert!(!desc.equals(&i32_ty));
        assert!(desc.equals(&Type::typedesc(Type::Primitive(Primitive::I32))));

        // Wrapping a typedesc is a no-op.
        assert!(Type::typedesc(desc.clone()).equals(&desc));
    }

    #[test]
    fn test_into_typed() {
        let untyped = Type::Primitive(Primitive::UntypedInt);

        let default = into_typed(&untyped, None).unwrap();
        assert!(matches!(default, Type::Primitive(Primitive::I32)));

        let widened = into_typed(&untyped, Some(&Type::Primitive(Primitive::U8))).unwrap();
        assert!(matches!(widened, Type::Primitive(Primitive::U8)));

        assert!(into_typed(&untyped, Some(&Type::Primitive(Primitive::Bool))).is_none());

        let arr = Type::array(2, untyped.clone());
        let expected = Type::array(2, Type::Primitive(Primitive::U8));
        let converted = into_typed(&arr, Some(&expected)).unwrap();
        assert!(converted.equals(&expected));
    }

    #[test]
    fn test_unknown_equals_nothing() {
        assert!(!Type::Unknown.equals(&Type::Unknown));
        assert!(!Type::Unknown.equals(&Type::unit()));
    }
}
