//! Lowering of Opal types onto LLVM types.
//!
//! Pointers and references lower to the opaque pointer type; the language
//! keeps track of pointees itself (see [`crate::symbol::Variable`]). Classes
//! and unions lower to named structs created once per name. Lowering an
//! unresolved user type or instantiating an opaque class is a diagnostic,
//! which callers must surface, never swallow.

use inkwell::types::{BasicMetadataTypeEnum, BasicType, BasicTypeEnum, FunctionType, StructType};
use inkwell::AddressSpace;

use opal_diagnostic::{Diagnostic, ErrorKind, Span};
use opal_types::{BuiltinKind, Type, UnionVariantDef};

use crate::context::CGContext;

/// Lower a type to the LLVM type used for storage and SSA values.
///
/// `void` has no storage representation and is rejected here; function
/// return types go through [`lower_return_type`].
pub fn lower_basic<'ctx>(
    ctx: &CGContext<'ctx>,
    ty: &Type,
    span: Span,
) -> Result<BasicTypeEnum<'ctx>, Diagnostic> {
    match ty {
        Type::Builtin { kind, .. } => lower_builtin(ctx, *kind).ok_or_else(|| {
            Diagnostic::new(ErrorKind::TypeMismatch, span, "'void' may not be used here")
        }),
        Type::Pointer { .. } | Type::Reference { .. } => {
            Ok(ctx.llcx.i8_type().ptr_type(AddressSpace::default()).into())
        }
        Type::Array { element, size, .. } => {
            let elem = lower_basic(ctx, element, span)?;
            Ok(elem.array_type(*size as u32).into())
        }
        Type::UserDefined { name, .. } => match ctx.user_types.lookup(name) {
            Some(real) => lower_basic(ctx, real, span),
            None => Err(Diagnostic::new(
                ErrorKind::UnknownName,
                span,
                format!("unknown type name '{name}'"),
            )),
        },
        Type::Class {
            name, is_opaque, ..
        } => {
            if *is_opaque {
                return Err(Diagnostic::new(
                    ErrorKind::IncompleteType,
                    span,
                    format!("'{name}' is opaque and cannot be used as a complete type"),
                ));
            }
            let st = ctx.named_struct(name);
            if st.is_opaque() {
                let members = ty
                    .class_members(&ctx.user_types)
                    .expect("complete class has members");
                let fields = members
                    .iter()
                    .map(|m| lower_basic(ctx, &m.ty, span))
                    .collect::<Result<Vec<_>, _>>()?;
                st.set_body(&fields, false);
            }
            Ok(st.into())
        }
        Type::Union { name, .. } => {
            let st = ctx.named_struct(&format!("union.{name}"));
            if st.is_opaque() {
                st.set_body(&[ctx.llcx.i32_type().into()], false);
            }
            Ok(st.into())
        }
    }
}

fn lower_builtin<'ctx>(ctx: &CGContext<'ctx>, kind: BuiltinKind) -> Option<BasicTypeEnum<'ctx>> {
    Some(match kind {
        BuiltinKind::Void => return None,
        BuiltinKind::I8 | BuiltinKind::U8 => ctx.llcx.i8_type().into(),
        BuiltinKind::I16 | BuiltinKind::U16 => ctx.llcx.i16_type().into(),
        BuiltinKind::I32 | BuiltinKind::U32 | BuiltinKind::Char => ctx.llcx.i32_type().into(),
        BuiltinKind::I64
        | BuiltinKind::U64
        | BuiltinKind::Isize
        | BuiltinKind::Usize => ctx.llcx.i64_type().into(),
        BuiltinKind::Bool => ctx.llcx.bool_type().into(),
        BuiltinKind::F32 => ctx.llcx.f32_type().into(),
        BuiltinKind::F64 => ctx.llcx.f64_type().into(),
    })
}

/// Lower a function signature. A `void` return produces a void function
/// type; anything else must lower to a storable type.
pub fn lower_fn_type<'ctx>(
    ctx: &CGContext<'ctx>,
    param_types: &[(&Type, Span)],
    return_type: &Type,
    return_span: Span,
    is_vararg: bool,
) -> Result<FunctionType<'ctx>, Diagnostic> {
    let params: Vec<BasicMetadataTypeEnum<'ctx>> = param_types
        .iter()
        .map(|(ty, span)| lower_basic(ctx, ty, *span).map(Into::into))
        .collect::<Result<_, _>>()?;

    if return_type.is_void(&ctx.user_types) {
        Ok(ctx.llcx.void_type().fn_type(&params, is_vararg))
    } else {
        Ok(lower_basic(ctx, return_type, return_span)?.fn_type(&params, is_vararg))
    }
}

/// The concrete struct layout of one union variant: the `i32` discriminant
/// paired with the payload.
pub fn union_variant_type<'ctx>(
    ctx: &CGContext<'ctx>,
    union_name: &str,
    variant: &UnionVariantDef,
    span: Span,
) -> Result<StructType<'ctx>, Diagnostic> {
    let name = format!("union.{}.{}", union_name, variant.tag);
    let st = ctx.named_struct(&name);
    if st.is_opaque() {
        let payload = lower_basic(ctx, &variant.ty, span)?;
        st.set_body(&[ctx.llcx.i32_type().into(), payload], false);
    }
    Ok(st)
}

#[cfg(test)]
mod tests {
    use super::*;
    use inkwell::context::Context;
    use opal_diagnostic::SourceFile;
    use opal_types::{Accessibility, MemberVariable};

    fn test_cx(llcx: &Context) -> CGContext<'_> {
        CGContext::new(llcx, "t", SourceFile::new("t.opal", ""))
    }

    #[test]
    fn builtins_lower_to_expected_widths() {
        let llcx = Context::create();
        let ctx = test_cx(&llcx);
        let span = Span::default();
        let cases = [
            (BuiltinKind::I8, 8),
            (BuiltinKind::U16, 16),
            (BuiltinKind::I32, 32),
            (BuiltinKind::U64, 64),
            (BuiltinKind::Isize, 64),
            (BuiltinKind::Bool, 1),
            (BuiltinKind::Char, 32),
        ];
        for (kind, bits) in cases {
            let lowered = lower_basic(&ctx, &Type::builtin(kind), span).unwrap();
            assert_eq!(lowered.into_int_type().get_bit_width(), bits, "{kind}");
        }
    }

    #[test]
    fn void_is_rejected_as_storage() {
        let llcx = Context::create();
        let ctx = test_cx(&llcx);
        let err = lower_basic(&ctx, &Type::builtin(BuiltinKind::Void), Span::default()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::TypeMismatch);
    }

    #[test]
    fn arrays_and_pointers_lower() {
        let llcx = Context::create();
        let ctx = test_cx(&llcx);
        let span = Span::default();
        let arr = lower_basic(&ctx, &Type::array(Type::builtin(BuiltinKind::I32), 3), span).unwrap();
        assert_eq!(arr.into_array_type().len(), 3);
        let ptr = lower_basic(&ctx, &Type::pointer(Type::builtin(BuiltinKind::I32)), span).unwrap();
        assert!(ptr.is_pointer_type());
        // References are pointers at the LLVM level.
        let r = lower_basic(&ctx, &Type::reference(Type::builtin(BuiltinKind::I8)), span).unwrap();
        assert!(r.is_pointer_type());
    }

    #[test]
    fn opaque_class_cannot_be_instantiated() {
        let llcx = Context::create();
        let mut ctx = test_cx(&llcx);
        ctx.user_types.declare_opaque("Node").unwrap();
        let err = lower_basic(&ctx, &Type::user_defined("Node"), Span::default()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::IncompleteType);

        // Pointers to it are fine.
        let ptr = lower_basic(
            &ctx,
            &Type::pointer(Type::user_defined("Node")),
            Span::default(),
        );
        assert!(ptr.is_ok());
    }

    #[test]
    fn unknown_user_type_is_unknown_name() {
        let llcx = Context::create();
        let ctx = test_cx(&llcx);
        let err = lower_basic(&ctx, &Type::user_defined("Ghost"), Span::default()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnknownName);
    }

    #[test]
    fn complete_class_gets_struct_body() {
        let llcx = Context::create();
        let mut ctx = test_cx(&llcx);
        ctx.user_types
            .define_class(
                "Point",
                vec![
                    MemberVariable {
                        name: "x".into(),
                        ty: Type::builtin(BuiltinKind::I32),
                        accessibility: Accessibility::Public,
                    },
                    MemberVariable {
                        name: "y".into(),
                        ty: Type::builtin(BuiltinKind::I32),
                        accessibility: Accessibility::Public,
                    },
                ],
            )
            .unwrap();
        let lowered = lower_basic(&ctx, &Type::user_defined("Point"), Span::default()).unwrap();
        let st = lowered.into_struct_type();
        assert_eq!(st.count_fields(), 2);
    }

    #[test]
    fn union_lowers_with_discriminant() {
        let llcx = Context::create();
        let mut ctx = test_cx(&llcx);
        ctx.user_types
            .register(
                "Shape",
                Type::union_of(
                    "Shape",
                    vec![
                        ("circle".to_string(), Type::builtin(BuiltinKind::F64)),
                        ("square".to_string(), Type::builtin(BuiltinKind::I32)),
                    ],
                ),
            )
            .unwrap();

        let ud = Type::user_defined("Shape");
        let basic = lower_basic(&ctx, &ud, Span::default()).unwrap();
        assert_eq!(basic.into_struct_type().count_fields(), 1);

        let variants = ud.union_variants(&ctx.user_types).unwrap().to_vec();
        let vt = union_variant_type(&ctx, "Shape", &variants[1], Span::default()).unwrap();
        assert_eq!(vt.count_fields(), 2);
        assert!(vt.get_field_type_at_index(0).unwrap().is_int_type());
    }

    #[test]
    fn fn_types_cover_void_and_vararg() {
        let llcx = Context::create();
        let ctx = test_cx(&llcx);
        let span = Span::default();
        let i32_ty = Type::builtin(BuiltinKind::I32);
        let void = Type::builtin(BuiltinKind::Void);

        let f = lower_fn_type(&ctx, &[(&i32_ty, span)], &void, span, false).unwrap();
        assert!(f.get_return_type().is_none());
        assert_eq!(f.count_param_types(), 1);

        let v = lower_fn_type(&ctx, &[(&i32_ty, span)], &i32_ty, span, true).unwrap();
        assert!(v.is_var_arg());
    }
}
