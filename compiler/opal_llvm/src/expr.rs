//! Expression lowering.
//!
//! The visitor returns a [`Value`]: the LLVM value, its language-level type,
//! and its signedness. Operands of a binary operator must have identical
//! lowered types; there are no implicit conversions. Division, modulo, and
//! ordered comparisons are signed iff either operand is signed.

use inkwell::values::{BasicMetadataValueEnum, BasicValueEnum, PointerValue};
use inkwell::{FloatPredicate, IntPredicate};
use tracing::warn;

use opal_ast::{BinOp, BinOpKind, Call, Cast, Expr, ExprKind, IntLit, Subscript, UnaryOp, UnaryOpKind};
use opal_diagnostic::{Diagnostic, ErrorKind, Span};
use opal_types::{BuiltinKind, Type};

use crate::context::CGContext;
use crate::symbol::{SymbolTable, Value};
use crate::types::lower_basic;

/// Addressable storage named by an l-value expression: the pointer, the type
/// of what it points at, and that pointee's signedness.
pub(crate) struct Place<'ctx> {
    pub ptr: PointerValue<'ctx>,
    pub ty: Type,
    pub is_signed: bool,
}

/// Lower an l-value to its address. Identifiers and indirections are the
/// only addressable expressions; `require_mutable` additionally rejects
/// immutable bindings (assignment targets).
pub(crate) fn gen_lvalue<'ctx>(
    ctx: &CGContext<'ctx>,
    scope: &SymbolTable<'ctx>,
    expr: &Expr,
    require_mutable: bool,
) -> Result<Place<'ctx>, Diagnostic> {
    match &expr.kind {
        ExprKind::Ident(name) => {
            let var = scope.lookup(name).ok_or_else(|| {
                Diagnostic::new(
                    ErrorKind::UnknownName,
                    expr.span,
                    format!("unknown variable name '{name}'"),
                )
            })?;
            if require_mutable && !var.is_mutable() {
                return Err(Diagnostic::new(
                    ErrorKind::InvalidLValue,
                    expr.span,
                    format!("assignment of read-only variable '{name}'"),
                ));
            }
            // A reference is implicitly dereferenced: its storage holds the
            // address assignments should go through.
            if let Some(refee) = var.ty().refee(&ctx.user_types) {
                lower_basic(ctx, var.ty(), expr.span)?;
                let loaded = ctx
                    .builder
                    .build_load(var.ptr(), name)
                    .expect("load");
                let refee = refee.clone();
                let is_signed = refee.is_signed(&ctx.user_types);
                return Ok(Place {
                    ptr: loaded.into_pointer_value(),
                    ty: refee,
                    is_signed,
                });
            }
            Ok(Place {
                ptr: var.ptr(),
                ty: var.ty().clone(),
                is_signed: var.is_signed(),
            })
        }
        ExprKind::UnaryOp(op) if op.is_indirection() => {
            let value = gen_expr(ctx, scope, &op.rhs)?;
            let pointee = value
                .ty()
                .pointee(&ctx.user_types)
                .or_else(|| value.ty().refee(&ctx.user_types))
                .cloned()
                .ok_or_else(|| {
                    Diagnostic::new(
                        ErrorKind::InvalidOperator,
                        op.rhs.span,
                        "indirection requires a pointer or reference",
                    )
                })?;
            let Some(BasicValueEnum::PointerValue(ptr)) = value.value() else {
                return Err(Diagnostic::new(
                    ErrorKind::Internal,
                    expr.span,
                    "pointer-typed value did not lower to a pointer",
                ));
            };
            let is_signed = pointee.is_signed(&ctx.user_types);
            Ok(Place {
                ptr,
                ty: pointee,
                is_signed,
            })
        }
        _ => Err(Diagnostic::new(
            ErrorKind::InvalidLValue,
            expr.span,
            "left-hand side requires an assignable expression",
        )),
    }
}

/// Lower one expression.
pub fn gen_expr<'ctx>(
    ctx: &CGContext<'ctx>,
    scope: &SymbolTable<'ctx>,
    expr: &Expr,
) -> Result<Value<'ctx>, Diagnostic> {
    match &expr.kind {
        ExprKind::Nil => Err(Diagnostic::internal(expr.span, "nil expression reached codegen")),
        ExprKind::Int(lit) => Ok(gen_int_lit(ctx, *lit)),
        ExprKind::Bool(b) => Ok(Value::new(
            ctx.llcx.bool_type().const_int(u64::from(*b), false).into(),
            Type::builtin(BuiltinKind::Bool),
            false,
        )),
        ExprKind::Char(c) => Ok(Value::new(
            ctx.llcx.i32_type().const_int(u64::from(*c as u32), false).into(),
            Type::builtin(BuiltinKind::Char),
            false,
        )),
        ExprKind::Str(chars) => Ok(gen_string_lit(ctx, chars)),
        ExprKind::Ident(name) => gen_ident(ctx, scope, name, expr.span),
        ExprKind::BinOp(op) => gen_binop(ctx, scope, op, expr.span),
        ExprKind::UnaryOp(op) => gen_unary(ctx, scope, op, expr.span),
        ExprKind::Subscript(sub) => gen_subscript(ctx, scope, sub, expr.span),
        ExprKind::Call(call) => gen_call(ctx, scope, call, expr.span),
        ExprKind::Cast(cast) => gen_cast(ctx, scope, cast, expr.span),
    }
}

fn gen_int_lit<'ctx>(ctx: &CGContext<'ctx>, lit: IntLit) -> Value<'ctx> {
    match lit {
        IntLit::I32(v) => Value::new(
            ctx.llcx.i32_type().const_int(v as u64, true).into(),
            Type::builtin(BuiltinKind::I32),
            true,
        ),
        IntLit::U32(v) => Value::new(
            ctx.llcx.i32_type().const_int(u64::from(v), false).into(),
            Type::builtin(BuiltinKind::U32),
            false,
        ),
        IntLit::I64(v) => Value::new(
            ctx.llcx.i64_type().const_int(v as u64, true).into(),
            Type::builtin(BuiltinKind::I64),
            true,
        ),
        IntLit::U64(v) => Value::new(
            ctx.llcx.i64_type().const_int(v, false).into(),
            Type::builtin(BuiltinKind::U64),
            false,
        ),
    }
}

/// A string literal is a private constant array of UTF-32 code points with a
/// 0 terminator; the value is a pointer to its first element.
fn gen_string_lit<'ctx>(ctx: &CGContext<'ctx>, chars: &[char]) -> Value<'ctx> {
    let i32_ty = ctx.llcx.i32_type();
    let mut units: Vec<_> = chars
        .iter()
        .map(|&c| i32_ty.const_int(u64::from(c as u32), false))
        .collect();
    units.push(i32_ty.const_int(0, false));

    let array = i32_ty.const_array(&units);
    let global = ctx
        .module
        .add_global(i32_ty.array_type(units.len() as u32), None, &ctx.next_str_name());
    global.set_initializer(&array);
    global.set_constant(true);
    global.set_linkage(inkwell::module::Linkage::Private);

    Value::new(
        global.as_pointer_value().into(),
        Type::pointer(Type::builtin(BuiltinKind::Char)),
        false,
    )
}

fn gen_ident<'ctx>(
    ctx: &CGContext<'ctx>,
    scope: &SymbolTable<'ctx>,
    name: &str,
    span: Span,
) -> Result<Value<'ctx>, Diagnostic> {
    let var = scope.lookup(name).ok_or_else(|| {
        Diagnostic::new(
            ErrorKind::UnknownName,
            span,
            format!("unknown variable name '{name}'"),
        )
    })?;

    lower_basic(ctx, var.ty(), span)?;
    let loaded = ctx
        .builder
        .build_load(var.ptr(), name)
        .expect("load");

    // References dereference implicitly on use.
    if let Some(refee) = var.ty().refee(&ctx.user_types) {
        let refee = refee.clone();
        lower_basic(ctx, &refee, span)?;
        let value = ctx
            .builder
            .build_load(loaded.into_pointer_value(), name)
            .expect("load");
        let is_signed = refee.is_signed(&ctx.user_types);
        return Ok(Value::new(value, refee, is_signed));
    }

    Ok(Value::new(loaded, var.ty().clone(), var.is_signed()))
}

fn gen_binop<'ctx>(
    ctx: &CGContext<'ctx>,
    scope: &SymbolTable<'ctx>,
    op: &BinOp,
    span: Span,
) -> Result<Value<'ctx>, Diagnostic> {
    let lhs = gen_expr(ctx, scope, &op.lhs)?;
    let rhs = gen_expr(ctx, scope, &op.rhs)?;

    let (Some(lhs_v), Some(rhs_v)) = (lhs.value(), rhs.value()) else {
        return Err(Diagnostic::new(
            ErrorKind::TypeMismatch,
            span,
            "void value used as an operand",
        ));
    };
    if lhs_v.get_type() != rhs_v.get_type() {
        return Err(Diagnostic::new(
            ErrorKind::TypeMismatch,
            span,
            "both operands to a binary operator are not of the same type",
        ));
    }

    let either_signed = lhs.is_signed() || rhs.is_signed();
    let kind = op.kind();

    if kind.is_arithmetic() {
        let b = &ctx.builder;
        let value: BasicValueEnum<'ctx> = match (lhs_v, rhs_v) {
            (BasicValueEnum::IntValue(l), BasicValueEnum::IntValue(r)) => match kind {
                BinOpKind::Add => b.build_int_add(l, r, "add").expect("add").into(),
                BinOpKind::Sub => b.build_int_sub(l, r, "sub").expect("sub").into(),
                BinOpKind::Mul => b.build_int_mul(l, r, "mul").expect("mul").into(),
                BinOpKind::Div if either_signed => {
                    b.build_int_signed_div(l, r, "sdiv").expect("sdiv").into()
                }
                BinOpKind::Div => b.build_int_unsigned_div(l, r, "udiv").expect("udiv").into(),
                BinOpKind::Mod if either_signed => {
                    b.build_int_signed_rem(l, r, "srem").expect("srem").into()
                }
                BinOpKind::Mod => b.build_int_unsigned_rem(l, r, "urem").expect("urem").into(),
                _ => unreachable!("arithmetic kind"),
            },
            (BasicValueEnum::FloatValue(l), BasicValueEnum::FloatValue(r)) => match kind {
                BinOpKind::Add => b.build_float_add(l, r, "fadd").expect("fadd").into(),
                BinOpKind::Sub => b.build_float_sub(l, r, "fsub").expect("fsub").into(),
                BinOpKind::Mul => b.build_float_mul(l, r, "fmul").expect("fmul").into(),
                BinOpKind::Div => b.build_float_div(l, r, "fdiv").expect("fdiv").into(),
                BinOpKind::Mod => b.build_float_rem(l, r, "frem").expect("frem").into(),
                _ => unreachable!("arithmetic kind"),
            },
            _ => {
                return Err(Diagnostic::new(
                    ErrorKind::InvalidOperator,
                    span,
                    format!("operator '{}' requires integer or floating operands", op.op),
                ))
            }
        };
        let ty = lhs.ty().clone();
        return Ok(Value::new(value, ty, either_signed));
    }

    if kind.is_comparison() {
        let value = match (lhs_v, rhs_v) {
            (BasicValueEnum::IntValue(l), BasicValueEnum::IntValue(r)) => {
                let pred = int_predicate(kind, either_signed);
                ctx.builder.build_int_compare(pred, l, r, "cmp").expect("icmp")
            }
            (BasicValueEnum::FloatValue(l), BasicValueEnum::FloatValue(r)) => {
                let pred = float_predicate(kind);
                ctx.builder.build_float_compare(pred, l, r, "fcmp").expect("fcmp")
            }
            (BasicValueEnum::PointerValue(l), BasicValueEnum::PointerValue(r)) => {
                let pred = int_predicate(kind, false);
                ctx.builder.build_int_compare(pred, l, r, "pcmp").expect("pcmp")
            }
            _ => {
                return Err(Diagnostic::new(
                    ErrorKind::InvalidOperator,
                    span,
                    format!("operator '{}' is not defined for these operands", op.op),
                ))
            }
        };
        return Ok(Value::new(
            value.into(),
            Type::builtin(BuiltinKind::Bool),
            false,
        ));
    }

    Err(Diagnostic::new(
        ErrorKind::InvalidOperator,
        span,
        format!("unknown binary operator '{}'", op.op),
    ))
}

fn int_predicate(kind: BinOpKind, signed: bool) -> IntPredicate {
    match (kind, signed) {
        (BinOpKind::Eq, _) => IntPredicate::EQ,
        (BinOpKind::Neq, _) => IntPredicate::NE,
        (BinOpKind::Lt, true) => IntPredicate::SLT,
        (BinOpKind::Lt, false) => IntPredicate::ULT,
        (BinOpKind::Gt, true) => IntPredicate::SGT,
        (BinOpKind::Gt, false) => IntPredicate::UGT,
        (BinOpKind::Le, true) => IntPredicate::SLE,
        (BinOpKind::Le, false) => IntPredicate::ULE,
        (BinOpKind::Ge, true) => IntPredicate::SGE,
        (BinOpKind::Ge, false) => IntPredicate::UGE,
        _ => unreachable!("comparison kind"),
    }
}

fn float_predicate(kind: BinOpKind) -> FloatPredicate {
    match kind {
        BinOpKind::Eq => FloatPredicate::OEQ,
        BinOpKind::Neq => FloatPredicate::ONE,
        BinOpKind::Lt => FloatPredicate::OLT,
        BinOpKind::Gt => FloatPredicate::OGT,
        BinOpKind::Le => FloatPredicate::OLE,
        BinOpKind::Ge => FloatPredicate::OGE,
        _ => unreachable!("comparison kind"),
    }
}

fn gen_unary<'ctx>(
    ctx: &CGContext<'ctx>,
    scope: &SymbolTable<'ctx>,
    op: &UnaryOp,
    span: Span,
) -> Result<Value<'ctx>, Diagnostic> {
    match op.kind() {
        UnaryOpKind::Plus => gen_expr(ctx, scope, &op.rhs),
        UnaryOpKind::Minus => {
            let value = gen_expr(ctx, scope, &op.rhs)?;
            match value.value() {
                Some(BasicValueEnum::IntValue(v)) => {
                    if !value.is_signed() {
                        return Err(Diagnostic::new(
                            ErrorKind::InvalidOperator,
                            span,
                            "unary minus is not defined for unsigned operands",
                        ));
                    }
                    let neg = ctx.builder.build_int_neg(v, "neg").expect("neg");
                    Ok(Value::new(neg.into(), value.ty().clone(), true))
                }
                Some(BasicValueEnum::FloatValue(v)) => {
                    let neg = ctx.builder.build_float_neg(v, "fneg").expect("fneg");
                    Ok(Value::new(neg.into(), value.ty().clone(), true))
                }
                _ => Err(Diagnostic::new(
                    ErrorKind::InvalidOperator,
                    span,
                    "unary minus requires a numeric operand",
                )),
            }
        }
        UnaryOpKind::Not => {
            let value = gen_expr(ctx, scope, &op.rhs)?;
            let Some(BasicValueEnum::IntValue(v)) = value.value() else {
                return Err(Diagnostic::new(
                    ErrorKind::InvalidOperator,
                    span,
                    "logical not requires an integer operand",
                ));
            };
            let zero = v.get_type().const_zero();
            let cmp = ctx
                .builder
                .build_int_compare(IntPredicate::EQ, v, zero, "not")
                .expect("icmp");
            Ok(Value::new(cmp.into(), Type::builtin(BuiltinKind::Bool), false))
        }
        UnaryOpKind::AddressOf => {
            let place = gen_lvalue(ctx, scope, &op.rhs, false)?;
            Ok(Value::new(
                place.ptr.into(),
                Type::pointer(place.ty),
                false,
            ))
        }
        UnaryOpKind::Indirection => {
            let value = gen_expr(ctx, scope, &op.rhs)?;
            let pointee = value
                .ty()
                .pointee(&ctx.user_types)
                .or_else(|| value.ty().refee(&ctx.user_types))
                .cloned()
                .ok_or_else(|| {
                    Diagnostic::new(
                        ErrorKind::InvalidOperator,
                        span,
                        "indirection requires a pointer or reference",
                    )
                })?;
            let Some(BasicValueEnum::PointerValue(ptr)) = value.value() else {
                return Err(Diagnostic::internal(span, "pointer value expected"));
            };
            lower_basic(ctx, &pointee, span)?;
            let loaded = ctx
                .builder
                .build_load(ptr, "deref")
                .expect("load");
            let is_signed = pointee.is_signed(&ctx.user_types);
            Ok(Value::new(loaded, pointee, is_signed))
        }
        UnaryOpKind::Unknown => Err(Diagnostic::new(
            ErrorKind::InvalidOperator,
            span,
            format!("unknown unary operator '{}'", op.op),
        )),
    }
}

fn gen_subscript<'ctx>(
    ctx: &CGContext<'ctx>,
    scope: &SymbolTable<'ctx>,
    sub: &Subscript,
    span: Span,
) -> Result<Value<'ctx>, Diagnostic> {
    let ExprKind::Ident(name) = &sub.ident.kind else {
        return Err(Diagnostic::new(
            ErrorKind::InvalidLValue,
            sub.ident.span,
            "subscript requires a named array or pointer",
        ));
    };
    let var = scope.lookup(name).ok_or_else(|| {
        Diagnostic::new(
            ErrorKind::UnknownName,
            sub.ident.span,
            format!("unknown variable name '{name}'"),
        )
    })?;

    let index = gen_expr(ctx, scope, &sub.index)?;
    if !index.ty().is_integer(&ctx.user_types) {
        return Err(Diagnostic::new(
            ErrorKind::TypeMismatch,
            sub.index.span,
            "subscript index must be an integer",
        ));
    }
    let idx = index.int_value().ok_or_else(|| {
        Diagnostic::internal(sub.index.span, "integer index did not lower to an integer")
    })?;

    let var_ty = var.ty().clone();
    let (elem_ptr, elem_ty) = if let Some(element) = var_ty.element(&ctx.user_types) {
        lower_basic(ctx, &var_ty, span)?;
        let zero = ctx.llcx.i64_type().const_zero();
        let ptr = unsafe {
            ctx.builder
                .build_in_bounds_gep(var.ptr(), &[zero, idx], "elem")
                .expect("gep")
        };
        (ptr, element.clone())
    } else if let Some(pointee) = var_ty.pointee(&ctx.user_types) {
        lower_basic(ctx, &var_ty, span)?;
        let base = ctx
            .builder
            .build_load(var.ptr(), name)
            .expect("load")
            .into_pointer_value();
        lower_basic(ctx, pointee, span)?;
        let ptr = unsafe {
            ctx.builder
                .build_in_bounds_gep(base, &[idx], "elem")
                .expect("gep")
        };
        (ptr, pointee.clone())
    } else {
        return Err(Diagnostic::new(
            ErrorKind::TypeMismatch,
            sub.ident.span,
            format!("'{name}' is not an array or pointer"),
        ));
    };

    lower_basic(ctx, &elem_ty, span)?;
    let loaded = ctx
        .builder
        .build_load(elem_ptr, "elemval")
        .expect("load");
    let is_signed = elem_ty.is_signed(&ctx.user_types);
    Ok(Value::new(loaded, elem_ty, is_signed))
}

fn gen_call<'ctx>(
    ctx: &CGContext<'ctx>,
    scope: &SymbolTable<'ctx>,
    call: &Call,
    span: Span,
) -> Result<Value<'ctx>, Diagnostic> {
    let args = call
        .args
        .iter()
        .map(|arg| gen_expr(ctx, scope, arg))
        .collect::<Result<Vec<_>, _>>()?;
    if let Some(void_pos) = args.iter().position(Value::is_void) {
        return Err(Diagnostic::new(
            ErrorKind::TypeMismatch,
            call.args[void_pos].span,
            "void value used as a call argument",
        ));
    }

    let arg_types: Vec<&Type> = args.iter().map(Value::ty).collect();
    let mut candidates = ctx
        .mangler
        .mangle_call_candidates(&ctx.namespaces, &ctx.user_types, &call.callee, &arg_types)
        .ok_or_else(|| {
            Diagnostic::new(
                ErrorKind::UnknownName,
                span,
                "argument type names an unknown user type",
            )
        })?;
    // External C symbols resolve by their plain name, after every mangled form.
    candidates.push(call.callee.clone());

    let (symbol, func) = candidates
        .iter()
        .find_map(|name| ctx.module.get_function(name).map(|f| (name.clone(), f)))
        .ok_or_else(|| {
            Diagnostic::new(
                ErrorKind::UnknownName,
                call.callee_span,
                format!("unknown function '{}' referenced", call.callee),
            )
        })?;

    let fn_ty = func.get_type();
    let fixed = fn_ty.count_param_types() as usize;
    let arity_ok = if fn_ty.is_var_arg() {
        args.len() >= fixed
    } else {
        args.len() == fixed
    };
    if !arity_ok {
        return Err(Diagnostic::new(
            ErrorKind::ArityOrArgType,
            span,
            format!(
                "'{}' expects {} argument(s), {} given",
                call.callee,
                fixed,
                args.len()
            ),
        ));
    }
    for (i, param_ty) in fn_ty.get_param_types().iter().enumerate() {
        let arg_ty = args[i].value().expect("non-void argument").get_type();
        if *param_ty != inkwell::types::BasicMetadataTypeEnum::from(arg_ty) {
            return Err(Diagnostic::new(
                ErrorKind::ArityOrArgType,
                call.args[i].span,
                format!("argument {} has the wrong type for '{}'", i + 1, call.callee),
            ));
        }
    }

    let meta_args: Vec<BasicMetadataValueEnum<'ctx>> = args
        .iter()
        .map(|a| a.value().expect("non-void argument").into())
        .collect();
    let site = ctx
        .builder
        .build_call(func, &meta_args, "call")
        .expect("call");

    match site.try_as_basic_value().left() {
        Some(result) => {
            let ret_ty = ctx.return_types.get(&symbol).cloned().ok_or_else(|| {
                Diagnostic::internal(span, format!("no return type recorded for '{symbol}'"))
            })?;
            let is_signed = ret_ty.is_signed(&ctx.user_types);
            Ok(Value::new(result, ret_ty, is_signed))
        }
        None => Ok(Value::void()),
    }
}

fn gen_cast<'ctx>(
    ctx: &CGContext<'ctx>,
    scope: &SymbolTable<'ctx>,
    cast: &Cast,
    span: Span,
) -> Result<Value<'ctx>, Diagnostic> {
    let value = gen_expr(ctx, scope, &cast.lhs)?;
    let target = &cast.ty.ty;
    let types = &ctx.user_types;

    let target_ok = target.is_integer(types)
        || target.is_floating(types)
        || target.is_pointer(types)
        || target.is_reference(types);
    if !target_ok {
        return Err(Diagnostic::new(
            ErrorKind::InvalidOperator,
            cast.ty.span,
            format!("cannot cast to '{}'", target.display_name()),
        ));
    }

    let Some(src_v) = value.value() else {
        return Err(Diagnostic::new(
            ErrorKind::TypeMismatch,
            cast.lhs.span,
            "cannot cast a void value",
        ));
    };
    let target_signed = target.is_signed(types);

    let result: BasicValueEnum<'ctx> = match src_v {
        BasicValueEnum::IntValue(v) => {
            if target.is_integer(types) {
                let target_ty = lower_basic(ctx, target, cast.ty.span)?.into_int_type();
                ctx.builder
                    .build_int_cast_sign_flag(v, target_ty, value.is_signed(), "icast")
                    .expect("icast")
                    .into()
            } else if target.is_floating(types) {
                let target_ty = lower_basic(ctx, target, cast.ty.span)?.into_float_type();
                if value.is_signed() {
                    ctx.builder
                        .build_signed_int_to_float(v, target_ty, "sitofp")
                        .expect("sitofp")
                        .into()
                } else {
                    ctx.builder
                        .build_unsigned_int_to_float(v, target_ty, "uitofp")
                        .expect("uitofp")
                        .into()
                }
            } else if target.is_pointer(types) || target.is_reference(types) {
                warn!("integer to pointer cast");
                let ptr_ty = ctx.llcx.i8_type().ptr_type(inkwell::AddressSpace::default());
                ctx.builder
                    .build_int_to_ptr(v, ptr_ty, "itop")
                    .expect("itop")
                    .into()
            } else {
                unreachable!("validated cast target")
            }
        }
        BasicValueEnum::FloatValue(v) => {
            if target.is_floating(types) {
                let src_ty = v.get_type();
                let target_ty = lower_basic(ctx, target, cast.ty.span)?.into_float_type();
                if src_ty == target_ty {
                    v.into()
                } else if target_ty == ctx.llcx.f64_type() {
                    ctx.builder
                        .build_float_ext(v, target_ty, "fpext")
                        .expect("fpext")
                        .into()
                } else {
                    ctx.builder
                        .build_float_trunc(v, target_ty, "fptrunc")
                        .expect("fptrunc")
                        .into()
                }
            } else if target.is_integer(types) {
                let target_ty = lower_basic(ctx, target, cast.ty.span)?.into_int_type();
                if target_signed {
                    ctx.builder
                        .build_float_to_signed_int(v, target_ty, "fptosi")
                        .expect("fptosi")
                        .into()
                } else {
                    ctx.builder
                        .build_float_to_unsigned_int(v, target_ty, "fptoui")
                        .expect("fptoui")
                        .into()
                }
            } else {
                return Err(Diagnostic::new(
                    ErrorKind::InvalidOperator,
                    span,
                    "cannot cast a floating value to a pointer",
                ));
            }
        }
        BasicValueEnum::PointerValue(v) => {
            if target.is_pointer(types) || target.is_reference(types) {
                // Pointers are opaque; a pointer bit-cast is a retype.
                v.into()
            } else if target.is_integer(types) {
                warn!("pointer to integer cast");
                let target_ty = lower_basic(ctx, target, cast.ty.span)?.into_int_type();
                ctx.builder
                    .build_ptr_to_int(v, target_ty, "ptoi")
                    .expect("ptoi")
                    .into()
            } else {
                return Err(Diagnostic::new(
                    ErrorKind::InvalidOperator,
                    span,
                    "cannot cast a pointer to a floating value",
                ));
            }
        }
        _ => {
            return Err(Diagnostic::new(
                ErrorKind::InvalidOperator,
                span,
                "this value cannot be cast",
            ))
        }
    };

    let mut ty = target.clone();
    ty.set_mutable(false);
    Ok(Value::new(result, ty, target_signed))
}
