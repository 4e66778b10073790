//! Statement lowering and control-flow graph construction.
//!
//! The visitor threads four context cursors through every statement: where
//! the return value is stored, the function epilogue block, and the nearest
//! loop's break/continue targets. Unused cursors are `None`; `break` or
//! `continue` with a `None` cursor is a diagnostic.
//!
//! Every statement is lowered against a snapshot of its enclosing scope, so
//! bindings created inside a block never escape it. Within a compound
//! statement, emission stops as soon as the current block gains a
//! terminator.

use inkwell::basic_block::BasicBlock;
use inkwell::types::BasicTypeEnum;
use inkwell::values::{AggregateValueEnum, BasicValueEnum, FunctionValue, IntValue, PointerValue};
use inkwell::IntPredicate;

use opal_ast::{
    Assign, AssignKind, For, ForInit, ForStep, If, IncDecKind, Initializer, Loop, PreIncDec,
    Stmt, StmtKind, VarDef, VarQualifier, While,
};
use opal_diagnostic::{Diagnostic, ErrorKind, Span};
use opal_types::Type;

use crate::context::CGContext;
use crate::expr::{gen_expr, gen_lvalue};
use crate::symbol::{SymbolTable, Value, Variable};
use crate::types::lower_basic;

/// The per-function cursors threaded through statement lowering.
#[derive(Clone, Copy)]
pub struct StmtContext<'ctx> {
    /// Storage for the return value; `None` in `void` functions.
    pub retvar: Option<PointerValue<'ctx>>,
    /// The function epilogue block `return` branches to.
    pub end_bb: BasicBlock<'ctx>,
    /// `break` target of the nearest enclosing loop.
    pub break_bb: Option<BasicBlock<'ctx>>,
    /// `continue` target of the nearest enclosing loop.
    pub continue_bb: Option<BasicBlock<'ctx>>,
}

/// Lower a statement in a fresh child scope.
///
/// Compound statements iterate their children in that one child scope and
/// stop once the current block is terminated; any other statement is lowered
/// directly. This mirrors lexical scoping: the snapshot is dropped on exit.
pub fn gen_block_stmt<'ctx>(
    ctx: &CGContext<'ctx>,
    scope: &SymbolTable<'ctx>,
    sctx: StmtContext<'ctx>,
    stmt: &Stmt,
) -> Result<(), Diagnostic> {
    let mut inner = scope.clone();
    if let StmtKind::Compound(stmts) = &stmt.kind {
        for s in stmts {
            gen_stmt(ctx, &mut inner, sctx, s)?;
            if ctx.block_terminated() {
                break;
            }
        }
        return Ok(());
    }
    gen_stmt(ctx, &mut inner, sctx, stmt)
}

fn gen_stmt<'ctx>(
    ctx: &CGContext<'ctx>,
    scope: &mut SymbolTable<'ctx>,
    sctx: StmtContext<'ctx>,
    stmt: &Stmt,
) -> Result<(), Diagnostic> {
    match &stmt.kind {
        StmtKind::Nil => Ok(()),
        StmtKind::Compound(_) => gen_block_stmt(ctx, scope, sctx, stmt),
        StmtKind::Expr(expr) => {
            gen_expr(ctx, scope, expr)?;
            Ok(())
        }
        StmtKind::Return(expr) => gen_return(ctx, scope, sctx, expr.as_ref(), stmt.span),
        StmtKind::VarDef(def) => gen_var_def(ctx, scope, def, stmt.span),
        StmtKind::Assign(assign) => gen_assign(ctx, scope, assign, stmt.span),
        StmtKind::PreIncDec(node) => gen_pre_inc_dec(ctx, scope, node, stmt.span),
        StmtKind::Break => match sctx.break_bb {
            Some(bb) => {
                ctx.builder.build_unconditional_branch(bb).expect("br");
                Ok(())
            }
            None => Err(Diagnostic::new(
                ErrorKind::BreakContinueOutsideLoop,
                stmt.span,
                "break outside of a loop",
            )),
        },
        StmtKind::Continue => match sctx.continue_bb {
            Some(bb) => {
                ctx.builder.build_unconditional_branch(bb).expect("br");
                Ok(())
            }
            None => Err(Diagnostic::new(
                ErrorKind::BreakContinueOutsideLoop,
                stmt.span,
                "continue outside of a loop",
            )),
        },
        StmtKind::If(node) => gen_if(ctx, scope, sctx, node, stmt.span),
        StmtKind::Loop(node) => gen_loop(ctx, scope, sctx, node),
        StmtKind::While(node) => gen_while(ctx, scope, sctx, node, stmt.span),
        StmtKind::For(node) => gen_for(ctx, scope, sctx, node, stmt.span),
    }
}

fn current_function<'ctx>(ctx: &CGContext<'ctx>) -> FunctionValue<'ctx> {
    ctx.builder
        .get_insert_block()
        .expect("insertion point")
        .get_parent()
        .expect("parent function")
}

/// Create an alloca in the entry block of the function, so every local's
/// storage dominates its uses.
pub(crate) fn create_entry_block_alloca<'ctx>(
    ctx: &CGContext<'ctx>,
    func: FunctionValue<'ctx>,
    name: &str,
    ty: BasicTypeEnum<'ctx>,
) -> PointerValue<'ctx> {
    let tmp = ctx.llcx.create_builder();
    let entry = func.get_first_basic_block().expect("entry block");
    match entry.get_first_instruction() {
        Some(first) => tmp.position_before(&first),
        None => tmp.position_at_end(entry),
    }
    tmp.build_alloca(ty, name).expect("alloca")
}

/// Compare a condition value not-equal to zero, yielding an `i1`.
fn cond_to_bool<'ctx>(
    ctx: &CGContext<'ctx>,
    value: &Value<'ctx>,
    span: Span,
) -> Result<IntValue<'ctx>, Diagnostic> {
    let Some(BasicValueEnum::IntValue(v)) = value.value() else {
        return Err(Diagnostic::new(
            ErrorKind::TypeMismatch,
            span,
            "condition must be an integer",
        ));
    };
    let zero = v.get_type().const_zero();
    Ok(ctx
        .builder
        .build_int_compare(IntPredicate::NE, v, zero, "cond")
        .expect("icmp"))
}

fn gen_return<'ctx>(
    ctx: &CGContext<'ctx>,
    scope: &SymbolTable<'ctx>,
    sctx: StmtContext<'ctx>,
    expr: Option<&opal_ast::Expr>,
    span: Span,
) -> Result<(), Diagnostic> {
    if let Some(expr) = expr {
        let value = gen_expr(ctx, scope, expr)?;
        let fn_ret = current_function(ctx).get_type().get_return_type();
        match (fn_ret, value.value()) {
            (Some(ret_ty), Some(v)) if ret_ty == v.get_type() => {
                let retvar = sctx
                    .retvar
                    .ok_or_else(|| Diagnostic::internal(span, "missing return slot"))?;
                ctx.builder.build_store(retvar, v).expect("store");
            }
            _ => {
                return Err(Diagnostic::new(
                    ErrorKind::TypeMismatch,
                    span,
                    "incompatible type for result type",
                ))
            }
        }
    }
    ctx.builder
        .build_unconditional_branch(sctx.end_bb)
        .expect("br");
    Ok(())
}

pub(crate) fn gen_var_def<'ctx>(
    ctx: &CGContext<'ctx>,
    scope: &mut SymbolTable<'ctx>,
    def: &VarDef,
    span: Span,
) -> Result<(), Diagnostic> {
    if def.ty.is_none() && def.init.is_none() {
        return Err(Diagnostic::new(
            ErrorKind::TypeMismatch,
            span,
            "type inference requires an initializer",
        ));
    }
    if scope.exists(&def.name) {
        return Err(Diagnostic::new(
            ErrorKind::Redefinition,
            span,
            format!("redefinition of '{}'", def.name),
        ));
    }

    let func = current_function(ctx);
    let is_mutable = matches!(def.qualifier, Some(VarQualifier::Mutable));

    let (alloca, ty, is_signed) = if let Some(ty_ast) = &def.ty {
        let mut ty = ty_ast.ty.resolved(&ctx.user_types).ok_or_else(|| {
            Diagnostic::new(
                ErrorKind::UnknownName,
                ty_ast.span,
                format!("unknown type name '{}'", ty_ast.ty.display_name()),
            )
        })?;
        ty.set_mutable(is_mutable);
        let alloca = create_variable_with_type(ctx, scope, func, def, &ty, span)?;
        let is_signed = ty.is_signed(&ctx.user_types);
        (alloca, ty, is_signed)
    } else {
        create_variable_with_type_inference(
            ctx,
            scope,
            func,
            &def.name,
            def.init.as_ref().expect("checked initializer"),
            is_mutable,
            span,
        )?
    };

    scope.register(&def.name, Variable::new(alloca, ty, is_mutable, is_signed));
    Ok(())
}

fn create_variable_with_type<'ctx>(
    ctx: &CGContext<'ctx>,
    scope: &SymbolTable<'ctx>,
    func: FunctionValue<'ctx>,
    def: &VarDef,
    ty: &Type,
    span: Span,
) -> Result<PointerValue<'ctx>, Diagnostic> {
    let llvm_ty = lower_basic(ctx, ty, span)?;
    let alloca = create_entry_block_alloca(ctx, func, &def.name, llvm_ty);

    let Some(init) = &def.init else {
        return Ok(alloca);
    };

    match init {
        Initializer::List(items) => {
            if !ty.is_array(&ctx.user_types) {
                return Err(Diagnostic::new(
                    ErrorKind::TypeMismatch,
                    span,
                    "an initializer list requires an array type",
                ));
            }
            let size = ty.array_size(&ctx.user_types).expect("array size");
            if size != items.len() as u64 {
                return Err(Diagnostic::new(
                    ErrorKind::TypeMismatch,
                    span,
                    "invalid number of elements in initializer list",
                ));
            }
            let elem_llvm = lower_basic(ctx, ty.element(&ctx.user_types).expect("element"), span)?;
            let values = gen_init_list(ctx, scope, items)?;
            for (value, item) in values.iter().zip(items) {
                if value.value().expect("non-void element").get_type() != elem_llvm {
                    return Err(Diagnostic::new(
                        ErrorKind::TypeMismatch,
                        item.span,
                        "initializer element type and array element type are different",
                    ));
                }
            }
            let raw: Vec<BasicValueEnum<'ctx>> = values
                .iter()
                .map(|v| v.value().expect("non-void element"))
                .collect();
            init_array(ctx, alloca, llvm_ty.into_array_type(), &raw);
        }
        Initializer::Expr(expr) => {
            let value = gen_expr(ctx, scope, expr)?;
            let Some(v) = value.value() else {
                return Err(Diagnostic::new(
                    ErrorKind::TypeMismatch,
                    expr.span,
                    "cannot initialize a variable from a void value",
                ));
            };
            if v.get_type() != llvm_ty {
                return Err(Diagnostic::new(
                    ErrorKind::TypeMismatch,
                    span,
                    "initializer type and variable type are different",
                ));
            }
            ctx.builder.build_store(alloca, v).expect("store");
        }
    }
    Ok(alloca)
}

fn create_variable_with_type_inference<'ctx>(
    ctx: &CGContext<'ctx>,
    scope: &SymbolTable<'ctx>,
    func: FunctionValue<'ctx>,
    name: &str,
    init: &Initializer,
    is_mutable: bool,
    span: Span,
) -> Result<(PointerValue<'ctx>, Type, bool), Diagnostic> {
    match init {
        Initializer::List(items) => {
            let values = gen_init_list(ctx, scope, items)?;
            let Some(first) = values.first() else {
                return Err(Diagnostic::new(
                    ErrorKind::TypeMismatch,
                    span,
                    "cannot infer a type from an empty initializer list",
                ));
            };
            let first_llvm = first.value().expect("non-void element").get_type();
            for (value, item) in values.iter().zip(items) {
                if value.value().expect("non-void element").get_type() != first_llvm {
                    return Err(Diagnostic::new(
                        ErrorKind::TypeMismatch,
                        item.span,
                        "initializer list elements are not all of the same type",
                    ));
                }
            }

            let mut elem_ty = first.ty().clone();
            elem_ty.set_mutable(is_mutable);
            let mut ty = Type::array(elem_ty, values.len() as u64);
            ty.set_mutable(is_mutable);

            let array_ty = lower_basic(ctx, &ty, span)?.into_array_type();
            let alloca = create_entry_block_alloca(ctx, func, name, array_ty.into());
            let raw: Vec<BasicValueEnum<'ctx>> = values
                .iter()
                .map(|v| v.value().expect("non-void element"))
                .collect();
            init_array(ctx, alloca, array_ty, &raw);
            Ok((alloca, ty, false))
        }
        Initializer::Expr(expr) => {
            let value = gen_expr(ctx, scope, expr)?;
            let Some(v) = value.value() else {
                return Err(Diagnostic::new(
                    ErrorKind::TypeMismatch,
                    expr.span,
                    "cannot infer a type from a void value",
                ));
            };
            let mut ty = value.ty().clone();
            ty.set_mutable(is_mutable);
            let alloca = create_entry_block_alloca(ctx, func, name, v.get_type());
            ctx.builder.build_store(alloca, v).expect("store");
            Ok((alloca, ty, value.is_signed()))
        }
    }
}

fn gen_init_list<'ctx>(
    ctx: &CGContext<'ctx>,
    scope: &SymbolTable<'ctx>,
    items: &[opal_ast::Expr],
) -> Result<Vec<Value<'ctx>>, Diagnostic> {
    items
        .iter()
        .map(|item| {
            let value = gen_expr(ctx, scope, item)?;
            if value.is_void() {
                return Err(Diagnostic::new(
                    ErrorKind::TypeMismatch,
                    item.span,
                    "void value in initializer list",
                ));
            }
            Ok(value)
        })
        .collect()
}

/// Build the aggregate with an insert-value chain and store it to the
/// variable's storage.
fn init_array<'ctx>(
    ctx: &CGContext<'ctx>,
    alloca: PointerValue<'ctx>,
    array_ty: inkwell::types::ArrayType<'ctx>,
    values: &[BasicValueEnum<'ctx>],
) {
    let mut agg: AggregateValueEnum<'ctx> = array_ty.get_undef().into();
    for (i, value) in values.iter().enumerate() {
        agg = ctx
            .builder
            .build_insert_value(agg, *value, i as u32, "init")
            .expect("insert_value");
    }
    let AggregateValueEnum::ArrayValue(array) = agg else {
        unreachable!("array aggregate");
    };
    ctx.builder.build_store(alloca, array).expect("store");
}

pub(crate) fn gen_assign<'ctx>(
    ctx: &CGContext<'ctx>,
    scope: &SymbolTable<'ctx>,
    assign: &Assign,
    span: Span,
) -> Result<(), Diagnostic> {
    let kind = assign.kind();
    if kind == AssignKind::Unknown {
        return Err(Diagnostic::new(
            ErrorKind::InvalidOperator,
            span,
            format!("unknown assignment operator '{}'", assign.op),
        ));
    }

    let place = gen_lvalue(ctx, scope, &assign.lhs, true)?;
    let rhs = gen_expr(ctx, scope, &assign.rhs)?;
    let Some(rhs_v) = rhs.value() else {
        return Err(Diagnostic::new(
            ErrorKind::TypeMismatch,
            assign.rhs.span,
            "cannot assign a void value",
        ));
    };

    let lhs_llvm = lower_basic(ctx, &place.ty, span)?;
    if lhs_llvm != rhs_v.get_type() {
        return Err(Diagnostic::new(
            ErrorKind::TypeMismatch,
            span,
            "both operands to a binary operator are not of the same type",
        ));
    }

    if kind == AssignKind::Direct {
        ctx.builder.build_store(place.ptr, rhs_v).expect("store");
        return Ok(());
    }

    // Compound assignment: load, apply, store back.
    let current = ctx
        .builder
        .build_load(place.ptr, "lhsval")
        .expect("load");
    let result_signed = place.is_signed || rhs.is_signed();
    let b = &ctx.builder;
    let result: BasicValueEnum<'ctx> = match (current, rhs_v) {
        (BasicValueEnum::IntValue(l), BasicValueEnum::IntValue(r)) => match kind {
            AssignKind::Add => b.build_int_add(l, r, "add").expect("add").into(),
            AssignKind::Sub => b.build_int_sub(l, r, "sub").expect("sub").into(),
            AssignKind::Mul => b.build_int_mul(l, r, "mul").expect("mul").into(),
            AssignKind::Div if result_signed => {
                b.build_int_signed_div(l, r, "sdiv").expect("sdiv").into()
            }
            AssignKind::Div => b.build_int_unsigned_div(l, r, "udiv").expect("udiv").into(),
            AssignKind::Mod if result_signed => {
                b.build_int_signed_rem(l, r, "srem").expect("srem").into()
            }
            AssignKind::Mod => b.build_int_unsigned_rem(l, r, "urem").expect("urem").into(),
            AssignKind::Direct | AssignKind::Unknown => unreachable!("compound kind"),
        },
        (BasicValueEnum::FloatValue(l), BasicValueEnum::FloatValue(r)) => match kind {
            AssignKind::Add => b.build_float_add(l, r, "fadd").expect("fadd").into(),
            AssignKind::Sub => b.build_float_sub(l, r, "fsub").expect("fsub").into(),
            AssignKind::Mul => b.build_float_mul(l, r, "fmul").expect("fmul").into(),
            AssignKind::Div => b.build_float_div(l, r, "fdiv").expect("fdiv").into(),
            AssignKind::Mod => b.build_float_rem(l, r, "frem").expect("frem").into(),
            AssignKind::Direct | AssignKind::Unknown => unreachable!("compound kind"),
        },
        _ => {
            return Err(Diagnostic::new(
                ErrorKind::InvalidOperator,
                span,
                format!("operator '{}' requires numeric operands", assign.op),
            ))
        }
    };
    ctx.builder.build_store(place.ptr, result).expect("store");
    Ok(())
}

pub(crate) fn gen_pre_inc_dec<'ctx>(
    ctx: &CGContext<'ctx>,
    scope: &SymbolTable<'ctx>,
    node: &PreIncDec,
    span: Span,
) -> Result<(), Diagnostic> {
    let kind = node.kind();
    if kind == IncDecKind::Unknown {
        return Err(Diagnostic::new(
            ErrorKind::InvalidOperator,
            span,
            format!("unknown operator '{}'", node.op),
        ));
    }

    let place = gen_lvalue(ctx, scope, &node.rhs, true)?;
    if !place.ty.is_integer(&ctx.user_types) {
        return Err(Diagnostic::new(
            ErrorKind::InvalidOperator,
            span,
            format!("operator '{}' requires an integer operand", node.op),
        ));
    }

    lower_basic(ctx, &place.ty, span)?;
    let current = ctx
        .builder
        .build_load(place.ptr, "val")
        .expect("load")
        .into_int_value();
    let one = current.get_type().const_int(1, false);
    let next = match kind {
        IncDecKind::Increment => ctx.builder.build_int_add(current, one, "inc").expect("add"),
        IncDecKind::Decrement => ctx.builder.build_int_sub(current, one, "dec").expect("sub"),
        IncDecKind::Unknown => unreachable!("checked above"),
    };
    ctx.builder.build_store(place.ptr, next).expect("store");
    Ok(())
}

fn gen_if<'ctx>(
    ctx: &CGContext<'ctx>,
    scope: &SymbolTable<'ctx>,
    sctx: StmtContext<'ctx>,
    node: &If,
    span: Span,
) -> Result<(), Diagnostic> {
    let cond_value = gen_expr(ctx, scope, &node.cond)?;
    let cond = cond_to_bool(ctx, &cond_value, node.cond.span.to(span))?;

    let func = current_function(ctx);
    let then_bb = ctx.llcx.append_basic_block(func, "if.then");
    // The else block exists even when the arm is absent.
    let else_bb = ctx.llcx.append_basic_block(func, "if.else");
    let merge_bb = ctx.llcx.append_basic_block(func, "if.merge");

    ctx.builder
        .build_conditional_branch(cond, then_bb, else_bb)
        .expect("cond_br");

    ctx.builder.position_at_end(then_bb);
    gen_block_stmt(ctx, scope, sctx, &node.then)?;
    if !ctx.block_terminated() {
        ctx.builder.build_unconditional_branch(merge_bb).expect("br");
    }

    ctx.builder.position_at_end(else_bb);
    if let Some(else_stmt) = &node.else_ {
        gen_block_stmt(ctx, scope, sctx, else_stmt)?;
    }
    if !ctx.block_terminated() {
        ctx.builder.build_unconditional_branch(merge_bb).expect("br");
    }

    ctx.builder.position_at_end(merge_bb);
    Ok(())
}

fn gen_loop<'ctx>(
    ctx: &CGContext<'ctx>,
    scope: &SymbolTable<'ctx>,
    sctx: StmtContext<'ctx>,
    node: &Loop,
) -> Result<(), Diagnostic> {
    let func = current_function(ctx);
    let body_bb = ctx.llcx.append_basic_block(func, "loop.body");
    let end_bb = ctx.llcx.append_basic_block(func, "loop.end");

    ctx.builder.build_unconditional_branch(body_bb).expect("br");
    ctx.builder.position_at_end(body_bb);

    let loop_ctx = StmtContext {
        break_bb: Some(end_bb),
        continue_bb: Some(body_bb),
        ..sctx
    };
    gen_block_stmt(ctx, scope, loop_ctx, &node.body)?;
    if !ctx.block_terminated() {
        ctx.builder.build_unconditional_branch(body_bb).expect("br");
    }

    ctx.builder.position_at_end(end_bb);
    Ok(())
}

fn gen_while<'ctx>(
    ctx: &CGContext<'ctx>,
    scope: &SymbolTable<'ctx>,
    sctx: StmtContext<'ctx>,
    node: &While,
    span: Span,
) -> Result<(), Diagnostic> {
    let func = current_function(ctx);
    let cond_bb = ctx.llcx.append_basic_block(func, "while.cond");
    let body_bb = ctx.llcx.append_basic_block(func, "while.body");
    let end_bb = ctx.llcx.append_basic_block(func, "while.end");

    ctx.builder.build_unconditional_branch(cond_bb).expect("br");
    ctx.builder.position_at_end(cond_bb);

    let cond_value = gen_expr(ctx, scope, &node.cond)?;
    let cond = cond_to_bool(ctx, &cond_value, node.cond.span.to(span))?;
    ctx.builder
        .build_conditional_branch(cond, body_bb, end_bb)
        .expect("cond_br");

    ctx.builder.position_at_end(body_bb);
    let loop_ctx = StmtContext {
        break_bb: Some(end_bb),
        continue_bb: Some(cond_bb),
        ..sctx
    };
    gen_block_stmt(ctx, scope, loop_ctx, &node.body)?;
    if !ctx.block_terminated() {
        ctx.builder.build_unconditional_branch(cond_bb).expect("br");
    }

    ctx.builder.position_at_end(end_bb);
    Ok(())
}

fn gen_for<'ctx>(
    ctx: &CGContext<'ctx>,
    scope: &SymbolTable<'ctx>,
    sctx: StmtContext<'ctx>,
    node: &For,
    span: Span,
) -> Result<(), Diagnostic> {
    // The induction variable lives in an inner scope covering the whole loop,
    // so it goes out of scope when the loop exits.
    let mut inner = scope.clone();
    if let Some(init) = &node.init {
        match init {
            ForInit::Assign(assign) => gen_assign(ctx, &inner, assign, span)?,
            ForInit::VarDef(def) => gen_var_def(ctx, &mut inner, def, span)?,
        }
    }

    let func = current_function(ctx);
    let cond_bb = ctx.llcx.append_basic_block(func, "for.cond");
    let body_bb = ctx.llcx.append_basic_block(func, "for.body");
    let step_bb = ctx.llcx.append_basic_block(func, "for.step");
    let end_bb = ctx.llcx.append_basic_block(func, "for.end");

    ctx.builder.build_unconditional_branch(cond_bb).expect("br");
    ctx.builder.position_at_end(cond_bb);

    match &node.cond {
        Some(cond_expr) => {
            let cond_value = gen_expr(ctx, &inner, cond_expr)?;
            let cond = cond_to_bool(ctx, &cond_value, cond_expr.span)?;
            ctx.builder
                .build_conditional_branch(cond, body_bb, end_bb)
                .expect("cond_br");
        }
        None => {
            // No condition means unconditionally true.
            let always = ctx.llcx.bool_type().const_int(1, false);
            ctx.builder
                .build_conditional_branch(always, body_bb, end_bb)
                .expect("cond_br");
        }
    }

    ctx.builder.position_at_end(body_bb);
    let loop_ctx = StmtContext {
        break_bb: Some(end_bb),
        continue_bb: Some(step_bb),
        ..sctx
    };
    gen_block_stmt(ctx, &inner, loop_ctx, &node.body)?;
    if !ctx.block_terminated() {
        ctx.builder.build_unconditional_branch(step_bb).expect("br");
    }

    ctx.builder.position_at_end(step_bb);
    if let Some(step) = &node.step {
        match step {
            ForStep::PreIncDec(node) => gen_pre_inc_dec(ctx, &inner, node, span)?,
            ForStep::Assign(assign) => gen_assign(ctx, &inner, assign, span)?,
        }
    }
    ctx.builder.build_unconditional_branch(cond_bb).expect("br");

    ctx.builder.position_at_end(end_bb);
    Ok(())
}
