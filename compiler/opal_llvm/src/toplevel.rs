//! Top-level lowering: function declarations and definitions, struct items.

use inkwell::module::Linkage as LlvmLinkage;
use inkwell::values::FunctionValue;
use tracing::debug;

use opal_ast::{FunctionDecl, FunctionDef, Linkage, StructDef, TopLevel, VarQualifier};
use opal_diagnostic::{Diagnostic, ErrorKind, Span};
use opal_types::MemberVariable;

use crate::context::CGContext;
use crate::stmt::{create_entry_block_alloca, gen_block_stmt, StmtContext};
use crate::symbol::{SymbolTable, Variable};
use crate::types::{lower_basic, lower_fn_type};

/// Lower one top-level item.
pub fn gen_toplevel<'ctx>(ctx: &mut CGContext<'ctx>, item: &TopLevel) -> Result<(), Diagnostic> {
    match item {
        TopLevel::Nil => Ok(()),
        TopLevel::FunctionDecl(decl) => {
            declare_function(ctx, decl)?;
            Ok(())
        }
        TopLevel::FunctionDef(def) => define_function(ctx, def),
        TopLevel::StructDecl { name, span } => gen_struct_decl(ctx, name, *span),
        TopLevel::StructDef(def) => gen_struct_def(ctx, def),
    }
}

/// Compute a declaration's mangled symbol, look it up or create it in the
/// module, and record its return type.
fn declare_function<'ctx>(
    ctx: &mut CGContext<'ctx>,
    decl: &FunctionDecl,
) -> Result<FunctionValue<'ctx>, Diagnostic> {
    if decl.is_vararg() && decl.linkage != Some(Linkage::External) {
        return Err(Diagnostic::new(
            ErrorKind::Parse,
            decl.span,
            "variadic parameters require external linkage",
        ));
    }

    let symbol = ctx
        .mangler
        .mangle_function(&ctx.namespaces, &ctx.user_types, decl)
        .ok_or_else(|| {
            Diagnostic::new(
                ErrorKind::UnknownName,
                decl.span,
                "parameter type names an unknown user type",
            )
        })?;

    if let Some(existing) = ctx.module.get_function(&symbol) {
        return Ok(existing);
    }
    debug!(symbol, name = %decl.name, "declaring function");

    let param_types: Vec<_> = decl
        .fixed_params()
        .iter()
        .map(|p| (&p.ty.ty, p.ty.span))
        .collect();
    let fn_ty = lower_fn_type(
        ctx,
        &param_types,
        &decl.return_type.ty,
        decl.return_type.span,
        decl.is_vararg(),
    )?;

    let linkage = match decl.linkage {
        Some(Linkage::External) => Some(LlvmLinkage::External),
        Some(Linkage::Internal) => Some(LlvmLinkage::Internal),
        None => None,
    };
    let func = ctx.module.add_function(&symbol, fn_ty, linkage);

    let ret_ty = decl
        .return_type
        .ty
        .resolved(&ctx.user_types)
        .ok_or_else(|| {
            Diagnostic::new(
                ErrorKind::UnknownName,
                decl.return_type.span,
                format!(
                    "unknown type name '{}'",
                    decl.return_type.ty.display_name()
                ),
            )
        })?;
    ctx.return_types.insert(symbol, ret_ty);

    Ok(func)
}

/// Lower a function definition: entry block, parameter and return-value
/// storage, the epilogue block, and the body.
fn define_function<'ctx>(ctx: &mut CGContext<'ctx>, def: &FunctionDef) -> Result<(), Diagnostic> {
    let decl = &def.decl;
    let func = declare_function(ctx, decl)?;
    if func.count_basic_blocks() > 0 {
        return Err(Diagnostic::new(
            ErrorKind::Redefinition,
            decl.span,
            format!("redefinition of '{}'", decl.name),
        ));
    }

    let entry = ctx.llcx.append_basic_block(func, "entry");
    ctx.builder.position_at_end(entry);

    // Return-value storage, for non-void functions.
    let ret_is_void = decl.return_type.ty.is_void(&ctx.user_types);
    let retvar = if ret_is_void {
        None
    } else {
        let ret_llvm = lower_basic(ctx, &decl.return_type.ty, decl.return_type.span)?;
        Some(create_entry_block_alloca(ctx, func, "retval", ret_llvm))
    };

    let end_bb = ctx.llcx.append_basic_block(func, "end");

    // Parameters get stack storage and bindings in the function's outermost
    // scope before the body is visited.
    let mut scope = SymbolTable::new();
    for (i, param) in decl.fixed_params().iter().enumerate() {
        if scope.exists(&param.name) {
            return Err(Diagnostic::new(
                ErrorKind::Redefinition,
                param.span,
                format!("redefinition of parameter '{}'", param.name),
            ));
        }
        let mut ty = param.ty.ty.resolved(&ctx.user_types).ok_or_else(|| {
            Diagnostic::new(
                ErrorKind::UnknownName,
                param.ty.span,
                format!("unknown type name '{}'", param.ty.ty.display_name()),
            )
        })?;
        let is_mutable = matches!(param.qualifier, Some(VarQualifier::Mutable));
        ty.set_mutable(is_mutable);

        let llvm_ty = lower_basic(ctx, &ty, param.ty.span)?;
        let alloca = create_entry_block_alloca(ctx, func, &param.name, llvm_ty);
        let arg = func
            .get_nth_param(i as u32)
            .ok_or_else(|| Diagnostic::internal(param.span, "missing parameter value"))?;
        ctx.builder.build_store(alloca, arg).expect("store");

        let is_signed = ty.is_signed(&ctx.user_types);
        scope.register(&param.name, Variable::new(alloca, ty, is_mutable, is_signed));
    }

    let sctx = StmtContext {
        retvar,
        end_bb,
        break_bb: None,
        continue_bb: None,
    };
    gen_block_stmt(ctx, &scope, sctx, &def.body)?;

    // A body that falls off the end branches to the epilogue implicitly.
    if !ctx.block_terminated() {
        ctx.builder.build_unconditional_branch(end_bb).expect("br");
    }

    ctx.builder.position_at_end(end_bb);
    match retvar {
        Some(slot) => {
            lower_basic(ctx, &decl.return_type.ty, decl.return_type.span)?;
            let value = ctx
                .builder
                .build_load(slot, "retval")
                .expect("load");
            ctx.builder.build_return(Some(&value)).expect("ret");
        }
        None => {
            ctx.builder.build_return(None).expect("ret");
        }
    }

    Ok(())
}

/// `struct Name;` — two-phase registration, phase one: an opaque class that
/// may be pointed to but not instantiated.
fn gen_struct_decl<'ctx>(
    ctx: &mut CGContext<'ctx>,
    name: &str,
    span: Span,
) -> Result<(), Diagnostic> {
    ctx.user_types.declare_opaque(name).map_err(|err| {
        Diagnostic::new(ErrorKind::Redefinition, span, err.to_string())
    })?;
    ctx.named_struct(name);
    Ok(())
}

/// `struct Name { … }` — phase two: fill in the members and the LLVM struct
/// body.
fn gen_struct_def<'ctx>(ctx: &mut CGContext<'ctx>, def: &StructDef) -> Result<(), Diagnostic> {
    let members: Vec<MemberVariable> = def
        .members
        .iter()
        .map(|m| MemberVariable {
            name: m.name.clone(),
            ty: m.ty.ty.clone(),
            accessibility: m.accessibility,
        })
        .collect();

    ctx.user_types
        .define_class(&def.name, members)
        .map_err(|err| Diagnostic::new(ErrorKind::Redefinition, def.span, err.to_string()))?;

    // Materialize the LLVM struct body now so member-type errors surface at
    // the definition, not at first use.
    let class_ty = ctx
        .user_types
        .lookup(&def.name)
        .expect("just defined")
        .clone();
    lower_basic(ctx, &class_ty, def.span)?;
    Ok(())
}
