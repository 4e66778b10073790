//! Variables, scoped symbol tables, and typed values.
//!
//! Scopes are immutably snapshotted: entering a statement block clones the
//! table, so bindings made inside never leak out. This gives lexical scoping
//! without an explicit pop.
//!
//! LLVM pointers are opaque, so a [`Variable`] carries the language-level
//! [`Type`] of its storage; loads are typed by lowering that type.

use inkwell::values::{BasicValueEnum, IntValue, PointerValue};
use rustc_hash::FxHashMap;

use opal_types::Type;

/// One named binding: stack storage plus its language-level type.
#[derive(Debug, Clone)]
pub struct Variable<'ctx> {
    ptr: PointerValue<'ctx>,
    ty: Type,
    is_mutable: bool,
    is_signed: bool,
}

impl<'ctx> Variable<'ctx> {
    #[must_use]
    pub fn new(ptr: PointerValue<'ctx>, ty: Type, is_mutable: bool, is_signed: bool) -> Self {
        Self {
            ptr,
            ty,
            is_mutable,
            is_signed,
        }
    }

    #[must_use]
    pub fn ptr(&self) -> PointerValue<'ctx> {
        self.ptr
    }

    #[must_use]
    pub fn ty(&self) -> &Type {
        &self.ty
    }

    #[must_use]
    pub fn is_mutable(&self) -> bool {
        self.is_mutable
    }

    #[must_use]
    pub fn is_signed(&self) -> bool {
        self.is_signed
    }
}

/// Lexically scoped name → variable map.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable<'ctx> {
    vars: FxHashMap<String, Variable<'ctx>>,
}

impl<'ctx> SymbolTable<'ctx> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&Variable<'ctx>> {
        self.vars.get(name)
    }

    #[must_use]
    pub fn exists(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    /// Bind a name. Callers check [`exists`](Self::exists) first and report a
    /// redefinition diagnostic with the offending span.
    pub fn register(&mut self, name: &str, var: Variable<'ctx>) {
        debug_assert!(!self.vars.contains_key(name), "redefinition of '{name}'");
        self.vars.insert(name.to_string(), var);
    }
}

/// A lowered expression result: the LLVM value (absent for `void` calls),
/// its language-level type, and its signedness.
#[derive(Debug, Clone)]
pub struct Value<'ctx> {
    value: Option<BasicValueEnum<'ctx>>,
    ty: Type,
    is_signed: bool,
}

impl<'ctx> Value<'ctx> {
    #[must_use]
    pub fn new(value: BasicValueEnum<'ctx>, ty: Type, is_signed: bool) -> Self {
        Self {
            value: Some(value),
            ty,
            is_signed,
        }
    }

    /// The result of a `void` call.
    #[must_use]
    pub fn void() -> Self {
        Self {
            value: None,
            ty: Type::builtin(opal_types::BuiltinKind::Void),
            is_signed: false,
        }
    }

    #[must_use]
    pub fn value(&self) -> Option<BasicValueEnum<'ctx>> {
        self.value
    }

    #[must_use]
    pub fn ty(&self) -> &Type {
        &self.ty
    }

    #[must_use]
    pub fn is_signed(&self) -> bool {
        self.is_signed
    }

    #[must_use]
    pub fn is_void(&self) -> bool {
        self.value.is_none()
    }

    /// The underlying integer value, if this is one.
    #[must_use]
    pub fn int_value(&self) -> Option<IntValue<'ctx>> {
        match self.value? {
            BasicValueEnum::IntValue(v) => Some(v),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inkwell::context::Context;
    use opal_types::BuiltinKind;

    #[test]
    fn snapshot_scoping_isolates_children() {
        let llcx = Context::create();
        let module = llcx.create_module("t");
        let builder = llcx.create_builder();
        let fn_ty = llcx.void_type().fn_type(&[], false);
        let func = module.add_function("f", fn_ty, None);
        let entry = llcx.append_basic_block(func, "entry");
        builder.position_at_end(entry);

        let i32_ty = llcx.i32_type();
        let outer_ptr = builder.build_alloca(i32_ty, "x").unwrap();

        let mut outer = SymbolTable::new();
        outer.register(
            "x",
            Variable::new(outer_ptr, Type::builtin(BuiltinKind::I32), false, true),
        );

        // Child snapshot sees the parent binding…
        let mut child = outer.clone();
        assert!(child.exists("x"));

        // …and child additions never leak back out.
        let inner_ptr = builder.build_alloca(i32_ty, "y").unwrap();
        child.register(
            "y",
            Variable::new(inner_ptr, Type::builtin(BuiltinKind::I32), true, true),
        );
        assert!(child.exists("y"));
        assert!(!outer.exists("y"));
    }

    #[test]
    fn void_values_have_no_llvm_value() {
        let v = Value::void();
        assert!(v.is_void());
        assert!(v.value().is_none());
        assert!(v.int_value().is_none());
    }
}
