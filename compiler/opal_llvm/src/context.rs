//! Per-unit codegen context.
//!
//! One [`CGContext`] owns everything a translation unit needs while lowering:
//! the LLVM module and builder, the class/union tables, the mangled-symbol →
//! return-type table, the namespace stack, and the source file for
//! diagnostics. It is exclusively owned by one driver for the duration of
//! code generation and dropped on every exit path.

use std::cell::{Cell, RefCell};

use inkwell::builder::Builder;
use inkwell::context::Context;
use inkwell::module::Module;
use inkwell::types::StructType;
use rustc_hash::FxHashMap;

use opal_diagnostic::{SourceFile, Span};
use opal_types::{Type, UserTypeTable};

use crate::mangle::{Mangler, NamespaceHierarchy};

pub struct CGContext<'ctx> {
    /// The LLVM context (owns all LLVM types and values).
    pub llcx: &'ctx Context,
    /// The LLVM module being populated.
    pub module: Module<'ctx>,
    /// Instruction builder with the current insertion block.
    pub builder: Builder<'ctx>,

    /// The source file, for diagnostics.
    pub file: SourceFile,

    /// Class and union registry.
    pub user_types: UserTypeTable,
    /// Named LLVM struct types, created once per name. A struct with no body
    /// set is an opaque forward declaration.
    struct_types: RefCell<FxHashMap<String, StructType<'ctx>>>,
    /// Mangled symbol → declared return type.
    pub return_types: FxHashMap<String, Type>,

    /// Namespace frames for mangling and member-function resolution.
    pub namespaces: NamespaceHierarchy,
    pub mangler: Mangler,

    /// Counter for private string-literal globals.
    str_count: Cell<u32>,
}

impl<'ctx> CGContext<'ctx> {
    #[must_use]
    pub fn new(llcx: &'ctx Context, module_name: &str, file: SourceFile) -> Self {
        let module = llcx.create_module(module_name);
        let builder = llcx.create_builder();
        Self {
            llcx,
            module,
            builder,
            file,
            user_types: UserTypeTable::new(),
            struct_types: RefCell::new(FxHashMap::default()),
            return_types: FxHashMap::default(),
            namespaces: NamespaceHierarchy::default(),
            mangler: Mangler::default(),
            str_count: Cell::new(0),
        }
    }

    /// Render an error message anchored at `span` in this unit's source.
    #[must_use]
    pub fn format(&self, span: Span, message: &str) -> String {
        self.file.format(span, message)
    }

    /// Get or create the named LLVM struct for a class or union. The struct
    /// starts opaque; a definition fills its body in later.
    #[must_use]
    pub fn named_struct(&self, name: &str) -> StructType<'ctx> {
        if let Some(&ty) = self.struct_types.borrow().get(name) {
            return ty;
        }
        let ty = self.llcx.opaque_struct_type(name);
        self.struct_types.borrow_mut().insert(name.to_string(), ty);
        ty
    }

    /// A fresh name for a private string-literal global.
    #[must_use]
    pub fn next_str_name(&self) -> String {
        let n = self.str_count.get();
        self.str_count.set(n + 1);
        format!(".str.{n}")
    }

    /// True when the current insertion block already ends in a terminator.
    #[must_use]
    pub fn block_terminated(&self) -> bool {
        self.builder
            .get_insert_block()
            .is_some_and(|bb| bb.get_terminator().is_some())
    }
}
