//! The Opal abstract syntax tree.
//!
//! Three independent sums — expressions, statements, top-levels — built by
//! the parser, owned by the compile driver for one translation unit, and
//! read-only during code generation. Recursive arms own their children
//! through `Box`. Every node carries a [`Span`].
//!
//! Operators are carried as their source spelling and classified on demand
//! (`BinOp::kind` etc.), mirroring how the grammar hands them over.

use opal_diagnostic::Span;
use opal_types::Type;

pub mod expr;
pub mod stmt;
pub mod toplevel;

pub use expr::{BinOp, BinOpKind, Call, Cast, Expr, ExprKind, IntLit, Subscript, UnaryOp, UnaryOpKind};
pub use stmt::{
    Assign, AssignKind, For, ForInit, ForStep, If, IncDecKind, Initializer, Loop, PreIncDec,
    Stmt, StmtKind, VarDef, VarQualifier, While,
};
pub use toplevel::{
    FunctionDecl, FunctionDef, Linkage, Param, Program, StructDef, StructMember, TopLevel,
};

/// A type written in source position, together with where it was written.
///
/// The payload is an [`opal_types::Type`] built directly by the parser
/// (builtins, pointers, references, arrays, and `UserDefined` for anything
/// name-shaped); resolution of user-defined names happens during lowering.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeAst {
    pub ty: Type,
    pub span: Span,
}

impl TypeAst {
    #[must_use]
    pub fn new(ty: Type, span: Span) -> Self {
        Self { ty, span }
    }
}
