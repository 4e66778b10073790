//! Top-level items.

use opal_diagnostic::Span;
use opal_types::{Accessibility, Type};

use crate::stmt::Stmt;
use crate::TypeAst;

/// Linkage of a function symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Linkage {
    /// Declared elsewhere (C interop); the symbol keeps its plain name.
    External,
    Internal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub qualifier: Option<crate::stmt::VarQualifier>,
    pub name: String,
    pub ty: TypeAst,
    pub is_vararg: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub linkage: Option<Linkage>,
    pub name: String,
    pub params: Vec<Param>,
    pub return_type: TypeAst,
    pub span: Span,
}

impl FunctionDecl {
    /// Parameters excluding a trailing `...` marker.
    #[must_use]
    pub fn fixed_params(&self) -> &[Param] {
        match self.params.last() {
            Some(p) if p.is_vararg => &self.params[..self.params.len() - 1],
            _ => &self.params,
        }
    }

    #[must_use]
    pub fn is_vararg(&self) -> bool {
        self.params.last().is_some_and(|p| p.is_vararg)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    pub decl: FunctionDecl,
    pub body: Stmt,
}

/// A struct definition member as written in source.
#[derive(Debug, Clone, PartialEq)]
pub struct StructMember {
    pub name: String,
    pub ty: TypeAst,
    pub accessibility: Accessibility,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructDef {
    pub name: String,
    pub members: Vec<StructMember>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TopLevel {
    Nil,
    FunctionDecl(FunctionDecl),
    FunctionDef(FunctionDef),
    /// `struct Name;` — forward declaration of an opaque struct.
    StructDecl { name: String, span: Span },
    /// `struct Name { … }`
    StructDef(StructDef),
}

/// One translation unit.
pub type Program = Vec<TopLevel>;

/// Return type helper for declarations written without `-> type`.
#[must_use]
pub fn void_type(span: Span) -> TypeAst {
    TypeAst::new(Type::builtin(opal_types::BuiltinKind::Void), span)
}
