//! Statement nodes.

use opal_diagnostic::Span;

use crate::expr::Expr;
use crate::TypeAst;

/// A statement with its source span.
#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

impl Stmt {
    #[must_use]
    pub fn new(kind: StmtKind, span: Span) -> Self {
        Self { kind, span }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    Nil,
    Compound(Vec<Stmt>),
    Expr(Expr),
    Return(Option<Expr>),
    VarDef(VarDef),
    Assign(Assign),
    PreIncDec(PreIncDec),
    Break,
    Continue,
    If(Box<If>),
    Loop(Box<Loop>),
    While(Box<While>),
    For(Box<For>),
}

/// Binding qualifier on a variable definition. Absent means immutable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarQualifier {
    Mutable,
}

/// A variable initializer: a single expression or a brace list.
#[derive(Debug, Clone, PartialEq)]
pub enum Initializer {
    Expr(Expr),
    List(Vec<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarDef {
    pub qualifier: Option<VarQualifier>,
    pub name: String,
    pub ty: Option<TypeAst>,
    pub init: Option<Initializer>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignKind {
    Unknown,
    Direct,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assign {
    /// Only assignable expressions are accepted during lowering.
    pub lhs: Expr,
    pub op: String,
    pub rhs: Expr,
}

impl Assign {
    #[must_use]
    pub fn kind(&self) -> AssignKind {
        match self.op.as_str() {
            "=" => AssignKind::Direct,
            "+=" => AssignKind::Add,
            "-=" => AssignKind::Sub,
            "*=" => AssignKind::Mul,
            "/=" => AssignKind::Div,
            "%=" => AssignKind::Mod,
            _ => AssignKind::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncDecKind {
    Unknown,
    Increment,
    Decrement,
}

/// Prefix `++x` / `--x`.
#[derive(Debug, Clone, PartialEq)]
pub struct PreIncDec {
    pub op: String,
    pub rhs: Expr,
}

impl PreIncDec {
    #[must_use]
    pub fn kind(&self) -> IncDecKind {
        match self.op.as_str() {
            "++" => IncDecKind::Increment,
            "--" => IncDecKind::Decrement,
            _ => IncDecKind::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct If {
    pub cond: Expr,
    pub then: Stmt,
    pub else_: Option<Stmt>,
}

/// An unconditional loop.
#[derive(Debug, Clone, PartialEq)]
pub struct Loop {
    pub body: Stmt,
}

#[derive(Debug, Clone, PartialEq)]
pub struct While {
    pub cond: Expr,
    pub body: Stmt,
}

/// A for initializer is either an assignment into an existing binding or a
/// fresh (induction) variable definition.
#[derive(Debug, Clone, PartialEq)]
pub enum ForInit {
    Assign(Assign),
    VarDef(VarDef),
}

/// The tail statement of a for loop.
#[derive(Debug, Clone, PartialEq)]
pub enum ForStep {
    PreIncDec(PreIncDec),
    Assign(Assign),
}

#[derive(Debug, Clone, PartialEq)]
pub struct For {
    pub init: Option<ForInit>,
    pub cond: Option<Expr>,
    pub step: Option<ForStep>,
    pub body: Stmt,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::ExprKind;

    fn ident(name: &str) -> Expr {
        Expr::new(ExprKind::Ident(name.into()), Span::new(0, name.len() as u32))
    }

    #[test]
    fn assign_kind_mapping() {
        for (op, kind) in [
            ("=", AssignKind::Direct),
            ("+=", AssignKind::Add),
            ("-=", AssignKind::Sub),
            ("*=", AssignKind::Mul),
            ("/=", AssignKind::Div),
            ("%=", AssignKind::Mod),
            ("<<=", AssignKind::Unknown),
        ] {
            let node = Assign {
                lhs: ident("x"),
                op: op.into(),
                rhs: ident("y"),
            };
            assert_eq!(node.kind(), kind, "operator {op}");
        }
    }

    #[test]
    fn inc_dec_kind_mapping() {
        let inc = PreIncDec {
            op: "++".into(),
            rhs: ident("i"),
        };
        assert_eq!(inc.kind(), IncDecKind::Increment);
        let dec = PreIncDec {
            op: "--".into(),
            rhs: ident("i"),
        };
        assert_eq!(dec.kind(), IncDecKind::Decrement);
    }
}
