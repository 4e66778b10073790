//! Recursive-descent parser producing the Opal AST.
//!
//! The grammar is conventional C-family surface syntax:
//!
//! ```text
//! program    := toplevel*
//! toplevel   := "extern" "fn" ident "(" params ")" ("->" type)? ";"
//!             | "fn" ident "(" params ")" ("->" type)? block
//!             | "struct" ident (";" | "{" members "}")
//! stmt       := block | ";" | "return" expr? ";" | let | if | loop | while
//!             | for | "break" ";" | "continue" ";" | ("++" | "--") expr ";"
//!             | expr (assign-op expr)? ";"
//! let        := "let" "mutable"? ident (":" type)? ("=" initializer)? ";"
//! for        := "for" for-init? ";" expr? ";" for-step? block
//! type       := "*" type | "&" type | "[" type ";" int "]" | ident
//! ```
//!
//! Expressions use precedence climbing: equality < relational < additive <
//! multiplicative < cast (`as`) < unary < postfix. Integer literals narrow to
//! the smallest of `{i32, u32, i64, u64}` that holds them.

use logos::Logos;

use opal_ast::{
    Assign, BinOp, Call, Cast, Expr, ExprKind, For, ForInit, ForStep, FunctionDecl, FunctionDef,
    If, Initializer, IntLit, Linkage, Loop, Param, PreIncDec, Program, Stmt, StmtKind, StructDef,
    StructMember, Subscript, TopLevel, TypeAst, UnaryOp, VarDef, VarQualifier, While,
};
use opal_diagnostic::{Diagnostic, ErrorKind, SourceFile, Span};
use opal_types::{Accessibility, BuiltinKind, Type};

use crate::lexer::Token;

type PResult<T> = Result<T, Diagnostic>;

/// Parse one source file into a program.
pub fn parse(file: &SourceFile) -> PResult<Program> {
    Parser::new(file)?.parse_program()
}

struct Parser<'a> {
    file: &'a SourceFile,
    tokens: Vec<(Token, Span)>,
    pos: usize,
    /// End offset of the most recently consumed token, for span synthesis.
    prev_end: u32,
}

impl<'a> Parser<'a> {
    fn new(file: &'a SourceFile) -> PResult<Self> {
        let mut tokens = Vec::new();
        let mut lexer = Token::lexer(file.src());
        while let Some(result) = lexer.next() {
            let span = Span::from(lexer.span());
            match result {
                Ok(tok) => tokens.push((tok, span)),
                Err(()) => {
                    return Err(Diagnostic::new(
                        ErrorKind::Parse,
                        span,
                        format!("unrecognized token '{}'", lexer.slice()),
                    ))
                }
            }
        }
        Ok(Self {
            file,
            tokens,
            pos: 0,
            prev_end: 0,
        })
    }

    // -- Token plumbing --

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn peek2(&self) -> Option<&Token> {
        self.tokens.get(self.pos + 1).map(|(t, _)| t)
    }

    /// Span of the upcoming token, or an empty span at end of input.
    fn span(&self) -> Span {
        self.tokens.get(self.pos).map_or_else(
            || Span::new(self.file.src().len() as u32, self.file.src().len() as u32),
            |(_, s)| *s,
        )
    }

    fn bump(&mut self) -> Option<(Token, Span)> {
        let item = self.tokens.get(self.pos).cloned();
        if let Some((_, span)) = &item {
            self.pos += 1;
            self.prev_end = span.end;
        }
        item
    }

    fn check(&self, tok: &Token) -> bool {
        self.peek()
            .is_some_and(|t| std::mem::discriminant(t) == std::mem::discriminant(tok))
    }

    fn eat(&mut self, tok: &Token) -> bool {
        if self.check(tok) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, tok: &Token, what: &str) -> PResult<Span> {
        if self.check(tok) {
            Ok(self.bump().expect("checked token").1)
        } else {
            Err(self.error_here(format!("expected {what}")))
        }
    }

    fn expect_ident(&mut self, what: &str) -> PResult<(String, Span)> {
        match self.peek() {
            Some(Token::Ident(_)) => {
                let (tok, span) = self.bump().expect("checked token");
                match tok {
                    Token::Ident(name) => Ok((name, span)),
                    _ => unreachable!(),
                }
            }
            _ => Err(self.error_here(format!("expected {what}"))),
        }
    }

    fn error_here(&self, message: impl Into<String>) -> Diagnostic {
        Diagnostic::new(ErrorKind::Parse, self.span(), message)
    }

    /// Span from `start` through the last consumed token.
    fn close_span(&self, start: Span) -> Span {
        Span::new(start.start, self.prev_end)
    }

    // -- Top level --

    fn parse_program(&mut self) -> PResult<Program> {
        let mut program = Vec::new();
        while self.peek().is_some() {
            program.push(self.parse_toplevel()?);
        }
        Ok(program)
    }

    fn parse_toplevel(&mut self) -> PResult<TopLevel> {
        match self.peek() {
            Some(Token::Extern) => {
                self.bump();
                let decl = self.parse_function_decl(Some(Linkage::External))?;
                self.expect(&Token::Semi, "';' after external declaration")?;
                Ok(TopLevel::FunctionDecl(decl))
            }
            Some(Token::Fn) => {
                let decl = self.parse_function_decl(None)?;
                // A prototype (no body) declares the mangled symbol so another
                // unit's definition can resolve at link time.
                if self.eat(&Token::Semi) {
                    return Ok(TopLevel::FunctionDecl(decl));
                }
                let body = self.parse_block()?;
                Ok(TopLevel::FunctionDef(FunctionDef { decl, body }))
            }
            Some(Token::Struct) => self.parse_struct(),
            _ => Err(self.error_here("expected a function or struct item")),
        }
    }

    fn parse_struct(&mut self) -> PResult<TopLevel> {
        let start = self.span();
        self.expect(&Token::Struct, "'struct'")?;
        let (name, _) = self.expect_ident("struct name")?;

        if self.eat(&Token::Semi) {
            return Ok(TopLevel::StructDecl {
                name,
                span: self.close_span(start),
            });
        }

        self.expect(&Token::LBrace, "'{' or ';' after struct name")?;
        let mut members = Vec::new();
        while !self.check(&Token::RBrace) {
            let accessibility = if self.eat(&Token::Priv) {
                Accessibility::Private
            } else {
                Accessibility::Public
            };
            let (member_name, _) = self.expect_ident("member name")?;
            self.expect(&Token::Colon, "':' after member name")?;
            let ty = self.parse_type()?;
            members.push(StructMember {
                name: member_name,
                ty,
                accessibility,
            });
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect(&Token::RBrace, "'}' after struct members")?;

        Ok(TopLevel::StructDef(StructDef {
            name,
            members,
            span: self.close_span(start),
        }))
    }

    fn parse_function_decl(&mut self, linkage: Option<Linkage>) -> PResult<FunctionDecl> {
        let start = self.span();
        self.expect(&Token::Fn, "'fn'")?;
        let (name, _) = self.expect_ident("function name")?;
        self.expect(&Token::LParen, "'(' after function name")?;
        let params = self.parse_params()?;
        self.expect(&Token::RParen, "')' after parameters")?;

        let return_type = if self.eat(&Token::Arrow) {
            self.parse_type()?
        } else {
            TypeAst::new(Type::builtin(BuiltinKind::Void), self.close_span(start))
        };

        Ok(FunctionDecl {
            linkage,
            name,
            params,
            return_type,
            span: self.close_span(start),
        })
    }

    fn parse_params(&mut self) -> PResult<Vec<Param>> {
        let mut params = Vec::new();
        if self.check(&Token::RParen) {
            return Ok(params);
        }
        loop {
            let start = self.span();
            if self.eat(&Token::Ellipsis) {
                params.push(Param {
                    qualifier: None,
                    name: String::new(),
                    ty: TypeAst::new(Type::builtin(BuiltinKind::Void), start),
                    is_vararg: true,
                    span: self.close_span(start),
                });
                // `...` must be last.
                break;
            }
            let qualifier = self.eat(&Token::Mutable).then_some(VarQualifier::Mutable);
            let (name, _) = self.expect_ident("parameter name")?;
            self.expect(&Token::Colon, "':' after parameter name")?;
            let ty = self.parse_type()?;
            params.push(Param {
                qualifier,
                name,
                ty,
                is_vararg: false,
                span: self.close_span(start),
            });
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        Ok(params)
    }

    // -- Types --

    fn parse_type(&mut self) -> PResult<TypeAst> {
        let start = self.span();
        if self.eat(&Token::Star) {
            let pointee = self.parse_type()?;
            return Ok(TypeAst::new(
                Type::pointer(pointee.ty),
                self.close_span(start),
            ));
        }
        if self.eat(&Token::Amp) {
            let refee = self.parse_type()?;
            return Ok(TypeAst::new(
                Type::reference(refee.ty),
                self.close_span(start),
            ));
        }
        if self.eat(&Token::LBracket) {
            let element = self.parse_type()?;
            self.expect(&Token::Semi, "';' in array type")?;
            let size = match self.peek() {
                Some(Token::Int(_)) => {
                    let (tok, _) = self.bump().expect("checked token");
                    match tok {
                        Token::Int(n) => n,
                        _ => unreachable!(),
                    }
                }
                _ => return Err(self.error_here("expected array length")),
            };
            self.expect(&Token::RBracket, "']' after array length")?;
            return Ok(TypeAst::new(
                Type::array(element.ty, size),
                self.close_span(start),
            ));
        }

        let (name, span) = self.expect_ident("a type")?;
        let ty = match BuiltinKind::from_name(&name) {
            Some(kind) => Type::builtin(kind),
            None => Type::user_defined(name),
        };
        Ok(TypeAst::new(ty, span))
    }

    // -- Statements --

    fn parse_block(&mut self) -> PResult<Stmt> {
        let start = self.span();
        self.expect(&Token::LBrace, "'{'")?;
        let mut stmts = Vec::new();
        while !self.check(&Token::RBrace) {
            if self.peek().is_none() {
                return Err(self.error_here("unterminated block"));
            }
            stmts.push(self.parse_stmt()?);
        }
        self.expect(&Token::RBrace, "'}'")?;
        Ok(Stmt::new(StmtKind::Compound(stmts), self.close_span(start)))
    }

    fn parse_stmt(&mut self) -> PResult<Stmt> {
        let start = self.span();
        match self.peek() {
            Some(Token::LBrace) => self.parse_block(),
            Some(Token::Semi) => {
                self.bump();
                Ok(Stmt::new(StmtKind::Nil, self.close_span(start)))
            }
            Some(Token::Return) => {
                self.bump();
                let expr = if self.check(&Token::Semi) {
                    None
                } else {
                    Some(self.parse_expr()?)
                };
                self.expect(&Token::Semi, "';' after return")?;
                Ok(Stmt::new(StmtKind::Return(expr), self.close_span(start)))
            }
            Some(Token::Let) => {
                let def = self.parse_var_def()?;
                self.expect(&Token::Semi, "';' after variable definition")?;
                Ok(Stmt::new(StmtKind::VarDef(def), self.close_span(start)))
            }
            Some(Token::Break) => {
                self.bump();
                self.expect(&Token::Semi, "';' after break")?;
                Ok(Stmt::new(StmtKind::Break, self.close_span(start)))
            }
            Some(Token::Continue) => {
                self.bump();
                self.expect(&Token::Semi, "';' after continue")?;
                Ok(Stmt::new(StmtKind::Continue, self.close_span(start)))
            }
            Some(Token::If) => {
                self.bump();
                let cond = self.parse_expr()?;
                let then = self.parse_block()?;
                let else_ = if self.eat(&Token::Else) {
                    if self.check(&Token::If) {
                        Some(self.parse_stmt()?)
                    } else {
                        Some(self.parse_block()?)
                    }
                } else {
                    None
                };
                Ok(Stmt::new(
                    StmtKind::If(Box::new(If { cond, then, else_ })),
                    self.close_span(start),
                ))
            }
            Some(Token::Loop) => {
                self.bump();
                let body = self.parse_block()?;
                Ok(Stmt::new(
                    StmtKind::Loop(Box::new(Loop { body })),
                    self.close_span(start),
                ))
            }
            Some(Token::While) => {
                self.bump();
                let cond = self.parse_expr()?;
                let body = self.parse_block()?;
                Ok(Stmt::new(
                    StmtKind::While(Box::new(While { cond, body })),
                    self.close_span(start),
                ))
            }
            Some(Token::For) => self.parse_for(),
            Some(Token::PlusPlus | Token::MinusMinus) => {
                let node = self.parse_pre_inc_dec()?;
                self.expect(&Token::Semi, "';' after increment")?;
                Ok(Stmt::new(StmtKind::PreIncDec(node), self.close_span(start)))
            }
            Some(_) => {
                let expr = self.parse_expr()?;
                let stmt = if let Some(op) = self.peek_assign_op() {
                    self.bump();
                    let rhs = self.parse_expr()?;
                    StmtKind::Assign(Assign {
                        lhs: expr,
                        op: op.to_string(),
                        rhs,
                    })
                } else {
                    StmtKind::Expr(expr)
                };
                self.expect(&Token::Semi, "';' after expression")?;
                Ok(Stmt::new(stmt, self.close_span(start)))
            }
            None => Err(self.error_here("expected a statement")),
        }
    }

    fn peek_assign_op(&self) -> Option<&'static str> {
        match self.peek()? {
            Token::Eq => Some("="),
            Token::PlusEq => Some("+="),
            Token::MinusEq => Some("-="),
            Token::StarEq => Some("*="),
            Token::SlashEq => Some("/="),
            Token::PercentEq => Some("%="),
            _ => None,
        }
    }

    fn parse_pre_inc_dec(&mut self) -> PResult<PreIncDec> {
        let (tok, _) = self.bump().expect("inc/dec token");
        let op = tok.op_str().expect("inc/dec spelling");
        let rhs = self.parse_expr()?;
        Ok(PreIncDec {
            op: op.to_string(),
            rhs,
        })
    }

    fn parse_var_def(&mut self) -> PResult<VarDef> {
        self.expect(&Token::Let, "'let'")?;
        let qualifier = self.eat(&Token::Mutable).then_some(VarQualifier::Mutable);
        let (name, _) = self.expect_ident("variable name")?;
        let ty = if self.eat(&Token::Colon) {
            Some(self.parse_type()?)
        } else {
            None
        };
        let init = if self.eat(&Token::Eq) {
            Some(self.parse_initializer()?)
        } else {
            None
        };
        Ok(VarDef {
            qualifier,
            name,
            ty,
            init,
        })
    }

    fn parse_initializer(&mut self) -> PResult<Initializer> {
        if self.eat(&Token::LBrace) {
            let mut inits = Vec::new();
            while !self.check(&Token::RBrace) {
                inits.push(self.parse_expr()?);
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
            self.expect(&Token::RBrace, "'}' after initializer list")?;
            Ok(Initializer::List(inits))
        } else {
            Ok(Initializer::Expr(self.parse_expr()?))
        }
    }

    fn parse_for(&mut self) -> PResult<Stmt> {
        let start = self.span();
        self.expect(&Token::For, "'for'")?;

        let init = if self.check(&Token::Semi) {
            None
        } else {
            Some(self.parse_for_init()?)
        };
        self.expect(&Token::Semi, "';' after for initializer")?;

        let cond = if self.check(&Token::Semi) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        self.expect(&Token::Semi, "';' after for condition")?;

        let step = if self.check(&Token::LBrace) {
            None
        } else {
            Some(self.parse_for_step()?)
        };

        let body = self.parse_block()?;
        Ok(Stmt::new(
            StmtKind::For(Box::new(For {
                init,
                cond,
                step,
                body,
            })),
            self.close_span(start),
        ))
    }

    fn parse_for_init(&mut self) -> PResult<ForInit> {
        // `name := expr` defines the induction variable; it is mutable so the
        // step can update it, and it goes out of scope with the loop.
        if matches!(self.peek(), Some(Token::Ident(_))) && matches!(self.peek2(), Some(Token::Walrus))
        {
            let (name, _) = self.expect_ident("variable name")?;
            self.expect(&Token::Walrus, "':='")?;
            let value = self.parse_expr()?;
            return Ok(ForInit::VarDef(VarDef {
                qualifier: Some(VarQualifier::Mutable),
                name,
                ty: None,
                init: Some(Initializer::Expr(value)),
            }));
        }

        let lhs = self.parse_expr()?;
        let op = self
            .peek_assign_op()
            .ok_or_else(|| self.error_here("expected ':=' or an assignment in for initializer"))?;
        self.bump();
        let rhs = self.parse_expr()?;
        Ok(ForInit::Assign(Assign {
            lhs,
            op: op.to_string(),
            rhs,
        }))
    }

    fn parse_for_step(&mut self) -> PResult<ForStep> {
        if matches!(self.peek(), Some(Token::PlusPlus | Token::MinusMinus)) {
            return Ok(ForStep::PreIncDec(self.parse_pre_inc_dec()?));
        }
        let lhs = self.parse_expr()?;
        let op = self
            .peek_assign_op()
            .ok_or_else(|| self.error_here("expected an assignment in for step"))?;
        self.bump();
        let rhs = self.parse_expr()?;
        Ok(ForStep::Assign(Assign {
            lhs,
            op: op.to_string(),
            rhs,
        }))
    }

    // -- Expressions --

    fn parse_expr(&mut self) -> PResult<Expr> {
        self.parse_equality()
    }

    fn parse_binary<F>(
        &mut self,
        ops: &[Token],
        mut next: F,
    ) -> PResult<Expr>
    where
        F: FnMut(&mut Self) -> PResult<Expr>,
    {
        let start = self.span();
        let mut lhs = next(self)?;
        loop {
            let Some(op) = self
                .peek()
                .filter(|t| ops.iter().any(|o| std::mem::discriminant(*t) == std::mem::discriminant(o)))
                .and_then(Token::op_str)
            else {
                break;
            };
            self.bump();
            let rhs = next(self)?;
            lhs = Expr::new(
                ExprKind::BinOp(Box::new(BinOp {
                    lhs,
                    op: op.to_string(),
                    rhs,
                })),
                self.close_span(start),
            );
        }
        Ok(lhs)
    }

    fn parse_equality(&mut self) -> PResult<Expr> {
        self.parse_binary(&[Token::EqEq, Token::NotEq], Self::parse_relational)
    }

    fn parse_relational(&mut self) -> PResult<Expr> {
        self.parse_binary(
            &[Token::Lt, Token::Gt, Token::LeEq, Token::GeEq],
            Self::parse_additive,
        )
    }

    fn parse_additive(&mut self) -> PResult<Expr> {
        self.parse_binary(&[Token::Plus, Token::Minus], Self::parse_multiplicative)
    }

    fn parse_multiplicative(&mut self) -> PResult<Expr> {
        self.parse_binary(
            &[Token::Star, Token::Slash, Token::Percent],
            Self::parse_cast,
        )
    }

    fn parse_cast(&mut self) -> PResult<Expr> {
        let start = self.span();
        let mut expr = self.parse_unary()?;
        while self.eat(&Token::As) {
            let ty = self.parse_type()?;
            expr = Expr::new(
                ExprKind::Cast(Box::new(Cast { lhs: expr, ty })),
                self.close_span(start),
            );
        }
        Ok(expr)
    }

    fn parse_unary(&mut self) -> PResult<Expr> {
        let start = self.span();
        let op = match self.peek() {
            Some(Token::Plus) => Some("+"),
            Some(Token::Minus) => Some("-"),
            Some(Token::Star) => Some("*"),
            Some(Token::Amp) => Some("&"),
            Some(Token::Bang) => Some("!"),
            _ => None,
        };
        if let Some(op) = op {
            self.bump();
            let rhs = self.parse_unary()?;
            return Ok(Expr::new(
                ExprKind::UnaryOp(Box::new(UnaryOp {
                    op: op.to_string(),
                    rhs,
                })),
                self.close_span(start),
            ));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> PResult<Expr> {
        let start = self.span();
        match self.peek().cloned() {
            Some(Token::Int(value)) => {
                self.bump();
                Ok(Expr::new(
                    ExprKind::Int(narrow_int(value)),
                    self.close_span(start),
                ))
            }
            Some(Token::True) => {
                self.bump();
                Ok(Expr::new(ExprKind::Bool(true), self.close_span(start)))
            }
            Some(Token::False) => {
                self.bump();
                Ok(Expr::new(ExprKind::Bool(false), self.close_span(start)))
            }
            Some(Token::Str(chars)) => {
                self.bump();
                Ok(Expr::new(ExprKind::Str(chars), self.close_span(start)))
            }
            Some(Token::Char(c)) => {
                self.bump();
                Ok(Expr::new(ExprKind::Char(c), self.close_span(start)))
            }
            Some(Token::Ident(name)) => {
                self.bump();
                let ident_span = self.close_span(start);
                match self.peek() {
                    Some(Token::LParen) => {
                        self.bump();
                        let mut args = Vec::new();
                        while !self.check(&Token::RParen) {
                            args.push(self.parse_expr()?);
                            if !self.eat(&Token::Comma) {
                                break;
                            }
                        }
                        self.expect(&Token::RParen, "')' after call arguments")?;
                        Ok(Expr::new(
                            ExprKind::Call(Box::new(Call {
                                callee: name,
                                callee_span: ident_span,
                                args,
                            })),
                            self.close_span(start),
                        ))
                    }
                    Some(Token::LBracket) => {
                        self.bump();
                        let index = self.parse_expr()?;
                        self.expect(&Token::RBracket, "']' after subscript")?;
                        let ident = Expr::new(ExprKind::Ident(name), ident_span);
                        Ok(Expr::new(
                            ExprKind::Subscript(Box::new(Subscript { ident, index })),
                            self.close_span(start),
                        ))
                    }
                    _ => Ok(Expr::new(ExprKind::Ident(name), ident_span)),
                }
            }
            Some(Token::LParen) => {
                self.bump();
                let expr = self.parse_expr()?;
                self.expect(&Token::RParen, "')'")?;
                Ok(expr)
            }
            _ => Err(self.error_here("expected an expression")),
        }
    }
}

/// Pick the smallest width among `{i32, u32, i64, u64}` that holds a literal.
fn narrow_int(value: u64) -> IntLit {
    if let Ok(v) = i32::try_from(value) {
        IntLit::I32(v)
    } else if let Ok(v) = u32::try_from(value) {
        IntLit::U32(v)
    } else if let Ok(v) = i64::try_from(value) {
        IntLit::I64(v)
    } else {
        IntLit::U64(value)
    }
}
