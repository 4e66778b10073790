//! Lexing and parsing for Opal source files.
//!
//! [`parse`] turns a [`SourceFile`](opal_diagnostic::SourceFile) into the
//! [`Program`](opal_ast::Program) the code generator consumes. Errors come
//! back as [`Diagnostic`](opal_diagnostic::Diagnostic)s anchored to the
//! offending span.

pub mod lexer;
mod parser;

pub use lexer::Token;
pub use parser::parse;
