//! Diagnostics for the Opal compiler.
//!
//! Every AST node carries a [`Span`] into the original source text; spans are
//! the only anchor diagnostics have, so they are mandatory everywhere. A
//! [`SourceFile`] recovers line/column information from a span and renders an
//! error in the classic caret format:
//!
//! ```text
//! main.opal:3:9: error: redefinition of 'x'
//!   let x: i32 = 2;
//!       ^
//! ```

use std::fmt;

/// A half-open byte range into a source file.
///
/// Offsets index the original UTF-8 text. Spans are cheap to copy and carried
/// on every AST node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    #[must_use]
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// A span covering both operands, for synthesized nodes.
    #[must_use]
    pub fn to(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    #[must_use]
    pub fn len(self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    #[must_use]
    pub fn is_empty(self) -> bool {
        self.len() == 0
    }

    /// True when `other` lies entirely within this span.
    #[must_use]
    pub fn contains(self, other: Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

impl From<std::ops::Range<usize>> for Span {
    fn from(r: std::ops::Range<usize>) -> Self {
        Span::new(r.start as u32, r.end as u32)
    }
}

/// The category of a compile-time error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Lexical or syntactic error from the parser.
    Parse,
    /// Required type differs from the actual type.
    TypeMismatch,
    /// Undeclared identifier, function, class, union, or member.
    UnknownName,
    /// Duplicate variable, or duplicate function with an identical mangled name.
    Redefinition,
    /// Assignment target is not addressable or not mutable.
    InvalidLValue,
    /// Use of an opaque class where a complete type is required.
    IncompleteType,
    /// Call-site arity or argument-type mismatch.
    ArityOrArgType,
    /// Operator not defined for the operand types or signedness.
    InvalidOperator,
    BreakContinueOutsideLoop,
    /// Invariant violation; should be unreachable.
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Parse => "parse error",
            Self::TypeMismatch => "type mismatch",
            Self::UnknownName => "unknown name",
            Self::Redefinition => "redefinition",
            Self::InvalidLValue => "invalid l-value",
            Self::IncompleteType => "incomplete type",
            Self::ArityOrArgType => "bad call",
            Self::InvalidOperator => "invalid operator",
            Self::BreakContinueOutsideLoop => "break/continue outside loop",
            Self::Internal => "internal error",
        };
        f.write_str(s)
    }
}

/// A structured compile-time error with its source anchor.
///
/// Diagnostics are surfaced, never recovered: the first error unwinds to the
/// driver, which renders it through [`SourceFile::render`] and fails the
/// translation unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: ErrorKind,
    pub span: Span,
    pub message: String,
}

impl Diagnostic {
    #[must_use]
    pub fn new(kind: ErrorKind, span: Span, message: impl Into<String>) -> Self {
        Self {
            kind,
            span,
            message: message.into(),
        }
    }

    /// An invariant violation. These abort the unit and indicate a compiler bug.
    #[must_use]
    pub fn internal(span: Span, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, span, message)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for Diagnostic {}

/// One source file: name, contents, and the offset of every line start.
#[derive(Debug, Clone)]
pub struct SourceFile {
    name: String,
    src: String,
    line_starts: Vec<u32>,
}

impl SourceFile {
    #[must_use]
    pub fn new(name: impl Into<String>, src: impl Into<String>) -> Self {
        let src = src.into();
        let mut line_starts = vec![0u32];
        for (i, b) in src.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i as u32 + 1);
            }
        }
        Self {
            name: name.into(),
            src,
            line_starts,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn src(&self) -> &str {
        &self.src
    }

    /// 1-based line and column of a byte offset. Columns count characters,
    /// not bytes, so multi-byte code points occupy a single column.
    #[must_use]
    pub fn line_col(&self, offset: u32) -> (usize, usize) {
        let offset = offset.min(self.src.len() as u32);
        let line_idx = match self.line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        let line_start = self.line_starts[line_idx] as usize;
        let col = self.src[line_start..offset as usize].chars().count() + 1;
        (line_idx + 1, col)
    }

    /// The text of a 1-based line, without its trailing newline.
    #[must_use]
    pub fn line_text(&self, line: usize) -> &str {
        let start = self.line_starts[line - 1] as usize;
        let end = self
            .line_starts
            .get(line)
            .map_or(self.src.len(), |&e| e as usize);
        self.src[start..end].trim_end_matches('\n')
    }

    /// Render `file:line:col: error: msg`, the offending line, and a caret
    /// under the column.
    #[must_use]
    pub fn format(&self, span: Span, message: &str) -> String {
        let (line, col) = self.line_col(span.start);
        let text = self.line_text(line);
        let caret_pad = " ".repeat(col - 1);
        format!(
            "{}:{}:{}: error: {}\n  {}\n  {}^",
            self.name, line, col, message, text, caret_pad
        )
    }

    /// Render a full diagnostic.
    #[must_use]
    pub fn render(&self, diag: &Diagnostic) -> String {
        self.format(diag.span, &diag.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_merge_and_contains() {
        let a = Span::new(4, 8);
        let b = Span::new(6, 12);
        assert_eq!(a.to(b), Span::new(4, 12));
        assert!(a.to(b).contains(a));
        assert!(!a.contains(b));
    }

    #[test]
    fn line_col_first_line() {
        let file = SourceFile::new("t.opal", "let x = 1;\nlet y = 2;\n");
        assert_eq!(file.line_col(0), (1, 1));
        assert_eq!(file.line_col(4), (1, 5));
    }

    #[test]
    fn line_col_later_lines() {
        let file = SourceFile::new("t.opal", "let x = 1;\nlet y = 2;\n");
        // "let y" starts at offset 11
        assert_eq!(file.line_col(11), (2, 1));
        assert_eq!(file.line_col(15), (2, 5));
    }

    #[test]
    fn line_col_counts_chars_not_bytes() {
        let file = SourceFile::new("t.opal", "let α = 1;");
        // 'α' is 2 bytes at offset 4; '=' begins at byte 7 but column 7
        assert_eq!(file.line_col(7), (1, 7));
    }

    #[test]
    fn format_renders_caret_under_column() {
        let file = SourceFile::new("t.opal", "fn main() -> i32 {\n    break;\n}\n");
        let span = Span::new(23, 29); // "break"
        let out = file.format(span, "break outside of a loop");
        assert_eq!(
            out,
            "t.opal:2:5: error: break outside of a loop\n      break;\n      ^"
        );
    }

    #[test]
    fn render_uses_diagnostic_message() {
        let file = SourceFile::new("t.opal", "let x = 1;");
        let diag = Diagnostic::new(ErrorKind::UnknownName, Span::new(4, 5), "unknown variable 'x'");
        assert!(file.render(&diag).starts_with("t.opal:1:5: error: unknown variable 'x'"));
    }

    #[test]
    fn error_kind_display() {
        assert_eq!(ErrorKind::TypeMismatch.to_string(), "type mismatch");
        assert_eq!(
            ErrorKind::BreakContinueOutsideLoop.to_string(),
            "break/continue outside loop"
        );
    }
}
