//! Lexer for Opal, built on `logos`.
//!
//! Literal payloads are cooked in token callbacks: escapes are resolved,
//! integer literals are range-checked, and identifiers keep their text.

use logos::{Lexer, Logos};

/// Resolve the escapes of a quoted literal body. `None` on a bad escape.
fn cook_escapes(raw: &str) -> Option<String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let escaped = match chars.next()? {
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            '0' => '\0',
            '\\' => '\\',
            '\'' => '\'',
            '"' => '"',
            _ => return None,
        };
        out.push(escaped);
    }
    Some(out)
}

fn cook_string(lex: &mut Lexer<'_, Token>) -> Option<Vec<char>> {
    let slice = lex.slice();
    let body = &slice[1..slice.len() - 1];
    Some(cook_escapes(body)?.chars().collect())
}

fn cook_char(lex: &mut Lexer<'_, Token>) -> Option<char> {
    let slice = lex.slice();
    let body = &slice[1..slice.len() - 1];
    let cooked = cook_escapes(body)?;
    let mut chars = cooked.chars();
    let c = chars.next()?;
    chars.next().is_none().then_some(c)
}

fn cook_int(lex: &mut Lexer<'_, Token>) -> Option<u64> {
    lex.slice().parse().ok()
}

/// One Opal token.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
#[logos(skip r"//[^\n]*")]
pub enum Token {
    // -- Keywords --
    #[token("fn")]
    Fn,
    #[token("extern")]
    Extern,
    #[token("struct")]
    Struct,
    #[token("let")]
    Let,
    #[token("mutable")]
    Mutable,
    #[token("priv")]
    Priv,
    #[token("return")]
    Return,
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("loop")]
    Loop,
    #[token("while")]
    While,
    #[token("for")]
    For,
    #[token("break")]
    Break,
    #[token("continue")]
    Continue,
    #[token("as")]
    As,
    #[token("true")]
    True,
    #[token("false")]
    False,

    // -- Literals --
    #[regex(r"[0-9]+", cook_int)]
    Int(u64),
    #[regex(r#""([^"\\\n]|\\.)*""#, cook_string)]
    Str(Vec<char>),
    #[regex(r"'([^'\\\n]|\\.)+'", cook_char)]
    Char(char),
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),

    // -- Multi-character operators --
    #[token("->")]
    Arrow,
    #[token(":=")]
    Walrus,
    #[token("...")]
    Ellipsis,
    #[token("++")]
    PlusPlus,
    #[token("--")]
    MinusMinus,
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("<=")]
    LeEq,
    #[token(">=")]
    GeEq,
    #[token("+=")]
    PlusEq,
    #[token("-=")]
    MinusEq,
    #[token("*=")]
    StarEq,
    #[token("/=")]
    SlashEq,
    #[token("%=")]
    PercentEq,

    // -- Single-character tokens --
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("=")]
    Eq,
    #[token("!")]
    Bang,
    #[token("&")]
    Amp,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(";")]
    Semi,
    #[token(":")]
    Colon,
    #[token(",")]
    Comma,
}

impl Token {
    /// The source spelling of an operator token, for AST nodes that carry
    /// operators as strings.
    #[must_use]
    pub fn op_str(&self) -> Option<&'static str> {
        Some(match self {
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Star => "*",
            Self::Slash => "/",
            Self::Percent => "%",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::Eq => "=",
            Self::Bang => "!",
            Self::Amp => "&",
            Self::EqEq => "==",
            Self::NotEq => "!=",
            Self::LeEq => "<=",
            Self::GeEq => ">=",
            Self::PlusEq => "+=",
            Self::MinusEq => "-=",
            Self::StarEq => "*=",
            Self::SlashEq => "/=",
            Self::PercentEq => "%=",
            Self::PlusPlus => "++",
            Self::MinusMinus => "--",
            _ => return None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(src: &str) -> Vec<Token> {
        Token::lexer(src).map(|t| t.expect("lex")).collect()
    }

    #[test]
    fn keywords_and_idents() {
        assert_eq!(
            lex("fn main loop looped"),
            vec![
                Token::Fn,
                Token::Ident("main".into()),
                Token::Loop,
                Token::Ident("looped".into()),
            ]
        );
    }

    #[test]
    fn integer_literals() {
        assert_eq!(lex("0 42 4294967296"), vec![
            Token::Int(0),
            Token::Int(42),
            Token::Int(4_294_967_296),
        ]);
    }

    #[test]
    fn overflowing_integer_is_an_error() {
        let mut lexer = Token::lexer("99999999999999999999999");
        assert!(lexer.next().unwrap().is_err());
    }

    #[test]
    fn string_and_char_escapes() {
        assert_eq!(
            lex(r#""a\nb" '\t' 'あ'"#),
            vec![
                Token::Str(vec!['a', '\n', 'b']),
                Token::Char('\t'),
                Token::Char('あ'),
            ]
        );
    }

    #[test]
    fn multi_char_operators_win() {
        assert_eq!(
            lex("a += b; i := 0; ++i; x <= y"),
            vec![
                Token::Ident("a".into()),
                Token::PlusEq,
                Token::Ident("b".into()),
                Token::Semi,
                Token::Ident("i".into()),
                Token::Walrus,
                Token::Int(0),
                Token::Semi,
                Token::PlusPlus,
                Token::Ident("i".into()),
                Token::Semi,
                Token::Ident("x".into()),
                Token::LeEq,
                Token::Ident("y".into()),
            ]
        );
    }

    #[test]
    fn comments_are_skipped() {
        assert_eq!(
            lex("1 // comment\n2"),
            vec![Token::Int(1), Token::Int(2)]
        );
    }
}
