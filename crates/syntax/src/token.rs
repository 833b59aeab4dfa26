//! Token types for the configuration lexer

use std::fmt;

use crate::span::Span;

/// A source comment (`// ...`), text without the leading slashes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    /// Comment text, trimmed of `//` and one leading space
    pub text: String,
    /// Location of the whole comment
    pub span: Span,
}

/// A token with position information and the doc comments that precede it
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// The token kind
    pub kind: TokenKind,
    /// Source span for this token
    pub span: Span,
    /// Comments on their own lines directly above this token
    pub doc: Vec<Comment>,
    /// Whether this is a comma inserted at a line break
    pub implicit: bool,
}

impl Token {
    /// Create a new token with span
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self {
            kind,
            span,
            doc: Vec::new(),
            implicit: false,
        }
    }
}

/// The kind of token
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Identifier, including `#Definition` and `_hidden` forms
    Ident(String),
    /// String literal with escapes resolved
    String(String),
    /// Integer literal
    Int(i64),
    /// Float literal
    Float(f64),
    /// `null`
    Null,
    /// `true`
    True,
    /// `false`
    False,
    /// `package`
    Package,
    /// `import`
    Import,

    /// `{`
    LeftBrace,
    /// `}`
    RightBrace,
    /// `[`
    LeftBracket,
    /// `]`
    RightBracket,
    /// `(`
    LeftParen,
    /// `)`
    RightParen,
    /// `:`
    Colon,
    /// `::` (legacy definition marker)
    DoubleColon,
    /// `,` or a line break that ends a declaration
    Comma,
    /// `.`
    Dot,
    /// `...`
    Ellipsis,
    /// `&`
    Amp,
    /// `|`
    Pipe,
    /// `*`
    Star,
    /// `-`
    Minus,
    /// `?`
    Question,

    /// End of input
    Eof,
}

impl TokenKind {
    /// Whether a line break after this token terminates the declaration
    pub fn ends_line(&self) -> bool {
        matches!(
            self,
            Self::Ident(_)
                | Self::String(_)
                | Self::Int(_)
                | Self::Float(_)
                | Self::Null
                | Self::True
                | Self::False
                | Self::RightBrace
                | Self::RightBracket
                | Self::RightParen
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ident(name) => write!(f, "identifier {name}"),
            Self::String(s) => write!(f, "string {s:?}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Float(n) => write!(f, "{n}"),
            Self::Null => write!(f, "null"),
            Self::True => write!(f, "true"),
            Self::False => write!(f, "false"),
            Self::Package => write!(f, "package"),
            Self::Import => write!(f, "import"),
            Self::LeftBrace => write!(f, "'{{'"),
            Self::RightBrace => write!(f, "'}}'"),
            Self::LeftBracket => write!(f, "'['"),
            Self::RightBracket => write!(f, "']'"),
            Self::LeftParen => write!(f, "'('"),
            Self::RightParen => write!(f, "')'"),
            Self::Colon => write!(f, "':'"),
            Self::DoubleColon => write!(f, "'::'"),
            Self::Comma => write!(f, "','"),
            Self::Dot => write!(f, "'.'"),
            Self::Ellipsis => write!(f, "'...'"),
            Self::Amp => write!(f, "'&'"),
            Self::Pipe => write!(f, "'|'"),
            Self::Star => write!(f, "'*'"),
            Self::Minus => write!(f, "'-'"),
            Self::Question => write!(f, "'?'"),
            Self::Eof => write!(f, "end of file"),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.implicit {
            write!(f, "newline")
        } else {
            self.kind.fmt(f)
        }
    }
}
