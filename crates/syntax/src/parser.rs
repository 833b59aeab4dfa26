//! Parser for converting tokens into an AST
//!
//! Recursive descent with one level per operator precedence:
//! `|` < `&` < unary (`-`, `*`) < selectors < primaries.

use std::path::{Path, PathBuf};

use crate::ast::{
    BinaryOp, Decl, Expr, Field, File, Ident, Import, Label, LabelKind, ListLit, StructLit,
    UnaryOp,
};
use crate::error::{ParseError, ParseResult};
use crate::lexer::Lexer;
use crate::span::{SourceFile, Span};
use crate::token::{Token, TokenKind};

/// Maximum nesting of expressions, fields and operator chains
pub const MAX_NESTING_DEPTH: usize = 256;

/// Grammar revision the parser accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Revision {
    /// v0.0.13-compatible syntax: also accepts `Label :: value` definitions
    Legacy,
    /// Definitions only through `#Label`
    #[default]
    Current,
}

impl Revision {
    /// Whether `Label :: value` declares a definition
    pub fn allows_double_colon(self) -> bool {
        matches!(self, Self::Legacy)
    }
}

/// Parser configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ParseOptions {
    /// Grammar revision
    pub revision: Revision,
    /// Keep comments in the AST
    pub comments: bool,
}

impl ParseOptions {
    /// Options for a given revision, comments kept
    pub fn new(revision: Revision) -> Self {
        Self {
            revision,
            comments: true,
        }
    }
}

/// A source file together with its syntax tree
#[derive(Debug, Clone)]
pub struct ParsedFile {
    /// Source text and line table
    pub source: SourceFile,
    /// Syntax tree
    pub ast: File,
}

impl ParsedFile {
    /// Path the file was read from
    pub fn path(&self) -> &Path {
        self.source.path()
    }

    /// Declared package name
    pub fn package_name(&self) -> Option<&str> {
        self.ast.package_name()
    }
}

/// Parse `text` read from `path`
pub fn parse_file(
    path: impl Into<PathBuf>,
    text: impl Into<String>,
    options: ParseOptions,
) -> ParseResult<ParsedFile> {
    let source = SourceFile::new(path, text);
    let ast = parse_source(&source, options)?;
    Ok(ParsedFile { source, ast })
}

/// Parse an already wrapped source file
pub fn parse_source(source: &SourceFile, options: ParseOptions) -> ParseResult<File> {
    let mut lexer = Lexer::new(source, options.comments);
    let tokens = lexer.tokenize()?;
    let mut parser = Parser {
        source,
        tokens,
        position: 0,
        options,
        depth: 0,
    };
    let mut file = parser.parse_file()?;
    file.comments = lexer.into_comments();
    Ok(file)
}

/// Read only the package clause of `text`.
///
/// Tolerates syntax errors after the clause so callers can group files that
/// fail to parse.
pub fn package_name(text: &str) -> Option<String> {
    let source = SourceFile::new("", text);
    let mut lexer = Lexer::new(&source, false);
    let mut token = lexer.next_token().ok()?;
    while token.kind == TokenKind::Comma {
        token = lexer.next_token().ok()?;
    }
    if token.kind != TokenKind::Package {
        return None;
    }
    match lexer.next_token().ok()?.kind {
        TokenKind::Ident(name) => Some(name),
        _ => None,
    }
}

/// Parser for converting tokens into an AST
struct Parser<'a> {
    source: &'a SourceFile,
    tokens: Vec<Token>,
    position: usize,
    options: ParseOptions,
    depth: usize,
}

impl Parser<'_> {
    fn parse_file(&mut self) -> ParseResult<File> {
        self.skip_commas();

        let doc = self.current().doc.clone();
        let package = if self.check(&TokenKind::Package) {
            self.advance();
            let ident = self.expect_ident("package name")?;
            self.expect_separator()?;
            Some(ident)
        } else {
            None
        };

        let mut imports = Vec::new();
        while self.check(&TokenKind::Import) {
            self.advance();
            if self.check(&TokenKind::LeftParen) {
                self.advance();
                self.skip_commas();
                while !self.check(&TokenKind::RightParen) {
                    imports.push(self.parse_import_clause()?);
                    self.expect_list_separator(&TokenKind::RightParen)?;
                }
                self.advance();
            } else {
                imports.push(self.parse_import_clause()?);
            }
            self.expect_separator()?;
        }

        let mut decls = Vec::new();
        while !self.check(&TokenKind::Eof) {
            if self.check(&TokenKind::Import) {
                return Err(self.error_here("imports must appear before other declarations"));
            }
            decls.push(self.parse_decl()?);
            self.expect_separator()?;
        }

        Ok(File {
            package,
            imports,
            decls,
            doc,
            comments: Vec::new(),
        })
    }

    fn parse_import_clause(&mut self) -> ParseResult<Import> {
        let start = self.current().span;
        let alias = match &self.current().kind {
            TokenKind::Ident(_) => Some(self.expect_ident("import name")?),
            _ => None,
        };
        match self.current().kind.clone() {
            TokenKind::String(path) => {
                let span = start.merge(self.current().span);
                self.advance();
                Ok(Import { path, alias, span })
            }
            _ => Err(self.unexpected("import path")),
        }
    }

    fn parse_decl(&mut self) -> ParseResult<Decl> {
        if self.at_field_start() {
            Ok(Decl::Field(self.parse_field()?))
        } else {
            Ok(Decl::Embed(self.parse_expression()?))
        }
    }

    /// A label followed by `:`, `::` or `?`
    fn at_field_start(&self) -> bool {
        let is_label = matches!(
            self.current().kind,
            TokenKind::Ident(_) | TokenKind::String(_)
        );
        is_label
            && matches!(
                self.peek_kind(),
                TokenKind::Colon | TokenKind::DoubleColon | TokenKind::Question
            )
    }

    fn parse_field(&mut self) -> ParseResult<Field> {
        self.descend()?;
        let field = self.parse_field_inner();
        self.depth -= 1;
        field
    }

    fn parse_field_inner(&mut self) -> ParseResult<Field> {
        let doc = self.current().doc.clone();
        let mut label = self.parse_label()?;

        let optional = if self.check(&TokenKind::Question) {
            self.advance();
            true
        } else {
            false
        };

        match self.current().kind {
            TokenKind::Colon => self.advance(),
            TokenKind::DoubleColon if self.options.revision.allows_double_colon() => {
                label.kind = LabelKind::Definition;
                self.advance();
            }
            TokenKind::DoubleColon => {
                return Err(self.error_here(
                    "'::' definitions are not supported in this revision; use #Label",
                ));
            }
            _ => return Err(self.unexpected("':'")),
        }

        let value = if self.at_field_start() {
            // `a: b: c` is shorthand for `a: { b: c }`
            let inner = self.parse_field()?;
            let span = inner.span;
            Expr::Struct(StructLit {
                decls: vec![Decl::Field(inner)],
                span,
            })
        } else {
            self.parse_expression()?
        };

        let span = label.span.merge(value.span());
        Ok(Field {
            label,
            optional,
            value,
            doc,
            span,
        })
    }

    fn parse_label(&mut self) -> ParseResult<Label> {
        let span = self.current().span;
        let (name, kind) = match self.current().kind.clone() {
            TokenKind::Ident(name) if name == "_" => {
                return Err(self.error_here("'_' cannot be used as a label"));
            }
            TokenKind::Ident(name) => {
                let kind = if name.starts_with('#') {
                    LabelKind::Definition
                } else if name.starts_with('_') {
                    LabelKind::Hidden
                } else {
                    LabelKind::Regular
                };
                (name, kind)
            }
            TokenKind::String(name) => (name, LabelKind::Regular),
            _ => return Err(self.unexpected("label")),
        };
        self.advance();
        Ok(Label { name, kind, span })
    }

    /// Parse a full expression
    fn parse_expression(&mut self) -> ParseResult<Expr> {
        self.descend()?;
        let expr = self.parse_disjunction();
        self.depth -= 1;
        expr
    }

    fn parse_disjunction(&mut self) -> ParseResult<Expr> {
        let entry = self.depth;
        let mut expr = self.parse_unification()?;
        while self.check(&TokenKind::Pipe) {
            self.advance();
            self.descend()?;
            let rhs = self.parse_unification()?;
            expr = Expr::Binary {
                op: BinaryOp::Disjoin,
                lhs: Box::new(expr),
                rhs: Box::new(rhs),
            };
        }
        self.depth = entry;
        Ok(expr)
    }

    fn parse_unification(&mut self) -> ParseResult<Expr> {
        let entry = self.depth;
        let mut expr = self.parse_unary()?;
        while self.check(&TokenKind::Amp) {
            self.advance();
            self.descend()?;
            let rhs = self.parse_unary()?;
            expr = Expr::Binary {
                op: BinaryOp::Unify,
                lhs: Box::new(expr),
                rhs: Box::new(rhs),
            };
        }
        self.depth = entry;
        Ok(expr)
    }

    fn parse_unary(&mut self) -> ParseResult<Expr> {
        let op = match self.current().kind {
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Star => UnaryOp::Default,
            _ => return self.parse_postfix(),
        };
        let start = self.current().span;
        self.advance();
        self.descend()?;
        let operand = self.parse_unary()?;
        self.depth -= 1;
        Ok(Expr::Unary {
            op,
            span: start.merge(operand.span()),
            operand: Box::new(operand),
        })
    }

    /// Parse selectors (`a.b.c`)
    fn parse_postfix(&mut self) -> ParseResult<Expr> {
        let entry = self.depth;
        let mut expr = self.parse_primary()?;
        while self.check(&TokenKind::Dot) {
            self.advance();
            self.descend()?;
            let field = match self.current().kind.clone() {
                TokenKind::Ident(name) => Ident {
                    name,
                    span: self.current().span,
                },
                TokenKind::String(name) => Ident {
                    name,
                    span: self.current().span,
                },
                _ => return Err(self.unexpected("field name after '.'")),
            };
            self.advance();
            expr = Expr::Selector {
                base: Box::new(expr),
                field,
            };
        }
        self.depth = entry;
        Ok(expr)
    }

    fn parse_primary(&mut self) -> ParseResult<Expr> {
        let span = self.current().span;
        let expr = match self.current().kind.clone() {
            TokenKind::Null => Expr::Null(span),
            TokenKind::True => Expr::Bool(true, span),
            TokenKind::False => Expr::Bool(false, span),
            TokenKind::Int(n) => Expr::Int(n, span),
            TokenKind::Float(n) => Expr::Float(n, span),
            TokenKind::String(s) => Expr::String(s, span),
            TokenKind::Ident(name) => Expr::Ident(Ident { name, span }),
            TokenKind::LeftBrace => return self.parse_struct().map(Expr::Struct),
            TokenKind::LeftBracket => return self.parse_list().map(Expr::List),
            TokenKind::LeftParen => {
                self.advance();
                let inner = self.parse_expression()?;
                let end = self.expect(&TokenKind::RightParen, "')'")?;
                return Ok(Expr::Paren(Box::new(inner), span.merge(end)));
            }
            TokenKind::Ellipsis => {
                return Err(self.error_here("open structs and lists ('...') are not supported"));
            }
            _ => return Err(self.unexpected("expression")),
        };
        self.advance();
        Ok(expr)
    }

    fn parse_struct(&mut self) -> ParseResult<StructLit> {
        let start = self.expect(&TokenKind::LeftBrace, "'{'")?;
        self.skip_commas();
        let mut decls = Vec::new();
        while !self.check(&TokenKind::RightBrace) {
            if self.check(&TokenKind::Eof) {
                return Err(self.unexpected("'}'"));
            }
            decls.push(self.parse_decl()?);
            self.expect_list_separator(&TokenKind::RightBrace)?;
        }
        let end = self.expect(&TokenKind::RightBrace, "'}'")?;
        Ok(StructLit {
            decls,
            span: start.merge(end),
        })
    }

    fn parse_list(&mut self) -> ParseResult<ListLit> {
        let start = self.expect(&TokenKind::LeftBracket, "'['")?;
        self.skip_commas();
        let mut elems = Vec::new();
        while !self.check(&TokenKind::RightBracket) {
            if self.check(&TokenKind::Eof) {
                return Err(self.unexpected("']'"));
            }
            elems.push(self.parse_expression()?);
            self.expect_list_separator(&TokenKind::RightBracket)?;
        }
        let end = self.expect(&TokenKind::RightBracket, "']'")?;
        Ok(ListLit {
            elems,
            span: start.merge(end),
        })
    }

    /// One level deeper into the tree; fails past [`MAX_NESTING_DEPTH`]
    fn descend(&mut self) -> ParseResult<()> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(self.error_here(format!(
                "nesting too deep (more than {MAX_NESTING_DEPTH} levels)"
            )));
        }
        self.depth += 1;
        Ok(())
    }

    // ---- token helpers ----

    fn current(&self) -> &Token {
        // tokenize always ends with Eof and the parser never advances past it
        &self.tokens[self.position.min(self.tokens.len() - 1)]
    }

    fn peek_kind(&self) -> &TokenKind {
        &self.tokens[(self.position + 1).min(self.tokens.len() - 1)].kind
    }

    fn check(&self, kind: &TokenKind) -> bool {
        &self.current().kind == kind
    }

    fn advance(&mut self) {
        if self.current().kind != TokenKind::Eof {
            self.position += 1;
        }
    }

    fn skip_commas(&mut self) {
        while self.check(&TokenKind::Comma) {
            self.advance();
        }
    }

    fn expect(&mut self, kind: &TokenKind, what: &str) -> ParseResult<Span> {
        if self.check(kind) {
            let span = self.current().span;
            self.advance();
            Ok(span)
        } else {
            Err(self.unexpected(what))
        }
    }

    fn expect_ident(&mut self, what: &str) -> ParseResult<Ident> {
        match self.current().kind.clone() {
            TokenKind::Ident(name) => {
                let span = self.current().span;
                self.advance();
                Ok(Ident { name, span })
            }
            _ => Err(self.unexpected(what)),
        }
    }

    /// After a top-level declaration: a comma (explicit or line break) or EOF
    fn expect_separator(&mut self) -> ParseResult<()> {
        match self.current().kind {
            TokenKind::Comma => {
                self.skip_commas();
                Ok(())
            }
            TokenKind::Eof => Ok(()),
            _ => Err(self.unexpected("',' or newline")),
        }
    }

    /// After an element inside brackets: a comma or the closing token
    fn expect_list_separator(&mut self, close: &TokenKind) -> ParseResult<()> {
        if self.check(&TokenKind::Comma) {
            self.skip_commas();
            Ok(())
        } else if self.check(close) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("',' or {close}")))
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        self.error_here(format!("expected {expected}, found {}", self.current()))
    }

    fn error_here(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(message, self.source.position(self.current().span))
    }
}
