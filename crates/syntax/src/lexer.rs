//! Lexer for tokenizing configuration files
//!
//! Besides splitting the input into tokens, the lexer inserts a comma at a
//! line break that follows an identifier, literal or closing delimiter, so
//! declarations can be separated by newlines. Comments are collected on the
//! side when requested: own-line comments become the `doc` of the next token,
//! every comment is kept in [`Lexer::comments`].

use crate::error::{ParseError, ParseResult};
use crate::span::{SourceFile, Span};
use crate::token::{Comment, Token, TokenKind};

/// Lexer for tokenizing configuration source
pub struct Lexer<'a> {
    source: &'a SourceFile,
    input: &'a str,
    position: usize,
    keep_comments: bool,
    /// A line break here ends the current declaration
    pending_comma: bool,
    /// Something other than whitespace was seen on the current line
    line_has_content: bool,
    doc: Vec<Comment>,
    comments: Vec<Comment>,
}

impl<'a> Lexer<'a> {
    /// Create a lexer over a source file
    pub fn new(source: &'a SourceFile, keep_comments: bool) -> Self {
        Self {
            source,
            input: source.text(),
            position: 0,
            keep_comments,
            pending_comma: false,
            line_has_content: false,
            doc: Vec::new(),
            comments: Vec::new(),
        }
    }

    /// Tokenize the entire input, ending with [`TokenKind::Eof`]
    pub fn tokenize(&mut self) -> ParseResult<Vec<Token>> {
        let mut tokens = Vec::with_capacity((self.input.len() / 4).max(8));
        loop {
            let token = self.next_token()?;
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    /// All comments seen so far, in source order
    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    /// Consume the lexer and return the collected comments
    pub fn into_comments(self) -> Vec<Comment> {
        self.comments
    }

    /// Get the next token from the input
    pub fn next_token(&mut self) -> ParseResult<Token> {
        loop {
            self.skip_blanks();
            match self.current_char() {
                None => {
                    if self.pending_comma {
                        self.pending_comma = false;
                        return Ok(self.implicit_comma());
                    }
                    let mut eof = Token::new(TokenKind::Eof, Span::new(self.position, self.position));
                    eof.doc = std::mem::take(&mut self.doc);
                    return Ok(eof);
                }
                Some('\n') => {
                    let comma = self.pending_comma.then(|| self.implicit_comma());
                    self.advance();
                    if !self.line_has_content {
                        // a blank line detaches comments from what follows
                        self.doc.clear();
                    }
                    self.line_has_content = false;
                    self.pending_comma = false;
                    if let Some(comma) = comma {
                        return Ok(comma);
                    }
                }
                Some('/') if self.peek() == Some('/') => self.read_comment(),
                Some(_) => break,
            }
        }

        let mut token = self.read_token()?;
        token.doc = std::mem::take(&mut self.doc);
        self.line_has_content = true;
        self.pending_comma = token.kind.ends_line();
        Ok(token)
    }

    fn implicit_comma(&self) -> Token {
        let mut token = Token::new(TokenKind::Comma, Span::new(self.position, self.position));
        token.implicit = true;
        token
    }

    fn read_token(&mut self) -> ParseResult<Token> {
        let start = self.position;
        let Some(ch) = self.current_char() else {
            return Ok(Token::new(TokenKind::Eof, Span::new(start, start)));
        };

        let kind = match ch {
            '{' => self.single(TokenKind::LeftBrace),
            '}' => self.single(TokenKind::RightBrace),
            '[' => self.single(TokenKind::LeftBracket),
            ']' => self.single(TokenKind::RightBracket),
            '(' => self.single(TokenKind::LeftParen),
            ')' => self.single(TokenKind::RightParen),
            ',' => self.single(TokenKind::Comma),
            '&' => self.single(TokenKind::Amp),
            '|' => self.single(TokenKind::Pipe),
            '*' => self.single(TokenKind::Star),
            '-' => self.single(TokenKind::Minus),
            '?' => self.single(TokenKind::Question),
            ':' if self.peek() == Some(':') => {
                self.advance();
                self.advance();
                TokenKind::DoubleColon
            }
            ':' => self.single(TokenKind::Colon),
            '.' if self.input[self.position..].starts_with("...") => {
                self.position += 3;
                TokenKind::Ellipsis
            }
            '.' => self.single(TokenKind::Dot),
            '"' if self.input[self.position..].starts_with("\"\"\"") => {
                TokenKind::String(self.read_multiline_string()?)
            }
            '"' => TokenKind::String(self.read_string()?),
            ch if ch.is_ascii_digit() => self.read_number()?,
            ch if ch.is_alphabetic() || ch == '_' || ch == '$' || ch == '#' => {
                self.read_identifier_or_keyword()?
            }
            _ => {
                return Err(self.error(
                    format!("unexpected character {ch:?}"),
                    Span::single(start),
                ));
            }
        };

        Ok(Token::new(kind, Span::new(start, self.position)))
    }

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.advance();
        kind
    }

    /// Get the current character at position
    fn current_char(&self) -> Option<char> {
        self.input[self.position..].chars().next()
    }

    /// Peek at the next character without advancing
    fn peek(&self) -> Option<char> {
        let current = self.current_char()?;
        self.input[self.position + current.len_utf8()..].chars().next()
    }

    /// Advance position by the current character's UTF-8 byte length
    fn advance(&mut self) {
        if let Some(ch) = self.current_char() {
            self.position += ch.len_utf8();
        }
    }

    /// Skip whitespace other than line breaks
    fn skip_blanks(&mut self) {
        while let Some(ch) = self.current_char() {
            if ch.is_whitespace() && ch != '\n' {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_comment(&mut self) {
        let start = self.position;
        let end = self.input[start..]
            .find('\n')
            .map_or(self.input.len(), |i| start + i);
        self.position = end;

        if !self.keep_comments {
            return;
        }
        let raw = &self.input[start + 2..end];
        let comment = Comment {
            text: raw.strip_prefix(' ').unwrap_or(raw).trim_end().to_string(),
            span: Span::new(start, end),
        };
        if !self.line_has_content {
            self.doc.push(comment.clone());
            self.line_has_content = true;
        }
        self.comments.push(comment);
    }

    /// Read a single-line string literal
    fn read_string(&mut self) -> ParseResult<String> {
        let start = self.position;
        self.advance(); // opening quote

        let mut result = String::new();
        loop {
            match self.current_char() {
                None | Some('\n') => {
                    return Err(self.error("string literal not terminated", Span::single(start)));
                }
                Some('"') => {
                    self.advance();
                    return Ok(result);
                }
                Some('\\') => result.push(self.read_escape()?),
                Some(ch) => {
                    result.push(ch);
                    self.advance();
                }
            }
        }
    }

    /// Read a `"""` string; the closing delimiter's indentation is removed
    /// from every line.
    fn read_multiline_string(&mut self) -> ParseResult<String> {
        let start = self.position;
        self.position += 3;
        self.skip_blanks();
        if self.current_char() != Some('\n') {
            return Err(self.error(
                "expected newline after multiline quote \"\"\"",
                Span::new(start, self.position),
            ));
        }
        self.advance();

        let input = self.input;
        let mut lines: Vec<(usize, &str)> = Vec::new();
        loop {
            if self.position >= input.len() {
                return Err(self.error("string literal not terminated", Span::new(start, start + 3)));
            }
            let line_start = self.position;
            let line_end = input[line_start..]
                .find('\n')
                .map_or(input.len(), |i| line_start + i);
            let line = &input[line_start..line_end];
            let trimmed = line.trim_start();
            if let Some(rest) = trimmed.strip_prefix("\"\"\"") {
                let indent = &line[..line.len() - trimmed.len()];
                self.position = line_end - rest.len();
                return self.dedent(&lines, indent);
            }
            lines.push((line_start, line));
            self.position = (line_end + 1).min(input.len());
        }
    }

    fn dedent(&self, lines: &[(usize, &str)], indent: &str) -> ParseResult<String> {
        let mut result = String::new();
        for (i, &(offset, line)) in lines.iter().enumerate() {
            if i > 0 {
                result.push('\n');
            }
            if line.trim().is_empty() {
                continue;
            }
            let Some(body) = line.strip_prefix(indent) else {
                return Err(self.error(
                    "invalid whitespace in multiline string",
                    Span::single(offset),
                ));
            };
            self.unescape_into(body, offset + indent.len(), &mut result)?;
        }
        Ok(result)
    }

    fn unescape_into(&self, raw: &str, offset: usize, out: &mut String) -> ParseResult<()> {
        let mut chars = raw.char_indices();
        while let Some((i, ch)) = chars.next() {
            if ch != '\\' {
                out.push(ch);
                continue;
            }
            let Some((_, escaped)) = chars.next() else {
                return Err(self.error("unterminated escape sequence", Span::single(offset + i)));
            };
            let resolved = match escaped {
                'n' => '\n',
                't' => '\t',
                'r' => '\r',
                '\\' => '\\',
                '"' => '"',
                '/' => '/',
                '(' => {
                    return Err(self.error(
                        "string interpolation is not supported",
                        Span::single(offset + i),
                    ));
                }
                'u' => {
                    let hex: String = (0..4).filter_map(|_| chars.next().map(|(_, c)| c)).collect();
                    decode_unicode(&hex).ok_or_else(|| {
                        self.error("invalid unicode escape", Span::single(offset + i))
                    })?
                }
                other => {
                    return Err(self.error(
                        format!("unknown escape sequence \\{other}"),
                        Span::single(offset + i),
                    ));
                }
            };
            out.push(resolved);
        }
        Ok(())
    }

    fn read_escape(&mut self) -> ParseResult<char> {
        let start = self.position;
        self.advance(); // backslash
        let len = match self.current_char() {
            Some('u') => 5,
            Some(ch) => ch.len_utf8(),
            None => 0,
        };
        let end = (self.position + len).min(self.input.len());
        let raw = self.input.get(start..end).unwrap_or("\\");
        let mut out = String::new();
        self.unescape_into(raw, start, &mut out)?;
        self.position = end;
        out.chars()
            .next()
            .ok_or_else(|| self.error("unterminated escape sequence", Span::single(start)))
    }

    /// Read a number (integer or float), `_` separators allowed
    fn read_number(&mut self) -> ParseResult<TokenKind> {
        let start = self.position;
        let mut is_float = false;

        self.eat_digits();
        if self.current_char() == Some('.') && self.peek().is_some_and(|c| c.is_ascii_digit()) {
            is_float = true;
            self.advance();
            self.eat_digits();
        }
        if matches!(self.current_char(), Some('e' | 'E')) {
            let save = self.position;
            self.advance();
            if matches!(self.current_char(), Some('+' | '-')) {
                self.advance();
            }
            if self.current_char().is_some_and(|c| c.is_ascii_digit()) {
                is_float = true;
                self.eat_digits();
            } else {
                self.position = save;
            }
        }

        let span = Span::new(start, self.position);
        let text: String = span.slice(self.input).chars().filter(|&c| c != '_').collect();
        if is_float {
            match text.parse::<f64>() {
                Ok(f) if f.is_finite() => Ok(TokenKind::Float(f)),
                _ => Err(self.error("invalid float literal", span)),
            }
        } else {
            text.parse::<i64>()
                .map(TokenKind::Int)
                .map_err(|_| self.error("integer literal out of range", span))
        }
    }

    fn eat_digits(&mut self) {
        while let Some(ch) = self.current_char() {
            if ch.is_ascii_digit() || ch == '_' {
                self.advance();
            } else {
                break;
            }
        }
    }

    /// Read an identifier or keyword
    fn read_identifier_or_keyword(&mut self) -> ParseResult<TokenKind> {
        let start = self.position;
        if self.current_char() == Some('#') {
            self.advance();
            if !self.current_char().is_some_and(|c| c.is_alphabetic() || c == '_') {
                return Err(self.error("expected identifier after '#'", Span::single(start)));
            }
        }
        while let Some(ch) = self.current_char() {
            if ch.is_alphanumeric() || ch == '_' || ch == '$' {
                self.advance();
            } else {
                break;
            }
        }

        let name = &self.input[start..self.position];
        Ok(match name {
            "package" => TokenKind::Package,
            "import" => TokenKind::Import,
            "null" => TokenKind::Null,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            _ => TokenKind::Ident(name.to_string()),
        })
    }

    fn error(&self, message: impl Into<String>, span: Span) -> ParseError {
        ParseError::new(message, self.source.position(span))
    }
}

fn decode_unicode(hex: &str) -> Option<char> {
    if hex.len() != 4 {
        return None;
    }
    u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
}
