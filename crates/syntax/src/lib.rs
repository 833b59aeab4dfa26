#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # stx-syntax
//!
//! Lexer, parser and syntax tree for the configuration language read by `stx`.
//!
//! This crate knows nothing about evaluation. It defines:
//!
//! - [`Lexer`] with newline comma insertion and comment collection
//! - [`parse_file`] producing a [`ParsedFile`] (source text plus [`ast::File`])
//! - [`Revision`] to select the grammar revision, including the legacy
//!   `Label :: value` definition form
//! - [`Span`], [`Position`] and [`SourceFile`] for error locations
//! - [`package_name`] for reading a package clause from files that do not parse

pub mod ast;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod span;
pub mod token;

pub use error::{ParseError, ParseResult};
pub use lexer::Lexer;
pub use parser::{
    MAX_NESTING_DEPTH, ParseOptions, ParsedFile, Revision, package_name, parse_file, parse_source,
};
pub use span::{Position, SourceFile, Span};
pub use token::{Comment, Token, TokenKind};
