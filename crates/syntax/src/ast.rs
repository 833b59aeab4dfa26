//! Abstract Syntax Tree (AST) node types
//!
//! The tree is unevaluated: fields that share a label are not merged here,
//! references are not resolved.

use crate::span::Span;
use crate::token::Comment;

/// A parsed source file
#[derive(Debug, Clone, PartialEq)]
pub struct File {
    /// `package` clause, if present
    pub package: Option<Ident>,
    /// Import declarations
    pub imports: Vec<Import>,
    /// Top-level declarations
    pub decls: Vec<Decl>,
    /// Comments directly above the package clause
    pub doc: Vec<Comment>,
    /// Every comment in the file, in source order
    pub comments: Vec<Comment>,
}

impl File {
    /// Package name declared by the file
    pub fn package_name(&self) -> Option<&str> {
        self.package.as_ref().map(|p| p.name.as_str())
    }
}

/// An identifier occurrence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    /// Identifier text, including any `#` or `_` prefix
    pub name: String,
    /// Location
    pub span: Span,
}

/// `import "path"` or `import alias "path"`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    /// Import path
    pub path: String,
    /// Explicit local name
    pub alias: Option<Ident>,
    /// Location
    pub span: Span,
}

impl Import {
    /// Name the import is referenced by inside the file
    pub fn local_name(&self) -> &str {
        match &self.alias {
            Some(alias) => &alias.name,
            None => self
                .path
                .rsplit('/')
                .next()
                .unwrap_or(&self.path),
        }
    }
}

/// A declaration inside a file or struct body
#[derive(Debug, Clone, PartialEq)]
pub enum Decl {
    /// `label: value`
    Field(Field),
    /// A bare expression unified into the enclosing struct
    Embed(Expr),
}

/// A field declaration
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// Field label
    pub label: Label,
    /// `label?: value`
    pub optional: bool,
    /// Field value
    pub value: Expr,
    /// Doc comments above the field
    pub doc: Vec<Comment>,
    /// Location of the whole declaration
    pub span: Span,
}

/// Field label
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    /// Label text as referenced (`#Base`, `_tmp`, `name`, `"quoted key"`)
    pub name: String,
    /// How the label participates in output
    pub kind: LabelKind,
    /// Location
    pub span: Span,
}

/// Label visibility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LabelKind {
    /// Exported field
    Regular,
    /// `#Name` or legacy `Name ::`, never exported
    Definition,
    /// `_name`, never exported
    Hidden,
}

/// An expression node
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `null`
    Null(Span),
    /// `true` / `false`
    Bool(bool, Span),
    /// Integer literal
    Int(i64, Span),
    /// Float literal
    Float(f64, Span),
    /// String literal
    String(String, Span),
    /// Reference to a field or predeclared identifier
    Ident(Ident),
    /// `base.field`
    Selector {
        /// Expression being selected from
        base: Box<Expr>,
        /// Selected label
        field: Ident,
    },
    /// `{ ... }`
    Struct(StructLit),
    /// `[ ... ]`
    List(ListLit),
    /// `-x` or `*x`
    Unary {
        /// Operator
        op: UnaryOp,
        /// Operand
        operand: Box<Expr>,
        /// Location including the operator
        span: Span,
    },
    /// `a & b` or `a | b`
    Binary {
        /// Operator
        op: BinaryOp,
        /// Left operand
        lhs: Box<Expr>,
        /// Right operand
        rhs: Box<Expr>,
    },
    /// `( x )`
    Paren(Box<Expr>, Span),
}

impl Expr {
    /// Location of the expression
    pub fn span(&self) -> Span {
        match self {
            Self::Null(span)
            | Self::Bool(_, span)
            | Self::Int(_, span)
            | Self::Float(_, span)
            | Self::String(_, span)
            | Self::Unary { span, .. }
            | Self::Paren(_, span) => *span,
            Self::Ident(ident) => ident.span,
            Self::Selector { base, field } => base.span().merge(field.span),
            Self::Struct(lit) => lit.span,
            Self::List(lit) => lit.span,
            Self::Binary { lhs, rhs, .. } => lhs.span().merge(rhs.span()),
        }
    }
}

/// Struct literal
#[derive(Debug, Clone, PartialEq)]
pub struct StructLit {
    /// Declarations in source order
    pub decls: Vec<Decl>,
    /// Location including braces
    pub span: Span,
}

/// List literal
#[derive(Debug, Clone, PartialEq)]
pub struct ListLit {
    /// Elements in order
    pub elems: Vec<Expr>,
    /// Location including brackets
    pub span: Span,
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// `-x`
    Neg,
    /// `*x`, marks the default of a disjunction
    Default,
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// `&`
    Unify,
    /// `|`
    Disjoin,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn import_local_name() {
        let plain = Import {
            path: "encoding/yaml".into(),
            alias: None,
            span: Span::default(),
        };
        assert_eq!(plain.local_name(), "yaml");

        let aliased = Import {
            path: "strings".into(),
            alias: Some(Ident {
                name: "s".into(),
                span: Span::default(),
            }),
            span: Span::default(),
        };
        assert_eq!(aliased.local_name(), "s");
    }

    #[test]
    fn binary_span_covers_operands() {
        let expr = Expr::Binary {
            op: BinaryOp::Unify,
            lhs: Box::new(Expr::Int(1, Span::new(3, 4))),
            rhs: Box::new(Expr::Ident(Ident {
                name: "int".into(),
                span: Span::new(7, 10),
            })),
        };
        assert_eq!(expr.span(), Span::new(3, 10));
    }
}
