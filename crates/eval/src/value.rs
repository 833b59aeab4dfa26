//! Partially evaluated values
//!
//! A [`Val`] is the lattice element produced while unifying an instance. Only
//! concrete values survive export; types, top and unresolved disjunctions are
//! reported as incomplete.

use std::fmt;

use indexmap::IndexMap;
use stx_syntax::Position;
use stx_syntax::ast::LabelKind;

/// Predeclared type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    /// `bool`
    Bool,
    /// `int`
    Int,
    /// `float`
    Float,
    /// `number`, either int or float
    Number,
    /// `string`
    String,
}

impl Kind {
    /// Type named by a predeclared identifier
    pub fn from_ident(name: &str) -> Option<Self> {
        match name {
            "bool" => Some(Self::Bool),
            "int" => Some(Self::Int),
            "float" => Some(Self::Float),
            "number" => Some(Self::Number),
            "string" => Some(Self::String),
            _ => None,
        }
    }

    /// Identifier that names the type
    pub fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::Number => "number",
            Self::String => "string",
        }
    }

    /// Greatest lower bound of two types
    pub fn meet(self, other: Self) -> Option<Self> {
        match (self, other) {
            (a, b) if a == b => Some(a),
            (Self::Number, k @ (Self::Int | Self::Float))
            | (k @ (Self::Int | Self::Float), Self::Number) => Some(k),
            _ => None,
        }
    }

    /// Whether a concrete value is an instance of this type
    pub fn admits(self, value: &Val) -> bool {
        matches!(
            (self, value),
            (Self::Bool, Val::Bool(_))
                | (Self::Int | Self::Number, Val::Int(_))
                | (Self::Float | Self::Number, Val::Float(_))
                | (Self::String, Val::String(_))
        )
    }
}

/// A value in the evaluation lattice
#[derive(Debug, Clone, PartialEq)]
pub enum Val {
    /// `_`, unifies with anything
    Top,
    /// A type constraint
    Kind(Kind),
    /// `null`
    Null,
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i64),
    /// Float
    Float(f64),
    /// String
    String(String),
    /// Struct with ordered fields
    Struct(StructVal),
    /// List
    List(Vec<Val>),
    /// Two or more alternatives, normalized (see [`crate::unify::disjoin`])
    Disjunction(Vec<Alternative>),
}

impl Val {
    /// Short type name used in conflict messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Top => "_",
            Self::Kind(kind) => kind.name(),
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Struct(_) => "struct",
            Self::List(_) => "list",
            Self::Disjunction(_) => "disjunction",
        }
    }

    /// The value export would use: the single default of a disjunction, or
    /// the value itself.
    pub fn resolved(&self) -> Option<&Val> {
        match self {
            Self::Disjunction(alternatives) => {
                let mut defaults = alternatives.iter().filter(|a| a.default);
                match (defaults.next(), defaults.next()) {
                    (Some(only), None) => Some(&only.value),
                    _ => None,
                }
            }
            other => Some(other),
        }
    }
}

/// Struct value
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StructVal {
    /// Fields in declaration order
    pub fields: IndexMap<String, FieldVal>,
}

/// One struct field
#[derive(Debug, Clone)]
pub struct FieldVal {
    /// Field value
    pub value: Val,
    /// Visibility of the label
    pub kind: LabelKind,
    /// Declared with `?` in every conjunct so far
    pub optional: bool,
    /// Where the field was first declared
    pub position: Option<Position>,
}

impl FieldVal {
    /// Regular, required field without a position
    pub fn regular(value: Val) -> Self {
        Self {
            value,
            kind: LabelKind::Regular,
            optional: false,
            position: None,
        }
    }

    /// Whether the field is part of exported output
    pub fn is_exported(&self) -> bool {
        self.kind == LabelKind::Regular && !self.optional
    }
}

// positions do not take part in value identity
impl PartialEq for FieldVal {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value && self.kind == other.kind && self.optional == other.optional
    }
}

/// One disjunction alternative
#[derive(Debug, Clone, PartialEq)]
pub struct Alternative {
    /// Alternative value
    pub value: Val,
    /// Marked with `*`
    pub default: bool,
}

impl fmt::Display for Val {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Top => write!(f, "_"),
            Self::Kind(kind) => write!(f, "{}", kind.name()),
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Float(n) => write!(f, "{n:?}"),
            Self::String(s) => write!(f, "{s:?}"),
            Self::Struct(_) => write!(f, "{{...}}"),
            Self::List(_) => write!(f, "[...]"),
            Self::Disjunction(alternatives) => {
                for (i, alternative) in alternatives.iter().enumerate() {
                    if i > 0 {
                        write!(f, " | ")?;
                    }
                    if alternative.default {
                        write!(f, "*")?;
                    }
                    write!(f, "{}", alternative.value)?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_meet() {
        assert_eq!(Kind::Int.meet(Kind::Number), Some(Kind::Int));
        assert_eq!(Kind::Number.meet(Kind::Float), Some(Kind::Float));
        assert_eq!(Kind::Int.meet(Kind::Float), None);
        assert_eq!(Kind::String.meet(Kind::Bool), None);
    }

    #[test]
    fn kind_admits() {
        assert!(Kind::Number.admits(&Val::Int(1)));
        assert!(Kind::Number.admits(&Val::Float(1.5)));
        assert!(!Kind::Float.admits(&Val::Int(1)));
        assert!(!Kind::String.admits(&Val::Null));
    }

    #[test]
    fn display_disjunction_marks_defaults() {
        let value = Val::Disjunction(vec![
            Alternative {
                value: Val::String("a".into()),
                default: true,
            },
            Alternative {
                value: Val::Kind(Kind::String),
                default: false,
            },
        ]);
        assert_eq!(value.to_string(), "*\"a\" | string");
        assert_eq!(value.resolved(), Some(&Val::String("a".into())));
    }

    #[test]
    fn field_equality_ignores_position() {
        let a = FieldVal::regular(Val::Int(1));
        let mut b = FieldVal::regular(Val::Int(1));
        b.position = Some(Position::detached(1, 1));
        assert_eq!(a, b);
    }
}
