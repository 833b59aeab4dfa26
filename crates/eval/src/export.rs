//! Conversion of evaluated values to JSON

use serde_json::{Map, Number, Value};
use stx_syntax::Position;

use crate::error::{EvalError, EvalResult};
use crate::eval::MAX_EVAL_DEPTH;
use crate::scope::join_path;
use crate::value::Val;

/// Export a value, dropping definitions, hidden and optional fields.
///
/// Fails on the first value that is not concrete.
pub fn export(value: &Val) -> EvalResult<Value> {
    export_at(value, "", None, 0)
}

fn export_at(
    value: &Val,
    path: &str,
    position: Option<&Position>,
    depth: usize,
) -> EvalResult<Value> {
    if depth > MAX_EVAL_DEPTH {
        let message = format!("{path}: value nested too deep (more than {MAX_EVAL_DEPTH} levels)");
        return Err(EvalError::too_deep(message, position.cloned()));
    }
    match value {
        Val::Null => Ok(Value::Null),
        Val::Bool(b) => Ok(Value::Bool(*b)),
        Val::Int(n) => Ok(Value::Number((*n).into())),
        Val::Float(n) => Number::from_f64(*n)
            .map(Value::Number)
            .ok_or_else(|| incomplete(value, path, position)),
        Val::String(s) => Ok(Value::String(s.clone())),
        Val::List(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                export_at(item, &join_path(path, &i.to_string()), position, depth + 1)
            })
            .collect::<EvalResult<Vec<_>>>()
            .map(Value::Array),
        Val::Struct(s) => {
            let mut map = Map::with_capacity(s.fields.len());
            for (label, field) in &s.fields {
                if !field.is_exported() {
                    continue;
                }
                let value = export_at(
                    &field.value,
                    &join_path(path, label),
                    field.position.as_ref().or(position),
                    depth + 1,
                )?;
                map.insert(label.clone(), value);
            }
            Ok(Value::Object(map))
        }
        Val::Disjunction(_) => match value.resolved() {
            Some(resolved) => export_at(resolved, path, position, depth + 1),
            None => Err(incomplete(value, path, position)),
        },
        Val::Top | Val::Kind(_) => Err(incomplete(value, path, position)),
    }
}

fn incomplete(value: &Val, path: &str, position: Option<&Position>) -> EvalError {
    let message = if path.is_empty() {
        format!("incomplete value {value}")
    } else {
        format!("{path}: incomplete value {value}")
    };
    EvalError::incomplete(message, position.cloned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EvalErrorKind;
    use crate::value::{Alternative, FieldVal, Kind, StructVal};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use stx_syntax::ast::LabelKind;

    fn field(value: Val, kind: LabelKind, optional: bool) -> FieldVal {
        FieldVal {
            value,
            kind,
            optional,
            position: Some(Position::new("a.cue", 1, 1)),
        }
    }

    #[test]
    fn hidden_definition_and_optional_fields_are_dropped() {
        let value = Val::Struct(StructVal {
            fields: [
                ("a", field(Val::Int(1), LabelKind::Regular, false)),
                ("#D", field(Val::Kind(Kind::Int), LabelKind::Definition, false)),
                ("_h", field(Val::Top, LabelKind::Hidden, false)),
                ("o", field(Val::Kind(Kind::String), LabelKind::Regular, true)),
                ("l", field(Val::List(vec![Val::Null, Val::Float(0.5)]), LabelKind::Regular, false)),
            ]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect(),
        });
        assert_eq!(export(&value), Ok(json!({"a": 1, "l": [null, 0.5]})));
    }

    #[test]
    fn incomplete_value_reports_path_and_position() {
        let inner = Val::Struct(StructVal {
            fields: [("region".to_string(), field(Val::Kind(Kind::String), LabelKind::Regular, false))]
                .into_iter()
                .collect(),
        });
        let value = Val::Struct(StructVal {
            fields: [("web".to_string(), FieldVal::regular(inner))].into_iter().collect(),
        });
        let err = export(&value).expect_err("string is not concrete");
        assert_eq!(err.kind, EvalErrorKind::Incomplete);
        assert_eq!(err.message, "web.region: incomplete value string");
        assert_eq!(err.position, Some(Position::new("a.cue", 1, 1)));
    }

    #[test]
    fn overly_nested_value_is_an_error() {
        let mut value = Val::Int(1);
        for _ in 0..=MAX_EVAL_DEPTH {
            value = Val::List(vec![value]);
        }
        let err = export(&value).expect_err("too deep");
        assert_eq!(err.kind, EvalErrorKind::TooDeep);

        let Val::List(mut items) = value else {
            unreachable!()
        };
        assert!(export(&items.remove(0)).is_ok());
    }

    #[test]
    fn disjunction_exports_its_default() {
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
        assert_eq!(export(&value), Ok(json!("a")));

        let ambiguous = Val::Disjunction(vec![
            Alternative {
                value: Val::Int(1),
                default: false,
            },
            Alternative {
                value: Val::Int(2),
                default: false,
            },
        ]);
        let err = export(&ambiguous).expect_err("no default");
        assert_eq!(err.message, "incomplete value 1 | 2");
    }
}
