//! Unification of values
//!
//! `unify` is commutative and idempotent on concrete values. Disjunctions
//! distribute over unification; alternatives that fail are dropped and an
//! empty result is a conflict.

use stx_syntax::Position;

use crate::value::{Alternative, StructVal, Val};

/// A failed unification, located by the labels leading to it.
#[derive(Debug, Clone, PartialEq)]
pub struct Conflict {
    /// Labels from the innermost failure outward
    pub path: Vec<String>,
    /// What did not unify
    pub message: String,
    /// Position of the innermost field involved, if known
    pub position: Option<Position>,
}

impl Conflict {
    fn new(message: impl Into<String>) -> Self {
        Self {
            path: Vec::new(),
            message: message.into(),
            position: None,
        }
    }

    fn within(mut self, label: &str, position: Option<&Position>) -> Self {
        self.path.push(label.to_string());
        if self.position.is_none() {
            self.position = position.cloned();
        }
        self
    }

    /// Labels from the outermost inward
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.path.iter().rev().map(String::as_str)
    }
}

/// Unify two values
pub fn unify(a: &Val, b: &Val) -> Result<Val, Conflict> {
    match (a, b) {
        (Val::Top, other) | (other, Val::Top) => Ok(other.clone()),
        (Val::Disjunction(_), _) | (_, Val::Disjunction(_)) => unify_disjunctions(a, b),
        (Val::Kind(x), Val::Kind(y)) => x.meet(*y).map(Val::Kind).ok_or_else(|| mismatch(a, b)),
        (Val::Kind(kind), value) | (value, Val::Kind(kind)) => {
            if kind.admits(value) {
                Ok(value.clone())
            } else {
                Err(mismatch(a, b))
            }
        }
        (Val::Struct(x), Val::Struct(y)) => unify_structs(x, y).map(Val::Struct),
        (Val::List(x), Val::List(y)) => unify_lists(x, y).map(Val::List),
        _ if a == b => Ok(a.clone()),
        _ => Err(mismatch(a, b)),
    }
}

/// Build a disjunction from alternatives.
///
/// Nested disjunctions are flattened, duplicates merged, and a single
/// remaining alternative collapses to its value. An alternative marked as
/// default that is itself a disjunction keeps its own defaults, or marks all
/// of its alternatives when it has none.
pub fn disjoin(alternatives: Vec<Alternative>) -> Val {
    let mut flat = Vec::with_capacity(alternatives.len());
    for alternative in alternatives {
        match alternative.value {
            Val::Disjunction(inner) => {
                let inner_has_default = inner.iter().any(|a| a.default);
                flat.extend(inner.into_iter().map(|a| Alternative {
                    default: a.default || (alternative.default && !inner_has_default),
                    value: a.value,
                }));
            }
            value => flat.push(Alternative {
                value,
                default: alternative.default,
            }),
        }
    }
    normalize(flat)
}

fn normalize(alternatives: Vec<Alternative>) -> Val {
    let mut unique: Vec<Alternative> = Vec::with_capacity(alternatives.len());
    for alternative in alternatives {
        match unique.iter_mut().find(|u| u.value == alternative.value) {
            Some(existing) => existing.default |= alternative.default,
            None => unique.push(alternative),
        }
    }

    if unique.len() == 1 {
        return unique.remove(0).value;
    }
    // every alternative marked is the same as none marked
    if unique.iter().all(|a| a.default) {
        for alternative in &mut unique {
            alternative.default = false;
        }
    }
    Val::Disjunction(unique)
}

fn alternatives_of(value: &Val) -> (Vec<Alternative>, bool) {
    match value {
        Val::Disjunction(alternatives) => {
            let has_default = alternatives.iter().any(|a| a.default);
            (alternatives.clone(), has_default)
        }
        other => (
            vec![Alternative {
                value: other.clone(),
                default: false,
            }],
            false,
        ),
    }
}

fn unify_disjunctions(a: &Val, b: &Val) -> Result<Val, Conflict> {
    let (xs, x_has_default) = alternatives_of(a);
    let (ys, y_has_default) = alternatives_of(b);

    let mut results = Vec::new();
    let mut first_conflict = None;
    for x in &xs {
        for y in &ys {
            match unify(&x.value, &y.value) {
                Ok(value) => results.push(Alternative {
                    value,
                    default: (x.default || !x_has_default) && (y.default || !y_has_default),
                }),
                Err(conflict) => {
                    first_conflict.get_or_insert(conflict);
                }
            }
        }
    }

    if results.is_empty() {
        let conflict = first_conflict.unwrap_or_else(|| Conflict::new("empty disjunction"));
        if xs.len() * ys.len() > 1 {
            return Err(Conflict {
                message: format!("empty disjunction: {}", conflict.message),
                ..conflict
            });
        }
        return Err(conflict);
    }
    Ok(disjoin(results))
}

fn unify_structs(a: &StructVal, b: &StructVal) -> Result<StructVal, Conflict> {
    let mut fields = a.fields.clone();
    for (label, field) in &b.fields {
        match fields.get_mut(label) {
            Some(existing) => {
                let value = unify(&existing.value, &field.value).map_err(|conflict| {
                    conflict.within(label, existing.position.as_ref().or(field.position.as_ref()))
                })?;
                existing.value = value;
                existing.optional &= field.optional;
                if existing.position.is_none() {
                    existing.position.clone_from(&field.position);
                }
            }
            None => {
                fields.insert(label.clone(), field.clone());
            }
        }
    }
    Ok(StructVal { fields })
}

fn unify_lists(a: &[Val], b: &[Val]) -> Result<Vec<Val>, Conflict> {
    if a.len() != b.len() {
        return Err(Conflict::new(format!(
            "incompatible list lengths ({} and {})",
            a.len(),
            b.len()
        )));
    }
    a.iter()
        .zip(b)
        .enumerate()
        .map(|(i, (x, y))| unify(x, y).map_err(|c| c.within(&i.to_string(), None)))
        .collect()
}

fn mismatch(a: &Val, b: &Val) -> Conflict {
    let (ta, tb) = (a.type_name(), b.type_name());
    if ta == tb {
        Conflict::new(format!("conflicting values {a} and {b}"))
    } else {
        Conflict::new(format!(
            "conflicting values {a} and {b} (mismatched types {ta} and {tb})"
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{FieldVal, Kind};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn alt(value: Val, default: bool) -> Alternative {
        Alternative { value, default }
    }

    fn record(fields: &[(&str, Val)]) -> Val {
        Val::Struct(StructVal {
            fields: fields
                .iter()
                .map(|(k, v)| ((*k).to_string(), FieldVal::regular(v.clone())))
                .collect(),
        })
    }

    #[rstest]
    #[case::top(Val::Top, Val::Int(1), Val::Int(1))]
    #[case::kind_admits(Val::Kind(Kind::String), Val::String("a".into()), Val::String("a".into()))]
    #[case::kind_meet(Val::Kind(Kind::Number), Val::Kind(Kind::Int), Val::Kind(Kind::Int))]
    #[case::equal(Val::Bool(true), Val::Bool(true), Val::Bool(true))]
    #[case::null(Val::Null, Val::Null, Val::Null)]
    fn unify_succeeds(#[case] a: Val, #[case] b: Val, #[case] expected: Val) {
        assert_eq!(unify(&a, &b).as_ref(), Ok(&expected));
        assert_eq!(unify(&b, &a).as_ref(), Ok(&expected));
    }

    #[rstest]
    #[case::values(Val::Int(1), Val::Int(2), "conflicting values 1 and 2")]
    #[case::int_float(
        Val::Int(1),
        Val::Float(1.0),
        "conflicting values 1 and 1.0 (mismatched types int and float)"
    )]
    #[case::kind(
        Val::Kind(Kind::Int),
        Val::String("x".into()),
        "conflicting values int and \"x\" (mismatched types int and string)"
    )]
    #[case::lists(
        Val::List(vec![Val::Int(1)]),
        Val::List(vec![]),
        "incompatible list lengths (1 and 0)"
    )]
    fn unify_conflicts(#[case] a: Val, #[case] b: Val, #[case] message: &str) {
        let conflict = unify(&a, &b).expect_err("should conflict");
        assert_eq!(conflict.message, message);
    }

    #[test]
    fn structs_merge_recursively() {
        let a = record(&[("a", Val::Int(1)), ("n", record(&[("x", Val::Kind(Kind::Int))]))]);
        let b = record(&[("n", record(&[("x", Val::Int(3)), ("y", Val::Null)])), ("b", Val::Bool(false))]);
        let merged = unify(&a, &b).expect("should unify");
        assert_eq!(
            merged,
            record(&[
                ("a", Val::Int(1)),
                ("n", record(&[("x", Val::Int(3)), ("y", Val::Null)])),
                ("b", Val::Bool(false)),
            ])
        );
    }

    #[test]
    fn struct_conflict_reports_path() {
        let a = record(&[("n", record(&[("x", Val::Int(1))]))]);
        let b = record(&[("n", record(&[("x", Val::Int(2))]))]);
        let conflict = unify(&a, &b).expect_err("should conflict");
        assert_eq!(conflict.labels().collect::<Vec<_>>(), vec!["n", "x"]);
    }

    #[test]
    fn disjunction_drops_failing_alternatives() {
        let d = disjoin(vec![alt(Val::Int(1), false), alt(Val::String("a".into()), false)]);
        assert_eq!(unify(&d, &Val::Kind(Kind::String)), Ok(Val::String("a".into())));
    }

    #[test]
    fn disjunction_keeps_default() {
        let d = disjoin(vec![
            alt(Val::String("us-east-1".into()), true),
            alt(Val::Kind(Kind::String), false),
        ]);
        let unified = unify(&d, &Val::Kind(Kind::String)).expect("should unify");
        assert_eq!(unified.resolved(), Some(&Val::String("us-east-1".into())));

        let overridden = unify(&d, &Val::String("eu-west-1".into())).expect("should unify");
        assert_eq!(overridden, Val::String("eu-west-1".into()));
    }

    #[test]
    fn empty_disjunction_is_conflict() {
        let d = disjoin(vec![alt(Val::Int(1), false), alt(Val::Int(2), false)]);
        let conflict = unify(&d, &Val::Int(3)).expect_err("should conflict");
        assert!(conflict.message.starts_with("empty disjunction"));
    }

    #[test]
    fn disjoin_dedupes_and_flattens() {
        let inner = disjoin(vec![alt(Val::Int(1), true), alt(Val::Int(2), false)]);
        let outer = disjoin(vec![alt(inner, false), alt(Val::Int(1), false)]);
        assert_eq!(
            outer,
            Val::Disjunction(vec![alt(Val::Int(1), true), alt(Val::Int(2), false)])
        );
        assert_eq!(disjoin(vec![alt(Val::Null, true), alt(Val::Null, false)]), Val::Null);
    }
}
