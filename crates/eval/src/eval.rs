//! Lazy evaluation of fields
//!
//! Field values are computed on first use and memoized per `(node, label)`.
//! A field that is requested while it is being computed is a reference
//! cycle.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use stx_syntax::ast::{BinaryOp, Expr, Ident, UnaryOp};
use stx_syntax::{ParsedFile, Position};

use crate::error::{EvalError, EvalErrorKind, EvalResult};
use crate::scope::{Arena, Conjunct, NodeId, ROOT, join_path};
use crate::unify::{Conflict, disjoin, unify};
use crate::value::{Alternative, FieldVal, Kind, StructVal, Val};

/// Where an expression is evaluated
#[derive(Debug, Clone, Copy)]
struct At<'p> {
    scope: NodeId,
    file: usize,
    /// Path of the field whose value is being computed
    path: &'p str,
}

type FieldKey = (NodeId, String);

/// Maximum nesting of struct bodies, expressions and reference chains
pub(crate) const MAX_EVAL_DEPTH: usize = 256;

/// Evaluator over the files of one instance
pub(crate) struct Evaluator<'a> {
    arena: Arena<'a>,
    cache: HashMap<FieldKey, EvalResult<Val>>,
    in_progress: HashSet<FieldKey>,
    depth: usize,
}

impl<'a> Evaluator<'a> {
    pub fn new(files: Vec<&'a ParsedFile>) -> Self {
        Self {
            arena: Arena::new(files),
            cache: HashMap::new(),
            in_progress: HashSet::new(),
            depth: 0,
        }
    }

    /// Value of the whole package
    pub fn evaluate(&mut self) -> EvalResult<Val> {
        self.eval_node(ROOT)
    }

    fn eval_node(&mut self, id: NodeId) -> EvalResult<Val> {
        if self.depth >= MAX_EVAL_DEPTH {
            return Err(too_deep(&self.arena.node(id).path, None));
        }
        self.depth += 1;
        let result = self.eval_node_inner(id);
        self.depth -= 1;
        result
    }

    fn eval_node_inner(&mut self, id: NodeId) -> EvalResult<Val> {
        let node = self.arena.node(id);
        let path = node.path.clone();
        let labels: Vec<String> = node.fields.keys().cloned().collect();
        let embeds = node.embeds.clone();

        let mut fields = IndexMap::with_capacity(labels.len());
        for label in labels {
            let value = self.eval_field(id, &label)?;
            let entry = &self.arena.node(id).fields[&label];
            let field = FieldVal {
                value,
                kind: entry.kind,
                optional: entry.optional,
                position: Some(entry.position.clone()),
            };
            fields.insert(label, field);
        }

        // a body made only of embeddings takes the embedded value as is
        let mut value = if embeds.is_empty() || !fields.is_empty() {
            Val::Struct(StructVal { fields })
        } else {
            Val::Top
        };
        for embed in embeds {
            let at = At {
                scope: embed.scope,
                file: embed.file,
                path: &path,
            };
            let embedded = self.eval_expr(embed.expr, at)?;
            value = unify(&value, &embedded)
                .map_err(|c| self.conflict_error(c, &path, self.position(embed)))?;
        }
        Ok(value)
    }

    fn eval_field(&mut self, node: NodeId, label: &str) -> EvalResult<Val> {
        let key = (node, label.to_string());
        if let Some(cached) = self.cache.get(&key) {
            return cached.clone();
        }

        if !self.in_progress.insert(key.clone()) {
            let path = join_path(&self.arena.node(node).path, label);
            let position = self.arena.node(node).fields.get(label).map(|e| e.position.clone());
            return Err(EvalError::cycle(format!("{path}: reference cycle"), position));
        }
        let result = self.compute_field(node, label);
        self.in_progress.remove(&key);

        self.cache.insert(key, result.clone());
        result
    }

    fn compute_field(&mut self, node: NodeId, label: &str) -> EvalResult<Val> {
        let path = join_path(&self.arena.node(node).path, label);
        let Some(entry) = self.arena.node(node).fields.get(label) else {
            return Err(EvalError::reference(format!("undefined field: {path}"), None));
        };
        let conjuncts = entry.conjuncts.clone();
        let child = entry.child;
        let position = entry.position.clone();

        let mut value = Val::Top;
        for conjunct in conjuncts {
            let at = At {
                scope: conjunct.scope,
                file: conjunct.file,
                path: &path,
            };
            let next = self.eval_expr(conjunct.expr, at)?;
            value = unify(&value, &next)
                .map_err(|c| self.conflict_error(c, &path, Some(position.clone())))?;
        }
        if let Some(child) = child {
            let body = self.eval_node(child)?;
            value = unify(&value, &body)
                .map_err(|c| self.conflict_error(c, &path, Some(position.clone())))?;
        }
        Ok(value)
    }

    fn eval_expr(&mut self, expr: &'a Expr, at: At<'_>) -> EvalResult<Val> {
        if self.depth >= MAX_EVAL_DEPTH {
            return Err(too_deep(at.path, self.arena.position(at.file, expr.span())));
        }
        self.depth += 1;
        let result = self.eval_expr_inner(expr, at);
        self.depth -= 1;
        result
    }

    fn eval_expr_inner(&mut self, expr: &'a Expr, at: At<'_>) -> EvalResult<Val> {
        match expr {
            Expr::Null(_) => Ok(Val::Null),
            Expr::Bool(b, _) => Ok(Val::Bool(*b)),
            Expr::Int(n, _) => Ok(Val::Int(*n)),
            Expr::Float(n, _) => Ok(Val::Float(*n)),
            Expr::String(s, _) => Ok(Val::String(s.clone())),
            Expr::Paren(inner, _) => self.eval_expr(inner, at),
            Expr::Ident(ident) => self.eval_ident(ident, at),
            Expr::Selector { base, field } => {
                if let Some((node, label)) = self.resolve_field(expr, at) {
                    return self.eval_field(node, &label);
                }
                let base_value = self.eval_expr(base, at)?;
                self.select(&base_value, field, at)
            }
            Expr::Struct(lit) => {
                let id = self.arena.add_struct(lit, at.scope, at.path, at.file);
                self.eval_node(id)
            }
            Expr::List(lit) => lit
                .elems
                .iter()
                .map(|elem| self.eval_expr(elem, at))
                .collect::<EvalResult<Vec<_>>>()
                .map(Val::List),
            Expr::Unary {
                op: UnaryOp::Neg,
                operand,
                span,
            } => {
                let value = self.eval_expr(operand, at)?;
                negate(&value).ok_or_else(|| {
                    EvalError::conflict(
                        format!("{}invalid operand {value} for '-'", prefix(at.path)),
                        self.arena.position(at.file, *span),
                    )
                })
            }
            // the default marker only matters inside a disjunction
            Expr::Unary {
                op: UnaryOp::Default,
                operand,
                ..
            } => self.eval_expr(operand, at),
            Expr::Binary {
                op: BinaryOp::Unify,
                lhs,
                rhs,
            } => {
                let left = self.eval_expr(lhs, at)?;
                let right = self.eval_expr(rhs, at)?;
                unify(&left, &right).map_err(|c| {
                    self.conflict_error(c, at.path, self.arena.position(at.file, expr.span()))
                })
            }
            Expr::Binary {
                op: BinaryOp::Disjoin,
                ..
            } => self.eval_disjunction(expr, at),
        }
    }

    fn eval_disjunction(&mut self, expr: &'a Expr, at: At<'_>) -> EvalResult<Val> {
        let mut operands = Vec::new();
        collect_disjuncts(expr, &mut operands);

        let mut alternatives = Vec::with_capacity(operands.len());
        let mut first_conflict = None;
        for operand in operands {
            let (default, operand) = match operand {
                Expr::Unary {
                    op: UnaryOp::Default,
                    operand,
                    ..
                } => (true, operand.as_ref()),
                other => (false, other),
            };
            match self.eval_expr(operand, at) {
                Ok(value) => alternatives.push(Alternative { value, default }),
                Err(err) if err.kind == EvalErrorKind::Conflict => {
                    first_conflict.get_or_insert(err);
                }
                Err(err) => return Err(err),
            }
        }

        match first_conflict {
            Some(err) if alternatives.is_empty() => Err(err),
            _ => Ok(disjoin(alternatives)),
        }
    }

    fn eval_ident(&mut self, ident: &Ident, at: At<'_>) -> EvalResult<Val> {
        if let Some(node) = self.arena.lookup(at.scope, &ident.name) {
            return self.eval_field(node, &ident.name);
        }
        let position = self.arena.position(at.file, ident.span);
        if let Some(import) = self.arena.import(at.file, &ident.name) {
            return Err(EvalError::unsupported(
                format!("imported package {:?} is not supported", import.path),
                position,
            ));
        }
        if ident.name == "_" {
            return Ok(Val::Top);
        }
        if let Some(kind) = Kind::from_ident(&ident.name) {
            return Ok(Val::Kind(kind));
        }
        Err(EvalError::reference(
            format!("{}reference {:?} not found", prefix(at.path), ident.name),
            position,
        ))
    }

    /// Field a reference denotes when it can be found without evaluating
    /// the enclosing value.
    ///
    /// Selectors only follow declared struct bodies; a label that also has
    /// other conjuncts or embeddings must be evaluated as a whole.
    fn resolve_field(&self, expr: &Expr, at: At<'_>) -> Option<(NodeId, String)> {
        match expr {
            Expr::Ident(ident) => self
                .arena
                .lookup(at.scope, &ident.name)
                .map(|node| (node, ident.name.clone())),
            Expr::Paren(inner, _) => self.resolve_field(inner, at),
            Expr::Selector { base, field } => {
                let (node, label) = self.resolve_field(base, at)?;
                let entry = self.arena.node(node).fields.get(&label)?;
                if !entry.conjuncts.is_empty() {
                    return None;
                }
                let child = self.arena.node(entry.child?);
                if !child.embeds.is_empty() || !child.fields.contains_key(&field.name) {
                    return None;
                }
                Some((entry.child?, field.name.clone()))
            }
            _ => None,
        }
    }

    fn select(&self, base: &Val, field: &Ident, at: At<'_>) -> EvalResult<Val> {
        let position = self.arena.position(at.file, field.span);
        match base {
            Val::Struct(s) => s
                .fields
                .get(&field.name)
                .map(|f| f.value.clone())
                .ok_or_else(|| {
                    EvalError::reference(
                        format!("{}undefined field: {}", prefix(at.path), field.name),
                        position,
                    )
                }),
            Val::Disjunction(_) => match base.resolved() {
                Some(value) => self.select(value, field, at),
                None => Err(EvalError::incomplete(
                    format!(
                        "{}unresolved disjunction {base} (selecting {})",
                        prefix(at.path),
                        field.name
                    ),
                    position,
                )),
            },
            Val::Top | Val::Kind(_) => Err(EvalError::incomplete(
                format!(
                    "{}incomplete value {base} (selecting {})",
                    prefix(at.path),
                    field.name
                ),
                position,
            )),
            other => Err(EvalError::reference(
                format!(
                    "{}invalid selector {}: {other} is not a struct",
                    prefix(at.path),
                    field.name
                ),
                position,
            )),
        }
    }

    fn position(&self, conjunct: Conjunct<'_>) -> Option<Position> {
        self.arena.position(conjunct.file, conjunct.expr.span())
    }

    fn conflict_error(
        &self,
        conflict: Conflict,
        path: &str,
        fallback: Option<Position>,
    ) -> EvalError {
        let full = conflict
            .labels()
            .fold(path.to_string(), |acc, label| join_path(&acc, label));
        let position = conflict.position.clone().or(fallback);
        EvalError::conflict(format!("{}{}", prefix(&full), conflict.message), position)
    }
}

fn collect_disjuncts<'e>(expr: &'e Expr, out: &mut Vec<&'e Expr>) {
    match expr {
        Expr::Binary {
            op: BinaryOp::Disjoin,
            lhs,
            rhs,
        } => {
            collect_disjuncts(lhs, out);
            collect_disjuncts(rhs, out);
        }
        other => out.push(other),
    }
}

fn negate(value: &Val) -> Option<Val> {
    match value {
        Val::Int(n) => n.checked_neg().map(Val::Int),
        Val::Float(n) => Some(Val::Float(-n)),
        Val::Kind(kind @ (Kind::Int | Kind::Float | Kind::Number)) => Some(Val::Kind(*kind)),
        _ => None,
    }
}

fn too_deep(path: &str, position: Option<Position>) -> EvalError {
    EvalError::too_deep(
        format!("{}nesting too deep (more than {MAX_EVAL_DEPTH} levels)", prefix(path)),
        position,
    )
}

/// `"path: "` or nothing at the root
fn prefix(path: &str) -> String {
    if path.is_empty() {
        String::new()
    } else {
        format!("{path}: ")
    }
}
