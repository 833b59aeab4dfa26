//! Struct scopes built from the syntax tree
//!
//! Every struct body becomes a [`Node`]. Declarations of the same label are
//! collected into one [`FieldEntry`]: struct literals are merged into a single
//! child node so that their fields share one scope, everything else is kept
//! as a conjunct to be evaluated lazily. The files of an instance all
//! contribute to the root node.

use indexmap::IndexMap;
use stx_syntax::ast::{BinaryOp, Decl, Expr, Field, Import, LabelKind, StructLit};
use stx_syntax::{ParsedFile, Position, Span};

pub(crate) type NodeId = usize;

/// The package-level node
pub(crate) const ROOT: NodeId = 0;

/// An expression together with the scope it is evaluated in
#[derive(Debug, Clone, Copy)]
pub(crate) struct Conjunct<'a> {
    pub expr: &'a Expr,
    pub scope: NodeId,
    pub file: usize,
}

#[derive(Debug)]
pub(crate) struct FieldEntry<'a> {
    pub kind: LabelKind,
    pub optional: bool,
    pub conjuncts: Vec<Conjunct<'a>>,
    pub child: Option<NodeId>,
    pub position: Position,
}

#[derive(Debug)]
pub(crate) struct Node<'a> {
    pub parent: Option<NodeId>,
    /// Dotted label path, empty for the root
    pub path: String,
    pub fields: IndexMap<String, FieldEntry<'a>>,
    pub embeds: Vec<Conjunct<'a>>,
}

impl Node<'_> {
    fn new(parent: Option<NodeId>, path: String) -> Self {
        Self {
            parent,
            path,
            fields: IndexMap::new(),
            embeds: Vec::new(),
        }
    }
}

/// All scopes of one instance
#[derive(Debug)]
pub(crate) struct Arena<'a> {
    nodes: Vec<Node<'a>>,
    files: Vec<&'a ParsedFile>,
}

impl<'a> Arena<'a> {
    pub fn new(files: Vec<&'a ParsedFile>) -> Self {
        let mut arena = Self {
            nodes: vec![Node::new(None, String::new())],
            files,
        };
        for index in 0..arena.files.len() {
            let file = arena.files[index];
            arena.add_decls(ROOT, &file.ast.decls, index);
        }
        arena
    }

    pub fn node(&self, id: NodeId) -> &Node<'a> {
        &self.nodes[id]
    }

    /// Build a node for a struct literal met during evaluation
    pub fn add_struct(
        &mut self,
        lit: &'a StructLit,
        parent: NodeId,
        path: &str,
        file: usize,
    ) -> NodeId {
        let id = self.push_node(parent, path.to_string());
        self.add_decls(id, &lit.decls, file);
        id
    }

    /// Innermost node, starting at `scope`, that declares `label`
    pub fn lookup(&self, scope: NodeId, label: &str) -> Option<NodeId> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let node = &self.nodes[id];
            if node.fields.contains_key(label) {
                return Some(id);
            }
            current = node.parent;
        }
        None
    }

    /// Import of `file` referenced as `name`
    pub fn import(&self, file: usize, name: &str) -> Option<&'a Import> {
        self.files
            .get(file)?
            .ast
            .imports
            .iter()
            .find(|import| import.local_name() == name)
    }

    pub fn position(&self, file: usize, span: Span) -> Option<Position> {
        self.files.get(file).map(|f| f.source.position(span))
    }

    fn push_node(&mut self, parent: NodeId, path: String) -> NodeId {
        self.nodes.push(Node::new(Some(parent), path));
        self.nodes.len() - 1
    }

    fn add_decls(&mut self, node: NodeId, decls: &'a [Decl], file: usize) {
        for decl in decls {
            match decl {
                Decl::Field(field) => self.add_field(node, field, file),
                Decl::Embed(expr) => self.add_embed(node, expr, file),
            }
        }
    }

    fn add_field(&mut self, node: NodeId, field: &'a Field, file: usize) {
        let label = field.label.name.as_str();
        let position = self.files[file].source.position(field.label.span);
        let entry = self.nodes[node]
            .fields
            .entry(label.to_string())
            .or_insert_with(|| FieldEntry {
                kind: field.label.kind,
                optional: field.optional,
                conjuncts: Vec::new(),
                child: None,
                position,
            });
        entry.optional &= field.optional;
        self.add_value(node, label, &field.value, file);
    }

    /// Split `a & b & {...}` into conjuncts of `label`
    fn add_value(&mut self, node: NodeId, label: &str, expr: &'a Expr, file: usize) {
        match expr {
            Expr::Binary {
                op: BinaryOp::Unify,
                lhs,
                rhs,
            } => {
                self.add_value(node, label, lhs, file);
                self.add_value(node, label, rhs, file);
            }
            Expr::Paren(inner, _) => self.add_value(node, label, inner, file),
            Expr::Struct(lit) => {
                let child = self.child_of(node, label);
                self.add_decls(child, &lit.decls, file);
            }
            _ => {
                if let Some(entry) = self.nodes[node].fields.get_mut(label) {
                    entry.conjuncts.push(Conjunct {
                        expr,
                        scope: node,
                        file,
                    });
                }
            }
        }
    }

    fn add_embed(&mut self, node: NodeId, expr: &'a Expr, file: usize) {
        match expr {
            Expr::Binary {
                op: BinaryOp::Unify,
                lhs,
                rhs,
            } => {
                self.add_embed(node, lhs, file);
                self.add_embed(node, rhs, file);
            }
            Expr::Paren(inner, _) => self.add_embed(node, inner, file),
            Expr::Struct(lit) => self.add_decls(node, &lit.decls, file),
            _ => self.nodes[node].embeds.push(Conjunct {
                expr,
                scope: node,
                file,
            }),
        }
    }

    fn child_of(&mut self, node: NodeId, label: &str) -> NodeId {
        if let Some(child) = self.nodes[node].fields.get(label).and_then(|e| e.child) {
            return child;
        }
        let path = join_path(&self.nodes[node].path, label);
        let child = self.push_node(node, path);
        if let Some(entry) = self.nodes[node].fields.get_mut(label) {
            entry.child = Some(child);
        }
        child
    }
}

/// Append `label` to a dotted path, quoting labels that are not identifiers.
/// List indices stay bare.
pub(crate) fn join_path(path: &str, label: &str) -> String {
    let is_index = label.chars().all(|c| c.is_ascii_digit());
    let is_ident = label
        .chars()
        .enumerate()
        .all(|(i, c)| c.is_alphanumeric() || c == '_' || c == '$' || (i == 0 && c == '#'))
        && !label.starts_with(|c: char| c.is_ascii_digit());
    let label = if (is_ident || is_index) && !label.is_empty() {
        label.to_string()
    } else {
        format!("{label:?}")
    };
    if path.is_empty() {
        label
    } else {
        format!("{path}.{label}")
    }
}
