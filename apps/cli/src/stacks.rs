//! Stacks of an evaluated instance

use serde_json::Value;
use serde_json::map::Iter;

/// Top-level field holding the stacks
pub const STACKS_FIELD: &str = "Stacks";

/// One named entry under `Stacks`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stack<'a> {
    pub name: &'a str,
    pub value: &'a Value,
}

impl<'a> Stack<'a> {
    /// Follow a dot-separated path; list elements are addressed by index.
    pub fn lookup(&self, path: &str) -> Option<&'a Value> {
        path.split('.')
            .filter(|segment| !segment.is_empty())
            .try_fold(self.value, |value, segment| match value {
                Value::Object(map) => map.get(segment),
                Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
                _ => None,
            })
    }
}

/// Lazy iterator over the stacks of one value, in declaration order.
///
/// Yields nothing when the value has no `Stacks` struct.
#[derive(Debug)]
pub struct StacksIter<'a> {
    inner: Option<Iter<'a>>,
}

impl<'a> StacksIter<'a> {
    pub fn new(root: &'a Value) -> Self {
        Self {
            inner: root
                .get(STACKS_FIELD)
                .and_then(Value::as_object)
                .map(|stacks| stacks.iter()),
        }
    }
}

impl<'a> Iterator for StacksIter<'a> {
    type Item = Stack<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let (name, value) = self.inner.as_mut()?.next()?;
        Some(Stack { name, value })
    }
}
