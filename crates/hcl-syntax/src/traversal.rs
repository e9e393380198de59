//! Variable references: a root name followed by attribute, index and splat steps.

use hcl_tokenizer::Range;

use crate::suggest::name_suggestion;
use crate::{Diagnostic, Diagnostics, EvalContext, Value};

/// One step of a [`Traversal`].
#[derive(Debug, Clone, PartialEq)]
pub enum Traverser {
    /// The variable a traversal starts from.
    Root { name: String, range: Range },
    /// `.name`
    Attr { name: String, range: Range },
    /// `[key]` with a constant key, or the legacy `.0` form.
    Index { key: Value, range: Range },
    /// `[*]` applied as a traversal step.
    Splat { range: Range },
}

impl Traverser {
    /// The source range of this step.
    pub fn range(&self) -> &Range {
        match self {
            Traverser::Root { range, .. }
            | Traverser::Attr { range, .. }
            | Traverser::Index { range, .. }
            | Traverser::Splat { range } => range,
        }
    }
}

/// A sequence of steps. Absolute traversals begin with a [`Traverser::Root`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Traversal(pub Vec<Traverser>);

impl Traversal {
    /// Whether this traversal has no root, and so must be applied to a value.
    pub fn is_relative(&self) -> bool {
        !matches!(self.0.first(), Some(Traverser::Root { .. }))
    }

    /// The name of the root variable, if this traversal is absolute.
    pub fn root_name(&self) -> Option<&str> {
        match self.0.first() {
            Some(Traverser::Root { name, .. }) => Some(name),
            _ => None,
        }
    }

    /// The steps in order.
    pub fn steps(&self) -> &[Traverser] {
        &self.0
    }

    /// The range from the first step to the last.
    pub fn range(&self) -> Option<Range> {
        let first = self.0.first()?;
        let last = self.0.last()?;
        Some(Range::between(first.range(), last.range()))
    }

    /// Split an absolute traversal into its root step and the relative remainder.
    ///
    /// Returns `None` for a relative traversal.
    pub fn simple_split(&self) -> Option<(Traversal, Traversal)> {
        if self.is_relative() {
            return None;
        }
        let (root, rest) = self.0.split_first()?;
        Some((Traversal(vec![root.clone()]), Traversal(rest.to_vec())))
    }

    /// Resolve an absolute traversal against the variables of `ctx`.
    ///
    /// # Panics
    ///
    /// Panics if the traversal is relative.
    pub fn traverse_abs(&self, ctx: Option<&EvalContext<'_>>) -> (Value, Diagnostics) {
        let Some((Traverser::Root { name, range }, rest)) = self.0.split_first() else {
            panic!("traverse_abs called on a relative traversal");
        };
        let rel = Traversal(rest.to_vec());

        let Some(ctx) = ctx else {
            return (
                Value::Unknown,
                Diagnostic::error("Variables not allowed", "Variables may not be used here.")
                    .with_subject(range.clone())
                    .into(),
            );
        };

        if let Some(value) = ctx.variable(name) {
            return rel.traverse_rel(value);
        }

        let names = ctx.variable_names();
        let suggestion = match name_suggestion(name, names.iter().map(String::as_str)) {
            Some(s) => format!(" Did you mean {:?}?", s),
            None => String::new(),
        };
        (
            Value::Unknown,
            Diagnostic::error(
                "Unknown variable",
                format!("There is no variable named {:?}.{}", name, suggestion),
            )
            .with_subject(range.clone())
            .into(),
        )
    }

    /// Apply a relative traversal to a value.
    ///
    /// # Panics
    ///
    /// Panics if the traversal is absolute.
    pub fn traverse_rel(&self, value: &Value) -> (Value, Diagnostics) {
        assert!(self.is_relative(), "traverse_rel called on an absolute traversal");

        let mut current = value.clone();
        for step in &self.0 {
            let (next, diags) = match step {
                Traverser::Attr { name, range } => get_attr(&current, name, range),
                Traverser::Index { key, range } => index(&current, key, range),
                Traverser::Splat { range } => (
                    Value::Unknown,
                    Diagnostic::error(
                        "Unsupported traversal",
                        "Splat steps are not supported in a traversal. Use a splat expression instead.",
                    )
                    .with_subject(range.clone())
                    .into(),
                ),
                Traverser::Root { .. } => unreachable!("relative traversals have no root"),
            };
            if diags.has_errors() {
                return (Value::Unknown, diags);
            }
            current = next;
        }
        (current, Diagnostics::new())
    }
}

/// Look up attribute `name` of `value`.
pub(crate) fn get_attr(value: &Value, name: &str, range: &Range) -> (Value, Diagnostics) {
    let error = |summary: &str, detail: String| {
        (
            Value::Unknown,
            Diagnostics::from(Diagnostic::error(summary, detail).with_subject(range.clone())),
        )
    };

    match value {
        Value::Unknown => (Value::Unknown, Diagnostics::new()),
        Value::Null => error(
            "Attempt to get attribute from null value",
            "This value is null, so it does not have any attributes.".to_string(),
        ),
        Value::Object(attrs) => match attrs.get(name) {
            Some(v) => (v.clone(), Diagnostics::new()),
            None => error(
                "Unsupported attribute",
                format!("This object does not have an attribute named {:?}.", name),
            ),
        },
        Value::Tuple(_) => error(
            "Unsupported attribute",
            "This value does not have any attributes.".to_string(),
        ),
        other => error(
            "Unsupported attribute",
            format!(
                "Can't access attributes on a primitive-typed value ({}).",
                other.type_name()
            ),
        ),
    }
}

/// Look up element `key` of `collection`.
pub(crate) fn index(collection: &Value, key: &Value, range: &Range) -> (Value, Diagnostics) {
    let error = |summary: &str, detail: &str| {
        (
            Value::Unknown,
            Diagnostics::from(Diagnostic::error(summary, detail).with_subject(range.clone())),
        )
    };

    if !collection.is_known() || !key.is_known() {
        return (Value::Unknown, Diagnostics::new());
    }
    if collection.is_null() {
        return error(
            "Attempt to index null value",
            "This value is null, so it does not have any indices.",
        );
    }
    if key.is_null() {
        return error("Invalid index", "Can't use a null value as an indexing key.");
    }

    match collection {
        Value::Tuple(items) => {
            let idx = match key {
                Value::Number(n) => Some(*n),
                Value::String(s) => s.trim().parse::<f64>().ok(),
                _ => None,
            };
            let Some(idx) = idx else {
                return error(
                    "Invalid index",
                    "The given key does not identify an element in this collection value: a number is required.",
                );
            };
            if idx.fract() != 0.0 || idx < 0.0 || idx as usize >= items.len() {
                return error(
                    "Invalid index",
                    "The given key does not identify an element in this collection value.",
                );
            }
            (items[idx as usize].clone(), Diagnostics::new())
        }
        Value::Object(attrs) => {
            let Some(name) = key.to_template_string() else {
                return error(
                    "Invalid index",
                    "The given key does not identify an element in this collection value: a string is required.",
                );
            };
            match attrs.get(&name) {
                Some(v) => (v.clone(), Diagnostics::new()),
                None => error(
                    "Invalid index",
                    "The given key does not identify an element in this collection value.",
                ),
            }
        }
        _ => error("Invalid index", "This value does not have any indices."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hcl_tokenizer::Pos;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn r(start: usize, end: usize) -> Range {
        Range::new(
            Arc::from("t.hcl"),
            Pos::new(start, 1, start + 1),
            Pos::new(end, 1, end + 1),
        )
    }

    fn var_dot_attr() -> Traversal {
        Traversal(vec![
            Traverser::Root {
                name: "var".into(),
                range: r(0, 3),
            },
            Traverser::Attr {
                name: "region".into(),
                range: r(3, 10),
            },
        ])
    }

    #[test]
    fn test_split_and_root() {
        let t = var_dot_attr();
        assert!(!t.is_relative());
        assert_eq!(t.root_name(), Some("var"));
        let (abs, rel) = t.simple_split().unwrap();
        assert_eq!(abs.0.len(), 1);
        assert!(rel.is_relative());
        assert_eq!(t.range(), Some(r(0, 10)));
    }

    #[test]
    fn test_traverse_abs_resolves() {
        let mut attrs = BTreeMap::new();
        attrs.insert("region".to_string(), Value::from("eu"));
        let ctx = EvalContext::new().with_variable("var", Value::Object(attrs));
        let (v, diags) = var_dot_attr().traverse_abs(Some(&ctx));
        assert!(diags.is_empty());
        assert_eq!(v, Value::from("eu"));
    }

    #[test]
    fn test_traverse_abs_without_context() {
        let (v, diags) = var_dot_attr().traverse_abs(None);
        assert_eq!(v, Value::Unknown);
        assert_eq!(diags[0].summary, "Variables not allowed");
    }

    #[test]
    fn test_unknown_variable_suggests() {
        let ctx = EvalContext::new().with_variable("vars", Value::Null);
        let (_, diags) = var_dot_attr().traverse_abs(Some(&ctx));
        assert_eq!(diags[0].summary, "Unknown variable");
        assert_eq!(
            diags[0].detail,
            "There is no variable named \"var\". Did you mean \"vars\"?"
        );
    }

    #[test]
    fn test_parent_context_lookup() {
        let parent = EvalContext::new().with_variable("var", Value::Object(BTreeMap::new()));
        let child = parent.new_child();
        let (_, diags) = var_dot_attr().traverse_abs(Some(&child));
        assert_eq!(diags[0].summary, "Unsupported attribute");
    }

    #[test]
    fn test_index_tuple() {
        let tuple = Value::Tuple(vec![Value::from("a"), Value::from("b")]);
        assert_eq!(index(&tuple, &Value::from(1i64), &r(0, 1)).0, Value::from("b"));
        let (_, diags) = index(&tuple, &Value::from(2i64), &r(0, 1));
        assert_eq!(diags[0].summary, "Invalid index");
    }

    #[test]
    fn test_splat_step_is_reported() {
        let t = Traversal(vec![Traverser::Splat { range: r(0, 3) }]);
        let (_, diags) = t.traverse_rel(&Value::Tuple(vec![]));
        assert_eq!(diags[0].summary, "Unsupported traversal");
    }
}
