//! Evaluating expressions to values.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use hcl_tokenizer::Range;

use crate::suggest::name_suggestion;
use crate::traversal::index;
use crate::{Diagnostic, Diagnostics, EvalError, Expression, ForExpr, Value};

/// A function callable from expressions.
pub type Function = Arc<dyn Fn(&[Value]) -> Result<Value, String> + Send + Sync>;

/// The variables and functions available to an expression.
///
/// Contexts nest: lookups that miss in a child continue in its parent.
#[derive(Clone, Default)]
pub struct EvalContext<'p> {
    pub variables: BTreeMap<String, Value>,
    pub functions: BTreeMap<String, Function>,
    parent: Option<&'p EvalContext<'p>>,
}

impl fmt::Debug for EvalContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvalContext")
            .field("variables", &self.variables)
            .field("functions", &self.functions.keys().collect::<Vec<_>>())
            .field("parent", &self.parent)
            .finish()
    }
}

impl<'p> EvalContext<'p> {
    /// Create an empty root context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a variable.
    pub fn with_variable(mut self, name: impl Into<String>, value: Value) -> Self {
        self.variables.insert(name.into(), value);
        self
    }

    /// Add a function.
    pub fn with_function<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.functions.insert(name.into(), Arc::new(f));
        self
    }

    /// Create an empty context whose lookups fall back to this one.
    pub fn new_child(&self) -> EvalContext<'_> {
        EvalContext {
            variables: BTreeMap::new(),
            functions: BTreeMap::new(),
            parent: Some(self),
        }
    }

    /// The context this one was created from, if any.
    pub fn parent(&self) -> Option<&EvalContext<'p>> {
        self.parent
    }

    /// Look up a variable here or in any ancestor.
    pub fn variable(&self, name: &str) -> Option<&Value> {
        self.ancestors().find_map(|c| c.variables.get(name))
    }

    /// Look up a function here or in any ancestor.
    pub fn function(&self, name: &str) -> Option<&Function> {
        self.ancestors().find_map(|c| c.functions.get(name))
    }

    /// Every variable name visible from this context.
    pub fn variable_names(&self) -> BTreeSet<String> {
        self.ancestors()
            .flat_map(|c| c.variables.keys().cloned())
            .collect()
    }

    /// Every function name visible from this context.
    pub fn function_names(&self) -> BTreeSet<String> {
        self.ancestors()
            .flat_map(|c| c.functions.keys().cloned())
            .collect()
    }

    /// This context followed by each of its ancestors.
    fn ancestors(&self) -> impl Iterator<Item = &EvalContext<'p>> {
        std::iter::successors(Some(self), |c| c.parent)
    }
}

fn error_at(summary: &str, detail: impl Into<String>, subject: &Range) -> Diagnostic {
    Diagnostic::error(summary, detail).with_subject(subject.clone())
}

impl Expression {
    /// Evaluate the expression.
    ///
    /// Without a context, any variable reference or function call is an error.
    /// Parts of the expression that fail to evaluate produce [`Value::Unknown`].
    pub fn value(&self, ctx: Option<&EvalContext<'_>>) -> (Value, Diagnostics) {
        self.eval(ctx, None)
    }

    /// `anon` is the current element of the innermost enclosing splat.
    fn eval(&self, ctx: Option<&EvalContext<'_>>, anon: Option<&Value>) -> (Value, Diagnostics) {
        let mut diags = Diagnostics::new();
        let value = match self {
            Expression::Literal { value, .. } => value.clone(),

            Expression::ScopeTraversal { traversal, .. } => {
                let (v, d) = traversal.traverse_abs(ctx);
                diags.extend(d);
                v
            }

            Expression::RelativeTraversal {
                source, traversal, ..
            } => {
                let (source, d) = source.eval(ctx, anon);
                diags.extend(d);
                let (v, d) = traversal.traverse_rel(&source);
                diags.extend(d);
                v
            }

            Expression::FunctionCall {
                name,
                args,
                expand_final,
                name_range,
                ..
            } => {
                let (v, d) = self.eval_call(ctx, anon, name, args, *expand_final, name_range);
                diags.extend(d);
                v
            }

            Expression::Conditional {
                condition,
                true_result,
                false_result,
                ..
            } => {
                let (cond, d) = condition.eval(ctx, anon);
                diags.extend(d);
                let (t, d) = true_result.eval(ctx, anon);
                diags.extend(d);
                let (f, d) = false_result.eval(ctx, anon);
                diags.extend(d);
                match cond {
                    Value::Bool(true) => t,
                    Value::Bool(false) => f,
                    Value::Unknown => Value::Unknown,
                    Value::Null => {
                        diags.push(error_at(
                            "Null condition",
                            "The condition value is null. Conditions must either be true or false.",
                            condition.range(),
                        ));
                        Value::Unknown
                    }
                    _ => {
                        diags.push(error_at(
                            "Incorrect condition type",
                            "The condition expression must be of type bool.",
                            condition.range(),
                        ));
                        Value::Unknown
                    }
                }
            }

            Expression::BinaryOp { lhs, op, rhs, range } => {
                let (l, d) = lhs.eval(ctx, anon);
                diags.extend(d);
                let (r, d) = rhs.eval(ctx, anon);
                diags.extend(d);
                match op.eval_binary(&l, &r) {
                    Ok(v) => v,
                    Err(err) => {
                        diags.push(operation_error(&err, range));
                        Value::Unknown
                    }
                }
            }

            Expression::UnaryOp {
                op, operand, range, ..
            } => {
                let (v, d) = operand.eval(ctx, anon);
                diags.extend(d);
                match op.eval_unary(&v) {
                    Ok(v) => v,
                    Err(err) => {
                        diags.push(operation_error(&err, range));
                        Value::Unknown
                    }
                }
            }

            Expression::Tuple { exprs, .. } => {
                let mut items = Vec::with_capacity(exprs.len());
                for expr in exprs {
                    let (v, d) = expr.eval(ctx, anon);
                    diags.extend(d);
                    items.push(v);
                }
                Value::Tuple(items)
            }

            Expression::Object { items, .. } => {
                let mut attrs = BTreeMap::new();
                let mut known = true;
                for item in items {
                    let (key, d) = item.key.eval(ctx, anon);
                    diags.extend(d);
                    let (value, d) = item.value.eval(ctx, anon);
                    diags.extend(d);
                    match key {
                        Value::Unknown => known = false,
                        Value::Null => diags.push(error_at(
                            "Null value as key",
                            "Can't use a null value as a key.",
                            item.key.range(),
                        )),
                        key => match key.to_template_string() {
                            Some(k) => {
                                attrs.insert(k, value);
                            }
                            None => diags.push(error_at(
                                "Incorrect key type",
                                "Can't use this value as a key: string required.",
                                item.key.range(),
                            )),
                        },
                    }
                }
                if known {
                    Value::Object(attrs)
                } else {
                    Value::Unknown
                }
            }

            Expression::ObjectKey { wrapped, .. } => match self.object_key_literal_name() {
                Some(name) => Value::String(name.to_string()),
                None => {
                    let (v, d) = wrapped.eval(ctx, anon);
                    diags.extend(d);
                    v
                }
            },

            Expression::Template { parts, .. } => {
                let mut out = String::new();
                let mut known = true;
                for part in parts {
                    let (v, d) = part.eval(ctx, anon);
                    diags.extend(d);
                    match v {
                        Value::Unknown => known = false,
                        Value::Null => diags.push(error_at(
                            "Invalid template interpolation value",
                            "The expression result is null. Cannot include a null value in a string template.",
                            part.range(),
                        )),
                        v => match v.to_template_string() {
                            Some(s) => out.push_str(&s),
                            None => diags.push(error_at(
                                "Invalid template interpolation value",
                                format!(
                                    "Cannot include the given value in a string template: string required, but have {}.",
                                    v.type_name()
                                ),
                                part.range(),
                            )),
                        },
                    }
                }
                if known && !diags.has_errors() {
                    Value::String(out)
                } else {
                    Value::Unknown
                }
            }

            Expression::TemplateWrap { wrapped, .. } => {
                let (v, d) = wrapped.eval(ctx, anon);
                diags.extend(d);
                v
            }

            Expression::TemplateJoin { tuple } => {
                let (v, d) = tuple.eval(ctx, anon);
                diags.extend(d);
                match v {
                    Value::Tuple(items) => {
                        let mut out = String::new();
                        let mut known = true;
                        for item in items {
                            match item {
                                Value::Unknown => known = false,
                                Value::Null => diags.push(error_at(
                                    "Invalid template interpolation value",
                                    "An iteration result is null. Cannot include a null value in a string template.",
                                    tuple.range(),
                                )),
                                item => match item.to_template_string() {
                                    Some(s) => out.push_str(&s),
                                    None => diags.push(error_at(
                                        "Invalid template interpolation value",
                                        "An iteration result is not a string, number or bool.",
                                        tuple.range(),
                                    )),
                                },
                            }
                        }
                        if known && !diags.has_errors() {
                            Value::String(out)
                        } else {
                            Value::Unknown
                        }
                    }
                    _ => Value::Unknown,
                }
            }

            Expression::Index {
                collection,
                key,
                bracket_range,
                ..
            } => {
                let (coll, d) = collection.eval(ctx, anon);
                diags.extend(d);
                let (key, d) = key.eval(ctx, anon);
                diags.extend(d);
                let (v, d) = index(&coll, &key, bracket_range);
                diags.extend(d);
                v
            }

            Expression::Splat { source, each, .. } => {
                let (source, d) = source.eval(ctx, anon);
                diags.extend(d);
                let items = match source {
                    Value::Unknown => return (Value::Unknown, diags),
                    Value::Null => Vec::new(),
                    Value::Tuple(items) => items,
                    other => vec![other],
                };
                let mut out = Vec::with_capacity(items.len());
                for item in &items {
                    let (v, d) = each.eval(ctx, Some(item));
                    diags.extend(d);
                    out.push(v);
                }
                Value::Tuple(out)
            }

            Expression::AnonSymbol { .. } => anon.cloned().unwrap_or(Value::Unknown),

            Expression::For(for_expr) => {
                let (v, d) = for_expr.eval(ctx, anon);
                diags.extend(d);
                v
            }

            Expression::Parentheses { inner, .. } => {
                let (v, d) = inner.eval(ctx, anon);
                diags.extend(d);
                v
            }

            Expression::ChildScope(scope) => {
                let (v, d) = scope.expr.eval(ctx, anon);
                diags.extend(d);
                v
            }
        };
        (value, diags)
    }

    fn eval_call(
        &self,
        ctx: Option<&EvalContext<'_>>,
        anon: Option<&Value>,
        name: &str,
        args: &[Expression],
        expand_final: bool,
        name_range: &Range,
    ) -> (Value, Diagnostics) {
        let mut diags = Diagnostics::new();

        let Some(ctx) = ctx else {
            diags.push(error_at(
                "Function calls not allowed",
                "Functions may not be called here.",
                self.range(),
            ));
            return (Value::Unknown, diags);
        };

        let Some(function) = ctx.function(name) else {
            let names = ctx.function_names();
            let suggestion = match name_suggestion(name, names.iter().map(String::as_str)) {
                Some(s) => format!(" Did you mean {:?}?", s),
                None => String::new(),
            };
            diags.push(
                error_at(
                    "Call to unknown function",
                    format!("There is no function named {:?}.{}", name, suggestion),
                    name_range,
                )
                .with_context(self.range().clone()),
            );
            return (Value::Unknown, diags);
        };

        let mut values = Vec::with_capacity(args.len());
        for (i, arg) in args.iter().enumerate() {
            let (v, d) = arg.eval(Some(ctx), anon);
            diags.extend(d);
            if expand_final && i == args.len() - 1 {
                match v {
                    Value::Tuple(items) => values.extend(items),
                    Value::Unknown => values.push(Value::Unknown),
                    _ => diags.push(error_at(
                        "Invalid expanding argument value",
                        "The expanding argument (indicated by ...) must be of a tuple type.",
                        arg.range(),
                    )),
                }
            } else {
                values.push(v);
            }
        }

        if diags.has_errors() || values.iter().any(|v| !v.is_known()) {
            return (Value::Unknown, diags);
        }

        match function(&values) {
            Ok(v) => (v, diags),
            Err(msg) => {
                diags.push(error_at(
                    "Error in function call",
                    format!("Call to function {:?} failed: {}.", name, msg),
                    self.range(),
                ));
                (Value::Unknown, diags)
            }
        }
    }
}

fn operation_error(err: &EvalError, range: &Range) -> Diagnostic {
    let summary = match err {
        EvalError::InvalidOperand { .. } => "Invalid operand",
        EvalError::DivisionByZero { .. } => "Operation failed",
        EvalError::NotImplemented { .. } => "Operation not implemented",
    };
    error_at(summary, err.to_string(), range)
}

impl ForExpr {
    fn eval(&self, ctx: Option<&EvalContext<'_>>, anon: Option<&Value>) -> (Value, Diagnostics) {
        let mut diags = Diagnostics::new();

        let (collection, d) = self.collection.eval(ctx, anon);
        diags.extend(d);

        let elements: Vec<(Value, Value)> = match collection {
            Value::Unknown => return (Value::Unknown, diags),
            Value::Null => {
                diags.push(error_at(
                    "Iteration over null value",
                    "A null value cannot be used as the collection in a 'for' expression.",
                    self.collection.range(),
                ));
                return (Value::Unknown, diags);
            }
            Value::Tuple(items) => items
                .into_iter()
                .enumerate()
                .map(|(i, v)| (Value::from(i as i64), v))
                .collect(),
            Value::Object(attrs) => attrs
                .into_iter()
                .map(|(k, v)| (Value::String(k), v))
                .collect(),
            other => {
                diags.push(error_at(
                    "Iteration over non-iterable value",
                    format!(
                        "A value of type {} cannot be used as the collection in a 'for' expression.",
                        other.type_name()
                    ),
                    self.collection.range(),
                ));
                return (Value::Unknown, diags);
            }
        };

        let root = EvalContext::new();
        let base = ctx.unwrap_or(&root);

        let mut tuple = Vec::new();
        let mut object: BTreeMap<String, Value> = BTreeMap::new();
        let mut groups: BTreeMap<String, Vec<Value>> = BTreeMap::new();
        let mut known = true;

        for (key, value) in elements {
            let mut child = base.new_child();
            if let Some(key_var) = &self.key_var {
                child.variables.insert(key_var.clone(), key);
            }
            child.variables.insert(self.val_var.clone(), value);

            if let Some(cond) = &self.cond {
                let (include, d) = cond.eval(Some(&child), anon);
                diags.extend(d);
                match include {
                    Value::Bool(true) => {}
                    Value::Bool(false) => continue,
                    Value::Unknown => {
                        known = false;
                        continue;
                    }
                    Value::Null => {
                        diags.push(error_at(
                            "Condition is null",
                            "The value of the 'if' clause must not be null.",
                            cond.range(),
                        ));
                        continue;
                    }
                    _ => {
                        diags.push(error_at(
                            "Invalid 'for' condition",
                            "The 'if' clause value is invalid: bool required.",
                            cond.range(),
                        ));
                        continue;
                    }
                }
            }

            let (value, d) = self.val_expr.eval(Some(&child), anon);
            diags.extend(d);

            let Some(key_expr) = &self.key_expr else {
                tuple.push(value);
                continue;
            };

            let (key, d) = key_expr.eval(Some(&child), anon);
            diags.extend(d);
            let key = match key {
                Value::Unknown => {
                    known = false;
                    continue;
                }
                key => match key.to_template_string() {
                    Some(k) => k,
                    None => {
                        diags.push(error_at(
                            "Invalid object key",
                            "The key expression produced an invalid result: string required.",
                            key_expr.range(),
                        ));
                        continue;
                    }
                },
            };

            if self.group {
                groups.entry(key).or_default().push(value);
            } else if object.contains_key(&key) {
                diags.push(error_at(
                    "Duplicate object key",
                    format!(
                        "Two different items produced the key {:?} in this 'for' expression. If duplicates are expected, use the ellipsis (...) after the value expression to enable grouping by key.",
                        key
                    ),
                    key_expr.range(),
                ));
            } else {
                object.insert(key, value);
            }
        }

        if !known {
            return (Value::Unknown, diags);
        }
        let value = match (&self.key_expr, self.group) {
            (None, _) => Value::Tuple(tuple),
            (Some(_), false) => Value::Object(object),
            (Some(_), true) => Value::Object(
                groups
                    .into_iter()
                    .map(|(k, vs)| (k, Value::Tuple(vs)))
                    .collect(),
            ),
        };
        (value, diags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_expression;
    use hcl_tokenizer::Pos;

    fn eval(src: &str, ctx: Option<&EvalContext<'_>>) -> (Value, Diagnostics) {
        let (expr, diags) = parse_expression(src.as_bytes(), "eval.hcl", Pos::START);
        assert!(diags.is_empty(), "parse errors: {diags}");
        expr.value(ctx)
    }

    fn eval_ok(src: &str, ctx: Option<&EvalContext<'_>>) -> Value {
        let (v, diags) = eval(src, ctx);
        assert!(diags.is_empty(), "eval errors: {diags}");
        v
    }

    #[test]
    fn test_arithmetic_and_precedence() {
        assert_eq!(eval_ok("1 + 2 * 3", None), Value::Number(7.0));
        assert_eq!(eval_ok("10 - 4 - 3", None), Value::Number(3.0));
        assert_eq!(eval_ok("-2 + 5", None), Value::Number(3.0));
        assert_eq!(eval_ok("!(1 > 2) && true", None), Value::Bool(true));
    }

    #[test]
    fn test_conditional() {
        assert_eq!(eval_ok("1 < 2 ? \"yes\" : \"no\"", None), Value::from("yes"));
        let (_, diags) = eval("1 ? 2 : 3", None);
        assert_eq!(diags[0].summary, "Incorrect condition type");
    }

    #[test]
    fn test_variables_and_functions() {
        let ctx = EvalContext::new()
            .with_variable("name", Value::from("world"))
            .with_function("upper", |args: &[Value]| match args {
                [Value::String(s)] => Ok(Value::String(s.to_uppercase())),
                _ => Err("expected one string".to_string()),
            });
        assert_eq!(
            eval_ok("\"hello ${upper(name)}\"", Some(&ctx)),
            Value::from("hello WORLD")
        );

        let (_, diags) = eval("uper(name)", Some(&ctx));
        assert_eq!(diags[0].summary, "Call to unknown function");
        assert_eq!(
            diags[0].detail,
            "There is no function named \"uper\". Did you mean \"upper\"?"
        );

        let (_, diags) = eval("upper(name)", None);
        assert_eq!(diags[0].summary, "Function calls not allowed");
    }

    #[test]
    fn test_expanded_final_argument() {
        let ctx = EvalContext::new().with_function("count", |args: &[Value]| {
            Ok(Value::from(args.len() as i64))
        });
        assert_eq!(eval_ok("count(1, [2, 3]...)", Some(&ctx)), Value::Number(3.0));
    }

    #[test]
    fn test_collections_and_traversals() {
        assert_eq!(eval_ok("[1, 2, 3][1]", None), Value::Number(2.0));
        assert_eq!(eval_ok("{a = 1, b = 2}.b", None), Value::Number(2.0));
        assert_eq!(eval_ok("{a = {b = \"c\"}}.a[\"b\"]", None), Value::from("c"));
        let (_, diags) = eval("{a = 1}.z", None);
        assert_eq!(diags[0].summary, "Unsupported attribute");
    }

    #[test]
    fn test_object_key_forms() {
        let ctx = EvalContext::new().with_variable("k", Value::from("dynamic"));
        let v = eval_ok("{k = 1, (k) = 2}", Some(&ctx));
        let Value::Object(attrs) = v else {
            panic!("expected object");
        };
        assert_eq!(attrs.get("k"), Some(&Value::Number(1.0)));
        assert_eq!(attrs.get("dynamic"), Some(&Value::Number(2.0)));
    }

    #[test]
    fn test_for_expressions() {
        assert_eq!(
            eval_ok("[for v in [1, 2, 3] : v * 2 if v != 2]", None),
            Value::Tuple(vec![Value::Number(2.0), Value::Number(6.0)])
        );
        let v = eval_ok("{for i, v in [\"a\", \"b\", \"a\"] : v => i...}", None);
        let Value::Object(attrs) = v else {
            panic!("expected object");
        };
        assert_eq!(
            attrs.get("a"),
            Some(&Value::Tuple(vec![Value::Number(0.0), Value::Number(2.0)]))
        );

        let (_, diags) = eval("{for v in [\"a\", \"a\"] : v => v}", None);
        assert_eq!(diags[0].summary, "Duplicate object key");
    }

    #[test]
    fn test_splat() {
        let ctx = EvalContext::new().with_variable(
            "items",
            Value::Tuple(vec![
                Value::Object([("id".to_string(), Value::from(1i64))].into()),
                Value::Object([("id".to_string(), Value::from(2i64))].into()),
            ]),
        );
        let expected = Value::Tuple(vec![Value::Number(1.0), Value::Number(2.0)]);
        assert_eq!(eval_ok("items[*].id", Some(&ctx)), expected);
        assert_eq!(eval_ok("items.*.id", Some(&ctx)), expected);
    }

    #[test]
    fn test_template_directives() {
        let ctx = EvalContext::new()
            .with_variable("on", Value::Bool(false))
            .with_variable("xs", Value::Tuple(vec![Value::from("a"), Value::from("b")]));
        assert_eq!(
            eval_ok("\"%{ if on }yes%{ else }no%{ endif }\"", Some(&ctx)),
            Value::from("no")
        );
        assert_eq!(
            eval_ok("\"%{ for x in xs }<${x}>%{ endfor }\"", Some(&ctx)),
            Value::from("<a><b>")
        );
    }

    #[test]
    fn test_operation_errors_are_diagnostics() {
        let (v, diags) = eval("true + 1", None);
        assert_eq!(v, Value::Unknown);
        assert_eq!(diags[0].summary, "Invalid operand");
        let (_, diags) = eval("1 / 0", None);
        assert_eq!(diags[0].summary, "Operation failed");
    }

    #[test]
    fn test_unknown_propagates_through_operators() {
        let ctx = EvalContext::new().with_variable("u", Value::Unknown);
        assert_eq!(eval_ok("u + 1", Some(&ctx)), Value::Unknown);
        assert_eq!(eval_ok("\"x${u}\"", Some(&ctx)), Value::Unknown);
    }
}
