//! Expression nodes.

use std::collections::BTreeSet;

use hcl_tokenizer::Range;

use crate::{Diagnostic, Diagnostics, Operation, Traversal, Traverser, Value};

/// An expression in the native syntax.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// A constant value: a number, `true`, `false` or `null`, or a literal
    /// part of a template.
    Literal { value: Value, range: Range },

    /// A variable reference, possibly followed by attribute and index steps.
    ScopeTraversal { traversal: Traversal, range: Range },

    /// Attribute and index steps applied to the result of another expression.
    RelativeTraversal {
        source: Box<Expression>,
        traversal: Traversal,
        range: Range,
    },

    /// `name(args...)`, with `expand_final` set when the last argument is
    /// followed by `...`.
    FunctionCall {
        name: String,
        args: Vec<Expression>,
        expand_final: bool,
        range: Range,
        name_range: Range,
        open_paren_range: Range,
        close_paren_range: Range,
    },

    /// `condition ? true_result : false_result`
    Conditional {
        condition: Box<Expression>,
        true_result: Box<Expression>,
        false_result: Box<Expression>,
        range: Range,
    },

    BinaryOp {
        lhs: Box<Expression>,
        op: Operation,
        rhs: Box<Expression>,
        range: Range,
    },

    UnaryOp {
        op: Operation,
        operand: Box<Expression>,
        range: Range,
        symbol_range: Range,
    },

    /// `[a, b, c]`
    Tuple {
        exprs: Vec<Expression>,
        range: Range,
        open_range: Range,
    },

    /// `{ k = v, ... }`
    Object {
        items: Vec<ObjectItem>,
        range: Range,
        open_range: Range,
    },

    /// The key of an object item. A bare identifier key is taken literally
    /// unless it was written in parentheses.
    ObjectKey {
        wrapped: Box<Expression>,
        force_non_literal: bool,
    },

    /// A string template: literal parts and interpolations concatenated.
    Template { parts: Vec<Expression>, range: Range },

    /// A template consisting of a single interpolation, like `"${x}"`,
    /// which produces the interpolated value unchanged.
    TemplateWrap {
        wrapped: Box<Expression>,
        range: Range,
    },

    /// Concatenation of every element of a tuple, produced by a `%{ for }`
    /// template directive.
    TemplateJoin { tuple: Box<Expression> },

    /// `collection[key]` where the key is not a constant.
    Index {
        collection: Box<Expression>,
        key: Box<Expression>,
        range: Range,
        open_range: Range,
        bracket_range: Range,
    },

    /// `source[*].each` or `source.*.each`
    Splat {
        source: Box<Expression>,
        each: Box<Expression>,
        range: Range,
        marker_range: Range,
    },

    /// Placeholder for the current element inside the `each` of a splat.
    AnonSymbol { range: Range },

    /// `[for ...]` or `{for ...}`
    For(Box<ForExpr>),

    /// `(inner)`
    Parentheses {
        inner: Box<Expression>,
        range: Range,
    },

    /// A marker that `expr` is evaluated in a scope where some names are
    /// bound locally. Never produced by the parser.
    ChildScope(ChildScope),
}

/// One `key = value` item of an object constructor.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectItem {
    /// Always an [`Expression::ObjectKey`] when produced by the parser.
    pub key: Expression,
    pub value: Expression,
}

/// A `for` expression.
#[derive(Debug, Clone, PartialEq)]
pub struct ForExpr {
    pub key_var: Option<String>,
    pub val_var: String,
    pub collection: Expression,
    /// Present only when building an object.
    pub key_expr: Option<Expression>,
    pub val_expr: Expression,
    pub cond: Option<Expression>,
    /// Whether `...` follows the value, grouping values that share a key.
    pub group: bool,
    pub range: Range,
    pub open_range: Range,
    pub close_range: Range,
}

impl ForExpr {
    /// The names bound by this expression while evaluating its key, value and condition.
    pub fn local_names(&self) -> BTreeSet<String> {
        self.key_var
            .iter()
            .chain(std::iter::once(&self.val_var))
            .cloned()
            .collect()
    }
}

/// An expression wrapped with the names it binds locally.
#[derive(Debug, Clone, PartialEq)]
pub struct ChildScope {
    pub expr: Box<Expression>,
    pub local_names: BTreeSet<String>,
}

/// The static shape of a function call.
#[derive(Debug, Clone, PartialEq)]
pub struct StaticCall<'a> {
    pub name: &'a str,
    pub name_range: &'a Range,
    pub args: &'a [Expression],
    /// From the opening to the closing parenthesis.
    pub args_range: Range,
}

impl Expression {
    /// The source range of the whole expression.
    pub fn range(&self) -> &Range {
        match self {
            Expression::Literal { range, .. }
            | Expression::ScopeTraversal { range, .. }
            | Expression::RelativeTraversal { range, .. }
            | Expression::FunctionCall { range, .. }
            | Expression::Conditional { range, .. }
            | Expression::BinaryOp { range, .. }
            | Expression::UnaryOp { range, .. }
            | Expression::Tuple { range, .. }
            | Expression::Object { range, .. }
            | Expression::Template { range, .. }
            | Expression::TemplateWrap { range, .. }
            | Expression::Index { range, .. }
            | Expression::Splat { range, .. }
            | Expression::AnonSymbol { range }
            | Expression::Parentheses { range, .. } => range,
            Expression::For(for_expr) => &for_expr.range,
            Expression::ObjectKey { wrapped, .. } => wrapped.range(),
            Expression::TemplateJoin { tuple } => tuple.range(),
            Expression::ChildScope(scope) => scope.expr.range(),
        }
    }

    /// The range to point at when the expression as a whole is wrong.
    pub fn start_range(&self) -> &Range {
        match self {
            Expression::FunctionCall { name_range, .. } => name_range,
            Expression::Tuple { open_range, .. } | Expression::Object { open_range, .. } => {
                open_range
            }
            Expression::For(for_expr) => &for_expr.open_range,
            _ => self.range(),
        }
    }

    /// Strip any [`Expression::ChildScope`] wrappers.
    pub fn unwrap(&self) -> &Expression {
        let mut expr = self;
        while let Expression::ChildScope(scope) = expr {
            expr = &scope.expr;
        }
        expr
    }

    /// For an object key written as a bare identifier, that identifier.
    pub fn object_key_literal_name(&self) -> Option<&str> {
        match self {
            Expression::ObjectKey {
                wrapped,
                force_non_literal: false,
            } => match wrapped.as_ref() {
                Expression::ScopeTraversal { traversal, .. } if traversal.0.len() == 1 => {
                    traversal.root_name()
                }
                _ => None,
            },
            _ => None,
        }
    }

    /// Whether this is a template with a single literal part.
    pub fn is_string_literal(&self) -> bool {
        matches!(
            self,
            Expression::Template { parts, .. }
                if matches!(parts.as_slice(), [Expression::Literal { value: Value::String(_), .. }])
        )
    }

    /// The items of a static tuple constructor.
    pub fn expr_list(&self) -> Result<&[Expression], Diagnostics> {
        match self.unwrap() {
            Expression::Tuple { exprs, .. } => Ok(exprs),
            other => Err(invalid_expression("A static list expression is required.", other)),
        }
    }

    /// The key/value pairs of a static object constructor.
    pub fn expr_map(&self) -> Result<Vec<(&Expression, &Expression)>, Diagnostics> {
        match self.unwrap() {
            Expression::Object { items, .. } => {
                Ok(items.iter().map(|item| (&item.key, &item.value)).collect())
            }
            other => Err(invalid_expression("A static map expression is required.", other)),
        }
    }

    /// The name and arguments of a static function call.
    pub fn expr_call(&self) -> Result<StaticCall<'_>, Diagnostics> {
        match self.unwrap() {
            Expression::FunctionCall {
                name,
                args,
                name_range,
                open_paren_range,
                close_paren_range,
                ..
            } => Ok(StaticCall {
                name,
                name_range,
                args,
                args_range: Range::between(open_paren_range, close_paren_range),
            }),
            other => Err(invalid_expression("A static function call is required.", other)),
        }
    }

    /// The absolute traversal a static reference expression like `a.b[0]` denotes.
    pub fn abs_traversal_for_expr(&self) -> Result<Traversal, Diagnostics> {
        self.as_traversal().ok_or_else(|| {
            invalid_expression(
                "A single static variable reference is required: only attribute access and indexing with constant keys. No calculations, function calls, template expressions, etc are allowed here.",
                self,
            )
        })
    }

    fn as_traversal(&self) -> Option<Traversal> {
        match self.unwrap() {
            Expression::ScopeTraversal { traversal, .. } => Some(traversal.clone()),
            Expression::RelativeTraversal {
                source, traversal, ..
            } => {
                let mut abs = source.as_traversal()?;
                abs.0.extend(traversal.0.iter().cloned());
                Some(abs)
            }
            Expression::ObjectKey {
                wrapped,
                force_non_literal: false,
            } => wrapped.as_traversal(),
            _ => None,
        }
    }

    /// Rebuild this expression with `f` applied to each immediate child.
    pub fn map_children(self, f: &mut dyn FnMut(Expression) -> Expression) -> Expression {
        match self {
            Expression::Literal { .. }
            | Expression::ScopeTraversal { .. }
            | Expression::AnonSymbol { .. } => self,
            Expression::RelativeTraversal {
                source,
                traversal,
                range,
            } => Expression::RelativeTraversal {
                source: map_box(source, f),
                traversal,
                range,
            },
            Expression::FunctionCall {
                name,
                args,
                expand_final,
                range,
                name_range,
                open_paren_range,
                close_paren_range,
            } => Expression::FunctionCall {
                name,
                args: args.into_iter().map(&mut *f).collect(),
                expand_final,
                range,
                name_range,
                open_paren_range,
                close_paren_range,
            },
            Expression::Conditional {
                condition,
                true_result,
                false_result,
                range,
            } => Expression::Conditional {
                condition: map_box(condition, f),
                true_result: map_box(true_result, f),
                false_result: map_box(false_result, f),
                range,
            },
            Expression::BinaryOp { lhs, op, rhs, range } => Expression::BinaryOp {
                lhs: map_box(lhs, f),
                op,
                rhs: map_box(rhs, f),
                range,
            },
            Expression::UnaryOp {
                op,
                operand,
                range,
                symbol_range,
            } => Expression::UnaryOp {
                op,
                operand: map_box(operand, f),
                range,
                symbol_range,
            },
            Expression::Tuple {
                exprs,
                range,
                open_range,
            } => Expression::Tuple {
                exprs: exprs.into_iter().map(&mut *f).collect(),
                range,
                open_range,
            },
            Expression::Object {
                items,
                range,
                open_range,
            } => Expression::Object {
                items: items
                    .into_iter()
                    .map(|item| ObjectItem {
                        key: f(item.key),
                        value: f(item.value),
                    })
                    .collect(),
                range,
                open_range,
            },
            Expression::ObjectKey {
                wrapped,
                force_non_literal,
            } => Expression::ObjectKey {
                wrapped: map_box(wrapped, f),
                force_non_literal,
            },
            Expression::Template { parts, range } => Expression::Template {
                parts: parts.into_iter().map(&mut *f).collect(),
                range,
            },
            Expression::TemplateWrap { wrapped, range } => Expression::TemplateWrap {
                wrapped: map_box(wrapped, f),
                range,
            },
            Expression::TemplateJoin { tuple } => Expression::TemplateJoin {
                tuple: map_box(tuple, f),
            },
            Expression::Index {
                collection,
                key,
                range,
                open_range,
                bracket_range,
            } => Expression::Index {
                collection: map_box(collection, f),
                key: map_box(key, f),
                range,
                open_range,
                bracket_range,
            },
            Expression::Splat {
                source,
                each,
                range,
                marker_range,
            } => Expression::Splat {
                source: map_box(source, f),
                each: map_box(each, f),
                range,
                marker_range,
            },
            Expression::For(for_expr) => {
                let ForExpr {
                    key_var,
                    val_var,
                    collection,
                    key_expr,
                    val_expr,
                    cond,
                    group,
                    range,
                    open_range,
                    close_range,
                } = *for_expr;
                Expression::For(Box::new(ForExpr {
                    key_var,
                    val_var,
                    collection: f(collection),
                    key_expr: key_expr.map(&mut *f),
                    val_expr: f(val_expr),
                    cond: cond.map(&mut *f),
                    group,
                    range,
                    open_range,
                    close_range,
                }))
            }
            Expression::Parentheses { inner, range } => Expression::Parentheses {
                inner: map_box(inner, f),
                range,
            },
            Expression::ChildScope(ChildScope { expr, local_names }) => {
                Expression::ChildScope(ChildScope {
                    expr: map_box(expr, f),
                    local_names,
                })
            }
        }
    }

    /// Rewrite the tree bottom-up: every child is transformed before `f` is
    /// applied to the node that contains it.
    pub fn transform<F>(self, f: &mut F) -> Expression
    where
        F: FnMut(Expression) -> Expression,
    {
        let rebuilt = self.map_children(&mut |child| child.transform(f));
        f(rebuilt)
    }
}

fn map_box(expr: Box<Expression>, f: &mut dyn FnMut(Expression) -> Expression) -> Box<Expression> {
    Box::new(f(*expr))
}

fn invalid_expression(detail: &str, expr: &Expression) -> Diagnostics {
    Diagnostic::error("Invalid expression", detail)
        .with_subject(expr.start_range().clone())
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_expression;
    use hcl_tokenizer::Pos;

    fn parse(src: &str) -> Expression {
        let (expr, diags) = parse_expression(src.as_bytes(), "expr.hcl", Pos::START);
        assert!(diags.is_empty(), "{diags}");
        expr
    }

    #[test]
    fn test_static_list() {
        let expr = parse("[a, b, 3]");
        assert_eq!(expr.expr_list().unwrap().len(), 3);
        let err = parse("a").expr_list().unwrap_err();
        assert_eq!(err[0].summary, "Invalid expression");
        assert_eq!(err[0].detail, "A static list expression is required.");
    }

    #[test]
    fn test_static_map_and_call() {
        assert_eq!(parse("{ a = 1, b = 2 }").expr_map().unwrap().len(), 2);
        let expr = parse("file(\"x\", y)");
        let call = expr.expr_call().unwrap();
        assert_eq!(call.name, "file");
        assert_eq!(call.args.len(), 2);
        assert_eq!(call.args_range.start.byte, 4);
        assert_eq!(call.args_range.end.byte, 13);
    }

    #[test]
    fn test_abs_traversal_for_expr() {
        let t = parse("a.b[0].c").abs_traversal_for_expr().unwrap();
        assert_eq!(t.root_name(), Some("a"));
        assert_eq!(t.0.len(), 4);
        assert!(matches!(&t.0[2], Traverser::Index { key, .. } if *key == Value::Number(0.0)));

        let err = parse("a + 1").abs_traversal_for_expr().unwrap_err();
        assert!(err[0].detail.starts_with("A single static variable reference is required"));
    }

    #[test]
    fn test_unwrap_strips_child_scopes() {
        let inner = parse("[x]");
        let wrapped = Expression::ChildScope(ChildScope {
            expr: Box::new(Expression::ChildScope(ChildScope {
                expr: Box::new(inner.clone()),
                local_names: BTreeSet::new(),
            })),
            local_names: BTreeSet::new(),
        });
        assert_eq!(wrapped.unwrap(), &inner);
        assert!(wrapped.expr_list().is_ok());
    }

    #[test]
    fn test_transform_rewrites_bottom_up() {
        // Replace every variable reference with the number 1.
        let expr = parse("a + [b, c * 2]");
        let mut visited = Vec::new();
        let rewritten = expr.transform(&mut |e| match e {
            Expression::ScopeTraversal { traversal, range } => {
                visited.push(traversal.root_name().unwrap_or_default().to_string());
                Expression::Literal {
                    value: Value::Number(1.0),
                    range,
                }
            }
            other => other,
        });
        assert_eq!(visited, vec!["a", "b", "c"]);
        assert!(rewritten.variables().is_empty());
        assert!(matches!(rewritten, Expression::BinaryOp { .. }));
    }
}
