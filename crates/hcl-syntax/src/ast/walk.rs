//! Depth-first traversal of syntax trees.

use std::borrow::Cow;
use std::collections::BTreeSet;

use hcl_tokenizer::Range;

use crate::{Attribute, Attributes, Block, Blocks, Body, Diagnostics, Expression, Traversal};

/// A borrowed reference to any node in a syntax tree.
#[derive(Debug, Clone)]
pub enum Node<'a> {
    Expression(&'a Expression),
    /// An expression evaluated with extra names bound. Visited for
    /// [`Expression::ChildScope`] wrappers and for the parts of a `for`
    /// expression that see its iteration variables.
    Scope {
        expr: &'a Expression,
        local_names: Cow<'a, BTreeSet<String>>,
    },
    Body(&'a Body),
    Attributes(&'a Attributes),
    Attribute(&'a Attribute),
    Blocks(&'a Blocks),
    Block(&'a Block),
}

impl<'a> From<&'a Expression> for Node<'a> {
    fn from(expr: &'a Expression) -> Self {
        match expr {
            Expression::ChildScope(scope) => Node::Scope {
                expr: &scope.expr,
                local_names: Cow::Borrowed(&scope.local_names),
            },
            other => Node::Expression(other),
        }
    }
}

impl<'a> Node<'a> {
    /// The node's source range. Empty attribute and block groups have none.
    pub fn range(&self) -> Option<Range> {
        match self {
            Node::Expression(expr) | Node::Scope { expr, .. } => Some(expr.range().clone()),
            Node::Body(body) => Some(body.range.clone()),
            Node::Attributes(attrs) => attrs.range().cloned(),
            Node::Attribute(attr) => Some(attr.range.clone()),
            Node::Blocks(blocks) => blocks.iter().next().map(Block::range),
            Node::Block(block) => Some(block.range()),
        }
    }

    /// Call `f` with each immediate child, in source order.
    pub fn walk_children(&self, f: &mut dyn FnMut(Node<'a>)) {
        match *self {
            Node::Expression(expr) => expression_children(expr, f),
            Node::Scope { expr, .. } => f(Node::from(expr)),
            Node::Body(body) => {
                f(Node::Attributes(&body.attributes));
                f(Node::Blocks(&body.blocks));
            }
            Node::Attributes(attrs) => {
                for attr in attrs.in_source_order() {
                    f(Node::Attribute(attr));
                }
            }
            Node::Attribute(attr) => f(Node::from(&attr.expr)),
            Node::Blocks(blocks) => {
                for block in blocks.iter() {
                    f(Node::Block(block));
                }
            }
            Node::Block(block) => f(Node::Body(&block.body)),
        }
    }
}

fn expression_children<'a>(expr: &'a Expression, f: &mut dyn FnMut(Node<'a>)) {
    match expr {
        Expression::Literal { .. }
        | Expression::ScopeTraversal { .. }
        | Expression::AnonSymbol { .. } => {}
        Expression::RelativeTraversal { source, .. } => f(Node::from(&**source)),
        Expression::FunctionCall { args, .. } => args.iter().for_each(|a| f(Node::from(a))),
        Expression::Conditional {
            condition,
            true_result,
            false_result,
            ..
        } => {
            f(Node::from(&**condition));
            f(Node::from(&**true_result));
            f(Node::from(&**false_result));
        }
        Expression::BinaryOp { lhs, rhs, .. } => {
            f(Node::from(&**lhs));
            f(Node::from(&**rhs));
        }
        Expression::UnaryOp { operand, .. } => f(Node::from(&**operand)),
        Expression::Tuple { exprs, .. } => exprs.iter().for_each(|e| f(Node::from(e))),
        Expression::Object { items, .. } => {
            for item in items {
                f(Node::from(&item.key));
                f(Node::from(&item.value));
            }
        }
        Expression::ObjectKey { wrapped, .. } => {
            if expr.object_key_literal_name().is_none() {
                f(Node::from(&**wrapped));
            }
        }
        Expression::Template { parts, .. } => parts.iter().for_each(|p| f(Node::from(p))),
        Expression::TemplateWrap { wrapped, .. } => f(Node::from(&**wrapped)),
        Expression::TemplateJoin { tuple } => f(Node::from(&**tuple)),
        Expression::Index {
            collection, key, ..
        } => {
            f(Node::from(&**collection));
            f(Node::from(&**key));
        }
        Expression::Splat { source, each, .. } => {
            f(Node::from(&**source));
            f(Node::from(&**each));
        }
        Expression::For(for_expr) => {
            f(Node::from(&for_expr.collection));
            let names = for_expr.local_names();
            let scoped = [
                for_expr.key_expr.as_ref(),
                Some(&for_expr.val_expr),
                for_expr.cond.as_ref(),
            ];
            for expr in scoped.into_iter().flatten() {
                f(Node::Scope {
                    expr,
                    local_names: Cow::Owned(names.clone()),
                });
            }
        }
        Expression::Parentheses { inner, .. } => f(Node::from(&**inner)),
        Expression::ChildScope(scope) => f(Node::from(&*scope.expr)),
    }
}

/// Callbacks for [`walk`].
pub trait Walker {
    /// Called before a node's children are visited.
    fn enter(&mut self, node: &Node<'_>) -> Diagnostics;

    /// Called after a node's children have been visited.
    fn exit(&mut self, _node: &Node<'_>) -> Diagnostics {
        Diagnostics::new()
    }
}

/// Visit `node` and everything below it depth-first, collecting the
/// diagnostics every callback returns.
pub fn walk<W: Walker + ?Sized>(node: Node<'_>, walker: &mut W) -> Diagnostics {
    let mut diags = walker.enter(&node);
    node.walk_children(&mut |child| diags.extend(walk(child, walker)));
    diags.extend(walker.exit(&node));
    diags
}

#[derive(Default)]
struct VariablesWalker {
    scopes: Vec<BTreeSet<String>>,
    found: Vec<Traversal>,
}

impl VariablesWalker {
    fn is_local(&self, name: &str) -> bool {
        self.scopes.iter().any(|scope| scope.contains(name))
    }
}

impl Walker for VariablesWalker {
    fn enter(&mut self, node: &Node<'_>) -> Diagnostics {
        match node {
            Node::Expression(Expression::ScopeTraversal { traversal, .. }) => {
                if let Some(root) = traversal.root_name()
                    && !self.is_local(root)
                {
                    self.found.push(traversal.clone());
                }
            }
            Node::Scope { local_names, .. } => self.scopes.push(local_names.clone().into_owned()),
            _ => {}
        }
        Diagnostics::new()
    }

    fn exit(&mut self, node: &Node<'_>) -> Diagnostics {
        if let Node::Scope { .. } = node {
            self.scopes.pop();
        }
        Diagnostics::new()
    }
}

impl Expression {
    /// Every variable reference in the expression, in source order, except
    /// references to names bound by an enclosing `for` or child scope.
    pub fn variables(&self) -> Vec<Traversal> {
        let mut walker = VariablesWalker::default();
        walk(Node::from(self), &mut walker);
        walker.found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ChildScope, Diagnostic, parse_config, parse_expression};
    use hcl_tokenizer::Pos;

    fn parse(src: &str) -> Expression {
        let (expr, diags) = parse_expression(src.as_bytes(), "walk.hcl", Pos::START);
        assert!(diags.is_empty(), "{diags}");
        expr
    }

    fn roots(expr: &Expression) -> Vec<String> {
        expr.variables()
            .iter()
            .filter_map(|t| t.root_name().map(str::to_string))
            .collect()
    }

    #[test]
    fn test_variables_in_source_order() {
        let expr = parse("foo(a.b, c[0]) ? \"${d}\" : [e, {f = g, (h) = 1}]");
        assert_eq!(roots(&expr), vec!["a", "c", "d", "e", "g", "h"]);
    }

    #[test]
    fn test_for_variables_are_masked() {
        let expr = parse("[for k, v in items: v.name if k != skip]");
        assert_eq!(roots(&expr), vec!["items", "skip"]);
    }

    #[test]
    fn test_child_scope_masks_names() {
        let expr = Expression::ChildScope(ChildScope {
            expr: Box::new(parse("[x, y]")),
            local_names: BTreeSet::from(["x".to_string()]),
        });
        assert_eq!(roots(&expr), vec!["y"]);
    }

    struct Counter {
        depth: usize,
        max_depth: usize,
        blocks: usize,
    }

    impl Walker for Counter {
        fn enter(&mut self, node: &Node<'_>) -> Diagnostics {
            self.depth += 1;
            self.max_depth = self.max_depth.max(self.depth);
            if let Node::Block(block) = node {
                self.blocks += 1;
                return Diagnostic::warning("Block", block.block_type.clone()).into();
            }
            Diagnostics::new()
        }

        fn exit(&mut self, _node: &Node<'_>) -> Diagnostics {
            self.depth -= 1;
            Diagnostics::new()
        }
    }

    #[test]
    fn test_walk_bodies_collects_diagnostics() {
        let src = "a = 1\nouter {\n  inner {\n    b = c\n  }\n}\n";
        let (file, diags) = parse_config(src.as_bytes(), "walk.hcl", Pos::START);
        assert!(diags.is_empty(), "{diags}");
        let mut counter = Counter {
            depth: 0,
            max_depth: 0,
            blocks: 0,
        };
        let found = walk(Node::Body(&file.body), &mut counter);
        assert_eq!(counter.blocks, 2);
        assert_eq!(counter.depth, 0);
        // body, blocks, block, body, blocks, block, body, attributes, attribute, expression
        assert_eq!(counter.max_depth, 10);
        let kinds: Vec<&str> = found.iter().map(|d| d.detail.as_str()).collect();
        assert_eq!(kinds, vec!["outer", "inner"]);
    }
}
