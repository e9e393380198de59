//! Expressions: operators, terms, traversals, collections and `for`.

use hcl_tokenizer::{Range, Token, TokenType};

use super::Parser;
use crate::{
    BINARY_OPS, Diagnostic, Diagnostics, Expression, ForExpr, ObjectItem, Operation, Traversal,
    Traverser, Value,
};

impl<'src> Parser<'src> {
    /// Parse one expression, leaving the parser on the token after it.
    pub fn parse_expression(&mut self) -> (Expression, Diagnostics) {
        self.parse_ternary_conditional()
    }

    fn parse_ternary_conditional(&mut self) -> (Expression, Diagnostics) {
        let (condition, mut diags) = self.parse_binary_ops(0);
        if self.recovery && diags.has_errors() {
            return (condition, diags);
        }
        if self.peek().kind != TokenType::Question {
            return (condition, diags);
        }
        self.read();

        let (true_result, true_diags) = self.parse_expression();
        let failed = true_diags.has_errors();
        diags.extend(true_diags);
        if self.recovery && failed {
            return (condition, diags);
        }

        let colon = self.peek();
        if colon.kind != TokenType::Colon {
            diags.push(
                Diagnostic::error(
                    "Missing false expression in conditional",
                    "The conditional operator (...?...:...) requires a false expression, delimited by a colon.",
                )
                .with_subject(colon.range.clone())
                .with_context(Range::between(condition.range(), &colon.range)),
            );
            return (condition, diags);
        }
        self.read();

        let (false_result, false_diags) = self.parse_expression();
        let failed = false_diags.has_errors();
        diags.extend(false_diags);
        if self.recovery && failed {
            return (condition, diags);
        }

        let range = Range::between(condition.range(), false_result.range());
        let expr = Expression::Conditional {
            condition: Box::new(condition),
            true_result: Box::new(true_result),
            false_result: Box::new(false_result),
            range,
        };
        (expr, diags)
    }

    /// Operators at `level` and above in [`BINARY_OPS`]. Operators of one
    /// level fold to the left.
    fn parse_binary_ops(&mut self, level: usize) -> (Expression, Diagnostics) {
        if level >= BINARY_OPS.len() {
            return self.parse_expression_with_traversals();
        }

        let (mut lhs, mut diags) = self.parse_binary_ops(level + 1);
        if self.recovery && diags.has_errors() {
            return (lhs, diags);
        }

        while let Some(op) = Operation::binary_at_level(level, self.peek().kind) {
            self.read();
            let (rhs, rhs_diags) = self.parse_binary_ops(level + 1);
            let failed = rhs_diags.has_errors();
            diags.extend(rhs_diags);
            if self.recovery && failed {
                return (lhs, diags);
            }
            let range = Range::between(lhs.range(), rhs.range());
            lhs = Expression::BinaryOp {
                lhs: Box::new(lhs),
                op,
                rhs: Box::new(rhs),
                range,
            };
        }
        (lhs, diags)
    }

    fn parse_expression_with_traversals(&mut self) -> (Expression, Diagnostics) {
        let (term, mut diags) = self.parse_expression_term();
        let (expr, more) = self.parse_expression_traversals(term);
        diags.extend(more);
        (expr, diags)
    }

    fn parse_expression_traversals(&mut self, from: Expression) -> (Expression, Diagnostics) {
        let mut diags = Diagnostics::new();
        let from_range = from.range().clone();
        let mut ret = from;

        loop {
            match self.peek().kind {
                TokenType::Dot => {
                    let dot = self.read();
                    let attr = self.peek();
                    match attr.kind {
                        TokenType::Ident => {
                            let attr = self.read();
                            let range = Range::between(&dot.range, &attr.range);
                            let step = Traverser::Attr {
                                name: attr.text().into_owned(),
                                range: range.clone(),
                            };
                            ret = make_relative_traversal(ret, step, range);
                        }
                        TokenType::NumberLit => {
                            let num = self.read();
                            let range = Range::between(&dot.range, &num.range);
                            let (key, d) = legacy_index_key(&num);
                            diags.extend(d);
                            let step = Traverser::Index {
                                key,
                                range: range.clone(),
                            };
                            ret = make_relative_traversal(ret, step, range);
                        }
                        TokenType::Star => {
                            let (splat, d) = self.finish_attr_splat(ret, &from_range, &dot);
                            diags.extend(d);
                            ret = splat;
                        }
                        _ => {
                            diags.push(
                                Diagnostic::error(
                                    "Invalid attribute name",
                                    "An attribute name is required after a dot.",
                                )
                                .with_subject(attr.range),
                            );
                            self.set_recovery();
                        }
                    }
                }
                TokenType::OBrack => {
                    let open = self.read();
                    if self.peek().kind == TokenType::Star {
                        self.read();
                        let mut close = self.read();
                        if close.kind != TokenType::CBrack && !self.recovery {
                            diags.push(
                                Diagnostic::error(
                                    "Missing close bracket on splat index",
                                    "The star for a full splat operator must be immediately followed by a closing bracket (\"]\").",
                                )
                                .with_subject(close.range.clone()),
                            );
                            close = self.recover(TokenType::CBrack);
                        }
                        let marker_range = Range::between(&open.range, &close.range);
                        let item = Expression::AnonSymbol {
                            range: marker_range.clone(),
                        };
                        let (each, d) = self.parse_expression_traversals(item);
                        diags.extend(d);
                        ret = Expression::Splat {
                            range: Range::between(&from_range, each.range()),
                            source: Box::new(ret),
                            each: Box::new(each),
                            marker_range,
                        };
                        continue;
                    }

                    self.peeker.push_include_newlines(false);
                    let (key, key_diags) = self.parse_expression();
                    let failed = key_diags.has_errors();
                    diags.extend(key_diags);
                    let close = if self.recovery && failed {
                        self.recover(TokenType::CBrack)
                    } else {
                        let close = self.read();
                        if close.kind != TokenType::CBrack && !self.recovery {
                            diags.push(
                                Diagnostic::error(
                                    "Missing close bracket on index",
                                    "The index operator must end with a closing bracket (\"]\").",
                                )
                                .with_subject(close.range.clone()),
                            );
                            self.recover(TokenType::CBrack)
                        } else {
                            close
                        }
                    };
                    self.peeker.pop_include_newlines();

                    let range = Range::between(&open.range, &close.range);
                    ret = match constant_key(&key) {
                        Some(value) => make_relative_traversal(
                            ret,
                            Traverser::Index {
                                key: value,
                                range: range.clone(),
                            },
                            range,
                        ),
                        None => Expression::Index {
                            range: Range::between(&from_range, &range),
                            collection: Box::new(ret),
                            key: Box::new(key),
                            open_range: open.range,
                            bracket_range: range,
                        },
                    };
                }
                _ => break,
            }
        }
        (ret, diags)
    }

    /// Finish `source.*.a.b` after the star. On a malformed step the splat is
    /// abandoned and the source is handed back.
    fn finish_attr_splat(
        &mut self,
        source: Expression,
        from_range: &Range,
        dot: &Token<'src>,
    ) -> (Expression, Diagnostics) {
        let mut diags = Diagnostics::new();
        let marker = self.read();
        let first_range = self.next_range();
        let mut last_range = marker.range.clone();
        let mut steps = Vec::new();

        while self.peek().kind == TokenType::Dot {
            let step_dot = self.read();
            let next = self.peek();
            match next.kind {
                TokenType::NumberLit => {
                    let num = self.read();
                    let (key, d) = legacy_index_key(&num);
                    diags.extend(d);
                    steps.push(Traverser::Index {
                        key,
                        range: Range::between(&step_dot.range, &num.range),
                    });
                    last_range = num.range;
                }
                TokenType::Ident => {
                    let attr = self.read();
                    steps.push(Traverser::Attr {
                        name: attr.text().into_owned(),
                        range: Range::between(&step_dot.range, &attr.range),
                    });
                    last_range = attr.range;
                }
                _ => {
                    if !self.recovery {
                        let diag = if next.kind == TokenType::Star {
                            Diagnostic::error(
                                "Nested splat expression not allowed",
                                "A splat expression (*) cannot be used inside another attribute-only splat expression.",
                            )
                        } else {
                            Diagnostic::error(
                                "Invalid attribute name",
                                "An attribute name is required after a dot.",
                            )
                        };
                        diags.push(diag.with_subject(next.range));
                    }
                    self.set_recovery();
                    return (source, diags);
                }
            }
        }

        let marker_range = Range::between(&dot.range, &marker.range);
        let item = Expression::AnonSymbol {
            range: marker_range.clone(),
        };
        let each = if steps.is_empty() {
            item
        } else {
            Expression::RelativeTraversal {
                source: Box::new(item),
                traversal: Traversal(steps),
                range: Range::between(&first_range, &last_range),
            }
        };
        let splat = Expression::Splat {
            source: Box::new(source),
            each: Box::new(each),
            range: Range::between(from_range, &last_range),
            marker_range,
        };
        (splat, diags)
    }

    fn parse_expression_term(&mut self) -> (Expression, Diagnostics) {
        let start = self.peek();
        match start.kind {
            TokenType::OParen => {
                let open = self.read();
                self.peeker.push_include_newlines(false);
                let (inner, mut diags) = self.parse_expression();
                if diags.has_errors() {
                    self.recover(TokenType::CParen);
                    self.peeker.pop_include_newlines();
                    return (inner, diags);
                }
                let close = self.peek();
                if close.kind != TokenType::CParen {
                    diags.push(
                        Diagnostic::error(
                            "Unbalanced parentheses",
                            "Expected a closing parenthesis to terminate the expression.",
                        )
                        .with_subject(close.range.clone())
                        .with_context(Range::between(&start.range, &close.range)),
                    );
                    self.set_recovery();
                }
                let close = self.read();
                self.peeker.pop_include_newlines();
                let expr = Expression::Parentheses {
                    inner: Box::new(inner),
                    range: Range::between(&open.range, &close.range),
                };
                (expr, diags)
            }
            TokenType::NumberLit => {
                let tok = self.read();
                let (value, diags) = number_value(&tok);
                let expr = Expression::Literal {
                    value,
                    range: tok.range,
                };
                (expr, diags)
            }
            TokenType::Ident => {
                let tok = self.read();
                if self.peek().kind == TokenType::OParen {
                    return self.finish_parsing_function_call(tok);
                }
                let value = match tok.bytes {
                    b"true" => Some(Value::Bool(true)),
                    b"false" => Some(Value::Bool(false)),
                    b"null" => Some(Value::Null),
                    _ => None,
                };
                let expr = match value {
                    Some(value) => Expression::Literal {
                        value,
                        range: tok.range,
                    },
                    None => Expression::ScopeTraversal {
                        traversal: Traversal(vec![Traverser::Root {
                            name: tok.text().into_owned(),
                            range: tok.range.clone(),
                        }]),
                        range: tok.range,
                    },
                };
                (expr, Diagnostics::new())
            }
            TokenType::OQuote | TokenType::OHeredoc => {
                let open = self.read();
                let flush = open.kind == TokenType::OHeredoc && open.bytes.get(2) == Some(&b'-');
                let end = match open.kind {
                    TokenType::OQuote => TokenType::CQuote,
                    _ => TokenType::CHeredoc,
                };
                let (mut expr, diags) = self.parse_template(end, flush);
                let range = Range::between(&open.range, &self.prev_range());
                match &mut expr {
                    Expression::Template { range: r, .. }
                    | Expression::TemplateWrap { range: r, .. } => *r = range,
                    _ => {}
                }
                (expr, diags)
            }
            TokenType::Minus | TokenType::Bang => {
                let tok = self.read();
                let op = if tok.kind == TokenType::Minus {
                    Operation::Negate
                } else {
                    Operation::LogicalNot
                };
                // binds tighter than any binary operator: -1+2 is (-1)+2
                let (operand, diags) = self.parse_expression_with_traversals();
                let expr = Expression::UnaryOp {
                    op,
                    range: Range::between(&tok.range, operand.range()),
                    operand: Box::new(operand),
                    symbol_range: tok.range,
                };
                (expr, diags)
            }
            TokenType::OBrack => self.parse_tuple_cons(),
            TokenType::OBrace => self.parse_object_cons(),
            _ => {
                let mut diags = Diagnostics::new();
                if !self.recovery {
                    let diag = if start.kind == TokenType::Eof {
                        Diagnostic::error(
                            "Missing expression",
                            "Expected the start of an expression, but found the end of the file.",
                        )
                    } else {
                        Diagnostic::error(
                            "Invalid expression",
                            "Expected the start of an expression, but found an invalid expression token.",
                        )
                    };
                    diags.push(diag.with_subject(start.range.clone()));
                }
                self.set_recovery();
                let expr = Expression::Literal {
                    value: Value::Unknown,
                    range: start.range,
                };
                (expr, diags)
            }
        }
    }

    fn finish_parsing_function_call(&mut self, name: Token<'src>) -> (Expression, Diagnostics) {
        let open = self.read();
        let mut diags = Diagnostics::new();
        let mut args = Vec::new();
        let mut expand_final = false;

        self.peeker.push_include_newlines(false);
        let close = loop {
            if self.peek().kind == TokenType::CParen {
                break Some(self.read());
            }

            let (arg, arg_diags) = self.parse_expression();
            let failed = arg_diags.has_errors();
            args.push(arg);
            diags.extend(arg_diags);
            if self.recovery && failed {
                let tok = self.recover(TokenType::CParen);
                break (tok.kind == TokenType::CParen).then_some(tok);
            }

            let sep = self.read();
            match sep.kind {
                TokenType::CParen => break Some(sep),
                TokenType::Ellipsis => {
                    expand_final = true;
                    if self.peek().kind == TokenType::CParen {
                        break Some(self.read());
                    }
                    if !self.recovery {
                        diags.push(
                            Diagnostic::error(
                                "Missing closing parenthesis",
                                "An expanded function argument (with ...) must be immediately followed by closing parentheses.",
                            )
                            .with_subject(sep.range.clone())
                            .with_context(Range::between(&name.range, &sep.range)),
                        );
                    }
                    let tok = self.recover(TokenType::CParen);
                    break (tok.kind == TokenType::CParen).then_some(tok);
                }
                TokenType::Comma => {
                    // trailing comma
                    if self.peek().kind == TokenType::CParen {
                        break Some(self.read());
                    }
                }
                TokenType::Eof => {
                    if !self.recovery {
                        diags.push(
                            Diagnostic::error(
                                "Unterminated function call",
                                "There is no closing parenthesis for this function call before the end of the file. This may be caused by incorrect parenthesis nesting elsewhere in this file.",
                            )
                            .with_subject(Range::between(&name.range, &open.range)),
                        );
                    }
                    self.set_recovery();
                    break None;
                }
                _ => {
                    if !self.recovery {
                        diags.push(
                            Diagnostic::error(
                                "Missing argument separator",
                                "A comma is required to separate each function argument from the next.",
                            )
                            .with_subject(sep.range.clone())
                            .with_context(Range::between(&name.range, &sep.range)),
                        );
                    }
                    let tok = self.recover(TokenType::CParen);
                    break (tok.kind == TokenType::CParen).then_some(tok);
                }
            }
        };
        self.peeker.pop_include_newlines();

        let close_paren_range = match close {
            Some(tok) => tok.range,
            None => self.prev_range(),
        };
        let expr = Expression::FunctionCall {
            name: name.text().into_owned(),
            args,
            expand_final,
            range: Range::between(&name.range, &close_paren_range),
            name_range: name.range,
            open_paren_range: open.range,
            close_paren_range,
        };
        (expr, diags)
    }

    fn parse_tuple_cons(&mut self) -> (Expression, Diagnostics) {
        let open = self.read();
        if self.peek().is_keyword("for") {
            return self.finish_parsing_for_expr(open);
        }

        self.peeker.push_include_newlines(false);
        let mut diags = Diagnostics::new();
        let mut exprs = Vec::new();
        let close = loop {
            if self.peek().kind == TokenType::CBrack {
                break self.read();
            }

            let (expr, expr_diags) = self.parse_expression();
            let failed = expr_diags.has_errors();
            exprs.push(expr);
            diags.extend(expr_diags);
            if self.recovery && failed {
                break self.recover(TokenType::CBrack);
            }

            let next = self.peek();
            if next.kind == TokenType::CBrack {
                break self.read();
            }
            if next.kind != TokenType::Comma {
                if !self.recovery {
                    diags.push(
                        Diagnostic::error(
                            "Missing item separator",
                            "Expected a comma to mark the beginning of the next item.",
                        )
                        .with_subject(next.range.clone())
                        .with_context(Range::between(&open.range, &next.range)),
                    );
                }
                break self.recover(TokenType::CBrack);
            }
            self.read();
        };
        self.peeker.pop_include_newlines();

        let expr = Expression::Tuple {
            exprs,
            range: Range::between(&open.range, &close.range),
            open_range: open.range,
        };
        (expr, diags)
    }

    fn parse_object_cons(&mut self) -> (Expression, Diagnostics) {
        let open = self.read();
        if self.peek().is_keyword("for") {
            return self.finish_parsing_for_expr(open);
        }

        self.peeker.push_include_newlines(true);
        let mut diags = Diagnostics::new();
        let mut items = Vec::new();
        let close = loop {
            let next = self.peek();
            if next.kind == TokenType::Newline {
                self.read();
                continue;
            }
            if next.kind == TokenType::CBrace {
                break self.read();
            }

            // parentheses make a bare identifier key an expression
            let force_non_literal = next.kind == TokenType::OParen;
            let (key, key_diags) = self.parse_expression();
            let failed = key_diags.has_errors();
            diags.extend(key_diags);
            if self.recovery && failed {
                break self.recover(TokenType::CBrace);
            }
            let key = Expression::ObjectKey {
                wrapped: Box::new(key),
                force_non_literal,
            };

            let next = self.peek();
            if next.kind != TokenType::Equal && next.kind != TokenType::Colon {
                if !self.recovery {
                    diags.push(missing_object_value(&open, &next));
                }
                break self.recover(TokenType::CBrace);
            }
            self.read();

            let (value, value_diags) = self.parse_expression();
            let failed = value_diags.has_errors();
            diags.extend(value_diags);
            if self.recovery && failed {
                break self.recover(TokenType::CBrace);
            }
            items.push(ObjectItem { key, value });

            let next = self.peek();
            if next.kind == TokenType::CBrace {
                break self.read();
            }
            if next.kind != TokenType::Comma && next.kind != TokenType::Newline {
                if !self.recovery {
                    let diag = if next.kind == TokenType::Eof {
                        unterminated_object(&open)
                    } else {
                        Diagnostic::error(
                            "Missing attribute separator",
                            "Expected a newline or comma to mark the beginning of the next attribute.",
                        )
                        .with_subject(next.range.clone())
                        .with_context(Range::between(&open.range, &next.range))
                    };
                    diags.push(diag);
                }
                break self.recover(TokenType::CBrace);
            }
            self.read();
        };
        self.peeker.pop_include_newlines();

        let expr = Expression::Object {
            items,
            range: Range::between(&open.range, &close.range),
            open_range: open.range,
        };
        (expr, diags)
    }

    fn finish_parsing_for_expr(&mut self, open: Token<'src>) -> (Expression, Diagnostics) {
        self.peeker.push_include_newlines(false);
        let result = self.parse_for_expr_body(&open);
        self.peeker.pop_include_newlines();
        result
    }

    fn parse_for_expr_body(&mut self, open: &Token<'src>) -> (Expression, Diagnostics) {
        self.read(); // "for"
        let make_object = open.kind == TokenType::OBrace;
        let close_kind = if make_object {
            TokenType::CBrace
        } else {
            TokenType::CBrack
        };
        let mut diags = Diagnostics::new();

        let bail = |parser: &mut Self, diags: &mut Diagnostics, detail: Option<&str>| {
            if let Some(detail) = detail
                && !parser.recovery
            {
                let next = parser.peek();
                diags.push(
                    Diagnostic::error("Invalid 'for' expression", detail)
                        .with_subject(next.range.clone())
                        .with_context(Range::between(&open.range, &next.range)),
                );
            }
            let close = parser.recover(close_kind);
            Expression::Literal {
                value: Value::Unknown,
                range: Range::between(&open.range, &close.range),
            }
        };

        if self.peek().kind != TokenType::Ident {
            let expr = bail(
                self,
                &mut diags,
                Some("For expression requires variable name after 'for'."),
            );
            return (expr, diags);
        }
        let mut key_var = None;
        let mut val_var = self.read().text().into_owned();
        if self.peek().kind == TokenType::Comma {
            self.read();
            if self.peek().kind != TokenType::Ident {
                let expr = bail(
                    self,
                    &mut diags,
                    Some("For expression requires value variable name after comma."),
                );
                return (expr, diags);
            }
            key_var = Some(val_var);
            val_var = self.read().text().into_owned();
        }

        if !self.peek().is_keyword("in") {
            let expr = bail(
                self,
                &mut diags,
                Some("For expression requires the 'in' keyword after its name declarations."),
            );
            return (expr, diags);
        }
        self.read();

        let (collection, coll_diags) = self.parse_expression();
        let failed = coll_diags.has_errors();
        diags.extend(coll_diags);
        if self.recovery && failed {
            let expr = bail(self, &mut diags, None);
            return (expr, diags);
        }

        if self.peek().kind != TokenType::Colon {
            let expr = bail(
                self,
                &mut diags,
                Some("For expression requires a colon after the collection expression."),
            );
            return (expr, diags);
        }
        self.read();

        let (mut val_expr, mut val_diags) = self.parse_expression();
        let mut key_expr = None;
        if self.peek().kind == TokenType::FatArrow {
            self.read();
            diags.extend(val_diags);
            let (value, d) = self.parse_expression();
            key_expr = Some(std::mem::replace(&mut val_expr, value));
            val_diags = d;
        }
        let failed = diags.has_errors() || val_diags.has_errors();
        diags.extend(val_diags);
        if self.recovery && failed {
            let expr = bail(self, &mut diags, None);
            return (expr, diags);
        }

        let ellipsis = match self.peek().kind {
            TokenType::Ellipsis => Some(self.read()),
            _ => None,
        };

        let mut cond = None;
        if self.peek().is_keyword("if") {
            self.read();
            let (expr, cond_diags) = self.parse_expression();
            let failed = cond_diags.has_errors();
            diags.extend(cond_diags);
            if self.recovery && failed {
                let expr = bail(self, &mut diags, None);
                return (expr, diags);
            }
            cond = Some(expr);
        }

        let close = if self.peek().kind == close_kind {
            self.read()
        } else {
            if !self.recovery {
                let next = self.peek();
                diags.push(
                    Diagnostic::error(
                        "Invalid 'for' expression",
                        "Extra characters after the end of the 'for' expression.",
                    )
                    .with_subject(next.range.clone())
                    .with_context(Range::between(&open.range, &next.range)),
                );
            }
            self.recover(close_kind)
        };

        let range = Range::between(&open.range, &close.range);
        let invalid = |detail: &str, subject: &Range| {
            Diagnostic::error("Invalid 'for' expression", detail)
                .with_subject(subject.clone())
                .with_context(range.clone())
        };
        if make_object {
            if key_expr.is_none() {
                diags.push(invalid(
                    "Key expression is required when building an object.",
                    val_expr.range(),
                ));
            }
        } else {
            if let Some(key) = &key_expr {
                diags.push(invalid(
                    "Key expression is not valid when building a tuple.",
                    key.range(),
                ));
            }
            if let Some(ellipsis) = &ellipsis {
                diags.push(invalid(
                    "Grouping ellipsis (...) cannot be used when building a tuple.",
                    &ellipsis.range,
                ));
            }
        }

        let expr = Expression::For(Box::new(ForExpr {
            key_var,
            val_var,
            collection,
            key_expr,
            val_expr,
            cond,
            group: ellipsis.is_some(),
            range,
            open_range: open.range.clone(),
            close_range: close.range,
        }));
        (expr, diags)
    }
}

/// Append a step to a traversal expression, or start a relative traversal.
fn make_relative_traversal(expr: Expression, step: Traverser, step_range: Range) -> Expression {
    match expr {
        Expression::ScopeTraversal {
            mut traversal,
            range,
        } => {
            traversal.0.push(step);
            Expression::ScopeTraversal {
                traversal,
                range: Range::between(&range, &step_range),
            }
        }
        Expression::RelativeTraversal {
            source,
            mut traversal,
            range,
        } => {
            traversal.0.push(step);
            Expression::RelativeTraversal {
                source,
                traversal,
                range: Range::between(&range, &step_range),
            }
        }
        other => {
            let range = Range::between(other.range(), &step_range);
            Expression::RelativeTraversal {
                source: Box::new(other),
                traversal: Traversal(vec![step]),
                range,
            }
        }
    }
}

/// The value of an index key that is known without evaluation.
fn constant_key(key: &Expression) -> Option<Value> {
    match key {
        Expression::Literal { value, .. } => Some(value.clone()),
        Expression::Template { parts, .. } if key.is_string_literal() => match parts.as_slice() {
            [Expression::Literal { value, .. }] => Some(value.clone()),
            _ => None,
        },
        _ => None,
    }
}

fn number_value(tok: &Token<'_>) -> (Value, Diagnostics) {
    match tok.text().parse::<f64>() {
        Ok(n) => (Value::Number(n), Diagnostics::new()),
        Err(_) => (
            Value::Unknown,
            Diagnostic::error(
                "Invalid number literal",
                "Failed to recognize the value of this number literal.",
            )
            .with_subject(tok.range.clone())
            .into(),
        ),
    }
}

/// The key of a legacy `.0` index step. `a.0.1` scans its steps as the single
/// number `0.1`, which cannot be an index.
fn legacy_index_key(num: &Token<'_>) -> (Value, Diagnostics) {
    let text = num.text();
    match text.split_once('.') {
        Some((first, second)) => (
            Value::Unknown,
            Diagnostic::error(
                "Invalid legacy index syntax",
                format!(
                    "When using the legacy index syntax, chaining two indexes together is not permitted. Use the proper index syntax instead, like [{}][{}].",
                    first, second
                ),
            )
            .with_subject(num.range.clone())
            .into(),
        ),
        None => number_value(num),
    }
}

fn unterminated_object(open: &Token<'_>) -> Diagnostic {
    Diagnostic::error(
        "Unterminated object constructor expression",
        "There is no corresponding closing brace before the end of the file. This may be caused by incorrect brace nesting elsewhere in this file.",
    )
    .with_subject(open.range.clone())
}

fn missing_object_value(open: &Token<'_>, next: &Token<'_>) -> Diagnostic {
    let (summary, detail) = match next.kind {
        TokenType::Eof => return unterminated_object(open),
        TokenType::Newline | TokenType::Comma => (
            "Missing attribute value",
            "Expected an attribute value, introduced by an equals sign (\"=\").",
        ),
        TokenType::Ident => (
            "Missing key/value separator",
            "Expected an equals sign (\"=\") to mark the beginning of the attribute value. If you intended to given an attribute name containing periods or spaces, write the name in quotes to create a string literal.",
        ),
        _ => (
            "Missing key/value separator",
            "Expected an equals sign (\"=\") to mark the beginning of the attribute value.",
        ),
    };
    Diagnostic::error(summary, detail)
        .with_subject(next.range.clone())
        .with_context(Range::between(&open.range, &next.range))
}
