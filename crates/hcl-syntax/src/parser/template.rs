//! Templates: quoted strings, heredocs and bare templates.
//!
//! A template is parsed in two passes. The first reads the token stream into
//! a flat list of literals, interpolations and directive markers; the second
//! nests the directives into conditionals and `for` expressions.

use std::collections::VecDeque;
use std::fmt;

use hcl_tokenizer::{Range, Token, TokenType};

use super::Parser;
use super::literal::unescape_literal;
use crate::suggest::name_suggestion;
use crate::{Diagnostic, Diagnostics, Expression, ForExpr, Value};

const CONTROL_KEYWORDS: [&str; 5] = ["if", "for", "else", "endif", "endfor"];

#[derive(Debug)]
enum TemplateToken {
    Literal {
        val: String,
        range: Range,
    },
    Interp {
        expr: Expression,
        range: Range,
    },
    If {
        cond: Expression,
        range: Range,
    },
    For {
        key_var: Option<String>,
        val_var: String,
        collection: Expression,
        range: Range,
    },
    EndCtrl {
        kind: EndCtrlKind,
        range: Range,
    },
    /// Synthetic marker for the end of the template.
    End {
        range: Range,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EndCtrlKind {
    Else,
    EndIf,
    EndFor,
}

impl fmt::Display for EndCtrlKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EndCtrlKind::Else => "else",
            EndCtrlKind::EndIf => "endif",
            EndCtrlKind::EndFor => "endfor",
        })
    }
}

impl<'src> Parser<'src> {
    /// Parse template content up to and including the `end` token.
    ///
    /// A template made of a single interpolation yields
    /// [`Expression::TemplateWrap`] so that it keeps the type of its value.
    pub(super) fn parse_template(
        &mut self,
        end: TokenType,
        flush_heredoc: bool,
    ) -> (Expression, Diagnostics) {
        let (mut tokens, range, mut diags) = self.parse_template_parts(end);
        if flush_heredoc {
            flush_heredoc_parts(&mut tokens);
        }
        let tokens = meld_consecutive_literals(tokens);
        let passthru = tokens.len() == 2 && matches!(tokens[0], TemplateToken::Interp { .. });

        let mut tp = TemplateParser {
            tokens: tokens.into(),
            end_range: range.empty_at_end(),
        };
        let (mut parts, more) = tp.parse_root();
        diags.extend(more);

        if passthru && let Some(wrapped) = parts.pop() {
            let expr = Expression::TemplateWrap {
                wrapped: Box::new(wrapped),
                range,
            };
            return (expr, diags);
        }
        (Expression::Template { parts, range }, diags)
    }

    fn parse_template_parts(&mut self, end: TokenType) -> (Vec<TemplateToken>, Range, Diagnostics) {
        let mut diags = Diagnostics::new();
        let mut parts = Vec::new();
        let start_range = self.next_range();
        let mut ltrim_next = false;

        let end_range = loop {
            let next = self.read();
            if next.kind == end {
                break next.range;
            }

            match next.kind {
                TokenType::QuotedLit | TokenType::StringLit => {
                    let (val, d) = unescape_literal(&next);
                    diags.extend(d);
                    push_literal(&mut parts, val, next.range, &mut ltrim_next);
                }
                // reported by the invalid token check, kept as text here
                TokenType::QuotedNewline | TokenType::BadUtf8 => {
                    let val = String::from_utf8_lossy(next.bytes).into_owned();
                    push_literal(&mut parts, val, next.range, &mut ltrim_next);
                }
                TokenType::TemplateInterp => {
                    ltrim_next = false;
                    if next.bytes.ends_with(b"~") {
                        trim_preceding_literals(&mut parts);
                    }
                    self.peeker.push_include_newlines(false);
                    let (expr, d) = self.parse_expression();
                    diags.extend(d);
                    let close = self.peek();
                    if close.kind != TokenType::TemplateSeqEnd {
                        if !self.recovery {
                            diags.push(
                                Diagnostic::error(
                                    "Extra characters after interpolation expression",
                                    "Expected a closing brace to end the interpolation expression, but found extra characters.\n\nThis can happen when you include interpolation syntax for another language, such as shell scripting, but forget to escape the interpolation start token. If this is an embedded sequence for another language, escape it by starting with \"$${\" instead of just \"${\".",
                                )
                                .with_subject(close.range.clone())
                                .with_context(Range::between(&start_range, &close.range)),
                            );
                        }
                        self.recover(TokenType::TemplateSeqEnd);
                    } else {
                        self.read();
                        ltrim_next = close.bytes.starts_with(b"~");
                    }
                    self.peeker.pop_include_newlines();
                    parts.push(TemplateToken::Interp {
                        expr,
                        range: Range::between(&next.range, &close.range),
                    });
                }
                TokenType::TemplateControl => {
                    ltrim_next = false;
                    if next.bytes.ends_with(b"~") {
                        trim_preceding_literals(&mut parts);
                    }
                    self.peeker.push_include_newlines(false);
                    let (directive, d) = self.parse_template_directive(&next, &start_range);
                    diags.extend(d);
                    if let Some((token, trim)) = directive {
                        parts.push(token);
                        ltrim_next = trim;
                    }
                    self.peeker.pop_include_newlines();
                }
                _ => {
                    if !self.recovery {
                        diags.push(
                            Diagnostic::error(
                                "Unterminated template string",
                                "No closing marker was found for the string.",
                            )
                            .with_subject(next.range.clone())
                            .with_context(Range::between(&start_range, &next.range)),
                        );
                    }
                    break self.recover(end).range;
                }
            }
        };

        if parts.is_empty() {
            // "" is an empty string, not an empty template
            parts.push(TemplateToken::Literal {
                val: String::new(),
                range: start_range.empty_at_start(),
            });
        }
        parts.push(TemplateToken::End {
            range: end_range.clone(),
        });
        (parts, Range::between(&start_range, &end_range), diags)
    }

    /// Parse a `%{ ... }` directive after its opener. Returns the directive
    /// and whether its closer asks to trim the following literal, or `None`
    /// if the directive was malformed and skipped.
    fn parse_template_directive(
        &mut self,
        open: &Token<'src>,
        start_range: &Range,
    ) -> (Option<(TemplateToken, bool)>, Diagnostics) {
        let mut diags = Diagnostics::new();

        let kw = self.peek();
        if kw.kind != TokenType::Ident {
            if !self.recovery {
                diags.push(
                    Diagnostic::error(
                        "Invalid template directive",
                        "A template directive keyword (\"if\", \"for\", etc) is expected at the beginning of a %{ sequence.",
                    )
                    .with_subject(kw.range.clone())
                    .with_context(Range::between(&open.range, &kw.range)),
                );
            }
            self.recover(TokenType::TemplateSeqEnd);
            return (None, diags);
        }
        self.read();

        let token = match kw.text().as_ref() {
            "if" => {
                let (cond, d) = self.parse_expression();
                let failed = d.has_errors();
                diags.extend(d);
                let token = TemplateToken::If {
                    cond,
                    range: Range::between(&open.range, &self.next_range()),
                };
                if self.recovery && failed {
                    self.recover(TokenType::TemplateSeqEnd);
                    return (Some((token, false)), diags);
                }
                token
            }
            "else" => TemplateToken::EndCtrl {
                kind: EndCtrlKind::Else,
                range: Range::between(&open.range, &self.next_range()),
            },
            "endif" => TemplateToken::EndCtrl {
                kind: EndCtrlKind::EndIf,
                range: Range::between(&open.range, &self.next_range()),
            },
            "endfor" => TemplateToken::EndCtrl {
                kind: EndCtrlKind::EndFor,
                range: Range::between(&open.range, &self.next_range()),
            },
            "for" => {
                let invalid_for = |p: &mut Self, diags: &mut Diagnostics, detail: &str| {
                    if !p.recovery {
                        let next = p.peek();
                        diags.push(
                            Diagnostic::error("Invalid 'for' directive", detail)
                                .with_subject(next.range.clone())
                                .with_context(Range::between(&open.range, &next.range)),
                        );
                    }
                    p.recover(TokenType::TemplateSeqEnd);
                };

                if self.peek().kind != TokenType::Ident {
                    invalid_for(self, &mut diags, "For directive requires variable name after 'for'.");
                    return (None, diags);
                }
                let mut key_var = None;
                let mut val_var = self.read().text().into_owned();
                if self.peek().kind == TokenType::Comma {
                    self.read();
                    if self.peek().kind != TokenType::Ident {
                        invalid_for(
                            self,
                            &mut diags,
                            "For directive requires value variable name after comma.",
                        );
                        return (None, diags);
                    }
                    key_var = Some(val_var);
                    val_var = self.read().text().into_owned();
                }
                if !self.peek().is_keyword("in") {
                    invalid_for(self, &mut diags, "For directive requires 'in' keyword after names.");
                    return (None, diags);
                }
                self.read();

                let (collection, d) = self.parse_expression();
                let failed = d.has_errors();
                diags.extend(d);
                let token = TemplateToken::For {
                    key_var,
                    val_var,
                    collection,
                    range: Range::between(&open.range, &self.next_range()),
                };
                if self.recovery && failed {
                    self.recover(TokenType::TemplateSeqEnd);
                    return (Some((token, false)), diags);
                }
                token
            }
            given => {
                if !self.recovery {
                    let suggestion = name_suggestion(given, CONTROL_KEYWORDS)
                        .map(|s| format!(" Did you mean {:?}?", s))
                        .unwrap_or_default();
                    diags.push(
                        Diagnostic::error(
                            "Invalid template control keyword",
                            format!(
                                "{:?} is not a valid template control keyword.{}",
                                given, suggestion
                            ),
                        )
                        .with_subject(kw.range.clone())
                        .with_context(Range::between(&open.range, &kw.range)),
                    );
                }
                self.recover(TokenType::TemplateSeqEnd);
                return (None, diags);
            }
        };

        let close = self.peek();
        let mut trim_next = false;
        if close.kind != TokenType::TemplateSeqEnd {
            if !self.recovery {
                diags.push(
                    Diagnostic::error(
                        format!("Extra characters in {} marker", kw.text()),
                        "Expected a closing brace to end the sequence, but found extra characters.",
                    )
                    .with_subject(close.range.clone())
                    .with_context(Range::between(start_range, &close.range)),
                );
            }
            self.recover(TokenType::TemplateSeqEnd);
        } else {
            self.read();
            trim_next = close.bytes.starts_with(b"~");
        }
        (Some((token, trim_next)), diags)
    }
}

fn push_literal(parts: &mut Vec<TemplateToken>, mut val: String, range: Range, ltrim: &mut bool) {
    if *ltrim {
        val = val.trim_start().to_string();
        // keep trimming into the next literal if this one vanished
        *ltrim = val.is_empty();
    }
    parts.push(TemplateToken::Literal { val, range });
}

/// Strip trailing whitespace from the literals right before a `~` opener.
fn trim_preceding_literals(parts: &mut [TemplateToken]) {
    for part in parts.iter_mut().rev() {
        let TemplateToken::Literal { val, .. } = part else {
            break;
        };
        val.truncate(val.trim_end().len());
        if !val.is_empty() {
            break;
        }
    }
}

/// Remove the common leading whitespace from every line of a `<<-` heredoc.
///
/// Lines that are entirely whitespace do not count towards the common
/// indent, and a line that starts with an interpolation has none.
fn flush_heredoc_parts(parts: &mut [TemplateToken]) {
    let mut min_spaces = usize::MAX;
    let mut adjust = Vec::new();
    let mut newline = true;

    for (i, part) in parts.iter().enumerate() {
        if newline {
            newline = false;
            let spaces = match part {
                TemplateToken::Literal { val, .. } => {
                    let trimmed = val.trim_start();
                    if trimmed.is_empty() && val.ends_with('\n') {
                        usize::MAX
                    } else {
                        adjust.push(i);
                        val[..val.len() - trimmed.len()].chars().count()
                    }
                }
                TemplateToken::End { .. } => break,
                _ => 0,
            };
            min_spaces = min_spaces.min(spaces);
        }
        if let TemplateToken::Literal { val, .. } = part
            && val.ends_with('\n')
        {
            newline = true;
        }
    }
    if min_spaces == usize::MAX {
        return;
    }

    for i in adjust {
        if let TemplateToken::Literal { val, range } = &mut parts[i] {
            let cut: usize = val
                .chars()
                .take(min_spaces)
                .take_while(|c| c.is_whitespace())
                .map(char::len_utf8)
                .sum();
            let removed: String = val.drain(..cut).collect();
            range.start = range.start.advance_over(removed.as_bytes());
        }
    }
}

fn meld_consecutive_literals(tokens: Vec<TemplateToken>) -> Vec<TemplateToken> {
    let mut out: Vec<TemplateToken> = Vec::with_capacity(tokens.len());
    for token in tokens {
        if let TemplateToken::Literal { val, range } = &token
            && let Some(TemplateToken::Literal {
                val: prev_val,
                range: prev_range,
            }) = out.last_mut()
        {
            prev_val.push_str(val);
            *prev_range = Range::between(prev_range, range);
            continue;
        }
        out.push(token);
    }
    out
}

/// Nests flat template tokens into expressions. The queue always ends with
/// an [`TemplateToken::End`], which is never consumed.
struct TemplateParser {
    tokens: VecDeque<TemplateToken>,
    end_range: Range,
}

impl TemplateParser {
    /// The range of the end marker, if that is the next token.
    fn at_end(&self) -> Option<Range> {
        match self.tokens.front() {
            Some(TemplateToken::End { range }) => Some(range.clone()),
            None => Some(self.end_range.clone()),
            Some(_) => None,
        }
    }

    fn parse_root(&mut self) -> (Vec<Expression>, Diagnostics) {
        let mut parts = Vec::new();
        let mut diags = Diagnostics::new();
        while self.at_end().is_none() {
            let (expr, d) = self.parse_expr();
            diags.extend(d);
            parts.push(expr);
        }
        (parts, diags)
    }

    fn parse_expr(&mut self) -> (Expression, Diagnostics) {
        if let Some(range) = self.at_end() {
            let diag = Diagnostic::error(
                "Unexpected end of template",
                "The control directives within this template are unbalanced.",
            )
            .with_subject(range.clone());
            return (placeholder(range), diag.into());
        }

        match self.tokens.pop_front() {
            Some(TemplateToken::Literal { val, range }) => (
                Expression::Literal {
                    value: Value::String(val),
                    range,
                },
                Diagnostics::new(),
            ),
            Some(TemplateToken::Interp { expr, .. }) => (expr, Diagnostics::new()),
            Some(TemplateToken::If {
                cond,
                range: if_range,
            }) => self.parse_if(cond, if_range),
            Some(TemplateToken::For {
                key_var,
                val_var,
                collection,
                range: for_range,
            }) => self.parse_for(key_var, val_var, collection, for_range),
            Some(TemplateToken::EndCtrl { kind, range }) => {
                let diag = Diagnostic::error(
                    format!("Unexpected {} directive", kind),
                    "The control directives within this template are unbalanced.",
                )
                .with_subject(range.clone());
                (placeholder(range), diag.into())
            }
            Some(TemplateToken::End { range }) => (placeholder(range), Diagnostics::new()),
            None => (placeholder(self.end_range.clone()), Diagnostics::new()),
        }
    }

    /// Pop the next token if it closes a directive.
    fn next_end_ctrl(&mut self) -> Option<(EndCtrlKind, Range)> {
        if !matches!(self.tokens.front(), Some(TemplateToken::EndCtrl { .. })) {
            return None;
        }
        match self.tokens.pop_front() {
            Some(TemplateToken::EndCtrl { kind, range }) => Some((kind, range)),
            _ => None,
        }
    }

    fn parse_if(&mut self, cond: Expression, if_range: Range) -> (Expression, Diagnostics) {
        let mut diags = Diagnostics::new();
        let mut if_exprs = Vec::new();
        let mut else_exprs = Vec::new();
        let mut in_else = false;

        let endif_range = loop {
            if let Some(range) = self.at_end() {
                diags.push(
                    Diagnostic::error(
                        "Unexpected end of template",
                        format!(
                            "The if directive at {} is missing its corresponding endif directive.",
                            if_range
                        ),
                    )
                    .with_subject(range.clone()),
                );
                return (placeholder(range), diags);
            }
            if let Some((kind, range)) = self.next_end_ctrl() {
                match kind {
                    EndCtrlKind::Else if !in_else => in_else = true,
                    EndCtrlKind::Else => diags.push(
                        Diagnostic::error(
                            "Unexpected else directive",
                            format!("Already in the else clause for the if started at {}.", if_range),
                        )
                        .with_subject(range),
                    ),
                    EndCtrlKind::EndIf => break range,
                    EndCtrlKind::EndFor => diags.push(
                        Diagnostic::error(
                            format!("Unexpected {} directive", kind),
                            format!("Expecting an endif directive for the if started at {}.", if_range),
                        )
                        .with_subject(range),
                    ),
                }
                continue;
            }

            let (expr, d) = self.parse_expr();
            diags.extend(d);
            if in_else {
                else_exprs.push(expr);
            } else {
                if_exprs.push(expr);
            }
        };

        let true_result = branch_template(if_exprs, if_range.empty_at_end());
        let false_result = branch_template(else_exprs, endif_range.empty_at_start());
        let expr = Expression::Conditional {
            condition: Box::new(cond),
            true_result: Box::new(true_result),
            false_result: Box::new(false_result),
            range: Range::between(&if_range, &endif_range),
        };
        (expr, diags)
    }

    fn parse_for(
        &mut self,
        key_var: Option<String>,
        val_var: String,
        collection: Expression,
        for_range: Range,
    ) -> (Expression, Diagnostics) {
        let mut diags = Diagnostics::new();
        let mut content = Vec::new();

        let endfor_range = loop {
            if let Some(range) = self.at_end() {
                diags.push(
                    Diagnostic::error(
                        "Unexpected end of template",
                        format!(
                            "The for directive at {} is missing its corresponding endfor directive.",
                            for_range
                        ),
                    )
                    .with_subject(range.clone()),
                );
                return (placeholder(range), diags);
            }
            if let Some((kind, range)) = self.next_end_ctrl() {
                match kind {
                    EndCtrlKind::EndFor => break range,
                    EndCtrlKind::Else => diags.push(
                        Diagnostic::error(
                            "Unexpected else directive",
                            "An else clause is not expected for a for directive.",
                        )
                        .with_subject(range),
                    ),
                    EndCtrlKind::EndIf => diags.push(
                        Diagnostic::error(
                            format!("Unexpected {} directive", kind),
                            format!(
                                "Expecting an endfor directive corresponding to the for directive at {}.",
                                for_range
                            ),
                        )
                        .with_subject(range),
                    ),
                }
                continue;
            }

            let (expr, d) = self.parse_expr();
            diags.extend(d);
            content.push(expr);
        };

        let val_expr = branch_template(content, for_range.empty_at_end());
        let for_expr = ForExpr {
            key_var,
            val_var,
            collection,
            key_expr: None,
            val_expr,
            cond: None,
            group: false,
            range: Range::between(&for_range, &endfor_range),
            open_range: for_range,
            close_range: endfor_range,
        };
        let expr = Expression::TemplateJoin {
            tuple: Box::new(Expression::For(Box::new(for_expr))),
        };
        (expr, diags)
    }
}

/// The body of an `if` branch or `for` loop as a template. An empty body
/// is an empty string at `empty_at`.
fn branch_template(parts: Vec<Expression>, empty_at: Range) -> Expression {
    let (parts, range) = match (parts.first(), parts.last()) {
        (Some(first), Some(last)) => {
            let range = Range::between(first.range(), last.range());
            (parts, range)
        }
        _ => {
            let empty = Expression::Literal {
                value: Value::String(String::new()),
                range: empty_at.clone(),
            };
            (vec![empty], empty_at)
        }
    };
    Expression::Template { parts, range }
}

fn placeholder(range: Range) -> Expression {
    Expression::Literal {
        value: Value::Unknown,
        range,
    }
}
